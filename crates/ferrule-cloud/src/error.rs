use std::path::PathBuf;

use ferrule_build::dockerfile::DockerfileError;

use crate::api::ApiError;
use crate::gcloud::GcloudError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read size of {path}")]
    Size {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("archive {path} is {size} bytes, above the 100 MiB upload limit")]
    TooLarge { path: PathBuf, size: u64 },

    #[error("failed to obtain an upload URL")]
    UploadUrl { source: ApiError },

    #[error("failed to upload archive")]
    Put { source: TransportError },
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("cloud function request failed")]
    Api { source: ApiError },

    #[error("failed to set IAM policy on {resource}")]
    IamPolicy { resource: String, source: ApiError },

    #[error("failed to prepare container build file")]
    Dockerfile { source: DockerfileError },

    #[error("project directory is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    /// `gcloud run deploy` exited non-zero. Callers stop the whole run.
    #[error("cloud run deployment failed: {command}")]
    CliFailed { command: String, source: GcloudError },
}

impl ProvisionError {
    /// Whether the failure must halt everything above it (exit code 1).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CliFailed { .. })
    }
}
