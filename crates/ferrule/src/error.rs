use std::path::PathBuf;

use ferrule_build::PackageError;
use ferrule_cloud::transport::TransportError;
use ferrule_cloud::{ApiError, ProvisionError, UploadError};

use crate::app::AppError;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to package sources")]
    Package { source: PackageError },

    #[error("failed to checksum {path}")]
    Checksum {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read the deployed source hash")]
    RemoteHash { source: TransportError },

    #[error("cloud API request failed")]
    Api { source: ApiError },

    #[error("failed to upload function code")]
    Upload { source: UploadError },

    #[error("failed to provision the backend")]
    Provision { source: ProvisionError },

    #[error("application step failed")]
    App { source: AppError },

    #[error("failed to remove {path}")]
    RemoveArchive {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DeployError {
    /// A `gcloud run deploy` failure. The CLI exits with status 1.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Provision { source } if source.is_fatal())
    }
}
