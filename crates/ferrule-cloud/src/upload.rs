use ferrule_build::PackagedArtifact;
use ferrule_core::DeploymentTarget;

use crate::error::UploadError;
use crate::functions::FunctionsApi;
use crate::transport::{ArtifactTransport, MAX_UPLOAD_BYTES};

/// Publish a finalized archive through a one-time upload URL.
///
/// Returns the upload URL itself, which the create request references as
/// `sourceUploadUrl`. No retries.
pub async fn upload_artifact<F, T>(
    functions: &F,
    transport: &T,
    target: &DeploymentTarget,
    artifact: &PackagedArtifact,
) -> Result<String, UploadError>
where
    F: FunctionsApi,
    T: ArtifactTransport,
{
    let path = artifact.path();
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| UploadError::Size {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            path: path.to_path_buf(),
            size,
        });
    }

    let upload_url = functions
        .generate_upload_url(&target.parent())
        .await
        .map_err(|e| UploadError::UploadUrl { source: e })?;

    transport
        .put_archive(&upload_url, path, size)
        .await
        .map_err(|e| UploadError::Put { source: e })?;

    tracing::info!(bytes = size, "function code uploaded");
    Ok(upload_url)
}
