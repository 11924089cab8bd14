use std::path::Path;

use ferrule_build::package::archive_path;
use ferrule_cloud::client::GcloudClient;
use ferrule_cloud::executor::GcloudExecutor;
use ferrule_core::DeploymentTarget;

use crate::error::DeployError;

/// Registry repository Cloud Functions builds push their images to.
const BUILD_REPOSITORY: &str = "gcf-artifacts";

/// `gs://gcf-sources-{number}-{location}/{name}-*`
pub fn source_objects_url(project_number: &str, target: &DeploymentTarget) -> String {
    format!(
        "gs://gcf-sources-{project_number}-{location}/{name}-*",
        location = target.location(),
        name = target.name(),
    )
}

/// `{location}-docker.pkg.dev/{project}/gcf-artifacts/{name}`
pub fn build_image(target: &DeploymentTarget) -> String {
    format!(
        "{location}-docker.pkg.dev/{project}/{BUILD_REPOSITORY}/{name}",
        location = target.location(),
        project = target.project(),
        name = target.name(),
    )
}

/// Remove everything packaging and building left behind for this app name.
///
/// Only the local archive is required to go; remote leftovers may never have
/// existed, so their failures are warnings.
pub async fn purge_artifacts<E: GcloudExecutor>(
    gcloud: &GcloudClient<E>,
    target: &DeploymentTarget,
    project_dir: &Path,
) -> Result<(), DeployError> {
    let archive = archive_path(project_dir, target.name());
    if archive.exists() {
        std::fs::remove_file(&archive).map_err(|e| DeployError::RemoveArchive {
            path: archive.clone(),
            source: e,
        })?;
        tracing::info!(path = %archive.display(), "removed local archive");
    }

    match gcloud.get_project_number(target.project()).await {
        Ok(number) => {
            let url = source_objects_url(&number, target);
            match gcloud.delete_objects(&url, target.project()).await {
                Ok(()) => tracing::info!(%url, "deleted stored sources"),
                // arch-lint: allow(no-error-swallowing) reason="stored sources may never have been written"
                Err(e) => tracing::warn!(%url, error = %e, "skipped stored sources"),
            }
        }
        // arch-lint: allow(no-error-swallowing) reason="without a project number the sources bucket cannot be named"
        Err(e) => tracing::warn!(error = %e, "skipped stored sources"),
    }

    let image = build_image(target);
    match gcloud.delete_image(&image, target.project()).await {
        Ok(()) => tracing::info!(%image, "deleted build image"),
        // arch-lint: allow(no-error-swallowing) reason="Cloud Run deploys and skipped builds leave no image"
        Err(e) => tracing::warn!(%image, error = %e, "skipped build image"),
    }

    Ok(())
}
