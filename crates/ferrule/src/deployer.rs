use std::path::PathBuf;
use std::time::Duration;

use ferrule_build::{PackagedArtifact, Packager, checksum};
use ferrule_cloud::client::GcloudClient;
use ferrule_cloud::container::ContainerProvisioner;
use ferrule_cloud::executor::{GcloudExecutor, RealExecutor};
use ferrule_cloud::function::FunctionProvisioner;
use ferrule_cloud::functions::FunctionsApi;
use ferrule_cloud::run::RunApi;
use ferrule_cloud::transport::ArtifactTransport;
use ferrule_cloud::upload::upload_artifact;
use ferrule_core::{Backend, DeploymentTarget, FerruleConfig};

use crate::app::App;
use crate::error::DeployError;
use crate::purge::purge_artifacts;

/// Flags of a single `deploy` run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// Leave the backend resource alone, only run the app step.
    pub skip_function: bool,
    /// Deploy the backend resource, skip the app step.
    pub only_function: bool,
    /// Upload even when the deployed source matches.
    pub force: bool,
}

/// Sequences packaging, upload, provisioning and the app step for one target.
pub struct Deployer<F, T, R, E: GcloudExecutor = RealExecutor> {
    functions: F,
    transport: T,
    run: R,
    gcloud: GcloudClient<E>,
    target: DeploymentTarget,
    project_dir: PathBuf,
    poll_interval: Option<Duration>,
}

impl<F, T, R, E> Deployer<F, T, R, E>
where
    F: FunctionsApi,
    T: ArtifactTransport,
    R: RunApi,
    E: GcloudExecutor,
{
    pub fn new(
        target: DeploymentTarget,
        project_dir: impl Into<PathBuf>,
        functions: F,
        transport: T,
        run: R,
        gcloud: GcloudClient<E>,
    ) -> Self {
        Self {
            functions,
            transport,
            run,
            gcloud,
            target,
            project_dir: project_dir.into(),
            poll_interval: None,
        }
    }

    /// Override the operation poll interval of the function provisioner.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }

    pub fn gcloud(&self) -> &GcloudClient<E> {
        &self.gcloud
    }

    pub async fn deploy<'a, A: App>(
        &self,
        app: &'a A,
        options: &DeployOptions,
        config: &FerruleConfig,
    ) -> Result<&'a A, DeployError> {
        let mut source_upload_url = None;

        if !options.skip_function {
            match self.target.backend() {
                Backend::CloudFunction => {
                    source_upload_url = self.deploy_function(app, options, config).await?;
                }
                Backend::CloudRun => {
                    ContainerProvisioner::new(&self.gcloud, &self.run, &self.target, &self.project_dir)
                        .provision(config)
                        .await
                        .map_err(|e| DeployError::Provision { source: e })?;
                }
            }
        }

        if !options.only_function {
            app.deploy(source_upload_url.as_deref())
                .await
                .map_err(|e| DeployError::App { source: e })?;
            tracing::info!(app = app.name(), "app deployed");
        }

        Ok(app)
    }

    async fn deploy_function<A: App>(
        &self,
        app: &A,
        options: &DeployOptions,
        config: &FerruleConfig,
    ) -> Result<Option<String>, DeployError> {
        let artifact = Packager::new(&self.project_dir, self.target.name())
            .package(config)
            .map_err(|e| DeployError::Package { source: e })?;

        if !options.force && !self.source_changed(&artifact).await? {
            tracing::info!(function = self.target.name(), "no changes detected");
            return Ok(None);
        }

        let url = upload_artifact(&self.functions, &self.transport, &self.target, &artifact)
            .await
            .map_err(|e| DeployError::Upload { source: e })?;

        if app.is_http() {
            let mut provisioner = FunctionProvisioner::new(&self.functions, &self.target);
            if let Some(interval) = self.poll_interval {
                provisioner = provisioner.with_poll_interval(interval);
            }
            provisioner
                .provision(&url, config)
                .await
                .map_err(|e| DeployError::Provision { source: e })?;
        }

        Ok(Some(url))
    }

    /// Compare the local archive digest with the deployed source's MD5.
    /// A missing function or source counts as changed.
    async fn source_changed(&self, artifact: &PackagedArtifact) -> Result<bool, DeployError> {
        let name = self.target.function_name();
        let existing = self
            .functions
            .get_function(&name)
            .await
            .map_err(|e| DeployError::Api { source: e })?;
        if existing.is_none() {
            tracing::debug!(function = %name, "no prior deployment");
            return Ok(true);
        }

        let download_url = match self.functions.generate_download_url(&name).await {
            Ok(url) => url,
            Err(e) if e.is_not_found() => return Ok(true),
            Err(e) => return Err(DeployError::Api { source: e }),
        };
        let header = match self.transport.content_hash(&download_url).await {
            Ok(header) => header,
            Err(e) if e.is_not_found() => return Ok(true),
            Err(e) => return Err(DeployError::RemoteHash { source: e }),
        };

        let local = checksum::file_digest(artifact.path()).map_err(|e| DeployError::Checksum {
            path: artifact.path().to_path_buf(),
            source: e,
        })?;

        match checksum::parse_remote_digest(&header) {
            Some(remote) => {
                tracing::debug!(%local, %remote, "source digests");
                Ok(checksum::is_changed(&local, remote))
            }
            None => Ok(true),
        }
    }

    /// Tear down the app, then the backend resource, then (with `all`) the
    /// packaging leftovers.
    pub async fn destroy<A: App>(&self, app: &A, all: bool) -> Result<(), DeployError> {
        app.destroy()
            .await
            .map_err(|e| DeployError::App { source: e })?;

        match self.target.backend() {
            Backend::CloudFunction => {
                let name = self.target.function_name();
                match self.functions.delete_function(&name).await {
                    Ok(()) => tracing::info!(function = %name, "function deleted"),
                    // arch-lint: allow(no-error-swallowing) reason="a 404 on delete means the function is already gone"
                    Err(e) if e.is_not_found() => {
                        tracing::info!(function = %name, "function already deleted");
                    }
                    Err(e) => return Err(DeployError::Api { source: e }),
                }
            }
            Backend::CloudRun => {
                let name = self.target.service_name();
                match self.run.delete_service(&name).await {
                    Ok(()) => tracing::info!(service = %name, "service deleted"),
                    // arch-lint: allow(no-error-swallowing) reason="a 404 on delete means the service is already gone"
                    Err(e) if e.is_not_found() => {
                        tracing::info!(service = %name, "service already deleted");
                    }
                    Err(e) => return Err(DeployError::Api { source: e }),
                }
            }
        }

        if all {
            purge_artifacts(&self.gcloud, &self.target, &self.project_dir).await?;
        }

        Ok(())
    }
}
