use ferrule_cloud::client::{GcloudClient, SchedulerJob, TriggerError};
use ferrule_cloud::executor::{GcloudExecutor, RealExecutor};
use ferrule_core::{Backend, DeploymentTarget, HandlersConfig};

const DEFAULT_METHOD: &str = "POST";

/// The deployed application as seen by the orchestrator.
///
/// The orchestrator provisions the backend resource; the app provisions
/// whatever hangs off it (schedules, subscriptions).
#[allow(async_fn_in_trait)]
pub trait App: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the app is invoked over HTTP. Non-HTTP apps get their code
    /// uploaded but no function created.
    fn is_http(&self) -> bool;

    /// Provision triggers. `source_upload_url` is set when a new archive was
    /// uploaded in this run.
    async fn deploy(&self, source_upload_url: Option<&str>) -> Result<(), AppError>;

    async fn destroy(&self) -> Result<(), AppError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to provision triggers for {app}")]
    Trigger { app: String, source: TriggerError },
}

/// An [`App`] whose triggers are declared in the `handlers` config section.
pub struct ManifestApp<'a, E: GcloudExecutor = RealExecutor> {
    gcloud: &'a GcloudClient<E>,
    target: &'a DeploymentTarget,
    handlers: &'a HandlersConfig,
}

impl<'a, E: GcloudExecutor> ManifestApp<'a, E> {
    pub fn new(
        gcloud: &'a GcloudClient<E>,
        target: &'a DeploymentTarget,
        handlers: &'a HandlersConfig,
    ) -> Self {
        Self {
            gcloud,
            target,
            handlers,
        }
    }

    fn trigger_name(&self, handler: &str) -> String {
        format!("{}-{handler}", self.target.name())
    }

    async fn endpoint(&self) -> Result<String, TriggerError> {
        match self.target.backend() {
            Backend::CloudFunction => Ok(self.target.function_url()),
            Backend::CloudRun => {
                self.gcloud
                    .service_url(
                        self.target.name(),
                        self.target.project(),
                        self.target.location(),
                    )
                    .await
            }
        }
    }

    fn wrap(&self, source: TriggerError) -> AppError {
        AppError::Trigger {
            app: self.target.name().to_owned(),
            source,
        }
    }
}

impl<E: GcloudExecutor> App for ManifestApp<'_, E> {
    fn name(&self) -> &str {
        self.target.name()
    }

    fn is_http(&self) -> bool {
        self.handlers.http
    }

    async fn deploy(&self, _source_upload_url: Option<&str>) -> Result<(), AppError> {
        if self.handlers.schedules.is_empty() && self.handlers.topics.is_empty() {
            return Ok(());
        }

        let endpoint = self.endpoint().await.map_err(|e| self.wrap(e))?;
        let base = endpoint.trim_end_matches('/');

        for schedule in &self.handlers.schedules {
            let name = self.trigger_name(&schedule.name);
            let path = schedule
                .path
                .as_deref()
                // arch-lint: allow(no-silent-result-drop) reason="Option default; an unset path targets the root"
                .unwrap_or("/");
            let uri = format!("{base}/{}", path.trim_start_matches('/'));
            self.gcloud
                .upsert_scheduler_job(&SchedulerJob {
                    name: &name,
                    project_id: self.target.project(),
                    region: self.target.location(),
                    schedule: &schedule.schedule,
                    timezone: schedule.timezone.as_deref(),
                    uri: &uri,
                    method: schedule
                        .method
                        .as_deref()
                        // arch-lint: allow(no-silent-result-drop) reason="Option default; scheduler jobs POST unless configured"
                        .unwrap_or(DEFAULT_METHOD),
                })
                .await
                .map_err(|e| self.wrap(e))?;
            tracing::info!(job = %name, schedule = %schedule.schedule, "scheduler job ready");
        }

        for topic in &self.handlers.topics {
            let name = self.trigger_name(&topic.name);
            self.gcloud
                .ensure_push_subscription(&name, &topic.topic, base, self.target.project())
                .await
                .map_err(|e| self.wrap(e))?;
            tracing::info!(subscription = %name, topic = %topic.topic, "push subscription ready");
        }

        Ok(())
    }

    async fn destroy(&self) -> Result<(), AppError> {
        for schedule in &self.handlers.schedules {
            let name = self.trigger_name(&schedule.name);
            let result = self
                .gcloud
                .delete_scheduler_job(&name, self.target.project(), self.target.location())
                .await;
            skip_missing(result, &name).map_err(|e| self.wrap(e))?;
        }

        for topic in &self.handlers.topics {
            let name = self.trigger_name(&topic.name);
            let result = self
                .gcloud
                .delete_subscription(&name, self.target.project())
                .await;
            skip_missing(result, &name).map_err(|e| self.wrap(e))?;
        }

        Ok(())
    }
}

fn skip_missing(result: Result<(), TriggerError>, name: &str) -> Result<(), TriggerError> {
    match result {
        Ok(()) => {
            tracing::info!(trigger = name, "deleted");
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            tracing::info!(trigger = name, "already absent");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
