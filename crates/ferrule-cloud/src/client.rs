use crate::executor::{GcloudExecutor, RealExecutor};
use crate::gcloud::GcloudError;

/// gcloud operations client, parameterized over the executor for testability.
pub struct GcloudClient<E: GcloudExecutor = RealExecutor> {
    executor: E,
}

impl GcloudClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for GcloudClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: GcloudExecutor> GcloudClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Cloud Run ──

    /// Run `gcloud <args>` with output streamed to the terminal.
    pub async fn run_deploy(&self, args: &[String]) -> Result<(), GcloudError> {
        self.executor.exec_streaming(args).await
    }

    pub async fn service_url(
        &self,
        service_name: &str,
        project_id: &str,
        region: &str,
    ) -> Result<String, TriggerError> {
        let output = self
            .executor
            .exec(&args([
                "run",
                "services",
                "describe",
                service_name,
                "--project",
                project_id,
                "--region",
                region,
                "--format",
                "value(status.url)",
            ]))
            .await
            .map_err(|e| TriggerError::Endpoint { source: e })?;

        Ok(output.trim().to_owned())
    }

    // ── Build artifacts ──

    pub async fn get_project_number(&self, project_id: &str) -> Result<String, PurgeError> {
        let output = self
            .executor
            .exec(&args([
                "projects",
                "describe",
                project_id,
                "--format",
                "value(projectNumber)",
            ]))
            .await
            .map_err(|e| PurgeError::ProjectNumber { source: e })?;

        Ok(output.trim().to_owned())
    }

    /// Delete every object under `url` (a `gs://` wildcard).
    pub async fn delete_objects(&self, url: &str, project_id: &str) -> Result<(), PurgeError> {
        self.executor
            .exec(&args([
                "storage",
                "rm",
                "--recursive",
                url,
                "--project",
                project_id,
                "--quiet",
            ]))
            .await
            .map_err(|e| PurgeError::DeleteObjects { source: e })?;

        Ok(())
    }

    /// Delete a container image from Artifact Registry.
    pub async fn delete_image(&self, image: &str, project_id: &str) -> Result<(), PurgeError> {
        self.executor
            .exec(&args([
                "artifacts",
                "docker",
                "images",
                "delete",
                image,
                "--project",
                project_id,
                "--delete-tags",
                "--quiet",
            ]))
            .await
            .map_err(|e| PurgeError::DeleteImage { source: e })?;

        Ok(())
    }

    // ── Cloud Scheduler ──

    /// Create the HTTP job, or update it when it already exists.
    pub async fn upsert_scheduler_job(&self, job: &SchedulerJob<'_>) -> Result<(), TriggerError> {
        let exists = self
            .executor
            .exec(&args([
                "scheduler",
                "jobs",
                "describe",
                job.name,
                "--project",
                job.project_id,
                "--location",
                job.region,
            ]))
            .await
            .is_ok();

        let verb = if exists { "update" } else { "create" };
        let mut cmd = args([
            "scheduler",
            "jobs",
            verb,
            "http",
            job.name,
            "--project",
            job.project_id,
            "--location",
            job.region,
            "--schedule",
            job.schedule,
            "--uri",
            job.uri,
            "--http-method",
            job.method,
            "--quiet",
        ]);
        if let Some(tz) = job.timezone {
            cmd.push("--time-zone".to_owned());
            cmd.push(tz.to_owned());
        }

        self.executor
            .exec(&cmd)
            .await
            .map_err(|e| TriggerError::Scheduler {
                job: job.name.to_owned(),
                source: e,
            })?;

        Ok(())
    }

    pub async fn delete_scheduler_job(
        &self,
        name: &str,
        project_id: &str,
        region: &str,
    ) -> Result<(), TriggerError> {
        self.executor
            .exec(&args([
                "scheduler",
                "jobs",
                "delete",
                name,
                "--project",
                project_id,
                "--location",
                region,
                "--quiet",
            ]))
            .await
            .map_err(|e| TriggerError::Scheduler {
                job: name.to_owned(),
                source: e,
            })?;

        Ok(())
    }

    // ── Pub/Sub ──

    /// Create a push subscription unless one with the same name exists.
    pub async fn ensure_push_subscription(
        &self,
        name: &str,
        topic: &str,
        push_endpoint: &str,
        project_id: &str,
    ) -> Result<(), TriggerError> {
        let exists = self
            .executor
            .exec(&args([
                "pubsub",
                "subscriptions",
                "describe",
                name,
                "--project",
                project_id,
            ]))
            .await
            .is_ok();

        if exists {
            tracing::info!(subscription = name, "subscription already exists");
            return Ok(());
        }

        self.executor
            .exec(&args([
                "pubsub",
                "subscriptions",
                "create",
                name,
                "--topic",
                topic,
                "--push-endpoint",
                push_endpoint,
                "--project",
                project_id,
                "--quiet",
            ]))
            .await
            .map_err(|e| TriggerError::PubSub {
                subscription: name.to_owned(),
                source: e,
            })?;

        Ok(())
    }

    pub async fn delete_subscription(&self, name: &str, project_id: &str) -> Result<(), TriggerError> {
        self.executor
            .exec(&args([
                "pubsub",
                "subscriptions",
                "delete",
                name,
                "--project",
                project_id,
                "--quiet",
            ]))
            .await
            .map_err(|e| TriggerError::PubSub {
                subscription: name.to_owned(),
                source: e,
            })?;

        Ok(())
    }
}

// ── Helper ──

pub(crate) fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

/// A Cloud Scheduler HTTP job definition.
#[derive(Debug, Clone)]
pub struct SchedulerJob<'a> {
    pub name: &'a str,
    pub project_id: &'a str,
    pub region: &'a str,
    pub schedule: &'a str,
    pub timezone: Option<&'a str>,
    pub uri: &'a str,
    pub method: &'a str,
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    #[error("failed to look up project number")]
    ProjectNumber { source: GcloudError },

    #[error("failed to delete stored source archives")]
    DeleteObjects { source: GcloudError },

    #[error("failed to delete build image")]
    DeleteImage { source: GcloudError },
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("failed to resolve the deployed endpoint")]
    Endpoint { source: GcloudError },

    #[error("scheduler job '{job}' failed")]
    Scheduler { job: String, source: GcloudError },

    #[error("pub/sub subscription '{subscription}' failed")]
    PubSub {
        subscription: String,
        source: GcloudError,
    },
}

impl TriggerError {
    /// Whether the underlying gcloud call reported a missing resource.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Endpoint { source }
            | Self::Scheduler { source, .. }
            | Self::PubSub { source, .. } => source.is_not_found(),
        }
    }
}
