use std::path::Path;

use ferrule_build::DockerfileGenerator;
use ferrule_core::{CONTAINER_PORT, DeploymentTarget, ENTRYPOINT, FerruleConfig};
use serde_json::{Map, Value};

use crate::client::GcloudClient;
use crate::error::ProvisionError;
use crate::executor::GcloudExecutor;
use crate::run::RunApi;

const ALLOW_UNAUTHENTICATED: &str = "allow-unauthenticated";
const NO_ALLOW_UNAUTHENTICATED: &str = "no-allow-unauthenticated";

/// `gcloud` arguments for a source deploy of the service.
///
/// Each overlay key becomes `--key`, followed by its value when the value is
/// truthy. Services are private unless the overlay says otherwise.
pub fn run_deploy_args(
    target: &DeploymentTarget,
    source_dir: &str,
    overlay: &Map<String, Value>,
) -> Vec<String> {
    let command = format!("functions-framework,--target={ENTRYPOINT}");
    let port = CONTAINER_PORT.to_string();
    let mut args: Vec<String> = [
        "run",
        "deploy",
        target.name(),
        "--project",
        target.project(),
        "--region",
        target.location(),
        "--source",
        source_dir,
        "--command",
        command.as_str(),
        "--port",
        port.as_str(),
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .collect();

    for (key, value) in overlay {
        args.push(format!("--{key}"));
        if let Some(value) = flag_value(value) {
            args.push(value);
        }
    }

    if !overlay.contains_key(ALLOW_UNAUTHENTICATED) && !overlay.contains_key(NO_ALLOW_UNAUTHENTICATED)
    {
        args.push(format!("--{NO_ALLOW_UNAUTHENTICATED}"));
    }

    args
}

fn flag_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(map) if !map.is_empty() => Some(value.to_string()),
        _ => None,
    }
}

/// Deploys the project directory to Cloud Run through `gcloud run deploy`.
pub struct ContainerProvisioner<'a, R: RunApi, E: GcloudExecutor> {
    gcloud: &'a GcloudClient<E>,
    run: &'a R,
    target: &'a DeploymentTarget,
    project_dir: &'a Path,
}

impl<'a, R: RunApi, E: GcloudExecutor> ContainerProvisioner<'a, R, E> {
    pub fn new(
        gcloud: &'a GcloudClient<E>,
        run: &'a R,
        target: &'a DeploymentTarget,
        project_dir: &'a Path,
    ) -> Self {
        Self {
            gcloud,
            run,
            target,
            project_dir,
        }
    }

    pub async fn provision(&self, config: &FerruleConfig) -> Result<(), ProvisionError> {
        let written = DockerfileGenerator::default()
            .write_if_missing(self.project_dir)
            .map_err(|e| ProvisionError::Dockerfile { source: e })?;
        if let Some(path) = written {
            tracing::info!(path = %path.display(), "generated Dockerfile");
        }

        let source_dir = self
            .project_dir
            .to_str()
            .ok_or_else(|| ProvisionError::InvalidPath(self.project_dir.to_path_buf()))?;
        let args = run_deploy_args(self.target, source_dir, &config.cloudrun);

        if let Err(e) = self.gcloud.run_deploy(&args).await {
            let command = format!("gcloud {}", args.join(" "));
            tracing::error!(command = %command, error = %e, "gcloud run deploy failed");
            return Err(ProvisionError::CliFailed { command, source: e });
        }
        tracing::info!(service = self.target.name(), "service deployed");

        if !config.bindings.is_empty() {
            let service = self.target.service_name();
            self.run
                .set_iam_policy(&service, &config.bindings)
                .await
                .map_err(|e| ProvisionError::IamPolicy {
                    resource: service.clone(),
                    source: e,
                })?;
            tracing::info!(service = %service, bindings = config.bindings.len(), "IAM policy applied");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_values_follow_truthiness() {
        assert_eq!(flag_value(&json!("512Mi")), Some("512Mi".to_owned()));
        assert_eq!(flag_value(&json!(3)), Some("3".to_owned()));
        assert_eq!(flag_value(&json!(["a=1", "b=2"])), Some("a=1,b=2".to_owned()));
        assert_eq!(flag_value(&json!("")), None);
        assert_eq!(flag_value(&json!(0)), None);
        assert_eq!(flag_value(&json!(true)), None);
        assert_eq!(flag_value(&json!(false)), None);
        assert_eq!(flag_value(&Value::Null), None);
        assert_eq!(flag_value(&json!([])), None);
    }
}
