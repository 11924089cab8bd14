use std::time::Duration;

use ferrule_core::{DeploymentTarget, ENTRYPOINT, FerruleConfig};
use serde_json::{Map, Value, json};

use crate::api::{ApiError, Operation};
use crate::error::ProvisionError;
use crate::functions::FunctionsApi;

pub const DEFAULT_DESCRIPTION: &str = "created by ferrule";
pub const DEFAULT_RUNTIME: &str = "python37";

/// Request keys the `cloudfunction` overlay may not replace.
pub const PROTECTED_FIELDS: [&str; 4] = ["name", "entryPoint", "sourceUploadUrl", "httpsTrigger"];

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Build the create request for the function, merging the config overlay.
pub fn function_request(
    target: &DeploymentTarget,
    source_upload_url: &str,
    config: &FerruleConfig,
) -> Value {
    let description = config
        .description
        .as_deref()
        // arch-lint: allow(no-silent-result-drop) reason="Option default; the description is optional"
        .unwrap_or(DEFAULT_DESCRIPTION);

    let mut request = Map::new();
    request.insert("name".to_owned(), json!(target.function_name()));
    request.insert("description".to_owned(), json!(description));
    request.insert("entryPoint".to_owned(), json!(ENTRYPOINT));
    request.insert("sourceUploadUrl".to_owned(), json!(source_upload_url));
    request.insert("httpsTrigger".to_owned(), json!({}));
    request.insert("runtime".to_owned(), json!(DEFAULT_RUNTIME));

    for (key, value) in &config.cloudfunction {
        if PROTECTED_FIELDS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "ignoring protected cloudfunction setting");
            continue;
        }
        request.insert(key.clone(), value.clone());
    }

    Value::Object(request)
}

/// Creates (or updates) the Cloud Function from an uploaded archive.
pub struct FunctionProvisioner<'a, F: FunctionsApi> {
    api: &'a F,
    target: &'a DeploymentTarget,
    poll_interval: Duration,
}

impl<'a, F: FunctionsApi> FunctionProvisioner<'a, F> {
    pub fn new(api: &'a F, target: &'a DeploymentTarget) -> Self {
        Self {
            api,
            target,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn provision(
        &self,
        source_upload_url: &str,
        config: &FerruleConfig,
    ) -> Result<(), ProvisionError> {
        let request = function_request(self.target, source_upload_url, config);
        let parent = self.target.parent();
        let name = self.target.function_name();

        let operation = match self.api.create_function(&parent, &request).await {
            Ok(op) => op,
            Err(e) if e.is_conflict() => {
                tracing::info!(function = %name, "function exists, updating");
                self.api
                    .patch_function(&name, &request)
                    .await
                    .map_err(|e| ProvisionError::Api { source: e })?
            }
            Err(e) => return Err(ProvisionError::Api { source: e }),
        };

        self.wait(operation)
            .await
            .map_err(|e| ProvisionError::Api { source: e })?;
        tracing::info!(function = %name, "function deployed");

        if !config.bindings.is_empty() {
            self.api
                .set_iam_policy(&name, &config.bindings)
                .await
                .map_err(|e| ProvisionError::IamPolicy {
                    resource: name.clone(),
                    source: e,
                })?;
            tracing::info!(function = %name, bindings = config.bindings.len(), "IAM policy applied");
        }

        Ok(())
    }

    async fn wait(&self, mut operation: Operation) -> Result<(), ApiError> {
        while !operation.done {
            tracing::debug!(operation = %operation.name, "waiting for operation");
            tokio::time::sleep(self.poll_interval).await;
            operation = self.api.get_operation(&operation.name).await?;
        }

        match operation.error {
            Some(status) => Err(ApiError::Operation {
                name: operation.name,
                code: status.code,
                message: status.message,
            }),
            None => Ok(()),
        }
    }
}
