use reqwest::Method;
use serde_json::{Value, json};

use crate::api::{ApiError, RestClient};

const RUN_API: &str = "https://run.googleapis.com/v2";

/// The subset of the Cloud Run v2 API used for deploys.
#[allow(async_fn_in_trait)]
pub trait RunApi: Send + Sync {
    /// Replace the IAM policy of a service with `bindings`.
    async fn set_iam_policy(&self, service: &str, bindings: &[Value]) -> Result<(), ApiError>;

    async fn delete_service(&self, service: &str) -> Result<(), ApiError>;
}

/// Cloud Run v2 over HTTPS.
#[derive(Debug, Clone)]
pub struct RestRunApi {
    client: RestClient,
    base_url: String,
}

impl RestRunApi {
    pub fn new(client: RestClient) -> Self {
        Self::with_base_url(client, RUN_API)
    }

    /// Target another endpoint, such as a regional endpoint or a local server.
    pub fn with_base_url(client: RestClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl RunApi for RestRunApi {
    async fn set_iam_policy(&self, service: &str, bindings: &[Value]) -> Result<(), ApiError> {
        let url = format!("{}/{service}:setIamPolicy", self.base_url);
        let body = json!({ "policy": { "bindings": bindings } });
        self.client.call(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    async fn delete_service(&self, service: &str) -> Result<(), ApiError> {
        let url = format!("{}/{service}", self.base_url);
        self.client.call(Method::DELETE, &url, None).await?;
        Ok(())
    }
}
