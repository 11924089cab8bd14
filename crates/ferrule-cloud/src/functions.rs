use reqwest::Method;
use serde_json::{Value, json};

use crate::api::{ApiError, Operation, RestClient, string_field};

const FUNCTIONS_API: &str = "https://cloudfunctions.googleapis.com/v1";

/// The subset of the Cloud Functions v1 API used for deploys.
///
/// Production code uses [`RestFunctionsApi`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait FunctionsApi: Send + Sync {
    /// The deployed function, or `None` on 404.
    async fn get_function(&self, name: &str) -> Result<Option<Value>, ApiError>;

    /// One-time signed URL the archive is PUT to.
    async fn generate_upload_url(&self, parent: &str) -> Result<String, ApiError>;

    /// Signed URL for the source archive of a deployed function.
    async fn generate_download_url(&self, name: &str) -> Result<String, ApiError>;

    async fn create_function(&self, parent: &str, body: &Value) -> Result<Operation, ApiError>;

    async fn patch_function(&self, name: &str, body: &Value) -> Result<Operation, ApiError>;

    async fn get_operation(&self, name: &str) -> Result<Operation, ApiError>;

    async fn delete_function(&self, name: &str) -> Result<(), ApiError>;

    async fn set_iam_policy(&self, name: &str, bindings: &[Value]) -> Result<(), ApiError>;
}

/// Cloud Functions v1 over HTTPS.
#[derive(Debug, Clone)]
pub struct RestFunctionsApi {
    client: RestClient,
    base_url: String,
}

impl RestFunctionsApi {
    pub fn new(client: RestClient) -> Self {
        Self::with_base_url(client, FUNCTIONS_API)
    }

    /// Target another endpoint, such as a regional endpoint or a local server.
    pub fn with_base_url(client: RestClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    async fn operation(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Operation, ApiError> {
        let value = self.client.call(method, url, body).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            url: url.to_owned(),
            source: e,
        })
    }
}

impl FunctionsApi for RestFunctionsApi {
    async fn get_function(&self, name: &str) -> Result<Option<Value>, ApiError> {
        let url = format!("{}/{name}", self.base_url);
        match self.client.call(Method::GET, &url, None).await {
            Ok(function) => Ok(Some(function)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn generate_upload_url(&self, parent: &str) -> Result<String, ApiError> {
        let url = format!("{}/{parent}/functions:generateUploadUrl", self.base_url);
        let response = self.client.call(Method::POST, &url, Some(&json!({}))).await?;
        string_field(&response, "uploadUrl", &url)
    }

    async fn generate_download_url(&self, name: &str) -> Result<String, ApiError> {
        let url = format!("{}/{name}:generateDownloadUrl", self.base_url);
        let response = self.client.call(Method::POST, &url, Some(&json!({}))).await?;
        string_field(&response, "downloadUrl", &url)
    }

    async fn create_function(&self, parent: &str, body: &Value) -> Result<Operation, ApiError> {
        let url = format!("{}/{parent}/functions", self.base_url);
        self.operation(Method::POST, &url, Some(body)).await
    }

    async fn patch_function(&self, name: &str, body: &Value) -> Result<Operation, ApiError> {
        let url = format!("{}/{name}", self.base_url);
        self.operation(Method::PATCH, &url, Some(body)).await
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, ApiError> {
        let url = format!("{}/{name}", self.base_url);
        self.operation(Method::GET, &url, None).await
    }

    async fn delete_function(&self, name: &str) -> Result<(), ApiError> {
        let url = format!("{}/{name}", self.base_url);
        self.client.call(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn set_iam_policy(&self, name: &str, bindings: &[Value]) -> Result<(), ApiError> {
        let url = format!("{}/{name}:setIamPolicy", self.base_url);
        let body = json!({ "policy": { "bindings": bindings } });
        self.client.call(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }
}
