use std::sync::Arc;

use google_cloud_auth::{project::Config, token::DefaultTokenSourceProvider};
use google_cloud_token::{TokenSource, TokenSourceProvider as _};

const AUDIENCE: &str = "https://oauth2.googleapis.com/token/";
const SCOPES: [&str; 1] = ["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable holding a ready-made access token, checked before
/// Application Default Credentials.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// OAuth2 access tokens for the Google REST APIs.
#[derive(Clone)]
pub struct GoogleAuth {
    source: TokenOrigin,
}

#[derive(Clone)]
enum TokenOrigin {
    /// Application Default Credentials, refreshed by the provider.
    Default(Arc<dyn TokenSource>),
    Fixed(String),
}

impl std::fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAuth").finish_non_exhaustive()
    }
}

impl GoogleAuth {
    /// Discover credentials the way gcloud client libraries do
    /// (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud user credentials, metadata server).
    pub async fn from_environment() -> Result<Self, AuthError> {
        tracing::debug!("exchanging Google credentials for an oauth2 token source");

        let config = Config::default()
            .with_audience(AUDIENCE)
            .with_scopes(&SCOPES);
        let provider = DefaultTokenSourceProvider::new(config)
            .await
            .map_err(|e| AuthError::Credentials { source: e })?;

        Ok(Self {
            source: TokenOrigin::Default(provider.token_source()),
        })
    }

    /// Use `token` as is, e.g. the output of `gcloud auth print-access-token`.
    /// It is never refreshed.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenOrigin::Fixed(token.into()),
        }
    }

    /// A bearer token without the `Bearer ` prefix.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let token = match &self.source {
            TokenOrigin::Default(source) => source
                .token()
                .await
                .map_err(|e| AuthError::Token { source: e })?,
            TokenOrigin::Fixed(token) => token.clone(),
        };
        match token.strip_prefix("Bearer ") {
            Some(raw) => Ok(raw.to_owned()),
            None => Ok(token),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no usable Google credentials; run gcloud auth application-default login")]
    Credentials {
        source: google_cloud_auth::error::Error,
    },

    #[error("failed to obtain an access token")]
    Token {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_token_drops_bearer_prefix() {
        let auth = GoogleAuth::with_token("Bearer ya29.abc");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.abc");

        let auth = GoogleAuth::with_token("ya29.abc");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.abc");
    }
}
