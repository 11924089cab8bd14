mod deploy;
mod destroy;
mod init;
mod package;

use std::path::Path;

use ferrule::Deployer;
use ferrule_cloud::auth::ACCESS_TOKEN_ENV;
use ferrule_cloud::{
    GcloudClient, GoogleAuth, HttpTransport, RestClient, RestFunctionsApi, RestRunApi,
};
use ferrule_core::{DeploymentTarget, FerruleConfig, TargetOverrides};

pub use deploy::deploy;
pub use destroy::destroy;
pub use init::init;
pub use package::package;

/// Deployer wired to the live Google APIs.
pub(crate) type LiveDeployer = Deployer<RestFunctionsApi, HttpTransport, RestRunApi>;

/// App name: `name` from config, else the project directory name.
pub(crate) fn app_name(project_dir: &Path, config: &FerruleConfig) -> anyhow::Result<String> {
    if let Some(name) = &config.name {
        return Ok(name.clone());
    }
    let absolute = std::fs::canonicalize(project_dir)?;
    absolute
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "cannot derive an app name from {}, set \"name\" in .ferrule/config.json",
                absolute.display()
            )
        })
}

pub(crate) fn resolve_target(
    project_dir: &Path,
    config: &FerruleConfig,
    overrides: &TargetOverrides,
) -> anyhow::Result<DeploymentTarget> {
    let name = app_name(project_dir, config)?;
    let target = DeploymentTarget::resolve(config, overrides, &name, |key| {
        std::env::var(key)
            // arch-lint: allow(no-silent-result-drop) reason="an unset variable falls through to MissingProject / MissingLocation"
            .ok()
    })?;
    Ok(target)
}

pub(crate) async fn live_deployer(
    target: DeploymentTarget,
    project_dir: &Path,
) -> anyhow::Result<LiveDeployer> {
    let http = reqwest::Client::new();
    let auth = match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            tracing::debug!("using access token from {ACCESS_TOKEN_ENV}");
            GoogleAuth::with_token(token.trim())
        }
        _ => GoogleAuth::from_environment().await?,
    };
    let rest = RestClient::new(http.clone(), auth);

    Ok(Deployer::new(
        target,
        project_dir,
        RestFunctionsApi::new(rest.clone()),
        HttpTransport::new(http),
        RestRunApi::new(rest),
        GcloudClient::new(),
    ))
}
