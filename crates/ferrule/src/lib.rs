//! Package Python serverless apps and deploy them to Google Cloud Functions
//! or Cloud Run.
//!
//! This crate holds the deploy/destroy orchestration and re-exports the
//! sub-crates it is built on.
//!
//! | Module | Crate | Description |
//! |--------|-------|-------------|
//! | root | `ferrule-core` | Configuration and deployment target |
//! | [`build`] | `ferrule-build` | Packaging, checksums, Dockerfile, scaffold |
//! | [`cloud`] | `ferrule-cloud` | Cloud Functions / Cloud Run APIs and `gcloud` |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ferrule::cloud::{GcloudClient, GoogleAuth, HttpTransport, RestClient};
//! use ferrule::cloud::{RestFunctionsApi, RestRunApi};
//! use ferrule::{DeployOptions, Deployer, DeploymentTarget, FerruleConfig, ManifestApp, TargetOverrides};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = Path::new(".");
//! let config = FerruleConfig::load(dir)?;
//! let target = DeploymentTarget::resolve(&config, &TargetOverrides::default(), "hello", |k| {
//!     std::env::var(k).ok()
//! })?;
//!
//! let http = reqwest::Client::new();
//! let rest = RestClient::new(http.clone(), GoogleAuth::from_environment().await?);
//! let deployer = Deployer::new(
//!     target.clone(),
//!     dir,
//!     RestFunctionsApi::new(rest.clone()),
//!     HttpTransport::new(http),
//!     RestRunApi::new(rest),
//!     GcloudClient::new(),
//! );
//!
//! let gcloud = GcloudClient::new();
//! let app = ManifestApp::new(&gcloud, &target, &config.handlers);
//! deployer.deploy(&app, &DeployOptions::default(), &config).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod deployer;
pub mod error;
pub mod purge;

pub use app::{App, AppError, ManifestApp};
pub use deployer::{DeployOptions, Deployer};
pub use error::DeployError;

pub use ferrule_core::*;

/// Source packaging, checksums, Dockerfile and project scaffold.
pub mod build {
    pub use ferrule_build::*;
}

/// Cloud Functions and Cloud Run operations.
pub mod cloud {
    pub use ferrule_cloud::*;
}
