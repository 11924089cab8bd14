//! Google Cloud side of a ferrule deploy: the Cloud Functions and Cloud Run
//! REST APIs, signed-URL transport and `gcloud` subprocesses.

pub mod api;
pub mod auth;
pub mod client;
pub mod container;
pub mod error;
pub mod executor;
pub mod function;
pub mod functions;
pub mod gcloud;
pub mod run;
pub mod transport;
pub mod upload;

pub use api::{ApiError, Operation, RestClient};
pub use auth::GoogleAuth;
pub use client::GcloudClient;
pub use container::ContainerProvisioner;
pub use error::{ProvisionError, UploadError};
pub use executor::GcloudExecutor;
pub use function::FunctionProvisioner;
pub use functions::{FunctionsApi, RestFunctionsApi};
pub use run::{RestRunApi, RunApi};
pub use transport::{ArtifactTransport, HttpTransport};
pub use upload::upload_artifact;
