//! Core types and configuration for ferrule.
//!
//! This crate defines the `.ferrule/config.json` schema ([`FerruleConfig`]),
//! the resolved [`DeploymentTarget`], and shared error types.

pub mod config;
pub mod error;
pub mod target;

pub use config::{FerruleConfig, HandlersConfig, ScheduleConfig, TopicConfig};
pub use error::{Error, Result};
pub use target::{Backend, DeploymentTarget, TargetOverrides, validate_name};

/// Directory (relative to the project root) holding config and build output.
pub const FERRULE_DIR: &str = ".ferrule";

/// Symbol the hosted runtime invokes inside the packaged `main.py`.
pub const ENTRYPOINT: &str = "ferrule_entrypoint";

/// Port the container-run backend listens on.
pub const CONTAINER_PORT: u16 = 8080;
