use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::target::Backend;

/// `.ferrule/config.json` configuration.
///
/// Every field is optional. The value is loaded once and passed explicitly to
/// the packager, the provisioners and the deployer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FerruleConfig {
    /// App name (defaults to the project directory name)
    #[serde(default)]
    pub name: Option<String>,
    /// Backend the app is deployed to
    #[serde(default)]
    pub backend: Option<Backend>,
    /// GCP project ID
    #[serde(default)]
    pub project: Option<String>,
    /// GCP region
    #[serde(default)]
    pub location: Option<String>,
    /// Source file packaged as `main.py`
    #[serde(default)]
    pub main_file: Option<PathBuf>,
    /// Extra glob patterns added to the package include list
    #[serde(default)]
    pub custom_files: Vec<String>,
    /// Function description (defaults to "created by ferrule")
    #[serde(default)]
    pub description: Option<String>,
    /// Fields merged into the Cloud Functions create request
    #[serde(default)]
    pub cloudfunction: Map<String, Value>,
    /// Extra `gcloud run deploy` flags (`key` becomes `--key`)
    #[serde(default)]
    pub cloudrun: Map<String, Value>,
    /// IAM policy bindings applied after provisioning
    #[serde(default)]
    pub bindings: Vec<Value>,
    /// Trigger handlers provisioned alongside the app
    #[serde(default)]
    pub handlers: HandlersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlersConfig {
    /// Whether the app exposes an HTTP entry point
    #[serde(default = "default_http")]
    pub http: bool,
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,
    #[serde(default)]
    pub topics: Vec<TopicConfig>,
}

/// A Cloud Scheduler job that calls the deployed endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub name: String,
    /// Cron expression
    pub schedule: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    /// Path appended to the endpoint URL
    #[serde(default)]
    pub path: Option<String>,
}

/// A Pub/Sub push subscription delivering to the deployed endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    pub topic: String,
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            http: default_http(),
            schedules: Vec::new(),
            topics: Vec::new(),
        }
    }
}

impl FerruleConfig {
    /// Path of the config file inside a project directory.
    pub fn path(project_dir: &Path) -> PathBuf {
        project_dir.join(crate::FERRULE_DIR).join("config.json")
    }

    /// Load from `.ferrule/config.json`, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = Self::path(project_dir);
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Load from an explicit file path. The file must exist.
    pub fn load_from(config_path: &Path) -> crate::Result<Self> {
        let content =
            std::fs::read_to_string(config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.to_path_buf(),
                source: e,
            })?;
        serde_json::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }
}

fn default_http() -> bool {
    true
}
