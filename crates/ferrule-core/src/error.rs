use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    // ── Target resolution ──
    #[error("no GCP project set; pass --project or set GOOGLE_PROJECT")]
    MissingProject,

    #[error("no GCP location set; pass --location or set GOOGLE_LOCATION")]
    MissingLocation,

    #[error("unknown backend '{0}', expected 'cloudfunction' or 'cloudrun'")]
    UnknownBackend(String),

    #[error("invalid app name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
}
