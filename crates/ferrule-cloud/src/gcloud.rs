#[derive(Debug, thiserror::Error)]
pub enum GcloudError {
    #[error("gcloud CLI not found, install it from https://cloud.google.com/sdk/docs/install")]
    NotFound { source: std::io::Error },

    #[error("gcloud command failed: {args:?}\n{stderr}")]
    CommandFailed { args: Vec<String>, stderr: String },

    #[error("gcloud output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },
}

impl GcloudError {
    /// Whether gcloud reported that the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::CommandFailed { stderr, .. } => {
                stderr.contains("NOT_FOUND") || stderr.contains("not found")
            }
            _ => false,
        }
    }
}
