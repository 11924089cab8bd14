use std::path::{Path, PathBuf};

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

/// Largest archive the upload URL accepts (100 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 104_857_600;

/// Header carrying the provider-side MD5/CRC32C digests.
pub const HASH_HEADER: &str = "x-goog-hash";

const RANGE_HEADER: &str = "x-goog-content-length-range";

/// Plain HTTP access to signed storage URLs.
#[allow(async_fn_in_trait)]
pub trait ArtifactTransport: Send + Sync {
    /// PUT the archive at `path` (exactly `size` bytes) to a signed upload URL.
    async fn put_archive(&self, url: &str, path: &Path, size: u64) -> Result<(), TransportError>;

    /// HEAD a signed download URL and return its raw `x-goog-hash` header.
    async fn content_hash(&self, url: &str) -> Result<String, TransportError>;
}

/// reqwest-backed transport. Signed URLs carry their own credentials.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl ArtifactTransport for HttpTransport {
    async fn put_archive(&self, url: &str, path: &Path, size: u64) -> Result<(), TransportError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| TransportError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "application/zip")
            .header(CONTENT_LENGTH, size)
            .header(RANGE_HEADER, format!("0,{MAX_UPLOAD_BYTES}"))
            .body(reqwest::Body::from(file))
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: redact(url),
                source: e,
            })?;

        check_status(url, response.status())
    }

    async fn content_hash(&self, url: &str) -> Result<String, TransportError> {
        let response = self
            .http
            .head(url)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: redact(url),
                source: e,
            })?;
        check_status(url, response.status())?;

        // Storage may send one header per algorithm; join them like a single
        // comma-separated value.
        let mut values = Vec::new();
        for value in response.headers().get_all(HASH_HEADER) {
            let value = value.to_str().map_err(|e| TransportError::InvalidHash {
                url: redact(url),
                source: e,
            })?;
            values.push(value);
        }
        if values.is_empty() {
            return Err(TransportError::MissingHash { url: redact(url) });
        }
        Ok(values.join(","))
    }
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            url: redact(url),
            status: status.as_u16(),
        })
    }
}

/// Signed URLs embed credentials in the query string; keep them out of errors.
fn redact(url: &str) -> String {
    url.split_once('?')
        .map_or(url, |(base, _)| base)
        .to_owned()
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("request to {url} failed")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("{url} did not report an x-goog-hash header")]
    MissingHash { url: String },

    #[error("{url} sent a non-ASCII x-goog-hash header")]
    InvalidHash {
        url: String,
        source: reqwest::header::ToStrError,
    },
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
