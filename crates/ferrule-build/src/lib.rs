//! Source packaging, checksums, Dockerfile and scaffold generation for ferrule.
//!
//! # Deploy pipeline
//!
//! ```text
//! ferrule deploy (cloudfunction)
//!   1. Package   ── walk project dir → .ferrule/{name}.zip
//!   2. Delta     ── md5(zip) vs x-goog-hash of the deployed source
//!   3. Upload    ── generateUploadUrl + PUT
//!   4. Provision ── functions.create (or patch)
//!
//! ferrule deploy (cloudrun)
//!   1. Dockerfile ── written when neither Dockerfile nor Procfile exists
//!   2. Provision  ── gcloud run deploy --source
//! ```
//!
//! # Package contents
//!
//! - `requirements.txt` (required)
//! - the configured `mainFile`, stored as `main.py`
//! - every `*.py` file plus `customFiles` matches, outside
//!   `build/`, `docs/`, `examples/`, `test/`, `venv/` and `.ferrule/`

pub mod checksum;
pub mod dockerfile;
pub mod package;
pub mod scaffold;

pub use dockerfile::DockerfileGenerator;
pub use package::{PackageError, PackagedArtifact, Packager};
