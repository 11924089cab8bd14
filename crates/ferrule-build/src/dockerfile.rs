use std::path::{Path, PathBuf};

use ferrule_core::ENTRYPOINT;

/// Base image of the generated Dockerfile.
pub const DEFAULT_BASE_IMAGE: &str = "python:3.7-slim";

/// Renders the default container build file for the container-run backend.
pub struct DockerfileGenerator<'a> {
    base_image: &'a str,
    entrypoint: &'a str,
}

impl Default for DockerfileGenerator<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_IMAGE, ENTRYPOINT)
    }
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(base_image: &'a str, entrypoint: &'a str) -> Self {
        Self {
            base_image,
            entrypoint,
        }
    }

    pub fn render(&self) -> String {
        format!(
            r#"# https://hub.docker.com/_/python
FROM {base}

# Copy local code to the container image.
ENV APP_HOME /app
WORKDIR $APP_HOME
COPY . .

# Install dependencies.
RUN pip install -r requirements.txt

# Run the web service on container startup.
CMD exec functions-framework --target={entrypoint}
"#,
            base = self.base_image,
            entrypoint = self.entrypoint,
        )
    }

    /// Write the Dockerfile into `project_dir` unless a `Dockerfile` or
    /// `Procfile` is already there. Returns the path when one was written.
    pub fn write_if_missing(&self, project_dir: &Path) -> Result<Option<PathBuf>, DockerfileError> {
        if has_build_file(project_dir) {
            return Ok(None);
        }

        let path = project_dir.join("Dockerfile");
        std::fs::write(&path, self.render()).map_err(|e| DockerfileError::Write {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(path))
    }
}

/// Whether the project already provides its own container build instructions.
pub fn has_build_file(project_dir: &Path) -> bool {
    project_dir.join("Dockerfile").exists() || project_dir.join("Procfile").exists()
}

#[derive(Debug, thiserror::Error)]
pub enum DockerfileError {
    #[error("failed to write Dockerfile at {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
