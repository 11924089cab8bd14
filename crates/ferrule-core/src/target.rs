use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::FerruleConfig;

/// Hosting backend an app is deployed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Cloud Functions (zip upload + create request)
    #[default]
    #[serde(rename = "cloudfunction")]
    CloudFunction,
    /// Cloud Run (`gcloud run deploy --source`)
    #[serde(rename = "cloudrun")]
    CloudRun,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CloudFunction => "cloudfunction",
            Self::CloudRun => "cloudrun",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cloudfunction" => Ok(Self::CloudFunction),
            "cloudrun" => Ok(Self::CloudRun),
            other => Err(crate::Error::UnknownBackend(other.to_owned())),
        }
    }
}

/// What a deploy/destroy cycle acts on.
///
/// Resolved once before a cycle starts and never mutated afterwards; the
/// backend decides which provisioner runs.
///
/// # Examples
///
/// ```
/// use ferrule_core::{Backend, DeploymentTarget};
///
/// let target = DeploymentTarget::new("hello", "my-project", "us-central1", Backend::CloudFunction)
///     .unwrap();
/// assert_eq!(
///     target.function_name(),
///     "projects/my-project/locations/us-central1/functions/hello"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    name: String,
    project: String,
    location: String,
    backend: Backend,
}

/// Values supplied on the command line, taking precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct TargetOverrides {
    pub project: Option<String>,
    pub location: Option<String>,
    pub backend: Option<Backend>,
}

impl DeploymentTarget {
    pub fn new(
        name: &str,
        project: &str,
        location: &str,
        backend: Backend,
    ) -> crate::Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_owned(),
            project: project.to_owned(),
            location: location.to_owned(),
            backend,
        })
    }

    /// Resolve a target from overrides, then config, then environment
    /// (`GOOGLE_PROJECT`, `GOOGLE_LOCATION`).
    ///
    /// `env` is the environment lookup, `std::env::var(..).ok()` in production.
    pub fn resolve(
        config: &FerruleConfig,
        overrides: &TargetOverrides,
        default_name: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> crate::Result<Self> {
        let name = config
            .name
            .as_deref()
            // arch-lint: allow(no-silent-result-drop) reason="Option default; the caller derives the name from the project directory"
            .unwrap_or(default_name);

        let project = overrides
            .project
            .clone()
            .or_else(|| config.project.clone())
            .or_else(|| env("GOOGLE_PROJECT"))
            .ok_or(crate::Error::MissingProject)?;

        let location = overrides
            .location
            .clone()
            .or_else(|| config.location.clone())
            .or_else(|| env("GOOGLE_LOCATION"))
            .ok_or(crate::Error::MissingLocation)?;

        let backend = overrides
            .backend
            .or(config.backend)
            // arch-lint: allow(no-silent-result-drop) reason="Option default; Cloud Functions unless a backend is chosen"
            .unwrap_or_default();

        Self::new(name, &project, &location, backend)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// `projects/{project}/locations/{location}`
    pub fn parent(&self) -> String {
        format!(
            "projects/{project}/locations/{location}",
            project = self.project,
            location = self.location,
        )
    }

    /// Fully-qualified Cloud Functions resource name.
    pub fn function_name(&self) -> String {
        format!("{}/functions/{}", self.parent(), self.name)
    }

    /// Fully-qualified Cloud Run service name.
    pub fn service_name(&self) -> String {
        format!("{}/services/{}", self.parent(), self.name)
    }

    /// Public HTTPS endpoint of a deployed Cloud Function.
    pub fn function_url(&self) -> String {
        format!(
            "https://{location}-{project}.cloudfunctions.net/{name}",
            location = self.location,
            project = self.project,
            name = self.name,
        )
    }
}

/// Cloud Functions naming rules: a letter first, then letters, digits,
/// `-` or `_`, at most 63 characters.
///
/// Names that pass are also safe as a single path segment.
pub fn validate_name(name: &str) -> crate::Result<()> {
    let invalid = |reason| crate::Error::InvalidName {
        name: name.to_owned(),
        reason,
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if !first.is_ascii_alphabetic() {
        return Err(invalid("must start with a letter"));
    }
    if name.len() > 63 {
        return Err(invalid("must be at most 63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only letters, digits, '-' and '_' are allowed"));
    }
    Ok(())
}
