//! Maven repository layout and upload destinations.

use std::fmt;

use shipyard_core::target::{ActiveTarget, Credentials};
use shipyard_util::errors::ShipyardError;

/// `group:artifact:version` of a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl Coordinates {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// Standard Maven layout path.
    ///
    /// `com.example:widgets:1.2.0` becomes `com/example/widgets/1.2.0`
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

/// A repository artifacts are uploaded to.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    pub name: String,
    pub url: String,
    pub credentials: Option<Credentials>,
    pub allow_insecure_protocol: bool,
}

impl MavenRepository {
    /// Upload destination of an active target.
    pub fn from_target(target: &ActiveTarget) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.trim_end_matches('/').to_string(),
            credentials: Some(target.credentials.clone()),
            allow_insecure_protocol: target.allow_insecure_protocol,
        }
    }

    /// Upload destination inside an open staging repository of `target`.
    pub fn staged(target: &ActiveTarget, deploy_url: &str) -> Self {
        Self {
            url: deploy_url.trim_end_matches('/').to_string(),
            ..Self::from_target(target)
        }
    }

    /// Full URL to a file of `coords` in this repository.
    pub fn file_url(&self, coords: &Coordinates, filename: &str) -> String {
        format!("{}/{}/{}", self.url, coords.path(), filename)
    }

    /// Refuse plain-HTTP uploads unless the target allows them.
    pub fn check_protocol(&self) -> Result<(), ShipyardError> {
        if self.url.starts_with("http://") && !self.allow_insecure_protocol {
            return Err(ShipyardError::Publish {
                target: self.name.clone(),
                message: format!(
                    "{} uses an insecure protocol and the host does not allow it",
                    self.url
                ),
            });
        }
        Ok(())
    }

    /// Whether this repository has authentication configured.
    pub fn has_auth(&self) -> bool {
        self.credentials.is_some()
    }
}
