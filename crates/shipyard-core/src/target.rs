//! Publish targets: the repositories a release is sent to.

use std::fmt;

use crate::stage::ReleaseStage;

/// Default repository names of an internal repository, per stage.
pub const SNAPSHOTS_REPOSITORY: &str = "maven-oss-snapshots";
pub const CANDIDATES_REPOSITORY: &str = "maven-oss-candidates";
pub const RELEASES_REPOSITORY: &str = "maven-oss-releases";

/// Repository that plugin projects publish every stage to.
pub const PLUGINS_REPOSITORY: &str = "gradle-plugins";

/// Sonatype OSS staging server.
pub const SONATYPE_URL: &str = "https://oss.sonatype.org/service/local/";

/// Username and password for a repository. Both are non-blank.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Build credentials only when both halves are present and non-blank.
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.trim().is_empty() && !p.trim().is_empty() => Some(Self {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Which repository name an internal target uses for each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRepositories {
    pub snapshots: Option<String>,
    pub candidates: Option<String>,
    pub releases: Option<String>,
    /// Overrides the per-stage names for every stage when set.
    pub fixed: Option<String>,
}

impl Default for StageRepositories {
    fn default() -> Self {
        Self {
            snapshots: Some(SNAPSHOTS_REPOSITORY.to_string()),
            candidates: Some(CANDIDATES_REPOSITORY.to_string()),
            releases: Some(RELEASES_REPOSITORY.to_string()),
            fixed: None,
        }
    }
}

impl StageRepositories {
    /// A layout that sends every stage to the same repository.
    pub fn fixed(name: impl Into<String>) -> Self {
        Self {
            fixed: Some(name.into()),
            ..Self::default()
        }
    }

    /// Repository name for a stage, if one is configured.
    pub fn for_stage(&self, stage: ReleaseStage) -> Option<&str> {
        if let Some(fixed) = self.fixed.as_deref() {
            return Some(fixed);
        }
        match stage {
            ReleaseStage::Snapshot => self.snapshots.as_deref(),
            ReleaseStage::Candidate => self.candidates.as_deref(),
            ReleaseStage::Final => self.releases.as_deref(),
        }
        .filter(|name| !name.trim().is_empty())
    }
}

/// Activation rules a target follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStyle {
    /// Simple upload repository; active whenever fully configured.
    Internal(StageRepositories),
    /// Maven Central via a staging server; active for final releases and
    /// opted-in candidates.
    Central,
}

/// One destination repository as configured for this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub name: String,
    pub base_url: Option<String>,
    pub credentials: Option<Credentials>,
    pub requires_staging: bool,
    pub staging_profile_id: Option<String>,
    /// Package group sent to the staging server when opening a repository.
    pub package_group: Option<String>,
    pub allow_insecure_protocol: bool,
    pub style: TargetStyle,
}

impl PublishTarget {
    /// An internal upload repository (no staging).
    pub fn internal(
        name: impl Into<String>,
        base_url: Option<String>,
        repositories: StageRepositories,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url,
            credentials,
            requires_staging: false,
            staging_profile_id: None,
            package_group: None,
            allow_insecure_protocol: false,
            style: TargetStyle::Internal(repositories),
        }
    }

    /// A Maven Central target published through a staging server.
    pub fn central(
        name: impl Into<String>,
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
        staging_profile_id: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: Some(base_url.into()),
            credentials,
            requires_staging: true,
            staging_profile_id,
            package_group: None,
            allow_insecure_protocol: false,
            style: TargetStyle::Central,
        }
    }

    pub fn with_package_group(mut self, group: Option<String>) -> Self {
        self.package_group = group;
        self
    }

    /// Resolve the insecure-protocol capability once, from the base URL and
    /// what the host supports.
    pub fn with_insecure_protocol_capability(mut self, host_supports_flag: bool) -> Self {
        self.allow_insecure_protocol = host_supports_flag
            && self
                .base_url
                .as_deref()
                .is_some_and(|u| u.starts_with("http://"));
        self
    }

    pub fn is_central(&self) -> bool {
        matches!(self.style, TargetStyle::Central)
    }
}

/// A target validated for the current stage, ready to be planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTarget {
    pub name: String,
    /// Full repository URL (internal) or staging server URL (central).
    pub url: String,
    pub credentials: Credentials,
    pub requires_staging: bool,
    pub staging_profile_id: Option<String>,
    pub package_group: Option<String>,
    pub allow_insecure_protocol: bool,
    pub is_central: bool,
}

/// A registered target that takes no part in this invocation, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveTarget {
    pub name: String,
    pub requires_staging: bool,
    pub is_central: bool,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credentials_are_absent() {
        assert!(Credentials::from_parts(Some("user"), Some("  ")).is_none());
        assert!(Credentials::from_parts(None, Some("pass")).is_none());
        assert!(Credentials::from_parts(Some("user"), Some("pass")).is_some());
    }

    #[test]
    fn debug_masks_password() {
        let creds = Credentials::from_parts(Some("user"), Some("s3cret")).unwrap();
        let shown = format!("{creds:?}");
        assert!(shown.contains("user"));
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn fixed_repository_wins_for_every_stage() {
        let repos = StageRepositories::fixed(PLUGINS_REPOSITORY);
        assert_eq!(repos.for_stage(ReleaseStage::Snapshot), Some("gradle-plugins"));
        assert_eq!(repos.for_stage(ReleaseStage::Final), Some("gradle-plugins"));
    }

    #[test]
    fn insecure_protocol_only_for_http() {
        let http = PublishTarget::internal(
            "internal",
            Some("http://repo.local".to_string()),
            StageRepositories::default(),
            None,
        )
        .with_insecure_protocol_capability(true);
        assert!(http.allow_insecure_protocol);

        let https = PublishTarget::internal(
            "internal",
            Some("https://repo.local".to_string()),
            StageRepositories::default(),
            None,
        )
        .with_insecure_protocol_capability(true);
        assert!(!https.allow_insecure_protocol);

        let unsupported = http.with_insecure_protocol_capability(false);
        assert!(!unsupported.allow_insecure_protocol);
    }
}
