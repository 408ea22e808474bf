use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shipyard_util::errors::ShipyardError;

use crate::properties::PropertyResolver;
use crate::registry::TargetRegistry;
use crate::target::{
    Credentials, PublishTarget, StageRepositories, PLUGINS_REPOSITORY, SONATYPE_URL,
};

/// Default configuration file name, looked up in the project root.
pub const CONFIG_FILE: &str = "shipyard.toml";

/// Project release configuration loaded from `shipyard.toml`.
///
/// Values set here are explicit and win over anything resolved from the
/// environment or properties files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipyardConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub publishing: PublishingConfig,

    #[serde(default)]
    pub capabilities: HostCapabilities,
}

/// `[project]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Maven group of the project, e.g. `com.example.tools`.
    #[serde(default)]
    pub group: Option<String>,
    /// Publications to sign, verify and upload.
    #[serde(default = "default_publications")]
    pub publications: Vec<String>,
    /// Plugin projects publish every stage to the plugins repository.
    #[serde(default)]
    pub plugin: bool,
    /// Where the host build leaves generated POMs, metadata and archives.
    #[serde(default = "default_build_dir", rename = "build-dir")]
    pub build_dir: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            group: None,
            publications: default_publications(),
            plugin: false,
            build_dir: default_build_dir(),
        }
    }
}

fn default_publications() -> Vec<String> {
    vec!["nebula".to_string()]
}

fn default_build_dir() -> String {
    "build".to_string()
}

/// `[publishing]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PublishingConfig {
    #[serde(default)]
    pub package_group: Option<String>,
    #[serde(default)]
    pub staging_profile_id: Option<String>,
    #[serde(default)]
    pub internal_name: Option<String>,
    #[serde(default)]
    pub internal_base_url: Option<String>,
    #[serde(default)]
    pub internal_repository: Option<String>,
    #[serde(default)]
    pub internal_username: Option<String>,
    #[serde(default)]
    pub internal_password: Option<String>,
    #[serde(default)]
    pub central_name: Option<String>,
    #[serde(default)]
    pub sonatype_url: Option<String>,
    #[serde(default)]
    pub sonatype_username: Option<String>,
    #[serde(default)]
    pub sonatype_password: Option<String>,
    #[serde(default)]
    pub signing_key: Option<String>,
    #[serde(default)]
    pub signing_password: Option<String>,
    #[serde(default)]
    pub publish_candidate_to_central: Option<bool>,
}

/// `[capabilities]` table: what the embedding host supports, resolved once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostCapabilities {
    /// Host can mark a repository as allowed over plain `http://`.
    #[serde(default = "default_insecure_protocol")]
    pub insecure_protocol: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            insecure_protocol: default_insecure_protocol(),
        }
    }
}

fn default_insecure_protocol() -> bool {
    true
}

impl ShipyardConfig {
    /// Load `shipyard.toml` from `path`, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ShipyardError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            ShipyardError::Config {
                message: format!("Failed to parse {CONFIG_FILE}: {e}"),
            }
            .into()
        })
    }
}

/// In-memory PGP key and its passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub key: String,
    pub password: String,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key", &"<redacted>")
            .field("password", &"********")
            .finish()
    }
}

/// Fully resolved release settings for one invocation.
#[derive(Debug, Clone)]
pub struct PublishingSettings {
    pub publications: Vec<String>,
    pub package_group: Option<String>,
    pub staging_profile_id: Option<String>,
    pub internal_name: String,
    pub internal_base_url: Option<String>,
    pub internal_repository: Option<String>,
    pub internal_credentials: Option<Credentials>,
    pub central_name: String,
    pub sonatype_url: String,
    pub sonatype_credentials: Option<Credentials>,
    pub signing: Option<SigningKey>,
    pub publish_candidate_to_central: bool,
    pub insecure_protocol_capability: bool,
}

impl PublishingSettings {
    /// Merge explicit configuration with values resolved from the
    /// environment and properties.
    pub fn resolve(config: &ShipyardConfig, resolver: &PropertyResolver) -> Self {
        let p = &config.publishing;
        let explicit = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| resolver.interpolate(v))
                .filter(|v| !v.trim().is_empty())
        };

        let package_group = explicit(&p.package_group)
            .or_else(|| {
                resolver.lookup(
                    "SHIPYARD_SONATYPE_PACKAGE_GROUP",
                    "sonatype.packageGroup",
                    "sonatypePackageGroup",
                )
            })
            .or_else(|| config.project.group.as_deref().and_then(default_package_group));

        let staging_profile_id = explicit(&p.staging_profile_id).or_else(|| {
            resolver.lookup(
                "SHIPYARD_SONATYPE_STAGING_PROFILE_ID",
                "sonatype.stagingProfileId",
                "sonatypeStagingProfileId",
            )
        });

        let internal_base_url = explicit(&p.internal_base_url).or_else(|| {
            resolver.lookup(
                "SHIPYARD_REPOSITORY_BASE_URL",
                "internal.repositoryBaseUrl",
                "internalRepositoryBaseUrl",
            )
        });
        let internal_repository = explicit(&p.internal_repository).or_else(|| {
            config
                .project
                .plugin
                .then(|| PLUGINS_REPOSITORY.to_string())
        });
        let internal_username = explicit(&p.internal_username).or_else(|| {
            resolver.lookup(
                "SHIPYARD_REPO_USERNAME",
                "internal.username",
                "internalUsername",
            )
        });
        let internal_password = explicit(&p.internal_password).or_else(|| {
            resolver.lookup(
                "SHIPYARD_REPO_PASSWORD",
                "internal.password",
                "internalPassword",
            )
        });

        let sonatype_username = explicit(&p.sonatype_username).or_else(|| {
            resolver.lookup(
                "SHIPYARD_SONATYPE_USERNAME",
                "sonatype.username",
                "sonatypeUsername",
            )
        });
        let sonatype_password = explicit(&p.sonatype_password).or_else(|| {
            resolver.lookup(
                "SHIPYARD_SONATYPE_PASSWORD",
                "sonatype.password",
                "sonatypePassword",
            )
        });

        let signing_key = explicit(&p.signing_key).or_else(|| {
            resolver.lookup("SHIPYARD_SIGNING_KEY", "sonatype.signingKey", "signingKey")
        });
        let signing_password = explicit(&p.signing_password).or_else(|| {
            resolver.lookup(
                "SHIPYARD_SIGNING_PASSWORD",
                "sonatype.signingPassword",
                "signingPassword",
            )
        });
        let signing = match (signing_key, signing_password) {
            (Some(key), Some(password)) => Some(SigningKey { key, password }),
            _ => None,
        };

        let publish_candidate_to_central = p
            .publish_candidate_to_central
            .or_else(|| {
                resolver.lookup_flag(
                    "SHIPYARD_PUBLISH_CANDIDATE_TO_CENTRAL",
                    "sonatype.publishCandidates",
                    "publishCandidatesToMavenCentral",
                )
            })
            .unwrap_or(false);

        Self {
            publications: config.project.publications.clone(),
            package_group,
            staging_profile_id,
            internal_name: explicit(&p.internal_name).unwrap_or_else(|| "internal".to_string()),
            internal_base_url,
            internal_repository,
            internal_credentials: Credentials::from_parts(
                internal_username.as_deref(),
                internal_password.as_deref(),
            ),
            central_name: explicit(&p.central_name).unwrap_or_else(|| "sonatype".to_string()),
            sonatype_url: explicit(&p.sonatype_url).unwrap_or_else(|| SONATYPE_URL.to_string()),
            sonatype_credentials: Credentials::from_parts(
                sonatype_username.as_deref(),
                sonatype_password.as_deref(),
            ),
            signing,
            publish_candidate_to_central,
            insecure_protocol_capability: config.capabilities.insecure_protocol,
        }
    }

    /// The internal and central targets described by these settings.
    pub fn targets(&self) -> Vec<PublishTarget> {
        let repositories = match &self.internal_repository {
            Some(fixed) => StageRepositories::fixed(fixed.clone()),
            None => StageRepositories::default(),
        };
        let internal = PublishTarget::internal(
            self.internal_name.clone(),
            self.internal_base_url.clone(),
            repositories,
            self.internal_credentials.clone(),
        )
        .with_insecure_protocol_capability(self.insecure_protocol_capability);

        let central = PublishTarget::central(
            self.central_name.clone(),
            self.sonatype_url.clone(),
            self.sonatype_credentials.clone(),
            self.staging_profile_id.clone(),
        )
        .with_package_group(self.package_group.clone());

        vec![internal, central]
    }

    /// Register every configured target in a fresh registry.
    pub fn registry(&self) -> Result<TargetRegistry, ShipyardError> {
        let mut registry = TargetRegistry::new();
        for target in self.targets() {
            registry.register(target)?;
        }
        Ok(registry)
    }
}

/// First two segments of a Maven group: `com.example.tools` -> `com.example`.
fn default_package_group(group: &str) -> Option<String> {
    let group = group
        .split('.')
        .filter(|s| !s.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(".");
    (!group.is_empty()).then_some(group)
}
