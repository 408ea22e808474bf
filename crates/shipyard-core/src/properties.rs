use std::collections::BTreeMap;
use std::path::Path;

/// Properties file looked up in the project root.
pub const PROPERTIES_FILE: &str = "gradle.properties";

/// Loads a properties file (`key=value` per line, `#` or `!` comments).
///
/// The file holds release settings and secrets (repository credentials,
/// signing key, staging profile) as flat (`sonatypeUsername`) or namespaced
/// (`sonatype.username`) keys. A missing file yields an empty map.
pub fn load_properties_file(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content =
        std::fs::read_to_string(path).map_err(shipyard_util::errors::ShipyardError::Io)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(map)
}

/// Resolves settings from environment variables and properties.
///
/// Precedence is environment variable, then flat property, then namespaced
/// property. The first present value wins even if it is blank; blank results
/// are reported as absent.
#[derive(Debug, Clone, Default)]
pub struct PropertyResolver {
    env: BTreeMap<String, String>,
    properties: BTreeMap<String, String>,
}

impl PropertyResolver {
    pub fn new(env: BTreeMap<String, String>, properties: BTreeMap<String, String>) -> Self {
        Self { env, properties }
    }

    /// Snapshot the process environment once, alongside the given properties.
    pub fn from_process_env(properties: BTreeMap<String, String>) -> Self {
        Self {
            env: std::env::vars().collect(),
            properties,
        }
    }

    pub fn lookup(
        &self,
        env_var: &str,
        namespaced_property: &str,
        flat_property: &str,
    ) -> Option<String> {
        self.env
            .get(env_var)
            .or_else(|| self.properties.get(flat_property))
            .or_else(|| self.properties.get(namespaced_property))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Boolean setting; `true`/`yes`/`1` (any case) are true.
    pub fn lookup_flag(
        &self,
        env_var: &str,
        namespaced_property: &str,
        flat_property: &str,
    ) -> Option<bool> {
        self.lookup(env_var, namespaced_property, flat_property)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"))
    }

    /// Interpolate `${env:VAR}` references in a string.
    ///
    /// Unknown variables are replaced with the empty string. Substituted
    /// values are not interpolated again.
    pub fn interpolate(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${env:") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let key = &rest[start + 6..start + len];
            result.push_str(&rest[..start]);
            result.push_str(self.env.get(key).map(String::as_str).unwrap_or_default());
            rest = &rest[start + len + 1..];
        }
        result.push_str(rest);
        result
    }
}
