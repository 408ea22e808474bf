//! Maven Central POM requirements.
//!
//! See <https://maven.apache.org/repository/guide-central-repository-upload.html>.

use std::path::Path;

use shipyard_util::errors::ShipyardError;

use crate::pom::{self, Pom};

/// Every reason `pom` would be rejected by Maven Central, in document order.
pub fn violations(pom: &Pom) -> Vec<String> {
    let mut errors = Vec::new();

    if is_blank(pom.group_id.as_deref()) {
        errors.push("<groupId> must not be null or blank".to_string());
    }
    if is_blank(pom.artifact_id.as_deref()) {
        errors.push("<artifactId> must not be null or blank".to_string());
    }
    if is_blank(pom.version.as_deref()) {
        errors.push(
            "<version> must not be null or blank. Please configure a valid version in your project"
                .to_string(),
        );
    }
    if is_blank(pom.description.as_deref()) {
        errors.push("<description> must not be null or blank".to_string());
    }
    if is_blank(pom.url.as_deref()) {
        errors.push("<url> must not be null or blank".to_string());
    }
    if is_blank(pom.scm.as_ref().and_then(|s| s.url.as_deref())) {
        errors.push("<scm> url is required".to_string());
    }

    if pom.licenses.is_empty() {
        errors.push("<licenses> are required".to_string());
    }
    for (index, license) in pom.licenses.iter().enumerate() {
        if is_blank(license.name.as_deref()) || is_blank(license.url.as_deref()) {
            errors.push(format!("License {index} must have <name> and <url>"));
        }
    }

    if pom.developers.is_empty() {
        errors.push("<developers> are required".to_string());
    }
    for (index, dev) in pom.developers.iter().enumerate() {
        if is_blank(dev.name.as_deref())
            && is_blank(dev.email.as_deref())
            && is_blank(dev.id.as_deref())
        {
            errors.push(format!("Developer {index} must have one of: <name>, <email> or <id>"));
        }
    }

    for dep in &pom.dependencies {
        if dep.version.as_deref().is_some_and(is_dynamic_version) {
            errors.push(format!(
                "Dependency {} contains '+'. This is an invalid dynamic version syntax. \
                 Replace with a fixed version or a version range, e.g. [1.5,) for version 1.5 and higher",
                dep.coordinate()
            ));
        }
    }

    errors
}

/// Check `pom` against Maven Central rules, reporting all violations at once.
pub fn verify_for_central(pom: &Pom) -> Result<(), ShipyardError> {
    let violations = violations(pom);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ShipyardError::PomVerification { violations })
    }
}

/// Read a POM file and verify it for Maven Central.
pub fn verify_pom_file(path: &Path) -> miette::Result<()> {
    let pom = pom::read_pom(path)?;
    verify_for_central(&pom)?;
    tracing::debug!("{} satisfies Maven Central requirements", path.display());
    Ok(())
}

/// Gradle-style dynamic selectors (`1.+`, `+`) are not valid Maven versions.
fn is_dynamic_version(version: &str) -> bool {
    let version = version.trim();
    version == "+" || version.contains(".+")
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_versions() {
        assert!(is_dynamic_version("1.+"));
        assert!(is_dynamic_version("+"));
        assert!(is_dynamic_version("2.3.+"));
        assert!(!is_dynamic_version("[1.5,)"));
        assert!(!is_dynamic_version("1.0.0"));
    }
}
