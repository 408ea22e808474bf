//! Publication files as the host build leaves them on disk.
//!
//! For a publication `nebula` and build directory `build`:
//!
//! ```text
//! build/publications/nebula/pom-default.xml
//! build/publications/nebula/module.json
//! build/libs/*.jar
//! ```

use std::path::{Path, PathBuf};

use shipyard_maven::pom;
use shipyard_maven::repository::Coordinates;
use shipyard_util::errors::ShipyardError;

const POM_FILE: &str = "pom-default.xml";
const METADATA_FILE: &str = "module.json";

/// One named publication and the files it is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub name: String,
    pub pom: PathBuf,
    pub metadata: PathBuf,
    /// Archives (main jar, sources, javadoc), sorted by file name.
    pub artifacts: Vec<PathBuf>,
}

impl Publication {
    /// Locate the files of publication `name` under `build_dir`.
    ///
    /// Archives are the jars under `libs` named after the publication's
    /// coordinates (`{artifactId}-{version}.jar` and its classified
    /// variants). Without a readable POM no archive is attributed; the
    /// POM generation check reports that.
    pub fn locate(build_dir: &Path, name: &str) -> miette::Result<Self> {
        let dir = build_dir.join("publications").join(name);
        let mut publication = Self {
            name: name.to_string(),
            pom: dir.join(POM_FILE),
            metadata: dir.join(METADATA_FILE),
            artifacts: Vec::new(),
        };

        let libs = build_dir.join("libs");
        if !libs.is_dir() || !publication.pom.is_file() {
            return Ok(publication);
        }
        let Ok(coords) = publication.coordinates() else {
            return Ok(publication);
        };
        let base = format!("{}-{}", coords.artifact, coords.version);
        for entry in std::fs::read_dir(&libs).map_err(ShipyardError::Io)? {
            let path = entry.map_err(ShipyardError::Io)?.path();
            let belongs = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| is_archive_of(n, &base));
            if belongs {
                publication.artifacts.push(path);
            }
        }
        publication.artifacts.sort();
        Ok(publication)
    }

    /// Coordinates declared by the publication's POM.
    pub fn coordinates(&self) -> miette::Result<Coordinates> {
        let pom = pom::read_pom(&self.pom)?;
        match (pom.group_id, pom.artifact_id, pom.version) {
            (Some(group), Some(artifact), Some(version)) => {
                Ok(Coordinates::new(group, artifact, version))
            }
            _ => Err(ShipyardError::PomParse {
                message: format!(
                    "{}: groupId, artifactId and version are required",
                    self.pom.display()
                ),
            }
            .into()),
        }
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_file()
    }

    /// Local files paired with the name each gets in the repository.
    pub fn remote_files(&self, coords: &Coordinates) -> Vec<(PathBuf, String)> {
        let base = format!("{}-{}", coords.artifact, coords.version);
        let mut files = vec![(self.pom.clone(), format!("{base}.pom"))];
        if self.has_metadata() {
            files.push((self.metadata.clone(), format!("{base}.module")));
        }
        for artifact in &self.artifacts {
            if let Some(name) = artifact.file_name() {
                files.push((artifact.clone(), name.to_string_lossy().to_string()));
            }
        }
        files
    }
}

/// `widgets-1.2.0.jar` and `widgets-1.2.0-sources.jar` belong to
/// `widgets-1.2.0`; `widgets-1.2.0.1.jar` does not.
fn is_archive_of(file_name: &str, base: &str) -> bool {
    let Some(rest) = file_name.strip_prefix(base) else {
        return false;
    };
    rest == ".jar" || (rest.starts_with('-') && rest.ends_with(".jar"))
}
