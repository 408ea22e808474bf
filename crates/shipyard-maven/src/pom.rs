//! POM file reading: the project model fields release verification needs.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use shipyard_util::errors::ShipyardError;

/// A parsed POM (Project Object Model) file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub scm: Option<PomScm>,
    pub licenses: Vec<PomLicense>,
    pub developers: Vec<PomDeveloper>,
    pub dependencies: Vec<PomDependency>,
}

/// `<scm>` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomScm {
    pub url: Option<String>,
    pub connection: Option<String>,
}

/// A license declared in a POM file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomLicense {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// A developer declared in a POM file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDeveloper {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A direct dependency declared in a POM file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
}

impl PomDependency {
    /// `group:artifact:version` for messages.
    pub fn coordinate(&self) -> String {
        format!(
            "{}:{}:{}",
            self.group_id,
            self.artifact_id,
            self.version.as_deref().unwrap_or("")
        )
    }
}

/// Read and parse a POM file from disk.
pub fn read_pom(path: &Path) -> miette::Result<Pom> {
    let xml = std::fs::read_to_string(path).map_err(|e| ShipyardError::PomParse {
        message: format!("{}: {e}", path.display()),
    })?;
    parse_pom(&xml)
}

/// Parse a POM XML string into a `Pom` struct.
pub fn parse_pom(xml: &str) -> miette::Result<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut saw_project = false;

    let mut current_dep: Option<PomDependency> = None;
    let mut current_license: Option<PomLicense> = None;
    let mut current_developer: Option<PomDeveloper> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if path.is_empty() {
                    saw_project = tag == "project";
                }
                path.push(tag);
                text_buf.clear();

                match path_context(&path).as_str() {
                    "project>dependencies>dependency" => {
                        current_dep = Some(PomDependency::default());
                    }
                    "project>licenses>license" => current_license = Some(PomLicense::default()),
                    "project>developers>developer" => {
                        current_developer = Some(PomDeveloper::default());
                    }
                    "project>scm" => pom.scm = Some(PomScm::default()),
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path_context(&path);
                let value = Some(text_buf.clone()).filter(|v| !v.is_empty());

                match ctx.as_str() {
                    "project>groupId" => pom.group_id = value.clone(),
                    "project>artifactId" => pom.artifact_id = value.clone(),
                    "project>version" => pom.version = value.clone(),
                    "project>packaging" => pom.packaging = value.clone(),
                    "project>name" => pom.name = value.clone(),
                    "project>description" => pom.description = value.clone(),
                    "project>url" => pom.url = value.clone(),
                    "project>scm>url" => {
                        if let Some(scm) = pom.scm.as_mut() {
                            scm.url = value.clone();
                        }
                    }
                    "project>scm>connection" => {
                        if let Some(scm) = pom.scm.as_mut() {
                            scm.connection = value.clone();
                        }
                    }
                    "project>dependencies>dependency" => {
                        if let Some(dep) = current_dep.take() {
                            pom.dependencies.push(dep);
                        }
                    }
                    "project>licenses>license" => {
                        if let Some(license) = current_license.take() {
                            pom.licenses.push(license);
                        }
                    }
                    "project>developers>developer" => {
                        if let Some(dev) = current_developer.take() {
                            pom.developers.push(dev);
                        }
                    }
                    _ => {}
                }

                if let Some(dep) = current_dep.as_mut() {
                    match ctx.as_str() {
                        "project>dependencies>dependency>groupId" => {
                            dep.group_id = text_buf.clone();
                        }
                        "project>dependencies>dependency>artifactId" => {
                            dep.artifact_id = text_buf.clone();
                        }
                        "project>dependencies>dependency>version" => dep.version = value.clone(),
                        "project>dependencies>dependency>scope" => dep.scope = value.clone(),
                        _ => {}
                    }
                }

                if let Some(license) = current_license.as_mut() {
                    match ctx.as_str() {
                        "project>licenses>license>name" => license.name = value.clone(),
                        "project>licenses>license>url" => license.url = value.clone(),
                        _ => {}
                    }
                }

                if let Some(dev) = current_developer.as_mut() {
                    match ctx.as_str() {
                        "project>developers>developer>id" => dev.id = value.clone(),
                        "project>developers>developer>name" => dev.name = value.clone(),
                        "project>developers>developer>email" => dev.email = value.clone(),
                        _ => {}
                    }
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ShipyardError::PomParse {
                    message: format!("invalid XML at position {}: {e}", reader.error_position()),
                }
                .into());
            }
            _ => {}
        }
    }

    if !saw_project {
        return Err(ShipyardError::PomParse {
            message: "document has no <project> root element".to_string(),
        }
        .into());
    }

    Ok(pom)
}

/// Build a context string from the current XML path for matching.
fn path_context(path: &[String]) -> String {
    path.join(">")
}
