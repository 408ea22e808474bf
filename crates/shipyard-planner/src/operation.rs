//! Publish operations and the host task names they map to.

use std::collections::BTreeSet;
use std::fmt;

/// Name of the aggregation task that runs after a fully successful release.
pub const POST_RELEASE_TASK: &str = "postRelease";

/// What a publish operation does.
///
/// Declaration order is the tie-break rank used when several operations are
/// ready at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    GeneratePom,
    GenerateMetadata,
    Sign,
    VerifyPom,
    InitializeStaging,
    Publish,
    CloseStaging,
    ReleaseStaging,
}

impl OperationKind {
    /// Position in the ready-queue tie-break.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// One node per publication rather than per target.
    pub fn is_per_publication(self) -> bool {
        matches!(
            self,
            Self::GeneratePom | Self::GenerateMetadata | Self::Sign | Self::VerifyPom
        )
    }

    /// Local steps whose failure aborts the whole release.
    pub fn is_fail_fast(self) -> bool {
        matches!(
            self,
            Self::GeneratePom | Self::GenerateMetadata | Self::VerifyPom
        )
    }

    /// Operations the `postRelease` task waits for.
    pub fn finishes_branch(self) -> bool {
        matches!(
            self,
            Self::Publish | Self::CloseStaging | Self::ReleaseStaging
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GeneratePom => "generate POM",
            Self::GenerateMetadata => "generate metadata",
            Self::Sign => "sign",
            Self::VerifyPom => "verify POM",
            Self::InitializeStaging => "initialize staging",
            Self::Publish => "publish",
            Self::CloseStaging => "close staging",
            Self::ReleaseStaging => "release staging",
        };
        f.write_str(name)
    }
}

/// Identity of an operation: its kind plus the target or publication it
/// belongs to.
///
/// The derived ordering is `(kind rank, target name, publication name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationKey {
    pub kind: OperationKind,
    pub target: Option<String>,
    pub publication: Option<String>,
}

impl OperationKey {
    pub fn for_publication(kind: OperationKind, publication: impl Into<String>) -> Self {
        Self {
            kind,
            target: None,
            publication: Some(publication.into()),
        }
    }

    pub fn for_target(kind: OperationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: Some(target.into()),
            publication: None,
        }
    }

    /// Host task name, e.g. `publishToSonatype` or `signNebulaPublication`.
    pub fn task_name(&self) -> String {
        let publication = capitalize(self.publication.as_deref().unwrap_or_default());
        let target = capitalize(self.target.as_deref().unwrap_or_default());
        match self.kind {
            OperationKind::GeneratePom => format!("generatePomFileFor{publication}Publication"),
            OperationKind::GenerateMetadata => {
                format!("generateMetadataFileFor{publication}Publication")
            }
            OperationKind::Sign => format!("sign{publication}Publication"),
            OperationKind::VerifyPom => {
                format!("verify{publication}PublicationPomForMavenCentral")
            }
            OperationKind::InitializeStaging => format!("initialize{target}StagingRepository"),
            OperationKind::Publish => format!("publishTo{target}"),
            OperationKind::CloseStaging => format!("close{target}StagingRepository"),
            OperationKind::ReleaseStaging => format!("release{target}StagingRepository"),
        }
    }

    pub fn host_task(&self) -> HostTask {
        HostTask {
            name: self.task_name(),
            kind: Some(self.kind),
            target: self.target.clone(),
            publication: self.publication.clone(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.task_name())
    }
}

/// Index of an operation in its plan's execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub usize);

/// A node of the release graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOperation {
    pub id: OperationId,
    pub key: OperationKey,
    pub predecessors: BTreeSet<OperationId>,
}

impl PublishOperation {
    pub fn kind(&self) -> OperationKind {
        self.key.kind
    }

    pub fn target(&self) -> Option<&str> {
        self.key.target.as_deref()
    }

    pub fn publication(&self) -> Option<&str> {
        self.key.publication.as_deref()
    }

    pub fn task_name(&self) -> String {
        self.key.task_name()
    }

    pub fn host_task(&self) -> HostTask {
        self.key.host_task()
    }
}

/// A named unit of work registered with the host build engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostTask {
    pub name: String,
    /// `None` for the `postRelease` aggregation task.
    pub kind: Option<OperationKind>,
    pub target: Option<String>,
    pub publication: Option<String>,
}

impl HostTask {
    pub fn post_release() -> Self {
        Self {
            name: POST_RELEASE_TASK.to_string(),
            kind: None,
            target: None,
            publication: None,
        }
    }

    pub fn is_post_release(&self) -> bool {
        self.kind.is_none()
    }
}

impl fmt::Display for HostTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
