//! Release stage classification from invocation task names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Release maturity stage of one invocation.
///
/// Variants are ordered by specificity so that `Final > Candidate > Snapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseStage {
    Snapshot,
    Candidate,
    Final,
}

impl ReleaseStage {
    /// Map a single invocation task name to the stage it requests.
    ///
    /// A leading `:` (root project path) is ignored.
    pub fn from_task_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix(':').unwrap_or(name);
        match name {
            "snapshot" | "devSnapshot" | "immutableSnapshot" => Some(Self::Snapshot),
            "candidate" => Some(Self::Candidate),
            "final" => Some(Self::Final),
            _ => None,
        }
    }

    /// Whether artifacts of this stage go to Maven Central.
    pub fn submits_to_central(self, publish_candidate_to_central: bool) -> bool {
        match self {
            Self::Final => true,
            Self::Candidate => publish_candidate_to_central,
            Self::Snapshot => false,
        }
    }
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Candidate => write!(f, "candidate"),
            Self::Final => write!(f, "final"),
        }
    }
}

/// Result of classifying one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageClassification {
    /// `None` when the invocation is not a release (e.g. a plain build).
    pub stage: Option<ReleaseStage>,
    pub publish_candidate_to_central: bool,
}

impl StageClassification {
    pub fn is_release(&self) -> bool {
        self.stage.is_some()
    }

    /// Whether the central-style target takes part in this invocation.
    pub fn submits_to_central(&self) -> bool {
        self.stage
            .is_some_and(|s| s.submits_to_central(self.publish_candidate_to_central))
    }
}

/// Determine the active release stage from the raw invocation task names.
///
/// When several stage names are present the most specific one wins.
pub fn classify<S: AsRef<str>>(
    task_names: &[S],
    publish_candidate_to_central: bool,
) -> StageClassification {
    let stage = task_names
        .iter()
        .filter_map(|t| ReleaseStage::from_task_name(t.as_ref()))
        .max();
    StageClassification {
        stage,
        publish_candidate_to_central,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_prefix_is_ignored() {
        assert_eq!(
            ReleaseStage::from_task_name(":final"),
            Some(ReleaseStage::Final)
        );
        assert_eq!(ReleaseStage::from_task_name("::final"), None);
    }

    #[test]
    fn snapshot_aliases() {
        for name in ["snapshot", "devSnapshot", ":immutableSnapshot"] {
            assert_eq!(
                ReleaseStage::from_task_name(name),
                Some(ReleaseStage::Snapshot),
                "{name}"
            );
        }
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ReleaseStage::Candidate.to_string(), "candidate");
    }
}
