//! Dependency planner: builds the release operation graph and its execution
//! order.
//!
//! Planning is pure. The same request always yields the same plan, with
//! ready operations ordered by `(kind rank, target name, publication name)`.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use shipyard_core::registry::Activation;
use shipyard_core::stage::ReleaseStage;
use shipyard_core::target::{ActiveTarget, InactiveTarget};
use shipyard_util::errors::ShipyardError;

use crate::operation::{HostTask, OperationId, OperationKey, OperationKind, PublishOperation};

/// Publication planned when none is named.
pub const DEFAULT_PUBLICATION: &str = "nebula";

/// Everything the planner needs to know about one invocation.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub stage: ReleaseStage,
    pub active_targets: Vec<ActiveTarget>,
    pub inactive_targets: Vec<InactiveTarget>,
    pub signing_configured: bool,
    pub publications: Vec<String>,
    /// Whether a central-style target takes part, which brings in POM
    /// verification.
    pub submits_to_central: bool,
}

impl PlanRequest {
    pub fn new(stage: ReleaseStage, activation: Activation) -> Self {
        let submits_to_central = activation.active.iter().any(|t| t.is_central);
        Self {
            stage,
            active_targets: activation.active,
            inactive_targets: activation.inactive,
            signing_configured: false,
            publications: vec![DEFAULT_PUBLICATION.to_string()],
            submits_to_central,
        }
    }

    pub fn with_signing(mut self, configured: bool) -> Self {
        self.signing_configured = configured;
        self
    }

    pub fn with_publications(mut self, publications: Vec<String>) -> Self {
        self.publications = publications;
        self
    }
}

/// An operation left out of the plan, with the reason it was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSkip {
    pub key: OperationKey,
    pub reason: String,
}

impl PlannedSkip {
    pub fn host_task(&self) -> HostTask {
        self.key.host_task()
    }
}

/// The ordered operation graph of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    stage: ReleaseStage,
    operations: Vec<PublishOperation>,
    skipped: Vec<PlannedSkip>,
}

impl Plan {
    pub fn stage(&self) -> ReleaseStage {
        self.stage
    }

    /// Operations in execution order. Every predecessor comes first.
    pub fn operations(&self) -> &[PublishOperation] {
        &self.operations
    }

    /// Operations skipped at planning time, sorted by key.
    pub fn skipped(&self) -> &[PlannedSkip] {
        &self.skipped
    }

    pub fn get(&self, id: OperationId) -> Option<&PublishOperation> {
        self.operations.get(id.0)
    }

    pub fn find(&self, key: &OperationKey) -> Option<&PublishOperation> {
        self.operations.iter().find(|op| &op.key == key)
    }

    pub fn contains(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind() == kind)
    }

    /// Operations that list `id` as a direct predecessor.
    pub fn dependents(&self, id: OperationId) -> impl Iterator<Item = &PublishOperation> {
        self.operations
            .iter()
            .filter(move |op| op.predecessors.contains(&id))
    }

    /// Host task names in execution order.
    pub fn task_names(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.task_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Build the release plan for `request`.
pub fn plan(request: &PlanRequest) -> Result<Plan, ShipyardError> {
    let mut graph = OperationGraph::default();
    let mut skipped = Vec::new();

    let mut publications: Vec<&str> = request.publications.iter().map(String::as_str).collect();
    if publications.is_empty() {
        publications.push(DEFAULT_PUBLICATION);
    }
    publications.sort_unstable();
    publications.dedup();

    let mut signs = Vec::new();
    let mut verifications = Vec::new();
    for &publication in &publications {
        let pom = graph.add(OperationKey::for_publication(OperationKind::GeneratePom, publication));
        let metadata = graph.add(OperationKey::for_publication(
            OperationKind::GenerateMetadata,
            publication,
        ));

        let verify_key = OperationKey::for_publication(OperationKind::VerifyPom, publication);
        if request.submits_to_central {
            let verify = graph.add(verify_key);
            graph.depend(verify, pom);
            verifications.push(verify);
        } else {
            skipped.push(PlannedSkip {
                key: verify_key,
                reason: format!("{} releases are not submitted to Maven Central", request.stage),
            });
        }

        let sign_key = OperationKey::for_publication(OperationKind::Sign, publication);
        if request.signing_configured {
            let sign = graph.add(sign_key);
            graph.depend(sign, pom);
            graph.depend(sign, metadata);
            signs.push(sign);
        } else {
            skipped.push(PlannedSkip {
                key: sign_key,
                reason: "signing key and/or password are not configured".to_string(),
            });
        }
    }

    let mut staged = Vec::new();
    for target in &request.active_targets {
        check_credentials(target)?;

        let publish = graph.add(OperationKey::for_target(OperationKind::Publish, &target.name));
        if target.requires_staging {
            let initialize = graph.add(OperationKey::for_target(
                OperationKind::InitializeStaging,
                &target.name,
            ));
            graph.depend(publish, initialize);
            staged.push((target.name.as_str(), publish));
        }
        for &sign in &signs {
            graph.depend(publish, sign);
        }
        for &verify in &verifications {
            graph.depend(publish, verify);
        }
    }

    for (name, publish) in staged {
        let close = graph.add(OperationKey::for_target(OperationKind::CloseStaging, name));
        graph.depend(close, publish);

        let release_key = OperationKey::for_target(OperationKind::ReleaseStaging, name);
        if request.stage == ReleaseStage::Final {
            let release = graph.add(release_key);
            graph.depend(release, close);
        } else {
            skipped.push(PlannedSkip {
                key: release_key,
                reason: format!(
                    "releasing a {} staging repository is a manual step",
                    request.stage
                ),
            });
        }
    }

    for target in &request.inactive_targets {
        let mut kinds = vec![OperationKind::Publish];
        if target.requires_staging {
            kinds.extend([
                OperationKind::InitializeStaging,
                OperationKind::CloseStaging,
                OperationKind::ReleaseStaging,
            ]);
        }
        for kind in kinds {
            skipped.push(PlannedSkip {
                key: OperationKey::for_target(kind, &target.name),
                reason: format!("target {} is inactive: {}", target.name, target.reason),
            });
        }
    }

    skipped.sort_by(|a, b| a.key.cmp(&b.key));
    skipped.dedup_by(|a, b| a.key == b.key);

    let operations = graph.into_operations()?;
    tracing::debug!(
        "planned {} operation(s) for {} release, {} skipped",
        operations.len(),
        request.stage,
        skipped.len()
    );

    Ok(Plan {
        stage: request.stage,
        operations,
        skipped,
    })
}

/// Only targets with usable credentials may be published to.
fn check_credentials(target: &ActiveTarget) -> Result<(), ShipyardError> {
    let creds = &target.credentials;
    if creds.username.trim().is_empty() || creds.password.trim().is_empty() {
        return Err(ShipyardError::Planning {
            message: format!("publish target '{}' has no credentials", target.name),
        });
    }
    Ok(())
}

/// Operation keys with "must run after" edges. An edge points from a
/// dependency to its dependent.
#[derive(Default)]
struct OperationGraph {
    graph: DiGraph<OperationKey, ()>,
    indices: HashMap<OperationKey, NodeIndex>,
}

impl OperationGraph {
    /// Add an operation, returning the existing node if it is already present.
    fn add(&mut self, key: OperationKey) -> NodeIndex {
        if let Some(&idx) = self.indices.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.indices.insert(key, idx);
        idx
    }

    /// Declare that `dependent` runs after `dependency`.
    fn depend(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        self.graph.update_edge(dependency, dependent, ());
    }

    /// Kahn's algorithm with a min-heap of ready operations.
    fn order(&self) -> Result<Vec<NodeIndex>, ShipyardError> {
        toposort(&self.graph, None).map_err(|cycle| ShipyardError::Planning {
            message: format!(
                "operation graph contains a cycle through {}",
                self.graph[cycle.node_id()]
            ),
        })?;

        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count();
                (idx, degree)
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(&OperationKey, NodeIndex)>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&idx, _)| Reverse((&self.graph[idx], idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, idx))) = ready.pop() {
            order.push(idx);
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((&self.graph[next], next)));
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            return Err(ShipyardError::Planning {
                message: "operation graph contains a cycle".to_string(),
            });
        }
        Ok(order)
    }

    fn into_operations(self) -> Result<Vec<PublishOperation>, ShipyardError> {
        let order = self.order()?;
        let ids: HashMap<NodeIndex, OperationId> = order
            .iter()
            .enumerate()
            .map(|(position, &idx)| (idx, OperationId(position)))
            .collect();

        Ok(order
            .iter()
            .enumerate()
            .map(|(position, &idx)| PublishOperation {
                id: OperationId(position),
                key: self.graph[idx].clone(),
                predecessors: self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .filter_map(|pred| ids.get(&pred).copied())
                    .collect::<BTreeSet<_>>(),
            })
            .collect())
    }
}
