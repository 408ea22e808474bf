use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use shipyard_core::registry::Activation;
use shipyard_core::stage::ReleaseStage;
use shipyard_core::target::{ActiveTarget, Credentials};
use shipyard_planner::cache::StagingRepositoryCache;
use shipyard_planner::coordinator::{CancelHandle, Coordinator, Outcome, SkipReason};
use shipyard_planner::engine::TaskEngine;
use shipyard_planner::operation::{HostTask, OperationKind};
use shipyard_planner::planner::{plan, Plan, PlanRequest};
use shipyard_util::errors::ShipyardError;

/// In-memory engine that records what it was asked to do and fails the
/// tasks it was told to fail.
#[derive(Default)]
struct ScriptedEngine {
    failing: HashSet<String>,
    cancel_on: Option<(String, CancelHandle)>,
    events: Mutex<Vec<String>>,
    registered: Mutex<Vec<String>>,
    edges: Mutex<Vec<(String, String)>>,
}

impl ScriptedEngine {
    fn failing(tasks: &[&str]) -> Self {
        Self {
            failing: tasks.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn executed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("end:").map(str::to_string))
            .collect()
    }
}

impl TaskEngine for ScriptedEngine {
    fn register_task(&self, task: &HostTask) {
        self.registered.lock().unwrap().push(task.name.clone());
    }

    fn depends_on(&self, task: &HostTask, dependency: &HostTask) {
        self.edges
            .lock()
            .unwrap()
            .push((task.name.clone(), dependency.name.clone()));
    }

    async fn execute(&self, task: &HostTask, cache: &StagingRepositoryCache) -> miette::Result<()> {
        self.events.lock().unwrap().push(format!("start:{}", task.name));
        tokio::task::yield_now().await;

        if task.kind == Some(OperationKind::InitializeStaging) {
            cache.get_or_insert_with("https://oss.sonatype.org/service/local/", || {
                "https://oss.sonatype.org/service/local/staging/deployByRepositoryId/r-1"
                    .to_string()
            });
        }
        if let Some((name, handle)) = &self.cancel_on {
            if name == &task.name {
                handle.cancel();
            }
        }

        self.events.lock().unwrap().push(format!("end:{}", task.name));
        if self.failing.contains(&task.name) {
            if task.kind == Some(OperationKind::VerifyPom) {
                return Err(ShipyardError::PomVerification {
                    violations: vec!["<url> must not be null or blank".to_string()],
                }
                .into());
            }
            return Err(ShipyardError::Publish {
                target: task.target.clone().unwrap_or_default(),
                message: "HTTP 502 Bad Gateway".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn creds() -> Credentials {
    Credentials::from_parts(Some("user"), Some("password")).unwrap()
}

fn internal() -> ActiveTarget {
    ActiveTarget {
        name: "internal".to_string(),
        url: "https://repo.example.com/maven-oss-releases".to_string(),
        credentials: creds(),
        requires_staging: false,
        staging_profile_id: None,
        package_group: None,
        allow_insecure_protocol: false,
        is_central: false,
    }
}

fn sonatype() -> ActiveTarget {
    ActiveTarget {
        name: "sonatype".to_string(),
        url: "https://oss.sonatype.org/service/local/".to_string(),
        credentials: creds(),
        requires_staging: true,
        staging_profile_id: Some("1a2b3c".to_string()),
        package_group: Some("com.example".to_string()),
        allow_insecure_protocol: false,
        is_central: true,
    }
}

fn final_plan() -> Plan {
    let request = PlanRequest::new(
        ReleaseStage::Final,
        Activation {
            active: vec![internal(), sonatype()],
            inactive: vec![],
        },
    )
    .with_signing(true);
    plan(&request).unwrap()
}

fn coordinator(engine: ScriptedEngine) -> Coordinator<ScriptedEngine> {
    Coordinator::new(engine, Arc::new(StagingRepositoryCache::new()))
}

#[tokio::test]
async fn successful_release_runs_everything_then_post_release() {
    let plan = final_plan();
    let coordinator = coordinator(ScriptedEngine::default());
    let report = coordinator.execute(&plan).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.outcome("postRelease"), Some(&Outcome::Succeeded));
    let executed = coordinator.engine().executed();
    assert_eq!(executed.len(), plan.len() + 1);
    assert_eq!(executed.last().map(String::as_str), Some("postRelease"));
    assert_eq!(coordinator.cache().len(), 1);
}

#[tokio::test]
async fn predecessors_finish_before_dependents_start() {
    let plan = final_plan();
    let coordinator = coordinator(ScriptedEngine::default());
    coordinator.execute(&plan).await.unwrap();

    let events = coordinator.engine().events();
    let index = |event: String| events.iter().position(|e| *e == event).unwrap();
    for op in plan.operations() {
        for pred in &op.predecessors {
            let pred_name = plan.get(*pred).unwrap().task_name();
            assert!(
                index(format!("end:{pred_name}")) < index(format!("start:{}", op.task_name())),
                "{} started before {pred_name} finished",
                op.task_name()
            );
        }
    }
}

#[tokio::test]
async fn every_task_and_edge_is_registered() {
    let plan = final_plan();
    let coordinator = coordinator(ScriptedEngine::default());
    coordinator.execute(&plan).await.unwrap();

    let registered = coordinator.engine().registered.lock().unwrap().clone();
    assert_eq!(registered.len(), plan.len() + 1);
    assert!(registered.contains(&"postRelease".to_string()));

    let edges = coordinator.engine().edges.lock().unwrap().clone();
    assert!(edges.contains(&(
        "publishToSonatype".to_string(),
        "initializeSonatypeStagingRepository".to_string()
    )));
    assert!(edges.contains(&(
        "postRelease".to_string(),
        "releaseSonatypeStagingRepository".to_string()
    )));
    assert!(edges.contains(&("postRelease".to_string(), "publishToInternal".to_string())));
}

#[tokio::test]
async fn failed_branch_does_not_stop_independent_branch() {
    let plan = final_plan();
    let coordinator = coordinator(ScriptedEngine::failing(&["publishToInternal"]));
    let report = coordinator.run(&plan).await;

    assert!(report.outcome("publishToInternal").unwrap().is_failed());
    for task in [
        "publishToSonatype",
        "closeSonatypeStagingRepository",
        "releaseSonatypeStagingRepository",
    ] {
        assert_eq!(report.outcome(task), Some(&Outcome::Succeeded), "{task}");
    }
    assert_eq!(
        report.outcome("postRelease"),
        Some(&Outcome::Skipped(SkipReason::UpstreamFailed {
            operation: "publishToInternal".to_string()
        }))
    );

    let err = report.into_result().unwrap_err();
    let failures = match err.downcast_ref::<ShipyardError>() {
        Some(ShipyardError::Composite { failures }) => failures.clone(),
        other => panic!("expected a composite error, got {other:?}"),
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, "publishToInternal");
    assert_eq!(failures[0].target.as_deref(), Some("internal"));
}

#[tokio::test]
async fn staging_failure_skips_its_whole_branch() {
    let plan = final_plan();
    let coordinator =
        coordinator(ScriptedEngine::failing(&["initializeSonatypeStagingRepository"]));
    let report = coordinator.run(&plan).await;

    let upstream = Outcome::Skipped(SkipReason::UpstreamFailed {
        operation: "initializeSonatypeStagingRepository".to_string(),
    });
    for task in [
        "publishToSonatype",
        "closeSonatypeStagingRepository",
        "releaseSonatypeStagingRepository",
    ] {
        assert_eq!(report.outcome(task), Some(&upstream), "{task}");
    }
    assert_eq!(report.outcome("publishToInternal"), Some(&Outcome::Succeeded));

    let executed = coordinator.engine().executed();
    assert!(!executed.contains(&"closeSonatypeStagingRepository".to_string()));
    assert_eq!(report.failures().len(), 1);
}

#[tokio::test]
async fn failed_verification_aborts_the_release() {
    let plan = final_plan();
    let coordinator = coordinator(ScriptedEngine::failing(&[
        "verifyNebulaPublicationPomForMavenCentral",
    ]));
    let err = coordinator.execute(&plan).await.unwrap_err();
    assert!(err
        .to_string()
        .starts_with("POM verification for Maven Central failed."));

    let executed = coordinator.engine().executed();
    assert!(!executed.iter().any(|t| t.starts_with("publishTo")));
    assert!(!executed.contains(&"postRelease".to_string()));
}

#[tokio::test]
async fn aborted_tasks_are_reported_as_aborted() {
    let plan = final_plan();
    let coordinator = coordinator(ScriptedEngine::failing(&[
        "verifyNebulaPublicationPomForMavenCentral",
    ]));
    let report = coordinator.run(&plan).await;

    assert!(report.fatal().is_some());
    for task in ["publishToInternal", "publishToSonatype", "postRelease"] {
        assert_eq!(
            report.outcome(task),
            Some(&Outcome::Skipped(SkipReason::Aborted)),
            "{task}"
        );
    }
}

#[tokio::test]
async fn cancellation_stops_remaining_waves() {
    let plan = final_plan();
    let cancel = CancelHandle::new();
    let engine = ScriptedEngine {
        cancel_on: Some(("signNebulaPublication".to_string(), cancel.clone())),
        ..ScriptedEngine::default()
    };
    let coordinator = coordinator(engine).with_cancel_handle(cancel);
    let report = coordinator.run(&plan).await;

    assert!(report.is_cancelled());
    assert!(!report.succeeded());
    for task in [
        "publishToInternal",
        "publishToSonatype",
        "closeSonatypeStagingRepository",
        "releaseSonatypeStagingRepository",
        "postRelease",
    ] {
        assert_eq!(
            report.outcome(task),
            Some(&Outcome::Skipped(SkipReason::Aborted)),
            "{task}"
        );
    }
    assert!(report.into_result().is_err());
}

#[tokio::test]
async fn planned_skips_are_reported_without_running() {
    let request = PlanRequest::new(
        ReleaseStage::Candidate,
        Activation {
            active: vec![internal()],
            inactive: vec![],
        },
    );
    let plan = plan(&request).unwrap();
    let coordinator = coordinator(ScriptedEngine::default());
    let report = coordinator.execute(&plan).await.unwrap();

    assert!(matches!(
        report.outcome("signNebulaPublication"),
        Some(Outcome::Skipped(SkipReason::Planned(_)))
    ));
    assert!(!coordinator
        .engine()
        .executed()
        .contains(&"signNebulaPublication".to_string()));
    assert_eq!(report.outcome("postRelease"), Some(&Outcome::Succeeded));
}

#[tokio::test]
async fn concurrent_staging_initialization_opens_one_repository() {
    let cache = Arc::new(StagingRepositoryCache::new());
    let opened = Arc::new(Mutex::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let opened = opened.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_try_init("https://oss.sonatype.org/service/local/", || async move {
                    *opened.lock().unwrap() += 1;
                    tokio::task::yield_now().await;
                    Ok("https://oss.sonatype.org/service/local/staging/deployByRepositoryId/r-1"
                        .to_string())
                })
                .await
        }));
    }
    for handle in handles {
        let url = handle.await.unwrap().unwrap();
        assert!(url.ends_with("/r-1"));
    }
    assert_eq!(*opened.lock().unwrap(), 1);
    assert_eq!(cache.len(), 1);
}
