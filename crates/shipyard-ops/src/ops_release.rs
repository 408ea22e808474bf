//! Operation: run a release for the current invocation.

use std::path::Path;
use std::sync::Arc;

use shipyard_maven::upload;
use shipyard_planner::cache::StagingRepositoryCache;
use shipyard_planner::coordinator::{CancelHandle, Coordinator, ExecutionReport, Outcome};
use shipyard_planner::operation::{OperationKey, OperationKind};
use shipyard_util::progress::{status, status_error, status_warn};

use crate::engine::MavenTaskEngine;
use crate::ops_plan::{self, ReleasePlan};
use crate::publication::Publication;

/// Release the project at `project_root` if `task_names` request a release.
///
/// Returns `Ok(None)` for invocations that are not releases. Any failed
/// operation makes the whole release fail, even if some targets succeeded.
pub async fn release<S: AsRef<str>>(
    project_root: &Path,
    task_names: &[S],
) -> miette::Result<Option<ExecutionReport>> {
    let resolver = ops_plan::load_resolver(project_root)?;
    let Some(release) = ops_plan::plan_release(project_root, task_names, &resolver)? else {
        return Ok(None);
    };
    let engine = MavenTaskEngine::new(upload::build_client()?);
    execute(&release, engine, &CancelHandle::new())
        .await
        .map(Some)
}

/// Run a planned release, building the Maven engine from its settings.
///
/// `base` supplies the HTTP client and any engine overrides; targets,
/// publications and the signing key come from `release`.
pub async fn execute(
    release: &ReleasePlan,
    base: MavenTaskEngine,
    cancel: &CancelHandle,
) -> miette::Result<ExecutionReport> {
    let publications = release
        .settings
        .publications
        .iter()
        .map(|name| Publication::locate(&release.build_dir, name))
        .collect::<miette::Result<Vec<_>>>()?;

    let engine = base
        .with_targets(release.activation.active.clone())
        .with_publications(publications)
        .with_signing(release.settings.signing.clone());

    ops_plan::print_plan(release);
    let coordinator = Coordinator::new(engine, Arc::new(StagingRepositoryCache::new()))
        .with_cancel_handle(cancel.clone());
    let report = coordinator.run(&release.plan).await;
    drop_unclosed_staging(release, &coordinator, &report).await;

    for r in report.reports() {
        match &r.outcome {
            Outcome::Failed { message } => {
                status_error("Failed", &format!("{}: {message}", r.task));
            }
            Outcome::Skipped(reason) if !r.task.is_post_release() => {
                tracing::info!("{} skipped: {reason}", r.task);
            }
            _ => {}
        }
    }
    if report.is_cancelled() {
        status_warn("Cancelled", "release stopped before all tasks ran");
    } else if report.succeeded() {
        status("Released", &format!("{} release", release.plan.stage()));
    }

    report.into_result()
}

/// Staging repositories whose close did not succeed are never going to be
/// released, so they are dropped instead of lingering on the server.
async fn drop_unclosed_staging(
    release: &ReleasePlan,
    coordinator: &Coordinator<MavenTaskEngine>,
    report: &ExecutionReport,
) {
    for target in release.activation.active.iter().filter(|t| t.requires_staging) {
        let close = OperationKey::for_target(OperationKind::CloseStaging, &target.name);
        let closed = report
            .outcome(&close.task_name())
            .is_some_and(Outcome::is_succeeded);
        if !closed {
            coordinator
                .engine()
                .drop_staging(target, coordinator.cache())
                .await;
        }
    }
}
