//! Execution coordinator: drives a [`Plan`] through a [`TaskEngine`].
//!
//! Operations run in waves. Every operation whose predecessors have all
//! succeeded joins the next wave, and a wave runs concurrently. A failure
//! skips its transitive dependents while independent target branches carry
//! on; failures are collected and reported together once every branch has
//! finished. Failures of local pre-publish steps (POM and metadata
//! generation, POM verification) abort the release instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use shipyard_util::errors::{OperationFailure, ShipyardError};

use crate::cache::StagingRepositoryCache;
use crate::engine::TaskEngine;
use crate::operation::HostTask;
use crate::planner::Plan;

/// Lets the host stop a running release between waves.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why an operation did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Left out at planning time.
    Planned(String),
    /// A predecessor failed; `operation` names the failure at the root.
    UpstreamFailed { operation: String },
    /// The release was cancelled or aborted by a fatal failure.
    Aborted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned(reason) => f.write_str(reason),
            Self::UpstreamFailed { operation } => write!(f, "{operation} failed"),
            Self::Aborted => f.write_str("release aborted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Skipped(SkipReason),
    Failed { message: String },
}

impl Outcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Succeeded, or skipped for a reason known before execution started.
    fn is_clean(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped(SkipReason::Planned(_)))
    }
}

/// Outcome of one host task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    pub task: HostTask,
    pub outcome: Outcome,
}

/// Outcomes of every planned, skipped and aggregation task of one release.
#[derive(Debug)]
pub struct ExecutionReport {
    reports: Vec<OperationReport>,
    fatal: Option<miette::Report>,
    cancelled: bool,
}

impl ExecutionReport {
    /// Executed operations in plan order, then planning-time skips, then
    /// `postRelease`.
    pub fn reports(&self) -> &[OperationReport] {
        &self.reports
    }

    pub fn outcome(&self, task_name: &str) -> Option<&Outcome> {
        self.reports
            .iter()
            .find(|r| r.task.name == task_name)
            .map(|r| &r.outcome)
    }

    /// Whether every task either succeeded or was skipped at planning time.
    pub fn succeeded(&self) -> bool {
        self.fatal.is_none() && !self.cancelled && self.reports.iter().all(|r| r.outcome.is_clean())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The failure that aborted the release, if any.
    pub fn fatal(&self) -> Option<&miette::Report> {
        self.fatal.as_ref()
    }

    /// Every failed task, in report order.
    pub fn failures(&self) -> Vec<OperationFailure> {
        self.reports
            .iter()
            .filter_map(|r| match &r.outcome {
                Outcome::Failed { message } => Some(OperationFailure {
                    operation: r.task.name.clone(),
                    target: r.task.target.clone(),
                    message: message.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Turn the report into an error when anything went wrong.
    ///
    /// A fatal failure is returned as is. Branch failures are aggregated into
    /// one [`ShipyardError::Composite`].
    pub fn into_result(mut self) -> miette::Result<Self> {
        if let Some(fatal) = self.fatal.take() {
            return Err(fatal);
        }
        let failures = self.failures();
        if !failures.is_empty() {
            return Err(ShipyardError::Composite { failures }.into());
        }
        if self.cancelled {
            let aborted = self
                .reports
                .iter()
                .filter(|r| r.outcome == Outcome::Skipped(SkipReason::Aborted))
                .count();
            return Err(ShipyardError::Generic {
                message: format!("Release cancelled; {aborted} task(s) did not run"),
            }
            .into());
        }
        Ok(self)
    }
}

/// Runs a plan against a task engine.
pub struct Coordinator<E> {
    engine: E,
    cache: Arc<StagingRepositoryCache>,
    cancel: CancelHandle,
}

impl<E: TaskEngine> Coordinator<E> {
    pub fn new(engine: E, cache: Arc<StagingRepositoryCache>) -> Self {
        Self {
            engine,
            cache,
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn cache(&self) -> &StagingRepositoryCache {
        &self.cache
    }

    /// Run `plan` and fail if any task failed or the release was cancelled.
    pub async fn execute(&self, plan: &Plan) -> miette::Result<ExecutionReport> {
        self.run(plan).await.into_result()
    }

    /// Run `plan`, recording every outcome without turning failures into an
    /// error.
    pub async fn run(&self, plan: &Plan) -> ExecutionReport {
        let ops = plan.operations();
        let tasks: Vec<HostTask> = ops.iter().map(|op| op.host_task()).collect();
        let post_release = HostTask::post_release();
        self.register(plan, &tasks, &post_release);

        let mut outcomes: Vec<Option<Outcome>> = vec![None; ops.len()];
        let mut fatal: Option<miette::Report> = None;

        loop {
            if fatal.is_some() || self.cancel.is_cancelled() {
                for outcome in outcomes.iter_mut().filter(|o| o.is_none()) {
                    *outcome = Some(Outcome::Skipped(SkipReason::Aborted));
                }
                break;
            }

            // Predecessors always come first, so one pass reaches every
            // transitive dependent.
            for op in ops {
                if outcomes[op.id.0].is_some() {
                    continue;
                }
                let blocked = op
                    .predecessors
                    .iter()
                    .find_map(|pred| match &outcomes[pred.0] {
                        Some(Outcome::Failed { .. }) => Some(SkipReason::UpstreamFailed {
                            operation: tasks[pred.0].name.clone(),
                        }),
                        Some(Outcome::Skipped(reason)) => Some(reason.clone()),
                        _ => None,
                    });
                if let Some(reason) = blocked {
                    tracing::info!("skipping {}: {reason}", tasks[op.id.0]);
                    outcomes[op.id.0] = Some(Outcome::Skipped(reason));
                }
            }

            let wave: Vec<usize> = ops
                .iter()
                .filter(|op| {
                    outcomes[op.id.0].is_none()
                        && op
                            .predecessors
                            .iter()
                            .all(|pred| matches!(outcomes[pred.0], Some(Outcome::Succeeded)))
                })
                .map(|op| op.id.0)
                .collect();
            if wave.is_empty() {
                break;
            }

            let results = join_all(wave.iter().map(|&i| self.run_task(&tasks[i]))).await;
            for (&i, result) in wave.iter().zip(results) {
                match result {
                    Ok(()) => outcomes[i] = Some(Outcome::Succeeded),
                    Err(err) => {
                        tracing::warn!("{} failed: {err}", tasks[i]);
                        outcomes[i] = Some(Outcome::Failed {
                            message: err.to_string(),
                        });
                        if ops[i].kind().is_fail_fast() && fatal.is_none() {
                            fatal = Some(err);
                        }
                    }
                }
            }
        }

        let cancelled = self.cancel.is_cancelled();
        let mut reports: Vec<OperationReport> = tasks
            .into_iter()
            .zip(outcomes)
            .map(|(task, outcome)| OperationReport {
                task,
                outcome: outcome.unwrap_or(Outcome::Skipped(SkipReason::Aborted)),
            })
            .collect();

        for skip in plan.skipped() {
            tracing::info!("skipping {}: {}", skip.key, skip.reason);
            reports.push(OperationReport {
                task: skip.host_task(),
                outcome: Outcome::Skipped(SkipReason::Planned(skip.reason.clone())),
            });
        }

        let post_outcome = if fatal.is_some() || cancelled {
            Outcome::Skipped(SkipReason::Aborted)
        } else if let Some(failed) = reports.iter().find(|r| !r.outcome.is_clean()) {
            let operation = match &failed.outcome {
                Outcome::Skipped(SkipReason::UpstreamFailed { operation }) => operation.clone(),
                _ => failed.task.name.clone(),
            };
            Outcome::Skipped(SkipReason::UpstreamFailed { operation })
        } else {
            match self.run_task(&post_release).await {
                Ok(()) => Outcome::Succeeded,
                Err(err) => Outcome::Failed {
                    message: err.to_string(),
                },
            }
        };
        reports.push(OperationReport {
            task: post_release,
            outcome: post_outcome,
        });

        ExecutionReport {
            reports,
            fatal,
            cancelled,
        }
    }

    fn register(&self, plan: &Plan, tasks: &[HostTask], post_release: &HostTask) {
        for task in tasks {
            self.engine.register_task(task);
        }
        self.engine.register_task(post_release);

        for op in plan.operations() {
            for pred in &op.predecessors {
                self.engine.depends_on(&tasks[op.id.0], &tasks[pred.0]);
            }
            if op.kind().finishes_branch() {
                self.engine.depends_on(post_release, &tasks[op.id.0]);
            }
        }
    }

    async fn run_task(&self, task: &HostTask) -> miette::Result<()> {
        tracing::info!("running {task}");
        self.engine.execute(task, &self.cache).await
    }
}
