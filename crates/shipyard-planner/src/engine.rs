//! The seam between the coordinator and the host build engine.

use std::future::Future;

use crate::cache::StagingRepositoryCache;
use crate::operation::HostTask;

/// Executes host tasks on behalf of the coordinator.
///
/// Registration hooks let a host mirror the plan in its own task graph;
/// they default to no-ops.
pub trait TaskEngine: Send + Sync {
    fn register_task(&self, _task: &HostTask) {}

    /// Record that `task` must run after `dependency`.
    fn depends_on(&self, _task: &HostTask, _dependency: &HostTask) {}

    /// Run one task. Staging operations read and write `cache`.
    fn execute(
        &self,
        task: &HostTask,
        cache: &StagingRepositoryCache,
    ) -> impl Future<Output = miette::Result<()>> + Send;
}
