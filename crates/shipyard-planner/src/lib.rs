//! Release planning and execution.
//!
//! [`planner::plan`] turns the active targets of one invocation into an
//! ordered graph of publish operations. [`coordinator::Coordinator`] then
//! drives that graph through a [`engine::TaskEngine`], isolating failures per
//! target branch.

pub mod cache;
pub mod coordinator;
pub mod engine;
pub mod operation;
pub mod planner;
