//! Shared utilities for the Shipyard release orchestrator.
//!
//! This crate provides cross-cutting concerns used by all other Shipyard
//! crates: the unified error type, process spawning, hashing, and terminal
//! status output.

pub mod errors;
pub mod hash;
pub mod process;
pub mod progress;
