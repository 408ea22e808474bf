//! Core data types for the Shipyard release orchestrator.
//!
//! This crate defines what a release invocation is made of: the release
//! stage, the publish targets and their activation rules, the
//! `shipyard.toml` configuration, and property resolution from the
//! environment and properties files.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod properties;
pub mod registry;
pub mod stage;
pub mod target;
