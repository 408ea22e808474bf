//! Maven repository protocol: POM parsing and Maven Central verification,
//! artifact upload with checksum sidecars, authentication, the Nexus staging
//! REST API, and detached PGP signatures.

pub mod auth;
pub mod checksum;
pub mod pom;
pub mod repository;
pub mod sign;
pub mod staging;
pub mod upload;
pub mod verify;
