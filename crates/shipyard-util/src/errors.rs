use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Shipyard operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ShipyardError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or incomplete publishing configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help(
        "Check shipyard.toml, the properties file and the SHIPYARD_* environment variables"
    ))]
    Config { message: String },

    /// A POM file could not be read or parsed.
    #[error("Error while trying to read publication POM file: {message}")]
    PomParse { message: String },

    /// A POM file does not satisfy Maven Central requirements.
    #[error(
        "POM verification for Maven Central failed.\n POM contains the following errors: \n{}",
        .violations.join("\n")
    )]
    #[diagnostic(help(
        "See https://maven.apache.org/repository/guide-central-repository-upload.html"
    ))]
    PomVerification { violations: Vec<String> },

    /// The operation graph violates a structural invariant.
    #[error("Planning failed: {message}")]
    Planning { message: String },

    /// Uploading a publication to a target failed.
    #[error("Publishing to '{target}' failed: {message}")]
    Publish { target: String, message: String },

    /// Opening, closing or releasing a staging repository failed.
    #[error("Staging repository operation for '{target}' failed: {message}")]
    Staging { target: String, message: String },

    /// Signing publication artifacts failed.
    #[error("Signing failed: {message}")]
    Signing { message: String },

    /// Network request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// One or more independent release branches failed.
    #[error("{}", render_failures(.failures))]
    Composite { failures: Vec<OperationFailure> },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// A single failed operation inside a [`ShipyardError::Composite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Host task name of the failed operation, e.g. `publishToSonatype`.
    pub operation: String,
    /// Target the operation belonged to, if any.
    pub target: Option<String>,
    pub message: String,
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} [{target}]: {}", self.operation, self.message),
            None => write!(f, "{}: {}", self.operation, self.message),
        }
    }
}

fn render_failures(failures: &[OperationFailure]) -> String {
    let mut out = format!("Release failed with {} failure(s):", failures.len());
    for failure in failures {
        out.push_str(&format!("\n  - {failure}"));
    }
    out
}

/// Convenience alias for `miette::Result<T>`.
pub type ShipyardResult<T> = miette::Result<T>;
