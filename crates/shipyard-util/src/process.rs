use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Output};

use crate::errors::ShipyardError;

/// Builder for constructing and executing external processes.
///
/// Used for tools the orchestrator shells out to, such as `gpg`.
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl CommandBuilder {
    /// Create a new builder for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory for the child process.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program name followed by its arguments, for log lines.
    ///
    /// Arguments following `--passphrase` are masked.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                parts.push("********".to_string());
                mask_next = false;
            } else {
                mask_next = arg == "--passphrase";
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }

    /// Execute the command and return its output.
    pub fn exec(&self) -> Result<Output, ShipyardError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }
        tracing::debug!("running {}", self.display());
        cmd.output().map_err(ShipyardError::from)
    }

    /// Execute the command, turning a non-zero exit status into an error
    /// carrying the captured stderr.
    pub fn exec_checked(&self) -> Result<Output, ShipyardError> {
        let output = self.exec()?;
        if output.status.success() {
            return Ok(output);
        }
        Err(ShipyardError::Generic {
            message: format!(
                "`{}` exited with {}: {}",
                self.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}
