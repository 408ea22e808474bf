//! Detached PGP signatures for publication artifacts.

use std::path::{Path, PathBuf};

use shipyard_core::config::SigningKey;
use shipyard_util::errors::ShipyardError;
use shipyard_util::process::CommandBuilder;

const PASSPHRASE_FILE: &str = "passphrase";

/// Produces one detached signature per artifact.
pub trait Signer: Send + Sync {
    /// Sign every artifact with `key`, returning the signature paths in the
    /// same order as `artifacts`.
    fn sign(&self, artifacts: &[PathBuf], key: &SigningKey) -> miette::Result<Vec<PathBuf>>;
}

/// Signs with the `gpg` binary, using a throwaway keyring so the user's own
/// keyring is never touched.
#[derive(Debug, Clone)]
pub struct GpgSigner {
    program: String,
}

impl Default for GpgSigner {
    fn default() -> Self {
        Self {
            program: "gpg".to_string(),
        }
    }
}

impl GpgSigner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn import_key(&self, home: &Path, key: &SigningKey) -> Result<(), ShipyardError> {
        let key_file = home.join("signing-key.asc");
        std::fs::write(&key_file, key.key.as_bytes())?;
        CommandBuilder::new(&self.program)
            .arg("--batch")
            .arg("--homedir")
            .arg(home.to_string_lossy())
            .arg("--import")
            .arg(key_file.to_string_lossy())
            .exec_checked()
            .map_err(signing_error)?;
        Ok(())
    }

    /// The passphrase is read from a file in the throwaway home, never from
    /// the command line.
    fn sign_command(&self, home: &Path, artifact: &Path, signature: &Path) -> CommandBuilder {
        CommandBuilder::new(&self.program)
            .arg("--batch")
            .arg("--yes")
            .arg("--homedir")
            .arg(home.to_string_lossy())
            .args(["--pinentry-mode", "loopback"])
            .arg("--passphrase-file")
            .arg(home.join(PASSPHRASE_FILE).to_string_lossy())
            .arg("--armor")
            .arg("--detach-sign")
            .arg("--output")
            .arg(signature.to_string_lossy())
            .arg(artifact.to_string_lossy())
    }
}

impl Signer for GpgSigner {
    fn sign(&self, artifacts: &[PathBuf], key: &SigningKey) -> miette::Result<Vec<PathBuf>> {
        // tempdir creates the home with owner-only permissions
        let home = tempfile::tempdir().map_err(ShipyardError::Io)?;
        self.import_key(home.path(), key)?;
        std::fs::write(home.path().join(PASSPHRASE_FILE), key.password.as_bytes())
            .map_err(ShipyardError::Io)?;

        let mut signatures = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let signature = signature_path(artifact);
            self.sign_command(home.path(), artifact, &signature)
                .exec_checked()
                .map_err(signing_error)?;
            tracing::debug!("signed {}", artifact.display());
            signatures.push(signature);
        }
        Ok(signatures)
    }
}

/// `widgets-1.2.0.jar` is signed into `widgets-1.2.0.jar.asc`.
pub fn signature_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".asc");
    PathBuf::from(name)
}

fn signing_error(err: ShipyardError) -> ShipyardError {
    ShipyardError::Signing {
        message: err.to_string(),
    }
}
