//! Artifact upload to Maven repositories.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use shipyard_util::errors::ShipyardError;

use crate::auth;
use crate::checksum;
use crate::repository::{Coordinates, MavenRepository};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a shared reqwest client for uploads and staging calls.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("shipyard/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            ShipyardError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// PUT raw bytes to a URL, with authentication and retries.
///
/// Server errors, timeouts and connection failures are retried; any other
/// non-success status fails immediately.
pub async fn upload_bytes(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
    data: Vec<u8>,
) -> miette::Result<()> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        let req = auth::apply_auth(client.put(url), repo).body(data.clone());

        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(());
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                return Err(ShipyardError::Publish {
                    target: repo.name.clone(),
                    message: format!("HTTP {status} uploading {url}"),
                }
                .into());
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(ShipyardError::Publish {
                    target: repo.name.clone(),
                    message: format!("Request to {url} failed: {e}"),
                }
                .into());
            }
        }
    }

    Err(ShipyardError::Publish {
        target: repo.name.clone(),
        message: format!("Failed after {MAX_RETRIES} retries for {url}: {last_err}"),
    }
    .into())
}

/// Upload one artifact file and its checksum sidecars.
///
/// Signature files (`.asc`) are uploaded like any other artifact, so they
/// get checksums of their own.
pub async fn upload_file(
    client: &Client,
    repo: &MavenRepository,
    coords: &Coordinates,
    path: &Path,
) -> miette::Result<()> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ShipyardError::Publish {
            target: repo.name.clone(),
            message: format!("{} is not a file", path.display()),
        })?;
    upload_file_as(client, repo, coords, path, &filename).await
}

/// Like [`upload_file`], storing the file under `filename` in the
/// repository (e.g. `pom-default.xml` as `widgets-1.2.0.pom`).
pub async fn upload_file_as(
    client: &Client,
    repo: &MavenRepository,
    coords: &Coordinates,
    path: &Path,
    filename: &str,
) -> miette::Result<()> {
    repo.check_protocol()?;

    let data = tokio::fs::read(path).await.map_err(ShipyardError::Io)?;
    let url = repo.file_url(coords, filename);

    tracing::info!("Uploading {filename} to {}", repo.url);
    let sums = checksum::sidecars(&data);
    upload_bytes(client, repo, &url, data).await?;

    if !checksum::is_sidecar(filename) {
        for (ext, hex) in sums {
            upload_bytes(client, repo, &format!("{url}.{ext}"), hex.into_bytes()).await?;
        }
    }
    Ok(())
}
