//! Nexus staging REST API: open, close and release staging repositories.
//!
//! A staging repository is opened once per invocation for a staging profile,
//! artifacts are deployed into it by repository id, and it is then closed
//! (validated by the server) and released (promoted to Maven Central).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shipyard_core::target::Credentials;
use shipyard_util::errors::ShipyardError;

use crate::auth;

/// Polling schedule while the server transitions a repository.
const SETTLE_ATTEMPTS: u32 = 60;
const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Envelope the staging API wraps every request and response in.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub staged_repository_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub staged_repository_ids: Vec<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_drop_after_release: Option<bool>,
}

/// State of a staging repository as reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryState {
    pub repository_id: String,
    /// `open`, `closed` or `released`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transitioning: bool,
}

/// Client for one staging server.
#[derive(Debug, Clone)]
pub struct StagingClient {
    client: Client,
    target: String,
    server_url: String,
    credentials: Credentials,
    settle_delay: Duration,
}

impl StagingClient {
    pub fn new(
        client: Client,
        target: impl Into<String>,
        server_url: &str,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            target: target.into(),
            server_url: server_url.trim_end_matches('/').to_string(),
            credentials,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Override the delay between state polls.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Open a staging repository under `profile_id`; returns its id.
    pub async fn start(&self, profile_id: &str, description: &str) -> miette::Result<String> {
        let url = format!("{}/staging/profiles/{profile_id}/start", self.server_url);
        let body = Envelope {
            data: StartRequest {
                description: description.to_string(),
            },
        };
        let resp: Envelope<StartResponse> = self.post_json(&url, &body).await?;
        tracing::info!(
            "Opened staging repository {} on {}",
            resp.data.staged_repository_id,
            self.server_url
        );
        Ok(resp.data.staged_repository_id)
    }

    /// URL artifacts are deployed to for an open staging repository.
    pub fn deploy_url(&self, repository_id: &str) -> String {
        deploy_url(&self.server_url, repository_id)
    }

    /// Close a staging repository and wait until the server reports it closed.
    pub async fn close(&self, repository_id: &str, description: &str) -> miette::Result<()> {
        self.bulk("close", repository_id, description, None).await?;
        self.wait_for(repository_id, "closed").await
    }

    /// Release (promote) a closed staging repository.
    pub async fn release(&self, repository_id: &str, description: &str) -> miette::Result<()> {
        self.bulk("promote", repository_id, description, Some(true)).await?;
        self.wait_for(repository_id, "released").await
    }

    /// Drop a staging repository that will not be released.
    pub async fn drop_repository(
        &self,
        repository_id: &str,
        description: &str,
    ) -> miette::Result<()> {
        self.bulk("drop", repository_id, description, None).await
    }

    pub async fn state(&self, repository_id: &str) -> miette::Result<RepositoryState> {
        let url = format!("{}/staging/repository/{repository_id}", self.server_url);
        let req = auth::apply_credentials(self.client.get(&url), &self.credentials)
            .header(reqwest::header::ACCEPT, "application/json");
        let resp = req.send().await.map_err(|e| self.error(format!("GET {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.error(format!("HTTP {status} from {url}")).into());
        }
        resp.json::<RepositoryState>()
            .await
            .map_err(|e| self.error(format!("unexpected response from {url}: {e}")).into())
    }

    async fn bulk(
        &self,
        action: &str,
        repository_id: &str,
        description: &str,
        auto_drop_after_release: Option<bool>,
    ) -> miette::Result<()> {
        let url = format!("{}/staging/bulk/{action}", self.server_url);
        let body = Envelope {
            data: BulkRequest {
                staged_repository_ids: vec![repository_id.to_string()],
                description: description.to_string(),
                auto_drop_after_release,
            },
        };
        let req = auth::apply_credentials(self.client.post(&url), &self.credentials).json(&body);
        let resp = req
            .send()
            .await
            .map_err(|e| self.error(format!("POST {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.error(format!("HTTP {status} from {url}")).into());
        }
        tracing::info!("Requested {action} of staging repository {repository_id}");
        Ok(())
    }

    async fn wait_for(&self, repository_id: &str, kind: &str) -> miette::Result<()> {
        for attempt in 0..SETTLE_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(self.settle_delay).await;
            }
            let state = self.state(repository_id).await?;
            if !state.transitioning && state.kind == kind {
                return Ok(());
            }
            tracing::debug!(
                "staging repository {repository_id} is {} (transitioning: {})",
                state.kind,
                state.transitioning
            );
        }
        Err(self
            .error(format!(
                "staging repository {repository_id} did not become {kind} after {SETTLE_ATTEMPTS} checks"
            ))
            .into())
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> miette::Result<R> {
        let req = auth::apply_credentials(self.client.post(url), &self.credentials)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        let resp = req
            .send()
            .await
            .map_err(|e| self.error(format!("POST {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.error(format!("HTTP {status} from {url}")).into());
        }
        resp.json::<R>()
            .await
            .map_err(|e| self.error(format!("unexpected response from {url}: {e}")).into())
    }

    fn error(&self, message: String) -> ShipyardError {
        ShipyardError::Staging {
            target: self.target.clone(),
            message,
        }
    }
}

/// `{server}/staging/deployByRepositoryId/{id}`
pub fn deploy_url(server_url: &str, repository_id: &str) -> String {
    format!(
        "{}/staging/deployByRepositoryId/{repository_id}",
        server_url.trim_end_matches('/')
    )
}

/// Extract the repository id back out of a deploy URL.
pub fn repository_id_from_deploy_url(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit_once("/staging/deployByRepositoryId/")
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_url_round_trip() {
        let url = deploy_url("https://oss.sonatype.org/service/local/", "comexample-1001");
        assert_eq!(
            url,
            "https://oss.sonatype.org/service/local/staging/deployByRepositoryId/comexample-1001"
        );
        assert_eq!(repository_id_from_deploy_url(&url), Some("comexample-1001"));
        assert_eq!(repository_id_from_deploy_url("https://repo.local/releases"), None);
    }

    #[test]
    fn start_request_body() {
        let body = Envelope {
            data: StartRequest {
                description: "com.example release".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"data":{"description":"com.example release"}}"#
        );
    }

    #[test]
    fn bulk_promote_body() {
        let body = Envelope {
            data: BulkRequest {
                staged_repository_ids: vec!["comexample-1001".to_string()],
                description: "release".to_string(),
                auto_drop_after_release: Some(true),
            },
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"data":{"stagedRepositoryIds":["comexample-1001"],"description":"release","autoDropAfterRelease":true}}"#
        );
    }

    #[test]
    fn parse_start_response_and_state() {
        let resp: Envelope<StartResponse> =
            serde_json::from_str(r#"{"data":{"stagedRepositoryId":"comexample-1001","description":"x"}}"#)
                .unwrap();
        assert_eq!(resp.data.staged_repository_id, "comexample-1001");

        let state: RepositoryState = serde_json::from_str(
            r#"{"repositoryId":"comexample-1001","type":"closed","transitioning":false,"profileId":"abc"}"#,
        )
        .unwrap();
        assert_eq!(state.kind, "closed");
        assert!(!state.transitioning);
    }
}
