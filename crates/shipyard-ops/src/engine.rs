//! Task engine that performs release operations against Maven repositories.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use shipyard_core::config::SigningKey;
use shipyard_core::target::ActiveTarget;
use shipyard_maven::repository::{Coordinates, MavenRepository};
use shipyard_maven::sign::{GpgSigner, Signer};
use shipyard_maven::staging::{self, StagingClient};
use shipyard_maven::{upload, verify};
use shipyard_planner::cache::StagingRepositoryCache;
use shipyard_planner::engine::TaskEngine;
use shipyard_planner::operation::{HostTask, OperationKind};
use shipyard_util::errors::ShipyardError;
use shipyard_util::progress::{status, status_warn};

use crate::publication::Publication;

/// Runs release tasks: checks generated files, signs, verifies POMs, talks
/// to the staging server and uploads.
pub struct MavenTaskEngine {
    client: Client,
    targets: BTreeMap<String, ActiveTarget>,
    publications: BTreeMap<String, Publication>,
    signing: Option<SigningKey>,
    signer: Arc<dyn Signer>,
    settle_delay: Option<Duration>,
    /// Signature files per publication, paired with their remote names.
    signatures: Mutex<HashMap<String, Vec<(PathBuf, String)>>>,
}

impl MavenTaskEngine {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            targets: BTreeMap::new(),
            publications: BTreeMap::new(),
            signing: None,
            signer: Arc::new(GpgSigner::default()),
            settle_delay: None,
            signatures: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_targets(mut self, targets: Vec<ActiveTarget>) -> Self {
        self.targets = targets.into_iter().map(|t| (t.name.clone(), t)).collect();
        self
    }

    pub fn with_publications(mut self, publications: Vec<Publication>) -> Self {
        self.publications = publications
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        self
    }

    pub fn with_signing(mut self, signing: Option<SigningKey>) -> Self {
        self.signing = signing;
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    /// Override how long to wait between staging state polls.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    fn target(&self, task: &HostTask) -> miette::Result<&ActiveTarget> {
        task.target
            .as_deref()
            .and_then(|name| self.targets.get(name))
            .ok_or_else(|| {
                ShipyardError::Generic {
                    message: format!("{task} does not name an active publish target"),
                }
                .into()
            })
    }

    fn publication(&self, task: &HostTask) -> miette::Result<&Publication> {
        task.publication
            .as_deref()
            .and_then(|name| self.publications.get(name))
            .ok_or_else(|| {
                ShipyardError::Generic {
                    message: format!("{task} does not name a known publication"),
                }
                .into()
            })
    }

    fn staging_client(&self, target: &ActiveTarget) -> StagingClient {
        let client = StagingClient::new(
            self.client.clone(),
            target.name.clone(),
            &target.url,
            target.credentials.clone(),
        );
        match self.settle_delay {
            Some(delay) => client.with_settle_delay(delay),
            None => client,
        }
    }

    fn description(&self, target: &ActiveTarget) -> String {
        let coords = self
            .publications
            .values()
            .next()
            .and_then(|p| p.coordinates().ok());
        match (coords, target.package_group.as_deref()) {
            (Some(coords), _) => coords.to_string(),
            (None, Some(group)) => format!("{group} release"),
            (None, None) => format!("{} release", target.name),
        }
    }

    fn generate_pom(&self, publication: &Publication) -> miette::Result<()> {
        if !publication.pom.is_file() {
            return Err(ShipyardError::PomParse {
                message: format!(
                    "{} not found; generate the POM of publication '{}' before releasing",
                    publication.pom.display(),
                    publication.name
                ),
            }
            .into());
        }
        let coords = publication.coordinates()?;
        tracing::debug!("publication {} is {coords}", publication.name);
        Ok(())
    }

    fn generate_metadata(&self, publication: &Publication) -> miette::Result<()> {
        if !publication.has_metadata() {
            tracing::debug!("publication {} has no module metadata", publication.name);
            return Ok(());
        }
        let data = std::fs::read(&publication.metadata).map_err(ShipyardError::Io)?;
        serde_json::from_slice::<serde_json::Value>(&data).map_err(|e| ShipyardError::Generic {
            message: format!("{} is not valid JSON: {e}", publication.metadata.display()),
        })?;
        Ok(())
    }

    async fn sign(&self, publication: &Publication) -> miette::Result<()> {
        let Some(key) = self.signing.clone() else {
            tracing::info!("signing is not configured, {} stays unsigned", publication.name);
            return Ok(());
        };
        let coords = publication.coordinates()?;
        let files = publication.remote_files(&coords);
        let paths: Vec<PathBuf> = files.iter().map(|(path, _)| path.clone()).collect();

        status("Signing", &format!("{} ({} files)", publication.name, paths.len()));
        let signer = self.signer.clone();
        let signed = tokio::task::spawn_blocking(move || signer.sign(&paths, &key))
            .await
            .map_err(|e| ShipyardError::Signing {
                message: e.to_string(),
            })??;

        let signatures = signed
            .into_iter()
            .zip(files)
            .map(|(signature, (_, remote))| (signature, format!("{remote}.asc")))
            .collect();
        self.signatures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(publication.name.clone(), signatures);
        Ok(())
    }

    async fn initialize_staging(
        &self,
        target: &ActiveTarget,
        cache: &StagingRepositoryCache,
    ) -> miette::Result<()> {
        let profile_id = target.staging_profile_id.clone().ok_or_else(|| {
            ShipyardError::Staging {
                target: target.name.clone(),
                message: "no staging profile id".to_string(),
            }
        })?;
        let client = &self.staging_client(target);
        let description = &self.description(target);
        let profile_id = &profile_id;
        let deploy_url = cache
            .get_or_try_init(&target.url, || async move {
                let id = client.start(profile_id, description).await?;
                Ok(client.deploy_url(&id))
            })
            .await?;
        status("Staging", &format!("{} at {deploy_url}", target.name));
        Ok(())
    }

    fn staged_repository_id(
        &self,
        target: &ActiveTarget,
        cache: &StagingRepositoryCache,
    ) -> miette::Result<String> {
        cache
            .get(&target.url)
            .as_deref()
            .and_then(staging::repository_id_from_deploy_url)
            .map(str::to_string)
            .ok_or_else(|| {
                ShipyardError::Staging {
                    target: target.name.clone(),
                    message: "no staging repository was opened".to_string(),
                }
                .into()
            })
    }

    async fn publish(
        &self,
        target: &ActiveTarget,
        cache: &StagingRepositoryCache,
    ) -> miette::Result<()> {
        let repo = if target.requires_staging {
            let id = self.staged_repository_id(target, cache)?;
            MavenRepository::staged(target, &staging::deploy_url(&target.url, &id))
        } else {
            MavenRepository::from_target(target)
        };

        for publication in self.publications.values() {
            let coords = publication.coordinates()?;
            status(
                "Publishing",
                &format!("{} ({coords}) to {}", publication.name, target.name),
            );
            self.upload_publication(&repo, &coords, publication).await?;
        }
        Ok(())
    }

    async fn upload_publication(
        &self,
        repo: &MavenRepository,
        coords: &Coordinates,
        publication: &Publication,
    ) -> miette::Result<()> {
        let mut files = publication.remote_files(coords);
        let signatures = self
            .signatures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&publication.name)
            .cloned()
            .unwrap_or_default();
        files.extend(signatures);

        for (path, remote) in &files {
            upload::upload_file_as(&self.client, repo, coords, path, remote).await?;
        }
        Ok(())
    }

    async fn close_staging(
        &self,
        target: &ActiveTarget,
        cache: &StagingRepositoryCache,
    ) -> miette::Result<()> {
        let id = self.staged_repository_id(target, cache)?;
        self.staging_client(target)
            .close(&id, &self.description(target))
            .await?;
        status("Closed", &format!("staging repository {id} on {}", target.name));
        Ok(())
    }

    async fn release_staging(
        &self,
        target: &ActiveTarget,
        cache: &StagingRepositoryCache,
    ) -> miette::Result<()> {
        let id = self.staged_repository_id(target, cache)?;
        self.staging_client(target)
            .release(&id, &self.description(target))
            .await?;
        status("Released", &format!("staging repository {id} on {}", target.name));
        Ok(())
    }

    /// Drop the staging repository opened for `target`, if there is one.
    ///
    /// A failed drop only warns, naming the repository that stays open.
    pub async fn drop_staging(&self, target: &ActiveTarget, cache: &StagingRepositoryCache) {
        let Ok(id) = self.staged_repository_id(target, cache) else {
            return;
        };
        let dropped = self
            .staging_client(target)
            .drop_repository(&id, &self.description(target))
            .await;
        let message = match &dropped {
            Ok(()) => format!("staging repository {id} on {}", target.name),
            Err(e) => format!("staging repository {id} on {} was left open: {e}", target.name),
        };
        status_warn(if dropped.is_ok() { "Dropped" } else { "Abandoned" }, &message);
    }
}

impl TaskEngine for MavenTaskEngine {
    fn register_task(&self, task: &HostTask) {
        tracing::debug!("registered task {task}");
    }

    fn depends_on(&self, task: &HostTask, dependency: &HostTask) {
        tracing::debug!("{task} depends on {dependency}");
    }

    async fn execute(&self, task: &HostTask, cache: &StagingRepositoryCache) -> miette::Result<()> {
        let Some(kind) = task.kind else {
            status("Finished", "release");
            return Ok(());
        };
        match kind {
            OperationKind::GeneratePom => self.generate_pom(self.publication(task)?),
            OperationKind::GenerateMetadata => self.generate_metadata(self.publication(task)?),
            OperationKind::Sign => self.sign(self.publication(task)?).await,
            OperationKind::VerifyPom => verify::verify_pom_file(&self.publication(task)?.pom),
            OperationKind::InitializeStaging => {
                self.initialize_staging(self.target(task)?, cache).await
            }
            OperationKind::Publish => self.publish(self.target(task)?, cache).await,
            OperationKind::CloseStaging => self.close_staging(self.target(task)?, cache).await,
            OperationKind::ReleaseStaging => {
                self.release_staging(self.target(task)?, cache).await
            }
        }
    }
}
