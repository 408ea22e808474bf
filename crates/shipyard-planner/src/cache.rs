//! Staging repositories opened during one invocation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use tokio::sync::OnceCell;

/// Map from staging server URL to the staging repository URL opened on it.
///
/// Each key is written at most once. The first writer wins and later writers
/// observe the stored value, so two targets sharing a staging server share
/// one staging repository.
#[derive(Debug, Default)]
pub struct StagingRepositoryCache {
    repositories: RwLock<HashMap<String, Arc<OnceCell<String>>>>,
}

impl StagingRepositoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Staging repository URL for `server_url`, if one has been opened.
    pub fn get(&self, server_url: &str) -> Option<String> {
        let repositories = self
            .repositories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        repositories
            .get(normalize(server_url))
            .and_then(|cell| cell.get().cloned())
    }

    /// Store `create()` for `server_url` unless a value is already present,
    /// returning whichever value ends up stored.
    pub fn get_or_insert_with(&self, server_url: &str, create: impl FnOnce() -> String) -> String {
        let cell = self.cell(server_url);
        if let Some(existing) = cell.get() {
            return existing.clone();
        }
        let value = create();
        match cell.set(value.clone()) {
            Ok(()) => value,
            Err(_) => cell.get().cloned().unwrap_or(value),
        }
    }

    /// Async variant of [`get_or_insert_with`](Self::get_or_insert_with) for
    /// fallible initialization, such as opening a repository over the network.
    ///
    /// Concurrent callers for the same server wait for the first one instead
    /// of opening a second repository. A failed initialization stores nothing.
    pub async fn get_or_try_init<F, Fut>(&self, server_url: &str, init: F) -> miette::Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = miette::Result<String>>,
    {
        let cell = self.cell(server_url);
        let url = cell.get_or_try_init(init).await?;
        Ok(url.clone())
    }

    /// Number of staging repositories opened so far.
    pub fn len(&self) -> usize {
        self.repositories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, server_url: &str) -> Arc<OnceCell<String>> {
        let key = normalize(server_url);
        if let Some(cell) = self
            .repositories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
        {
            return cell.clone();
        }
        self.repositories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

fn normalize(server_url: &str) -> &str {
    server_url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_writer_wins() {
        let cache = StagingRepositoryCache::new();
        let first = cache.get_or_insert_with("https://oss.sonatype.org/service/local/", || {
            "repo-1".to_string()
        });
        let second = cache.get_or_insert_with("https://oss.sonatype.org/service/local", || {
            "repo-2".to_string()
        });
        assert_eq!(first, "repo-1");
        assert_eq!(second, "repo-1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_server_is_absent() {
        let cache = StagingRepositoryCache::new();
        assert!(cache.get("https://s01.oss.sonatype.org/").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failed_initialization_stores_nothing() {
        let cache = StagingRepositoryCache::new();
        let err = cache
            .get_or_try_init("https://staging.local", || async {
                Err(miette::miette!("server unavailable"))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.get("https://staging.local").is_none());

        let url = cache
            .get_or_try_init("https://staging.local", || async {
                Ok("https://staging.local/staging/deployByRepositoryId/r-1".to_string())
            })
            .await
            .unwrap();
        assert_eq!(cache.get("https://staging.local"), Some(url));
    }
}
