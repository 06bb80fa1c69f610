//! Cache providers for API responses.
//!
//! [`cache_from_config`] picks the provider: an in-process [`MemoryCache`] when caching is
//! disabled, otherwise a [`FilesystemCache`] so cached data survives between invocations.
use std::{collections::HashMap, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::CliConfig;

#[async_trait]
pub trait CacheProvider {
    /// Returns the cached value, or `None` when it is missing or expired.
    async fn fetch(&self, key: &str) -> Option<String>;

    async fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Pick the cache provider for the configuration.
pub fn cache_from_config(config: &CliConfig) -> Box<dyn CacheProvider + Send + Sync> {
    if config.cache_disabled {
        debug!("cache disabled, using in-memory cache");
        Box::new(MemoryCache::new())
    } else {
        debug!(cache_dir = ?config.cache_dir, "using filesystem cache");
        Box::new(FilesystemCache::new(config.cache_dir.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    expires_at: DateTime<Utc>,
    value: String,
}

impl CacheEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            expires_at: Utc::now()
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            value: value.to_string(),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Cache that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Default::default()
    }
}

#[async_trait]
impl CacheProvider for MemoryCache {
    async fn fetch(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    async fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("cache lock poisoned"))?
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("cache lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// Cache storing one JSON file per key.
#[derive(Debug, Clone)]
pub struct FilesystemCache {
    directory: PathBuf,
}

impl FilesystemCache {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl CacheProvider for FilesystemCache {
    async fn fetch(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        let contents = tokio::fs::read_to_string(&path).await.ok()?;

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) if !entry.is_expired() => Some(entry.value),
            Ok(_) => {
                trace!(?path, "cache entry expired");
                None
            }
            Err(e) => {
                debug!(?path, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    async fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("creating cache directory {}", self.directory.display()))?;

        let path = self.path_for(key);
        let contents =
            serde_json::to_string(&CacheEntry::new(value, ttl)).context("serializing cache entry")?;

        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("writing cache file {}", path.display()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing cache file {}", path.display())),
        }
    }
}
