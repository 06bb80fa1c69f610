use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{
    cache::CacheProvider,
    config::CliConfig,
    dependencies::EnvironmentRegistry,
    models::{Environment, EnvironmentCollection, collect_environments},
};

use super::ApiClient;

/// Environment registry backed by the API, with the environment list kept in the cache.
pub struct ApiEnvironmentRegistry {
    client: ApiClient,
    cache: Box<dyn CacheProvider + Send + Sync>,
    ttl: std::time::Duration,
}

impl ApiEnvironmentRegistry {
    pub fn new(
        client: ApiClient,
        cache: Box<dyn CacheProvider + Send + Sync>,
        config: &CliConfig,
    ) -> Self {
        Self {
            client,
            cache,
            ttl: config.cache_ttl,
        }
    }
}

fn cache_key(project: &str) -> String {
    format!("environments:{project}")
}

#[async_trait]
impl EnvironmentRegistry for ApiEnvironmentRegistry {
    async fn list(&self, project: &str, force_refresh: bool) -> Result<EnvironmentCollection> {
        let key = cache_key(project);

        if !force_refresh {
            if let Some(cached) = self.cache.fetch(&key).await {
                match serde_json::from_str::<Vec<Environment>>(&cached) {
                    Ok(environments) => {
                        trace!(project, "using cached environment list");
                        return Ok(collect_environments(environments));
                    }
                    Err(e) => {
                        debug!(project, error = %e, "discarding unreadable cached environments")
                    }
                }
            }
        }

        let environments = self
            .client
            .get_environments(project)
            .await
            .with_context(|| format!("listing environments of project '{project}'"))?;

        let serialized =
            serde_json::to_string(&environments).context("serializing environment list")?;
        if let Err(e) = self.cache.save(&key, &serialized, self.ttl).await {
            debug!(project, error = %e, "failed to cache environment list");
        }

        Ok(collect_environments(environments))
    }

    async fn invalidate(&self, project: &str) -> Result<()> {
        debug!(project, "clearing cached environment list");
        self.cache.delete(&cache_key(project)).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{cache::MemoryCache, models::EnvironmentStatus};

    fn registry(cache: MemoryCache) -> ApiEnvironmentRegistry {
        // Nothing listens on this address, any request fails
        let config = CliConfig::builder()
            .api_url("http://127.0.0.1:9/api/")
            .build();
        ApiEnvironmentRegistry::new(ApiClient::new(&config).unwrap(), Box::new(cache), &config)
    }

    #[tokio::test]
    async fn test_list_uses_cache() {
        let cache = MemoryCache::new();
        let environments = vec![
            Environment::new("main", EnvironmentStatus::Active),
            Environment::new("dev", EnvironmentStatus::Inactive).with_parent("main"),
        ];
        cache
            .save(
                "environments:abc",
                &serde_json::to_string(&environments).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let registry = registry(cache);
        let listed = registry.list("abc", false).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed["dev"].parent(), Some("main"));
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let cache = MemoryCache::new();
        cache
            .save("environments:abc", "[]", Duration::from_secs(60))
            .await
            .unwrap();

        let registry = registry(cache);

        assert!(registry.list("abc", true).await.is_err());
    }

    #[tokio::test]
    async fn test_invalidate_removes_cached_list() {
        let cache = MemoryCache::new();
        cache
            .save("environments:abc", "[]", Duration::from_secs(60))
            .await
            .unwrap();

        let registry = registry(cache);
        registry.invalidate("abc").await.unwrap();

        assert!(registry.cache.fetch("environments:abc").await.is_none());
    }
}
