//! The live platform: API client, cached registry, activity monitor and selector wired together.
use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::{
    api::{ActivityMonitor, ApiClient, ApiEnvironmentRegistry},
    args::GlobalArgs,
    cache::cache_from_config,
    config::CliConfig,
    dependencies::{ActivityWaiter, EnvironmentOperations, EnvironmentRegistry, EnvironmentSelector},
    models::{Activity, Environment, EnvironmentCollection},
    selector::Selector,
};

pub struct Platform {
    client: ApiClient,
    selector: Selector<ApiEnvironmentRegistry>,
    monitor: ActivityMonitor,
}

impl Platform {
    pub fn connect(global_args: &GlobalArgs, config: &CliConfig) -> Result<Self> {
        let client = ApiClient::new(config).context("creating the API client")?;
        let registry =
            ApiEnvironmentRegistry::new(client.clone(), cache_from_config(config), config);

        Ok(Self {
            selector: Selector::new(
                global_args.project.clone(),
                global_args.environment.clone(),
                config,
                registry,
            ),
            monitor: ActivityMonitor::new(client.clone(), config),
            client,
        })
    }

    pub fn project(&self) -> Result<String> {
        self.selector.project().map(str::to_string)
    }
}

#[async_trait]
impl EnvironmentRegistry for Platform {
    async fn list(&self, project: &str, force_refresh: bool) -> Result<EnvironmentCollection> {
        self.selector.list(project, force_refresh).await
    }

    async fn invalidate(&self, project: &str) -> Result<()> {
        self.selector.invalidate(project).await
    }
}

#[async_trait]
impl EnvironmentSelector for Platform {
    async fn resolve_current(&self, project: &str) -> Result<Option<Environment>> {
        self.selector.resolve_current(project).await
    }
}

#[async_trait]
impl EnvironmentOperations for Platform {
    async fn deactivate(&self, project: &str, environment_id: &str) -> Result<Activity> {
        self.client.deactivate(project, environment_id).await
    }

    async fn delete(&self, project: &str, environment_id: &str) -> Result<()> {
        EnvironmentOperations::delete(&self.client, project, environment_id).await
    }

    async fn refresh(&self, project: &str, environment_id: &str) -> Result<Environment> {
        self.client.refresh(project, environment_id).await
    }
}

#[async_trait]
impl ActivityWaiter for Platform {
    async fn wait_all(&self, activities: &[Activity], project: &str) -> Result<bool> {
        self.monitor.wait_all(activities, project).await
    }
}
