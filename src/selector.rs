//! Resolves which project and environment a command applies to.
//!
//! Flags win over configuration. For the environment, the current Git branch of the working
//! directory is the last resort.
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{
    config::CliConfig,
    dependencies::{EnvironmentRegistry, EnvironmentSelector},
    models::{Environment, EnvironmentCollection},
};

/// Source of the current Git branch.
#[async_trait]
pub trait BranchSource {
    async fn current_branch(&self) -> Option<String>;
}

/// Reads the branch checked out in a working directory.
#[derive(Debug, Clone)]
pub struct GitBranch {
    directory: PathBuf,
}

impl GitBranch {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl Default for GitBranch {
    fn default() -> Self {
        Self::new(".")
    }
}

fn head_branch(directory: &Path) -> Option<String> {
    let repository = match gix::discover(directory) {
        Ok(repository) => repository,
        Err(e) => {
            trace!(error = %e, "not in a git repository");
            return None;
        }
    };

    // A detached HEAD has no branch name
    let head = repository.head_name().ok()??;
    Some(head.shorten().to_string())
}

#[async_trait]
impl BranchSource for GitBranch {
    async fn current_branch(&self) -> Option<String> {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || head_branch(&directory))
            .await
            .ok()
            .flatten()
    }
}

pub struct Selector<R> {
    project: Option<String>,
    environment: Option<String>,
    registry: R,
    branch_source: Box<dyn BranchSource + Send + Sync>,
}

impl<R> Selector<R> {
    /// Flag values take precedence over the configuration.
    pub fn new(
        project_flag: Option<String>,
        environment_flag: Option<String>,
        config: &CliConfig,
        registry: R,
    ) -> Self {
        Self {
            project: project_flag.or_else(|| config.project.clone()),
            environment: environment_flag.or_else(|| config.environment.clone()),
            registry,
            branch_source: Box::new(GitBranch::default()),
        }
    }

    #[cfg(test)]
    pub fn with_branch_source(
        mut self,
        branch_source: Box<dyn BranchSource + Send + Sync>,
    ) -> Self {
        self.branch_source = branch_source;
        self
    }

    pub fn project(&self) -> Result<&str> {
        match self.project.as_deref() {
            Some(project) => Ok(project),
            None => bail!("No project specified, use the --project option"),
        }
    }
}

#[async_trait]
impl<R> EnvironmentSelector for Selector<R>
where
    R: EnvironmentRegistry + Send + Sync,
{
    async fn resolve_current(&self, project: &str) -> Result<Option<Environment>> {
        let id = match &self.environment {
            Some(id) => id.clone(),
            None => match self.branch_source.current_branch().await {
                Some(branch) => {
                    debug!(branch, "using the current git branch as environment");
                    branch
                }
                None => return Ok(None),
            },
        };

        let environments = self.registry.list(project, false).await?;
        Ok(environments.get(&id).cloned())
    }
}

/// The selector also serves the environment list, so it can feed the selection on its own.
#[async_trait]
impl<R> EnvironmentRegistry for Selector<R>
where
    R: EnvironmentRegistry + Send + Sync,
{
    async fn list(&self, project: &str, force_refresh: bool) -> Result<EnvironmentCollection> {
        self.registry.list(project, force_refresh).await
    }

    async fn invalidate(&self, project: &str) -> Result<()> {
        self.registry.invalidate(project).await
    }
}
