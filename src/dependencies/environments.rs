use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Activity, Environment, EnvironmentCollection};

/// Snapshot of the environments of a project.
#[async_trait]
pub trait EnvironmentRegistry {
    /// Returns all environments of the project, keyed by id.
    ///
    /// A cached list may be returned unless `force_refresh` is set.
    async fn list(&self, project: &str, force_refresh: bool) -> Result<EnvironmentCollection>;

    /// Drop any cached environment list for the project.
    async fn invalidate(&self, project: &str) -> Result<()>;
}

/// Remote operations on a single environment.
#[async_trait]
pub trait EnvironmentOperations {
    /// Start deactivating an active environment, returns the activity tracking it.
    async fn deactivate(&self, project: &str, environment_id: &str) -> Result<Activity>;

    /// Delete an inactive environment along with its Git branch.
    async fn delete(&self, project: &str, environment_id: &str) -> Result<()>;

    /// Fetch the current state of an environment.
    async fn refresh(&self, project: &str, environment_id: &str) -> Result<Environment>;
}

/// Waits for activities to finish.
#[async_trait]
pub trait ActivityWaiter {
    /// Returns true when every activity completed successfully within the wait policy.
    async fn wait_all(&self, activities: &[Activity], project: &str) -> Result<bool>;
}

/// Resolves the environment the user is currently working on.
#[async_trait]
pub trait EnvironmentSelector {
    async fn resolve_current(&self, project: &str) -> Result<Option<Environment>>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use mockall::mock;

    mock! {
        pub Platform {}

        #[async_trait]
        impl EnvironmentRegistry for Platform {
            async fn list(&self, project: &str, force_refresh: bool) -> Result<EnvironmentCollection>;
            async fn invalidate(&self, project: &str) -> Result<()>;
        }

        #[async_trait]
        impl EnvironmentOperations for Platform {
            async fn deactivate(&self, project: &str, environment_id: &str) -> Result<Activity>;
            async fn delete(&self, project: &str, environment_id: &str) -> Result<()>;
            async fn refresh(&self, project: &str, environment_id: &str) -> Result<Environment>;
        }

        #[async_trait]
        impl ActivityWaiter for Platform {
            async fn wait_all(&self, activities: &[Activity], project: &str) -> Result<bool>;
        }

        #[async_trait]
        impl EnvironmentSelector for Platform {
            async fn resolve_current(&self, project: &str) -> Result<Option<Environment>>;
        }
    }
}
