use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use console::style;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::{config::CliConfig, dependencies::ActivityWaiter, models::Activity};

use super::ApiClient;

/// Polls activities until they complete.
pub struct ActivityMonitor {
    client: ApiClient,
    poll_interval: Duration,
    timeout: Duration,
}

impl ActivityMonitor {
    pub fn new(client: ApiClient, config: &CliConfig) -> Self {
        Self {
            client,
            poll_interval: config.activity_poll_interval,
            timeout: config.wait_timeout,
        }
    }

    /// Wait for a single activity, returns `None` when the deadline passed first.
    async fn wait(
        &self,
        activity: &Activity,
        project: &str,
        deadline: Instant,
    ) -> Result<Option<Activity>> {
        let mut current = activity.clone();
        loop {
            if current.is_complete() {
                return Ok(Some(current));
            }

            if Instant::now() + self.poll_interval > deadline {
                return Ok(None);
            }
            sleep(self.poll_interval).await;

            current = self.client.get_activity(project, &activity.id).await?;
            debug!(activity_id = %current.id, state = ?current.state, "polled activity");
        }
    }
}

#[async_trait]
impl ActivityWaiter for ActivityMonitor {
    async fn wait_all(&self, activities: &[Activity], project: &str) -> Result<bool> {
        let deadline = Instant::now() + self.timeout;
        let mut success = true;

        for activity in activities {
            let label = activity
                .description
                .clone()
                .unwrap_or_else(|| format!("Activity {}", activity.id));

            match self.wait(activity, project, deadline).await {
                Ok(Some(finished)) if finished.is_successful() => {
                    eprintln!("{} {}", style("✔").green(), label);
                }
                Ok(Some(finished)) => {
                    eprintln!("{} {} ({:?})", style("✘").red(), label, finished.state);
                    success = false;
                }
                Ok(None) => {
                    eprintln!(
                        "{} {}: timed out waiting for completion",
                        style("✘").red(),
                        label
                    );
                    success = false;
                }
                Err(e) => {
                    warn!(activity_id = %activity.id, error = %e, "failed to poll activity");
                    eprintln!("{} {}: {:#}", style("✘").red(), label, e);
                    success = false;
                }
            }
        }

        Ok(success)
    }
}
