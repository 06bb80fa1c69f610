//! Client for the platform REST API.
//!
//! Only the environment and activity endpoints used by the commands are covered.
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, trace};
use url::Url;

use crate::{
    config::CliConfig,
    dependencies::EnvironmentOperations,
    models::{Activity, ActivityResult, ActivityState, Environment},
};

mod activity;
mod registry;

pub use activity::ActivityMonitor;
pub use registry::ApiEnvironmentRegistry;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to the platform API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("the platform API responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivitiesResponse {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedActivities>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedActivities {
    #[serde(default)]
    activities: Vec<Activity>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &CliConfig) -> Result<Self, ApiError> {
        // Url::join drops the last path segment unless the base ends with a slash
        let base_url = if config.api_url.ends_with('/') {
            config.api_url.clone()
        } else {
            format!("{}/", config.api_url)
        };

        let base_url = Url::parse(&base_url).map_err(|source| ApiError::InvalidUrl {
            url: config.api_url.clone(),
            source,
        })?;

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("platform-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Build the URL for a path made of segments, each segment is percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        trace!(%method, %url, "api request");

        let request = self.http_client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.message.or(body.title))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        Err(ApiError::Status { status, message })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, segments)).await?;
        Ok(response.json().await?)
    }

    pub async fn get_environments(&self, project: &str) -> Result<Vec<Environment>, ApiError> {
        debug!(project, "fetching environments");
        self.get_json(&["projects", project, "environments"]).await
    }

    pub async fn get_environment(
        &self,
        project: &str,
        environment_id: &str,
    ) -> Result<Environment, ApiError> {
        debug!(project, environment_id, "fetching environment");
        self.get_json(&["projects", project, "environments", environment_id])
            .await
    }

    pub async fn deactivate_environment(
        &self,
        project: &str,
        environment_id: &str,
    ) -> Result<Activity, ApiError> {
        debug!(project, environment_id, "deactivating environment");
        let response = self
            .send(self.request(
                Method::POST,
                &["projects", project, "environments", environment_id, "deactivate"],
            ))
            .await?;

        let activities: ActivitiesResponse = response.json().await?;

        // No activity means the platform finished the deactivation synchronously
        Ok(activities
            .embedded
            .and_then(|embedded| embedded.activities.into_iter().next())
            .unwrap_or_else(|| Activity {
                id: String::new(),
                state: ActivityState::Complete,
                result: Some(ActivityResult::Success),
                description: None,
            }))
    }

    pub async fn delete_environment(
        &self,
        project: &str,
        environment_id: &str,
    ) -> Result<(), ApiError> {
        debug!(project, environment_id, "deleting environment");
        self.send(self.request(
            Method::DELETE,
            &["projects", project, "environments", environment_id],
        ))
        .await?;
        Ok(())
    }

    pub async fn get_activity(
        &self,
        project: &str,
        activity_id: &str,
    ) -> Result<Activity, ApiError> {
        self.get_json(&["projects", project, "activities", activity_id])
            .await
    }
}

#[async_trait]
impl EnvironmentOperations for ApiClient {
    async fn deactivate(&self, project: &str, environment_id: &str) -> anyhow::Result<Activity> {
        self.deactivate_environment(project, environment_id)
            .await
            .with_context(|| format!("deactivating environment '{environment_id}'"))
    }

    async fn delete(&self, project: &str, environment_id: &str) -> anyhow::Result<()> {
        self.delete_environment(project, environment_id)
            .await
            .with_context(|| format!("deleting environment '{environment_id}'"))
    }

    async fn refresh(&self, project: &str, environment_id: &str) -> anyhow::Result<Environment> {
        self.get_environment(project, environment_id)
            .await
            .with_context(|| format!("refreshing environment '{environment_id}'"))
    }
}
