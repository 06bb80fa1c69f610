//! Value types for the platform resources the CLI works with.
//!
//! Environments are immutable once fetched. A status change is observed by fetching the
//! environment again, never by mutating a local copy.
use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Environments of a project, keyed by id.
pub type EnvironmentCollection = BTreeMap<String, Environment>;

/// Status of an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnvironmentStatus {
    Active,
    Inactive,
    /// The environment is building.
    Dirty,
    Deleting,
    Unrecognized(String),
}

impl EnvironmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Dirty => "dirty",
            Self::Deleting => "deleting",
            Self::Unrecognized(status) => status,
        }
    }
}

impl From<&str> for EnvironmentStatus {
    fn from(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "dirty" => Self::Dirty,
            "deleting" => Self::Deleting,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl Display for EnvironmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EnvironmentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EnvironmentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from(value.as_str()))
    }
}

/// How an environment's branch relates to its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeInfo {
    pub commits_ahead: u64,
    #[serde(default)]
    pub commits_behind: u64,
    #[serde(default)]
    pub parent_ref: Option<String>,
}

/// An environment of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    id: String,
    #[serde(default)]
    title: Option<String>,
    status: EnvironmentStatus,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default, rename = "type")]
    environment_type: Option<String>,
    #[serde(default)]
    merge_info: Option<MergeInfo>,
    #[serde(default)]
    head_commit: Option<String>,
    #[serde(default)]
    ssh_url: Option<String>,
    #[serde(default)]
    deployment_last_changed: Option<DateTime<Utc>>,
}

impl Environment {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn status(&self) -> &EnvironmentStatus {
        &self.status
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn environment_type(&self) -> Option<&str> {
        self.environment_type.as_deref()
    }

    pub fn merge_info(&self) -> Option<&MergeInfo> {
        self.merge_info.as_ref()
    }

    pub fn head_commit(&self) -> Option<&str> {
        self.head_commit.as_deref()
    }

    pub fn ssh_url(&self) -> Option<&str> {
        self.ssh_url.as_deref()
    }

    pub fn deployment_last_changed(&self) -> Option<DateTime<Utc>> {
        self.deployment_last_changed
    }

    /// Whether the environment has running services.
    pub fn is_active(&self) -> bool {
        self.status == EnvironmentStatus::Active
    }

    pub fn is_inactive(&self) -> bool {
        self.status == EnvironmentStatus::Inactive
    }

    /// Whether the branch is fully merged into its parent.
    pub fn is_merged(&self) -> bool {
        self.parent.is_some()
            && self
                .merge_info()
                .is_some_and(|info| info.commits_ahead == 0 && info.parent_ref.is_some())
    }

    /// Whether any of `environments` has this environment as its parent.
    pub fn has_children_in<'a>(
        &self,
        environments: impl IntoIterator<Item = &'a Environment>,
    ) -> bool {
        environments
            .into_iter()
            .any(|other| other.parent() == Some(self.id()))
    }
}

#[cfg(test)]
impl Environment {
    pub fn new(id: impl Into<String>, status: EnvironmentStatus) -> Self {
        Self {
            id: id.into(),
            title: None,
            status,
            parent: None,
            environment_type: None,
            merge_info: None,
            head_commit: None,
            ssh_url: None,
            deployment_last_changed: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_type(mut self, environment_type: impl Into<String>) -> Self {
        self.environment_type = Some(environment_type.into());
        self
    }

    pub fn with_merge_info(mut self, merge_info: MergeInfo) -> Self {
        self.merge_info = Some(merge_info);
        self
    }

    pub fn with_head_commit(mut self, head_commit: impl Into<String>) -> Self {
        self.head_commit = Some(head_commit.into());
        self
    }

    pub fn with_ssh_url(mut self, ssh_url: impl Into<String>) -> Self {
        self.ssh_url = Some(ssh_url.into());
        self
    }

    pub fn with_deployment_last_changed(mut self, last_changed: DateTime<Utc>) -> Self {
        self.deployment_last_changed = Some(last_changed);
        self
    }
}

/// Collect environments into an id-keyed collection.
pub fn collect_environments(
    environments: impl IntoIterator<Item = Environment>,
) -> EnvironmentCollection {
    environments
        .into_iter()
        .map(|environment| (environment.id().to_string(), environment))
        .collect()
}

/// State of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    Pending,
    InProgress,
    Complete,
    Cancelled,
    Staged,
    Scheduled,
    #[serde(other)]
    Unknown,
}

/// Result of a completed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityResult {
    Success,
    Failure,
}

/// An asynchronous operation running on the platform, e.g. an environment deactivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub state: ActivityState,
    #[serde(default)]
    pub result: Option<ActivityResult>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Activity {
    pub fn is_complete(&self) -> bool {
        matches!(
            self.state,
            ActivityState::Complete | ActivityState::Cancelled
        )
    }

    pub fn is_successful(&self) -> bool {
        self.state == ActivityState::Complete && self.result == Some(ActivityResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_environment() {
        let environment: Environment = serde_json::from_str(
            r#"{
                "id": "feature-x",
                "title": "Feature X",
                "status": "inactive",
                "parent": "main",
                "type": "development",
                "merge_info": {"commits_ahead": 0, "commits_behind": 3, "parent_ref": "abc"},
                "head_commit": "0123456789",
                "unknown_field": true
            }"#,
        )
        .unwrap();

        assert_eq!(environment.id(), "feature-x");
        assert_eq!(environment.title(), Some("Feature X"));
        assert_eq!(environment.status(), &EnvironmentStatus::Inactive);
        assert_eq!(environment.parent(), Some("main"));
        assert_eq!(environment.environment_type(), Some("development"));
        assert_eq!(environment.head_commit(), Some("0123456789"));
        assert!(environment.is_merged());
        assert!(!environment.is_active());
    }

    #[test]
    fn test_unrecognized_status_keeps_raw_value() {
        let environment: Environment =
            serde_json::from_str(r#"{"id": "x", "status": "paused"}"#).unwrap();

        assert_eq!(
            environment.status(),
            &EnvironmentStatus::Unrecognized("paused".to_string())
        );
        assert_eq!(environment.status().to_string(), "paused");
    }

    #[test]
    fn test_is_merged_requires_parent_and_parent_ref() {
        let merged = MergeInfo {
            commits_ahead: 0,
            commits_behind: 0,
            parent_ref: Some("abc".to_string()),
        };

        let no_parent =
            Environment::new("a", EnvironmentStatus::Active).with_merge_info(merged.clone());
        assert!(!no_parent.is_merged());

        let ahead = Environment::new("b", EnvironmentStatus::Active)
            .with_parent("main")
            .with_merge_info(MergeInfo {
                commits_ahead: 2,
                ..merged.clone()
            });
        assert!(!ahead.is_merged());

        let no_ref = Environment::new("c", EnvironmentStatus::Active)
            .with_parent("main")
            .with_merge_info(MergeInfo {
                parent_ref: None,
                ..merged.clone()
            });
        assert!(!no_ref.is_merged());

        let ok = Environment::new("d", EnvironmentStatus::Active)
            .with_parent("main")
            .with_merge_info(merged);
        assert!(ok.is_merged());
    }

    #[test]
    fn test_has_children_in() {
        let main = Environment::new("main", EnvironmentStatus::Active);
        let child = Environment::new("child", EnvironmentStatus::Active).with_parent("main");
        let environments = [main.clone(), child.clone()];

        assert!(main.has_children_in(&environments));
        assert!(!child.has_children_in(&environments));
    }

    #[test]
    fn test_activity_outcome() {
        let completed = r#"{"id": "act1", "state": "complete", "result": "success"}"#;
        let activity: Activity = serde_json::from_str(completed).unwrap();
        assert!(activity.is_complete());
        assert!(activity.is_successful());

        let failure = r#"{"id": "act2", "state": "complete", "result": "failure"}"#;
        let failed: Activity = serde_json::from_str(failure).unwrap();
        assert!(failed.is_complete());
        assert!(!failed.is_successful());

        let running: Activity =
            serde_json::from_str(r#"{"id": "act3", "state": "in_progress"}"#).unwrap();
        assert!(!running.is_complete());
    }
}
