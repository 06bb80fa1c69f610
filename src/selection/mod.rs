//! Environment selection for bulk operations.
//!
//! Positive criteria (explicit ids, `--inactive`, `--merged`, `--type`) are unioned into one
//! id-keyed set. Exclusions (`--exclude-type`, `--only-type`, `--exclude`) are applied afterwards,
//! so an environment picked by `--type` can still be excluded. When nothing was specified the
//! current environment is used.
use anyhow::{Context, Result};
use console::style;
use tracing::debug;

use crate::{
    dependencies::{EnvironmentRegistry, EnvironmentSelector},
    models::{Environment, EnvironmentCollection},
};

pub mod wildcard;

/// What to select, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Ids or `%` wildcards.
    pub environment_ids: Vec<String>,
    pub inactive: bool,
    pub merged: bool,
    pub types: Vec<String>,
    pub only_types: Vec<String>,
    pub exclude_types: Vec<String>,
    /// Ids or `%` wildcards to leave out.
    pub exclude: Vec<String>,
}

/// Result of running the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// The environments to act on.
    pub selected: EnvironmentCollection,
    /// Every environment of the project, as last fetched.
    pub all: EnvironmentCollection,
    pub anything_specified: bool,
    pub errors: usize,
}

/// Dependencies needed to select environments.
pub trait SelectionSource: EnvironmentRegistry + EnvironmentSelector + Send + Sync {}
impl<T: EnvironmentRegistry + EnvironmentSelector + Send + Sync + ?Sized> SelectionSource for T {}

/// Run the selection for a project.
pub async fn select_environments<S>(
    source: &S,
    project: &str,
    criteria: &SelectionCriteria,
) -> Result<Selection>
where
    S: SelectionSource + ?Sized,
{
    let all = source.list(project, false).await?;
    let mut selection = Selection {
        all,
        ..Default::default()
    };

    if criteria.inactive {
        selection.anything_specified = true;
        let inactive = filter(&selection.all, Environment::is_inactive);
        if inactive.is_empty() {
            eprintln!("No inactive environments found.");
        } else {
            eprintln!("Found {} inactive environment(s).", inactive.len());
            selection.selected.extend(inactive);
        }
    }

    if criteria.merged {
        selection.anything_specified = true;
        let merged = filter(&selection.all, Environment::is_merged);
        if merged.is_empty() {
            eprintln!("No merged environments found.");
        } else {
            eprintln!("Found {} merged environment(s).", merged.len());
            selection.selected.extend(merged);
        }
    }

    if !criteria.types.is_empty() {
        selection.anything_specified = true;
        let with_types = filter(&selection.all, |e| has_type_in(e, &criteria.types));
        if with_types.is_empty() {
            eprintln!(
                "No environments found of type(s): {}",
                criteria.types.join(", ")
            );
        } else {
            eprintln!(
                "Found {} environment(s) of type(s): {}",
                with_types.len(),
                criteria.types.join(", ")
            );
            selection.selected.extend(with_types);
        }
    }

    if !criteria.environment_ids.is_empty() {
        selection.anything_specified = true;
        select_explicit(source, project, criteria, &mut selection).await?;
    }

    if !selection.anything_specified {
        match source.resolve_current(project).await? {
            Some(current) => {
                debug!(environment = current.id(), "using the current environment");
                selection.selected.insert(current.id().to_string(), current);
            }
            None => {
                eprintln!("No environment specified.");
                selection.errors += 1;
            }
        }
    }

    apply_exclusions(criteria, &mut selection)?;

    Ok(selection)
}

async fn select_explicit<S>(
    source: &S,
    project: &str,
    criteria: &SelectionCriteria,
    selection: &mut Selection,
) -> Result<()>
where
    S: SelectionSource + ?Sized,
{
    let mut ids = resolve(&selection.all, &criteria.environment_ids)?;

    if ids.iter().any(|id| !selection.all.contains_key(id)) {
        debug!("some environments were not found, refreshing the environment list");
        selection.all = source.list(project, true).await?;
        ids = resolve(&selection.all, &criteria.environment_ids)?;
    }

    for id in ids {
        match selection.all.get(&id) {
            Some(environment) => {
                selection.selected.insert(id, environment.clone());
            }
            None => {
                eprintln!("Environment not found: {}", style(&id).red());
                selection.errors += 1;
            }
        }
    }

    Ok(())
}

fn apply_exclusions(criteria: &SelectionCriteria, selection: &mut Selection) -> Result<()> {
    if !criteria.exclude_types.is_empty() || !criteria.only_types.is_empty() {
        let before = selection.selected.len();
        selection
            .selected
            .retain(|_, environment| is_type_allowed(environment, criteria));

        let excluded = before - selection.selected.len();
        if excluded > 0 {
            eprintln!("Excluded {} environment(s) by type.", excluded);
        }
    }

    if !criteria.exclude.is_empty() {
        let excluded = wildcard::select(
            selection.selected.keys().map(String::as_str),
            &criteria.exclude,
        )
        .context("expanding excluded environments")?;

        let excluded: Vec<String> = excluded
            .into_iter()
            .filter(|id| selection.selected.contains_key(id))
            .collect();

        if !excluded.is_empty() {
            eprintln!("Excluding environment(s): {}", excluded.join(", "));
            for id in &excluded {
                selection.selected.remove(id);
            }
        }
    }

    Ok(())
}

/// An environment passes when its type is not excluded and, if only-type is set, is listed there.
fn is_type_allowed(environment: &Environment, criteria: &SelectionCriteria) -> bool {
    if has_type_in(environment, &criteria.exclude_types) {
        return false;
    }
    criteria.only_types.is_empty() || has_type_in(environment, &criteria.only_types)
}

fn has_type_in(environment: &Environment, types: &[String]) -> bool {
    environment
        .environment_type()
        .is_some_and(|t| types.iter().any(|candidate| candidate == t))
}

fn resolve(all: &EnvironmentCollection, patterns: &[String]) -> Result<Vec<String>> {
    wildcard::select(all.keys().map(String::as_str), patterns)
        .context("expanding environment wildcards")
}

fn filter<F>(environments: &EnvironmentCollection, predicate: F) -> EnvironmentCollection
where
    F: Fn(&Environment) -> bool,
{
    environments
        .iter()
        .filter(|(_, environment)| predicate(environment))
        .map(|(id, environment)| (id.clone(), environment.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::{
        dependencies::mocks::MockPlatform,
        models::{EnvironmentStatus, MergeInfo, collect_environments},
    };

    fn environments() -> EnvironmentCollection {
        collect_environments([
            Environment::new("main", EnvironmentStatus::Active).with_type("production"),
            Environment::new("staging", EnvironmentStatus::Active)
                .with_parent("main")
                .with_type("staging"),
            Environment::new("test", EnvironmentStatus::Inactive)
                .with_parent("main")
                .with_type("development"),
            Environment::new("test-1", EnvironmentStatus::Active)
                .with_parent("main")
                .with_type("development")
                .with_merge_info(MergeInfo {
                    commits_ahead: 0,
                    commits_behind: 4,
                    parent_ref: Some("abc".to_string()),
                }),
            Environment::new("testing-2", EnvironmentStatus::Inactive)
                .with_parent("main")
                .with_type("development"),
        ])
    }

    fn platform_with(environments: EnvironmentCollection) -> MockPlatform {
        let mut platform = MockPlatform::new();
        platform
            .expect_list()
            .with(eq("abc"), eq(false))
            .return_once(move |_, _| Ok(environments));
        platform
    }

    async fn select(platform: &MockPlatform, criteria: &SelectionCriteria) -> Selection {
        select_environments(platform, "abc", criteria)
            .await
            .unwrap()
    }

    fn ids(selection: &Selection) -> Vec<&str> {
        selection.selected.keys().map(String::as_str).collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_select_inactive() {
        let platform = platform_with(environments());
        let criteria = SelectionCriteria {
            inactive: true,
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["test", "testing-2"]);
        assert!(selection.anything_specified);
        assert_eq!(selection.errors, 0);
    }

    #[tokio::test]
    async fn test_select_merged() {
        let platform = platform_with(environments());
        let criteria = SelectionCriteria {
            merged: true,
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["test-1"]);
    }

    #[tokio::test]
    async fn test_criteria_union_without_duplicates() {
        let platform = platform_with(environments());
        let criteria = SelectionCriteria {
            environment_ids: strings(&["test%", "test"]),
            inactive: true,
            merged: true,
            types: strings(&["development"]),
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["test", "test-1", "testing-2"]);
        assert_eq!(selection.errors, 0);
    }

    #[tokio::test]
    async fn test_exclude_type_removes_environments_selected_by_type() {
        let platform = platform_with(environments());
        let criteria = SelectionCriteria {
            types: strings(&["development", "staging"]),
            exclude_types: strings(&["staging"]),
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["test", "test-1", "testing-2"]);
    }

    #[tokio::test]
    async fn test_exclude_type_and_only_type_combine() {
        let platform = platform_with(environments());
        let criteria = SelectionCriteria {
            environment_ids: strings(&["%"]),
            only_types: strings(&["development", "staging"]),
            exclude_types: strings(&["staging"]),
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["test", "test-1", "testing-2"]);
    }

    #[tokio::test]
    async fn test_only_type_drops_untyped_environments() {
        let mut all = environments();
        all.insert(
            "untyped".to_string(),
            Environment::new("untyped", EnvironmentStatus::Inactive),
        );
        let platform = platform_with(all);
        let criteria = SelectionCriteria {
            inactive: true,
            only_types: strings(&["development"]),
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["test", "testing-2"]);
    }

    #[tokio::test]
    async fn test_exclude_by_id_and_wildcard() {
        let platform = platform_with(environments());
        let criteria = SelectionCriteria {
            environment_ids: strings(&["%"]),
            exclude: strings(&["main", "test-%"]),
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["staging", "test", "testing-2"]);
    }

    #[tokio::test]
    async fn test_unknown_id_refreshes_once_then_reports_error() {
        let mut platform = platform_with(environments());
        platform
            .expect_list()
            .with(eq("abc"), eq(true))
            .times(1)
            .return_once(|_, _| Ok(environments()));
        let criteria = SelectionCriteria {
            environment_ids: strings(&["missing", "staging"]),
            inactive: true,
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["staging", "test", "testing-2"]);
        assert_eq!(selection.errors, 1);
    }

    #[tokio::test]
    async fn test_refresh_finds_new_environment() {
        let mut platform = platform_with(environments());
        platform
            .expect_list()
            .with(eq("abc"), eq(true))
            .times(1)
            .return_once(|_, _| {
                let mut refreshed = environments();
                refreshed.insert(
                    "fresh".to_string(),
                    Environment::new("fresh", EnvironmentStatus::Active),
                );
                Ok(refreshed)
            });
        let criteria = SelectionCriteria {
            environment_ids: strings(&["fresh"]),
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["fresh"]);
        assert_eq!(selection.errors, 0);
        assert!(selection.all.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_known_ids_do_not_refresh() {
        let mut platform = platform_with(environments());
        platform.expect_list().with(eq("abc"), eq(true)).never();
        let criteria = SelectionCriteria {
            environment_ids: strings(&["staging", "nothing-%"]),
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert_eq!(ids(&selection), vec!["staging"]);
        assert_eq!(selection.errors, 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_current_environment() {
        let mut platform = platform_with(environments());
        platform
            .expect_resolve_current()
            .with(eq("abc"))
            .return_once(|_| Ok(Some(Environment::new("staging", EnvironmentStatus::Active))));

        let selection = select(&platform, &SelectionCriteria::default()).await;

        assert_eq!(ids(&selection), vec!["staging"]);
        assert!(!selection.anything_specified);
    }

    #[tokio::test]
    async fn test_no_current_environment_is_an_error() {
        let mut platform = platform_with(environments());
        platform.expect_resolve_current().return_once(|_| Ok(None));

        let selection = select(&platform, &SelectionCriteria::default()).await;

        assert!(selection.selected.is_empty());
        assert_eq!(selection.errors, 1);
    }

    #[tokio::test]
    async fn test_empty_positive_criteria_do_not_fall_back() {
        let mut platform = platform_with(collect_environments([Environment::new(
            "main",
            EnvironmentStatus::Active,
        )]));
        platform.expect_resolve_current().never();
        let criteria = SelectionCriteria {
            inactive: true,
            ..Default::default()
        };

        let selection = select(&platform, &criteria).await;

        assert!(selection.selected.is_empty());
        assert!(selection.anything_specified);
        assert_eq!(selection.errors, 0);
    }
}
