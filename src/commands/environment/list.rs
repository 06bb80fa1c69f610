//! Command to list the environments of a project.

use std::fmt::Display;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::{
    args::{self, GlobalArgs},
    commands::{CommandOutcome, CommandWithOutput},
    config::CliConfig,
    dependencies::EnvironmentRegistry,
    models::Environment,
    platform::Platform,
    table::{Table, TableColumn},
};

/// Command to list the environments of a project.
///
/// Listings come from the environment cache unless `--refresh` is given.
pub struct List {
    project: String,
    refresh: bool,
    registry: Box<dyn EnvironmentRegistry + Send + Sync>,
}

impl List {
    pub fn new(
        args: args::environment::List,
        global_args: &GlobalArgs,
        config: &CliConfig,
    ) -> Result<Self> {
        let platform = Platform::connect(global_args, config)?;

        Ok(Self {
            project: platform.project()?,
            refresh: args.refresh,
            registry: Box::new(platform),
        })
    }
}

/// Result of the list command, ordered by id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListResult(Vec<Environment>);

const COLUMNS: [TableColumn<&str, Environment>; 5] = [
    ("ID", |e| e.id().to_string()),
    ("TITLE", |e| e.title().unwrap_or_default().to_string()),
    ("STATUS", |e| e.status().to_string()),
    ("TYPE", |e| e.environment_type().unwrap_or_default().to_string()),
    ("PARENT", |e| e.parent().unwrap_or_default().to_string()),
];

impl From<&ListResult> for Table {
    fn from(value: &ListResult) -> Self {
        Table::from_iter(&value.0, &COLUMNS)
    }
}

impl Display for ListResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Table::from(self).fmt(f)
    }
}

impl CommandOutcome for ListResult {}

#[async_trait]
impl CommandWithOutput for List {
    type Output = ListResult;

    async fn execute(&mut self) -> Result<Self::Output> {
        let environments = self.registry.list(&self.project, self.refresh).await?;

        Ok(ListResult(environments.into_values().collect()))
    }
}
