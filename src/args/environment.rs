use clap::{Parser, Subcommand};

#[derive(Subcommand)]
pub enum Environment {
    #[command(alias = "rm")]
    Delete(Delete),
    #[command(alias = "ls")]
    List(List),
}

/// Get a list of environments.
#[derive(Parser)]
pub struct List {
    /// Refresh the list instead of using cached data.
    #[arg(long)]
    pub refresh: bool,
}

/// Delete one or more environments.
///
/// When a Git branch is deleted, the corresponding environment is deleted too.
/// An active environment is first deactivated, which deletes all of its data.
///
/// Environment IDs may use `%` as a wildcard, e.g. `feature-%`. Several IDs can be given
/// separated by spaces or commas.
#[derive(Parser)]
pub struct Delete {
    /// The environment(s) to delete.
    #[arg(value_name = "ENVIRONMENT")]
    pub environment_ids: Vec<String>,

    /// Delete Git branch(es) (inactive environments).
    #[arg(long, conflicts_with = "no_delete_branch")]
    pub delete_branch: bool,

    /// Do not delete any Git branch(es) (inactive environments).
    #[arg(long)]
    pub no_delete_branch: bool,

    /// Delete all environments of a type (adding to any others selected).
    #[arg(long = "type", value_delimiter = ',')]
    pub types: Vec<String>,

    /// Only delete environments of a specific type.
    #[arg(long = "only-type", short = 't', value_delimiter = ',')]
    pub only_types: Vec<String>,

    /// Environment(s) not to delete.
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Environment type(s) of which not to delete.
    #[arg(long = "exclude-type", value_delimiter = ',')]
    pub exclude_types: Vec<String>,

    /// Delete all inactive environments (adding to any others selected).
    #[arg(long)]
    pub inactive: bool,

    /// Delete all merged environments (adding to any others selected).
    #[arg(long)]
    pub merged: bool,

    /// Wait for the operation to complete.
    #[arg(long, conflicts_with = "no_wait")]
    pub wait: bool,

    /// Do not wait for the operation to complete.
    #[arg(long, short = 'W')]
    pub no_wait: bool,
}
