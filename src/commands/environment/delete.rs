//! Command to delete environments.
//!
//! The command selects environments (see [`crate::selection`]), decides per environment what to
//! do with it, then deactivates active environments and deletes the Git branches of inactive ones.
//! Deactivations all run first; branch deletion of a just-deactivated environment needs the
//! deactivation to have finished, so it only happens when waiting.

use std::fmt::Display;

use anyhow::{Result, bail};
use async_trait::async_trait;
use console::style;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    args::{self, GlobalArgs},
    commands::{
        CommandOutcome, CommandWithOutput,
        core::{EXIT_FAILURE, EXIT_SUCCESS},
    },
    config::CliConfig,
    dependencies::{
        ActivityWaiter, EnvironmentOperations, EnvironmentRegistry, EnvironmentSelector,
    },
    interaction::{ConfirmationPrompt, Confirmer, Interaction, SpinnerInteraction},
    models::{Environment, EnvironmentCollection, EnvironmentStatus},
    platform::Platform,
    selection::{Selection, SelectionCriteria, select_environments, wildcard::split_list},
};

// Interaction dependencies for the delete command
pub trait DeleteInteraction: ConfirmationPrompt + SpinnerInteraction + Send + Sync {}
impl<T: ConfirmationPrompt + SpinnerInteraction + Send + Sync> DeleteInteraction for T {}

// Platform dependencies for the delete command
pub trait DeletePlatform:
    EnvironmentRegistry + EnvironmentSelector + EnvironmentOperations + ActivityWaiter + Send + Sync
{
}
impl<T> DeletePlatform for T where
    T: EnvironmentRegistry
        + EnvironmentSelector
        + EnvironmentOperations
        + ActivityWaiter
        + Send
        + Sync
{
}

/// What to do with the Git branch of an active environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDeletion {
    /// Ask the user (only when interactive).
    Ask,
    /// `--delete-branch`
    Always,
    /// `--no-delete-branch`
    Never,
}

/// Outcome of the questions asked for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeletionPlan {
    Declined,
    Deactivate,
    DeactivateAndDeleteBranch,
    DeleteBranch,
    /// Already being deleted, nothing to do.
    InProgress,
    /// Can't be deleted, counts as an error.
    Rejected,
}

/// Environments to act on, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPartition {
    pub to_deactivate: EnvironmentCollection,
    pub to_delete_branch: EnvironmentCollection,
    pub errors: usize,
}

pub struct Delete {
    project: String,
    criteria: SelectionCriteria,
    branch_deletion: BranchDeletion,
    wait: bool,
    assume_yes: bool,

    interaction: Box<dyn DeleteInteraction>,
    platform: Box<dyn DeletePlatform>,
}

impl Delete {
    pub fn new(
        args: args::environment::Delete,
        global_args: &GlobalArgs,
        config: &CliConfig,
    ) -> Result<Self> {
        // Rejected before anything touches the platform
        if args.inactive && args.no_delete_branch {
            bail!("The options --inactive and --no-delete-branch cannot be combined.");
        }

        let platform = Platform::connect(global_args, config)?;
        let project = platform.project()?;

        let branch_deletion = if args.no_delete_branch {
            BranchDeletion::Never
        } else if args.delete_branch {
            BranchDeletion::Always
        } else {
            BranchDeletion::Ask
        };

        let wait = if args.no_wait {
            false
        } else {
            args.wait || config.wait
        };

        Ok(Self {
            project,
            criteria: SelectionCriteria {
                environment_ids: split_list(&args.environment_ids),
                inactive: args.inactive,
                merged: args.merged,
                types: args.types,
                only_types: args.only_types,
                exclude_types: args.exclude_types,
                exclude: split_list(&args.exclude),
            },
            branch_deletion,
            wait,
            assume_yes: global_args.yes,

            interaction: Box::new(Interaction::new()),
            platform: Box::new(platform),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub deactivated: Vec<String>,
    pub branches_deleted: Vec<String>,
    pub success: bool,
}

impl Display for DeleteResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.deactivated.is_empty() && self.branches_deleted.is_empty() {
            return write!(f, "No environments were deleted");
        }

        let mut lines = Vec::new();
        if !self.deactivated.is_empty() {
            lines.push(format!("Deactivated: {}", self.deactivated.join(", ")));
        }
        if !self.branches_deleted.is_empty() {
            lines.push(format!("Deleted branches: {}", self.branches_deleted.join(", ")));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

impl CommandOutcome for DeleteResult {
    fn exit_code(&self) -> u8 {
        if self.success {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}

impl Delete {
    /// Decide what to do with every selected environment.
    fn partition(&self, selection: &Selection) -> Result<ActionPartition> {
        let confirmer = Confirmer::new(self.interaction.as_ref(), self.assume_yes);
        let mut partition = ActionPartition::default();

        for (id, environment) in &selection.selected {
            let plan = self.plan(&confirmer, environment, selection)?;
            trace!(environment = %id, ?plan, "planned environment");

            match plan {
                DeletionPlan::Deactivate => {
                    partition
                        .to_deactivate
                        .insert(id.clone(), environment.clone());
                }
                DeletionPlan::DeactivateAndDeleteBranch => {
                    partition
                        .to_deactivate
                        .insert(id.clone(), environment.clone());
                    partition
                        .to_delete_branch
                        .insert(id.clone(), environment.clone());
                }
                DeletionPlan::DeleteBranch => {
                    partition
                        .to_delete_branch
                        .insert(id.clone(), environment.clone());
                }
                DeletionPlan::Rejected => partition.errors += 1,
                DeletionPlan::Declined | DeletionPlan::InProgress => {}
            }
        }

        Ok(partition)
    }

    fn plan<P>(
        &self,
        confirmer: &Confirmer<'_, P>,
        environment: &Environment,
        selection: &Selection,
    ) -> Result<DeletionPlan>
    where
        P: ConfirmationPrompt + ?Sized,
    {
        let id = environment.id();

        if environment.has_children_in(selection.all.values()) {
            eprintln!(
                "The environment {} has children and therefore can't be deleted.",
                style(id).red()
            );
            eprintln!("Please delete the environment's children first.");
            return Ok(DeletionPlan::Rejected);
        }

        if environment.is_active() {
            eprintln!(
                "The environment {} is currently active: deleting it will delete all associated data.",
                style(id).cyan()
            );
            let question = format!("Are you sure you want to delete the environment {id}?");
            if !confirmer.confirm(&question)? {
                return Ok(DeletionPlan::Declined);
            }

            let delete_branch = match self.branch_deletion {
                BranchDeletion::Never => false,
                BranchDeletion::Always => true,
                BranchDeletion::Ask => {
                    confirmer.is_interactive()
                        && confirmer.confirm("Delete the remote Git branch too?")?
                }
            };

            if !delete_branch {
                return Ok(DeletionPlan::Deactivate);
            }
            if !self.wait {
                eprintln!(
                    "The Git branch {} can only be deleted after the environment is deactivated, which requires waiting.",
                    style(id).cyan()
                );
                return Ok(DeletionPlan::Deactivate);
            }
            return Ok(DeletionPlan::DeactivateAndDeleteBranch);
        }

        match environment.status() {
            EnvironmentStatus::Inactive => {
                if self.branch_deletion == BranchDeletion::Never {
                    eprintln!(
                        "Not deleting the inactive environment {} (--no-delete-branch).",
                        style(id).cyan()
                    );
                    return Ok(DeletionPlan::Declined);
                }
                let question =
                    format!("Are you sure you want to delete the remote Git branch {id}?");
                if confirmer.confirm(&question)? {
                    Ok(DeletionPlan::DeleteBranch)
                } else {
                    Ok(DeletionPlan::Declined)
                }
            }
            EnvironmentStatus::Dirty => {
                eprintln!(
                    "The environment {} is currently building, and therefore can't be deleted. Please wait.",
                    style(id).red()
                );
                Ok(DeletionPlan::Rejected)
            }
            EnvironmentStatus::Deleting => {
                eprintln!(
                    "The environment {} is already being deleted.",
                    style(id).cyan()
                );
                Ok(DeletionPlan::InProgress)
            }
            status => {
                eprintln!(
                    "The environment {} has an unrecognized status: {}",
                    style(id).red(),
                    status
                );
                Ok(DeletionPlan::Rejected)
            }
        }
    }

    /// Deactivate environments, returns the ids that were deactivated.
    async fn deactivate_all(&self, partition: &ActionPartition) -> (Vec<String>, bool) {
        let mut deactivated = Vec::new();
        let mut activities = Vec::new();

        for id in partition.to_deactivate.keys() {
            eprintln!("Deleting environment {}", style(id).green());
            match self.platform.deactivate(&self.project, id).await {
                Ok(activity) => {
                    activities.push(activity);
                    deactivated.push(id.clone());
                }
                Err(e) => eprintln!("{:#}", e),
            }
        }

        if !self.wait || activities.is_empty() {
            return (deactivated, true);
        }

        // When _spinner goes out of scope, the spinner will be stopped
        let _spinner = self
            .interaction
            .start_spinner("Waiting for the environment(s) to be deactivated...".to_string());

        let completed = match self.platform.wait_all(&activities, &self.project).await {
            Ok(completed) => completed,
            Err(e) => {
                eprintln!("{:#}", e);
                false
            }
        };

        (deactivated, completed)
    }

    /// Delete Git branches, returns the ids whose branch was deleted.
    async fn delete_branches(&self, partition: &ActionPartition) -> Vec<String> {
        let mut deleted = Vec::new();

        for (id, environment) in &partition.to_delete_branch {
            match self.delete_branch(environment).await {
                Ok(true) => {
                    eprintln!("Deleted remote Git branch {}", style(id).green());
                    deleted.push(id.clone());
                }
                Ok(false) => {
                    eprintln!(
                        "Cannot delete branch {}: it is not (yet) inactive.",
                        style(id).red()
                    );
                }
                Err(e) => eprintln!("{:#}", e),
            }
        }

        deleted
    }

    async fn delete_branch(&self, environment: &Environment) -> Result<bool> {
        if !environment.is_inactive() {
            let refreshed = self
                .platform
                .refresh(&self.project, environment.id())
                .await?;
            if !refreshed.is_inactive() {
                return Ok(false);
            }
        }

        self.platform.delete(&self.project, environment.id()).await?;
        Ok(true)
    }
}

#[async_trait]
impl CommandWithOutput for Delete {
    type Output = DeleteResult;

    async fn execute(&mut self) -> Result<Self::Output> {
        trace!(
            project = %self.project,
            criteria = ?self.criteria,
            wait = self.wait,
            "executing delete command"
        );

        let platform = self.platform.as_ref();
        let selection = select_environments(platform, &self.project, &self.criteria).await?;
        debug!(
            selected = selection.selected.len(),
            errors = selection.errors,
            "selection complete"
        );

        if selection.selected.is_empty() {
            if selection.anything_specified {
                eprintln!("No environment(s) to delete.");
            }
            return Ok(DeleteResult {
                deactivated: Vec::new(),
                branches_deleted: Vec::new(),
                success: selection.errors == 0,
            });
        }

        let partition = self.partition(&selection)?;
        let mut errors = selection.errors + partition.errors;

        let (deactivated, completed) = self.deactivate_all(&partition).await;
        if !completed {
            errors += 1;
        }

        let branches_deleted = self.delete_branches(&partition).await;

        if !deactivated.is_empty() || !branches_deleted.is_empty() || errors > 0 {
            if let Err(e) = self.platform.invalidate(&self.project).await {
                debug!(error = %e, "failed to clear the environment cache");
            }
        }

        let success = errors == 0
            && deactivated.len() >= partition.to_deactivate.len()
            && branches_deleted.len() >= partition.to_delete_branch.len();

        Ok(DeleteResult {
            deactivated,
            branches_deleted,
            success,
        })
    }
}
