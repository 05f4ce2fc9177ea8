//! `kvvs branch` commands.

use anyhow::{Context, Result};
use kvvs_core::{Branch, BranchRequest, CommitStore};

use super::BranchCommand;
use crate::output;

/// Run a branch subcommand.
pub async fn run<S: CommitStore>(store: &S, command: BranchCommand) -> Result<()> {
    match command {
        BranchCommand::List { repo, json } => {
            let branches = store
                .list_branches(&repo)
                .await
                .with_context(|| format!("Failed to list branches of {repo}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&branches)?);
            } else if branches.is_empty() {
                output::warn(&format!("No branches in {repo}"));
            } else {
                for branch in &branches {
                    print_branch(branch);
                }
            }
        }
        BranchCommand::Get { repo, name, json } => {
            let branch = store.get_branch(&repo, &name).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&branch)?);
            } else {
                print_branch(&branch);
            }
        }
        BranchCommand::Set { repo, name, commit } => {
            let branch = store
                .upsert_branch(BranchRequest { repo, name, commit })
                .await
                .context("Failed to move branch")?;
            output::success(&format!(
                "{} now points at {}",
                branch.name,
                output::short_hash(&branch.commit)
            ));
        }
    }
    Ok(())
}

fn print_branch(branch: &Branch) {
    output::essential(&format!(
        "{:<20} {}  {}",
        branch.name,
        output::short_hash(&branch.commit),
        output::timestamp(branch.updated_at)
    ));
}
