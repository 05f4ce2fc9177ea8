//! `kvvs log` command - list a repository's history.

use anyhow::{Context, Result};
use colored::Colorize;
use kvvs_core::{Commit, CommitStore, ListCommitsOptions};

use crate::output;

/// Run the log command.
pub async fn run<S: CommitStore>(
    store: &S,
    repo: String,
    asc: bool,
    limit: usize,
    json: bool,
) -> Result<()> {
    let commits = store
        .list_commits(ListCommitsOptions {
            repo: repo.clone(),
            descending: !asc,
            limit,
        })
        .await
        .with_context(|| format!("Failed to list commits of {repo}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&commits)?);
        return Ok(());
    }

    if commits.is_empty() {
        output::warn(&format!("No commits in {repo}"));
        return Ok(());
    }

    for commit in &commits {
        output::essential(&format_line(commit));
    }
    Ok(())
}

fn format_line(commit: &Commit) -> String {
    let marker = if commit.archived {
        format!(" {}", "(archived)".dimmed())
    } else {
        String::new()
    };
    format!(
        "{}  {}  {:<12} {}{}",
        output::short_hash(&commit.hash).yellow(),
        output::timestamp(commit.timestamp),
        commit.branch,
        commit.author_name,
        marker
    )
}
