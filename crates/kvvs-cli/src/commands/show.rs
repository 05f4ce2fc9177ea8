//! `kvvs show` command - print a commit and its content.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use kvvs_core::{Commit, CommitStore};
use serde::Serialize;

use crate::output;

#[derive(Serialize)]
struct JsonOutput<'a> {
    commit: &'a Commit,
    content: &'a str,
}

/// Run the show command for a commit hash or a branch head.
pub async fn run<S: CommitStore>(
    store: &S,
    repo: &str,
    hash: Option<&str>,
    branch: Option<&str>,
    json: bool,
) -> Result<()> {
    let hash = match (hash, branch) {
        (Some(hash), _) => hash.to_owned(),
        (None, Some(branch)) => {
            store
                .get_branch(repo, branch)
                .await
                .with_context(|| format!("Failed to resolve branch {branch}"))?
                .commit
        }
        (None, None) => bail!("Either a commit hash or --branch is required"),
    };

    let (commit, content) = store
        .get_commit(repo, &hash)
        .await
        .with_context(|| format!("Failed to read commit {hash}"))?;

    if json {
        let out = JsonOutput {
            commit: &commit,
            content: &content,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    output::detail(&format!("{} {}", "commit".yellow(), commit.hash.yellow()));
    if !commit.parent.is_empty() {
        output::detail(&format!("parent  {}", commit.parent));
    }
    output::detail(&format!("branch  {}", commit.branch));
    output::detail(&format!("author  {} <{}>", commit.author_name, commit.author_id));
    output::detail(&format!("date    {}", output::timestamp(commit.timestamp)));
    if commit.archived {
        output::detail(&format!("storage {}", "archived".dimmed()));
    }
    output::hr();
    output::essential(content.trim_end_matches('\n'));
    Ok(())
}
