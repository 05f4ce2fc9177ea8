//! `kvvs put` command - commit content to a branch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kvvs_core::{BlobWriteRequest, CommitStore};

use crate::output;

#[derive(Debug, Args)]
pub struct PutArgs {
    pub repo: String,

    /// Target branch (default: main).
    #[arg(short, long, default_value = "")]
    pub branch: String,

    /// Author display name.
    #[arg(long)]
    pub author: String,

    /// Stable author identifier, bound to the first name it is used with.
    #[arg(long)]
    pub author_id: String,

    /// Content to commit.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub content: Option<String>,

    /// Read the content from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub json: bool,
}

/// Run the put command.
pub async fn run<S: CommitStore>(store: &S, args: PutArgs) -> Result<()> {
    let content = match (args.content, &args.file) {
        (Some(content), _) => content,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => String::new(),
    };

    let result = store
        .put_blob_and_commit(BlobWriteRequest {
            repo: args.repo.clone(),
            branch: args.branch,
            content,
            author_name: args.author,
            author_id: args.author_id,
        })
        .await
        .with_context(|| format!("Failed to commit to {}", args.repo))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::success(&format!(
        "Committed {} on {}/{}",
        output::short_hash(&result.commit_hash),
        args.repo,
        result.branch
    ));
    if result.diff.is_empty() {
        output::info("Content unchanged");
    } else {
        output::diff(&result.diff);
    }
    output::essential(&result.commit_hash);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kvvs_core::{ListCommitsOptions, MemoryStore, RetentionDefaults};

    use super::*;

    fn args(content: Option<&str>, file: Option<PathBuf>) -> PutArgs {
        PutArgs {
            repo: "docs".into(),
            branch: String::new(),
            author: "Alice".into(),
            author_id: "alice@id".into(),
            content: content.map(Into::into),
            file,
            json: false,
        }
    }

    #[tokio::test]
    async fn test_put_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("body.txt");
        std::fs::write(&path, "from file\n").unwrap();

        let store = MemoryStore::new(None, RetentionDefaults::default());
        run(&store, args(None, Some(path))).await.unwrap();

        let commits = store
            .list_commits(&ListCommitsOptions {
                repo: "docs".into(),
                ..ListCommitsOptions::default()
            })
            .unwrap();
        let (_, content) = store.get_commit("docs", &commits[0].hash).unwrap();
        assert_eq!(content, "from file\n");
    }

    #[tokio::test]
    async fn test_put_missing_file_fails() {
        let store = MemoryStore::new(None, RetentionDefaults::default());
        let err = run(&store, args(None, Some("/nonexistent/body.txt".into())))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
