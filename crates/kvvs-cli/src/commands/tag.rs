//! `kvvs tag` commands.

use anyhow::{Context, Result};
use kvvs_core::{CommitStore, Tag, TagRequest};

use super::TagCommand;
use crate::output;

/// Run a tag subcommand.
pub async fn run<S: CommitStore>(store: &S, command: TagCommand) -> Result<()> {
    match command {
        TagCommand::List { repo, json } => {
            let tags = store
                .list_tags(&repo)
                .await
                .with_context(|| format!("Failed to list tags of {repo}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tags)?);
            } else if tags.is_empty() {
                output::warn(&format!("No tags in {repo}"));
            } else {
                for tag in &tags {
                    print_tag(tag);
                }
            }
        }
        TagCommand::Get { repo, name, json } => {
            let tag = store.get_tag(&repo, &name).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tag)?);
            } else {
                print_tag(&tag);
            }
        }
        TagCommand::Create {
            repo,
            name,
            commit,
            note,
        } => {
            let tag = store
                .create_tag(TagRequest {
                    repo,
                    name,
                    commit,
                    note,
                })
                .await
                .context("Failed to create tag")?;
            output::success(&format!(
                "Tagged {} as {}",
                output::short_hash(&tag.commit),
                tag.name
            ));
        }
    }
    Ok(())
}

fn print_tag(tag: &Tag) {
    let line = format!(
        "{:<20} {}  {}",
        tag.name,
        output::short_hash(&tag.commit),
        output::timestamp(tag.created_at)
    );
    if tag.note.is_empty() {
        output::essential(&line);
    } else {
        output::essential(&format!("{line}  {}", tag.note));
    }
}
