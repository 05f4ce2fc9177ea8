//! `kvvs policy` commands.

use anyhow::{Context, Result};
use kvvs_core::types::seconds_delta;
use kvvs_core::{CommitStore, PolicyRecord, RetentionPolicy};
use serde::Serialize;

use super::{PolicyArgs, PolicyCommand};
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    repo: &'a str,
    #[serde(flatten)]
    record: PolicyRecord,
}

/// Run a policy subcommand.
pub async fn run<S: CommitStore>(store: &S, command: PolicyCommand) -> Result<()> {
    match command {
        PolicyCommand::Get { repo, json } => {
            let policy = store.get_policy(&repo).await?;
            if json {
                let out = JsonOutput {
                    repo: &policy.repo,
                    record: policy.to_record(),
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_policy(&policy);
            }
        }
        PolicyCommand::Set(PolicyArgs {
            repo,
            hot_commit_limit,
            hot_duration_secs,
        }) => {
            let policy = store
                .set_policy(RetentionPolicy::new(
                    repo,
                    hot_commit_limit,
                    seconds_delta(hot_duration_secs),
                ))
                .await
                .context("Failed to set policy")?;
            output::success(&format!("Locked retention policy for {}", policy.repo));
            print_policy(&policy);
        }
    }
    Ok(())
}

fn print_policy(policy: &RetentionPolicy) {
    output::detail(&format!(
        "hot commit limit  {}",
        describe_limit(policy.hot_commit_limit, "")
    ));
    output::detail(&format!(
        "hot duration      {}",
        describe_limit(policy.hot_duration.num_seconds(), "s")
    ));
    output::detail(&format!(
        "locked            {}",
        if policy.locked { "yes" } else { "no" }
    ));
}

fn describe_limit(value: i64, unit: &str) -> String {
    if value == 0 {
        "unlimited".to_owned()
    } else {
        format!("{value}{unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_limit() {
        assert_eq!(describe_limit(0, "s"), "unlimited");
        assert_eq!(describe_limit(3600, "s"), "3600s");
        assert_eq!(describe_limit(5, ""), "5");
    }
}
