//! Command definitions and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use kvvs_core::{CommitStore, Config, MemoryStore, StorageBackend, open_archive};
use kvvs_keydb::KeyDbStore;

pub mod branch;
pub mod completions;
pub mod init;
pub mod log;
pub mod policy;
pub mod put;
pub mod show;
pub mod tag;

/// kvvs - versioned blob storage on a key-value engine.
#[derive(Debug, Parser)]
#[command(name = "kvvs", version, about, propagate_version = true)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = "kvvs.toml")]
    pub config: PathBuf,

    /// Log engine activity to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print essential output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Commit content as the new head of a branch.
    Put(put::PutArgs),

    /// Show a commit's metadata and content.
    Show {
        repo: String,

        /// Commit hash.
        #[arg(required_unless_present = "branch", conflicts_with = "branch")]
        hash: Option<String>,

        /// Show the head of this branch instead.
        #[arg(long)]
        branch: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List a repository's commits, newest first.
    Log {
        repo: String,

        /// Oldest first.
        #[arg(long)]
        asc: bool,

        /// Maximum number of commits (0 = all).
        #[arg(short = 'n', long, default_value_t = 0)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// List, inspect or move branches.
    #[command(subcommand)]
    Branch(BranchCommand),

    /// List, inspect or create tags.
    #[command(subcommand)]
    Tag(TagCommand),

    /// Inspect or set a repository's retention policy.
    #[command(subcommand)]
    Policy(PolicyCommand),

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum BranchCommand {
    /// List branches.
    List {
        repo: String,
        #[arg(long)]
        json: bool,
    },
    /// Show one branch.
    Get {
        repo: String,
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Point a branch at a commit.
    Set { repo: String, name: String, commit: String },
}

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    /// List tags.
    List {
        repo: String,
        #[arg(long)]
        json: bool,
    },
    /// Show one tag.
    Get {
        repo: String,
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Create a tag; tags cannot be moved afterwards.
    Create {
        repo: String,
        name: String,
        commit: String,
        #[arg(long, default_value = "")]
        note: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum PolicyCommand {
    /// Show the effective policy.
    Get {
        repo: String,
        #[arg(long)]
        json: bool,
    },
    /// Set and lock the policy.
    Set(PolicyArgs),
}

#[derive(Debug, Args)]
pub struct PolicyArgs {
    pub repo: String,

    /// Commits kept in hot storage (0 = unlimited).
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub hot_commit_limit: i64,

    /// Seconds before a commit is archived (0 = unlimited).
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub hot_duration_secs: i64,
}

/// Open the configured backend once and run `command` against it.
pub async fn run(config_path: &std::path::Path, command: Commands) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let archive = open_archive(&config.retention).context("Failed to open archive")?;
    let defaults = config.retention.defaults();
    tracing::debug!(
        backend = ?config.storage.backend,
        archive = archive.is_some(),
        "opening store"
    );

    let result = match config.storage.backend {
        StorageBackend::Memory => {
            let store = MemoryStore::new(archive.clone(), defaults);
            dispatch(&store, command).await
        }
        StorageBackend::Keydb => {
            let store = KeyDbStore::connect(&config.storage.keydb, archive.clone(), defaults)
                .await
                .with_context(|| format!("Failed to connect to {}", config.storage.keydb.addr))?;
            dispatch(&store, command).await
        }
    };

    if let Some(archive) = archive {
        archive.close().context("Failed to close archive")?;
    }
    result
}

/// Run a store-backed command.
pub async fn dispatch<S: CommitStore>(store: &S, command: Commands) -> Result<()> {
    match command {
        Commands::Put(args) => put::run(store, args).await,
        Commands::Show {
            repo,
            hash,
            branch,
            json,
        } => show::run(store, &repo, hash.as_deref(), branch.as_deref(), json).await,
        Commands::Log {
            repo,
            asc,
            limit,
            json,
        } => log::run(store, repo, asc, limit, json).await,
        Commands::Branch(cmd) => branch::run(store, cmd).await,
        Commands::Tag(cmd) => tag::run(store, cmd).await,
        Commands::Policy(cmd) => policy::run(store, cmd).await,
        Commands::Init { .. } | Commands::Completions { .. } => {
            bail!("this command does not use a store")
        }
    }
}
