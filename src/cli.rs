//! CLI interface for zvezda.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod ai_commit;
pub mod batch;
pub mod info;
pub mod repos;

/// zvezda: batch maintenance for a directory of git repositories.
#[derive(Parser)]
#[command(name = "zvezda")]
#[command(about = "Batch maintenance for a directory of git repositories", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Pull, tidy, commit and push every repository under a directory.
    Batch(batch::BatchCommand),
    /// Commit pending changes in the current directory with an AI-written message.
    AiCommit(ai_commit::AiCommitCommand),
    /// List your GitHub repositories.
    Repos(repos::ReposCommand),
    /// Summarize a repository.
    Info(info::InfoCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Batch(batch_cmd) => batch_cmd.execute().await,
            Commands::AiCommit(ai_commit_cmd) => ai_commit_cmd.execute().await,
            Commands::Repos(repos_cmd) => repos_cmd.execute().await,
            Commands::Info(info_cmd) => info_cmd.execute().await,
        }
    }
}
