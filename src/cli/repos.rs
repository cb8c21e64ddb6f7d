//! `repos` command: list the operator's GitHub repositories.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use crate::git::{fetch_github_repos, GithubRepo, SystemGateway};

/// Repository listing options.
#[derive(Parser, Debug)]
pub struct ReposCommand {
    /// Print the decoded list as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ReposCommand {
    /// Executes the repos command.
    pub async fn execute(self) -> Result<()> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let repos = fetch_github_repos(&SystemGateway::new(), &cwd).await?;
        write_repo_list(&repos, self.json, &mut io::stdout().lock())
    }
}

/// Prints one `name [language] - description` line per repository, or JSON.
pub fn write_repo_list<W: Write>(repos: &[GithubRepo], json: bool, out: &mut W) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, repos).context("Failed to encode repositories")?;
        writeln!(out)?;
        return Ok(());
    }

    for repo in repos {
        match repo.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => {
                writeln!(out, "{} [{}] - {description}", repo.name, repo.language_name())?;
            }
            None => writeln!(out, "{} [{}]", repo.name, repo.language_name())?,
        }
    }
    Ok(())
}
