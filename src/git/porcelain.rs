//! Thin wrapper over the `git` porcelain commands the tools rely on.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::gateway::{CommandGateway, GatewayError, Invocation};

/// Errors from a `git` subcommand.
#[derive(Error, Debug)]
pub enum GitError {
    /// The `git` process could not be run at all.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// `git` ran and exited unsuccessfully.
    #[error("`git {command}` failed: {detail}")]
    Failed {
        /// Subcommand and arguments, without the leading `git`.
        command: String,
        /// Stderr or exit status description.
        detail: String,
    },
}

/// `git` bound to one working tree.
pub struct GitCli<'a> {
    gateway: &'a dyn CommandGateway,
    workdir: &'a Path,
}

impl<'a> GitCli<'a> {
    /// Creates a wrapper running every command inside `workdir`.
    pub fn new(gateway: &'a dyn CommandGateway, workdir: &'a Path) -> Self {
        Self { gateway, workdir }
    }

    /// Returns the working tree this wrapper operates on.
    pub fn workdir(&self) -> &Path {
        self.workdir
    }

    /// Runs `git <args>` and returns stdout, failing on a non-zero exit.
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let invocation = Invocation::git(args.iter().copied(), self.workdir);
        let output = self.gateway.run(&invocation).await?;

        if output.success() {
            Ok(output.stdout)
        } else {
            let command = args.join(" ");
            debug!(command = %command, code = ?output.code, "git command failed");
            Err(GitError::Failed {
                command,
                detail: output.failure_detail(),
            })
        }
    }

    /// Returns the checked-out branch, or `None` when it cannot be resolved.
    pub async fn current_branch(&self) -> Option<String> {
        match self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await {
            Ok(stdout) => {
                let branch = stdout.trim();
                (!branch.is_empty()).then(|| branch.to_string())
            }
            Err(e) => {
                debug!(workdir = %self.workdir.display(), error = %e, "Could not resolve branch");
                None
            }
        }
    }

    /// Runs `git pull`.
    pub async fn pull(&self) -> Result<(), GitError> {
        self.run(&["pull"]).await.map(drop)
    }

    /// Returns `git status --porcelain` output.
    pub async fn status_porcelain(&self) -> Result<String, GitError> {
        self.run(&["status", "--porcelain"]).await
    }

    /// Whether the working tree has any staged, unstaged or untracked change.
    pub async fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(!self.status_porcelain().await?.trim().is_empty())
    }

    /// Runs `git add .`.
    pub async fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "."]).await.map(drop)
    }

    /// Runs `git commit -m <message>`.
    pub async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).await.map(drop)
    }

    /// Runs `git push`.
    pub async fn push(&self) -> Result<(), GitError> {
        self.run(&["push"]).await.map(drop)
    }

    /// Runs `git rm --cached <path>`.
    pub async fn rm_cached(&self, path: &Path) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run(&["rm", "--cached", &*path]).await.map(drop)
    }

    /// Returns the unstaged diff.
    pub async fn diff(&self) -> Result<String, GitError> {
        self.run(&["diff"]).await
    }

    /// Returns the staged diff.
    pub async fn diff_staged(&self) -> Result<String, GitError> {
        self.run(&["diff", "--staged"]).await
    }

    /// Returns the paths with unstaged changes.
    pub async fn changed_files(&self) -> Result<Vec<String>, GitError> {
        self.run(&["diff", "--name-only"]).await.map(|out| split_lines(&out))
    }

    /// Returns the paths with staged changes.
    pub async fn staged_files(&self) -> Result<Vec<String>, GitError> {
        self.run(&["diff", "--staged", "--name-only"])
            .await
            .map(|out| split_lines(&out))
    }
}

fn split_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
