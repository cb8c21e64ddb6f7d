//! GitHub repository listing through the `gh` CLI.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::gateway::{CommandGateway, Invocation};

/// Maximum number of repositories requested from `gh repo list`.
pub const REPO_LIST_LIMIT: usize = 100;

/// Primary language reported by GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language name, e.g. "Rust".
    pub name: String,
}

/// One repository summary from `gh repo list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubRepo {
    /// Repository name without owner.
    pub name: String,
    /// Free-form description, absent when GitHub reports null.
    #[serde(default)]
    pub description: Option<String>,
    /// Primary language, absent for empty repositories.
    #[serde(default)]
    pub primary_language: Option<Language>,
}

impl GithubRepo {
    /// Returns the language name or `"unknown"`.
    pub fn language_name(&self) -> &str {
        self.primary_language
            .as_ref()
            .map_or("unknown", |lang| lang.name.as_str())
    }
}

/// Decodes the JSON array printed by `gh repo list --json ...`.
pub fn parse_repo_list(json: &str) -> Result<Vec<GithubRepo>> {
    serde_json::from_str(json).context("Failed to parse repository JSON from gh")
}

/// Lists the authenticated user's repositories.
pub async fn fetch_github_repos(gateway: &dyn CommandGateway, cwd: &Path) -> Result<Vec<GithubRepo>> {
    let limit = REPO_LIST_LIMIT.to_string();
    let invocation = Invocation::new(
        "gh",
        [
            "repo",
            "list",
            "--limit",
            limit.as_str(),
            "--json",
            "name,description,primaryLanguage",
        ],
        cwd,
    );

    let output = gateway
        .run(&invocation)
        .await
        .context("Failed to execute gh command")?;

    if !output.success() {
        anyhow::bail!("gh command failed: {}", output.failure_detail());
    }

    parse_repo_list(&output.stdout)
}
