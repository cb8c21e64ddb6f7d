//! `info` command: summarize a repository with onefetch.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::git::{fetch_repo_info, RepoInfo, SystemGateway};

/// Repository info options.
#[derive(Parser, Debug)]
pub struct InfoCommand {
    /// Repository to inspect.
    #[arg(default_value = ".", value_name = "PATH")]
    pub path: PathBuf,
}

impl InfoCommand {
    /// Executes the info command.
    pub async fn execute(self) -> Result<()> {
        let info = fetch_repo_info(&SystemGateway::new(), &self.path).await?;
        write_repo_info(&info, &mut io::stdout().lock())?;
        Ok(())
    }
}

/// Prints the decoded facts as aligned `label: value` lines, skipping blanks.
pub fn write_repo_info<W: Write>(info: &RepoInfo, out: &mut W) -> io::Result<()> {
    let authors = info.authors.join(", ");
    let commits = info.commits.to_string();
    let lines_of_code = info.lines_of_code.to_string();
    let size = info.size.as_ref().map(ToString::to_string).unwrap_or_default();

    let fields = [
        ("User", info.git_username.as_str()),
        ("Project", info.name.as_str()),
        ("HEAD", info.head.as_str()),
        ("Pending", info.pending.as_deref().unwrap_or_default()),
        ("Authors", authors.as_str()),
        ("URL", info.url.as_str()),
        ("Commits", commits.as_str()),
        ("Lines of code", lines_of_code.as_str()),
        ("Size", size.as_str()),
        ("License", info.license.as_str()),
        ("Last change", info.last_change.as_str()),
    ];

    for (label, value) in fields.iter().filter(|(_, value)| !value.is_empty()) {
        writeln!(out, "{:<14}{value}", format!("{label}:"))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::git::RepoSize;

    #[test]
    fn blank_fields_are_skipped() {
        let info = RepoInfo {
            git_username: "mira".to_string(),
            name: "zvezda".to_string(),
            head: "3f2a1bc".to_string(),
            authors: vec!["mira".to_string(), "ivo".to_string()],
            commits: 42,
            size: Some(RepoSize {
                magnitude: 12,
                unit: Some("MiB".to_string()),
            }),
            ..RepoInfo::default()
        };
        let mut out = Vec::new();

        write_repo_info(&info, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert!(printed.starts_with("User:         mira\n"));
        assert!(printed.contains("Authors:      mira, ivo\n"));
        assert!(printed.contains("Commits:      42\n"));
        assert!(printed.contains("Size:         12 MiB\n"));
        assert!(!printed.contains("License"));
        assert!(!printed.contains("Pending"));
    }
}
