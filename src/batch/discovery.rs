//! Finds the git working trees directly under the base directory.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use super::config::RunConfiguration;
use super::repository::{RepositoryDescriptor, UNKNOWN_BRANCH};
use crate::git::{CommandGateway, GitCli};

/// Failure to enumerate the base directory. Fatal for the run.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to read directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lists the repositories the run will process, sorted by name.
///
/// A subdirectory qualifies when it passes the include and exclude lists and
/// contains a `.git` entry. Branch resolution failures fall back to
/// [`UNKNOWN_BRANCH`].
pub async fn discover(
    config: &RunConfiguration,
    gateway: &dyn CommandGateway,
) -> Result<Vec<RepositoryDescriptor>, DiscoveryError> {
    let base = &config.base_dir;
    let unreadable = |source| DiscoveryError::Unreadable {
        path: base.clone(),
        source,
    };

    let mut entries = tokio::fs::read_dir(base).await.map_err(unreadable)?;
    let mut repositories = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let is_dir = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        let Ok(name) = entry.file_name().into_string() else {
            debug!(path = %entry.path().display(), "Skipping non UTF-8 directory name");
            continue;
        };
        if !config.admits(&name) {
            debug!(repository = %name, "Filtered out by include/exclude lists");
            continue;
        }

        let path = entry.path();
        if !tokio::fs::try_exists(path.join(".git")).await.unwrap_or(false) {
            continue;
        }

        let branch = GitCli::new(gateway, &path)
            .current_branch()
            .await
            .unwrap_or_else(|| UNKNOWN_BRANCH.to_string());

        repositories.push(RepositoryDescriptor::new(name, path, branch));
    }

    repositories.sort_by(|a, b| a.name.cmp(&b.name));
    info!(base = %base.display(), count = repositories.len(), "Discovery finished");
    Ok(repositories)
}
