//! Git and repository-tool integrations.

pub mod context;
pub mod gateway;
pub mod github;
pub mod onefetch;
pub mod porcelain;

#[cfg(test)]
pub(crate) mod test_utils;

pub use context::{ChangeContext, CommitType};
pub use gateway::{CommandGateway, CommandOutput, GatewayError, Invocation, SystemGateway};
pub use github::{fetch_github_repos, GithubRepo};
pub use onefetch::{fetch_repo_info, RepoInfo, RepoSize};
pub use porcelain::{GitCli, GitError};
