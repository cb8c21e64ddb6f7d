//! Repository facts decoded from `onefetch <path> -o json`.
//!
//! onefetch reports a list of single-key objects, one per info block. Blocks
//! are recognised by which key is present; null or unknown blocks are skipped.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use super::gateway::{CommandGateway, Invocation};

/// Decodes an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Title {
    #[serde(default, deserialize_with = "null_as_default")]
    git_username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    repo_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadRefs {
    #[serde(default, deserialize_with = "null_as_default")]
    short_commit_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    head_refs: HeadRefs,
}

#[derive(Debug, Default, Deserialize)]
struct PendingInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    added: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    deleted: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    modified: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Author {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AuthorsInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    authors: Vec<Author>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UrlInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    repo_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitsInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    number_of_commits: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    lines_of_code: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizeInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    repo_size: String,
}

#[derive(Debug, Default, Deserialize)]
struct LicenseInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    license: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastChangeInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    last_change: String,
}

/// One entry of `infoFields`; at most one member is present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InfoBlock {
    project_info: Option<ProjectInfo>,
    head_info: Option<HeadInfo>,
    pending_info: Option<PendingInfo>,
    authors_info: Option<AuthorsInfo>,
    url_info: Option<UrlInfo>,
    commits_info: Option<CommitsInfo>,
    loc_info: Option<LocInfo>,
    size_info: Option<SizeInfo>,
    license_info: Option<LicenseInfo>,
    last_change_info: Option<LastChangeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Root {
    #[serde(default, deserialize_with = "null_as_default")]
    title: Title,
    #[serde(default, deserialize_with = "null_as_default")]
    info_fields: Vec<InfoBlock>,
}

/// Repository size as printed by onefetch.
///
/// The magnitude is truncated to an integer; the unit is carried verbatim and
/// never converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSize {
    /// Integer part of the reported number.
    pub magnitude: u64,
    /// Unit token following the number, e.g. "MiB".
    pub unit: Option<String>,
}

impl RepoSize {
    /// Parses strings like `"12.71 MiB (1234 files)"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut tokens = raw.split_whitespace();
        let value: f64 = tokens.next()?.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self {
            magnitude: value.trunc() as u64,
            unit: tokens
                .next()
                .filter(|unit| !unit.starts_with('('))
                .map(str::to_string),
        })
    }
}

impl fmt::Display for RepoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} {unit}", self.magnitude),
            None => write!(f, "{}", self.magnitude),
        }
    }
}

/// Flattened repository facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    /// Git user name from the title line.
    pub git_username: String,
    /// Project name.
    pub name: String,
    /// Short id of the HEAD commit.
    pub head: String,
    /// Pending changes summary.
    pub pending: Option<String>,
    /// Author names, most active first.
    pub authors: Vec<String>,
    /// Remote URL.
    pub url: String,
    /// Number of commits.
    pub commits: u64,
    /// Lines of code.
    pub lines_of_code: u64,
    /// Repository size.
    pub size: Option<RepoSize>,
    /// License name.
    pub license: String,
    /// Relative time of the last change.
    pub last_change: String,
}

/// Decodes onefetch's JSON output.
pub fn parse_repo_info(json: &str) -> Result<RepoInfo> {
    let root: Root = serde_json::from_str(json).context("Failed to parse onefetch JSON")?;

    let mut info = RepoInfo {
        git_username: root.title.git_username,
        ..RepoInfo::default()
    };

    for block in root.info_fields {
        if let Some(project) = block.project_info {
            info.name = project.repo_name;
        }
        if let Some(head) = block.head_info {
            info.head = head.head_refs.short_commit_id;
        }
        if let Some(pending) = block.pending_info {
            info.pending = Some(format!(
                "added {}, modified {}, deleted {}",
                pending.added, pending.modified, pending.deleted
            ));
        }
        if let Some(authors) = block.authors_info {
            info.authors
                .extend(authors.authors.into_iter().map(|author| author.name));
        }
        if let Some(url) = block.url_info {
            info.url = url.repo_url;
        }
        if let Some(commits) = block.commits_info {
            info.commits = commits.number_of_commits;
        }
        if let Some(loc) = block.loc_info {
            info.lines_of_code = loc.lines_of_code;
        }
        if let Some(size) = block.size_info {
            info.size = RepoSize::parse(&size.repo_size);
        }
        if let Some(license) = block.license_info {
            info.license = license.license;
        }
        if let Some(last_change) = block.last_change_info {
            info.last_change = last_change.last_change;
        }
    }

    Ok(info)
}

/// Runs onefetch against `repo` and decodes the result.
pub async fn fetch_repo_info(gateway: &dyn CommandGateway, repo: &Path) -> Result<RepoInfo> {
    let target = repo.to_string_lossy();
    let invocation = Invocation::new("onefetch", [&*target, "-o", "json"], repo);

    let output = gateway
        .run(&invocation)
        .await
        .context("Failed to execute onefetch")?;

    if !output.success() {
        anyhow::bail!("onefetch failed: {}", output.failure_detail());
    }

    parse_repo_info(&output.stdout)
}
