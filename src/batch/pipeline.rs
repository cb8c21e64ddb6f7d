//! Per-repository pipeline.
//!
//! Steps run in a fixed order and the first failing step ends the pipeline:
//!
//! 1. check the working tree directory exists
//! 2. `git pull` (optional)
//! 3. add the junk pattern to `.gitignore` (optional)
//! 4. untrack and delete junk files (optional)
//! 5. `git status --porcelain`, stopping early on a clean tree
//! 6. `git add .`
//! 7. commit and push, directly or through the AI commit program
//!
//! Every subprocess runs with the repository as its working directory; the
//! process-wide current directory is never touched.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::config::{CommitMessagePolicy, JunkPattern, RunConfiguration};
use super::log::{icons, LogEntry};
use super::message::{synthesize_commit_message, IndexSource, RandomIndex};
use super::repository::{OperationOutcome, RepositoryDescriptor};
use crate::git::{CommandGateway, GitCli, Invocation};

/// Name of the ignore file maintained by the pipeline.
pub const GITIGNORE_FILE: &str = ".gitignore";

/// Label recorded once a commit has been published.
pub const COMMITTED_LABEL: &str = "committed and pushed changes";

/// Outcome of one pipeline run plus the log lines it produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outcome: OperationOutcome,
    pub logs: Vec<LogEntry>,
}

/// Runs the pipeline against one repository at a time.
pub struct PipelineExecutor {
    gateway: Arc<dyn CommandGateway>,
    config: Arc<RunConfiguration>,
    index_source: Mutex<Box<dyn IndexSource + Send>>,
}

impl PipelineExecutor {
    /// Creates an executor that synthesizes messages from OS-seeded randomness.
    pub fn new(gateway: Arc<dyn CommandGateway>, config: Arc<RunConfiguration>) -> Self {
        Self::with_index_source(gateway, config, Box::new(RandomIndex::from_os_rng()))
    }

    /// Creates an executor drawing message words from `index_source`.
    pub fn with_index_source(
        gateway: Arc<dyn CommandGateway>,
        config: Arc<RunConfiguration>,
        index_source: Box<dyn IndexSource + Send>,
    ) -> Self {
        Self {
            gateway,
            config,
            index_source: Mutex::new(index_source),
        }
    }

    /// Runs every enabled step against `repo`.
    ///
    /// Never fails: errors become an unsuccessful outcome with a matching
    /// error entry in the log trail.
    pub async fn process(&self, repo: &RepositoryDescriptor) -> PipelineReport {
        info!(repository = %repo.name, path = %repo.path.display(), "Processing repository");

        let mut trail = Trail::new(&repo.name);
        trail.note(
            LogEntry::info(&repo.name, format!("Processing on branch {}", repo.branch))
                .with_tag(icons::SCANNING),
        );

        match self.run_steps(repo, &mut trail).await {
            Ok(completion) => trail.finish(completion),
            Err(summary) => {
                warn!(repository = %repo.name, summary = %summary, "Pipeline failed");
                trail.fail(summary)
            }
        }
    }

    async fn run_steps(
        &self,
        repo: &RepositoryDescriptor,
        trail: &mut Trail<'_>,
    ) -> Result<Completion, String> {
        let config = &*self.config;
        let git = GitCli::new(&*self.gateway, &repo.path);

        check_workdir(&repo.path)
            .await
            .map_err(|e| format!("Failed to change directory: {e}"))?;

        if config.pull {
            git.pull()
                .await
                .map_err(|e| format!("Failed to pull: {e}"))?;
            trail.performed("pulled changes", icons::PULL);
        }

        if config.fix_gitignore {
            let changed = ensure_ignore_entry(&repo.path, config.junk_pattern.as_str())
                .await
                .map_err(|e| format!("Failed to update {GITIGNORE_FILE}: {e}"))?;
            if changed {
                trail.performed("updated .gitignore", icons::CONFIG);
            } else {
                trail.note(LogEntry::info(
                    &repo.name,
                    format!("{GITIGNORE_FILE} already lists {}", config.junk_pattern),
                ));
            }
        }

        if config.remove_junk_files {
            let removed = self
                .remove_junk_files(&git, &config.junk_pattern)
                .await
                .map_err(|e| format!("Failed to remove {} files: {e}", config.junk_pattern))?;
            if removed > 0 {
                trail.performed(
                    format!("removed {removed} {} files", config.junk_pattern),
                    icons::REMOVE,
                );
            }
        }

        let has_changes = git
            .has_uncommitted_changes()
            .await
            .map_err(|e| format!("Failed to check for changes: {e}"))?;
        if !has_changes {
            return Ok(Completion::Clean);
        }

        git.add_all()
            .await
            .map_err(|e| format!("Failed to stage changes: {e}"))?;

        let message = self.commit_message();
        trail.note(
            LogEntry::info(&repo.name, format!("Commit message: {message}")).with_tag(icons::COMMIT),
        );

        if config.use_ai_commit {
            self.delegate_commit(&repo.path, &message).await?;
        } else {
            git.commit(&message)
                .await
                .map_err(|e| format!("Failed to commit: {e}"))?;
            git.push()
                .await
                .map_err(|e| format!("Failed to push: {e}"))?;
        }

        trail.performed(COMMITTED_LABEL, icons::PUSH);
        Ok(Completion::Published)
    }

    fn commit_message(&self) -> String {
        match &self.config.commit_message {
            CommitMessagePolicy::Literal(message) => message.clone(),
            CommitMessagePolicy::AutoGenerate => {
                let mut source = self
                    .index_source
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                synthesize_commit_message(&mut **source)
            }
        }
    }

    async fn delegate_commit(&self, workdir: &Path, message: &str) -> Result<(), String> {
        let program = &self.config.ai_commit_program;
        let invocation = Invocation::new(program, [message], workdir);

        match self.gateway.run(&invocation).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(format!("{program} failed: {}", output.failure_detail())),
            Err(e) => Err(format!("{program} failed: {e}")),
        }
    }

    /// Untracks and deletes every junk file, returning how many were deleted.
    ///
    /// Per-file failures are tolerated; only a failed walk is an error.
    async fn remove_junk_files(&self, git: &GitCli<'_>, pattern: &JunkPattern) -> io::Result<usize> {
        let root = git.workdir().to_path_buf();
        let walk_pattern = pattern.clone();
        let files = tokio::task::spawn_blocking(move || find_junk_files(&root, &walk_pattern))
            .await
            .map_err(io::Error::other)?
            .map_err(io::Error::from)?;

        let mut removed = 0;
        for file in files {
            let relative = file.strip_prefix(git.workdir()).unwrap_or(file.as_path());
            if let Err(e) = git.rm_cached(relative).await {
                debug!(file = %relative.display(), error = %e, "Junk file was not tracked");
            }
            match tokio::fs::remove_file(&file).await {
                Ok(()) => removed += 1,
                Err(e) => debug!(file = %file.display(), error = %e, "Could not delete junk file"),
            }
        }
        Ok(removed)
    }
}

enum Completion {
    Clean,
    Published,
}

/// Accumulates operation labels and log entries for one repository.
struct Trail<'r> {
    repository: &'r str,
    operations: Vec<String>,
    logs: Vec<LogEntry>,
}

impl<'r> Trail<'r> {
    fn new(repository: &'r str) -> Self {
        Self {
            repository,
            operations: Vec::new(),
            logs: Vec::new(),
        }
    }

    fn note(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    fn performed(&mut self, label: impl Into<String>, tag: &'static str) {
        let label = label.into();
        self.logs
            .push(LogEntry::success(self.repository, capitalize(&label)).with_tag(tag));
        self.operations.push(label);
    }

    fn finish(mut self, completion: Completion) -> PipelineReport {
        let outcome = match completion {
            Completion::Clean => OperationOutcome::nothing_to_commit(self.operations),
            Completion::Published => OperationOutcome::succeeded(self.operations),
        };
        self.logs.push(
            LogEntry::success(self.repository, outcome.summary.clone()).with_tag(icons::COMPLETE),
        );
        PipelineReport {
            outcome,
            logs: self.logs,
        }
    }

    fn fail(mut self, summary: String) -> PipelineReport {
        self.logs.push(LogEntry::error(self.repository, summary.clone()));
        PipelineReport {
            outcome: OperationOutcome::failed(summary, self.operations),
            logs: self.logs,
        }
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

async fn check_workdir(path: &Path) -> io::Result<()> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "{} is not a directory",
            path.display()
        )))
    }
}

/// Returns `content` with `pattern` appended, or `None` if a line already
/// holds the pattern.
///
/// Works on raw bytes so ignore files in any encoding are kept intact. The
/// result always ends with exactly one newline.
pub fn with_ignore_entry(content: &[u8], pattern: &str) -> Option<Vec<u8>> {
    let needle = pattern.as_bytes();
    if content
        .split(|&b| b == b'\n')
        .any(|line| line.trim_ascii() == needle)
    {
        return None;
    }

    let keep = content
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |last| last + 1);
    let mut updated = Vec::with_capacity(keep + needle.len() + 2);
    if keep > 0 {
        updated.extend_from_slice(&content[..keep]);
        updated.push(b'\n');
    }
    updated.extend_from_slice(needle);
    updated.push(b'\n');
    Some(updated)
}

/// Makes sure the repository's `.gitignore` lists `pattern`.
///
/// A missing file is treated as empty. Returns whether the file was written.
pub async fn ensure_ignore_entry(repo_root: &Path, pattern: &str) -> io::Result<bool> {
    let path = repo_root.join(GITIGNORE_FILE);
    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };

    match with_ignore_entry(&content, pattern) {
        Some(updated) => {
            tokio::fs::write(&path, updated).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Walks `root` and collects files whose name matches `pattern`.
///
/// The `.git` directory is not descended into.
pub fn find_junk_files(root: &Path, pattern: &JunkPattern) -> Result<Vec<PathBuf>, walkdir::Error> {
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == ".git"));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && pattern.matches(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
