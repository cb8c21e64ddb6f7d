//! Run configuration for the batch processor.

use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;

use globset::{Glob, GlobMatcher};

/// Commit message value that requests a synthesized message.
pub const AUTO_COMMIT_SENTINEL: &str = "auto-commit";

/// Junk file name targeted when no pattern is configured.
pub const DEFAULT_JUNK_PATTERN: &str = ".DS_Store";

/// External program the pipeline delegates commits to.
pub const DEFAULT_AI_COMMIT_PROGRAM: &str = "ai_commit";

/// How the pipeline obtains a commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommitMessagePolicy {
    /// Use this message verbatim.
    Literal(String),
    /// Synthesize a message for each repository.
    #[default]
    AutoGenerate,
}

impl CommitMessagePolicy {
    /// Interprets a `--commit-message` value, honouring the sentinel.
    pub fn from_flag(value: &str) -> Self {
        if value == AUTO_COMMIT_SENTINEL {
            Self::AutoGenerate
        } else {
            Self::Literal(value.to_string())
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Glob(GlobMatcher),
}

/// File name pattern identifying junk files.
///
/// Patterns without glob metacharacters match a file name exactly.
#[derive(Debug, Clone)]
pub struct JunkPattern {
    raw: String,
    matcher: Matcher,
}

impl JunkPattern {
    /// Compiles `raw` as a file-name glob.
    pub fn new(raw: &str) -> Result<Self, globset::Error> {
        let matcher = if raw.contains(['*', '?', '[', '{']) {
            Matcher::Glob(Glob::new(raw)?.compile_matcher())
        } else {
            Matcher::Exact(raw.to_string())
        };
        Ok(Self {
            raw: raw.to_string(),
            matcher,
        })
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `file_name` is a junk file.
    pub fn matches(&self, file_name: &OsStr) -> bool {
        match &self.matcher {
            Matcher::Exact(name) => file_name == OsStr::new(name),
            Matcher::Glob(glob) => glob.is_match(file_name),
        }
    }
}

impl Default for JunkPattern {
    fn default() -> Self {
        Self {
            raw: DEFAULT_JUNK_PATTERN.to_string(),
            matcher: Matcher::Exact(DEFAULT_JUNK_PATTERN.to_string()),
        }
    }
}

impl fmt::Display for JunkPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Everything that shapes one batch run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Directory whose immediate subdirectories are candidate repositories.
    pub base_dir: PathBuf,
    /// Run `git pull` first.
    pub pull: bool,
    /// Ensure `.gitignore` lists the junk pattern.
    pub fix_gitignore: bool,
    /// Untrack and delete junk files.
    pub remove_junk_files: bool,
    /// Commit message source.
    pub commit_message: CommitMessagePolicy,
    /// When non-empty, only these directory names are processed.
    pub include: Vec<String>,
    /// Directory names that are never processed.
    pub exclude: Vec<String>,
    /// Hand committing and pushing to the external AI commit program.
    pub use_ai_commit: bool,
    /// Junk file pattern.
    pub junk_pattern: JunkPattern,
    /// Name of the external AI commit program.
    pub ai_commit_program: String,
}

impl RunConfiguration {
    /// Creates a configuration with every optional step disabled.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pull: false,
            fix_gitignore: false,
            remove_junk_files: false,
            commit_message: CommitMessagePolicy::default(),
            include: Vec::new(),
            exclude: Vec::new(),
            use_ai_commit: true,
            junk_pattern: JunkPattern::default(),
            ai_commit_program: DEFAULT_AI_COMMIT_PROGRAM.to_string(),
        }
    }

    /// Whether a directory named `name` passes the include and exclude lists.
    pub fn admits(&self, name: &str) -> bool {
        if self.exclude.iter().any(|excluded| excluded == name) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|included| included == name)
    }
}
