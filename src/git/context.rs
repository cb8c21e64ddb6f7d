//! Working-tree change context used to prompt for a commit message.
//!
//! Collects the diff, status and file lists once, then derives a suggested
//! conventional-commit type and scope from them with simple heuristics.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::porcelain::{GitCli, GitError};

/// Maximum number of diff bytes included in the prompt, per diff.
pub const DIFF_PROMPT_LIMIT: usize = 2000;

/// Extensions whose parent directory is treated as a package for scope detection.
const SOURCE_EXTENSIONS: &[&str] = &[
    "go", "rs", "py", "js", "jsx", "ts", "tsx", "java", "kt", "swift", "rb", "c", "cpp", "cs",
    "php",
];

/// Top-level directories that hold packages one level down.
const NESTED_PACKAGE_ROOTS: &[&str] = &["cmd", "pkg", "internal"];

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static BRANCH_SCOPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(feature|fix|hotfix|chore)/([a-zA-Z0-9_-]+)").unwrap());

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static ADDED_LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\+").unwrap());

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static REMOVED_LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^-").unwrap());

/// Conventional commit type suggested for a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    /// A new feature.
    Feat,
    /// A bug fix.
    Fix,
    /// Maintenance work.
    Chore,
    /// Test-only changes.
    Test,
    /// Documentation changes.
    Docs,
    /// Configuration changes.
    Config,
    /// Code restructuring.
    Refactor,
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Chore => "chore",
            Self::Test => "test",
            Self::Docs => "docs",
            Self::Config => "config",
            Self::Refactor => "refactor",
        };
        f.write_str(name)
    }
}

/// Snapshot of the working tree's pending changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeContext {
    /// Current branch name (empty when unresolved).
    pub branch: String,
    /// `git status --porcelain` output.
    pub status: String,
    /// Unstaged diff.
    pub diff: String,
    /// Staged diff.
    pub staged_diff: String,
    /// Paths with unstaged changes.
    pub changed_files: Vec<String>,
    /// Paths with staged changes.
    pub staged_files: Vec<String>,
}

impl ChangeContext {
    /// Collects the context from the working tree `git` is bound to.
    pub async fn collect(git: &GitCli<'_>) -> Result<Self, GitError> {
        Ok(Self {
            branch: git.current_branch().await.unwrap_or_default(),
            status: git.status_porcelain().await?,
            diff: git.diff().await?,
            staged_diff: git.diff_staged().await?,
            changed_files: git.changed_files().await?,
            staged_files: git.staged_files().await?,
        })
    }

    /// Whether there is anything worth describing in a commit message.
    pub fn has_changes(&self) -> bool {
        !self.status.trim().is_empty()
            && !(self.diff.trim().is_empty() && self.staged_diff.trim().is_empty())
    }

    fn all_files(&self) -> impl Iterator<Item = &str> {
        self.changed_files
            .iter()
            .chain(&self.staged_files)
            .map(String::as_str)
    }

    /// Suggests a commit type from the branch name, file kinds and diff.
    pub fn suggested_type(&self) -> CommitType {
        let branch = self.branch.as_str();
        if branch.starts_with("feature/") {
            return CommitType::Feat;
        }
        if branch.starts_with("fix/") || branch.starts_with("hotfix/") {
            return CommitType::Fix;
        }
        if branch.starts_with("chore/") {
            return CommitType::Chore;
        }

        let total = self.all_files().count();
        let half = total / 2;
        let tests = self.all_files().filter(|f| is_test_file(f)).count();
        let docs = self.all_files().filter(|f| is_doc_file(f)).count();
        let configs = self.all_files().filter(|f| is_config_file(f)).count();

        if tests > 0 && tests >= half {
            return CommitType::Test;
        }
        if docs > 0 && docs >= half {
            return CommitType::Docs;
        }
        if configs > 0 && configs >= half {
            return CommitType::Config;
        }

        let diff = format!("{}{}", self.diff, self.staged_diff);
        let lowered = diff.to_lowercase();
        if ["fix", "bug", "issue"].iter().any(|word| lowered.contains(word)) {
            return CommitType::Fix;
        }
        if lowered.contains("refactor") {
            return CommitType::Refactor;
        }

        let added = ADDED_LINE_PATTERN.find_iter(&diff).count();
        let removed = REMOVED_LINE_PATTERN.find_iter(&diff).count();
        match added.cmp(&removed) {
            std::cmp::Ordering::Greater => CommitType::Feat,
            std::cmp::Ordering::Less => CommitType::Refactor,
            std::cmp::Ordering::Equal => CommitType::Chore,
        }
    }

    /// Suggests a commit scope, or an empty string when nothing stands out.
    pub fn suggested_scope(&self) -> String {
        let mut packages: Vec<&str> = self.all_files().filter_map(package_of).collect();
        packages.sort_unstable();
        packages.dedup();

        match packages.as_slice() {
            [single] => return (*single).to_string(),
            [] => {}
            _ => return "multi".to_string(),
        }

        for file in self.all_files() {
            if is_test_file(file) {
                return "tests".to_string();
            }
            if is_doc_file(file) {
                return "docs".to_string();
            }
            if is_config_file(file) {
                return "config".to_string();
            }
        }

        BRANCH_SCOPE_PATTERN
            .captures(&self.branch)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    /// Renders the human-readable change summary embedded in the prompt.
    pub fn summary(&self) -> String {
        let mut summary = format!("Branch: {}\n\n", self.branch);

        if !self.staged_files.is_empty() {
            summary.push_str("Staged Files:\n");
            for file in &self.staged_files {
                summary.push_str(&format!("  - {file}\n"));
            }
            summary.push('\n');
        }

        if !self.changed_files.is_empty() {
            summary.push_str("Unstaged Changed Files:\n");
            for file in &self.changed_files {
                summary.push_str(&format!("  - {file}\n"));
            }
            summary.push('\n');
        }

        push_diff_section(&mut summary, "Staged Git Diff", &self.staged_diff);
        push_diff_section(&mut summary, "Unstaged Git Diff", &self.diff);

        summary.push_str("Commit Suggestions:\n");
        summary.push_str(&format!("  - Type: {}\n", self.suggested_type()));
        summary.push_str(&format!("  - Scope: {}\n", self.suggested_scope()));
        summary
    }

    /// Builds the full LLM prompt, with optional operator guidance appended.
    pub fn prompt(&self, hint: Option<&str>) -> String {
        let mut prompt = format!(
            "You are an AI Git assistant. Your task is to write a conventional commit message in the format:\n\
             <type>(<scope>): <subject>\n\n\
             I've analyzed the changes and suggest:\n\
             - Type: {} (but choose the most appropriate from: feat, fix, docs, style, refactor, perf, test, build, ci, chore, revert)\n\
             - Scope: {} (update if you think another scope is more appropriate)\n\n\
             Be concise but descriptive. The subject should:\n\
             - Use imperative, present tense (e.g., \"change\" not \"changed\" or \"changes\")\n\
             - Not capitalize the first letter\n\
             - No period at the end\n\n\
             ONLY return the commit message, nothing else.\n\n\
             Repository changes summary:\n{}",
            self.suggested_type(),
            self.suggested_scope(),
            self.summary()
        );

        if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
            prompt.push_str(&format!("\nOperator note: {hint}\n"));
        }
        prompt
    }
}

fn push_diff_section(summary: &mut String, title: &str, diff: &str) {
    if diff.trim().is_empty() {
        return;
    }
    if diff.len() > DIFF_PROMPT_LIMIT {
        let cut = floor_char_boundary(diff, DIFF_PROMPT_LIMIT);
        summary.push_str(&format!("{title} (truncated):\n{}...\n\n", &diff[..cut]));
    } else {
        summary.push_str(&format!("{title}:\n{diff}\n\n"));
    }
}

/// Largest char boundary at or below `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut cut = index.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}

fn package_of(file: &str) -> Option<&str> {
    let extension = file.rsplit_once('.').map(|(_, ext)| ext)?;
    if !SOURCE_EXTENSIONS.contains(&extension) {
        return None;
    }

    let parts: Vec<&str> = file.split('/').collect();
    if parts.len() < 2 {
        return None;
    }
    if parts.len() > 2 && NESTED_PACKAGE_ROOTS.contains(&parts[0]) {
        Some(parts[1])
    } else {
        Some(parts[0])
    }
}

fn is_test_file(file: &str) -> bool {
    file.contains("test")
}

fn is_doc_file(file: &str) -> bool {
    file.contains("docs") || file.ends_with(".md")
}

fn is_config_file(file: &str) -> bool {
    file.contains("config") || file.ends_with(".yaml") || file.ends_with(".yml")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn context(branch: &str, files: &[&str], diff: &str) -> ChangeContext {
        ChangeContext {
            branch: branch.to_string(),
            status: " M something\n".to_string(),
            diff: diff.to_string(),
            staged_diff: String::new(),
            changed_files: files.iter().map(|f| (*f).to_string()).collect(),
            staged_files: Vec::new(),
        }
    }

    #[test]
    fn branch_prefix_decides_type() {
        assert_eq!(context("feature/login", &[], "").suggested_type(), CommitType::Feat);
        assert_eq!(context("hotfix/crash", &[], "").suggested_type(), CommitType::Fix);
        assert_eq!(context("chore/deps", &[], "").suggested_type(), CommitType::Chore);
    }

    #[test]
    fn file_kinds_decide_type() {
        let ctx = context("main", &["src/parser_test.go", "src/parser.go"], "+x\n");
        assert_eq!(ctx.suggested_type(), CommitType::Test);

        let ctx = context("main", &["README.md"], "+x\n");
        assert_eq!(ctx.suggested_type(), CommitType::Docs);
    }

    #[test]
    fn diff_keywords_and_line_balance_decide_type() {
        let ctx = context("main", &["src/a.rs", "src/b.rs", "src/c.rs"], "-old\n+Bug here\n");
        assert_eq!(ctx.suggested_type(), CommitType::Fix);

        let ctx = context("main", &["src/a.rs"], "+one\n+two\n-three\n");
        assert_eq!(ctx.suggested_type(), CommitType::Feat);

        let ctx = context("main", &["src/a.rs"], "-one\n-two\n+three\n");
        assert_eq!(ctx.suggested_type(), CommitType::Refactor);

        let ctx = context("main", &["src/a.rs"], "");
        assert_eq!(ctx.suggested_type(), CommitType::Chore);
    }

    #[test]
    fn scope_from_single_package() {
        let ctx = context("main", &["pkg/server/http.go", "pkg/server/tls.go"], "");
        assert_eq!(ctx.suggested_scope(), "server");
    }

    #[test]
    fn scope_multi_for_several_packages() {
        let ctx = context("main", &["api/handler.rs", "core/model.rs"], "");
        assert_eq!(ctx.suggested_scope(), "multi");
    }

    #[test]
    fn scope_falls_back_to_branch_name() {
        let ctx = context("feature/oauth-flow", &["Makefile"], "");
        assert_eq!(ctx.suggested_scope(), "oauth-flow");

        let ctx = context("main", &["Makefile"], "");
        assert_eq!(ctx.suggested_scope(), "");
    }

    #[test]
    fn has_changes_requires_status_and_diff() {
        let mut ctx = context("main", &[], "+x\n");
        assert!(ctx.has_changes());

        ctx.status = "\n".to_string();
        assert!(!ctx.has_changes());

        let untracked_only = ChangeContext {
            status: "?? new.txt\n".to_string(),
            ..ChangeContext::default()
        };
        assert!(!untracked_only.has_changes());
    }

    #[test]
    fn long_diffs_are_truncated_on_char_boundary() {
        let diff = "é".repeat(DIFF_PROMPT_LIMIT);
        let ctx = context("main", &["src/a.rs"], &diff);

        let summary = ctx.summary();

        assert!(summary.contains("Unstaged Git Diff (truncated):"));
        assert!(summary.len() < diff.len());
    }

    #[test]
    fn prompt_includes_suggestions_and_hint() {
        let ctx = context("fix/null-deref", &["src/a.rs"], "+guard\n");

        let prompt = ctx.prompt(Some("mention the crash report"));

        assert!(prompt.contains("- Type: fix"));
        assert!(prompt.contains("Branch: fix/null-deref"));
        assert!(prompt.ends_with("Operator note: mention the crash report\n"));
        assert!(!ctx.prompt(Some("  ")).contains("Operator note"));
    }
}
