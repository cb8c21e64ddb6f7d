//! Repository descriptors and per-repository outcomes.

use std::path::PathBuf;

/// Branch name recorded when it cannot be resolved.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Summary reported for a repository with a clean working tree.
pub const NO_CHANGES_SUMMARY: &str = "No changes to commit";

/// Processing status of a discovered repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepositoryStatus {
    /// Not yet dispatched.
    #[default]
    Pending,
    /// The pipeline is running on it.
    Processing,
    /// The pipeline finished successfully.
    Succeeded,
    /// The pipeline reported a failure.
    Failed,
}

/// A git working tree found by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    /// Directory name, unique within a run.
    pub name: String,
    /// Absolute path of the working tree.
    pub path: PathBuf,
    /// Branch checked out at discovery time.
    pub branch: String,
    /// Current processing status.
    pub status: RepositoryStatus,
}

impl RepositoryDescriptor {
    /// Creates a pending descriptor.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            branch: branch.into(),
            status: RepositoryStatus::Pending,
        }
    }
}

/// Terminal result of running the pipeline on one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    /// Whether the pipeline completed.
    pub success: bool,
    /// Human-readable summary.
    pub summary: String,
    /// Labels of the operations performed, in order.
    pub operations: Vec<String>,
}

impl OperationOutcome {
    /// A successful outcome whose summary lists `operations`.
    pub fn succeeded(operations: Vec<String>) -> Self {
        Self {
            success: true,
            summary: operations.join(", "),
            operations,
        }
    }

    /// The outcome for a clean working tree.
    pub fn nothing_to_commit(operations: Vec<String>) -> Self {
        Self {
            success: true,
            summary: NO_CHANGES_SUMMARY.to_string(),
            operations,
        }
    }

    /// A failed outcome.
    pub fn failed(summary: impl Into<String>, operations: Vec<String>) -> Self {
        Self {
            success: false,
            summary: summary.into(),
            operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_summary_joins_operations() {
        let outcome = OperationOutcome::succeeded(vec![
            "pulled changes".to_string(),
            "committed and pushed changes".to_string(),
        ]);

        assert!(outcome.success);
        assert_eq!(outcome.summary, "pulled changes, committed and pushed changes");
    }

    #[test]
    fn nothing_to_commit_keeps_exact_summary() {
        let outcome = OperationOutcome::nothing_to_commit(vec!["pulled changes".to_string()]);

        assert!(outcome.success);
        assert_eq!(outcome.summary, "No changes to commit");
        assert_eq!(outcome.operations.len(), 1);
    }

    #[test]
    fn new_descriptor_is_pending() {
        let repo = RepositoryDescriptor::new("a", "/repos/a", "main");
        assert_eq!(repo.status, RepositoryStatus::Pending);
    }
}
