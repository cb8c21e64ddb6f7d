//! Batch processing of a directory of git repositories.
//!
//! Discovery finds the repositories, the [`Orchestrator`] walks them one at a
//! time through the [`PipelineExecutor`], and [`BatchRunner`] wires both to
//! tokio tasks while publishing [`RunState`] snapshots for display.

pub mod config;
pub mod discovery;
pub mod log;
pub mod message;
pub mod orchestrator;
pub mod pipeline;
pub mod repository;
pub mod runner;

pub use config::{CommitMessagePolicy, JunkPattern, RunConfiguration};
pub use discovery::{discover, DiscoveryError};
pub use log::{LogEntry, LogLevel, LogRing};
pub use message::{synthesize_commit_message, IndexSource, RandomIndex};
pub use orchestrator::{
    Effect, Orchestrator, Phase, RepositoryResult, RunEvent, RunState, RunSummary,
};
pub use pipeline::{PipelineExecutor, PipelineReport};
pub use repository::{OperationOutcome, RepositoryDescriptor, RepositoryStatus};
pub use runner::BatchRunner;
