//! # zvezda
//!
//! Batch maintenance for a directory of git repositories.
//!
//! The [`batch`] module discovers the repositories under a base directory and
//! runs each through the same pipeline: optional pull, `.gitignore` upkeep,
//! junk file removal, then commit and push. Progress is published as
//! [`batch::RunState`] snapshots that the [`ui`] module renders.
//!
//! The [`ai`] and [`git`] modules back the `ai_commit` tool, which writes
//! commit messages with a local Ollama model.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ai;
pub mod batch;
pub mod cli;
pub mod git;
pub mod ui;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of zvezda.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
