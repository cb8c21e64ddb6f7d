//! `batch` command: process every repository under a directory.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::batch::config::{
    CommitMessagePolicy, JunkPattern, RunConfiguration, AUTO_COMMIT_SENTINEL,
    DEFAULT_AI_COMMIT_PROGRAM, DEFAULT_JUNK_PATTERN,
};
use crate::batch::{BatchRunner, RunState};
use crate::git::{CommandGateway, SystemGateway};
use crate::ui::plain::{self, PlainReporter};
use crate::ui::{run_dashboard, DashboardExit, Renderer, Theme};
use crate::utils::get_env_var;

/// Directory under `$HOME` used when neither `--dir` nor `ZVEZDA_DIR` is set.
pub const DEFAULT_DIR_NAME: &str = "Neoware";

/// Batch command options.
#[derive(Parser, Debug)]
pub struct BatchCommand {
    /// Base directory containing git repositories.
    #[arg(long, value_name = "PATH")]
    pub dir: Option<String>,

    /// Pull changes from the remote repository first.
    #[arg(long)]
    pub pull: bool,

    /// Ensure .gitignore lists the junk file pattern.
    #[arg(long = "handle-gitignore")]
    pub handle_gitignore: bool,

    /// Untrack and delete junk files.
    #[arg(long = "remove-ds-store")]
    pub remove_ds_store: bool,

    /// Commit message to use ("auto-commit" synthesizes one per repository).
    #[arg(long, default_value = AUTO_COMMIT_SENTINEL)]
    pub commit_message: String,

    /// Comma-separated directory names to skip.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub exclude: Vec<String>,

    /// Comma-separated directory names to process exclusively.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub only: Vec<String>,

    /// Hand committing and pushing to the AI commit program.
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub use_ai_commit: bool,

    /// File name (or glob) of junk files.
    #[arg(long, default_value = DEFAULT_JUNK_PATTERN, value_name = "GLOB")]
    pub junk_pattern: String,

    /// Program invoked when AI commit is enabled.
    #[arg(long, default_value = DEFAULT_AI_COMMIT_PROGRAM, value_name = "PROG")]
    pub ai_commit_program: String,

    /// Kill any subprocess running longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// Pause before the final summary, in milliseconds.
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    pub finish_delay_ms: u64,

    /// Print plain progress lines instead of the full-screen dashboard.
    #[arg(long)]
    pub no_tui: bool,
}

impl BatchCommand {
    /// Executes the batch command.
    pub async fn execute(self) -> Result<()> {
        let config = self.to_config()?;
        info!(base = %config.base_dir.display(), "Starting batch");

        let timeout = self.command_timeout.map(Duration::from_secs);
        let gateway: Arc<dyn CommandGateway> = Arc::new(SystemGateway::with_timeout(timeout));
        let runner = BatchRunner::new(config, gateway)
            .with_finish_delay(Duration::from_millis(self.finish_delay_ms));
        let config = runner.config().clone();
        let (snapshots, receiver) = watch::channel(RunState::new(config.base_dir.clone()));

        if self.no_tui || !io::stdout().is_terminal() {
            let renderer = Renderer::new(Theme::monochrome(), config);
            let follower = tokio::spawn(plain::follow(PlainReporter::new(io::stdout()), receiver));
            let result = runner.run(snapshots).await;
            follower
                .await
                .context("Progress reporter stopped unexpectedly")?
                .context("Failed to write progress")?;
            let state = result.context("Batch run failed")?;
            println!("{}", renderer.report(&state));
            return Ok(());
        }

        let renderer = Renderer::new(theme_from_env(), config);
        match run_dashboard(&renderer, receiver, runner.run(snapshots)).await? {
            DashboardExit::Finished(result) => {
                let state = result.context("Batch run failed")?;
                println!("{}", renderer.report(&state));
            }
            DashboardExit::Quit => {
                warn!("Dashboard closed before the run finished");
                eprintln!("Interrupted before all repositories were processed.");
            }
        }
        Ok(())
    }

    /// Builds the run configuration from the parsed flags.
    pub fn to_config(&self) -> Result<RunConfiguration> {
        let base_dir = resolve_base_dir(self.dir.as_deref())?;
        let junk_pattern = JunkPattern::new(&self.junk_pattern)
            .with_context(|| format!("Invalid junk pattern '{}'", self.junk_pattern))?;

        Ok(RunConfiguration {
            base_dir,
            pull: self.pull,
            fix_gitignore: self.handle_gitignore,
            remove_junk_files: self.remove_ds_store,
            commit_message: CommitMessagePolicy::from_flag(&self.commit_message),
            include: clean_names(&self.only),
            exclude: clean_names(&self.exclude),
            use_ai_commit: self.use_ai_commit,
            junk_pattern,
            ai_commit_program: self.ai_commit_program.clone(),
        })
    }
}

fn clean_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn theme_from_env() -> Theme {
    if std::env::var_os("NO_COLOR").is_some() {
        Theme::monochrome()
    } else {
        Theme::default()
    }
}

/// Picks the base directory: `--dir`, then `ZVEZDA_DIR`, then `~/Neoware`.
pub fn resolve_base_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir.map(str::to_string).or_else(|| get_env_var("ZVEZDA_DIR").ok()) {
        Some(raw) => expand_home(&raw),
        None => Ok(dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(DEFAULT_DIR_NAME)),
    }
}

/// Expands a leading `~` or `~/`.
pub fn expand_home(raw: &str) -> Result<PathBuf> {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => return Ok(PathBuf::from(raw)),
    };
    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(rest))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        batch: BatchCommand,
    }

    fn parse(args: &[&str]) -> BatchCommand {
        Harness::try_parse_from(std::iter::once("batch").chain(args.iter().copied()))
            .unwrap()
            .batch
    }

    #[test]
    fn defaults_match_documented_flags() {
        let command = parse(&["--dir", "/srv/repos"]);
        let config = command.to_config().unwrap();

        assert_eq!(config.base_dir, PathBuf::from("/srv/repos"));
        assert!(!config.pull && !config.fix_gitignore && !config.remove_junk_files);
        assert!(config.use_ai_commit);
        assert_eq!(config.commit_message, CommitMessagePolicy::AutoGenerate);
        assert_eq!(config.junk_pattern.as_str(), ".DS_Store");
        assert_eq!(config.ai_commit_program, "ai_commit");
        assert_eq!(command.finish_delay_ms, 1000);
        assert!(command.command_timeout.is_none());
    }

    #[test]
    fn lists_and_booleans_parse() {
        let command = parse(&[
            "--dir",
            "/srv",
            "--pull",
            "--handle-gitignore",
            "--remove-ds-store",
            "--exclude",
            "foo, bar",
            "--only=baz",
            "--use-ai-commit=false",
            "--commit-message",
            "chore: sync",
        ]);
        let config = command.to_config().unwrap();

        assert!(config.pull && config.fix_gitignore && config.remove_junk_files);
        assert_eq!(config.exclude, vec!["foo", "bar"]);
        assert_eq!(config.include, vec!["baz"]);
        assert!(!config.use_ai_commit);
        assert_eq!(
            config.commit_message,
            CommitMessagePolicy::Literal("chore: sync".to_string())
        );
    }

    #[test]
    fn bare_use_ai_commit_means_true() {
        let command = parse(&["--use-ai-commit", "--pull"]);
        assert!(command.use_ai_commit);
        assert!(command.pull);
    }

    #[test]
    fn invalid_junk_pattern_is_rejected() {
        let command = parse(&["--dir", "/srv", "--junk-pattern", "[oops"]);
        let error = command.to_config().unwrap_err();
        assert!(error.to_string().contains("Invalid junk pattern"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/Neoware").unwrap(), home.join("Neoware"));
        assert_eq!(expand_home("~").unwrap(), home);
        assert_eq!(expand_home("/abs/~x").unwrap(), PathBuf::from("/abs/~x"));
        assert_eq!(expand_home("~other").unwrap(), PathBuf::from("~other"));
    }
}
