//! Pure rendering of run snapshots into text frames.

use std::sync::Arc;

use chrono::TimeDelta;

use super::theme::{Role, Theme};
use crate::batch::config::{CommitMessagePolicy, RunConfiguration};
use crate::batch::log::{icons, LogLevel};
use crate::batch::orchestrator::{Phase, RunState};

const TITLE: &str = "🚀 Git Repository Manager ✨";
const FOOTER: &str = "Press 'q', 'esc', or Ctrl+C to quit";
const RECENT_RESULTS: usize = 3;
const RECENT_LOGS: usize = 8;
const MAX_BAR_WIDTH: usize = 50;

/// Turns [`RunState`] snapshots into frames. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct Renderer {
    theme: Theme,
    config: Arc<RunConfiguration>,
}

impl Renderer {
    pub fn new(theme: Theme, config: Arc<RunConfiguration>) -> Self {
        Self { theme, config }
    }

    /// Renders a full frame for a terminal `width` columns wide.
    pub fn render(&self, state: &RunState, width: u16) -> String {
        let rule = "─".repeat(usize::from(width).saturating_sub(4).max(10));
        let mut lines = vec![
            self.theme.paint(Role::Title, TITLE),
            self.theme.paint(Role::Muted, &rule),
            String::new(),
        ];

        match state.phase {
            Phase::Scanning => self.scanning(state, &mut lines),
            Phase::Processing => self.processing(state, width, &mut lines),
            Phase::Done => self.done(state, &mut lines),
        }

        lines.push(String::new());
        lines.push(self.theme.paint(Role::Muted, &rule));
        lines.push(self.theme.paint(Role::Muted, FOOTER));
        lines.join("\n")
    }

    /// Renders only the final summary, for output after the dashboard closes.
    pub fn report(&self, state: &RunState) -> String {
        let mut lines = Vec::new();
        self.done(state, &mut lines);
        lines.join("\n")
    }

    fn scanning(&self, state: &RunState, lines: &mut Vec<String>) {
        lines.push(format!("{} Discovering Git repositories...", icons::SCANNING));
        lines.push(format!("📂 Scanning directory: {}", state.base_dir.display()));
        lines.push(String::new());
        lines.extend(self.config_table());
    }

    /// Configuration summary shown while scanning.
    pub fn config_table(&self) -> Vec<String> {
        let config = &self.config;
        let mut lines = vec![
            self.theme.paint(Role::Title, &format!("{} Configuration", icons::CONFIG)),
            format!("📂 Base Directory: {}", config.base_dir.display()),
            format!("{} Pull Changes: {}", icons::PULL, self.yes_no(config.pull)),
            format!(
                "{} Handle .gitignore: {}",
                icons::CONFIG,
                self.yes_no(config.fix_gitignore)
            ),
            format!(
                "{} Remove {}: {}",
                icons::REMOVE,
                config.junk_pattern,
                self.yes_no(config.remove_junk_files)
            ),
            format!(
                "{} Using AI Commit: {}",
                icons::COMMIT,
                self.yes_no(config.use_ai_commit)
            ),
        ];

        let message = match &config.commit_message {
            CommitMessagePolicy::AutoGenerate => self.theme.paint(Role::Success, "Auto Generated"),
            CommitMessagePolicy::Literal(message) => self.theme.paint(Role::Info, message),
        };
        lines.push(format!("{} Commit Message: {message}", icons::COMMIT));

        if !config.exclude.is_empty() {
            lines.push(format!(
                "{} Excluded: {}",
                icons::REMOVE,
                self.theme.paint(Role::Warning, &config.exclude.join(", "))
            ));
        }
        if !config.include.is_empty() {
            lines.push(format!(
                "➕ Including Only: {}",
                self.theme.paint(Role::Success, &config.include.join(", "))
            ));
        }
        lines
    }

    fn processing(&self, state: &RunState, width: u16, lines: &mut Vec<String>) {
        let total = state.repositories.len();
        lines.push(format!(
            "🔄 Processing repositories: {}/{}",
            state.current_index, total
        ));
        if let Some(progress) = state.progress() {
            lines.push(self.progress_bar(progress, width));
        }

        if let Some(repository) = state.current_repository() {
            lines.push(String::new());
            lines.push(format!(
                "📦 {}",
                self.theme.paint(Role::Accent, &repository.name)
            ));
            lines.push(format!(
                "🌸 Branch: {}",
                self.theme.paint(Role::Accent, &repository.branch)
            ));
            lines.push("⏱️ Status: Processing...".to_string());
        }

        if !state.results.is_empty() {
            lines.push(String::new());
            lines.push(self.theme.paint(Role::Info, "Recent Results:"));
            let skip = state.results.len().saturating_sub(RECENT_RESULTS);
            for result in state.results.iter().skip(skip) {
                let role = if result.success { Role::Success } else { Role::Error };
                lines.push(format!("  {}", self.theme.paint(role, &result.to_string())));
            }
        }

        if !state.logs.is_empty() {
            lines.push(String::new());
            lines.push(self.theme.paint(Role::Info, "Recent Logs:"));
            for entry in state.logs.latest(RECENT_LOGS) {
                let role = match entry.level {
                    LogLevel::Info => Role::Muted,
                    LogLevel::Success => Role::Success,
                    LogLevel::Warning => Role::Warning,
                    LogLevel::Error => Role::Error,
                };
                let line = format!(
                    "{} {} [{}] {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.tag,
                    entry.repository,
                    entry.message
                );
                lines.push(format!("  {}", self.theme.paint(role, &line)));
            }
        }
    }

    fn done(&self, state: &RunState, lines: &mut Vec<String>) {
        if let Some(error) = &state.fatal_error {
            lines.push(self.theme.paint(Role::Error, &format!("{} {error}", icons::ERROR)));
            return;
        }
        if state.repositories.is_empty() {
            lines.push(self.theme.paint(
                Role::Warning,
                &format!(
                    "{} No repositories found in {}",
                    icons::WARNING,
                    state.base_dir.display()
                ),
            ));
            return;
        }

        let summary = state.summary();
        lines.push(format!("{} Processing Complete!", icons::COMPLETE));
        lines.push(String::new());
        lines.push(format!(
            "✅ Successfully processed: {} repositories",
            summary.succeeded
        ));
        lines.push(format!("{} Failed: {} repositories", icons::ERROR, summary.failed));
        lines.push(format!("📦 Total repositories: {}", summary.total));
        lines.push(format!("⏱️ Total time: {} seconds", seconds(summary.elapsed)));
        if let Some(average) = summary.average() {
            lines.push(format!("📊 Average time per repo: {} seconds", seconds(average)));
        }

        if !state.results.is_empty() {
            lines.push(String::new());
            lines.push(self.theme.paint(Role::Info, "Detailed Results:"));
            for (i, result) in state.results.iter().enumerate() {
                let role = if result.success { Role::Success } else { Role::Error };
                lines.push(self.theme.paint(role, &format!("{}. {result}", i + 1)));
            }
        }
    }

    fn progress_bar(&self, progress: f64, width: u16) -> String {
        let bar_width = usize::from(width).saturating_sub(10).clamp(10, MAX_BAR_WIDTH);
        let filled = ((progress.clamp(0.0, 1.0) * bar_width as f64).round() as usize).min(bar_width);
        format!(
            "{}{} {:>3.0}%",
            self.theme.paint(Role::Primary, &"█".repeat(filled)),
            self.theme.paint(Role::Muted, &"░".repeat(bar_width - filled)),
            progress * 100.0
        )
    }

    fn yes_no(&self, value: bool) -> String {
        if value {
            self.theme.paint(Role::Success, "✓ Yes")
        } else {
            self.theme.paint(Role::Error, "✗ No")
        }
    }
}

fn seconds(delta: TimeDelta) -> String {
    format!("{:.2}", delta.num_milliseconds() as f64 / 1000.0)
}
