//! Batch run state machine.
//!
//! [`Orchestrator::handle`] is the only writer of [`RunState`]. It consumes one
//! [`RunEvent`] at a time and answers with the [`Effect`] the runner must
//! perform next. It never does I/O itself, so every transition can be driven
//! directly from tests.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, warn};

use super::discovery::DiscoveryError;
use super::log::{icons, LogEntry, LogRing};
use super::pipeline::PipelineReport;
use super::repository::{RepositoryDescriptor, RepositoryStatus};

/// Lifecycle of a run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Scanning,
    Processing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scanning => "scanning",
            Self::Processing => "processing",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Final result line for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryResult {
    pub name: String,
    pub success: bool,
    pub summary: String,
}

impl RepositoryResult {
    /// Marker distinguishing successes from failures.
    pub fn marker(&self) -> &'static str {
        if self.success {
            icons::SUCCESS
        } else {
            icons::ERROR
        }
    }
}

impl fmt::Display for RepositoryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.marker(), self.name, self.summary)
    }
}

/// Success and failure counts of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    pub elapsed: TimeDelta,
}

impl RunSummary {
    /// Average time per repository, or `None` for an empty run.
    pub fn average(&self) -> Option<TimeDelta> {
        let total = i32::try_from(self.total).ok().filter(|&n| n > 0)?;
        Some(self.elapsed / total)
    }
}

/// Everything the presentation layer may show about a run.
#[derive(Debug, Clone)]
pub struct RunState {
    pub phase: Phase,
    pub base_dir: PathBuf,
    pub repositories: Vec<RepositoryDescriptor>,
    /// Number of repositories that have received an outcome.
    pub current_index: usize,
    pub results: Vec<RepositoryResult>,
    pub logs: LogRing,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    /// Set when discovery failed and the run was aborted.
    pub fatal_error: Option<String>,
}

impl RunState {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            phase: Phase::Scanning,
            base_dir: base_dir.into(),
            repositories: Vec::new(),
            current_index: 0,
            results: Vec::new(),
            logs: LogRing::default(),
            started_at: Local::now(),
            finished_at: None,
            fatal_error: None,
        }
    }

    /// Completed fraction in `0.0..=1.0`, or `None` when there is nothing to
    /// process.
    pub fn progress(&self) -> Option<f64> {
        if self.repositories.is_empty() {
            return None;
        }
        Some(self.current_index as f64 / self.repositories.len() as f64)
    }

    /// The repository being processed, if any.
    pub fn current_repository(&self) -> Option<&RepositoryDescriptor> {
        if self.phase != Phase::Processing {
            return None;
        }
        self.repositories.get(self.current_index)
    }

    pub fn summary(&self) -> RunSummary {
        let succeeded = self.results.iter().filter(|r| r.success).count();
        let end = self.finished_at.unwrap_or_else(Local::now);
        RunSummary {
            succeeded,
            failed: self.results.len() - succeeded,
            total: self.repositories.len(),
            elapsed: end - self.started_at,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
pub enum RunEvent {
    RunStarted,
    DiscoveryCompleted(Vec<RepositoryDescriptor>),
    DiscoveryFailed(DiscoveryError),
    RepositoryCompleted { index: usize, report: PipelineReport },
    RunFinished,
}

impl RunEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::RunStarted => "RunStarted",
            Self::DiscoveryCompleted(_) => "DiscoveryCompleted",
            Self::DiscoveryFailed(_) => "DiscoveryFailed",
            Self::RepositoryCompleted { .. } => "RepositoryCompleted",
            Self::RunFinished => "RunFinished",
        }
    }
}

/// Work the runner performs in response to an event.
#[derive(Debug)]
pub enum Effect {
    /// Start discovery; it answers with `DiscoveryCompleted` or `DiscoveryFailed`.
    Discover,
    /// Run the pipeline on one repository; it answers with `RepositoryCompleted`.
    Process {
        index: usize,
        repository: RepositoryDescriptor,
    },
    /// Send `RunFinished` after the delay.
    FinishAfter(Duration),
    /// The run reached `Done`.
    Stop,
    /// Discovery failed; the run reached `Done` with a fatal error.
    Abort(DiscoveryError),
}

/// Owns the [`RunState`] and applies events to it.
#[derive(Debug)]
pub struct Orchestrator {
    state: RunState,
    finish_delay: Duration,
    discovery_requested: bool,
}

impl Orchestrator {
    pub fn new(base_dir: impl Into<PathBuf>, finish_delay: Duration) -> Self {
        Self {
            state: RunState::new(base_dir),
            finish_delay,
            discovery_requested: false,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Applies `event`, returning the follow-up effect.
    ///
    /// Events that make no sense in the current phase are logged and ignored.
    pub fn handle(&mut self, event: RunEvent) -> Option<Effect> {
        match (self.state.phase, event) {
            (Phase::Scanning, RunEvent::RunStarted) => self.on_run_started(),
            (Phase::Scanning, RunEvent::DiscoveryCompleted(repositories)) => {
                Some(self.on_discovery_completed(repositories))
            }
            (Phase::Scanning, RunEvent::DiscoveryFailed(error)) => {
                Some(self.on_discovery_failed(error))
            }
            (Phase::Processing, RunEvent::RepositoryCompleted { index, report }) => {
                self.on_repository_completed(index, report)
            }
            (Phase::Processing, RunEvent::RunFinished) => self.on_run_finished(),
            (phase, event) => {
                warn!(phase = %phase, event = event.name(), "Ignoring unexpected event");
                None
            }
        }
    }

    fn on_run_started(&mut self) -> Option<Effect> {
        if self.discovery_requested {
            warn!("Run already started");
            return None;
        }
        self.discovery_requested = true;
        self.state.logs.push(
            LogEntry::system(format!(
                "Scanning {} for repositories",
                self.state.base_dir.display()
            ))
            .with_tag(icons::SCANNING),
        );
        Some(Effect::Discover)
    }

    fn on_discovery_completed(&mut self, repositories: Vec<RepositoryDescriptor>) -> Effect {
        debug!(count = repositories.len(), "Discovery completed");
        self.state.repositories = repositories;

        if self.state.repositories.is_empty() {
            self.state.logs.push(LogEntry::warning(
                super::log::SYSTEM_SOURCE,
                "No repositories found",
            ));
            self.enter_done();
            return Effect::Stop;
        }

        self.state.logs.push(LogEntry::system(format!(
            "Found {} repositories",
            self.state.repositories.len()
        )));
        self.state.phase = Phase::Processing;
        self.dispatch(0)
    }

    fn on_discovery_failed(&mut self, error: DiscoveryError) -> Effect {
        let message = error.to_string();
        self.state
            .logs
            .push(LogEntry::error(super::log::SYSTEM_SOURCE, message.clone()));
        self.state.fatal_error = Some(message);
        self.enter_done();
        Effect::Abort(error)
    }

    fn on_repository_completed(&mut self, index: usize, report: PipelineReport) -> Option<Effect> {
        if index != self.state.current_index || index >= self.state.repositories.len() {
            warn!(
                index,
                current = self.state.current_index,
                "Ignoring stale repository completion"
            );
            return None;
        }

        let PipelineReport { outcome, logs } = report;
        let repository = &mut self.state.repositories[index];
        repository.status = if outcome.success {
            RepositoryStatus::Succeeded
        } else {
            RepositoryStatus::Failed
        };
        self.state.results.push(RepositoryResult {
            name: repository.name.clone(),
            success: outcome.success,
            summary: outcome.summary,
        });
        self.state.logs.extend(logs);
        self.state.current_index += 1;

        if self.state.current_index == self.state.repositories.len() {
            Some(Effect::FinishAfter(self.finish_delay))
        } else {
            Some(self.dispatch(self.state.current_index))
        }
    }

    fn on_run_finished(&mut self) -> Option<Effect> {
        if self.state.current_index < self.state.repositories.len() {
            warn!(
                current = self.state.current_index,
                total = self.state.repositories.len(),
                "Ignoring early RunFinished"
            );
            return None;
        }

        let summary = self.state.summary();
        self.state.logs.push(
            LogEntry::system(format!(
                "Finished: {} succeeded, {} failed",
                summary.succeeded, summary.failed
            ))
            .with_tag(icons::COMPLETE),
        );
        self.enter_done();
        Some(Effect::Stop)
    }

    fn dispatch(&mut self, index: usize) -> Effect {
        let repository = &mut self.state.repositories[index];
        repository.status = RepositoryStatus::Processing;
        Effect::Process {
            index,
            repository: repository.clone(),
        }
    }

    fn enter_done(&mut self) {
        self.state.phase = Phase::Done;
        self.state.finished_at = Some(Local::now());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::batch::repository::OperationOutcome;

    fn repos(names: &[&str]) -> Vec<RepositoryDescriptor> {
        names
            .iter()
            .map(|name| RepositoryDescriptor::new(*name, format!("/repos/{name}"), "main"))
            .collect()
    }

    fn report(success: bool, summary: &str) -> PipelineReport {
        let outcome = if success {
            OperationOutcome::succeeded(vec![summary.to_string()])
        } else {
            OperationOutcome::failed(summary, Vec::new())
        };
        PipelineReport {
            outcome,
            logs: vec![LogEntry::info("r", summary)],
        }
    }

    fn processing(names: &[&str]) -> Orchestrator {
        let mut orchestrator = Orchestrator::new("/repos", Duration::ZERO);
        assert!(matches!(
            orchestrator.handle(RunEvent::RunStarted),
            Some(Effect::Discover)
        ));
        orchestrator.handle(RunEvent::DiscoveryCompleted(repos(names)));
        orchestrator
    }

    #[test]
    fn empty_discovery_goes_straight_to_done() {
        let mut orchestrator = Orchestrator::new("/repos", Duration::ZERO);
        orchestrator.handle(RunEvent::RunStarted);

        let effect = orchestrator.handle(RunEvent::DiscoveryCompleted(Vec::new()));

        assert!(matches!(effect, Some(Effect::Stop)));
        let state = orchestrator.state();
        assert_eq!(state.phase, Phase::Done);
        assert_eq!(state.progress(), None);
        assert!(state.results.is_empty());
    }

    #[test]
    fn repositories_are_processed_in_order() {
        let mut orchestrator = Orchestrator::new("/repos", Duration::from_secs(1));
        orchestrator.handle(RunEvent::RunStarted);

        let effect = orchestrator.handle(RunEvent::DiscoveryCompleted(repos(&["a", "b"])));
        let Some(Effect::Process { index, repository }) = effect else {
            panic!("expected first dispatch, got {effect:?}");
        };
        assert_eq!((index, repository.name.as_str()), (0, "a"));
        assert_eq!(orchestrator.state().phase, Phase::Processing);
        assert_eq!(
            orchestrator.state().current_repository().unwrap().status,
            RepositoryStatus::Processing
        );

        let effect = orchestrator.handle(RunEvent::RepositoryCompleted {
            index: 0,
            report: report(true, "No changes to commit"),
        });
        assert!(matches!(effect, Some(Effect::Process { index: 1, .. })));
        assert_eq!(orchestrator.state().progress(), Some(0.5));

        let effect = orchestrator.handle(RunEvent::RepositoryCompleted {
            index: 1,
            report: report(false, "Failed to push"),
        });
        assert!(matches!(effect, Some(Effect::FinishAfter(d)) if d == Duration::from_secs(1)));
        assert_eq!(orchestrator.state().phase, Phase::Processing);

        assert!(matches!(
            orchestrator.handle(RunEvent::RunFinished),
            Some(Effect::Stop)
        ));
        let state = orchestrator.into_state();
        assert_eq!(state.phase, Phase::Done);
        assert_eq!(state.results.len(), 2);
        assert_eq!(state.repositories[1].status, RepositoryStatus::Failed);
        assert_eq!(state.results[1].to_string(), "💥 b: Failed to push");

        let summary = state.summary();
        assert_eq!((summary.succeeded, summary.failed, summary.total), (1, 1, 2));
    }

    #[test]
    fn stale_and_early_events_are_ignored() {
        let mut orchestrator = processing(&["a", "b"]);

        assert!(orchestrator.handle(RunEvent::RunFinished).is_none());
        assert!(orchestrator
            .handle(RunEvent::RepositoryCompleted {
                index: 1,
                report: report(true, "x"),
            })
            .is_none());
        assert!(orchestrator.handle(RunEvent::RunStarted).is_none());
        assert_eq!(orchestrator.state().current_index, 0);
        assert!(orchestrator.state().results.is_empty());
    }

    #[test]
    fn discovery_failure_is_fatal() {
        let mut orchestrator = Orchestrator::new("/missing", Duration::ZERO);
        orchestrator.handle(RunEvent::RunStarted);

        let error = DiscoveryError::Unreadable {
            path: PathBuf::from("/missing"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let effect = orchestrator.handle(RunEvent::DiscoveryFailed(error));

        assert!(matches!(effect, Some(Effect::Abort(_))));
        let state = orchestrator.state();
        assert_eq!(state.phase, Phase::Done);
        assert!(state
            .fatal_error
            .as_deref()
            .unwrap()
            .starts_with("Failed to read directory /missing"));
    }

    #[test]
    fn done_ignores_everything() {
        let mut orchestrator = processing(&["a"]);
        orchestrator.handle(RunEvent::RepositoryCompleted {
            index: 0,
            report: report(true, "ok"),
        });
        orchestrator.handle(RunEvent::RunFinished);

        assert!(orchestrator.handle(RunEvent::RunFinished).is_none());
        assert!(orchestrator
            .handle(RunEvent::DiscoveryCompleted(repos(&["z"])))
            .is_none());
        assert_eq!(orchestrator.state().repositories.len(), 1);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Step {
            Complete { index: usize, success: bool },
            Finish,
            Restart,
        }

        fn arb_step() -> impl Strategy<Value = Step> {
            prop_oneof![
                4 => (0usize..8, any::<bool>())
                    .prop_map(|(index, success)| Step::Complete { index, success }),
                1 => Just(Step::Finish),
                1 => Just(Step::Restart),
            ]
        }

        proptest! {
            #[test]
            fn index_is_monotonic_and_bounded(
                count in 0usize..6,
                steps in proptest::collection::vec(arb_step(), 0..40),
            ) {
                let names: Vec<String> = (0..count).map(|i| format!("r{i}")).collect();
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                let mut orchestrator = processing(&names);
                let mut previous_index = 0;
                let mut previous_phase = orchestrator.state().phase;

                for step in steps {
                    let event = match step {
                        Step::Complete { index, success } => RunEvent::RepositoryCompleted {
                            index,
                            report: report(success, "s"),
                        },
                        Step::Finish => RunEvent::RunFinished,
                        Step::Restart => RunEvent::RunStarted,
                    };
                    orchestrator.handle(event);

                    let state = orchestrator.state();
                    prop_assert!(state.current_index >= previous_index);
                    prop_assert!(state.current_index <= state.repositories.len());
                    prop_assert_eq!(state.results.len(), state.current_index);
                    prop_assert!(state.phase >= previous_phase);
                    if state.phase == Phase::Done {
                        prop_assert_eq!(state.results.len(), state.repositories.len());
                    }
                    previous_index = state.current_index;
                    previous_phase = state.phase;
                }
            }
        }
    }
}
