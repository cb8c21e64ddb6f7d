//! Drives an [`Orchestrator`] with real discovery and pipeline tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use super::config::RunConfiguration;
use super::discovery::{discover, DiscoveryError};
use super::log::LogEntry;
use super::message::IndexSource;
use super::orchestrator::{Effect, Orchestrator, RunEvent, RunState};
use super::pipeline::{PipelineExecutor, PipelineReport};
use super::repository::{OperationOutcome, RepositoryDescriptor};
use crate::git::CommandGateway;

/// Delay between the last outcome and `Done`.
pub const DEFAULT_FINISH_DELAY: Duration = Duration::from_secs(1);

/// Runs one batch to completion.
///
/// Discovery and each pipeline run happen on spawned tasks that report back
/// with exactly one event. Only one pipeline runs at a time.
pub struct BatchRunner {
    config: Arc<RunConfiguration>,
    gateway: Arc<dyn CommandGateway>,
    executor: Arc<PipelineExecutor>,
    finish_delay: Duration,
}

impl BatchRunner {
    pub fn new(config: RunConfiguration, gateway: Arc<dyn CommandGateway>) -> Self {
        let config = Arc::new(config);
        let executor = Arc::new(PipelineExecutor::new(gateway.clone(), config.clone()));
        Self {
            config,
            gateway,
            executor,
            finish_delay: DEFAULT_FINISH_DELAY,
        }
    }

    #[must_use]
    pub fn with_finish_delay(mut self, delay: Duration) -> Self {
        self.finish_delay = delay;
        self
    }

    /// Replaces the randomness used for synthesized commit messages.
    #[must_use]
    pub fn with_index_source(mut self, index_source: Box<dyn IndexSource + Send>) -> Self {
        self.executor = Arc::new(PipelineExecutor::with_index_source(
            self.gateway.clone(),
            self.config.clone(),
            index_source,
        ));
        self
    }

    pub fn config(&self) -> &Arc<RunConfiguration> {
        &self.config
    }

    /// Runs the batch, publishing a snapshot after every event.
    ///
    /// `snapshots` is dropped when the run ends, which closes every receiver.
    /// Only a discovery failure is returned as an error.
    pub async fn run(self, snapshots: watch::Sender<RunState>) -> Result<RunState, DiscoveryError> {
        let mut orchestrator = Orchestrator::new(self.config.base_dir.clone(), self.finish_delay);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut next = Some(RunEvent::RunStarted);

        info!(base = %self.config.base_dir.display(), "Batch run started");

        loop {
            let event = match next.take() {
                Some(event) => event,
                None => match events_rx.recv().await {
                    Some(event) => event,
                    None => break,
                },
            };

            let effect = orchestrator.handle(event);
            snapshots.send_replace(orchestrator.state().clone());

            match effect {
                None => {}
                Some(Effect::Discover) => self.spawn_discovery(events_tx.clone()),
                Some(Effect::Process { index, repository }) => {
                    self.spawn_pipeline(index, repository, events_tx.clone());
                }
                Some(Effect::FinishAfter(delay)) => {
                    let events_tx = events_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        send(&events_tx, RunEvent::RunFinished);
                    });
                }
                Some(Effect::Stop) => break,
                Some(Effect::Abort(e)) => {
                    error!(error = %e, "Discovery failed");
                    return Err(e);
                }
            }
        }

        let state = orchestrator.into_state();
        let summary = state.summary();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch run finished"
        );
        Ok(state)
    }

    fn spawn_discovery(&self, events_tx: mpsc::UnboundedSender<RunEvent>) {
        let config = self.config.clone();
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            let event = match discover(&config, &*gateway).await {
                Ok(repositories) => RunEvent::DiscoveryCompleted(repositories),
                Err(e) => RunEvent::DiscoveryFailed(e),
            };
            send(&events_tx, event);
        });
    }

    fn spawn_pipeline(
        &self,
        index: usize,
        repository: RepositoryDescriptor,
        events_tx: mpsc::UnboundedSender<RunEvent>,
    ) {
        let executor = self.executor.clone();
        let name = repository.name.clone();
        tokio::spawn(async move {
            // The inner task turns a panic inside the pipeline into a failed outcome.
            let task = tokio::spawn(async move { executor.process(&repository).await });
            let report = match task.await {
                Ok(report) => report,
                Err(e) => {
                    let summary = format!("Pipeline aborted: {e}");
                    error!(repository = %name, error = %e, "Pipeline task failed");
                    PipelineReport {
                        logs: vec![LogEntry::error(&name, summary.clone())],
                        outcome: OperationOutcome::failed(summary, Vec::new()),
                    }
                }
            };
            send(&events_tx, RunEvent::RepositoryCompleted { index, report });
        });
    }
}

fn send(events_tx: &mpsc::UnboundedSender<RunEvent>, event: RunEvent) {
    if events_tx.send(event).is_err() {
        debug!("Run loop already stopped");
    }
}
