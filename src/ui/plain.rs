//! Line-oriented progress output for non-interactive use.

use std::io::{self, Write};

use tokio::sync::watch;

use crate::batch::log::icons;
use crate::batch::orchestrator::{Phase, RunState};

/// Prints each repository result once, as it arrives.
pub struct PlainReporter<W> {
    out: W,
    announced: bool,
    printed: usize,
}

impl<W: Write> PlainReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            announced: false,
            printed: 0,
        }
    }

    /// Writes whatever `state` adds since the previous call.
    pub fn update(&mut self, state: &RunState) -> io::Result<()> {
        if !self.announced && state.phase != Phase::Scanning {
            writeln!(
                self.out,
                "{} Found {} repositories in {}",
                icons::SCANNING,
                state.repositories.len(),
                state.base_dir.display()
            )?;
            self.announced = true;
        }

        let total = state.repositories.len();
        for result in state.results.iter().skip(self.printed) {
            self.printed += 1;
            writeln!(self.out, "[{}/{total}] {result}", self.printed)?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Feeds every snapshot to `reporter` until the run drops its sender.
pub async fn follow<W: Write>(
    mut reporter: PlainReporter<W>,
    mut snapshots: watch::Receiver<RunState>,
) -> io::Result<PlainReporter<W>> {
    loop {
        let state = snapshots.borrow_and_update().clone();
        reporter.update(&state)?;
        if snapshots.changed().await.is_err() {
            let state = snapshots.borrow().clone();
            reporter.update(&state)?;
            return Ok(reporter);
        }
    }
}
