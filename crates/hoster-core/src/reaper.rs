// ABOUTME: Background loop that detects worker exits and classifies them.
// ABOUTME: Manual stop, crash and clean exit are each recorded exactly once per process.

use crate::capture::CaptureBuffer;
use crate::events::{EventSink, SupervisorEvent};
use crate::registry::{WorkerRegistry, WorkerState};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// An exit observed during a pass, waiting for its stderr to finish draining.
struct PendingExit {
    name: String,
    generation: u64,
    status: ExitStatus,
    stderr: CaptureBuffer,
    drain: Option<JoinHandle<()>>,
}

/// Polls every tracked process on a fixed interval.
///
/// Passes are expected to run one at a time; use a single reaper per registry.
pub struct Reaper {
    registry: WorkerRegistry,
    events: EventSink,
    interval: Duration,
    drain_timeout: Duration,
}

impl Reaper {
    pub fn new(
        registry: WorkerRegistry,
        events: EventSink,
        interval: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            events,
            interval,
            drain_timeout,
        }
    }

    /// Run the loop on the tokio runtime until the returned task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Reap, then sleep the full interval, forever.
    pub async fn run(self) {
        tracing::debug!(interval = ?self.interval, "Reaper running");
        loop {
            self.reap_once().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One pass over the registry. Returns the number of exits classified.
    pub async fn reap_once(&self) -> usize {
        let exits = self.collect_exits();
        let mut classified = 0;

        for mut exit in exits {
            if let Some(drain) = exit.drain.take() {
                if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
                    tracing::debug!(worker = %exit.name, "Stderr still open after exit, using partial output");
                }
            }
            let stderr = exit.stderr.text();

            if let Some(event) = self.classify(&exit, stderr) {
                self.events.emit(event);
                classified += 1;
            }
        }

        classified
    }

    /// Poll every unhandled process without blocking and collect the ones that exited.
    fn collect_exits(&self) -> Vec<PendingExit> {
        let mut records = self.registry.lock();
        let mut exits = Vec::new();

        for record in records.values_mut() {
            if record.handled {
                continue;
            }
            let Some(handle) = record.handle.as_mut() else {
                continue;
            };

            match handle.poll_exit() {
                Ok(Some(status)) => exits.push(PendingExit {
                    name: record.name.clone(),
                    generation: record.generation,
                    status,
                    stderr: handle.stderr().buffer(),
                    drain: handle.stderr_mut().take_drain(),
                }),
                Ok(None) => {}
                Err(e) => {
                    if record.state != WorkerState::Unknown {
                        warn!(worker = %record.name, error = %e, "Failed to poll worker exit");
                        record.state = WorkerState::Unknown;
                        record.error_detail = Some(e.to_string());
                    }
                }
            }
        }

        exits
    }

    /// Apply the classification for one exit. Returns None if the record was
    /// already handled or has been replaced by a newer spawn.
    fn classify(&self, exit: &PendingExit, stderr: String) -> Option<SupervisorEvent> {
        let mut records = self.registry.lock();
        let record = records.get_mut(&exit.name)?;
        if record.generation != exit.generation || record.handled {
            return None;
        }

        let name = exit.name.clone();
        let event = if record.manual_stop {
            info!(worker = %name, status = %exit.status, "Worker terminated by manual stop");
            record.state = WorkerState::Stopped;
            record.error_detail = None;
            SupervisorEvent::Terminated { name }
        } else if !exit.status.success() {
            let detail = if stderr.is_empty() {
                format!("exited with {}", exit.status)
            } else {
                stderr
            };
            warn!(worker = %name, status = %exit.status, error = %detail, "Worker crashed");
            record.state = WorkerState::Errored;
            record.error_detail = Some(detail.clone());
            SupervisorEvent::Crashed {
                name,
                code: exit.status.code(),
                detail,
            }
        } else {
            info!(worker = %name, "Worker exited on its own");
            record.state = WorkerState::Stopped;
            record.error_detail = None;
            SupervisorEvent::Exited { name }
        };

        record.handled = true;
        Some(event)
    }
}
