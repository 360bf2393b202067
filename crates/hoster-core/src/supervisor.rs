// ABOUTME: Lifecycle supervisor exposing start, stop, restart and status for named workers.
// ABOUTME: Owns the worker registry and event sink that it shares with the reaper.

use crate::artifact::WorkerDirectory;
use crate::config::Config;
use crate::error::{RestartError, StartError, StopError};
use crate::events::{EventSink, SupervisorEvent};
use crate::handle::ProcessHandle;
use crate::reaper::Reaper;
use crate::registry::{WorkerOutput, WorkerRecord, WorkerRegistry, WorkerState, WorkerStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Timing and capture limits for the supervisor and its reaper
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Time between reaper passes
    pub reap_interval: Duration,
    /// Grace period before a stop escalates to a kill; None waits forever
    pub stop_grace: Option<Duration>,
    /// How often `stop` polls for the process to exit
    pub stop_poll_interval: Duration,
    /// Maximum bytes retained per captured output stream
    pub capture_limit: usize,
    /// How long the reaper waits for stderr to reach end-of-stream after an exit
    pub drain_timeout: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            reap_interval: Duration::from_secs(5),
            stop_grace: Some(Duration::from_secs(10)),
            stop_poll_interval: Duration::from_millis(50),
            capture_limit: 1024 * 1024,
            drain_timeout: Duration::from_secs(1),
        }
    }
}

impl From<&Config> for SupervisorSettings {
    fn from(config: &Config) -> Self {
        Self {
            reap_interval: config.reap_interval(),
            stop_grace: config.stop_grace(),
            capture_limit: config.capture_limit_bytes,
            ..Self::default()
        }
    }
}

pub struct Supervisor {
    workers: WorkerDirectory,
    registry: WorkerRegistry,
    events: EventSink,
    settings: SupervisorSettings,
    next_generation: AtomicU64,
}

impl Supervisor {
    /// Create a supervisor and the receiving end of its event channel.
    pub fn new(
        workers: WorkerDirectory,
        settings: SupervisorSettings,
    ) -> (Self, mpsc::Receiver<SupervisorEvent>) {
        let (events, rx) = EventSink::channel();
        let supervisor = Self {
            workers,
            registry: WorkerRegistry::new(),
            events,
            settings,
            next_generation: AtomicU64::new(1),
        };
        (supervisor, rx)
    }

    pub fn from_config(config: &Config) -> (Self, mpsc::Receiver<SupervisorEvent>) {
        Self::new(WorkerDirectory::from_config(config), config.into())
    }

    pub fn workers(&self) -> &WorkerDirectory {
        &self.workers
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// A reaper bound to this supervisor's registry. Run one per supervisor.
    pub fn reaper(&self) -> Reaper {
        Reaper::new(
            self.registry.clone(),
            self.events.clone(),
            self.settings.reap_interval,
            self.settings.drain_timeout,
        )
    }

    /// Snapshot of every worker started this session, ordered by name
    pub fn status(&self) -> Vec<WorkerStatus> {
        self.registry.snapshot()
    }

    pub fn output(&self, name: &str) -> Option<WorkerOutput> {
        self.registry.output(name)
    }

    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Spawn the worker's artifact. Must be called inside a tokio runtime.
    ///
    /// A missing artifact or an already running worker leaves the registry untouched.
    /// A spawn failure is recorded as FailedToStart and is not retried.
    pub fn start(&self, name: &str) -> Result<(), StartError> {
        let Some(artifact) = self.workers.resolve(name) else {
            return Err(StartError::NotFound {
                name: name.to_string(),
                directory: self.workers.root().to_path_buf(),
            });
        };

        let mut records = self.registry.lock();
        if let Some(record) = records.get_mut(name) {
            if record.is_alive() {
                return Err(StartError::AlreadyRunning {
                    name: name.to_string(),
                    pid: record.handle.as_ref().and_then(|h| h.pid()),
                });
            }
        }

        let generation = self.next_generation();
        let cmd = self.workers.command_for(&artifact);
        match ProcessHandle::spawn(cmd, self.settings.capture_limit) {
            Ok(handle) => {
                let pid = handle.pid();
                info!(
                    worker = name,
                    pid = ?pid,
                    artifact = %artifact.display(),
                    "Started worker"
                );
                records.insert(
                    name.to_string(),
                    WorkerRecord::running(name, handle, generation),
                );
                drop(records);

                self.events.emit(SupervisorEvent::Started {
                    name: name.to_string(),
                    pid,
                });
                Ok(())
            }
            Err(e) => {
                let detail = e.to_string();
                warn!(worker = name, error = %detail, "Failed to spawn worker");
                records.insert(
                    name.to_string(),
                    WorkerRecord::failed_to_start(name, detail.clone(), generation),
                );
                drop(records);

                self.events.emit(SupervisorEvent::FailedToStart {
                    name: name.to_string(),
                    detail: detail.clone(),
                });
                Err(StartError::SpawnFailed {
                    name: name.to_string(),
                    detail,
                })
            }
        }
    }

    /// Request a graceful shutdown of the worker and wait until its process has exited.
    ///
    /// After the grace period the process is killed; the wait still runs to completion.
    pub async fn stop(&self, name: &str) -> Result<(), StopError> {
        let generation = self.request_stop(name)?;
        let requested_at = Instant::now();
        let mut escalated = false;

        while !self.poll_stopped(name, generation, requested_at, &mut escalated)? {
            tokio::time::sleep(self.settings.stop_poll_interval).await;
        }

        info!(worker = name, escalated, "Stopped worker");
        self.events.emit(SupervisorEvent::Stopped {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Marks the record as manually stopped, then signals the process, under one lock.
    fn request_stop(&self, name: &str) -> Result<u64, StopError> {
        let mut records = self.registry.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| StopError::NeverStarted(name.to_string()))?;
        if !record.is_alive() {
            return Err(StopError::NotRunning(name.to_string()));
        }

        record.manual_stop = true;
        let generation = record.generation;
        if let Some(handle) = record.handle.as_mut() {
            debug!(worker = name, pid = ?handle.pid(), "Requesting worker shutdown");
            if let Err(source) = handle.terminate() {
                record.manual_stop = false;
                return Err(StopError::Signal {
                    name: name.to_string(),
                    source,
                });
            }
        }
        Ok(generation)
    }

    /// Returns true once the process of `generation` has exited.
    fn poll_stopped(
        &self,
        name: &str,
        generation: u64,
        requested_at: Instant,
        escalated: &mut bool,
    ) -> Result<bool, StopError> {
        let mut records = self.registry.lock();
        let Some(record) = records
            .get_mut(name)
            .filter(|r| r.generation == generation)
        else {
            return Ok(true);
        };
        let Some(handle) = record.handle.as_mut() else {
            return Ok(true);
        };

        match handle.poll_exit() {
            Ok(Some(status)) => {
                debug!(worker = name, %status, "Worker exited after stop request");
                record.state = WorkerState::Stopped;
                record.error_detail = None;
                Ok(true)
            }
            Ok(None) => {
                let grace_elapsed = self
                    .settings
                    .stop_grace
                    .is_some_and(|grace| requested_at.elapsed() >= grace);
                if grace_elapsed && !*escalated {
                    warn!(worker = name, pid = ?handle.pid(), "Grace period elapsed, killing worker");
                    handle.force_kill().map_err(|source| StopError::Signal {
                        name: name.to_string(),
                        source,
                    })?;
                    *escalated = true;
                }
                Ok(false)
            }
            Err(source) => Err(StopError::Wait {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Stop then start. Having nothing to stop is not an error.
    pub async fn restart(&self, name: &str) -> Result<(), RestartError> {
        match self.stop(name).await {
            Ok(()) => {}
            Err(e) if e.is_nothing_to_stop() => {
                debug!(worker = name, reason = %e, "Nothing to stop before restart");
            }
            Err(e) => return Err(RestartError::Stop(e)),
        }
        self.start(name).map_err(RestartError::Start)
    }

    /// Stop every live worker, one at a time. Returns the names that were stopped.
    pub async fn shutdown(&self) -> Vec<String> {
        let mut stopped = Vec::new();
        for name in self.registry.names() {
            match self.stop(&name).await {
                Ok(()) => stopped.push(name),
                Err(e) if e.is_nothing_to_stop() => {}
                Err(e) => warn!(worker = %name, error = %e, "Failed to stop worker during shutdown"),
            }
        }
        stopped
    }
}
