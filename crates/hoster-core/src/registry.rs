// ABOUTME: Shared worker registry mapping names to lifecycle records.
// ABOUTME: One coarse mutex serializes the supervisor and the reaper; it is never held across an await.

use crate::handle::ProcessHandle;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle status of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopped,
    Errored,
    FailedToStart,
    Unknown,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkerState::Running => "running",
            WorkerState::Stopped => "stopped",
            WorkerState::Errored => "errored",
            WorkerState::FailedToStart => "failed to start",
            WorkerState::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Supervisor state for one worker name across the session.
#[derive(Debug)]
pub struct WorkerRecord {
    pub name: String,
    /// Live or exited process of the latest spawn
    pub handle: Option<ProcessHandle>,
    pub state: WorkerState,
    pub error_detail: Option<String>,
    /// Set before a deliberate termination is requested
    pub manual_stop: bool,
    /// Set once the reaper has classified this process's exit
    pub handled: bool,
    /// Identifies the spawn this record describes
    pub generation: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl WorkerRecord {
    pub fn running(name: &str, handle: ProcessHandle, generation: u64) -> Self {
        Self {
            name: name.to_string(),
            handle: Some(handle),
            state: WorkerState::Running,
            error_detail: None,
            manual_stop: false,
            handled: false,
            generation,
            started_at: Some(Utc::now()),
        }
    }

    pub fn failed_to_start(name: &str, detail: String, generation: u64) -> Self {
        Self {
            name: name.to_string(),
            handle: None,
            state: WorkerState::FailedToStart,
            error_detail: Some(detail),
            manual_stop: false,
            handled: false,
            generation,
            started_at: None,
        }
    }

    /// True while the latest process has not been observed to exit.
    /// Polls the OS; a failed poll counts as not alive.
    pub fn is_alive(&mut self) -> bool {
        match self.handle.as_mut() {
            Some(handle) => matches!(handle.poll_exit(), Ok(None)),
            None => false,
        }
    }

    pub fn snapshot(&self) -> WorkerStatus {
        let handle = self.handle.as_ref();
        WorkerStatus {
            name: self.name.clone(),
            state: self.state,
            error_detail: self.error_detail.clone(),
            pid: handle.and_then(|h| h.pid()),
            exit_code: handle.and_then(|h| h.exit_status()).and_then(|s| s.code()),
            started_at: self.started_at,
        }
    }
}

/// Read-only view of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    pub name: String,
    pub state: WorkerState,
    pub error_detail: Option<String>,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Captured output of a worker's latest process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    records: Arc<Mutex<BTreeMap<String, WorkerRecord>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to every record. A poisoned lock is recovered: records are
    /// only ever replaced whole or have single fields assigned.
    pub fn lock(&self) -> MutexGuard<'_, BTreeMap<String, WorkerRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Statuses of every worker started this session, ordered by name
    pub fn snapshot(&self) -> Vec<WorkerStatus> {
        self.lock().values().map(WorkerRecord::snapshot).collect()
    }

    pub fn get(&self, name: &str) -> Option<WorkerStatus> {
        self.lock().get(name).map(WorkerRecord::snapshot)
    }

    pub fn output(&self, name: &str) -> Option<WorkerOutput> {
        let records = self.lock();
        let handle = records.get(name)?.handle.as_ref()?;
        Some(WorkerOutput {
            stdout: handle.stdout().text(),
            stderr: handle.stderr().text(),
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
