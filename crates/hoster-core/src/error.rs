// ABOUTME: Error types for supervisor lifecycle operations using thiserror.
// ABOUTME: StartError, StopError and RestartError are per-worker and never fatal to the supervisor.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by `Supervisor::start`.
#[derive(Error, Debug)]
pub enum StartError {
    /// No artifact for this worker exists in the worker directory.
    #[error("the bot {name} does not exist in {}", .directory.display())]
    NotFound { name: String, directory: PathBuf },

    /// The worker already has a live process.
    #[error("bot {name} is already running.")]
    AlreadyRunning { name: String, pid: Option<u32> },

    /// The OS refused to create the process. The record is marked FailedToStart.
    #[error("error starting {name}: {detail}")]
    SpawnFailed { name: String, detail: String },
}

/// Errors returned by `Supervisor::stop`.
#[derive(Error, Debug)]
pub enum StopError {
    /// No record exists for this worker.
    #[error("bot {0} has not been started.")]
    NeverStarted(String),

    /// The worker's process has already exited or was never spawned.
    #[error("bot {0} is not running.")]
    NotRunning(String),

    /// The termination request could not be delivered.
    #[error("failed to signal bot {name}: {source}")]
    Signal {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Polling the process for exit failed while waiting for it to stop.
    #[error("failed waiting for bot {name} to exit: {source}")]
    Wait {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl StopError {
    /// NeverStarted and NotRunning mean there was nothing to stop.
    pub fn is_nothing_to_stop(&self) -> bool {
        matches!(self, StopError::NeverStarted(_) | StopError::NotRunning(_))
    }
}

/// Errors returned by `Supervisor::restart`, tagged with the phase that failed.
#[derive(Error, Debug)]
pub enum RestartError {
    #[error("restart failed while stopping: {0}")]
    Stop(#[source] StopError),

    #[error("restart failed while starting: {0}")]
    Start(#[source] StartError),
}
