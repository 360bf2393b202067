// ABOUTME: Status-change notices emitted by the supervisor and the reaper.
// ABOUTME: Delivered over a bounded channel; sending never blocks the emitter.

use std::fmt;
use tokio::sync::mpsc;

/// Capacity of the supervisor event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A worker process was spawned
    Started { name: String, pid: Option<u32> },
    /// A manual stop completed
    Stopped { name: String },
    /// The reaper classified an exit that followed a manual stop
    Terminated { name: String },
    /// The worker exited cleanly on its own
    Exited { name: String },
    /// The worker exited with a failure status on its own
    Crashed {
        name: String,
        code: Option<i32>,
        detail: String,
    },
    /// The OS refused to spawn the worker
    FailedToStart { name: String, detail: String },
}

impl SupervisorEvent {
    pub fn worker(&self) -> &str {
        match self {
            SupervisorEvent::Started { name, .. }
            | SupervisorEvent::Stopped { name }
            | SupervisorEvent::Terminated { name }
            | SupervisorEvent::Exited { name }
            | SupervisorEvent::Crashed { name, .. }
            | SupervisorEvent::FailedToStart { name, .. } => name,
        }
    }

    /// Reaper classifications, as opposed to results of an operator command
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            SupervisorEvent::Terminated { .. }
                | SupervisorEvent::Exited { .. }
                | SupervisorEvent::Crashed { .. }
        )
    }
}

impl fmt::Display for SupervisorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorEvent::Started { name, .. } => write!(f, "started bot: {name}"),
            SupervisorEvent::Stopped { name } => write!(f, "bot {name} stopped."),
            SupervisorEvent::Terminated { name } => write!(f, "{name} terminated."),
            SupervisorEvent::Exited { name } => write!(f, "{name} has stopped."),
            SupervisorEvent::Crashed { name, detail, .. } => {
                write!(f, "{name} terminated with error: {detail}")
            }
            SupervisorEvent::FailedToStart { name, detail } => {
                write!(f, "error starting {name}: {detail}")
            }
        }
    }
}

/// Sending half shared by the supervisor and reaper.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SupervisorEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::Receiver<SupervisorEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: SupervisorEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::debug!(error = %e, "Dropped supervisor event");
        }
    }
}
