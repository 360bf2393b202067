// ABOUTME: hoster-core library: a process-lifecycle supervisor for local worker programs.
// ABOUTME: Re-exports the supervisor, registry, reaper, events, config and error types.

pub mod artifact;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod handle;
pub mod reaper;
pub mod registry;
pub mod supervisor;

pub use artifact::WorkerDirectory;
pub use config::Config;
pub use error::{RestartError, StartError, StopError};
pub use events::{EventSink, SupervisorEvent};
pub use handle::ProcessHandle;
pub use reaper::Reaper;
pub use registry::{WorkerOutput, WorkerRecord, WorkerRegistry, WorkerState, WorkerStatus};
pub use supervisor::{Supervisor, SupervisorSettings};
