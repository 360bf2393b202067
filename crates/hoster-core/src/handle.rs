// ABOUTME: Wraps one spawned worker process with its pid and captured output streams.
// ABOUTME: Exit polling is non-blocking and the first observed exit status is cached.

use crate::capture::CapturedStream;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    stdout: CapturedStream,
    stderr: CapturedStream,
    exit_status: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Spawn `cmd` with both output streams piped into capture buffers.
    /// Must be called inside a tokio runtime.
    pub fn spawn(mut cmd: Command, capture_limit: usize) -> io::Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child.id();

        let stdout = match child.stdout.take() {
            Some(pipe) => CapturedStream::spawn(pipe, capture_limit),
            None => CapturedStream::empty(),
        };
        let stderr = match child.stderr.take() {
            Some(pipe) => CapturedStream::spawn(pipe, capture_limit),
            None => CapturedStream::empty(),
        };

        Ok(Self {
            child,
            pid,
            stdout,
            stderr,
            exit_status: None,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking exit check. Returns the cached status once the process has exited.
    pub fn poll_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit_status.is_none() {
            self.exit_status = self.child.try_wait()?;
        }
        Ok(self.exit_status)
    }

    /// Exit status as last observed by `poll_exit`
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Ask the process to shut down gracefully (SIGTERM on unix).
    pub fn terminate(&mut self) -> io::Result<()> {
        // A reaped pid may already belong to another process
        if self.exit_status.is_some() {
            return Ok(());
        }
        match self.pid {
            Some(pid) => send_sigterm(pid).or_else(|e| {
                tracing::debug!(pid, error = %e, "Graceful termination failed, killing");
                self.force_kill()
            }),
            None => self.force_kill(),
        }
    }

    /// Kill the process without giving it a chance to clean up.
    pub fn force_kill(&mut self) -> io::Result<()> {
        if self.exit_status.is_some() {
            return Ok(());
        }
        match self.child.start_kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    pub fn stdout(&self) -> &CapturedStream {
        &self.stdout
    }

    pub fn stderr(&self) -> &CapturedStream {
        &self.stderr
    }

    pub fn stderr_mut(&mut self) -> &mut CapturedStream {
        &mut self.stderr
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw_pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    match signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
        // Already exited but not yet reaped
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination is not available on this platform",
    ))
}
