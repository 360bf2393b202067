// ABOUTME: hoster-cli library: the interactive console around hoster-core.
// ABOUTME: run_console wires stdin, supervisor events and Ctrl-C into one loop.

pub mod cli;
pub mod commands;
pub mod console;

pub use cli::Cli;
pub use commands::{Action, Command};
pub use console::{Console, Flow};

use anyhow::{Context, Result};
use hoster_core::{Config, Supervisor, SupervisorEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Run the interactive console until `exit`, end of input or Ctrl-C.
/// Every live bot is stopped before this returns, including when the console fails.
pub async fn run_console(config: Config) -> Result<()> {
    let (supervisor, events) = Supervisor::from_config(&config);
    let reaper = supervisor.reaper().spawn();
    tracing::info!(
        worker_dir = %supervisor.workers().root().display(),
        "Console started"
    );

    let input = BufReader::new(tokio::io::stdin());
    let result = console_loop(&supervisor, events, input).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Console failed, stopping bots");
    }

    // No-op after a normal exit; the exit command has already stopped everything
    for name in supervisor.shutdown().await {
        tracing::info!(worker = %name, "Stopped worker on console close");
    }
    reaper.abort();
    tracing::info!("Console closed");
    result
}

async fn console_loop<R>(
    supervisor: &Supervisor,
    mut events: mpsc::Receiver<SupervisorEvent>,
    mut input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut console = Console::new(supervisor, std::io::stdout());
    console.clear()?;

    // Partial reads survive a cancelled read_until, so the buffer lives across iterations
    let mut buf = Vec::new();
    let mut show_prompt = true;
    loop {
        if show_prompt {
            console.prompt()?;
        }

        tokio::select! {
            read = input.read_until(b'\n', &mut buf) => {
                let read = read.context("Failed to read console input")?;
                let flow = if read == 0 {
                    console.execute(Command::Exit).await?
                } else {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    buf.clear();
                    console.handle_line(&line).await?
                };
                if flow == Flow::Exit {
                    return Ok(());
                }
                show_prompt = true;
            }
            Some(event) = events.recv() => {
                show_prompt = console.notify(&event)?;
            }
            _ = tokio::signal::ctrl_c() => {
                console.execute(Command::Exit).await?;
                return Ok(());
            }
        }
    }
}
