// ABOUTME: Interactive console state and rendering on top of the supervisor.
// ABOUTME: Holds the bot/action selection and turns commands into supervisor calls.

use crate::commands::{Action, Command, HELP};
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use hoster_core::{RestartError, StartError, Supervisor, SupervisorEvent, WorkerState, WorkerStatus};
use std::io::{self, Write};

pub const BANNER: &str = r"
  _               _
 | |__   ___  ___| |_ ___ _ __
 | '_ \ / _ \/ __| __/ _ \ '__|
 | | | | (_) \__ \ ||  __/ |
 |_| |_|\___/|___/\__\___|_|
";

/// Whether the console loop should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Console<'a, W: Write> {
    supervisor: &'a Supervisor,
    selected_bot: Option<String>,
    action: Option<Action>,
    out: W,
}

impl<'a, W: Write> Console<'a, W> {
    pub fn new(supervisor: &'a Supervisor, out: W) -> Self {
        Self {
            supervisor,
            selected_bot: None,
            action: None,
            out,
        }
    }

    pub fn selected_bot(&self) -> Option<&str> {
        self.selected_bot.as_deref()
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "hoster> ")?;
        self.out.flush()
    }

    pub fn clear(&mut self) -> io::Result<()> {
        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        writeln!(self.out, "{BANNER}")
    }

    /// Print an unsolicited status-change notice. Returns whether anything was printed.
    pub fn notify(&mut self, event: &SupervisorEvent) -> io::Result<bool> {
        if !event.is_exit() {
            return Ok(false);
        }
        writeln!(self.out, "\n{event}")?;
        Ok(true)
    }

    pub async fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        self.execute(Command::parse(line)).await
    }

    pub async fn execute(&mut self, command: Command) -> io::Result<Flow> {
        match command {
            Command::Empty => {}
            Command::SetBot(name) => {
                writeln!(self.out, "\nselected bot: {name}")?;
                self.selected_bot = Some(name);
            }
            Command::SetAction(action) => {
                writeln!(self.out, "\naction set: {action}")?;
                self.action = Some(action);
            }
            Command::ShowConfig => self.show_config()?,
            Command::ShowBots => self.show_bots()?,
            Command::ShowStatus => self.show_status()?,
            Command::Run => {
                let Some(name) = self.selected_bot.clone() else {
                    writeln!(
                        self.out,
                        "\nerror: you must select a bot with 'set bot <name>'."
                    )?;
                    return Ok(Flow::Continue);
                };
                let Some(action) = self.action else {
                    writeln!(
                        self.out,
                        "\nerror: you must set an action with 'set action <action>'."
                    )?;
                    return Ok(Flow::Continue);
                };
                self.apply(action, &name).await?;
            }
            Command::Apply(action, name) => self.apply(action, &name).await?,
            Command::Logs(name) => self.show_logs(&name)?,
            Command::Clear => self.clear()?,
            Command::Help => writeln!(self.out, "\n{HELP}\n")?,
            Command::Exit => {
                writeln!(self.out, "\nclosing the hoster...")?;
                let stopped = self.supervisor.shutdown().await;
                for name in &stopped {
                    writeln!(self.out, "bot {name} stopped.")?;
                }
                return Ok(Flow::Exit);
            }
            Command::Invalid(message) => writeln!(self.out, "\n{message}")?,
        }
        Ok(Flow::Continue)
    }

    async fn apply(&mut self, action: Action, name: &str) -> io::Result<()> {
        match action {
            Action::Start => match self.supervisor.start(name) {
                Ok(()) => writeln!(self.out, "\nstarted bot: {name}"),
                Err(e) => writeln!(self.out, "\n{}", start_failure(&e)),
            },
            Action::Stop => match self.supervisor.stop(name).await {
                Ok(()) => writeln!(self.out, "\nbot {name} stopped."),
                Err(e) => writeln!(self.out, "\n{e}"),
            },
            Action::Restart => {
                writeln!(self.out, "\nrestarting bot {name}...")?;
                match self.supervisor.restart(name).await {
                    Ok(()) => writeln!(self.out, "started bot: {name}"),
                    Err(RestartError::Start(e)) => writeln!(self.out, "{}", start_failure(&e)),
                    Err(e) => writeln!(self.out, "error: {e}"),
                }
            }
        }
    }

    fn show_config(&mut self) -> io::Result<()> {
        let workers = self.supervisor.workers();
        let settings = self.supervisor.settings();
        writeln!(self.out, "\ncurrent configuration:")?;
        writeln!(self.out, "  bot directory: {}", workers.root().display())?;
        writeln!(
            self.out,
            "  interpreter: {}",
            workers.interpreter().unwrap_or("(run directly)")
        )?;
        writeln!(
            self.out,
            "  extension: {}",
            workers.extension().unwrap_or("(none)")
        )?;
        writeln!(
            self.out,
            "  reap interval: {}s",
            settings.reap_interval.as_secs_f64()
        )?;
        match settings.stop_grace {
            Some(grace) => writeln!(self.out, "  stop grace: {}s", grace.as_secs_f64())?,
            None => writeln!(self.out, "  stop grace: unbounded")?,
        }
        writeln!(
            self.out,
            "  selected bot: {}",
            self.selected_bot.as_deref().unwrap_or("None")
        )?;
        match self.action {
            Some(action) => writeln!(self.out, "  action: {action}")?,
            None => writeln!(self.out, "  action: None")?,
        }
        writeln!(self.out)
    }

    fn show_bots(&mut self) -> io::Result<()> {
        match self.supervisor.workers().list() {
            Ok(names) => {
                writeln!(self.out, "\navailable bots:")?;
                if names.is_empty() {
                    writeln!(self.out, "  no bots found.")?;
                }
                for name in names {
                    writeln!(self.out, "  - {name}")?;
                }
            }
            Err(e) => writeln!(self.out, "\nerror: {e:#}")?,
        }
        writeln!(self.out)
    }

    fn show_status(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nbot status:")?;
        let statuses = self.supervisor.status();
        if statuses.is_empty() {
            writeln!(self.out, "  no bots started.")?;
        }
        for status in &statuses {
            writeln!(self.out, "  - {}", format_status(status))?;
        }
        writeln!(self.out)
    }

    fn show_logs(&mut self, name: &str) -> io::Result<()> {
        let Some(output) = self.supervisor.output(name) else {
            return writeln!(self.out, "\nno output captured for bot {name}.");
        };
        writeln!(self.out, "\nstdout of {name}:")?;
        writeln!(self.out, "{}", or_empty(&output.stdout))?;
        writeln!(self.out, "stderr of {name}:")?;
        writeln!(self.out, "{}", or_empty(&output.stderr))
    }
}

fn start_failure(err: &StartError) -> String {
    match err {
        StartError::SpawnFailed { .. } => err.to_string(),
        _ => format!("error: {err}"),
    }
}

fn or_empty(text: &str) -> &str {
    if text.is_empty() {
        "  (empty)"
    } else {
        text
    }
}

/// One status line, e.g. `weather: running (pid 42, since 12:00:01)`
pub fn format_status(status: &WorkerStatus) -> String {
    let name = &status.name;
    match status.state {
        WorkerState::Running => {
            let mut details = Vec::new();
            if let Some(pid) = status.pid {
                details.push(format!("pid {pid}"));
            }
            if let Some(started_at) = status.started_at {
                let local = started_at.with_timezone(&chrono::Local);
                details.push(format!("since {}", local.format("%H:%M:%S")));
            }
            if details.is_empty() {
                format!("{name}: running")
            } else {
                format!("{name}: running ({})", details.join(", "))
            }
        }
        WorkerState::Errored | WorkerState::FailedToStart | WorkerState::Unknown => {
            match status.error_detail.as_deref() {
                Some(detail) => format!("{name}: {} - {detail}", status.state),
                None => format!("{name}: {}", status.state),
            }
        }
        WorkerState::Stopped => format!("{name}: stopped"),
    }
}
