// ABOUTME: Parses operator input lines into console commands.
// ABOUTME: Supports set/show/run selection commands plus direct start/stop/restart/logs.

use std::fmt;
use std::str::FromStr;

/// Lifecycle action applied to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(Action::Start),
            "stop" => Ok(Action::Stop),
            "restart" => Ok(Action::Restart),
            _ => Err("invalid action. use: start, stop, restart".to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
        })
    }
}

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Select the worker for `run`: set bot <name>
    SetBot(String),
    /// Select the action for `run`: set action <action>
    SetAction(Action),
    ShowConfig,
    ShowBots,
    ShowStatus,
    /// Apply the selected action to the selected worker
    Run,
    /// Apply an action directly: start|stop|restart <name>
    Apply(Action, String),
    /// Print captured output: logs <name>
    Logs(String),
    Clear,
    Help,
    Exit,
    /// Blank line
    Empty,
    /// Unrecognised or malformed input, with the message to show
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Command::Empty;
        };
        let args: Vec<&str> = parts.collect();

        match keyword.to_ascii_lowercase().as_str() {
            "set" => Self::parse_set(&args),
            "show" => match args.first().map(|a| a.to_ascii_lowercase()).as_deref() {
                None | Some("config") => Command::ShowConfig,
                Some("bots") => Command::ShowBots,
                Some("status") => Command::ShowStatus,
                Some(_) => {
                    Command::Invalid("usage: show config | show bots | show status".to_string())
                }
            },
            "status" => Command::ShowStatus,
            "run" => Command::Run,
            word @ ("start" | "stop" | "restart") => match args.first() {
                Some(name) => match word.parse() {
                    Ok(action) => Command::Apply(action, name.to_string()),
                    Err(message) => Command::Invalid(message),
                },
                None => Command::Invalid(format!("usage: {word} <bot_name>")),
            },
            "logs" => match args.first() {
                Some(name) => Command::Logs(name.to_string()),
                None => Command::Invalid("usage: logs <bot_name>".to_string()),
            },
            "clear" => Command::Clear,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            _ => Command::Invalid("unknown command. use 'help' for available commands.".to_string()),
        }
    }

    fn parse_set(args: &[&str]) -> Command {
        let [param, value, ..] = args else {
            return Command::Invalid("usage: set <parameter> <value>".to_string());
        };
        match param.to_ascii_lowercase().as_str() {
            "bot" => Command::SetBot(value.to_string()),
            "action" => match value.parse() {
                Ok(action) => Command::SetAction(action),
                Err(message) => Command::Invalid(message),
            },
            _ => Command::Invalid("unknown parameter. use 'help' for commands.".to_string()),
        }
    }
}

pub const HELP: &str = "\
available commands:
  set bot <bot_name>       - select the bot to manage
  set action <action>      - set the action: start, stop, restart
  show config              - show current configuration
  show bots                - show available bots
  show status              - show bot status
  run                      - execute the action on the selected bot
  start|stop|restart <bot> - apply an action directly
  logs <bot>               - show captured output of a bot
  clear                    - clear the screen
  help                     - show this menu
  exit                     - stop all bots and exit";
