// ABOUTME: Command-line arguments for the hoster binary.
// ABOUTME: Flags and HOSTER_* environment variables override values from the config file.

use anyhow::Result;
use clap::Parser;
use hoster_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hoster")]
#[command(about = "Console for launching, monitoring and stopping local bots")]
pub struct Cli {
    /// Path to configuration file (default: ~/.config/hoster/hoster.toml)
    #[arg(long, env = "HOSTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing the bots
    #[arg(long, env = "HOSTER_WORKER_DIR")]
    pub worker_dir: Option<String>,

    /// Bot file extension, empty for none
    #[arg(long, env = "HOSTER_EXTENSION")]
    pub extension: Option<String>,

    /// Program used to run bots, empty to execute them directly
    #[arg(long, env = "HOSTER_INTERPRETER")]
    pub interpreter: Option<String>,

    /// Seconds between exit checks
    #[arg(long, env = "HOSTER_REAP_INTERVAL")]
    pub reap_interval: Option<u64>,

    /// Seconds to wait for a graceful stop before killing, 0 waits forever
    #[arg(long, env = "HOSTER_STOP_GRACE")]
    pub stop_grace: Option<u64>,

    /// Log to stderr instead of the log file
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load the config file (defaults if absent) and apply command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let path = self.config.clone().unwrap_or_else(Config::default_path);
        let config = Config::load_or_default(&path)?;
        Ok(self.apply(config))
    }

    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(dir) = &self.worker_dir {
            config.worker_directory = dir.clone();
        }
        if let Some(extension) = &self.extension {
            config.extension = extension.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = interpreter.clone();
        }
        if let Some(secs) = self.reap_interval {
            config.reap_interval_secs = secs.max(1);
        }
        if let Some(secs) = self.stop_grace {
            config.stop_grace_secs = secs;
        }
        config
    }
}
