// ABOUTME: hoster CLI entry point.
// ABOUTME: Loads configuration, sets up logging and runs the interactive console.

use clap::Parser;
use hoster_cli::{run_console, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.verbose {
        hoster_log::init();
    } else {
        hoster_log::init_file("hoster");
    }

    let config = cli.load_config()?;
    run_console(config).await
}
