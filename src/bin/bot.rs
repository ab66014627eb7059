//! Run one pass of the channel bot and exit.
//!
//! Usage: cargo run --bin bot -- [--settings settings.json] [run|followup|crosspost]
//!
//! Meant to be triggered by cron or a similar scheduler; there is no
//! internal loop.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use gradbot::{config::Settings, Engine};

#[derive(Parser, Debug)]
#[command(name = "bot", version, about = "Post freshly graduated tokens to a Telegram channel")]
struct Cli {
    /// Read configuration from a JSON file instead of the environment.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Post at most one new token, then check milestones.
    #[default]
    Run,
    /// Only check posted tokens for new multiples.
    Followup,
    /// Announce the best stored token to the cross-post webhook.
    Crosspost,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load_from_file(path)?,
        None => Settings::from_env()?,
    };
    info!("⚙️ [INIT] {:?}", settings);

    let engine = Engine::from_settings(&settings)?;
    let summary = match cli.command.unwrap_or_default() {
        Command::Run => engine.run_once().await?,
        Command::Followup => engine.run_followup_check().await?,
        Command::Crosspost => engine.run_crosspost().await?,
    };

    info!("🏁 [RUN] Finished: {:?}", summary);
    Ok(())
}
