//! Console Bot Demo
//!
//! Runs an Alyx bot whose "chat service" is the terminal: each line typed is
//! a message, and replies are printed back.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot -- --prefix '?'
//! ```
//!
//! Then try `?ping`, `?add 2 3`, `?count`, `?plugins list`,
//! `?plugins unload Counter` or `?shutdown` (answer with `y`).
//! Ctrl+D or Ctrl+C also shut the bot down.

mod gateway;
mod plugins;

use std::path::PathBuf;
use std::sync::Arc;

use alyx::runtime::{AlyxBot, ConfigLoader, JsonFileStore, logging};
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use crate::gateway::ConsoleGateway;

#[derive(Debug, Parser)]
#[command(name = "console-bot", about = "Run an Alyx bot over stdin/stdout")]
struct Args {
    /// Configuration file (otherwise alyx.toml is searched for)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command prefix
    #[arg(short, long)]
    prefix: Option<String>,

    /// Where plugin data is saved
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(prefix) = &args.prefix {
        loader = loader.set("bot.command_prefix", prefix);
    }
    if let Some(dir) = &args.data_dir {
        loader = loader.set("bot.data_dir", dir);
    }
    let config = loader.load()?;
    logging::init_from_config(&config.logging);

    let gateway = Arc::new(ConsoleGateway::new());
    let events = gateway.spawn_reader();
    let store = Arc::new(JsonFileStore::new(&config.bot.data_dir));
    let prefix = config.bot.command_prefix.clone();

    let bot = AlyxBot::launch(config, gateway, store, plugins::demo_plugins()).await?;
    println!("Type {prefix}ping, {prefix}add 2 3, {prefix}count or {prefix}shutdown");

    match bot.run(events).await {
        Some(summary) if !summary.is_clean() => {
            warn!(failed = summary.plugins.failed.len(), "Shutdown finished with failures");
        }
        _ => info!("Goodbye"),
    }
    Ok(())
}
