//! Alyx Runtime - orchestration layer for the Alyx bot framework.
//!
//! This crate provides:
//! - Layered configuration with figment ([`config`])
//! - `tracing-subscriber` setup driven by that configuration ([`logging`])
//! - A JSON file store for plugin data ([`JsonFileStore`])
//! - [`AlyxBot`]: plugin bootstrap, the event ingress loop and the ordered
//!   shutdown sequence
//!
//! ```ignore
//! use alyx_runtime::{AlyxBot, ConfigLoader, JsonFileStore, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let (gateway, events) = connect().await?;
//!     let store = Arc::new(JsonFileStore::new(&config.bot.data_dir));
//!     let bot = AlyxBot::launch(config, gateway, store, my_plugins()).await?;
//!
//!     // Runs until a plugin requests shutdown, Ctrl+C, or the stream ends
//!     bot.run(events).await;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;

// Re-exports
pub use bot::{AlyxBot, ShutdownSummary};
pub use config::{AlyxConfig, BotConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use store::JsonFileStore;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
