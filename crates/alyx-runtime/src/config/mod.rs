//! Configuration for an Alyx bot.
//!
//! Sources are layered with figment (lowest to highest priority):
//!
//! | Layer | Source |
//! |-------|--------|
//! | 1 | [`AlyxConfig::default`] |
//! | 2 | `alyx.{profile}.toml`, then `alyx.toml` |
//! | 3 | `ALYX_*` environment variables |
//! | 4 | Programmatic merges ([`ConfigLoader::merge`]) |
//!
//! Loading always finishes with [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    AlyxConfig, BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, ShutdownConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
