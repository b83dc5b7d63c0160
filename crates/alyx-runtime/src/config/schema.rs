//! Configuration schema.
//!
//! Every section implements `Default` and is `#[serde(default)]`, so an
//! empty file (or no file at all) yields a runnable bot.
//!
//! ```toml
//! [bot]
//! name = "alyx"
//! command_prefix = "!"
//! owner_id = 239934148704337930
//! bot_admins = [1234]
//! admin_roles = ["Admin"]
//! mod_roles = ["Moderator"]
//! data_dir = "./data"
//!
//! [shutdown]
//! plugin_timeout_secs = 30
//! waiter_timeout_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! output = "stdout"
//!
//! [logging.filters]
//! alyx_framework = "debug"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use alyx_core::UserId;
use alyx_framework::AccessPolicy;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlyxConfig {
    pub bot: BotConfig,
    pub shutdown: ShutdownConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Identity, command prefix and access control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub name: String,
    pub command_prefix: String,
    /// Falls back to the gateway's application owner when unset.
    pub owner_id: Option<UserId>,
    pub bot_admins: Vec<UserId>,
    /// Role names granting the `ADMIN` level.
    pub admin_roles: Vec<String>,
    /// Role names granting the `MOD` level.
    pub mod_roles: Vec<String>,
    /// Root directory for persisted plugin data.
    pub data_dir: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "alyx".into(),
            command_prefix: "!".into(),
            owner_id: None,
            bot_admins: Vec::new(),
            admin_roles: Vec::new(),
            mod_roles: Vec::new(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl BotConfig {
    /// Builds the policy the dispatcher uses to compute permission levels.
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            owner: self.owner_id,
            bot_admins: self.bot_admins.iter().copied().collect(),
            admin_roles: self.admin_roles.clone(),
            mod_roles: self.mod_roles.clone(),
        }
    }
}

// =============================================================================
// Shutdown
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Bound on each plugin's `on_shutdown` hook.
    pub plugin_timeout_secs: u64,
    /// Bound on draining pending event waits.
    pub waiter_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            plugin_timeout_secs: 30,
            waiter_timeout_secs: 60,
        }
    }
}

impl ShutdownConfig {
    pub fn plugin_timeout(&self) -> Duration {
        Duration::from_secs(self.plugin_timeout_secs)
    }

    pub fn waiter_timeout(&self) -> Duration {
        Duration::from_secs(self.waiter_timeout_secs)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Settings consumed by [`crate::logging::init_from_config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Required when `output = "file"`.
    pub file_path: Option<PathBuf>,
    pub thread_ids: bool,
    /// Include source file and line number.
    pub file_location: bool,
    pub span_events: SpanEventConfig,
    /// Per-module levels, e.g. `alyx_framework = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}
