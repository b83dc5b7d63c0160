//! Error types for the Alyx framework.
//!
//! Errors are split by who needs to see them:
//!
//! | Error | Raised by | Surfaced to |
//! |-------|-----------|-------------|
//! | [`PluginError`] | plugin lifecycle, command construction | the operator who asked for the transition |
//! | [`CommandParseError`] | a parameter parser | the invoking user |
//! | [`CommandError`] | a command invocation | user or log, see [`CommandError::is_user_facing`] |
//! | [`StoreError`] | a [`PluginStore`](crate::plugin::PluginStore) | the plugin |
//! | [`WaiterError`] | the [`EventWaiter`](crate::waiter::EventWaiter) | the caller of `wait_for` |

use alyx_core::GatewayError;
use thiserror::Error;

/// Boxed error returned by plugin lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// PluginError
// ============================================================================

/// Errors raised by plugin lifecycle transitions and command construction.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin with the same identifier is already registered.
    #[error("A matching plugin already exists: {0}")]
    DuplicatePlugin(String),

    /// The plugin was never registered.
    #[error("Plugin '{0}' is not registered")]
    NotRegistered(String),

    /// The plugin is not currently loaded.
    #[error("Plugin '{0}' is not registered or loaded")]
    NotLoaded(String),

    /// The plugin is already loaded.
    #[error("Plugin '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// The plugin is guarded and the caller did not override the guard.
    #[error("Plugin '{0}' is guarded and cannot be unloaded")]
    GuardedPlugin(String),

    /// A handler parameter has a type with no registered parser.
    #[error("Command '{command}' has no parameter parser for type '{type_name}'")]
    UnresolvedParameterParser {
        command: String,
        type_name: &'static str,
    },

    /// The same command is declared twice by one plugin.
    #[error("Plugin '{plugin}' declares command '{command}' more than once")]
    DuplicateCommand { plugin: String, command: String },

    /// A declaration is structurally invalid (e.g. a blank name).
    #[error("Invalid command declaration: {0}")]
    InvalidDeclaration(String),

    /// A lifecycle hook returned an error; the transition was rolled back.
    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    HookFailed {
        plugin: String,
        hook: &'static str,
        #[source]
        source: BoxError,
    },
}

impl PluginError {
    pub(crate) fn hook_failed(plugin: impl Into<String>, hook: &'static str, source: BoxError) -> Self {
        Self::HookFailed {
            plugin: plugin.into(),
            hook,
            source,
        }
    }
}

/// Result type for plugin lifecycle operations.
pub type PluginResult<T> = Result<T, PluginError>;

// ============================================================================
// CommandParseError
// ============================================================================

/// A single parameter token could not be coerced into its target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unable to parse value '{value}' into type '{expected}'")]
pub struct CommandParseError {
    /// The offending token.
    pub value: String,
    /// Name of the type the token was meant to become.
    pub expected: &'static str,
}

impl CommandParseError {
    pub fn new(value: impl Into<String>, expected: &'static str) -> Self {
        Self {
            value: value.into(),
            expected,
        }
    }
}

// ============================================================================
// CommandError
// ============================================================================

/// Errors produced while invoking a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A parameter failed to parse. Shown to the invoking user.
    #[error(transparent)]
    Parse(#[from] CommandParseError),

    /// A lifecycle operation requested by the command failed. Shown to the
    /// invoking user.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// The handler refused the request with a message for the user.
    #[error("{0}")]
    Rejected(String),

    /// The gateway failed while the command was talking to it. Logged.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A defect: argument/handler mismatch, broken invariant. Propagated.
    #[error("Internal command error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Creates an error whose message is shown to the invoking user.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the dispatcher should reply with this error instead of
    /// logging or propagating it.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Plugin(_) | Self::Rejected(_))
    }
}

/// Result type for command handlers.
pub type CommandResult<T = ()> = Result<T, CommandError>;

// ============================================================================
// StoreError / WaiterError
// ============================================================================

/// Errors raised by a plugin store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plugin data could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors raised by the event waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaiterError {
    /// `wait_for` was called after shutdown began.
    #[error("Event waiter is shut down")]
    ShutDown,
}

impl From<WaiterError> for CommandError {
    fn from(err: WaiterError) -> Self {
        Self::Internal(err.to_string())
    }
}
