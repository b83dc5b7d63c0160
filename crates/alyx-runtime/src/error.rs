//! Runtime error types.

use alyx_framework::{CommandError, PluginError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while launching or running a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A plugin could not be registered or loaded at launch.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// A command handler hit an internal defect.
    #[error("Command dispatch failed: {0}")]
    Dispatch(#[from] CommandError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
