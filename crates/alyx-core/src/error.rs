//! Gateway error types.

use thiserror::Error;

/// Errors reported by a [`Gateway`](crate::Gateway) implementation.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The connection is closed or was never established.
    #[error("gateway is disconnected")]
    Disconnected,

    /// The referenced entity does not exist or is not visible to the bot.
    #[error("{kind} not found: {id}")]
    NotFound {
        kind: &'static str,
        id: String,
    },

    /// The bot lacks the permission needed for the request.
    #[error("missing permission: {0}")]
    MissingPermission(String),

    /// Any other failure reported by the underlying client.
    #[error("gateway request failed: {0}")]
    Request(String),
}

impl GatewayError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
