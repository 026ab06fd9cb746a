//! Error taxonomy for the panel interaction layer
//!
//! Transport errors are absorbed by the retry channel, wallet errors are
//! logged at the point of occurrence, and refresh errors park the coordinator
//! in its `Failed` stage. Nothing here is shown to the end user.

use thiserror::Error;

/// Result alias used throughout the crate
pub type PanelResult<T> = Result<T, PanelError>;

/// Errors raised by the channel, refresh coordinator and wallet initiator
#[derive(Debug, Clone, Error)]
pub enum PanelError {
    /// Transport-level errors (connection refused, DNS, reset)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// Request exceeded the configured timeout
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// Wallet provider rejected or failed a call
    #[error("Wallet error during {operation}: {message}")]
    Wallet { operation: String, message: String },

    /// Recipient address missing or malformed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Amount text could not be converted
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PanelError {
    /// Check if this error is worth resubmitting
    pub fn is_retryable(&self) -> bool {
        match self {
            PanelError::Transport { .. } => true,
            PanelError::Timeout { .. } => true,
            // Any non-success answer counts as a failed submission
            PanelError::Status { .. } => true,

            PanelError::Wallet { .. } => false,
            PanelError::InvalidAddress(_) => false,
            PanelError::InvalidAmount(_) => false,
            PanelError::Configuration(_) => false,
            PanelError::Internal(_) => false,
        }
    }

    /// Build a transport error from a reqwest failure
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return PanelError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            };
        }
        PanelError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }

    /// Wrap a wallet provider failure
    pub fn wallet(operation: &str, message: impl Into<String>) -> Self {
        PanelError::Wallet {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}
