//! Launch error taxonomy

use thiserror::Error;

use super::TokenStoreError;

/// Message reported when no bearer token is stored
pub const MISSING_TOKEN_MESSAGE: &str = "Authentication token not found. Please log in.";

/// Errors that can occur while launching or querying a command execution
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No credential in the token store; nothing was sent
    #[error("{}", MISSING_TOKEN_MESSAGE)]
    MissingToken,

    /// Network failure before a response was received
    #[error("{0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        /// `error` field of the server's JSON body, if any
        detail: Option<String>,
    },

    /// Response body was not JSON or had the wrong shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Execution id unknown to the server
    #[error("Execution not found: {0}")]
    NotFound(String),

    #[error("Token store error: {0}")]
    TokenStore(#[from] TokenStoreError),
}

impl LaunchError {
    /// Status error for the execute endpoint
    pub fn status(status: u16, reason: &str, detail: Option<String>) -> Self {
        Self::status_for("execute command", status, reason, detail)
    }

    /// Status error reading `Failed to <action>: <reason>`
    pub fn status_for(action: &str, status: u16, reason: &str, detail: Option<String>) -> Self {
        LaunchError::Status {
            status,
            message: format!("Failed to {}: {}", action, reason),
            detail,
        }
    }
}
