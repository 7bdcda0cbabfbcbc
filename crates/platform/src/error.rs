//! Error types for eapike

use std::fmt;

/// Unified error type for all eapike operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EapikeError {
    /// Configuration error
    Config(String),

    /// Protocol error (malformed or unexpected message)
    Protocol(String),

    /// Security error (authentication, integrity, identity)
    Security(String),
}

impl fmt::Display for EapikeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EapikeError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EapikeError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            EapikeError::Security(msg) => write!(f, "Security error: {}", msg),
        }
    }
}

impl std::error::Error for EapikeError {}

/// Result type for eapike operations
pub type EapikeResult<T> = Result<T, EapikeError>;
