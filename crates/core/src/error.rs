//! Error types for the innkeep domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all innkeep operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input errors (caller can fix and retry) ---
    #[error("Reservation {0} not found")]
    ReservationNotFound(i64),

    #[error("Reservation {0} has no messages to reply to")]
    EmptyConversation(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the request itself (unknown reservation,
    /// nothing to reply to). These are reported to the caller and never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ReservationNotFound(_) | Error::EmptyConversation(_) | Error::InvalidInput(_)
        )
    }

    /// HTTP-equivalent status for surfacing the error at an API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ReservationNotFound(_) => 404,
            Error::EmptyConversation(_) | Error::InvalidInput(_) => 400,
            Error::Provider(_) | Error::Channel(_) => 502,
            _ => 500,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
