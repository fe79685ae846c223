//! Common error types for Recap
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Common result type for Recap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Recap services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Quota limit reached for the requesting tier
    ///
    /// The message carries tier-specific upgrade copy shown to the user;
    /// usage and limit feed the HTTP error envelope.
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        message: String,
        current_usage: i64,
        limit: i64,
    },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Claim target is no longer anonymous (claims are single-use)
    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),

    /// Ledger/artifact count mismatch detected
    ///
    /// Fatal for the affected owner: logged to operators, never silently
    /// auto-corrected.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the underlying failure is SQLite lock/busy contention
    /// that a retry with backoff can resolve.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let msg = db_err.to_string();
                msg.contains("database is locked") || msg.contains("database table is locked")
            }
            _ => false,
        }
    }

    /// True when the underlying failure is a UNIQUE constraint violation
    /// (a concurrent request committed the conflicting row first).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
