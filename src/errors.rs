//! Unified error types and result handling.
//!
//! Persistence failures are mostly swallowed by the retry layer in
//! [`crate::core::store`], so the variants here are what escapes to command
//! handlers, the engine's per-item loops and start-up code.

use thiserror::Error;

/// Errors produced anywhere in the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Raw database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A persistence call gave up after its retries
    #[error("Persistence failed: {operation}")]
    Persistence {
        /// Logical operation that failed, e.g. `create(event)`
        operation: String,
    },

    /// A record that should exist was not found
    #[error("{entity} {id} not found")]
    NotFound {
        /// Logical model name
        entity: &'static str,
        /// Primary key that was looked up
        id: i64,
    },

    /// User supplied input that failed validation
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Human readable explanation
        message: String,
    },

    /// The messaging collaborator failed to deliver or look something up
    #[error("Messenger error: {message}")]
    Messenger {
        /// Underlying transport message
        message: String,
    },

    /// The AI collaborator failed or is disabled
    #[error("AI error: {message}")]
    Ai {
        /// Underlying client message
        message: String,
    },

    /// A notification job ran past its deadline and was abandoned
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Environment variable missing or malformed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// I/O failure while reading configuration files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Formatting into a `String` failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Persistence`].
    pub fn persistence(operation: impl Into<String>) -> Self {
        Self::Persistence {
            operation: operation.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
