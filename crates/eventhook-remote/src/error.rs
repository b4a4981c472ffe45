//! Error types for remote session operations.

use std::error::Error as StdError;

use thiserror::Error;

/// Errors raised while queuing or committing remote commands.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The round trip itself failed (connection, timeout, TLS).
    #[error("Remote transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success HTTP status.
    #[error("Remote returned status {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, as text.
        body: String,
    },

    /// The remote refused one of the queued commands; the batch was not applied.
    #[error("Remote rejected command #{index}: {message}")]
    Rejected {
        /// Position of the refused command within the batch.
        index: usize,
        /// Platform diagnostic.
        message: String,
    },

    /// The remote reply could not be decoded.
    #[error("Failed to decode remote reply: {0}")]
    Decode(String),

    /// A referenced remote object does not exist.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Object kind, e.g. "Collection".
        kind: &'static str,
        /// Lookup key.
        key: String,
    },

    /// A reply was missing or of the wrong kind for its ticket.
    #[error("Reply does not match queued command: {0}")]
    ReplyMismatch(String),

    /// The site address handed to the session factory is unusable.
    #[error("Invalid remote address: {0}")]
    InvalidAddress(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RemoteError {
    pub fn rejected(index: usize, message: impl Into<String>) -> Self {
        Self::Rejected {
            index,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }
}

/// Renders an error with every cause in its `source()` chain.
///
/// Causes whose text is already contained in the message are skipped.
pub(crate) fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
