use eventhook_remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Remote operation failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("No remote session available for {event} event")]
    NoSession { event: String },

    #[error("Cannot derive subscription endpoint from the inbound request")]
    MissingEndpoint,
}
