//! Error types for the sync layer.

use std::time::Duration;
use thiserror::Error;
use vlesync_store::StoreError;
use vlesync_types::OperationName;

/// Result type for classification.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while classifying an event.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A related row the decision depends on does not exist.
    #[error("{entity} {id} could not be resolved")]
    Unresolved { entity: &'static str, id: i64 },

    /// The directory could not be read.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ClassifyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { table, id } => ClassifyError::Unresolved { entity: table, id },
            other => ClassifyError::Store(other),
        }
    }
}

/// Errors that can occur while delivering an operation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The configured path table has no entry for the operation.
    #[error("no path configured for operation {0}")]
    UnknownOperation(OperationName),

    /// The remote answered with a non-success status.
    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payload error: {0}")]
    Payload(#[from] vlesync_types::Error),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned when handing events to a running dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatcher loop has stopped.
    #[error("dispatcher channel closed")]
    ChannelClosed,

    /// The bounded queue is full.
    #[error("dispatcher queue full")]
    QueueFull,
}
