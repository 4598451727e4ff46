use crate::multipart::SubResponse;
use azure_data_core::error::ServiceError;
use thiserror::Error;

/// Errors surfaced by the table client.
///
/// A transaction fails as a whole: the service applies the change set
/// atomically, so there is never a partial per-operation result. Failure
/// kinds that stem from the change set carry the full ordered sub-response
/// list so callers can map failures back to the operations they submitted,
/// by position — see [`TableError::sub_responses`].
#[derive(Error, Debug)]
pub enum TableError {
    /// The transaction was malformed before anything reached the wire.
    #[error("invalid transaction: {0}")]
    Validation(String),

    /// The service rejected the request's authorization (HTTP 403).
    #[error("the service failed to authenticate the request")]
    Authentication,

    /// The table or an addressed entity does not exist (HTTP 404 at either
    /// level; the inner level takes priority once the outer request was
    /// accepted).
    #[error("the resource could not be found")]
    NotFound { parts: Vec<SubResponse> },

    /// The request payload exceeded the service limit (HTTP 413).
    #[error("the request payload was too large")]
    PayloadTooLarge { parts: Vec<SubResponse> },

    /// The batch failed for a reason without a more specific kind.
    #[error("the batch operation failed with status {status}: {message}")]
    BatchFailure {
        status: u16,
        message: String,
        parts: Vec<SubResponse>,
    },

    /// The multipart response body could not be decoded.
    #[error("could not decode the batch response: {0}")]
    InvalidResponse(String),

    /// A transport, endpoint, or configuration error from the core client.
    #[error(transparent)]
    Core(#[from] ServiceError),
}

/// Result type alias for table operations.
pub type TableResult<T> = std::result::Result<T, TableError>;

impl TableError {
    /// The ordered sub-responses attached to a change-set failure.
    ///
    /// Empty when the failure happened before the change set was decoded
    /// (outer-level status failures, validation, transport errors).
    pub fn sub_responses(&self) -> &[SubResponse] {
        match self {
            Self::NotFound { parts }
            | Self::PayloadTooLarge { parts }
            | Self::BatchFailure { parts, .. } => parts,
            _ => &[],
        }
    }
}
