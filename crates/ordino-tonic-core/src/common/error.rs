//! Error types for the sequence allocation service.
//!
//! The central `Error` enum captures the reportable failure cases of the
//! allocation path and implements `From<Error>` for `tonic::Status` so
//! failures propagate to clients with appropriate status codes.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the sequence allocation service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// Internal channel send/receive failure (e.g., closed or full channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The store or lock coordinator failed inside an allocation.
    #[error("Allocation error: {0}")]
    Allocation(#[from] ordino::AllocateError),

    /// The client aborted the request.
    #[error("Request cancelled by client")]
    RequestCancelled,

    /// The client request was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {}", context))
            }
            Error::Allocation(e) => Status::unavailable(format!("Allocation error: {}", e)),
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
