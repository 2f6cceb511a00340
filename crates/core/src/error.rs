//! Bus error model.

use thiserror::Error;

use crate::id::ServerId;

/// Result type used across the bus crates.
pub type BusResult<T> = Result<T, BusError>;

/// Bus-level error.
///
/// Only the *act* of creating, registering, removing or sending is reported
/// through this type. Eventual delivery outcome is never surfaced to a sender.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A resource could not be created (e.g. the transport thread failed to spawn).
    #[error("allocation failed: {0}")]
    AllocationFailure(String),

    /// A server with the same id is already registered.
    #[error("server {0} is already registered")]
    DuplicateRegistration(ServerId),

    /// No registered server matches the destination id.
    ///
    /// Only produced inside dispatch; senders never observe it.
    #[error("no server registered for {0}")]
    ServerNotFound(ServerId),

    /// A handle or argument was not valid for the requested operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl BusError {
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::AllocationFailure(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Short stable label for log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::AllocationFailure(_) => "allocation_failure",
            BusError::DuplicateRegistration(_) => "duplicate_registration",
            BusError::ServerNotFound(_) => "server_not_found",
            BusError::InvalidArgument(_) => "invalid_argument",
        }
    }
}
