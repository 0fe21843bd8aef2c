// toolgate-core/src/error.rs
// ============================================================================
// Module: Gateway Errors
// Description: Error taxonomy shared by every gateway component.
// Purpose: Provide machine-readable error kinds with redacted messages.
// Dependencies: thiserror, tonic
// ============================================================================

//! ## Overview
//! Every fallible gateway operation returns [`GatewayError`]. Each variant
//! maps to a stable [`ErrorKind`] label that the enclosing JSON-RPC layer
//! attaches to error payloads. Messages never include backend addresses,
//! payload contents, or transport internals.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tonic::Code;
use tonic::Status;

/// Result alias used throughout the gateway core.
pub type Result<T> = std::result::Result<T, GatewayError>;

// ============================================================================
// SECTION: Error Taxonomy
// ============================================================================

/// Errors produced by the gateway core.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Operation requires a live channel that is absent.
    #[error("not connected to backend")]
    NotConnected,
    /// Tool identifier or symbol is unknown.
    #[error("not found: {0}")]
    NotFound(String),
    /// Streaming method requested or unknown field kind encountered.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Malformed input JSON or tool identifier.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Channel open, keep-alive, or RPC failed.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Descriptor-set blob failed to parse or register.
    #[error("descriptor corrupt: {0}")]
    DescriptorCorrupt(String),
    /// Operation exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Caller cancelled the operation.
    #[error("cancelled")]
    Cancelled,
    /// Invariant violation inside the gateway.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable labels for [`GatewayError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No live channel.
    NotConnected,
    /// Unknown tool or symbol.
    NotFound,
    /// Streaming or unknown field kind.
    Unsupported,
    /// Malformed caller input.
    InvalidArgument,
    /// Transport-level failure.
    Transport,
    /// Descriptor parse or registration failure.
    DescriptorCorrupt,
    /// Deadline exceeded.
    Timeout,
    /// Caller cancelled.
    Cancelled,
    /// Invariant violation.
    Internal,
}

impl ErrorKind {
    /// Returns the stable label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::InvalidArgument => "invalid_argument",
            Self::Transport => "transport_failure",
            Self::DescriptorCorrupt => "descriptor_corrupt",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl GatewayError {
    /// Returns the machine-readable kind for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected => ErrorKind::NotConnected,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Transport(_) => ErrorKind::Transport,
            Self::DescriptorCorrupt(_) => ErrorKind::DescriptorCorrupt,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns whether a retry against the same backend may succeed.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self {
        // Status messages may carry backend internals; keep only the code.
        let code = status.code();
        match code {
            Code::DeadlineExceeded => Self::Timeout("backend call deadline exceeded".to_string()),
            Code::Cancelled => Self::Cancelled,
            Code::NotFound => Self::NotFound("backend reported missing resource".to_string()),
            Code::InvalidArgument => {
                Self::InvalidArgument("backend rejected call arguments".to_string())
            }
            Code::Unimplemented => Self::Unsupported("method not implemented by backend".to_string()),
            _ => Self::Transport(format!("backend call failed with status {code:?}")),
        }
    }
}
