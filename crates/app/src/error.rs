//! Dispatch error types.
//!
//! Every failure of `open` / `read` / `write` surfaces as a
//! [`DispatchError`]. None of them leave a partially applied write behind.

use smarthome_domain::error::InvalidCommand;

/// No device with the requested identity exists in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no device named {identity:?}")]
pub struct NotFoundError {
    pub identity: String,
}

/// The caller's buffer could not be read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("payload transfer across the caller boundary failed")]
pub struct TransferFault;

/// Errors surfaced by the dispatch layer.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Unknown device identity at `open`.
    #[error("device not found")]
    NotFound(#[from] NotFoundError),

    /// Write attempted on a read-only device.
    #[error("device {identity} is read-only")]
    PermissionDenied { identity: &'static str },

    /// Malformed write command; the device state is unchanged.
    #[error("invalid command for device {identity}")]
    InvalidArgument {
        identity: &'static str,
        #[source]
        source: InvalidCommand,
    },

    /// The lock wait was interrupted; the device state is unchanged.
    #[error("interrupted while waiting for device {identity}")]
    Interrupted { identity: &'static str },

    /// The payload could not be delivered to the caller.
    #[error("payload transfer failed for device {identity}")]
    IoFault {
        identity: &'static str,
        #[source]
        source: TransferFault,
    },
}

impl DispatchError {
    /// Whether re-issuing the operation (possibly with corrected input) can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::Interrupted { .. } | Self::IoFault { .. }
        )
    }
}
