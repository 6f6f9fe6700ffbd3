//! Domain error types.

/// A write payload that is not one of the accepted switch tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid switch command {payload:?}")]
pub struct InvalidCommand {
    /// The rejected payload, lossily decoded for diagnostics.
    pub payload: String,
}

impl InvalidCommand {
    pub(crate) fn from_bytes(raw: &[u8]) -> Self {
        Self {
            payload: String::from_utf8_lossy(raw).into_owned(),
        }
    }
}
