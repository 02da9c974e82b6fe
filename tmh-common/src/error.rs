//! Error taxonomy for session control operations.

use crate::types::Role;
use thiserror::Error;

/// Failure raised by a session start or stop operation.
///
/// Every variant carries the name of the originating operation so the
/// failure surfaces to the caller as an explicit failed-operation signal.
/// Per-line parse misses in the scanner are deliberately not represented
/// here; only the absence of a sample is observable.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A request field failed validation on entry.
    #[error("{op}: invalid request: {reason}")]
    Validation { op: &'static str, reason: String },

    /// The measurement process could not be spawned (missing executable,
    /// permission, argument rejection).
    #[error("{op}: failed to launch measurement process: {source}")]
    Launch {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A session for this role is already active. The caller must stop it
    /// before starting a new one.
    #[error("{op}: a {role} session is already active; stop it first")]
    Conflict { op: &'static str, role: Role },
}

impl ControlError {
    /// Name of the operation that raised this error.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Validation { op, .. } | Self::Launch { op, .. } | Self::Conflict { op, .. } => op,
        }
    }
}
