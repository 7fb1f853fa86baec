use thiserror::Error;

use crate::application::ports::invitation_api::ApiError;
use crate::domain::entities::InvitationStatus;
use crate::domain::value_objects::InvitationId;

/// Errors surfaced by the manager's mutating operations.
///
/// Conflicts never appear here: a remote conflict means the invitation was
/// resolved by a racing party, and the manager reconciles to the server's
/// record instead of failing the caller (see `ApiError::Conflict`).
#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invitation {0} is not in the local working set")]
    NotFound(InvitationId),

    #[error("invitation is no longer pending (status: {status:?})")]
    NotPending { status: InvitationStatus },

    #[error("operation not permitted: {0}")]
    Forbidden(&'static str),

    #[error("a request for this invitation is already in flight")]
    Busy,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ApiError> for InvitationError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(message) => Self::Transport(message),
            ApiError::NotFound => Self::Transport("invitation not found on the platform".to_string()),
            ApiError::Rejected(message) => Self::Validation(message),
            // Callers reconcile conflicts before converting; this arm only
            // runs if one slips through, and reports the server's status.
            ApiError::Conflict { current } => Self::NotPending {
                status: current.status,
            },
        }
    }
}
