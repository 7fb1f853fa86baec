use async_trait::async_trait;
use thiserror::Error;

use crate::application::filter::InvitationFilter;
use crate::domain::entities::Invitation;
use crate::domain::value_objects::{DeclineWindow, InvitationId, InviteMessage, UserId, WorkoutId};

/// Failure modes of the remote invitation service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invitation not found")]
    NotFound,

    /// The invitation is no longer pending on the server. Carries the
    /// authoritative record so the caller can reconcile local state
    /// instead of treating the race as a failure.
    #[error("invitation already resolved as {:?}", current.status)]
    Conflict { current: Invitation },

    #[error("request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDecision {
    Accepted,
    Declined,
}

/// One create request fanning out to one invitation per invitee.
#[derive(Debug, Clone)]
pub struct CreateInvitations {
    pub workout_id: WorkoutId,
    pub invitee_ids: Vec<UserId>,
    pub message: Option<InviteMessage>,
    pub window: DeclineWindow,
}

/// Driven port for the platform's invitation service, the source of truth
/// for every status transition.
#[async_trait]
pub trait InvitationApi: Send + Sync {
    async fn list(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, ApiError>;

    /// Atomic from the client's point of view: either every requested
    /// invitation is created and returned, or none are.
    async fn create(&self, request: CreateInvitations) -> Result<Vec<Invitation>, ApiError>;

    /// Fails with [`ApiError::Conflict`] when the invitation is no longer
    /// pending, returning the current authoritative record.
    async fn respond(
        &self,
        id: InvitationId,
        decision: ResponseDecision,
        message: Option<InviteMessage>,
    ) -> Result<Invitation, ApiError>;

    async fn cancel(&self, id: InvitationId) -> Result<(), ApiError>;

    /// Idempotent server-side: repeat calls after the first terminal
    /// transition return the already-terminal record without error.
    async fn auto_decline(&self, id: InvitationId) -> Result<Invitation, ApiError>;
}
