use chrono::{DateTime, Utc};

use crate::domain::entities::{Invitation, InvitationStatus};
use crate::domain::value_objects::{UserId, WorkoutId};

/// Filter for loading invitations from the platform. Also usable locally
/// against the working set; the two must agree on semantics, so the local
/// matcher lives here next to the wire filter.
#[derive(Debug, Clone, Default)]
pub struct InvitationFilter {
    /// Restrict to these statuses; `None` means all.
    pub statuses: Option<Vec<InvitationStatus>>,
    pub workout_id: Option<WorkoutId>,
    /// Counterpart user: matches either the inviter or the invitee.
    pub counterpart: Option<UserId>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl InvitationFilter {
    /// Everything the current user can see.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn pending() -> Self {
        Self {
            statuses: Some(vec![InvitationStatus::Pending]),
            ..Self::default()
        }
    }

    pub fn with_workout(mut self, workout_id: WorkoutId) -> Self {
        self.workout_id = Some(workout_id);
        self
    }

    pub fn with_counterpart(mut self, user_id: UserId) -> Self {
        self.counterpart = Some(user_id);
        self
    }

    pub fn matches(&self, invitation: &Invitation) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&invitation.status) {
                return false;
            }
        }
        if let Some(workout_id) = &self.workout_id {
            if &invitation.workout_id != workout_id {
                return false;
            }
        }
        if let Some(user) = &self.counterpart {
            if &invitation.inviter_id != user && &invitation.invitee_id != user {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if invitation.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if invitation.created_at > before {
                return false;
            }
        }
        true
    }
}
