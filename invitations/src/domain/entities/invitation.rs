use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::workout::{UserSummary, WorkoutSummary};
use crate::domain::value_objects::{DeclineWindow, InvitationId, InviteMessage, UserId, WorkoutId};

/// Closed status enumeration. `Pending` is the only non-terminal state;
/// every other value is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    AutoDeclined,
    Expired,
    Cancelled,
}

impl InvitationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    /// The response window elapsed without a response.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub workout_id: WorkoutId,
    pub workout: Option<WorkoutSummary>,
    pub inviter_id: UserId,
    pub inviter: Option<UserSummary>,
    pub invitee_id: UserId,
    pub invitee: Option<UserSummary>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    /// Absolute deadline; fixed at creation as `created_at + window`.
    pub auto_decline_at: DateTime<Utc>,
    /// Set the first time the status leaves `Pending`; immutable afterwards.
    pub responded_at: Option<DateTime<Utc>>,
    pub message: Option<InviteMessage>,
    pub notification_sent: bool,
    pub reminders_sent: u32,
    pub decline_reason: Option<DeclineReason>,
}

impl Invitation {
    pub fn new(
        workout_id: WorkoutId,
        inviter_id: UserId,
        invitee_id: UserId,
        message: Option<InviteMessage>,
        window: DeclineWindow,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: InvitationId::new(),
            workout_id,
            workout: None,
            inviter_id,
            inviter: None,
            invitee_id,
            invitee: None,
            status: InvitationStatus::Pending,
            created_at,
            auto_decline_at: created_at + window.duration(),
            responded_at: None,
            message,
            notification_sent: false,
            reminders_sent: 0,
            decline_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.auto_decline_at <= now
    }

    /// Time left before auto-decline, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.auto_decline_at - now).max(Duration::zero())
    }

    /// Apply a terminal transition. Terminal states are absorbing: once the
    /// status has left `Pending` the invitation never changes again, so a
    /// second resolution is ignored and reported as `false`.
    pub fn resolve(
        &mut self,
        status: InvitationStatus,
        responded_at: DateTime<Utc>,
        reason: Option<DeclineReason>,
    ) -> bool {
        if self.is_terminal() {
            return false;
        }
        if !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.responded_at = Some(responded_at);
        self.decline_reason = reason;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pending() -> Invitation {
        Invitation::new(
            WorkoutId::new("w1".to_string()).unwrap(),
            UserId::new(),
            UserId::new(),
            None,
            DeclineWindow::default(),
        )
    }

    #[test]
    fn new_invitation_is_pending_with_future_deadline() {
        let inv = pending();
        assert!(inv.is_pending());
        assert!(!inv.deadline_elapsed(Utc::now()));
        assert_eq!(inv.auto_decline_at, inv.created_at + Duration::minutes(30));
    }

    #[test]
    fn resolve_is_monotonic() {
        let mut inv = pending();
        let now = Utc::now();
        assert!(inv.resolve(InvitationStatus::Accepted, now, None));
        let responded = inv.responded_at;

        // Second transition must be a no-op in every field.
        assert!(!inv.resolve(InvitationStatus::AutoDeclined, now + Duration::minutes(1), Some(DeclineReason::Timeout)));
        assert_eq!(inv.status, InvitationStatus::Accepted);
        assert_eq!(inv.responded_at, responded);
        assert!(inv.decline_reason.is_none());
    }

    #[test]
    fn resolve_rejects_non_terminal_target() {
        let mut inv = pending();
        assert!(!inv.resolve(InvitationStatus::Pending, Utc::now(), None));
        assert!(inv.is_pending());
    }

    #[test]
    fn remaining_clamps_at_zero_after_deadline() {
        let inv = pending();
        let late = inv.auto_decline_at + Duration::minutes(10);
        assert_eq!(inv.remaining(late), Duration::zero());
        assert!(inv.deadline_elapsed(late));
    }

    proptest! {
        #[test]
        fn deadline_is_creation_plus_window(minutes in 1i64..=7 * 24 * 60) {
            let window = DeclineWindow::from_minutes(minutes).unwrap();
            let inv = Invitation::new(
                WorkoutId::new("w1".to_string()).unwrap(),
                UserId::new(),
                UserId::new(),
                None,
                window,
            );
            prop_assert_eq!(inv.auto_decline_at - inv.created_at, Duration::minutes(minutes));
        }
    }
}
