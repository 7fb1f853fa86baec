use crate::domain::entities::Invitation;
use crate::domain::value_objects::InvitationId;

/// Events the manager broadcasts after each mutation so the presentation
/// layer can refresh without polling. Delivery is lossy for slow
/// subscribers (broadcast semantics); a fresh snapshot is always available
/// from the manager's read accessors.
#[derive(Debug, Clone)]
pub enum InvitationEvent {
    /// The working set was replaced by a load from the platform.
    Loaded { count: usize },
    Created { invitation: Invitation },
    Accepted { invitation: Invitation },
    Declined { invitation: Invitation },
    AutoDeclined { invitation: Invitation },
    /// Removed from the working set by the inviter.
    Cancelled { id: InvitationId },
    /// A locally intended transition lost a race; the server's
    /// authoritative record was adopted instead.
    Reconciled { invitation: Invitation },
    /// The deadline is close (reminder lead reached) and the invitation is
    /// still pending.
    ReminderDue { id: InvitationId, remaining_secs: i64 },
}
