use async_trait::async_trait;

use crate::domain::entities::InvitationStatus;
use crate::domain::value_objects::{InvitationId, UserId};

/// What a notification is about; adapters map this onto the platform's
/// notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyContext {
    Created { invitation: InvitationId },
    Responded { invitation: InvitationId, status: InvitationStatus },
    AutoDeclined { invitation: InvitationId },
}

/// Driven port for user-facing platform notifications. Strictly
/// best-effort: a `false` return means the notification was dropped, and
/// callers never fail their primary operation over it.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, user_ids: &[UserId], message: &str, context: NotifyContext) -> bool;
}
