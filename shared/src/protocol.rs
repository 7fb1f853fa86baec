use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invitation record as returned by the platform invitation API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRecord {
    pub id: Uuid,
    pub workout_id: String,
    /// Denormalized workout snapshot, when the API includes it
    #[serde(default)]
    pub workout: Option<WorkoutSummaryDto>,
    pub inviter_id: Uuid,
    #[serde(default)]
    pub inviter: Option<UserSummaryDto>,
    pub invitee_id: Uuid,
    #[serde(default)]
    pub invitee: Option<UserSummaryDto>,
    pub status: InvitationStatusDto,
    pub created_at: DateTime<Utc>,
    pub auto_decline_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub notification_sent: bool,
    #[serde(default)]
    pub reminders_sent: u32,
    #[serde(default)]
    pub decline_reason: Option<DeclineReasonDto>,
}

/// Wire form of the closed invitation status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatusDto {
    Pending,
    Accepted,
    Declined,
    AutoDeclined,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReasonDto {
    /// Response window elapsed without a response
    Timeout,
}

/// Denormalized workout snapshot carried on invitation records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSummaryDto {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Denormalized user snapshot carried on invitation records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummaryDto {
    pub id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Body of `POST /invitations`; fans out to one record per invitee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitationsRequest {
    pub workout_id: String,
    pub invitee_ids: Vec<Uuid>,
    #[serde(default)]
    pub message: Option<String>,
    /// Response window override in minutes; server default applies when absent
    #[serde(default)]
    pub auto_decline_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitationsResponse {
    pub invitations: Vec<InvitationRecord>,
}

/// Body of `POST /invitations/{id}/respond`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub decision: ResponseDecisionDto,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDecisionDto {
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListInvitationsResponse {
    pub invitations: Vec<InvitationRecord>,
}

/// Body of `POST /notifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub user_ids: Vec<Uuid>,
    pub message: String,
    pub context: NotifyContext,
}

/// What a notification is about, for platform-side routing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NotifyContext {
    InvitationCreated { invitation_id: Uuid },
    InvitationResponded { invitation_id: Uuid, status: InvitationStatusDto },
    InvitationAutoDeclined { invitation_id: Uuid },
}

/// Error body the invitation API returns on failed requests.
/// Conflict responses (409) carry the authoritative record so the
/// client can reconcile instead of retrying blindly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default)]
    pub current: Option<InvitationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&InvitationStatusDto::AutoDeclined).unwrap();
        assert_eq!(json, "\"auto_declined\"");
        let back: InvitationStatusDto = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, InvitationStatusDto::Pending);
    }

    #[test]
    fn notify_context_is_tagged() {
        let ctx = NotifyContext::InvitationAutoDeclined {
            invitation_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["type"], "invitation-auto-declined");
    }

    #[test]
    fn invitation_record_tolerates_missing_optional_fields() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "workout_id": "w1",
            "inviter_id": Uuid::nil(),
            "invitee_id": Uuid::nil(),
            "status": "pending",
            "created_at": "2026-01-01T00:00:00Z",
            "auto_decline_at": "2026-01-01T00:30:00Z",
        });
        let record: InvitationRecord = serde_json::from_value(json).unwrap();
        assert!(record.workout.is_none());
        assert!(record.responded_at.is_none());
        assert_eq!(record.reminders_sent, 0);
    }
}
