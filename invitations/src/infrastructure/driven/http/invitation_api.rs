use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use shared::{
    ApiErrorBody, CreateInvitationsRequest, CreateInvitationsResponse, DeclineReasonDto,
    InvitationRecord, InvitationStatusDto, ListInvitationsResponse, RespondRequest,
    ResponseDecisionDto, UserSummaryDto, WorkoutSummaryDto,
};

use crate::application::filter::InvitationFilter;
use crate::application::ports::{ApiError, CreateInvitations, InvitationApi, ResponseDecision};
use crate::config::ManagerConfig;
use crate::domain::entities::{
    DeclineReason, Invitation, InvitationStatus, UserSummary, WorkoutSummary,
};
use crate::domain::value_objects::{InvitationId, InviteMessage, UserId, WorkoutId};
use crate::error::InvitationError;

/// Reqwest-based adapter for the platform's invitation REST API. Wire DTOs
/// from the `shared` crate are mapped to domain types here, once, at the
/// boundary; nothing downstream ever sees a raw record.
pub struct HttpInvitationApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpInvitationApi {
    pub fn new(config: &ManagerConfig) -> Result<Self, InvitationError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| InvitationError::Config(format!("invalid api_base_url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| InvitationError::Config(format!("http client: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("bad endpoint {path}: {e}")))
    }
}

#[async_trait]
impl InvitationApi for HttpInvitationApi {
    async fn list(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, ApiError> {
        let mut url = self.endpoint("invitations")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(statuses) = &filter.statuses {
                let joined = statuses
                    .iter()
                    .map(|s| status_wire_name(*s))
                    .collect::<Vec<_>>()
                    .join(",");
                query.append_pair("statuses", &joined);
            }
            if let Some(workout_id) = &filter.workout_id {
                query.append_pair("workout_id", workout_id.as_str());
            }
            if let Some(user) = &filter.counterpart {
                query.append_pair("user_id", &user.to_string());
            }
            if let Some(after) = filter.created_after {
                query.append_pair("created_after", &after.to_rfc3339());
            }
            if let Some(before) = filter.created_before {
                query.append_pair("created_before", &before.to_rfc3339());
            }
        }
        let response = self.client.get(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: ListInvitationsResponse = response.json().await.map_err(transport)?;
        body.invitations.into_iter().map(record_to_invitation).collect()
    }

    async fn create(&self, request: CreateInvitations) -> Result<Vec<Invitation>, ApiError> {
        let url = self.endpoint("invitations")?;
        let body = CreateInvitationsRequest {
            workout_id: request.workout_id.as_str().to_string(),
            invitee_ids: request.invitee_ids.iter().map(|u| *u.as_uuid()).collect(),
            message: request.message.map(|m| m.as_str().to_string()),
            auto_decline_minutes: Some(request.window.minutes()),
        };
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: CreateInvitationsResponse = response.json().await.map_err(transport)?;
        body.invitations.into_iter().map(record_to_invitation).collect()
    }

    async fn respond(
        &self,
        id: InvitationId,
        decision: ResponseDecision,
        message: Option<InviteMessage>,
    ) -> Result<Invitation, ApiError> {
        let url = self.endpoint(&format!("invitations/{id}/respond"))?;
        let body = RespondRequest {
            decision: match decision {
                ResponseDecision::Accepted => ResponseDecisionDto::Accepted,
                ResponseDecision::Declined => ResponseDecisionDto::Declined,
            },
            message: message.map(|m| m.as_str().to_string()),
        };
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let record: InvitationRecord = response.json().await.map_err(transport)?;
        record_to_invitation(record)
    }

    async fn cancel(&self, id: InvitationId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("invitations/{id}"))?;
        let response = self.client.delete(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn auto_decline(&self, id: InvitationId) -> Result<Invitation, ApiError> {
        let url = self.endpoint(&format!("invitations/{id}/auto-decline"))?;
        let response = self.client.post(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let record: InvitationRecord = response.json().await.map_err(transport)?;
        record_to_invitation(record)
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let body = response.json::<ApiErrorBody>().await.ok();
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::CONFLICT => match body.and_then(|b| b.current) {
            Some(record) => match record_to_invitation(record) {
                Ok(current) => ApiError::Conflict { current },
                Err(err) => err,
            },
            None => ApiError::Transport(
                "conflict response without an authoritative record".to_string(),
            ),
        },
        s if s.is_client_error() => ApiError::Rejected(
            body.map(|b| b.error).unwrap_or_else(|| status.to_string()),
        ),
        _ => ApiError::Transport(format!("unexpected status {status}")),
    }
}

pub(crate) fn record_to_invitation(record: InvitationRecord) -> Result<Invitation, ApiError> {
    let workout_id = WorkoutId::new(record.workout_id)
        .map_err(|e| ApiError::Transport(format!("invalid invitation record: {e}")))?;
    Ok(Invitation {
        id: InvitationId::from_uuid(record.id),
        workout_id,
        workout: record.workout.map(workout_from_dto).transpose()?,
        inviter_id: UserId::from_uuid(record.inviter_id),
        inviter: record.inviter.map(user_from_dto),
        invitee_id: UserId::from_uuid(record.invitee_id),
        invitee: record.invitee.map(user_from_dto),
        status: status_from_dto(record.status),
        created_at: record.created_at,
        auto_decline_at: record.auto_decline_at,
        responded_at: record.responded_at,
        // Empty or oversized server messages are display-only; drop rather
        // than fail the whole record.
        message: record.message.and_then(|m| InviteMessage::new(m).ok()),
        notification_sent: record.notification_sent,
        reminders_sent: record.reminders_sent,
        decline_reason: record.decline_reason.map(|r| match r {
            DeclineReasonDto::Timeout => DeclineReason::Timeout,
        }),
    })
}

fn workout_from_dto(dto: WorkoutSummaryDto) -> Result<WorkoutSummary, ApiError> {
    Ok(WorkoutSummary {
        id: WorkoutId::new(dto.id)
            .map_err(|e| ApiError::Transport(format!("invalid workout snapshot: {e}")))?,
        title: dto.title,
        scheduled_at: dto.scheduled_at,
        location: dto.location,
    })
}

fn user_from_dto(dto: UserSummaryDto) -> UserSummary {
    UserSummary {
        id: UserId::from_uuid(dto.id),
        display_name: dto.display_name,
        avatar_url: dto.avatar_url,
    }
}

fn status_from_dto(status: InvitationStatusDto) -> InvitationStatus {
    match status {
        InvitationStatusDto::Pending => InvitationStatus::Pending,
        InvitationStatusDto::Accepted => InvitationStatus::Accepted,
        InvitationStatusDto::Declined => InvitationStatus::Declined,
        InvitationStatusDto::AutoDeclined => InvitationStatus::AutoDeclined,
        InvitationStatusDto::Expired => InvitationStatus::Expired,
        InvitationStatusDto::Cancelled => InvitationStatus::Cancelled,
    }
}

pub(crate) fn status_to_dto(status: InvitationStatus) -> InvitationStatusDto {
    match status {
        InvitationStatus::Pending => InvitationStatusDto::Pending,
        InvitationStatus::Accepted => InvitationStatusDto::Accepted,
        InvitationStatus::Declined => InvitationStatusDto::Declined,
        InvitationStatus::AutoDeclined => InvitationStatusDto::AutoDeclined,
        InvitationStatus::Expired => InvitationStatusDto::Expired,
        InvitationStatus::Cancelled => InvitationStatusDto::Cancelled,
    }
}

fn status_wire_name(status: InvitationStatus) -> &'static str {
    match status {
        InvitationStatus::Pending => "pending",
        InvitationStatus::Accepted => "accepted",
        InvitationStatus::Declined => "declined",
        InvitationStatus::AutoDeclined => "auto_declined",
        InvitationStatus::Expired => "expired",
        InvitationStatus::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(status: InvitationStatusDto) -> InvitationRecord {
        let now = Utc::now();
        InvitationRecord {
            id: Uuid::new_v4(),
            workout_id: "w1".to_string(),
            workout: None,
            inviter_id: Uuid::new_v4(),
            inviter: None,
            invitee_id: Uuid::new_v4(),
            invitee: None,
            status,
            created_at: now,
            auto_decline_at: now + chrono::Duration::minutes(30),
            responded_at: None,
            message: Some("join me".to_string()),
            notification_sent: false,
            reminders_sent: 0,
            decline_reason: None,
        }
    }

    #[test]
    fn maps_record_to_domain() {
        let wire = record(InvitationStatusDto::Pending);
        let invitation = record_to_invitation(wire.clone()).unwrap();
        assert_eq!(invitation.id, InvitationId::from_uuid(wire.id));
        assert!(invitation.is_pending());
        assert_eq!(invitation.message.unwrap().as_str(), "join me");
    }

    #[test]
    fn rejects_record_with_empty_workout_id() {
        let mut wire = record(InvitationStatusDto::Pending);
        wire.workout_id = "".to_string();
        assert!(record_to_invitation(wire).is_err());
    }

    #[test]
    fn drops_unrepresentable_message_instead_of_failing() {
        let mut wire = record(InvitationStatusDto::Pending);
        wire.message = Some("   ".to_string());
        let invitation = record_to_invitation(wire).unwrap();
        assert!(invitation.message.is_none());
    }

    #[test]
    fn status_mapping_round_trips() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            InvitationStatus::Declined,
            InvitationStatus::AutoDeclined,
            InvitationStatus::Expired,
            InvitationStatus::Cancelled,
        ] {
            assert_eq!(status_from_dto(status_to_dto(status)), status);
        }
    }
}
