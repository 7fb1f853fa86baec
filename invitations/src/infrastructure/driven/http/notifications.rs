use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use shared::{NotifyContext as WireContext, NotifyRequest};

use crate::application::ports::{NotificationDispatcher, NotifyContext};
use crate::config::ManagerConfig;
use crate::domain::value_objects::UserId;
use crate::error::InvitationError;
use crate::infrastructure::driven::http::invitation_api::status_to_dto;

/// Reqwest-based adapter for the platform's push notification endpoint.
/// Strictly best-effort: every failure is logged and swallowed into a
/// `false` return, never propagated to the primary operation.
pub struct HttpNotificationDispatcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpNotificationDispatcher {
    pub fn new(config: &ManagerConfig) -> Result<Self, InvitationError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| InvitationError::Config(format!("invalid api_base_url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| InvitationError::Config(format!("http client: {e}")))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn notify(&self, user_ids: &[UserId], message: &str, context: NotifyContext) -> bool {
        let url = match self.base_url.join("notifications") {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "notification endpoint unavailable");
                return false;
            }
        };
        let body = NotifyRequest {
            user_ids: user_ids.iter().map(|u| *u.as_uuid()).collect(),
            message: message.to_string(),
            context: context_to_wire(context),
        };
        match self.client.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(recipients = user_ids.len(), "notification dispatched");
                true
            }
            Ok(response) => {
                warn!(status = %response.status(), "notification rejected by the platform");
                false
            }
            Err(err) => {
                warn!(error = %err, "notification dispatch failed");
                false
            }
        }
    }
}

fn context_to_wire(context: NotifyContext) -> WireContext {
    match context {
        NotifyContext::Created { invitation } => WireContext::InvitationCreated {
            invitation_id: *invitation.as_uuid(),
        },
        NotifyContext::Responded { invitation, status } => WireContext::InvitationResponded {
            invitation_id: *invitation.as_uuid(),
            status: status_to_dto(status),
        },
        NotifyContext::AutoDeclined { invitation } => WireContext::InvitationAutoDeclined {
            invitation_id: *invitation.as_uuid(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::InvitationStatus;
    use crate::domain::value_objects::InvitationId;

    #[test]
    fn responded_context_serializes_with_tag_and_status() {
        let id = InvitationId::new();
        let wire = context_to_wire(NotifyContext::Responded {
            invitation: id,
            status: InvitationStatus::Accepted,
        });
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["type"], "invitation-responded");
        assert_eq!(value["status"], "accepted");
        assert_eq!(value["invitation_id"], id.to_string());
    }

    #[test]
    fn notify_request_body_carries_recipients_and_message() {
        let user = UserId::new();
        let invitation = InvitationId::new();
        let body = NotifyRequest {
            user_ids: vec![*user.as_uuid()],
            message: "Your invitation expired".to_string(),
            context: context_to_wire(NotifyContext::AutoDeclined { invitation }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["user_ids"][0], user.to_string());
        assert_eq!(value["message"], "Your invitation expired");
        assert_eq!(value["context"]["type"], "invitation-auto-declined");
        assert_eq!(value["context"]["invitation_id"], invitation.to_string());
    }
}
