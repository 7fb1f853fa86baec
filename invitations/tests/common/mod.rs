//! Shared test fixtures: an in-memory stand-in for the platform invitation
//! service and a recording notification dispatcher.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Notify;

use fitlink_invitations::application::filter::InvitationFilter;
use fitlink_invitations::application::ports::{
    ApiError, CreateInvitations, InvitationApi, NotificationDispatcher, NotifyContext,
    ResponseDecision,
};
use fitlink_invitations::domain::entities::{DeclineReason, Invitation, InvitationStatus};
use fitlink_invitations::domain::value_objects::{
    DeclineWindow, InvitationId, InviteMessage, UserId, WorkoutId,
};
use fitlink_invitations::{InvitationLifecycleManager, ManagerConfig};

pub fn test_config() -> ManagerConfig {
    ManagerConfig::default()
}

pub fn workout(id: &str) -> WorkoutId {
    WorkoutId::new(id.to_string()).unwrap()
}

pub fn message(text: &str) -> InviteMessage {
    InviteMessage::new(text.to_string()).unwrap()
}

/// A pending invitation whose deadline sits `minutes_until_deadline`
/// minutes from now (negative values put it in the past).
pub fn pending_invitation(
    inviter: UserId,
    invitee: UserId,
    minutes_until_deadline: i64,
) -> Invitation {
    let mut invitation = Invitation::new(
        workout("w1"),
        inviter,
        invitee,
        None,
        DeclineWindow::default(),
    );
    let now = Utc::now();
    invitation.created_at = now - Duration::minutes(30);
    invitation.auto_decline_at = now + Duration::minutes(minutes_until_deadline);
    invitation
}

#[derive(Default)]
struct FakeState {
    store: HashMap<InvitationId, Invitation>,
    fail_list: bool,
    fail_next_auto_decline: bool,
    auto_decline_calls: usize,
    create_calls: usize,
}

/// In-memory invitation service with the same observable semantics the
/// platform guarantees: atomic creates, distinct conflict failures carrying
/// the authoritative record, and idempotent auto-decline.
pub struct FakeInvitationApi {
    /// User every create is attributed to (the authenticated inviter).
    sender: UserId,
    state: Mutex<FakeState>,
    /// When set, `respond` parks until the gate is released.
    respond_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeInvitationApi {
    pub fn new(sender: UserId) -> Arc<Self> {
        Arc::new(Self {
            sender,
            state: Mutex::new(FakeState::default()),
            respond_gate: Mutex::new(None),
        })
    }

    pub fn seed(&self, invitation: Invitation) {
        self.state
            .lock()
            .unwrap()
            .store
            .insert(invitation.id, invitation);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    pub fn fail_next_auto_decline(&self) {
        self.state.lock().unwrap().fail_next_auto_decline = true;
    }

    pub fn auto_decline_calls(&self) -> usize {
        self.state.lock().unwrap().auto_decline_calls
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    /// Resolve an invitation server-side behind the client's back, the way
    /// a racing party would.
    pub fn force_resolve(&self, id: InvitationId, status: InvitationStatus) {
        let mut state = self.state.lock().unwrap();
        let invitation = state.store.get_mut(&id).expect("seeded invitation");
        let reason = match status {
            InvitationStatus::AutoDeclined => Some(DeclineReason::Timeout),
            _ => None,
        };
        invitation.resolve(status, Utc::now(), reason);
    }

    pub fn record(&self, id: InvitationId) -> Option<Invitation> {
        self.state.lock().unwrap().store.get(&id).cloned()
    }

    /// Park the next `respond` calls until the returned gate is notified.
    pub fn gate_responses(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.respond_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl InvitationApi for FakeInvitationApi {
    async fn list(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, ApiError> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(ApiError::Transport("injected list failure".to_string()));
        }
        Ok(state
            .store
            .values()
            .filter(|inv| filter.matches(inv))
            .cloned()
            .collect())
    }

    async fn create(&self, request: CreateInvitations) -> Result<Vec<Invitation>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        let mut created = Vec::new();
        for invitee in &request.invitee_ids {
            let invitation = Invitation::new(
                request.workout_id.clone(),
                self.sender,
                *invitee,
                request.message.clone(),
                request.window,
            );
            state.store.insert(invitation.id, invitation.clone());
            created.push(invitation);
        }
        Ok(created)
    }

    async fn respond(
        &self,
        id: InvitationId,
        decision: ResponseDecision,
        _message: Option<InviteMessage>,
    ) -> Result<Invitation, ApiError> {
        let gate = self.respond_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut state = self.state.lock().unwrap();
        let invitation = state.store.get_mut(&id).ok_or(ApiError::NotFound)?;
        if !invitation.is_pending() {
            return Err(ApiError::Conflict {
                current: invitation.clone(),
            });
        }
        let status = match decision {
            ResponseDecision::Accepted => InvitationStatus::Accepted,
            ResponseDecision::Declined => InvitationStatus::Declined,
        };
        invitation.resolve(status, Utc::now(), None);
        Ok(invitation.clone())
    }

    async fn cancel(&self, id: InvitationId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        let invitation = state.store.get(&id).ok_or(ApiError::NotFound)?;
        if !invitation.is_pending() {
            return Err(ApiError::Conflict {
                current: invitation.clone(),
            });
        }
        state.store.remove(&id);
        Ok(())
    }

    async fn auto_decline(&self, id: InvitationId) -> Result<Invitation, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.auto_decline_calls += 1;
        if state.fail_next_auto_decline {
            state.fail_next_auto_decline = false;
            return Err(ApiError::Transport(
                "injected auto-decline failure".to_string(),
            ));
        }
        let invitation = state.store.get_mut(&id).ok_or(ApiError::NotFound)?;
        // Idempotent: a repeat call returns the already-terminal record.
        if !invitation.is_pending() {
            return Ok(invitation.clone());
        }
        invitation.resolve(
            InvitationStatus::AutoDeclined,
            Utc::now(),
            Some(DeclineReason::Timeout),
        );
        Ok(invitation.clone())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedNotification {
    pub user_ids: Vec<UserId>,
    pub message: String,
    pub context: NotifyContext,
}

/// Dispatcher that records every notification and answers with a
/// configurable delivery result.
pub struct RecordingDispatcher {
    notifications: Mutex<Vec<RecordedNotification>>,
    deliver: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            notifications: Mutex::new(Vec::new()),
            deliver: AtomicBool::new(true),
        })
    }

    pub fn set_deliver(&self, deliver: bool) {
        self.deliver.store(deliver, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<RecordedNotification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, user_ids: &[UserId], message: &str, context: NotifyContext) -> bool {
        self.notifications.lock().unwrap().push(RecordedNotification {
            user_ids: user_ids.to_vec(),
            message: message.to_string(),
            context,
        });
        self.deliver.load(Ordering::SeqCst)
    }
}

/// Give spawned timer and sweep tasks a chance to run to completion.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn manager_for(
    me: UserId,
    api: Arc<FakeInvitationApi>,
    dispatcher: Arc<RecordingDispatcher>,
) -> InvitationLifecycleManager {
    InvitationLifecycleManager::new(me, test_config(), api, dispatcher)
        .expect("valid test config")
}
