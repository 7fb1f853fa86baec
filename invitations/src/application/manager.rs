use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use chrono::Utc;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::filter::InvitationFilter;
use crate::application::ports::{
    ApiError, CreateInvitations, InvitationApi, NotificationDispatcher, NotifyContext,
    ResponseDecision,
};
use crate::application::timers::{ScheduledTimer, TimerRegistry};
use crate::config::ManagerConfig;
use crate::domain::entities::{Invitation, InvitationStatus};
use crate::domain::events::InvitationEvent;
use crate::domain::value_objects::{DeclineWindow, InvitationId, InviteMessage, UserId, WorkoutId};
use crate::error::InvitationError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Request to fan out one invitation per invitee for a workout.
#[derive(Debug, Clone)]
pub struct SendInvitations {
    pub workout_id: WorkoutId,
    pub invitee_ids: Vec<UserId>,
    pub message: Option<InviteMessage>,
    /// Override for the response window; the configured default applies
    /// when absent.
    pub window: Option<DeclineWindow>,
    /// Ask the platform to push a notification to each invitee.
    pub notify_invitees: bool,
}

/// Owns the client-side working set of workout invitations for one user and
/// the auto-decline timer of every pending invitation. The platform's
/// invitation API stays authoritative: every transition is synchronized
/// with it, and on conflict the server's record wins.
///
/// Cloning yields another handle to the same manager.
#[derive(Clone)]
pub struct InvitationLifecycleManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    weak: Weak<ManagerInner>,
    me: UserId,
    config: ManagerConfig,
    api: Arc<dyn InvitationApi>,
    notifier: Arc<dyn NotificationDispatcher>,
    invitations: RwLock<HashMap<InvitationId, Invitation>>,
    timers: Mutex<TimerRegistry>,
    /// Ids with a mutating remote call in flight: user responses waiting on
    /// the server (busy flag for the UI) and auto-declines that have been
    /// claimed so a racing trigger no-ops.
    in_flight: Mutex<HashSet<InvitationId>>,
    events: broadcast::Sender<InvitationEvent>,
    countdown_tx: watch::Sender<HashMap<InvitationId, i64>>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl InvitationLifecycleManager {
    pub fn new(
        me: UserId,
        config: ManagerConfig,
        api: Arc<dyn InvitationApi>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, InvitationError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (countdown_tx, _) = watch::channel(HashMap::new());
        let inner = Arc::new_cyclic(|weak| ManagerInner {
            weak: weak.clone(),
            me,
            config,
            api,
            notifier,
            invitations: RwLock::new(HashMap::new()),
            timers: Mutex::new(TimerRegistry::default()),
            in_flight: Mutex::new(HashSet::new()),
            events,
            countdown_tx,
            background: Mutex::new(Vec::new()),
        });
        Ok(Self { inner })
    }

    /// Spawn the recovery sweep and countdown publication loops.
    /// Idempotent; call once after construction.
    pub fn start(&self) {
        self.inner.spawn_background();
    }

    /// Abort every background loop and every pending timer. In-flight
    /// network calls are not interrupted; the platform stays authoritative
    /// and the next load reconciles whatever they produced.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Replace the working set with the platform's current view. On
    /// failure the local collection is left untouched. After a successful
    /// load the set of active timers is exactly the set of pending,
    /// not-yet-expired invitations; pending records whose deadline already
    /// passed go straight down the auto-decline path.
    pub async fn load_invitations(
        &self,
        filter: InvitationFilter,
    ) -> Result<Vec<Invitation>, InvitationError> {
        self.inner.load(filter).await
    }

    /// Create one invitation per invitee. The remote create is atomic:
    /// either every record comes back or none, so partial local state is
    /// never introduced. Invitee notifications are best-effort.
    pub async fn send_invitations(
        &self,
        request: SendInvitations,
    ) -> Result<Vec<Invitation>, InvitationError> {
        self.inner.send(request).await
    }

    pub async fn accept_invitation(
        &self,
        id: InvitationId,
        message: Option<InviteMessage>,
    ) -> Result<Invitation, InvitationError> {
        self.inner.respond(id, ResponseDecision::Accepted, message).await
    }

    pub async fn decline_invitation(
        &self,
        id: InvitationId,
        message: Option<InviteMessage>,
    ) -> Result<Invitation, InvitationError> {
        self.inner.respond(id, ResponseDecision::Declined, message).await
    }

    /// Inviter-only. Removes the invitation from the working set entirely
    /// on server confirmation; cancelled invitations are not retained.
    pub async fn cancel_invitation(&self, id: InvitationId) -> Result<(), InvitationError> {
        self.inner.cancel(id).await
    }

    /// Run one recovery sweep pass immediately, outside the periodic loop.
    pub async fn sweep_now(&self) {
        self.inner.sweep_once().await;
    }

    // ------------------------------------------------------------------
    // Read surface (presentation layer boundary; never mutates)
    // ------------------------------------------------------------------

    pub async fn snapshot(&self) -> Vec<Invitation> {
        let invitations = self.inner.invitations.read().await;
        let mut all: Vec<Invitation> = invitations.values().cloned().collect();
        all.sort_by_key(|inv| inv.created_at);
        all
    }

    pub async fn get(&self, id: InvitationId) -> Option<Invitation> {
        self.inner.invitations.read().await.get(&id).cloned()
    }

    /// Invitations sent by the current user.
    pub async fn sent(&self) -> Vec<Invitation> {
        self.partition(|inv, me| inv.inviter_id == *me, None).await
    }

    /// Invitations addressed to the current user.
    pub async fn received(&self) -> Vec<Invitation> {
        self.partition(|inv, me| inv.invitee_id == *me, None).await
    }

    pub async fn pending_sent(&self) -> Vec<Invitation> {
        self.partition(|inv, me| inv.inviter_id == *me, Some(InvitationStatus::Pending))
            .await
    }

    pub async fn pending_received(&self) -> Vec<Invitation> {
        self.partition(|inv, me| inv.invitee_id == *me, Some(InvitationStatus::Pending))
            .await
    }

    /// Whether a mutating call for this invitation is currently in flight.
    /// The UI uses this to suppress duplicate accept/decline clicks.
    pub fn is_busy(&self, id: InvitationId) -> bool {
        self.inner.in_flight.lock().unwrap().contains(&id)
    }

    /// Seconds until auto-decline for every pending invitation, computed
    /// at call time.
    pub async fn time_remaining(&self) -> HashMap<InvitationId, i64> {
        let now = Utc::now();
        let invitations = self.inner.invitations.read().await;
        invitations
            .values()
            .filter(|inv| inv.is_pending())
            .map(|inv| (inv.id, inv.remaining(now).num_seconds()))
            .collect()
    }

    /// Event stream of every mutation applied to the working set.
    pub fn subscribe(&self) -> broadcast::Receiver<InvitationEvent> {
        self.inner.events.subscribe()
    }

    /// Seconds-remaining map, republished at the configured cadence while
    /// the manager is started. For countdown displays.
    pub fn countdown(&self) -> watch::Receiver<HashMap<InvitationId, i64>> {
        self.inner.countdown_tx.subscribe()
    }

    /// Number of currently scheduled auto-decline timers.
    pub fn active_timer_count(&self) -> usize {
        self.inner.timers.lock().unwrap().len()
    }

    pub fn has_timer(&self, id: InvitationId) -> bool {
        self.inner.timers.lock().unwrap().contains(&id)
    }

    async fn partition(
        &self,
        side: fn(&Invitation, &UserId) -> bool,
        status: Option<InvitationStatus>,
    ) -> Vec<Invitation> {
        let invitations = self.inner.invitations.read().await;
        let mut selected: Vec<Invitation> = invitations
            .values()
            .filter(|inv| side(inv, &self.inner.me))
            .filter(|inv| status.map_or(true, |s| inv.status == s))
            .cloned()
            .collect();
        selected.sort_by_key(|inv| inv.created_at);
        selected
    }
}

impl ManagerInner {
    fn spawn_background(&self) {
        let mut background = self.background.lock().unwrap();
        if !background.is_empty() {
            return;
        }

        let weak = self.weak.clone();
        let sweep_interval = self.config.sweep_interval();
        background.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.sweep_once().await;
            }
        }));

        let weak = self.weak.clone();
        let cadence = self.config.countdown_cadence();
        background.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.publish_countdown().await;
            }
        }));

        info!(
            sweep_secs = self.config.sweep_interval_secs,
            countdown_secs = self.config.countdown_cadence_secs,
            "invitation manager background loops started"
        );
    }

    fn shutdown(&self) {
        for handle in self.background.lock().unwrap().drain(..) {
            handle.abort();
        }
        self.timers.lock().unwrap().clear();
        info!("invitation manager shut down");
    }

    async fn load(&self, filter: InvitationFilter) -> Result<Vec<Invitation>, InvitationError> {
        let records = self.api.list(&filter).await?;
        debug!(count = records.len(), "replacing local invitation set");

        {
            let mut invitations = self.invitations.write().await;
            invitations.clear();
            for record in &records {
                invitations.insert(record.id, record.clone());
            }
        }
        self.timers.lock().unwrap().clear();

        let now = Utc::now();
        let mut overdue = Vec::new();
        for record in &records {
            if !record.is_pending() {
                continue;
            }
            if record.deadline_elapsed(now) {
                overdue.push(record.id);
            } else {
                self.schedule(record);
            }
        }

        self.emit(InvitationEvent::Loaded {
            count: records.len(),
        });

        // Self-healing for sessions that were suspended past a deadline:
        // these get no timer, they auto-decline right away.
        for id in overdue {
            if let Err(err) = self.auto_decline(id).await {
                warn!(%id, error = %err, "deferred auto-decline failed during load");
            }
        }

        let invitations = self.invitations.read().await;
        let mut loaded: Vec<Invitation> = invitations.values().cloned().collect();
        loaded.sort_by_key(|inv| inv.created_at);
        Ok(loaded)
    }

    async fn send(&self, request: SendInvitations) -> Result<Vec<Invitation>, InvitationError> {
        let SendInvitations {
            workout_id,
            invitee_ids,
            message,
            window,
            notify_invitees,
        } = request;

        if invitee_ids.is_empty() {
            return Err(InvitationError::Validation(
                "at least one invitee is required".to_string(),
            ));
        }
        let cap = self.config.max_invitees_per_send;
        if invitee_ids.len() > cap {
            return Err(InvitationError::Validation(format!(
                "at most {cap} invitees per send"
            )));
        }
        let mut seen = HashSet::new();
        for invitee in &invitee_ids {
            if *invitee == self.me {
                return Err(InvitationError::Validation(
                    "cannot invite yourself".to_string(),
                ));
            }
            if !seen.insert(*invitee) {
                return Err(InvitationError::Validation(format!(
                    "duplicate invitee: {invitee}"
                )));
            }
        }

        let window = window.unwrap_or_else(|| self.config.default_window());
        let created = self
            .api
            .create(CreateInvitations {
                workout_id,
                invitee_ids,
                message,
                window,
            })
            .await?;

        {
            let mut invitations = self.invitations.write().await;
            for invitation in &created {
                invitations.insert(invitation.id, invitation.clone());
            }
        }
        for invitation in &created {
            self.schedule(invitation);
            self.emit(InvitationEvent::Created {
                invitation: invitation.clone(),
            });
        }
        info!(count = created.len(), "invitations sent");

        if notify_invitees {
            for invitation in &created {
                let text = format!(
                    "You've been invited to {}",
                    describe_workout(invitation)
                );
                let delivered = self
                    .notifier
                    .notify(
                        &[invitation.invitee_id],
                        &text,
                        NotifyContext::Created {
                            invitation: invitation.id,
                        },
                    )
                    .await;
                if delivered {
                    let mut invitations = self.invitations.write().await;
                    if let Some(existing) = invitations.get_mut(&invitation.id) {
                        existing.notification_sent = true;
                    }
                } else {
                    warn!(id = %invitation.id, "invitee notification dropped");
                }
            }
        }

        let invitations = self.invitations.read().await;
        Ok(created
            .iter()
            .filter_map(|c| invitations.get(&c.id).cloned())
            .collect())
    }

    async fn respond(
        &self,
        id: InvitationId,
        decision: ResponseDecision,
        message: Option<InviteMessage>,
    ) -> Result<Invitation, InvitationError> {
        let invitation = {
            let invitations = self.invitations.read().await;
            invitations
                .get(&id)
                .cloned()
                .ok_or(InvitationError::NotFound(id))?
        };
        if !invitation.is_pending() {
            return Err(InvitationError::NotPending {
                status: invitation.status,
            });
        }
        if invitation.invitee_id != self.me {
            return Err(InvitationError::Forbidden(
                "only the invitee can respond to an invitation",
            ));
        }
        if !self.in_flight.lock().unwrap().insert(id) {
            return Err(InvitationError::Busy);
        }

        let result = self.api.respond(id, decision, message).await;
        self.in_flight.lock().unwrap().remove(&id);

        match result {
            Ok(record) => {
                self.timers.lock().unwrap().cancel(&id);
                let applied = self.apply_remote(record.clone()).await.unwrap_or(record);
                info!(%id, ?decision, "invitation response recorded");
                let event = match decision {
                    ResponseDecision::Accepted => InvitationEvent::Accepted {
                        invitation: applied.clone(),
                    },
                    ResponseDecision::Declined => InvitationEvent::Declined {
                        invitation: applied.clone(),
                    },
                };
                self.emit(event);
                let text = match decision {
                    ResponseDecision::Accepted => format!(
                        "Your invitation to {} was accepted",
                        describe_workout(&applied)
                    ),
                    ResponseDecision::Declined => format!(
                        "Your invitation to {} was declined",
                        describe_workout(&applied)
                    ),
                };
                let delivered = self
                    .notifier
                    .notify(
                        &[applied.inviter_id],
                        &text,
                        NotifyContext::Responded {
                            invitation: id,
                            status: applied.status,
                        },
                    )
                    .await;
                if !delivered {
                    warn!(%id, "response notification dropped");
                }
                Ok(applied)
            }
            Err(ApiError::Conflict { current }) => {
                // The response lost a race with a concurrent resolution
                // (typically the auto-decline deadline). No user intent was
                // violated; adopt the server's outcome silently.
                self.timers.lock().unwrap().cancel(&id);
                let applied = self.apply_remote(current.clone()).await.unwrap_or(current);
                warn!(%id, status = ?applied.status, "response raced a concurrent resolution; adopted server status");
                self.emit(InvitationEvent::Reconciled {
                    invitation: applied.clone(),
                });
                Ok(applied)
            }
            // Transport and other failures leave the invitation pending and
            // its timer armed; the user may retry.
            Err(err) => Err(err.into()),
        }
    }

    async fn cancel(&self, id: InvitationId) -> Result<(), InvitationError> {
        let invitation = {
            let invitations = self.invitations.read().await;
            invitations
                .get(&id)
                .cloned()
                .ok_or(InvitationError::NotFound(id))?
        };
        if invitation.inviter_id != self.me {
            return Err(InvitationError::Forbidden(
                "only the inviter can cancel an invitation",
            ));
        }
        if !invitation.is_pending() {
            return Err(InvitationError::NotPending {
                status: invitation.status,
            });
        }
        if !self.in_flight.lock().unwrap().insert(id) {
            return Err(InvitationError::Busy);
        }

        let result = self.api.cancel(id).await;
        self.in_flight.lock().unwrap().remove(&id);

        match result {
            Ok(()) | Err(ApiError::NotFound) => {
                self.timers.lock().unwrap().cancel(&id);
                self.invitations.write().await.remove(&id);
                self.emit(InvitationEvent::Cancelled { id });
                info!(%id, "invitation cancelled");
                Ok(())
            }
            Err(ApiError::Conflict { current }) => {
                // Resolved concurrently; keep the server's terminal record.
                self.timers.lock().unwrap().cancel(&id);
                if let Some(applied) = self.apply_remote(current).await {
                    warn!(%id, status = ?applied.status, "cancel raced a concurrent resolution; adopted server status");
                    self.emit(InvitationEvent::Reconciled {
                        invitation: applied,
                    });
                }
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Auto-decline an invitation whose deadline elapsed. Safe to trigger
    /// concurrently from the timer and the sweep: the first caller claims
    /// the id before awaiting the remote call, and a later caller sees
    /// either the claim or a non-pending status and no-ops. A transport
    /// failure leaves the record pending (without a timer) for the next
    /// sweep pass: at-least-once, never backwards from a terminal state.
    async fn auto_decline(&self, id: InvitationId) -> Result<(), InvitationError> {
        {
            let invitations = self.invitations.read().await;
            match invitations.get(&id) {
                Some(invitation) if invitation.is_pending() => {}
                _ => {
                    debug!(%id, "auto-decline skipped: not pending");
                    return Ok(());
                }
            }
        }
        if !self.in_flight.lock().unwrap().insert(id) {
            debug!(%id, "auto-decline skipped: already in flight");
            return Ok(());
        }
        // No timer may survive once the decline is underway.
        self.timers.lock().unwrap().cancel(&id);

        debug!(%id, "auto-declining expired invitation");
        let result = self.api.auto_decline(id).await;
        self.in_flight.lock().unwrap().remove(&id);

        match result {
            Ok(record) => {
                if let Some(applied) = self.apply_remote(record).await {
                    info!(id = %applied.id, "invitation auto-declined");
                    self.emit(InvitationEvent::AutoDeclined {
                        invitation: applied.clone(),
                    });
                    let text = format!(
                        "Your invitation to {} expired without a response",
                        describe_workout(&applied)
                    );
                    let delivered = self
                        .notifier
                        .notify(
                            &[applied.inviter_id],
                            &text,
                            NotifyContext::AutoDeclined { invitation: id },
                        )
                        .await;
                    if !delivered {
                        warn!(%id, "auto-decline notification dropped");
                    }
                }
                Ok(())
            }
            Err(ApiError::Conflict { current }) => {
                // Someone resolved it first; adopt their outcome.
                if let Some(applied) = self.apply_remote(current).await {
                    self.emit(InvitationEvent::Reconciled {
                        invitation: applied,
                    });
                }
                Ok(())
            }
            Err(ApiError::NotFound) => {
                // Cancelled server-side while we were waiting to expire it.
                self.invitations.write().await.remove(&id);
                self.emit(InvitationEvent::Cancelled { id });
                Ok(())
            }
            Err(err) => {
                warn!(%id, error = %err, "auto-decline failed; the sweep will retry");
                Err(err.into())
            }
        }
    }

    /// One pass of the recovery sweep: pending invitations whose deadline
    /// passed but which have neither a timer nor an in-flight call get
    /// auto-declined. Covers timer loss across suspend/resume and failed
    /// auto-decline attempts.
    async fn sweep_once(&self) {
        let now = Utc::now();
        let candidates: Vec<InvitationId> = {
            let invitations = self.invitations.read().await;
            let timers = self.timers.lock().unwrap();
            let in_flight = self.in_flight.lock().unwrap();
            invitations
                .values()
                .filter(|inv| inv.is_pending() && inv.deadline_elapsed(now))
                .filter(|inv| !timers.contains(&inv.id) && !in_flight.contains(&inv.id))
                .map(|inv| inv.id)
                .collect()
        };
        if candidates.is_empty() {
            return;
        }
        info!(count = candidates.len(), "sweep found overdue invitations without timers");
        for id in candidates {
            if let Err(err) = self.auto_decline(id).await {
                warn!(%id, error = %err, "sweep auto-decline failed");
            }
        }
    }

    async fn publish_countdown(&self) {
        let now = Utc::now();
        let map: HashMap<InvitationId, i64> = {
            let invitations = self.invitations.read().await;
            invitations
                .values()
                .filter(|inv| inv.is_pending())
                .map(|inv| (inv.id, inv.remaining(now).num_seconds()))
                .collect()
        };
        self.countdown_tx.send_replace(map);
    }

    /// Arm the deadline timer (and, when more than the reminder lead
    /// remains, the reminder timer) for a pending invitation.
    fn schedule(&self, invitation: &Invitation) {
        let id = invitation.id;
        let deadline = invitation.auto_decline_at;
        let remaining = invitation.remaining(Utc::now());

        let weak = self.weak.clone();
        let primary_delay = remaining.to_std().unwrap_or_default();
        let primary = tokio::spawn(async move {
            tokio::time::sleep(primary_delay).await;
            let Some(inner) = weak.upgrade() else { return };
            // Drop our own registry entry before acting so a concurrent
            // trigger sees no timer; only the companion reminder is aborted.
            let entry = inner.timers.lock().unwrap().take(&id);
            if let Some(entry) = entry {
                entry.abort_reminder();
                debug!(%id, deadline = %entry.deadline, "deadline timer fired");
            }
            if let Err(err) = inner.auto_decline(id).await {
                warn!(%id, error = %err, "timer-fired auto-decline failed");
            }
        });

        let lead = self.config.reminder_lead();
        let reminder = if remaining > lead {
            let weak = self.weak.clone();
            let reminder_delay = (remaining - lead).to_std().unwrap_or_default();
            Some(tokio::spawn(async move {
                tokio::time::sleep(reminder_delay).await;
                let Some(inner) = weak.upgrade() else { return };
                inner.fire_reminder(id).await;
            }))
        } else {
            None
        };

        self.timers
            .lock()
            .unwrap()
            .insert(id, ScheduledTimer::new(deadline, primary, reminder));
        debug!(%id, %deadline, "auto-decline timer armed");
    }

    async fn fire_reminder(&self, id: InvitationId) {
        let remaining_secs = {
            let mut invitations = self.invitations.write().await;
            match invitations.get_mut(&id) {
                Some(invitation) if invitation.is_pending() => {
                    invitation.reminders_sent += 1;
                    invitation.remaining(Utc::now()).num_seconds()
                }
                _ => return,
            }
        };
        debug!(%id, remaining_secs, "reminder due");
        self.emit(InvitationEvent::ReminderDue { id, remaining_secs });
    }

    /// Adopt a server-provided record, honoring local terminal-state
    /// monotonicity: a late-arriving transition for an invitation that is
    /// already terminal locally is discarded.
    async fn apply_remote(&self, record: Invitation) -> Option<Invitation> {
        let mut invitations = self.invitations.write().await;
        match invitations.get_mut(&record.id) {
            Some(existing) => {
                if existing.is_terminal() && existing.status != record.status {
                    warn!(
                        id = %record.id,
                        local = ?existing.status,
                        remote = ?record.status,
                        "discarding late transition for already-terminal invitation"
                    );
                    return None;
                }
                *existing = record.clone();
                Some(record)
            }
            None => {
                invitations.insert(record.id, record.clone());
                Some(record)
            }
        }
    }

    fn emit(&self, event: InvitationEvent) {
        // Lossy by design: no subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        for handle in self.background.lock().unwrap().drain(..) {
            handle.abort();
        }
        // TimerRegistry aborts its tasks on drop.
    }
}

fn describe_workout(invitation: &Invitation) -> String {
    invitation
        .workout
        .as_ref()
        .map(|w| w.title.clone())
        .unwrap_or_else(|| format!("workout {}", invitation.workout_id))
}
