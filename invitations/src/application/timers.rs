use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::domain::value_objects::InvitationId;

/// The deadline timer (and optional reminder timer) for one pending
/// invitation.
#[derive(Debug)]
pub(crate) struct ScheduledTimer {
    pub deadline: DateTime<Utc>,
    primary: JoinHandle<()>,
    reminder: Option<JoinHandle<()>>,
}

impl ScheduledTimer {
    pub fn new(
        deadline: DateTime<Utc>,
        primary: JoinHandle<()>,
        reminder: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            deadline,
            primary,
            reminder,
        }
    }

    pub fn abort(&self) {
        self.primary.abort();
        self.abort_reminder();
    }

    /// Used by the primary task when it fires: it must not abort itself,
    /// only the companion reminder.
    pub fn abort_reminder(&self) {
        if let Some(reminder) = &self.reminder {
            reminder.abort();
        }
    }
}

/// All scheduled timers, keyed by invitation id. Owned exclusively by the
/// manager; every mutation goes through this registry, which is the single
/// choke point enforcing "at most one timer per invitation".
#[derive(Debug, Default)]
pub(crate) struct TimerRegistry {
    timers: HashMap<InvitationId, ScheduledTimer>,
}

impl TimerRegistry {
    /// Register a timer, aborting any previous one for the same id.
    /// Replacement is not expected in normal operation.
    pub fn insert(&mut self, id: InvitationId, timer: ScheduledTimer) {
        if let Some(previous) = self.timers.insert(id, timer) {
            warn!(%id, "replacing an existing timer; previous one aborted");
            previous.abort();
        }
    }

    /// Take the entry without aborting anything. The primary timer task
    /// uses this on itself right before it fires.
    pub fn take(&mut self, id: &InvitationId) -> Option<ScheduledTimer> {
        self.timers.remove(id)
    }

    /// Remove and abort the entry, if present.
    pub fn cancel(&mut self, id: &InvitationId) {
        if let Some(timer) = self.timers.remove(id) {
            timer.abort();
        }
    }

    pub fn contains(&self, id: &InvitationId) -> bool {
        self.timers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Abort everything. Used on full reloads and teardown.
    pub fn clear(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
