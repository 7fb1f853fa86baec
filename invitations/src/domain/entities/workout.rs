use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{UserId, WorkoutId};

/// Denormalized snapshot of the workout an invitation refers to.
/// The workout catalog itself lives server-side; this is display data only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub id: WorkoutId,
    pub title: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

/// Denormalized snapshot of a user referenced by an invitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
