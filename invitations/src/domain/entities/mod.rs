pub mod invitation;
pub mod workout;

pub use invitation::{DeclineReason, Invitation, InvitationStatus};
pub use workout::{UserSummary, WorkoutSummary};
