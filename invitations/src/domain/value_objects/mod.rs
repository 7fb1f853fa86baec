pub mod decline_window;
pub mod invitation_id;
pub mod invite_message;
pub mod user_id;
pub mod workout_id;

pub use decline_window::DeclineWindow;
pub use invitation_id::InvitationId;
pub use invite_message::InviteMessage;
pub use user_id::UserId;
pub use workout_id::WorkoutId;
