// Application ports - Driven ports (output ports implemented by infrastructure)

pub mod invitation_api;
pub mod notifications;

pub use invitation_api::{ApiError, CreateInvitations, InvitationApi, ResponseDecision};
pub use notifications::{NotificationDispatcher, NotifyContext};
