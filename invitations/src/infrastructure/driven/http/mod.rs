// HTTP adapters for the platform invitation and notification APIs

pub mod invitation_api;
pub mod notifications;

pub use invitation_api::HttpInvitationApi;
pub use notifications::HttpNotificationDispatcher;
