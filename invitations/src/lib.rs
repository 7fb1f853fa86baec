//! Workout invitation lifecycle management for the FitLink mini-app.
//!
//! The [`InvitationLifecycleManager`] owns the client-side working set of
//! workout invitations (sent and received), keeps one auto-decline timer per
//! pending invitation, and synchronizes every status transition with the
//! host platform's invitation API, which stays authoritative throughout.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::filter::InvitationFilter;
pub use application::manager::{InvitationLifecycleManager, SendInvitations};
pub use application::ports;
pub use config::ManagerConfig;
pub use error::InvitationError;
