use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-text note attached by the inviter to an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteMessage(String);

impl InviteMessage {
    pub fn new(message: String) -> Result<Self, String> {
        if message.trim().is_empty() {
            return Err("Invitation message cannot be empty".to_string());
        }
        if message.chars().count() > 500 {
            return Err("Invitation message too long (max 500 characters)".to_string());
        }
        Ok(Self(message))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
