use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn new(id: String) -> Result<Self, String> {
        if id.trim().is_empty() {
            return Err("Workout id cannot be empty".to_string());
        }
        if id.len() > 128 {
            return Err("Workout id too long".to_string());
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
