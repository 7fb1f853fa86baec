use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{decline_window::DEFAULT_WINDOW_MINUTES, DeclineWindow};
use crate::error::InvitationError;

/// Runtime configuration for the invitation lifecycle manager and its
/// HTTP adapters. Layered as defaults < optional `fitlink` config file <
/// `FITLINK_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Base URL of the platform invitation API
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Response window applied when a send does not override it
    pub default_auto_decline_minutes: i64,
    /// Cadence of the recovery sweep for lost timers
    pub sweep_interval_secs: u64,
    /// How long before the deadline the local reminder fires
    pub reminder_lead_minutes: i64,
    /// Cadence of the seconds-remaining countdown publication
    pub countdown_cadence_secs: u64,
    /// Upper bound on invitees in a single send
    pub max_invitees_per_send: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.fitlink.app".to_string(),
            request_timeout_secs: 10,
            default_auto_decline_minutes: DEFAULT_WINDOW_MINUTES,
            sweep_interval_secs: 30,
            reminder_lead_minutes: 5,
            countdown_cadence_secs: 1,
            max_invitees_per_send: 10,
        }
    }
}

impl ManagerConfig {
    /// Load configuration from the environment, honoring a `.env` file and
    /// an optional `fitlink.toml` next to the working directory.
    pub fn from_env() -> Result<Self, InvitationError> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&ManagerConfig::default()).map_err(config_err)?)
            .add_source(config::File::with_name("fitlink").required(false))
            .add_source(config::Environment::with_prefix("FITLINK"))
            .build()
            .map_err(config_err)?;

        let cfg: ManagerConfig = settings.try_deserialize().map_err(config_err)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), InvitationError> {
        DeclineWindow::from_minutes(self.default_auto_decline_minutes)
            .map_err(InvitationError::Config)?;
        if self.max_invitees_per_send == 0 {
            return Err(InvitationError::Config(
                "max_invitees_per_send must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(InvitationError::Config(
                "sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.countdown_cadence_secs == 0 {
            return Err(InvitationError::Config(
                "countdown_cadence_secs must be at least 1".to_string(),
            ));
        }
        if self.reminder_lead_minutes < 1 {
            return Err(InvitationError::Config(
                "reminder_lead_minutes must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.api_base_url)
            .map_err(|e| InvitationError::Config(format!("invalid api_base_url: {e}")))?;
        Ok(())
    }

    pub fn default_window(&self) -> DeclineWindow {
        // validate() guarantees the range
        DeclineWindow::from_minutes(self.default_auto_decline_minutes)
            .unwrap_or_default()
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn countdown_cadence(&self) -> Duration {
        Duration::from_secs(self.countdown_cadence_secs)
    }

    pub fn reminder_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminder_lead_minutes)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn config_err(err: config::ConfigError) -> InvitationError {
    InvitationError::Config(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ManagerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.default_window().minutes(), 30);
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_zero_invitee_cap() {
        let cfg = ManagerConfig {
            max_invitees_per_send: 0,
            ..ManagerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(InvitationError::Config(_))));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let cfg = ManagerConfig {
            api_base_url: "not a url".to_string(),
            ..ManagerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
