use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;
use warp::http::StatusCode;

use crate::errors::{ErrorSeverity, IntoErrorResponse};

/// What a room does when a human seat stops answering mid-round.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnresponsivePolicy {
    /// Seat a computer player under the same name and replay the round.
    #[default]
    SubstituteAi,
    /// Stop the game and close the room.
    Terminate,
}

impl std::str::FromStr for UnresponsivePolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substitute_ai" | "substitute" | "ai" => Ok(UnresponsivePolicy::SubstituteAi),
            "terminate" => Ok(UnresponsivePolicy::Terminate),
            other => Err(SettingsError::InvalidValue(format!(
                "unresponsive_policy must be substitute_ai or terminate, got {other}"
            ))),
        }
    }
}

/// Server-wide defaults for new rooms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    /// Seconds a human seat has to answer one decision
    pub decision_timeout_secs: u64,
    /// Seats per room when the creator does not say (2-4)
    pub max_players: usize,
    /// Computer player kind for AI seats and substitutions
    pub ai_kind: String,
    pub room_code_length: usize,
    pub unresponsive_policy: UnresponsivePolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            decision_timeout_secs: 120,
            max_players: 4,
            ai_kind: "baseline".to_string(),
            room_code_length: 5,
            unresponsive_policy: UnresponsivePolicy::SubstituteAi,
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.decision_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "decision_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if !(2..=4).contains(&self.max_players) {
            return Err(SettingsError::InvalidValue(
                "max_players must be between 2 and 4".to_string(),
            ));
        }
        if !kabo_ai::AI_KINDS.contains(&self.ai_kind.as_str()) {
            return Err(SettingsError::InvalidValue(format!(
                "ai_kind must be one of {}",
                kabo_ai::AI_KINDS.join(", ")
            )));
        }
        if !(4..=12).contains(&self.room_code_length) {
            return Err(SettingsError::InvalidValue(
                "room_code_length must be between 4 and 12".to_string(),
            ));
        }
        Ok(())
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.decision_timeout_secs)
    }

    /// Defaults overridden by `KABO_DECISION_TIMEOUT`, `KABO_MAX_PLAYERS`,
    /// `KABO_AI`, `KABO_ROOM_CODE_LENGTH` and `KABO_UNRESPONSIVE`.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        fn number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, SettingsError> {
            raw.trim()
                .parse()
                .map_err(|_| SettingsError::InvalidValue(format!("{key} must be a number")))
        }

        let mut settings = Self::default();
        if let Some(raw) = lookup("KABO_DECISION_TIMEOUT") {
            settings.decision_timeout_secs = number("KABO_DECISION_TIMEOUT", &raw)?;
        }
        if let Some(raw) = lookup("KABO_MAX_PLAYERS") {
            settings.max_players = number("KABO_MAX_PLAYERS", &raw)?;
        }
        if let Some(raw) = lookup("KABO_AI") {
            settings.ai_kind = raw.trim().to_ascii_lowercase();
        }
        if let Some(raw) = lookup("KABO_ROOM_CODE_LENGTH") {
            settings.room_code_length = number("KABO_ROOM_CODE_LENGTH", &raw)?;
        }
        if let Some(raw) = lookup("KABO_UNRESPONSIVE") {
            settings.unresponsive_policy = raw.parse()?;
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// In-memory settings store with validation
#[derive(Debug, Default)]
pub struct SettingsStore {
    settings: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: AppSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings: RwLock::new(settings),
        })
    }

    pub fn get(&self) -> Result<AppSettings, SettingsError> {
        self.settings
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SettingsError::StoragePoisoned)
    }

    /// Replaces the settings. Rooms already created keep the values they started with.
    pub fn update(&self, new_settings: AppSettings) -> Result<AppSettings, SettingsError> {
        new_settings.validate()?;

        let mut guard = self
            .settings
            .write()
            .map_err(|_| SettingsError::StoragePoisoned)?;
        *guard = new_settings.clone();
        Ok(new_settings)
    }

    pub fn update_field(
        &self,
        field: &str,
        value: serde_json::Value,
    ) -> Result<AppSettings, SettingsError> {
        let mut current = self.get()?;
        let number = |value: &serde_json::Value| {
            value
                .as_u64()
                .ok_or_else(|| SettingsError::InvalidValue(format!("{field} must be a number")))
        };

        match field {
            "decision_timeout_secs" => current.decision_timeout_secs = number(&value)?,
            "max_players" => current.max_players = number(&value)? as usize,
            "room_code_length" => current.room_code_length = number(&value)? as usize,
            "ai_kind" => {
                let kind = value.as_str().ok_or_else(|| {
                    SettingsError::InvalidValue("ai_kind must be a string".to_string())
                })?;
                current.ai_kind = kind.to_string();
            }
            "unresponsive_policy" => {
                let policy = value.as_str().ok_or_else(|| {
                    SettingsError::InvalidValue("unresponsive_policy must be a string".to_string())
                })?;
                current.unresponsive_policy = policy.parse()?;
            }
            _ => {
                return Err(SettingsError::InvalidValue(format!(
                    "unknown field: {}",
                    field
                )))
            }
        }

        self.update(current)
    }

    pub fn reset(&self) -> Result<AppSettings, SettingsError> {
        self.update(AppSettings::default())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
    #[error("Settings storage poisoned")]
    StoragePoisoned,
}

impl IntoErrorResponse for SettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            SettingsError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            SettingsError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SettingsError::InvalidValue(_) => "invalid_settings",
            SettingsError::StoragePoisoned => "settings_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            SettingsError::StoragePoisoned => ErrorSeverity::Critical,
            SettingsError::InvalidValue(_) => ErrorSeverity::Client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_settings_are_valid() {
        assert!(AppSettings::default().validate().is_ok());
    }

    #[test]
    fn validates_ranges() {
        let bad = [
            AppSettings {
                decision_timeout_secs: 0,
                ..Default::default()
            },
            AppSettings {
                max_players: 5,
                ..Default::default()
            },
            AppSettings {
                max_players: 1,
                ..Default::default()
            },
            AppSettings {
                ai_kind: "oracle".into(),
                ..Default::default()
            },
            AppSettings {
                room_code_length: 2,
                ..Default::default()
            },
        ];
        for settings in bad {
            assert!(settings.validate().is_err(), "{settings:?}");
        }
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = AppSettings::from_lookup(lookup(&[
            ("KABO_DECISION_TIMEOUT", "15"),
            ("KABO_MAX_PLAYERS", "3"),
            ("KABO_AI", "Random"),
            ("KABO_UNRESPONSIVE", "terminate"),
        ]))
        .expect("settings");
        assert_eq!(settings.decision_timeout(), Duration::from_secs(15));
        assert_eq!(settings.max_players, 3);
        assert_eq!(settings.ai_kind, "random");
        assert_eq!(settings.unresponsive_policy, UnresponsivePolicy::Terminate);
        assert_eq!(settings.room_code_length, 5);
    }

    #[test]
    fn bad_environment_values_are_rejected() {
        assert!(AppSettings::from_lookup(lookup(&[("KABO_MAX_PLAYERS", "many")])).is_err());
        assert!(AppSettings::from_lookup(lookup(&[("KABO_MAX_PLAYERS", "9")])).is_err());
        assert!(AppSettings::from_lookup(lookup(&[("KABO_UNRESPONSIVE", "pause")])).is_err());
    }

    #[test]
    fn store_updates_individual_fields() {
        let store = SettingsStore::new();
        store
            .update_field("max_players", serde_json::json!(2))
            .expect("update");
        store
            .update_field("unresponsive_policy", serde_json::json!("terminate"))
            .expect("update");
        let settings = store.get().expect("get");
        assert_eq!(settings.max_players, 2);
        assert_eq!(settings.unresponsive_policy, UnresponsivePolicy::Terminate);
    }

    #[test]
    fn store_rejects_invalid_updates() {
        let store = SettingsStore::new();
        assert!(store
            .update_field("max_players", serde_json::json!(7))
            .is_err());
        assert!(store
            .update_field("ai_kind", serde_json::json!(3))
            .is_err());
        assert!(store
            .update_field("colour", serde_json::json!("red"))
            .is_err());
        assert_eq!(store.get().expect("get"), AppSettings::default());
    }

    #[test]
    fn store_resets_to_defaults() {
        let store = SettingsStore::with_settings(AppSettings {
            decision_timeout_secs: 5,
            ..Default::default()
        })
        .expect("valid");
        assert_eq!(store.reset().expect("reset"), AppSettings::default());
    }

    #[test]
    fn settings_store_thread_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(SettingsStore::new());
        let handles: Vec<_> = (2..=4)
            .map(|players| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .update(AppSettings {
                            max_players: players,
                            ..Default::default()
                        })
                        .ok();
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join thread");
        }
        assert!(store.get().expect("get").validate().is_ok());
    }
}
