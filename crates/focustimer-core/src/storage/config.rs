//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timer type definitions (id, name, duration, color)
//! - Auto-switch / auto-start behaviour
//! - Notification preferences
//! - Statistics retention
//!
//! Configuration is stored at `<data_dir>/config.toml`. Keys missing from the
//! file fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::data_dir;
use crate::error::ConfigError;

/// Timer types that always exist.
pub const STUDY: &str = "study";
pub const REST: &str = "rest";

/// A user-selectable kind of run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerType {
    pub id: String,
    pub name: String,
    /// Duration in seconds.
    pub duration: u64,
    #[serde(default = "default_color")]
    pub color: String,
}

impl TimerType {
    pub fn new(id: &str, name: &str, duration: u64, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            duration,
            color: color.to_string(),
        }
    }
}

/// Partial update applied by [`Config::update_timer_type`].
#[derive(Debug, Clone, Default)]
pub struct TimerTypeUpdate {
    pub name: Option<String>,
    pub duration: Option<u64>,
    pub color: Option<String>,
}

/// Behavioural flags readable through [`SettingsProvider::get_flag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Switch study -> rest -> study after an auto-completed run.
    AutoSwitch,
    /// Start the switched-to type immediately.
    AutoStartNext,
    SoundEnabled,
    PopupEnabled,
}

/// Read-only view of settings needed by the timer service.
pub trait SettingsProvider {
    fn get_timer_type(&self, id: &str) -> Option<TimerType>;
    fn get_flag(&self, flag: Flag) -> bool;
    fn sound_file(&self) -> Option<String> {
        None
    }
}

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_timer_types")]
    pub types: Vec<TimerType>,
    #[serde(default = "default_current_type")]
    pub current_type: String,
    #[serde(default)]
    pub auto_switch: bool,
    #[serde(default)]
    pub auto_start_next: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    /// Path to the sound played when a run completes (optional).
    #[serde(default)]
    pub sound_file: Option<String>,
    #[serde(default = "default_true")]
    pub popup_enabled: bool,
}

/// Statistics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    #[serde(default = "default_retention_days")]
    pub data_retention_days: u32,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_seconds: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

// Default functions
fn default_timer_types() -> Vec<TimerType> {
    vec![
        TimerType::new(STUDY, "Study", 45 * 60, "#4CAF50"),
        TimerType::new(REST, "Rest", 15 * 60, "#2196F3"),
    ]
}
fn default_current_type() -> String {
    STUDY.into()
}
fn default_color() -> String {
    "#9E9E9E".into()
}
fn default_true() -> bool {
    true
}
fn default_retention_days() -> u32 {
    365
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            types: default_timer_types(),
            current_type: default_current_type(),
            auto_switch: false,
            auto_start_next: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound_file: None,
            popup_enabled: true,
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            data_retention_days: default_retention_days(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { show_seconds: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            notifications: NotificationsConfig::default(),
            statistics: StatisticsConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::MissingKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|e| invalid(e.to_string()))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the data directory, writing defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                info!(path = %path.display(), "configuration loaded");
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                info!(path = %path.display(), "default configuration written");
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    // ── Timer types ──────────────────────────────────────────────────

    pub fn timer_types(&self) -> &[TimerType] {
        &self.timer.types
    }

    pub fn timer_type_by_id(&self, id: &str) -> Option<&TimerType> {
        self.timer.types.iter().find(|t| t.id == id)
    }

    pub fn add_timer_type(&mut self, timer_type: TimerType) -> Result<(), ConfigError> {
        if self.timer_type_by_id(&timer_type.id).is_some() {
            return Err(ConfigError::DuplicateTimerType(timer_type.id));
        }
        self.timer.types.push(timer_type);
        Ok(())
    }

    /// Returns false when no type has this id.
    pub fn update_timer_type(&mut self, id: &str, update: TimerTypeUpdate) -> bool {
        let Some(t) = self.timer.types.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if let Some(name) = update.name {
            t.name = name;
        }
        if let Some(duration) = update.duration {
            t.duration = duration;
        }
        if let Some(color) = update.color {
            t.color = color;
        }
        true
    }

    /// Remove a user-defined type. If it was current, `study` becomes current.
    pub fn remove_timer_type(&mut self, id: &str) -> Result<(), ConfigError> {
        if id == STUDY || id == REST {
            return Err(ConfigError::ProtectedTimerType(id.to_string()));
        }
        self.timer.types.retain(|t| t.id != id);
        if self.timer.current_type == id {
            self.timer.current_type = STUDY.to_string();
        }
        Ok(())
    }

    pub fn current_timer_type(&self) -> Option<&TimerType> {
        self.timer_type_by_id(&self.timer.current_type)
    }

    pub fn set_current_timer_type(&mut self, id: &str) -> Result<(), ConfigError> {
        if self.timer_type_by_id(id).is_none() {
            return Err(ConfigError::UnknownTimerType(id.to_string()));
        }
        self.timer.current_type = id.to_string();
        Ok(())
    }
}

impl SettingsProvider for Config {
    fn get_timer_type(&self, id: &str) -> Option<TimerType> {
        self.timer_type_by_id(id).cloned()
    }

    fn get_flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::AutoSwitch => self.timer.auto_switch,
            Flag::AutoStartNext => self.timer.auto_start_next,
            Flag::SoundEnabled => self.notifications.sound_enabled,
            Flag::PopupEnabled => self.notifications.popup_enabled,
        }
    }

    fn sound_file(&self) -> Option<String> {
        self.notifications.sound_file.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.types.len(), 2);
        assert_eq!(parsed.statistics.data_retention_days, 365);
    }

    #[test]
    fn partial_file_is_merged_over_defaults() {
        let parsed: Config = toml::from_str("[timer]\nauto_switch = true\n").unwrap();
        assert!(parsed.timer.auto_switch);
        assert_eq!(parsed.timer.current_type, "study");
        assert_eq!(parsed.timer_type_by_id("rest").unwrap().duration, 15 * 60);
        assert!(parsed.notifications.sound_enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.auto_switch").as_deref(), Some("false"));
        assert_eq!(cfg.get("timer.current_type").as_deref(), Some("study"));
        assert_eq!(cfg.get("statistics.data_retention_days").as_deref(), Some("365"));
        assert!(cfg.get("ui.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("timer.auto_switch", "true").unwrap();
        cfg.set("statistics.data_retention_days", "30").unwrap();
        cfg.set("notifications.sound_file", "/tmp/bell.wav").unwrap();
        assert!(cfg.timer.auto_switch);
        assert_eq!(cfg.statistics.data_retention_days, 30);
        assert_eq!(cfg.notifications.sound_file.as_deref(), Some("/tmp/bell.wav"));
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("ui.nonexistent_key", "value"),
            Err(ConfigError::MissingKey(_))
        ));
        assert!(matches!(
            cfg.set("ui.show_seconds", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.ui.show_seconds);
    }

    #[test]
    fn add_timer_type_rejects_duplicates() {
        let mut cfg = Config::default();
        cfg.add_timer_type(TimerType::new("reading", "Reading", 1800, "#FF9800"))
            .unwrap();
        let err = cfg
            .add_timer_type(TimerType::new("reading", "Again", 60, "#000000"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTimerType(id) if id == "reading"));
    }

    #[test]
    fn builtin_types_cannot_be_removed() {
        let mut cfg = Config::default();
        assert!(cfg.remove_timer_type("study").is_err());
        assert!(cfg.remove_timer_type("rest").is_err());
        assert_eq!(cfg.timer_types().len(), 2);
    }

    #[test]
    fn removing_current_type_falls_back_to_study() {
        let mut cfg = Config::default();
        cfg.add_timer_type(TimerType::new("reading", "Reading", 1800, "#FF9800"))
            .unwrap();
        cfg.set_current_timer_type("reading").unwrap();
        cfg.remove_timer_type("reading").unwrap();
        assert_eq!(cfg.timer.current_type, "study");
        assert!(cfg.timer_type_by_id("reading").is_none());
    }

    #[test]
    fn update_timer_type_changes_only_given_fields() {
        let mut cfg = Config::default();
        assert!(cfg.update_timer_type(
            "study",
            TimerTypeUpdate {
                duration: Some(25 * 60),
                ..Default::default()
            }
        ));
        let study = cfg.timer_type_by_id("study").unwrap();
        assert_eq!(study.duration, 25 * 60);
        assert_eq!(study.name, "Study");
        assert!(!cfg.update_timer_type("missing", TimerTypeUpdate::default()));
    }

    #[test]
    fn set_current_rejects_unknown() {
        let mut cfg = Config::default();
        assert!(cfg.set_current_timer_type("nap").is_err());
        assert_eq!(cfg.current_timer_type().unwrap().id, "study");
    }

    #[test]
    fn settings_provider_reads_flags() {
        let mut cfg = Config::default();
        cfg.timer.auto_switch = true;
        cfg.notifications.sound_enabled = false;
        assert!(cfg.get_flag(Flag::AutoSwitch));
        assert!(!cfg.get_flag(Flag::AutoStartNext));
        assert!(!cfg.get_flag(Flag::SoundEnabled));
        assert_eq!(cfg.get_timer_type("rest").unwrap().duration, 900);
        assert!(cfg.get_timer_type("nap").is_none());
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.timer.current_type, "study");

        let mut changed = cfg.clone();
        changed.timer.auto_start_next = true;
        changed.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert!(reloaded.timer.auto_start_next);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = 12").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
