//! TOML-based application configuration.
//!
//! Stores tunables for the device core:
//! - Streak expiry window and milestone cadence
//! - Random unlock defaults
//! - Geofence radius for "nearby" content
//! - Content store endpoint
//! - Message content bounds
//!
//! Configuration is stored at `~/.config/worldping/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Streak engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakConfig {
    /// A streak is lost once this many hours pass without a post.
    #[serde(default = "default_expiry_window_hours")]
    pub expiry_window_hours: u32,
    /// Streak lengths divisible by this are reported as milestones.
    #[serde(default = "default_milestone_every_days")]
    pub milestone_every_days: u32,
}

/// Visibility gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_unlock_count")]
    pub default_unlock_count: u32,
    /// Fixed seed for unlock draws (None = entropy).
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Geofencing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_nearby_radius_km")]
    pub nearby_radius_km: f64,
}

/// Remote content store endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentStoreConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

/// Message drafting limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "default_max_content_len")]
    pub max_content_len: usize,
    #[serde(default = "default_lifetime_hours")]
    pub lifetime_hours: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/worldping/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub content_store: ContentStoreConfig,
    #[serde(default)]
    pub message: MessageConfig,
}

fn default_expiry_window_hours() -> u32 {
    48
}
fn default_milestone_every_days() -> u32 {
    7
}
fn default_unlock_count() -> u32 {
    3
}
fn default_nearby_radius_km() -> f64 {
    5.0
}
fn default_table() -> String {
    "messages".into()
}
fn default_max_content_len() -> usize {
    280
}
fn default_lifetime_hours() -> u32 {
    24
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            expiry_window_hours: default_expiry_window_hours(),
            milestone_every_days: default_milestone_every_days(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_unlock_count: default_unlock_count(),
            rng_seed: None,
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            nearby_radius_km: default_nearby_radius_km(),
        }
    }
}

impl Default for ContentStoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            table: default_table(),
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_content_len: default_max_content_len(),
            lifetime_hours: default_lifetime_hours(),
        }
    }
}

impl StreakConfig {
    pub fn expiry_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.expiry_window_hours))
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let unknown = || invalid("unknown config key".to_string());

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(invalid("config key is empty".to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Unset optionals take whatever JSON the value parses as.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk or write and return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    /// Load from an explicit path, writing defaults there when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a config value by key without saving. Returns error if key is
    /// unknown or the value does not fit the field's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.streak.expiry_window_hours, 48);
        assert_eq!(parsed.gate.default_unlock_count, 3);
        assert!(parsed.gate.rng_seed.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[streak]\nexpiry_window_hours = 12\n").unwrap();
        assert_eq!(parsed.streak.expiry_window_hours, 12);
        assert_eq!(parsed.streak.milestone_every_days, 7);
        assert_eq!(parsed.message.max_content_len, 280);
        assert_eq!(parsed.content_store.table, "messages");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("streak.expiry_window_hours").as_deref(), Some("48"));
        assert_eq!(cfg.get("content_store.table").as_deref(), Some("messages"));
        assert_eq!(cfg.get("gate.rng_seed").as_deref(), Some("null"));
        assert!(cfg.get("streak.missing_key").is_none());
    }

    #[test]
    fn apply_updates_number_and_float() {
        let mut cfg = Config::default();
        cfg.apply("streak.expiry_window_hours", "72").unwrap();
        cfg.apply("geo.nearby_radius_km", "2.5").unwrap();
        assert_eq!(cfg.streak.expiry_window_hours, 72);
        assert_eq!(cfg.geo.nearby_radius_km, 2.5);
    }

    #[test]
    fn apply_fills_unset_optionals() {
        let mut cfg = Config::default();
        cfg.apply("gate.rng_seed", "42").unwrap();
        cfg.apply("content_store.base_url", "https://example.supabase.co").unwrap();
        assert_eq!(cfg.gate.rng_seed, Some(42));
        assert_eq!(
            cfg.content_store.base_url.as_deref(),
            Some("https://example.supabase.co")
        );
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("streak.nonexistent", "1"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.apply("streak.expiry_window_hours", "soon").is_err());
        assert!(cfg.apply("", "1").is_err());
        assert_eq!(cfg.streak.expiry_window_hours, 48);
    }

    #[test]
    fn load_from_writes_defaults_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.streak.expiry_window_hours, 48);
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.apply("streak.expiry_window_hours", "24").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().streak.expiry_window_hours, 24);
    }

    #[test]
    fn load_from_reports_unparseable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "streak = [not toml").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn expiry_window_is_hours() {
        let cfg = StreakConfig::default();
        assert_eq!(cfg.expiry_window(), chrono::Duration::hours(48));
    }
}
