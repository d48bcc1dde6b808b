use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// On-disk overlay for [`crate::Settings`]. Every field is optional: an
/// absent field means "fall back to the environment variable, then the
/// built-in default" (spec.md §6). Written and read by the CLI's
/// `config show|set|reset|open` surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub bot_token: Option<String>,
    pub tz: Option<String>,
    pub metro_db_path: Option<String>,
    pub user_data_db_path: Option<String>,
    pub admin_user_id: Option<i64>,
    pub enable_user_data: Option<bool>,
    pub enable_analytics: Option<bool>,
    pub analytics_salt: Option<String>,
}

/// The 8 keys `config show`/`config set` understand, in display order.
pub const KEYS: [&str; 8] = [
    "bot_token",
    "tz",
    "metro_db_path",
    "user_data_db_path",
    "admin_user_id",
    "enable_user_data",
    "enable_analytics",
    "analytics_salt",
];

impl ConfigFile {
    /// Reads the config file at `path`, or returns the default (empty)
    /// overlay if it doesn't exist yet — a missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }

    /// Renders one key's current value for `config show`, or `None` if
    /// unset.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "bot_token" => self.bot_token.clone(),
            "tz" => self.tz.clone(),
            "metro_db_path" => self.metro_db_path.clone(),
            "user_data_db_path" => self.user_data_db_path.clone(),
            "admin_user_id" => self.admin_user_id.map(|v| v.to_string()),
            "enable_user_data" => self.enable_user_data.map(|v| v.to_string()),
            "enable_analytics" => self.enable_analytics.map(|v| v.to_string()),
            "analytics_salt" => self.analytics_salt.clone(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Parses and stores `value` under `key` for `config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bot_token" => self.bot_token = Some(value.to_string()),
            "tz" => self.tz = Some(value.to_string()),
            "metro_db_path" => self.metro_db_path = Some(value.to_string()),
            "user_data_db_path" => self.user_data_db_path = Some(value.to_string()),
            "admin_user_id" => self.admin_user_id = Some(parse_field(key, value, |v| v.parse().ok())?),
            "enable_user_data" => self.enable_user_data = Some(parse_bool(key, value)?),
            "enable_analytics" => self.enable_analytics = Some(parse_bool(key, value)?),
            "analytics_salt" => self.analytics_salt = Some(value.to_string()),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn parse_field<T>(key: &str, value: &str, parse: impl FnOnce(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "not a valid integer",
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true/false, yes/no, 1/0, or on/off",
        }),
    }
}

/// `$XDG_CONFIG_HOME/kharkiv-metro/config.toml` (or the platform equivalent
/// `dirs::config_dir` resolves to).
pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join("kharkiv-metro").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let mut file = ConfigFile::default();
        file.set("tz", "Europe/Kyiv").unwrap();
        file.set("admin_user_id", "42").unwrap();
        file.set("enable_analytics", "yes").unwrap();

        let dir = std::env::temp_dir().join(format!("kharkiv-metro-config-test-{}", std::process::id()));
        let path = dir.join("config.toml");
        file.save(&path).unwrap();
        let loaded = ConfigFile::load(&path).unwrap();

        assert_eq!(loaded.tz.as_deref(), Some("Europe/Kyiv"));
        assert_eq!(loaded.admin_user_id, Some(42));
        assert_eq!(loaded.enable_analytics, Some(true));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn loading_a_missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("kharkiv-metro-config-test-missing-12345.toml");
        std::fs::remove_file(&path).ok();
        let file = ConfigFile::load(&path).unwrap();
        assert!(file.tz.is_none());
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_booleans() {
        let mut file = ConfigFile::default();
        assert!(file.set("not_a_real_key", "x").is_err());
        assert!(file.set("enable_analytics", "maybe").is_err());
    }
}
