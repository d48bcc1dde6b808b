use std::env;
use std::path::PathBuf;

use crate::error::Result;
use crate::file::{default_config_path, ConfigFile};

const DEFAULT_TZ: &str = "Europe/Kyiv";

/// Fully resolved runtime configuration: environment variables win, then the
/// on-disk [`ConfigFile`], then the built-in default (spec.md §6).
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: Option<String>,
    pub tz: String,
    pub metro_db_path: PathBuf,
    pub user_data_db_path: PathBuf,
    pub admin_user_id: Option<i64>,
    pub enable_user_data: bool,
    pub enable_analytics: bool,
    pub analytics_salt: Option<String>,
}

impl Settings {
    /// Loads the on-disk overlay from its default XDG location and resolves
    /// it against the process environment.
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        let file = ConfigFile::load(&path)?;
        Ok(Self::resolve(&file))
    }

    /// Resolves settings from an already-loaded overlay, without touching
    /// disk. Exposed separately so callers that already hold a `ConfigFile`
    /// (e.g. the `config show` command) don't read it twice.
    pub fn resolve(file: &ConfigFile) -> Self {
        let data_root = dirs::data_dir().unwrap_or_else(env::temp_dir).join("kharkiv-metro");

        Self {
            bot_token: env_string("BOT_TOKEN").or_else(|| file.bot_token.clone()),
            tz: env_string("TZ").or_else(|| file.tz.clone()).unwrap_or_else(|| DEFAULT_TZ.to_string()),
            metro_db_path: env_string("METRO_DB_PATH")
                .or_else(|| file.metro_db_path.clone())
                .map(PathBuf::from)
                .unwrap_or_else(|| data_root.join("metro.sqlite3")),
            user_data_db_path: env_string("USER_DATA_DB_PATH")
                .or_else(|| file.user_data_db_path.clone())
                .map(PathBuf::from)
                .unwrap_or_else(|| data_root.join("user_data.sqlite3")),
            admin_user_id: env_parsed("ADMIN_USER_ID").or(file.admin_user_id),
            enable_user_data: env_bool("ENABLE_USER_DATA").or(file.enable_user_data).unwrap_or(true),
            enable_analytics: env_bool("ENABLE_ANALYTICS").or(file.enable_analytics).unwrap_or(false),
            analytics_salt: env_string("ANALYTICS_SALT").or_else(|| file.analytics_salt.clone()),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    env_string(name).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// These env vars may already be set in a developer's shell (`TZ`
    /// especially); both tests below depend on the environment being clear
    /// of the settings they're exercising so the config-file/default layers
    /// actually get to speak.
    fn clear_relevant_env() {
        for name in ["BOT_TOKEN", "TZ", "METRO_DB_PATH", "USER_DATA_DB_PATH", "ADMIN_USER_ID", "ENABLE_USER_DATA", "ENABLE_ANALYTICS", "ANALYTICS_SALT"] {
            env::remove_var(name);
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        clear_relevant_env();
        let settings = Settings::resolve(&ConfigFile::default());
        assert_eq!(settings.tz, DEFAULT_TZ);
        assert!(settings.enable_user_data);
        assert!(!settings.enable_analytics);
        assert!(settings.bot_token.is_none());
    }

    #[test]
    fn config_file_values_are_used_when_env_is_absent() {
        clear_relevant_env();
        let mut file = ConfigFile::default();
        file.tz = Some("Europe/Warsaw".to_string());
        file.enable_analytics = Some(true);
        let settings = Settings::resolve(&file);
        assert_eq!(settings.tz, "Europe/Warsaw");
        assert!(settings.enable_analytics);
    }
}
