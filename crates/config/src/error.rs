use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a config directory for this platform")]
    NoConfigDir,

    #[error("failed to read config file {path:?}: {source}")]
    Read { path: std::path::PathBuf, #[source] source: std::io::Error },

    #[error("failed to write config file {path:?}: {source}")]
    Write { path: std::path::PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse { path: std::path::PathBuf, #[source] source: toml::de::Error },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown config key {0:?}")]
    UnknownKey(String),

    #[error("invalid value {value:?} for key {key:?}: {reason}")]
    InvalidValue { key: String, value: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
