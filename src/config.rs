use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::persona;
use crate::state::PartialReplyPolicy;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Environment variables checked for the API key, in order
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    pub partial_reply_policy: PartialReplyPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

/// Where the API key came from (the key itself is never logged)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Env(&'static str),
    ConfigFile,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Env(var) => write!(f, "env:{}", var),
            KeySource::ConfigFile => write!(f, "config"),
        }
    }
}

/// Fully resolved startup settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub key_source: KeySource,
    pub model: String,
    pub base_url: String,
    pub system_instruction: String,
    pub partial_reply_policy: PartialReplyPolicy,
    pub connect_timeout: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDir)?;
        Ok(config_dir.join("cecilia").join("config.json"))
    }

    /// Combine the file with the process environment.
    pub fn resolve(self, path: &Path) -> Result<Settings, ConfigError> {
        self.resolve_with(path, |var| std::env::var(var).ok())
    }

    /// Like [`Config::resolve`], with environment lookups supplied by the caller.
    pub fn resolve_with(
        self,
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError> {
        let from_env = API_KEY_VARS.iter().find_map(|&var| {
            env(var)
                .filter(|key| !key.trim().is_empty())
                .map(|key| (key, KeySource::Env(var)))
        });

        let (api_key, key_source) = from_env
            .or_else(|| {
                self.api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
                    .map(|key| (key, KeySource::ConfigFile))
            })
            .ok_or_else(|| ConfigError::MissingApiKey(path.to_path_buf()))?;

        Ok(Settings {
            api_key,
            key_source,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            system_instruction: self
                .system_instruction
                .unwrap_or_else(|| persona::SYSTEM_INSTRUCTION.to_string()),
            partial_reply_policy: self.partial_reply_policy,
            connect_timeout: Duration::from_secs(
                self.connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            model: Some("gemini-2.5-pro".to_string()),
            partial_reply_policy: PartialReplyPolicy::Keep,
            ..Config::new()
        };

        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"partial_reply_policy": "keep"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.partial_reply_policy, PartialReplyPolicy::Keep);
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let path = PathBuf::from("/tmp/cecilia/config.json");
        let result = Config::new().resolve_with(&path, no_env);
        assert!(matches!(result, Err(ConfigError::MissingApiKey(p)) if p == path));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..Config::new()
        };
        let result = config.resolve_with(Path::new("c.json"), |_| Some(String::new()));
        assert!(matches!(result, Err(ConfigError::MissingApiKey(_))));
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::new()
        };
        let settings = config
            .resolve_with(Path::new("c.json"), |var| {
                (var == "API_KEY").then(|| "from-env".to_string())
            })
            .unwrap();

        assert_eq!(settings.api_key, "from-env");
        assert_eq!(settings.key_source, KeySource::Env("API_KEY"));
    }

    #[test]
    fn test_gemini_var_checked_first() {
        let settings = Config::new()
            .resolve_with(Path::new("c.json"), |var| Some(format!("{}-value", var)))
            .unwrap();
        assert_eq!(settings.api_key, "GEMINI_API_KEY-value");
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config {
            api_key: Some("k".to_string()),
            ..Config::new()
        };
        let settings = config.resolve_with(Path::new("c.json"), no_env).unwrap();

        assert_eq!(settings.key_source, KeySource::ConfigFile);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.system_instruction, persona::SYSTEM_INSTRUCTION);
        assert_eq!(settings.partial_reply_policy, PartialReplyPolicy::Discard);
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
    }
}
