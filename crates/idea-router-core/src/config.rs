//! Runtime configuration.
//!
//! Configuration is read once at startup into an [`AppConfig`] that is passed
//! explicitly to every component. Values come from the environment, which the
//! binary first populates from `.env.local` files via `dotenvy`.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//!
//! Optional:
//! - `OPENAI_API_KEY`: Completion and transcription key (degraded mode if unset)
//! - `OPENAI_BASE_URL`: OpenAI-compatible API base (default: `https://api.openai.com/v1`)
//! - `OPENAI_MODEL`: Completion model (default: `gpt-4o-mini`)
//! - `GOOGLE_SCRIPT_URL`: Spreadsheet endpoint
//! - `BITRIX_WEBHOOK_URL`: Task-tracker webhook base URL
//! - `PUBLIC_URL` / `RENDER_EXTERNAL_URL`: Public base URL for webhook mode
//! - `PORT`: Webhook listen port (default: 8443)
//! - `IDEA_ROUTER_CLASSIFY`, `IDEA_ROUTER_ACK`: Feature toggles (default: true)
//! - `IDEA_ROUTER_RULES`: Path to a JSON classifier rules file
//! - `COMPLETION_TIMEOUT_SECS`, `SINK_TIMEOUT_SECS`: Request timeouts
//! - `IDEA_ROUTER_STATE_DIR`: Override the base state directory

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::classifier::ClassifierRules;
use crate::error::{ConfigError, Result};

/// Environment variable for a custom state directory.
pub const STATE_DIR_ENV: &str = "IDEA_ROUTER_STATE_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".idea-router";

/// Default OpenAI-compatible API base.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default webhook port.
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

const DEFAULT_MAX_TOKENS: u32 = 600;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SINK_TIMEOUT_SECS: u64 = 10;

/// Get the base state directory.
///
/// 1. `IDEA_ROUTER_STATE_DIR` if set
/// 2. `~/.idea-router` if the home directory is known
/// 3. `.idea-router` in the current directory
pub fn state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
        })
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join("config")
}

/// Get the `.env.local` file holding secrets.
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Completion service settings.
#[derive(Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_COMPLETION_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything the bot needs, built once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    pub completion: CompletionConfig,
    pub spreadsheet_url: Option<String>,
    pub task_tracker_url: Option<String>,
    pub public_url: Option<String>,
    pub webhook_port: u16,
    pub sink_timeout: Duration,
    pub classify: bool,
    pub acknowledge: bool,
    pub rules_path: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram_token", &"<redacted>")
            .field("completion", &self.completion)
            .field("spreadsheet_url", &self.spreadsheet_url)
            .field("task_tracker_url", &self.task_tracker_url)
            .field("public_url", &self.public_url)
            .field("webhook_port", &self.webhook_port)
            .field("sink_timeout", &self.sink_timeout)
            .field("classify", &self.classify)
            .field("acknowledge", &self.acknowledge)
            .field("rules_path", &self.rules_path)
            .finish()
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token =
            get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let completion = CompletionConfig {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(parse_or(
                "COMPLETION_TIMEOUT_SECS",
                get("COMPLETION_TIMEOUT_SECS"),
                DEFAULT_COMPLETION_TIMEOUT_SECS,
            )?),
        };

        Ok(Self {
            telegram_token,
            completion,
            spreadsheet_url: get("GOOGLE_SCRIPT_URL"),
            task_tracker_url: get("BITRIX_WEBHOOK_URL").map(|u| u.trim_end_matches('/').to_string()),
            public_url: get("PUBLIC_URL")
                .or_else(|| get("RENDER_EXTERNAL_URL"))
                .map(|u| u.trim_end_matches('/').to_string()),
            webhook_port: parse_or("PORT", get("PORT"), DEFAULT_WEBHOOK_PORT)?,
            sink_timeout: Duration::from_secs(parse_or(
                "SINK_TIMEOUT_SECS",
                get("SINK_TIMEOUT_SECS"),
                DEFAULT_SINK_TIMEOUT_SECS,
            )?),
            classify: parse_flag("IDEA_ROUTER_CLASSIFY", get("IDEA_ROUTER_CLASSIFY"), true)?,
            acknowledge: parse_flag("IDEA_ROUTER_ACK", get("IDEA_ROUTER_ACK"), true)?,
            rules_path: get("IDEA_ROUTER_RULES").map(PathBuf::from),
        })
    }

    /// Load the classifier rules, from file if one is configured.
    pub fn classifier_rules(&self) -> Result<ClassifierRules> {
        match &self.rules_path {
            Some(path) => ClassifierRules::from_file(path),
            None => Ok(ClassifierRules::default()),
        }
    }

    /// Whether a completion API key is available.
    pub fn has_completion(&self) -> bool {
        self.completion.api_key.is_some()
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
        None => Ok(default),
    }
}

fn parse_flag(name: &'static str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_token_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.telegram_token, "123:abc");
        assert!(config.completion.api_key.is_none());
        assert!(!config.has_completion());
        assert_eq!(config.completion.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.completion.model, DEFAULT_MODEL);
        assert_eq!(config.completion.max_tokens, 600);
        assert_eq!(config.webhook_port, DEFAULT_WEBHOOK_PORT);
        assert_eq!(config.sink_timeout, Duration::from_secs(10));
        assert!(config.spreadsheet_url.is_none());
        assert!(config.task_tracker_url.is_none());
        assert!(config.classify);
        assert!(config.acknowledge);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GOOGLE_SCRIPT_URL", "  "),
            ("OPENAI_API_KEY", ""),
        ])
        .unwrap();
        assert!(config.spreadsheet_url.is_none());
        assert!(config.completion.api_key.is_none());
    }

    #[test]
    fn test_sinks_and_public_url() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GOOGLE_SCRIPT_URL", "https://script.example/exec"),
            ("BITRIX_WEBHOOK_URL", "https://crm.example/rest/1/key/"),
            ("RENDER_EXTERNAL_URL", "https://bot.example/"),
            ("PORT", "5000"),
        ])
        .unwrap();
        assert_eq!(config.spreadsheet_url.as_deref(), Some("https://script.example/exec"));
        assert_eq!(config.task_tracker_url.as_deref(), Some("https://crm.example/rest/1/key"));
        assert_eq!(config.public_url.as_deref(), Some("https://bot.example"));
        assert_eq!(config.webhook_port, 5000);
    }

    #[test]
    fn test_public_url_prefers_explicit() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("PUBLIC_URL", "https://a.example"),
            ("RENDER_EXTERNAL_URL", "https://b.example"),
        ])
        .unwrap();
        assert_eq!(config.public_url.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("TELEGRAM_BOT_TOKEN", "t"), ("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_flags() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("IDEA_ROUTER_CLASSIFY", "off"),
            ("IDEA_ROUTER_ACK", "FALSE"),
        ])
        .unwrap();
        assert!(!config.classify);
        assert!(!config.acknowledge);

        let err = config_from(&[("TELEGRAM_BOT_TOKEN", "t"), ("IDEA_ROUTER_ACK", "maybe")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "IDEA_ROUTER_ACK", .. }));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "secret-token"),
            ("OPENAI_API_KEY", "sk-secret"),
        ])
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_default_rules_without_path() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "t")]).unwrap();
        assert_eq!(config.classifier_rules().unwrap(), ClassifierRules::default());
    }

    #[test]
    fn test_env_file_name() {
        assert!(env_file().ends_with(".env.local"));
        assert!(config_dir().ends_with("config"));
    }
}
