//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.charla/config.json`) and
//! environment. Everything the session needs is constructed from here at
//! startup; business logic never reads ambient state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::lang::Language;

/// Top-level widget config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Remote chat backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Branding and palette shown by the widget.
    #[serde(default)]
    pub visual: VisualConfig,

    /// Storefront domain used to request a guest token (e.g. "my-shop.example.com").
    #[serde(default)]
    pub shop_domain: Option<String>,
}

/// Remote chat backend: base URL, api key, and request timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the chat service (default the hosted endpoint).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Merchant api key sent as x-api-key. Overridden by CHARLA_API_KEY env.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds (default 10). Keeps a dead backend from
    /// pinning the session in its loading state.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://desarrollosfutura.com:5001/chat".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Branding and palette. Read-only to the session core; only text substitution
/// uses it there, the rest parameterizes whatever front end renders the chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualConfig {
    /// Display name of the bot (default "uChatBot").
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Icon shown on the floating button and header.
    #[serde(default)]
    pub icon_url: Option<String>,

    /// Color palette for the rendered widget.
    #[serde(default)]
    pub colors: ColorPalette,

    /// Default display language when the user has not picked one.
    #[serde(default)]
    pub language: Language,

    /// Merchant's privacy policy link for the footer notice.
    #[serde(default)]
    pub privacy_policy_url: Option<String>,
}

fn default_bot_name() -> String {
    "uChatBot".to_string()
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            icon_url: None,
            colors: ColorPalette::default(),
            language: Language::default(),
            privacy_policy_url: None,
        }
    }
}

/// Widget color palette, mirroring the admin-side config object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPalette {
    pub chat_bg: Option<String>,
    pub chat_text: Option<String>,
    pub header_bg: Option<String>,
    pub header_text: Option<String>,
    pub button_bg: Option<String>,
    pub button_text: Option<String>,
    pub input_bg: Option<String>,
    pub input_border: Option<String>,
    pub input_text: Option<String>,
    pub input_wrapper_bg: Option<String>,
    pub privacy_bg: Option<String>,
    pub privacy_text: Option<String>,
}

/// Resolve the api key: env CHARLA_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var("CHARLA_API_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .backend
                .api_key
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CHARLA_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".charla").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Default path of the persisted widget state, next to the config file.
pub fn default_state_path(config_path: &std::path::Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."))
        .join("state.json")
}

/// Load config from the default path (or CHARLA_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving sibling files).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
