//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$NRVE_CONFIG` environment variable
//! 2. `~/.config/nrve/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use nrve_chat::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use nrve_chat::{ChatSettings, ContextLimits, GeminiModel};
use nrve_core::LanguageModel;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub chat: ChatConfig,
}

/// Database storage settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path. Default: platform-specific data dir.
    pub path: Option<String>,
}

/// HTTP API settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Overridden by `$PORT` when set.
    pub port: u16,
}

/// Language model settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

/// Chat context and failure handling.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Extra model attempts after a failure. 0 = fail straight to a canned reply.
    pub max_retries: u32,
    pub match_limit: usize,
    pub recent_limit: usize,
    pub excerpt_chars: usize,
}

// --- Defaults ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 4000,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key_env: "GEMINI_API_KEY".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        let limits = ContextLimits::default();
        Self {
            max_retries: 0,
            match_limit: limits.match_limit,
            recent_limit: limits.recent_limit,
            excerpt_chars: limits.excerpt_chars,
        }
    }
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.port)
    }
}

impl ModelConfig {
    /// Build the model client, or `None` when no API key is available.
    pub fn build(&self) -> Option<Arc<dyn LanguageModel>> {
        let key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        let Some(key) = key else {
            tracing::warn!(
                "{} not set; chat will answer with canned replies",
                self.api_key_env
            );
            return None;
        };
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiModel::new(
            key,
            self.model.clone(),
            self.endpoint.clone(),
            Duration::from_secs(self.timeout_secs),
        ));
        Some(model)
    }
}

impl ChatConfig {
    pub fn settings(&self) -> ChatSettings {
        ChatSettings {
            context: ContextLimits {
                match_limit: self.match_limit,
                recent_limit: self.recent_limit,
                excerpt_chars: self.excerpt_chars,
            },
            max_retries: self.max_retries,
        }
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("NRVE_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Some(home) = dirs_home() {
        let p = home.join(".config").join("nrve").join("config.toml");
        return Some(p);
    }

    None
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Show the active config path (for `nrve config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
