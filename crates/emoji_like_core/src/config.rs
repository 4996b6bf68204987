use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::allow_list::RawId;

/// Live, swappable reaction settings shared by the store, the policy and the
/// commands. Readers call `load()`; writers publish a new copy with `rcu`.
pub type ConfigHandle = Arc<ArcSwap<ReactionConfig>>;

pub fn config_handle(config: ReactionConfig) -> ConfigHandle {
    Arc::new(ArcSwap::from_pointee(config))
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    #[error("time_interval_secs must be a finite, non-negative number, got {0}")]
    InvalidInterval(f64),
    #[error("boom_cd_secs must be greater than zero")]
    ZeroCooldown,
    #[error("command_prefix must be non-empty and must not contain whitespace")]
    InvalidPrefix,
}

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmojiLikeConfig {
    /// Sender ids treated as administrators.
    pub admins: Vec<String>,
    /// Wake prefix for commands, e.g. `/fill`.
    pub command_prefix: String,
    /// Directory holding `special_id_list.json`.
    pub data_dir: PathBuf,
    pub reaction: ReactionConfig,
    pub llm: LlmConfig,
    pub onebot: Option<OneBotConfig>,
}

impl Default for EmojiLikeConfig {
    fn default() -> Self {
        Self {
            admins: vec![],
            command_prefix: "/".to_string(),
            data_dir: PathBuf::from("data"),
            reaction: ReactionConfig::default(),
            llm: LlmConfig::default(),
            onebot: None,
        }
    }
}

impl EmojiLikeConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml(&content)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults with
    /// env overrides. Unreadable, malformed or invalid files are still errors.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("Config file {} not found, using defaults", path.display());
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read config file: {}", path.display())),
        }
    }

    fn from_toml(content: &str) -> Result<Self> {
        let mut config: EmojiLikeConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_prefix.is_empty() || self.command_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidPrefix);
        }
        self.reaction.validate()
    }

    pub fn allow_list_path(&self) -> PathBuf {
        self.data_dir.join(crate::allow_list::ALLOW_LIST_FILE)
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("EMOJI_LIKE_ADMINS") {
            self.admins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(v) = std::env::var("EMOJI_LIKE_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        // OneBot env overrides
        if let Ok(url) = std::env::var("ONEBOT_WS_URL") {
            let token = std::env::var("ONEBOT_ACCESS_TOKEN").ok();
            self.onebot = Some(OneBotConfig {
                ws_url: url,
                access_token: token,
            });
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Tunables of the reaction behaviour. Also carries the mirrored allow-list
/// so that anything inspecting the live config sees the current members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    /// Chance of classifying an ordinary group message.
    pub normal_analysis_prob: f64,
    /// Chance of classifying a message that starts with an @mention; also the
    /// reaction chance for allow-listed senders.
    pub at_analysis_prob: f64,
    /// Only react to allow-listed senders.
    pub only_list_mode: bool,
    /// Default count for `/fill`.
    pub default_emoji_num: i64,
    /// Pause between consecutive reaction calls.
    pub time_interval_secs: f64,
    /// Per-sender cooldown of `/boom`.
    pub boom_cd_secs: u64,
    /// Legacy location of the allow-list, kept in sync as a mirror.
    #[serde(deserialize_with = "lenient_ids")]
    pub special_id_list: Vec<String>,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            normal_analysis_prob: 0.01,
            at_analysis_prob: 0.1,
            only_list_mode: true,
            default_emoji_num: 20,
            time_interval_secs: 0.2,
            boom_cd_secs: 60,
            special_id_list: vec![],
        }
    }
}

impl ReactionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("normal_analysis_prob", self.normal_analysis_prob),
            ("at_analysis_prob", self.at_analysis_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }
        if !self.time_interval_secs.is_finite() || self.time_interval_secs < 0.0 {
            return Err(ConfigError::InvalidInterval(self.time_interval_secs));
        }
        if self.boom_cd_secs == 0 {
            return Err(ConfigError::ZeroCooldown);
        }
        Ok(())
    }

    pub fn time_interval(&self) -> Duration {
        Duration::from_secs_f64(self.time_interval_secs.max(0.0))
    }

    pub fn boom_cooldown(&self) -> Duration {
        Duration::from_secs(self.boom_cd_secs)
    }
}

fn lenient_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Vec::<RawId>::deserialize(deserializer)?;
    Ok(raw.into_iter().filter_map(RawId::normalize).collect())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" (any OpenAI-compatible endpoint) or "mock".
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            max_tokens: 64,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneBotConfig {
    pub ws_url: String,
    pub access_token: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
