//! # Configuration Module
//!
//! Reads the bot configuration from environment variables (a `.env` file is
//! loaded by `main` beforehand). Parsing goes through a lookup function so the
//! rules can be exercised without touching the process environment.

use std::time::Duration;

use teloxide::types::UserId;

use crate::errors::ConfigError;

pub const DEFAULT_PACK_PREFIX: &str = "funstickers";
pub const DEFAULT_PACK_TITLE: &str = "Shared Sticker Pack";
pub const DEFAULT_STICKER_EMOJI: &str = "⭐";
pub const DEFAULT_BACKGROUND_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 15 * 60;

/// How the pack name is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackIdentitySource {
    /// Used verbatim
    Static(String),
    /// `{prefix}_by_{bot username}`, lowercased
    Derived { prefix: String },
}

/// Everything needed to create or extend the shared pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    pub identity: PackIdentitySource,
    pub title: String,
    pub emoji: String,
    /// Telegram user the pack belongs to
    pub owner: UserId,
}

/// Background removal backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundRemoval {
    /// remove.bg HTTP API
    RemoveBg { api_key: String },
    /// Self-hosted rembg server running the model locally
    Rembg { url: String },
    /// Keep the original background
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundConfig {
    pub removal: BackgroundRemoval,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub bot_token: String,
    pub pack: PackConfig,
    pub background: BackgroundConfig,
    /// `None` keeps pending sessions until they are answered
    pub session_ttl: Option<Duration>,
}

impl BotConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let owner_raw = get("OWNER_USER_ID").ok_or(ConfigError::Missing("OWNER_USER_ID"))?;
        let owner = owner_raw
            .parse::<u64>()
            .map(UserId)
            .map_err(|e| ConfigError::Invalid {
                key: "OWNER_USER_ID",
                reason: e.to_string(),
            })?;

        let identity = match get("STICKER_PACK_NAME") {
            Some(name) => PackIdentitySource::Static(name),
            None => PackIdentitySource::Derived {
                prefix: get("STICKER_PACK_PREFIX").unwrap_or_else(|| DEFAULT_PACK_PREFIX.to_string()),
            },
        };

        let pack = PackConfig {
            identity,
            title: get("STICKER_PACK_TITLE").unwrap_or_else(|| DEFAULT_PACK_TITLE.to_string()),
            emoji: get("STICKER_EMOJI").unwrap_or_else(|| DEFAULT_STICKER_EMOJI.to_string()),
            owner,
        };

        let api_key = get("REMOVE_BG_API_KEY");
        let rembg_url = get("REMBG_URL");
        let removal = match get("BACKGROUND_REMOVER").map(|v| v.to_lowercase()).as_deref() {
            Some("removebg") => BackgroundRemoval::RemoveBg {
                api_key: api_key.ok_or(ConfigError::Missing("REMOVE_BG_API_KEY"))?,
            },
            Some("rembg") => BackgroundRemoval::Rembg {
                url: rembg_url.ok_or(ConfigError::Missing("REMBG_URL"))?,
            },
            Some("none") => BackgroundRemoval::Disabled,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "BACKGROUND_REMOVER",
                    reason: format!("unknown backend '{other}', expected removebg, rembg or none"),
                })
            }
            None => match (api_key, rembg_url) {
                (Some(api_key), _) => BackgroundRemoval::RemoveBg { api_key },
                (None, Some(url)) => BackgroundRemoval::Rembg { url },
                (None, None) => BackgroundRemoval::Disabled,
            },
        };

        let background = BackgroundConfig {
            removal,
            timeout: Duration::from_secs(parse_secs(
                &get,
                "BACKGROUND_TIMEOUT_SECS",
                DEFAULT_BACKGROUND_TIMEOUT_SECS,
            )?),
        };

        let ttl_secs = parse_secs(&get, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        let session_ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));

        Ok(Self {
            bot_token,
            pack,
            background,
            session_ttl,
        })
    }
}

fn parse_secs<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
