//! # Pack Registry Module
//!
//! Knows the name of the shared sticker pack and decides whether a new sticker
//! creates the pack or is appended to it.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::types::UserId;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::{PackConfig, PackIdentitySource};
use crate::errors::{PlatformError, StickerError};
use crate::retry::{retry, RetryPolicy};
use crate::sticker_image::StickerAsset;

pub const PACK_LINK_BASE: &str = "https://t.me/addstickers/";
pub const MAX_PACK_NAME_LEN: usize = 64;

/// The sticker-set operations of the Bot API the registry relies on
#[async_trait]
pub trait PackStore: Send + Sync {
    /// Username of the bot account itself
    async fn bot_username(&self) -> Result<String, PlatformError>;

    /// `Ok(())` if the set exists, `PlatformError::NotFound` if it does not
    async fn fetch_pack(&self, name: &str) -> Result<(), PlatformError>;

    async fn create_pack(
        &self,
        owner: UserId,
        name: &str,
        title: &str,
        sticker: StickerAsset,
        emoji: &str,
    ) -> Result<(), PlatformError>;

    async fn add_to_pack(
        &self,
        owner: UserId,
        name: &str,
        sticker: StickerAsset,
        emoji: &str,
    ) -> Result<(), PlatformError>;
}

/// How a sticker ended up in the pack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Created,
    Appended,
}

/// Build the dynamic pack name for a bot
pub fn derive_pack_name(prefix: &str, bot_username: &str) -> String {
    format!("{prefix}_by_{bot_username}").to_lowercase()
}

/// Shareable link of a pack
pub fn pack_link(name: &str) -> String {
    format!("{PACK_LINK_BASE}{name}")
}

/// Telegram's rules for sticker set names created by a bot
pub fn is_valid_pack_name(name: &str, bot_username: &str) -> bool {
    let suffix = format!("_by_{}", bot_username.to_lowercase());
    !name.is_empty()
        && name.len() <= MAX_PACK_NAME_LEN
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.contains("__")
        && name.to_lowercase().ends_with(&suffix)
}

/// Publishes stickers into the shared pack
pub struct PackRegistry {
    store: Arc<dyn PackStore>,
    config: PackConfig,
    identity: OnceCell<String>,
}

impl PackRegistry {
    pub fn new(store: Arc<dyn PackStore>, config: PackConfig) -> Self {
        Self {
            store,
            config,
            identity: OnceCell::new(),
        }
    }

    /// Resolve the pack name once and cache it.
    ///
    /// Concurrent first calls wait for the same resolution. A failed
    /// resolution is not cached, so the next call asks Telegram again.
    pub async fn identity(&self) -> Result<&str, StickerError> {
        let name = self
            .identity
            .get_or_try_init(|| async {
                match &self.config.identity {
                    PackIdentitySource::Static(name) => Ok::<_, StickerError>(name.clone()),
                    PackIdentitySource::Derived { prefix } => {
                        let username = self
                            .store
                            .bot_username()
                            .await
                            .map_err(|e| StickerError::Connectivity(e.to_string()))?;
                        let name = derive_pack_name(prefix, &username);
                        info!(pack = %name, "Derived sticker pack name");
                        Ok(name)
                    }
                }
            })
            .await?;
        Ok(name.as_str())
    }

    /// Resolve the pack name at startup, retrying per `policy`.
    ///
    /// Derived names need the bot username and fetch it through `identity`.
    /// A static name only asks for it to check the name against Telegram's
    /// rules, so startup queries the bot account once in either case.
    pub async fn bootstrap(&self, policy: &RetryPolicy) -> Result<String, StickerError> {
        let name = retry(policy, "resolve sticker pack", || self.identity())
            .await?
            .to_string();

        if let PackIdentitySource::Static(static_name) = &self.config.identity {
            let username = retry(policy, "get bot info", || self.store.bot_username())
                .await
                .map_err(|e| StickerError::Connectivity(e.to_string()))?;
            if !is_valid_pack_name(static_name, &username) {
                warn!(pack = %static_name, "Configured pack name does not follow Telegram's rules, creating it will fail");
            }
        }

        info!(pack = %name, "Using sticker pack");
        Ok(name)
    }

    /// Link to the pack, resolving its name if needed
    pub async fn share_link(&self) -> Result<String, StickerError> {
        Ok(pack_link(self.identity().await?))
    }

    /// Best-effort existence check.
    ///
    /// Any failure other than "not found" is logged and reported as missing,
    /// the create branch then copes with a pack that does exist.
    pub async fn exists(&self, name: &str) -> bool {
        match self.store.fetch_pack(name).await {
            Ok(()) => true,
            Err(PlatformError::NotFound(_)) => false,
            Err(e) => {
                warn!(pack = %name, error = %e, "Could not check sticker pack, assuming it is missing");
                false
            }
        }
    }

    /// Add the sticker to the pack, creating the pack on first use
    pub async fn publish(&self, sticker: StickerAsset) -> Result<PublishOutcome, StickerError> {
        let name = self.identity().await?.to_string();
        let PackConfig {
            title, emoji, owner, ..
        } = &self.config;

        if self.exists(&name).await {
            debug!(pack = %name, "Appending sticker to existing pack");
            self.store
                .add_to_pack(*owner, &name, sticker, emoji)
                .await
                .map_err(|e| StickerError::Publish(e.to_string()))?;
            return Ok(PublishOutcome::Appended);
        }

        debug!(pack = %name, "Creating sticker pack");
        match self
            .store
            .create_pack(*owner, &name, title, sticker.clone(), emoji)
            .await
        {
            Ok(()) => {
                info!(pack = %name, "Sticker pack created");
                Ok(PublishOutcome::Created)
            }
            Err(PlatformError::AlreadyExists(reason)) => {
                warn!(pack = %name, reason = %reason, "Pack appeared meanwhile, appending instead");
                self.store
                    .add_to_pack(*owner, &name, sticker, emoji)
                    .await
                    .map_err(|e| StickerError::Publish(e.to_string()))?;
                Ok(PublishOutcome::Appended)
            }
            Err(e) => Err(StickerError::Publish(e.to_string())),
        }
    }
}
