//! Transport module: the Telegram operations the interaction flow needs,
//! and their teloxide-backed implementation

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardMarkup, InputFile, InputSticker, StickerFormat};
use tracing::debug;

use crate::dialogue::MessageRef;
use crate::errors::PlatformError;
use crate::pack_registry::PackStore;
use crate::sticker_image::StickerAsset;

/// Messaging operations used by the interaction flow
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: String) -> Result<MessageRef, PlatformError>;

    /// Replace the text of a message, optionally attaching choice buttons
    async fn edit_text(
        &self,
        message: MessageRef,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), PlatformError>;

    /// Download the bytes of a file the user sent
    async fn download(&self, file_id: FileId) -> Result<Vec<u8>, PlatformError> {
        let file = self.bot.get_file(file_id).await?;

        // The file URL embeds the bot token, teloxide keeps it out of errors
        let mut bytes = Vec::new();
        self.bot.download_file(&file.path, &mut bytes).await?;
        debug!(bytes = bytes.len(), "File downloaded");
        Ok(bytes)
    }
}

#[async_trait]
impl PackStore for TelegramApi {
    async fn bot_username(&self) -> Result<String, PlatformError> {
        let me = self.bot.get_me().await?;
        me.user
            .username
            .clone()
            .ok_or_else(|| PlatformError::Api("bot account has no username".to_string()))
    }

    async fn fetch_pack(&self, name: &str) -> Result<(), PlatformError> {
        self.bot.get_sticker_set(name).await?;
        Ok(())
    }

    async fn create_pack(
        &self,
        owner: UserId,
        name: &str,
        title: &str,
        sticker: StickerAsset,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.bot
            .create_new_sticker_set(owner, name, title, vec![Self::input_sticker(sticker, emoji)])
            .await?;
        Ok(())
    }

    async fn add_to_pack(
        &self,
        owner: UserId,
        name: &str,
        sticker: StickerAsset,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.bot
            .add_sticker_to_set(owner, name, Self::input_sticker(sticker, emoji))
            .await?;
        Ok(())
    }
}
