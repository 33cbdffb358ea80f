//! Sticker flow: photo → scaling mode → published sticker.
//!
//! The flow owns the conversation sessions and is the only place that
//! changes them. Every path that ends a request leaves the conversation idle.

use std::sync::Arc;

use anyhow::Result;
use teloxide::types::{ChatId, FileId};
use tracing::{debug, error, info, warn};

use crate::dialogue::{ChoiceLookup, ConversationId, MessageRef, SessionStore};
use crate::errors::StickerError;
use crate::localization::{t_args_lang, t_lang};
use crate::pack_registry::PackRegistry;
use crate::sticker_image::{ScaleMode, StickerNormalizer};

use super::transport::Messenger;
use super::ui_builder::{create_mode_keyboard, format_error, format_success};

pub struct StickerFlow {
    messenger: Arc<dyn Messenger>,
    normalizer: StickerNormalizer,
    registry: Arc<PackRegistry>,
    sessions: SessionStore,
}

impl StickerFlow {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        normalizer: StickerNormalizer,
        registry: Arc<PackRegistry>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            messenger,
            normalizer,
            registry,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// `/start` and `/help`: welcome text with the pack link
    pub async fn handle_start(&self, chat: ChatId, language_code: Option<&str>) -> Result<()> {
        let text = match self.registry.share_link().await {
            Ok(link) => t_args_lang("welcome", &[("link", &link)], language_code),
            Err(e) => {
                warn!(chat_id = %chat, error = %e, "Pack link unavailable for welcome message");
                t_args_lang("welcome-no-link", &[("reason", e.cause())], language_code)
            }
        };
        self.messenger.send_text(chat, text).await?;
        Ok(())
    }

    /// Any message that is neither a photo nor a known command
    pub async fn handle_other(&self, conversation: ConversationId, language_code: Option<&str>) -> Result<()> {
        let key = if self.sessions.is_pending(conversation).await {
            "choose-mode-reminder"
        } else {
            "send-photo"
        };
        self.messenger
            .send_text(conversation.chat, t_lang(key, language_code))
            .await?;
        Ok(())
    }

    /// A photo (or image document) arrived: download it and offer the modes
    pub async fn handle_photo(
        &self,
        conversation: ConversationId,
        file_id: FileId,
        language_code: Option<&str>,
    ) -> Result<()> {
        let status = self
            .messenger
            .send_text(conversation.chat, t_lang("processing-photo", language_code))
            .await?;

        if let Err(e) = self.offer_modes(conversation, file_id, status, language_code).await {
            error!(chat_id = %conversation.chat, error = %e, "Could not prepare the mode choice");
            self.sessions.clear(conversation).await;
            self.report(status, &e, language_code).await;
        }
        Ok(())
    }

    async fn offer_modes(
        &self,
        conversation: ConversationId,
        file_id: FileId,
        status: MessageRef,
        language_code: Option<&str>,
    ) -> Result<(), StickerError> {
        let image = self
            .messenger
            .download(file_id)
            .await
            .map_err(|e| StickerError::MediaFetch(e.to_string()))?;
        if image.is_empty() {
            return Err(StickerError::MediaFetch("the downloaded file is empty".to_string()));
        }
        debug!(chat_id = %conversation.chat, bytes = image.len(), "Photo downloaded");

        if self.sessions.begin(conversation, image, status).await {
            info!(chat_id = %conversation.chat, "Replaced an unanswered sticker request");
        }

        self.messenger
            .edit_text(
                status,
                t_lang("choose-mode", language_code),
                Some(create_mode_keyboard(language_code)),
            )
            .await
            .map_err(|e| StickerError::Connectivity(e.to_string()))
    }

    /// A mode button was pressed on `origin`: claim, then finish the choice.
    pub async fn handle_mode_choice(
        &self,
        conversation: ConversationId,
        choice: &str,
        origin: MessageRef,
        language_code: Option<&str>,
    ) -> Result<()> {
        let lookup = self.claim_choice(conversation, origin).await;
        self.finish_choice(conversation, lookup, choice, origin, language_code)
            .await
    }

    /// Take the pending photo the tapped keyboard belongs to.
    ///
    /// Only touches the session store, so the dispatcher can answer the
    /// callback query with the outcome before the slow part starts.
    pub async fn claim_choice(&self, conversation: ConversationId, origin: MessageRef) -> ChoiceLookup {
        self.sessions.take_for_choice(conversation, origin).await
    }

    /// Process a claimed choice and report the result on the status message
    pub async fn finish_choice(
        &self,
        conversation: ConversationId,
        lookup: ChoiceLookup,
        choice: &str,
        origin: MessageRef,
        language_code: Option<&str>,
    ) -> Result<()> {
        let pending = match lookup {
            ChoiceLookup::Taken(pending) => pending,
            ChoiceLookup::Idle => {
                info!(chat_id = %conversation.chat, "Mode choice without a pending photo");
                let err = StickerError::StaleInteraction("no photo is waiting for a mode".to_string());
                self.report(origin, &err, language_code).await;
                return Ok(());
            }
            ChoiceLookup::Superseded => {
                info!(chat_id = %conversation.chat, "Mode choice on an outdated keyboard");
                let err = StickerError::StaleInteraction("a newer photo replaced this one".to_string());
                self.report(origin, &err, language_code).await;
                return Ok(());
            }
            ChoiceLookup::Foreign => {
                debug!(
                    chat_id = %conversation.chat,
                    user_id = %conversation.user,
                    "Mode choice on another user's request, ignoring"
                );
                return Ok(());
            }
        };
        // From here on the conversation is idle again, whatever happens below.

        let status = pending.status;
        match self.publish_sticker(pending.image, choice, status, language_code).await {
            Ok(text) => {
                if let Err(e) = self.messenger.edit_text(status, text, None).await {
                    error!(chat_id = %conversation.chat, error = %e, "Failed to report published sticker");
                }
            }
            Err(e) => {
                error!(chat_id = %conversation.chat, error = %e, "Sticker request failed");
                self.report(status, &e, language_code).await;
            }
        }
        Ok(())
    }

    async fn publish_sticker(
        &self,
        image: Vec<u8>,
        choice: &str,
        status: MessageRef,
        language_code: Option<&str>,
    ) -> Result<String, StickerError> {
        if image.is_empty() {
            return Err(StickerError::StaleInteraction("the photo is no longer available".to_string()));
        }
        let mode: ScaleMode = choice.parse()?;

        let progress = t_args_lang("processing-sticker", &[("mode", mode.as_str())], language_code);
        if let Err(e) = self.messenger.edit_text(status, progress, None).await {
            warn!(error = %e, "Failed to show progress");
        }

        let asset = self.normalizer.normalize(image, mode).await?;
        let outcome = self.registry.publish(asset).await?;
        let link = self.registry.share_link().await?;
        info!(mode = %mode, ?outcome, "Sticker published");

        Ok(format_success(outcome, mode, &link, language_code))
    }

    /// Show the error on the status message, falling back to a new message
    async fn report(&self, status: MessageRef, err: &StickerError, language_code: Option<&str>) {
        let text = format_error(err, language_code);
        if let Err(edit_err) = self.messenger.edit_text(status, text.clone(), None).await {
            warn!(error = %edit_err, "Could not edit status message, sending a new one");
            if let Err(send_err) = self.messenger.send_text(status.chat, text).await {
                error!(error = %send_err, "Could not report error to user");
            }
        }
    }
}
