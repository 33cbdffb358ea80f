//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

use crate::dialogue::ConversationId;

use super::controller::StickerFlow;

/// Name of a bot command, without the slash, arguments or `@botname`
pub fn command_name(text: &str) -> Option<&str> {
    let command = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
    let name = command.split('@').next().unwrap_or(command);
    (!name.is_empty()).then_some(name)
}

fn is_image_document(msg: &Message) -> bool {
    msg.document()
        .and_then(|doc| doc.mime_type.as_ref())
        .is_some_and(|mime| mime.to_string().starts_with("image/"))
}

pub async fn message_handler(msg: Message, flow: Arc<StickerFlow>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    // Extract user's language code from Telegram
    let language_code = user.language_code.as_deref();
    let conversation = ConversationId::new(msg.chat.id, user.id);

    if let Some(text) = msg.text() {
        match command_name(text) {
            Some("start") | Some("help") => flow.handle_start(msg.chat.id, language_code).await?,
            Some(other) => {
                debug!(chat_id = %msg.chat.id, command = other, "Ignoring unknown command");
            }
            None => flow.handle_other(conversation, language_code).await?,
        }
    } else if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
        debug!(chat_id = %msg.chat.id, "Received photo message from user");
        flow.handle_photo(conversation, largest_photo.file.id.clone(), language_code)
            .await?;
    } else if let Some(doc) = msg.document().filter(|_| is_image_document(&msg)) {
        debug!(chat_id = %msg.chat.id, "Received image document from user");
        flow.handle_photo(conversation, doc.file.id.clone(), language_code)
            .await?;
    } else {
        flow.handle_other(conversation, language_code).await?;
    }

    Ok(())
}
