//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::dialogue::{ChoiceLookup, ConversationId, MessageRef};
use crate::localization::t_lang;

use super::controller::StickerFlow;
use super::ui_builder::MODE_CALLBACK_PREFIX;

/// Handle callback queries from the mode keyboard
pub async fn callback_handler(bot: Bot, q: CallbackQuery, flow: Arc<StickerFlow>) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query from user");
    let language_code = q.from.language_code.as_deref();

    let choice = q
        .data
        .as_deref()
        .and_then(|data| data.strip_prefix(MODE_CALLBACK_PREFIX));
    let (Some(message), Some(choice)) = (&q.message, choice) else {
        debug!(user_id = %q.from.id, data = ?q.data, "Ignoring unrelated callback");
        if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
            warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
        }
        return Ok(());
    };

    let chat_id = message.chat().id;
    let conversation = ConversationId::new(chat_id, q.from.id);
    let origin = MessageRef {
        chat: chat_id,
        id: message.id(),
    };

    let lookup = flow.claim_choice(conversation, origin).await;

    // Answer before processing to remove the loading state, publishing can take a while
    let mut answer = bot.answer_callback_query(q.id.clone());
    if lookup == ChoiceLookup::Foreign {
        answer = answer
            .text(t_lang("error-foreign-choice", language_code))
            .show_alert(true);
    }
    if let Err(e) = answer.await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    flow.finish_choice(conversation, lookup, choice, origin, language_code)
        .await
}
