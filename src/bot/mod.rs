//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `controller`: the photo → mode → publish flow
//! - `message_handler`: turns incoming messages into flow events
//! - `callback_handler`: turns mode button presses into flow events
//! - `transport`: Telegram operations and their teloxide implementation
//! - `ui_builder`: keyboards and message formatting

pub mod callback_handler;
pub mod controller;
pub mod message_handler;
pub mod transport;
pub mod ui_builder;

use std::sync::Arc;
use std::time::Duration;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tracing::{info, warn};

use crate::retry::RetryPolicy;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use controller::StickerFlow;
pub use message_handler::message_handler;
pub use transport::{Messenger, TelegramApi};

/// Long polling timeout
pub const POLLING_TIMEOUT_SECS: u64 = 60;

/// Receive updates until the process is stopped.
///
/// Polling errors are retried according to `retry`, which should never give up.
pub async fn run(bot: Bot, flow: Arc<StickerFlow>, retry: RetryPolicy) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler));

    let listener = Polling::builder(bot.clone())
        .timeout(Duration::from_secs(POLLING_TIMEOUT_SECS))
        .backoff_strategy(move |attempt| retry.delay_for(attempt))
        .delete_webhook()
        .await
        .build();

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![flow])
        .default_handler(|upd| async move {
            warn!(update_id = ?upd.id, "Unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    info!("Dispatcher stopped");
}
