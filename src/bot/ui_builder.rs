//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

// Import localization
use crate::localization::{t_args_lang, t_lang};

use crate::errors::StickerError;
use crate::pack_registry::PublishOutcome;
use crate::sticker_image::ScaleMode;

/// Prefix of the callback data carried by the mode buttons
pub const MODE_CALLBACK_PREFIX: &str = "mode:";

/// Callback data for a mode button
pub fn mode_callback_data(mode: ScaleMode) -> String {
    format!("{MODE_CALLBACK_PREFIX}{mode}")
}

/// Create the inline keyboard offering the scaling modes
pub fn create_mode_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    let buttons = ScaleMode::ALL
        .iter()
        .map(|mode| {
            let label = match mode {
                ScaleMode::Fit => t_lang("mode-fit-button", language_code),
                ScaleMode::Square => t_lang("mode-square-button", language_code),
            };
            InlineKeyboardButton::callback(label, mode_callback_data(*mode))
        })
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(vec![buttons])
}

/// Success message naming the mode and the pack link
pub fn format_success(outcome: PublishOutcome, mode: ScaleMode, link: &str, language_code: Option<&str>) -> String {
    let key = match outcome {
        PublishOutcome::Created => "sticker-created",
        PublishOutcome::Appended => "sticker-added",
    };
    t_args_lang(key, &[("mode", mode.as_str()), ("link", link)], language_code)
}

/// User-facing text for a failed request, always including the cause
pub fn format_error(err: &StickerError, language_code: Option<&str>) -> String {
    let key = match err {
        StickerError::Connectivity(_) => "error-connectivity",
        StickerError::MediaFetch(_) => "error-media-fetch",
        StickerError::ImageProcessing(_) => "error-image-processing",
        StickerError::Publish(_) => "error-publish",
        StickerError::StaleInteraction(_) => "error-stale",
    };
    t_args_lang(key, &[("reason", err.cause())], language_code)
}
