//! # Photo Stickers Telegram Bot
//!
//! A Telegram bot that turns photos into stickers: the background is removed,
//! the picture is scaled to sticker size in the mode the user picks, and the
//! result is added to a shared sticker pack.

pub mod background;
pub mod bot;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod pack_registry;
pub mod retry;
pub mod sticker_image;
