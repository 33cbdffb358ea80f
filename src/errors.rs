//! # Error Types Module
//!
//! This module defines the error types used throughout the sticker pipeline.
//! `StickerError` is what the interaction flow reports to users, while
//! `PlatformError` describes a failed Bot API call before it is given a
//! meaning by the caller.

use thiserror::Error;

/// Failure kinds of a sticker request
///
/// Every variant carries a human-readable cause which ends up in the
/// message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StickerError {
    /// Telegram could not be reached or answered unexpectedly
    #[error("Connection error: {0}")]
    Connectivity(String),
    /// The submitted photo could not be downloaded
    #[error("Media fetch error: {0}")]
    MediaFetch(String),
    /// Background removal, decoding, scaling or encoding failed
    #[error("Image processing error: {0}")]
    ImageProcessing(String),
    /// Creating the pack or adding the sticker failed
    #[error("Publish error: {0}")]
    Publish(String),
    /// A mode choice arrived without a matching pending photo
    #[error("Stale interaction: {0}")]
    StaleInteraction(String),
}

impl StickerError {
    /// The underlying cause without the kind prefix
    pub fn cause(&self) -> &str {
        match self {
            StickerError::Connectivity(msg)
            | StickerError::MediaFetch(msg)
            | StickerError::ImageProcessing(msg)
            | StickerError::Publish(msg)
            | StickerError::StaleInteraction(msg) => msg,
        }
    }
}

impl From<image::ImageError> for StickerError {
    fn from(err: image::ImageError) -> Self {
        StickerError::ImageProcessing(err.to_string())
    }
}

/// A failed Telegram Bot API call, classified by what the caller can do about it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The requested object (usually a sticker set) does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// The object we tried to create is already there
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// Transport failure before Telegram answered
    #[error("network error: {0}")]
    Network(String),
    /// Any other error reported by the Bot API
    #[error("{0}")]
    Api(String),
}

impl PlatformError {
    /// Classify a Bot API error description.
    ///
    /// Telegram reports a missing set as `STICKERSET_INVALID` and a taken
    /// name as "sticker set name is already occupied".
    pub fn from_api_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("stickerset_invalid") || lowered.contains("not found") {
            PlatformError::NotFound(message.to_string())
        } else if lowered.contains("already occupied") || lowered.contains("already exists") {
            PlatformError::AlreadyExists(message.to_string())
        } else {
            PlatformError::Api(message.to_string())
        }
    }
}

impl From<teloxide::RequestError> for PlatformError {
    fn from(err: teloxide::RequestError) -> Self {
        match err {
            teloxide::RequestError::Api(api) => PlatformError::from_api_message(&api.to_string()),
            teloxide::RequestError::Network(e) => PlatformError::Network(e.to_string()),
            other => PlatformError::Api(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    /// Drops the request URL, file URLs carry the bot token
    fn from(err: reqwest::Error) -> Self {
        PlatformError::Network(err.without_url().to_string())
    }
}

impl From<teloxide::DownloadError> for PlatformError {
    fn from(err: teloxide::DownloadError) -> Self {
        match err {
            teloxide::DownloadError::Network(e) => e.into(),
            other => PlatformError::Network(other.to_string()),
        }
    }
}

/// Startup configuration problems
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}
