//! # Background Removal Module
//!
//! Background removal is delegated to an external service. Two HTTP backends
//! are supported: the remove.bg API and a self-hosted rembg server that runs
//! the segmentation model locally. Failures are never retried here; a bad
//! image would only fail again.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{BackgroundConfig, BackgroundRemoval};
use crate::errors::StickerError;

pub const REMOVE_BG_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

/// Turns an image into one with a transparent background
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, StickerError>;
}

/// Build the backend selected in the configuration
pub fn from_config(config: &BackgroundConfig) -> anyhow::Result<Arc<dyn BackgroundRemover>> {
    let http = || reqwest::Client::builder().timeout(config.timeout).build();

    let remover: Arc<dyn BackgroundRemover> = match &config.removal {
        BackgroundRemoval::RemoveBg { api_key } => {
            info!("Using remove.bg for background removal");
            Arc::new(RemoveBgClient::new(http()?, api_key.clone(), REMOVE_BG_ENDPOINT))
        }
        BackgroundRemoval::Rembg { url } => {
            info!(url = %url, "Using rembg server for background removal");
            Arc::new(RembgClient::new(http()?, url))
        }
        BackgroundRemoval::Disabled => {
            warn!("Background removal is disabled, stickers keep their original background");
            Arc::new(KeepBackground)
        }
    };
    Ok(remover)
}

#[derive(Debug, Deserialize)]
struct RemoveBgErrors {
    errors: Vec<RemoveBgError>,
}

#[derive(Debug, Deserialize)]
struct RemoveBgError {
    title: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Extract a readable cause from a remove.bg error body
fn remove_bg_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<RemoveBgErrors>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .iter()
            .map(|e| match &e.detail {
                Some(detail) => format!("{} ({detail})", e.title),
                None => e.title.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => format!("remove.bg answered {status}"),
    }
}

/// remove.bg API client
pub struct RemoveBgClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl RemoveBgClient {
    pub fn new(http: reqwest::Client, api_key: String, endpoint: &str) -> Self {
        Self {
            http,
            api_key,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, StickerError> {
        debug!(bytes = image.len(), "Sending image to remove.bg");
        let form = Form::new()
            .part("image_file", Part::bytes(image).file_name("photo.jpg"))
            .text("size", "auto")
            .text("format", "png");

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StickerError::ImageProcessing(format!("remove.bg request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StickerError::ImageProcessing(remove_bg_error_message(status, &body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StickerError::ImageProcessing(format!("remove.bg response unreadable: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Client for a rembg HTTP server (`rembg s`)
pub struct RembgClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RembgClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/remove", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl BackgroundRemover for RembgClient {
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, StickerError> {
        debug!(bytes = image.len(), endpoint = %self.endpoint, "Sending image to rembg");
        let form = Form::new().part("file", Part::bytes(image).file_name("photo.jpg"));

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StickerError::ImageProcessing(format!("rembg request failed: {e}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StickerError::ImageProcessing(format!("rembg response unreadable: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Returns the image unchanged
pub struct KeepBackground;

#[async_trait]
impl BackgroundRemover for KeepBackground {
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, StickerError> {
        Ok(image)
    }
}
