//! # Sticker Image Module
//!
//! Turns a user photo into a static sticker: background removed, RGBA, at most
//! 512 pixels on each side, PNG encoded.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbaImage};
use tracing::{debug, info};

use crate::background::BackgroundRemover;
use crate::errors::StickerError;

/// Maximum width and height of a static sticker
pub const STICKER_MAX_SIDE: u32 = 512;

/// How the picture is brought down to sticker size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleMode {
    /// Keep the whole picture and its aspect ratio
    Fit,
    /// Centered square crop filling 512×512
    Square,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 2] = [ScaleMode::Fit, ScaleMode::Square];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleMode::Fit => "fit",
            ScaleMode::Square => "square",
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleMode {
    type Err = StickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fit" => Ok(ScaleMode::Fit),
            "square" => Ok(ScaleMode::Square),
            other => Err(StickerError::StaleInteraction(format!("unknown scaling mode '{other}'"))),
        }
    }
}

/// An encoded PNG ready to be uploaded as a sticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerAsset {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl StickerAsset {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }
}

/// Size of a `fit` sticker: longer edge shrunk to 512, never enlarged
pub fn fit_dimensions(width: u32, height: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= STICKER_MAX_SIDE {
        return (width, height);
    }
    let scale = STICKER_MAX_SIDE as f64 / longer as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, STICKER_MAX_SIDE);
    (scaled(width), scaled(height))
}

/// Centered square crop as `(x, y, side)`
pub fn square_crop(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

/// Scale an already background-free RGBA image according to `mode`
pub fn scale_image(image: &RgbaImage, mode: ScaleMode) -> RgbaImage {
    let (width, height) = image.dimensions();
    match mode {
        ScaleMode::Fit => {
            let (target_w, target_h) = fit_dimensions(width, height);
            if (target_w, target_h) == (width, height) {
                image.clone()
            } else {
                imageops::resize(image, target_w, target_h, FilterType::Lanczos3)
            }
        }
        ScaleMode::Square => {
            let (x, y, side) = square_crop(width, height);
            let cropped = imageops::crop_imm(image, x, y, side, side).to_image();
            imageops::resize(&cropped, STICKER_MAX_SIDE, STICKER_MAX_SIDE, FilterType::Lanczos3)
        }
    }
}

/// Decode, convert to RGBA, scale and encode as PNG
pub fn render_sticker(image_bytes: &[u8], mode: ScaleMode) -> Result<StickerAsset, StickerError> {
    let decoded = image::load_from_memory(image_bytes)?;
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(StickerError::ImageProcessing(format!(
            "image has no pixels ({width}x{height})"
        )));
    }
    if !decoded.color().has_alpha() {
        debug!(color = ?decoded.color(), "Adding alpha channel");
    }

    let scaled = scale_image(&decoded.into_rgba8(), mode);
    let (out_w, out_h) = scaled.dimensions();

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(scaled).write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;

    Ok(StickerAsset {
        png,
        width: out_w,
        height: out_h,
    })
}

/// Background removal followed by sticker rendering
#[derive(Clone)]
pub struct StickerNormalizer {
    remover: Arc<dyn BackgroundRemover>,
}

impl StickerNormalizer {
    pub fn new(remover: Arc<dyn BackgroundRemover>) -> Self {
        Self { remover }
    }

    pub async fn normalize(&self, raw: Vec<u8>, mode: ScaleMode) -> Result<StickerAsset, StickerError> {
        let input_len = raw.len();
        let cutout = self.remover.remove_background(raw).await?;

        let asset = tokio::task::spawn_blocking(move || render_sticker(&cutout, mode))
            .await
            .map_err(|e| StickerError::ImageProcessing(format!("rendering task failed: {e}")))??;

        info!(
            mode = %mode,
            input_bytes = input_len,
            output_bytes = asset.as_bytes().len(),
            width = asset.width(),
            height = asset.height(),
            "Sticker rendered"
        );
        Ok(asset)
    }
}
