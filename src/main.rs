use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use photo_stickers::background;
use photo_stickers::bot::{self, StickerFlow, TelegramApi};
use photo_stickers::config::BotConfig;
use photo_stickers::dialogue::SessionStore;
use photo_stickers::pack_registry::PackRegistry;
use photo_stickers::retry::RetryPolicy;
use photo_stickers::sticker_image::StickerNormalizer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting photo sticker bot");

    let config = BotConfig::from_env().context("Invalid configuration")?;

    let bot = Bot::new(&config.bot_token);
    let api = Arc::new(TelegramApi::new(bot.clone()));
    let registry = Arc::new(PackRegistry::new(api.clone(), config.pack.clone()));

    registry
        .bootstrap(&RetryPolicy::bootstrap())
        .await
        .context("Unable to resolve the sticker pack after multiple attempts")?;

    let remover = background::from_config(&config.background)?;
    let flow = Arc::new(StickerFlow::new(
        api,
        StickerNormalizer::new(remover),
        registry,
        SessionStore::new(config.session_ttl),
    ));

    bot::run(bot, flow, RetryPolicy::polling()).await;

    Ok(())
}
