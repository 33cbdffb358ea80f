//! # Configuration Tests

use std::collections::HashMap;
use std::time::Duration;

use photo_stickers::config::{BackgroundRemoval, BotConfig, PackIdentitySource};
use photo_stickers::errors::ConfigError;
use teloxide::types::UserId;

fn load(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
    let env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BotConfig::from_lookup(|key| env.get(key).cloned())
}

const REQUIRED: [(&str, &str); 2] = [("BOT_TOKEN", "123:abc"), ("OWNER_USER_ID", "4242")];

#[test]
fn test_defaults() {
    let config = load(&REQUIRED).unwrap();

    assert_eq!(config.bot_token, "123:abc");
    assert_eq!(config.pack.owner, UserId(4242));
    assert_eq!(
        config.pack.identity,
        PackIdentitySource::Derived {
            prefix: "funstickers".to_string()
        }
    );
    assert_eq!(config.pack.title, "Shared Sticker Pack");
    assert_eq!(config.pack.emoji, "⭐");
    assert_eq!(config.background.removal, BackgroundRemoval::Disabled);
    assert_eq!(config.background.timeout, Duration::from_secs(60));
    assert_eq!(config.session_ttl, Some(Duration::from_secs(900)));
}

#[test]
fn test_missing_token_is_fatal() {
    assert_eq!(
        load(&[("OWNER_USER_ID", "1")]).unwrap_err(),
        ConfigError::Missing("BOT_TOKEN")
    );
    assert_eq!(
        load(&[("BOT_TOKEN", "x"), ("OWNER_USER_ID", "  ")]).unwrap_err(),
        ConfigError::Missing("OWNER_USER_ID")
    );
}

#[test]
fn test_invalid_owner_id() {
    let err = load(&[("BOT_TOKEN", "x"), ("OWNER_USER_ID", "me")]).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "OWNER_USER_ID", .. }));
}

#[test]
fn test_static_pack_name_wins_over_prefix() {
    let mut vars = REQUIRED.to_vec();
    vars.push(("STICKER_PACK_NAME", "mypack_by_bot"));
    vars.push(("STICKER_PACK_PREFIX", "ignored"));

    let config = load(&vars).unwrap();
    assert_eq!(
        config.pack.identity,
        PackIdentitySource::Static("mypack_by_bot".to_string())
    );
}

#[test]
fn test_background_backend_auto_selection() {
    let mut vars = REQUIRED.to_vec();
    vars.push(("REMBG_URL", "http://rembg:7000"));
    assert_eq!(
        load(&vars).unwrap().background.removal,
        BackgroundRemoval::Rembg {
            url: "http://rembg:7000".to_string()
        }
    );

    vars.push(("REMOVE_BG_API_KEY", "key"));
    assert_eq!(
        load(&vars).unwrap().background.removal,
        BackgroundRemoval::RemoveBg {
            api_key: "key".to_string()
        }
    );

    vars.push(("BACKGROUND_REMOVER", "none"));
    assert_eq!(load(&vars).unwrap().background.removal, BackgroundRemoval::Disabled);
}

#[test]
fn test_explicit_backend_needs_its_settings() {
    let mut vars = REQUIRED.to_vec();
    vars.push(("BACKGROUND_REMOVER", "removebg"));
    assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("REMOVE_BG_API_KEY"));

    let mut vars = REQUIRED.to_vec();
    vars.push(("BACKGROUND_REMOVER", "magic"));
    assert!(matches!(
        load(&vars).unwrap_err(),
        ConfigError::Invalid { key: "BACKGROUND_REMOVER", .. }
    ));
}

#[test]
fn test_zero_ttl_disables_expiry() {
    let mut vars = REQUIRED.to_vec();
    vars.push(("SESSION_TTL_SECS", "0"));
    assert_eq!(load(&vars).unwrap().session_ttl, None);

    let mut vars = REQUIRED.to_vec();
    vars.push(("SESSION_TTL_SECS", "soon"));
    assert!(matches!(
        load(&vars).unwrap_err(),
        ConfigError::Invalid { key: "SESSION_TTL_SECS", .. }
    ));
}
