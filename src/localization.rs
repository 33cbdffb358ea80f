use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::error;
use unic_langid::LanguageIdentifier;

use anyhow::{anyhow, Result};

pub const DEFAULT_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager for the sticker bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a manager with every bundled language loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (locale, source) in RESOURCES {
            bundles.insert(locale.to_string(), Self::create_bundle(locale, source)?);
        }
        Ok(Self { bundles })
    }

    fn create_bundle(locale: &str, source: &str) -> Result<FluentBundle<FluentResource>> {
        let language: LanguageIdentifier = locale.parse()?;
        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("invalid {locale} resource: {errors:?}"))?;

        let mut bundle = FluentBundle::new_concurrent(vec![language]);
        // Isolation marks would end up inside the pack links
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("duplicate {locale} messages: {errors:?}"))?;

        Ok(bundle)
    }

    /// Whether a bundle exists for the language (`"fr-CA"` matches `"fr"`)
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(Self::base_language(language))
    }

    fn base_language(language: &str) -> &str {
        language.split(['-', '_']).next().unwrap_or(language)
    }

    /// Get a message in the requested language, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(Self::base_language(language))
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))))
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            error!(key, ?errors, "Failed to format localized message");
        }
        value.into_owned()
    }
}

static LOCALIZATION_MANAGER: LazyLock<Option<LocalizationManager>> = LazyLock::new(|| {
    LocalizationManager::new()
        .map_err(|e| error!(error = %e, "Failed to load localization resources"))
        .ok()
});

/// Get a localized message for the user's Telegram language code
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    t_args_lang(key, &[], language_code)
}

/// Get a localized message with arguments for the user's Telegram language code
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let Some(manager) = LOCALIZATION_MANAGER.as_ref() else {
        return format!("Missing translation: {key}");
    };
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    manager.get_message_in_language(
        key,
        language_code.unwrap_or(DEFAULT_LANGUAGE),
        (!args_map.is_empty()).then_some(&args_map),
    )
}
