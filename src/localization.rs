use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use unic_langid::LanguageIdentifier;

/// Language used when a requested language has no catalog
pub const FALLBACK_LANGUAGE: &str = "en";

/// Message catalogs compiled into the binary
const CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("ru", include_str!("../locales/ru/main.ftl")),
];

/// Localization manager for the recipes bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled catalog loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (language, source) in CATALOGS {
            let locale: LanguageIdentifier = language.parse()?;
            bundles.insert(language.to_string(), Self::create_bundle(locale, source)?);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: LanguageIdentifier, source: &str) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Messages are embedded in HTML and Telegram text, not bidi-aware UIs
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid catalog for {locale}: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Conflicting messages in catalog for {locale}: {errors:?}"))?;

        Ok(bundle)
    }

    /// Whether a catalog exists for the language
    pub fn supports(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Get a localized message in a specific language
    ///
    /// Unknown languages fall back to English. Numeric argument values are
    /// passed as numbers so plural selectors work.
    pub fn get_message_in_language(&self, key: &str, language: &str, args: Option<&[(&str, &str)]>) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(FALLBACK_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::try_number(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }
}

/// Map a channel language code to a supported catalog language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let primary = language_code
        .and_then(|code| code.split(['-', '_']).next())
        .map(str::to_lowercase);

    CATALOGS
        .iter()
        .map(|(language, _)| *language)
        .find(|language| primary.as_deref() == Some(*language))
        .unwrap_or(FALLBACK_LANGUAGE)
}

/// Message lookups bound to one language
#[derive(Clone, Copy)]
pub struct Localizer<'a> {
    manager: &'a LocalizationManager,
    language: &'a str,
}

impl<'a> Localizer<'a> {
    pub fn new(manager: &'a LocalizationManager, language: &'a str) -> Self {
        Self { manager, language }
    }

    pub fn language(&self) -> &'a str {
        self.language
    }

    pub fn t(&self, key: &str) -> String {
        self.manager.get_message_in_language(key, self.language, None)
    }

    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.manager.get_message_in_language(key, self.language, Some(args))
    }
}
