//! # Translation Client
//!
//! Translates arbitrary text into a target language through a remote
//! service. [`PassthroughTranslator`] stands in when translation is turned off.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TranslationConfig;
use crate::errors::{BotError, BotResult};

/// Text translation service
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> BotResult<String>;
}

/// Translate `text`, falling back to the original when the service fails
pub async fn translate_or_original(
    translator: &dyn Translator,
    text: &str,
    target_language: &str,
) -> String {
    match translator.translate(text, target_language).await {
        Ok(translated) => translated,
        Err(e) => {
            warn!(error = %e, target_language, "Translation failed, using original text");
            text.to_string()
        }
    }
}

/// Client for the public Google Translate web endpoint
pub struct GoogleTranslateClient {
    http: Client,
    endpoint: String,
}

impl GoogleTranslateClient {
    pub fn new(config: &TranslationConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslateClient {
    async fn translate(&self, text: &str, target_language: &str) -> BotResult<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("client", "gtx"), ("sl", "auto"), ("tl", target_language), ("dt", "t")])
            .form(&[("q", text)])
            .send()
            .await
            .map_err(|e| BotError::translation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::translation(format!("status {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BotError::translation(format!("invalid JSON: {e}")))?;

        let translated = parse_translation(&body)
            .ok_or_else(|| BotError::translation("unexpected response shape"))?;
        debug!(chars = text.len(), target_language, "Translated text");
        Ok(translated)
    }
}

/// Extract the translated text from a `translate_a/single` response
///
/// The response is a nested array whose first element lists sentence
/// segments, each starting with the translated sentence.
pub fn parse_translation(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        None
    } else {
        Some(translated)
    }
}

/// Translator that returns the text unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> BotResult<String> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(&self, _text: &str, _target_language: &str) -> BotResult<String> {
            Err(BotError::translation("service down"))
        }
    }

    #[test]
    fn test_parse_translation_joins_segments() {
        let body = json!([
            [
                ["Имя рецепта:\n", "Recipe name:\n", null, null, 10],
                ["Пирог", "Pie", null, null, 10]
            ],
            null,
            "en"
        ]);
        assert_eq!(parse_translation(&body).as_deref(), Some("Имя рецепта:\nПирог"));
    }

    #[test]
    fn test_parse_translation_rejects_unexpected_shape() {
        assert!(parse_translation(&json!({"text": "hi"})).is_none());
        assert!(parse_translation(&json!([[]])).is_none());
        assert!(parse_translation(&json!(null)).is_none());
    }

    #[tokio::test]
    async fn test_fallback_to_original_text() {
        let text = translate_or_original(&FailingTranslator, "Beef stew", "ru").await;
        assert_eq!(text, "Beef stew");
    }

    #[tokio::test]
    async fn test_passthrough() {
        let text = PassthroughTranslator.translate("Apple pie", "ru").await.unwrap();
        assert_eq!(text, "Apple pie");
    }
}
