//! # Recipe Directory Client
//!
//! Read-only access to the remote meal catalog: category listing, category
//! filtering and recipe lookup. Every endpoint answers with a JSON object
//! whose `meals` key holds a list of objects, or `null` when nothing matches.
//!
//! Transient failures (transport errors, 5xx) are retried with jittered
//! exponential backoff, and a [`CircuitBreaker`] makes calls fail fast while
//! the remote keeps failing.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{DirectoryConfig, RecoveryConfig};
use crate::errors::{BotError, BotResult};
use crate::recipe_model::{RecipeDetail, RecipeRef};

/// Remote catalog of recipes
#[async_trait]
pub trait RecipeDirectory: Send + Sync {
    /// All category names, in catalog order without duplicates
    async fn list_categories(&self) -> BotResult<Vec<String>>;

    /// Recipes of a category; empty when the category is unknown or has no meals
    async fn filter_by_category(&self, category: &str) -> BotResult<Vec<RecipeRef>>;

    /// Full recipe record, `None` when no meal matches the identifier
    async fn lookup(&self, recipe_id: &str) -> BotResult<Option<RecipeDetail>>;
}

#[derive(Debug, Deserialize)]
struct MealsEnvelope<T> {
    meals: Option<Vec<T>>,
}

impl<T> MealsEnvelope<T> {
    fn into_meals(self) -> Vec<T> {
        self.meals.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    #[serde(rename = "strCategory")]
    name: String,
}

/// Parse a category listing response
pub fn parse_categories(body: Value) -> BotResult<Vec<String>> {
    let envelope: MealsEnvelope<CategoryEntry> = decode(body)?;
    let mut categories: Vec<String> = Vec::new();
    for entry in envelope.into_meals() {
        let name = entry.name.trim();
        if !name.is_empty() && !categories.iter().any(|known| known == name) {
            categories.push(name.to_string());
        }
    }
    Ok(categories)
}

/// Parse a category filter response
pub fn parse_recipe_refs(body: Value) -> BotResult<Vec<RecipeRef>> {
    let envelope: MealsEnvelope<RecipeRef> = decode(body)?;
    Ok(envelope.into_meals())
}

/// Parse a recipe lookup response, using the first matching meal
pub fn parse_recipe_detail(body: Value) -> BotResult<Option<RecipeDetail>> {
    let envelope: MealsEnvelope<Map<String, Value>> = decode(body)?;
    Ok(envelope.into_meals().first().map(RecipeDetail::from_meal))
}

fn decode<T: DeserializeOwned>(body: Value) -> BotResult<T> {
    serde_json::from_value(body)
        .map_err(|e| BotError::upstream(format!("unexpected response shape: {e}")))
}

/// HTTP client for TheMealDB-compatible directories
pub struct MealDbClient {
    http: Client,
    base_url: String,
    recovery: RecoveryConfig,
    circuit_breaker: CircuitBreaker,
}

impl MealDbClient {
    pub fn new(config: &DirectoryConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            recovery: config.recovery.clone(),
            circuit_breaker: CircuitBreaker::new(&config.recovery),
        })
    }

    /// GET an endpoint with query parameters, retrying transient failures
    async fn get_json(&self, endpoint: &str, query: &[(&str, &str)]) -> BotResult<Value> {
        if self.circuit_breaker.is_open() {
            warn!(endpoint, "Recipe directory circuit is open, failing fast");
            return Err(BotError::upstream("too many recent failures"));
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let mut attempt: u32 = 0;

        loop {
            match self.try_get_json(&url, query).await {
                Ok(body) => {
                    self.circuit_breaker.record_success();
                    return Ok(body);
                }
                Err(failure) => {
                    if !failure.retryable || attempt >= self.recovery.max_retries {
                        // One failed call counts once, however many attempts it took
                        self.circuit_breaker.record_failure();
                        warn!(endpoint, attempt, error = %failure.error, "Recipe directory request failed");
                        return Err(failure.error);
                    }

                    let delay = retry_delay(&self.recovery, attempt);
                    debug!(endpoint, attempt, delay_ms = delay.as_millis() as u64, error = %failure.error, "Retrying recipe directory request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, RequestFailure> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| RequestFailure::transient(BotError::upstream(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let error = BotError::upstream(format!("status {status}"));
            return Err(if is_retryable_status(status) {
                RequestFailure::transient(error)
            } else {
                RequestFailure::permanent(error)
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RequestFailure::permanent(BotError::upstream(format!("invalid JSON: {e}"))))
    }
}

#[async_trait]
impl RecipeDirectory for MealDbClient {
    async fn list_categories(&self) -> BotResult<Vec<String>> {
        let body = self.get_json("list.php", &[("c", "list")]).await?;
        let categories = parse_categories(body)?;
        info!(count = categories.len(), "Fetched recipe categories");
        Ok(categories)
    }

    async fn filter_by_category(&self, category: &str) -> BotResult<Vec<RecipeRef>> {
        let body = self.get_json("filter.php", &[("c", category)]).await?;
        let recipes = parse_recipe_refs(body)?;
        info!(category, count = recipes.len(), "Fetched recipes for category");
        Ok(recipes)
    }

    async fn lookup(&self, recipe_id: &str) -> BotResult<Option<RecipeDetail>> {
        let body = self.get_json("lookup.php", &[("i", recipe_id)]).await?;
        let detail = parse_recipe_detail(body)?;
        debug!(recipe_id, found = detail.is_some(), "Looked up recipe");
        Ok(detail)
    }
}

struct RequestFailure {
    error: BotError,
    retryable: bool,
}

impl RequestFailure {
    fn transient(error: BotError) -> Self {
        Self { error, retryable: true }
    }

    fn permanent(error: BotError) -> Self {
        Self { error, retryable: false }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Exponential backoff with random jitter, capped at `max_retry_delay_ms`
pub fn retry_delay(recovery: &RecoveryConfig, attempt: u32) -> Duration {
    let base = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << attempt.min(16));
    let jitter = if recovery.base_retry_delay_ms > 0 {
        rand::thread_rng().gen_range(0..=recovery.base_retry_delay_ms / 2)
    } else {
        0
    };
    Duration::from_millis(base.saturating_add(jitter).min(recovery.max_retry_delay_ms))
}
