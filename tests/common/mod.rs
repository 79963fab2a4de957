//! Shared test doubles for the flow: an in-memory recipe directory, a
//! dictionary translator and a sink recording every reply.

#![allow(dead_code)]

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use recipes::dialogue::ConversationId;
use recipes::errors::{BotError, BotResult};
use recipes::flow::{FlowController, FlowDependencies, FlowSettings, IncomingMessage, Reply, ReplySink};
use recipes::localization::LocalizationManager;
use recipes::recipe_model::{RecipeDetail, RecipeRef};
use recipes::session_store::SessionStore;
use recipes::translation::Translator;
use recipes::RecipeDirectory;

pub const CHAT: ConversationId = ConversationId(42);
pub const SEARCH: &str = "/category_search_random";
pub const SELECT_BUTTON: &str = "Выбрать рецепт(ы)";

/// How a recipe lookup answers
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    Found(RecipeDetail),
    Missing,
    Fails,
}

/// In-memory recipe directory with per-recipe latency
#[derive(Default)]
pub struct FakeDirectory {
    pub categories: Vec<String>,
    pub recipes: HashMap<String, Vec<RecipeRef>>,
    pub details: HashMap<String, (Duration, LookupOutcome)>,
    pub fail_listing: bool,
    pub fail_filter: bool,
    pub lookups: AtomicUsize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            categories: ["Beef", "Dessert", "Pasta", "Seafood", "Side", "Vegan"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            ..Default::default()
        }
    }

    /// Add a category holding `count` recipes with found details
    pub fn with_category(mut self, category: &str, count: usize) -> Self {
        let refs: Vec<RecipeRef> = (0..count)
            .map(|i| RecipeRef::new(format!("{category}-{i}"), format!("{category} dish {i}")))
            .collect();
        for recipe in &refs {
            self.details.insert(
                recipe.id.clone(),
                (Duration::ZERO, LookupOutcome::Found(detail_for(&recipe.name))),
            );
        }
        self.recipes.insert(category.to_string(), refs);
        self
    }

    pub fn with_lookup(mut self, id: &str, delay: Duration, outcome: LookupOutcome) -> Self {
        self.details.insert(id.to_string(), (delay, outcome));
        self
    }
}

pub fn detail_for(name: &str) -> RecipeDetail {
    RecipeDetail {
        name: Some(name.to_string()),
        instructions: Some(format!("Cook {name} well.")),
        ingredients: vec!["Salt".to_string(), "Water".to_string()],
    }
}

#[async_trait]
impl RecipeDirectory for FakeDirectory {
    async fn list_categories(&self) -> BotResult<Vec<String>> {
        if self.fail_listing {
            return Err(BotError::upstream("status 503"));
        }
        Ok(self.categories.clone())
    }

    async fn filter_by_category(&self, category: &str) -> BotResult<Vec<RecipeRef>> {
        if self.fail_filter {
            return Err(BotError::upstream("status 500"));
        }
        Ok(self.recipes.get(category).cloned().unwrap_or_default())
    }

    async fn lookup(&self, id: &str) -> BotResult<Option<RecipeDetail>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let Some((delay, outcome)) = self.details.get(id).cloned() else {
            return Ok(None);
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match outcome {
            LookupOutcome::Found(detail) => Ok(Some(detail)),
            LookupOutcome::Missing => Ok(None),
            LookupOutcome::Fails => Err(BotError::upstream("connection reset")),
        }
    }
}

/// Translator backed by a fixed dictionary; unknown text is returned as is
#[derive(Default)]
pub struct DictionaryTranslator {
    pub entries: HashMap<String, String>,
    pub fail: bool,
}

impl DictionaryTranslator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with(mut self, original: &str, translated: &str) -> Self {
        self.entries.insert(original.to_string(), translated.to_string());
        self
    }
}

#[async_trait]
impl Translator for DictionaryTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> BotResult<String> {
        if self.fail {
            return Err(BotError::translation("status 429"));
        }
        Ok(self.entries.get(text).cloned().unwrap_or_else(|| text.to_string()))
    }
}

/// Sink keeping every reply in send order
#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<(ConversationId, Reply)>>,
    fail_next: AtomicBool,
}

impl RecordingSink {
    /// Make the next send fail as if the channel rejected it
    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn replies(&self) -> Vec<(ConversationId, Reply)> {
        self.replies.lock().unwrap().clone()
    }

    /// Replies sent to one conversation since the last call
    pub fn take(&self, conversation: ConversationId) -> Vec<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let (taken, kept): (Vec<_>, Vec<_>) = replies.drain(..).partition(|(id, _)| *id == conversation);
        *replies = kept;
        taken.into_iter().map(|(_, reply)| reply).collect()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, conversation: ConversationId, reply: Reply) -> anyhow::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("Bad Request: can't parse entities");
        }
        self.replies.lock().unwrap().push((conversation, reply));
        Ok(())
    }
}

pub struct Harness {
    pub controller: FlowController,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<SessionStore>,
    pub directory: Arc<FakeDirectory>,
}

impl Harness {
    pub fn new(directory: FakeDirectory, translator: DictionaryTranslator) -> Self {
        Self::with_timeout(directory, translator, Duration::from_secs(20))
    }

    pub fn with_timeout(directory: FakeDirectory, translator: DictionaryTranslator, lookup_timeout: Duration) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(SessionStore::new(Duration::from_secs(1800)));
        let directory = Arc::new(directory);
        let deps = FlowDependencies {
            directory: directory.clone(),
            translator: Arc::new(translator),
            store: store.clone(),
            sink: sink.clone(),
            localization: Arc::new(LocalizationManager::new().unwrap()),
        };
        let settings = FlowSettings {
            language: "ru".to_string(),
            lookup_timeout,
        };
        Self {
            controller: FlowController::with_rng(deps, settings, StdRng::seed_from_u64(2024)),
            sink,
            store,
            directory,
        }
    }

    pub async fn say(&self, text: &str) -> Vec<Reply> {
        self.say_in(CHAT, text).await
    }

    pub async fn say_in(&self, conversation: ConversationId, text: &str) -> Vec<Reply> {
        self.controller
            .handle(IncomingMessage::text(conversation, text))
            .await
            .unwrap();
        self.sink.take(conversation)
    }
}
