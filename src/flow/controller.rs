//! Interaction Flow Controller
//!
//! Drives one conversation through the category search flow:
//!
//! 1. `IDLE` → `AWAITING_CATEGORY`: the search command with a positive count
//!    lists the categories.
//! 2. `AWAITING_CATEGORY` → `AWAITING_SELECTION`: the chosen category is
//!    filtered and up to `count` recipes are sampled.
//! 3. `AWAITING_SELECTION` → `IDLE`: details of the sampled recipes are
//!    looked up concurrently, translated and sent in selection order.
//!
//! Messages from one conversation are handled one at a time; different
//! conversations proceed independently.

use anyhow::Result;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use teloxide::utils::html;
use tracing::{debug, error, info, warn};

use crate::config::FlowConfig;
use crate::dialogue::{validate_recipe_count, ConversationId, FlowState, SessionUpdate};
use crate::directory::RecipeDirectory;
use crate::errors::CountError;
use crate::localization::{LocalizationManager, Localizer};
use crate::recipe_model::RecipeRef;
use crate::session_store::SessionStore;
use crate::translation::{translate_or_original, Translator};

use super::presentation::{
    capitalize, compose_recipe_text, emphasize_labels, format_suggestions, sample_recipes,
    SectionLabels,
};
use super::reply::{Reply, ReplySink, SuggestedReplies};
use super::transition::{classify, transition, Action, FlowVocabulary, MenuLabels};

/// Category buttons per keyboard row
pub const CATEGORY_BUTTONS_PER_ROW: usize = 5;

/// Categories of the public meal catalog, known before the first listing
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Beef",
    "Breakfast",
    "Chicken",
    "Dessert",
    "Goat",
    "Lamb",
    "Miscellaneous",
    "Pasta",
    "Pork",
    "Seafood",
    "Side",
    "Starter",
    "Vegan",
    "Vegetarian",
];

/// A message received from the messaging channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub conversation: ConversationId,
    /// Message text; `None` for stickers, photos and other non-text content
    pub text: Option<String>,
    pub sender_name: Option<String>,
}

impl IncomingMessage {
    pub fn text(conversation: ConversationId, text: impl Into<String>) -> Self {
        Self {
            conversation,
            text: Some(text.into()),
            sender_name: None,
        }
    }
}

/// Tunables of the flow
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Language of user-facing text and translation target
    pub language: String,
    /// Upper bound for one recipe lookup during delivery
    pub lookup_timeout: Duration,
}

impl From<&FlowConfig> for FlowSettings {
    fn from(config: &FlowConfig) -> Self {
        Self {
            language: config.language.clone(),
            lookup_timeout: config.lookup_timeout(),
        }
    }
}

/// Collaborators of the flow, constructed once at startup
#[derive(Clone)]
pub struct FlowDependencies {
    pub directory: Arc<dyn RecipeDirectory>,
    pub translator: Arc<dyn Translator>,
    pub store: Arc<SessionStore>,
    pub sink: Arc<dyn ReplySink>,
    pub localization: Arc<LocalizationManager>,
}

/// Outcome of one entry of the detail fan-out
enum Delivery {
    Ready(String),
    NotFound,
    Failed,
}

pub struct FlowController {
    deps: FlowDependencies,
    settings: FlowSettings,
    known_categories: RwLock<HashSet<String>>,
    rng: Mutex<StdRng>,
}

impl FlowController {
    pub fn new(deps: FlowDependencies, settings: FlowSettings) -> Self {
        Self::with_rng(deps, settings, StdRng::from_entropy())
    }

    /// Create a controller with a fixed random source for recipe sampling
    pub fn with_rng(deps: FlowDependencies, settings: FlowSettings, rng: StdRng) -> Self {
        let known_categories = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
        Self {
            deps,
            settings,
            known_categories: RwLock::new(known_categories),
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.deps.store
    }

    fn i18n(&self) -> Localizer<'_> {
        Localizer::new(&self.deps.localization, &self.settings.language)
    }

    fn menu_labels(&self) -> MenuLabels {
        let i18n = self.i18n();
        MenuLabels {
            commands: i18n.t("menu-commands"),
            about: i18n.t("menu-about"),
        }
    }

    fn main_menu(&self) -> SuggestedReplies {
        let labels = self.menu_labels();
        SuggestedReplies::single_row([labels.commands, labels.about])
    }

    async fn send(&self, conversation: ConversationId, reply: Reply) -> Result<()> {
        self.deps.sink.send(conversation, reply).await
    }

    /// Handle one inbound message
    ///
    /// Errors are only returned when the messaging channel fails to deliver a
    /// reply; every flow failure is answered in the conversation instead.
    pub async fn handle(&self, message: IncomingMessage) -> Result<()> {
        let conversation = message.conversation;
        let lock = self.deps.store.conversation_lock(conversation).await;
        let _guard = lock.lock().await;

        let Some(text) = message.text.as_deref() else {
            debug!(conversation = %conversation, "Received non-text message");
            return self.not_understood(conversation).await;
        };

        debug!(conversation = %conversation, message_length = text.len(), "Received text message");

        let state = self.deps.store.state(conversation).await;
        let input = classify(text, &self.menu_labels());
        let action = transition(state, input, &KnownVocabulary { controller: self });
        debug!(conversation = %conversation, ?state, ?action, "Dispatching");

        match action {
            Action::Greet => self.greet(conversation, message.sender_name.as_deref()).await,
            Action::ShowCommands => self.show_commands(conversation).await,
            Action::ShowAbout => self.send(conversation, Reply::plain(self.i18n().t("about"))).await,
            Action::StartSearch { argument } => self.start_search(conversation, argument.as_deref()).await,
            Action::ChooseCategory { category } => self.choose_category(conversation, &category).await,
            Action::DeliverRecipes => self.deliver_recipes(conversation).await,
            Action::CancelFlow => self.cancel(conversation).await,
            Action::StaleChoice => {
                self.send(conversation, Reply::plain(self.i18n().t("flow-not-active"))).await
            }
            Action::NotUnderstood => self.not_understood(conversation).await,
        }
    }

    async fn not_understood(&self, conversation: ConversationId) -> Result<()> {
        self.send(conversation, Reply::plain(self.i18n().t("not-understood"))).await
    }

    async fn greet(&self, conversation: ConversationId, sender_name: Option<&str>) -> Result<()> {
        let i18n = self.i18n();
        let text = match sender_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => i18n.t_args("welcome", &[("name", html::bold(&html::escape(name)).as_str())]),
            None => html::escape(&i18n.t("welcome-anonymous")),
        };
        self.send(conversation, Reply::html(text).with_suggestions(self.main_menu()))
            .await
    }

    async fn show_commands(&self, conversation: ConversationId) -> Result<()> {
        let i18n = self.i18n();
        let text = format!(
            "{}\n✅ {}\n✅ {}",
            html::bold(&html::escape(&i18n.t("commands-title"))),
            html::escape(&i18n.t("commands-search")),
            html::escape(&i18n.t("commands-cancel")),
        );
        self.send(conversation, Reply::html(text)).await
    }

    async fn cancel(&self, conversation: ConversationId) -> Result<()> {
        self.deps.store.clear(conversation).await;
        info!(conversation = %conversation, "Flow cancelled");
        let reply = Reply::plain(self.i18n().t("flow-cancelled")).with_suggestions(self.main_menu());
        self.send(conversation, reply).await
    }

    /// IDLE → AWAITING_CATEGORY
    async fn start_search(&self, conversation: ConversationId, argument: Option<&str>) -> Result<()> {
        let i18n = self.i18n();

        let count = match validate_recipe_count(argument) {
            Ok(count) => count,
            Err(e) => {
                info!(conversation = %conversation, error = %e, "Rejected recipe count");
                let key = match e {
                    CountError::Missing => "error-missing-argument",
                    CountError::NotANumber(_) => "error-not-a-number",
                    CountError::NotPositive(_) => "error-not-positive",
                };
                return self.send(conversation, Reply::plain(i18n.t(key))).await;
            }
        };

        // A restarted search replaces whatever the previous flow left behind
        self.deps.store.clear(conversation).await;
        self.deps
            .store
            .update(conversation, SessionUpdate::requested_count(count))
            .await;

        let categories = match self.deps.directory.list_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                error!(conversation = %conversation, error = %e, "Failed to list categories");
                self.deps.store.clear(conversation).await;
                return self
                    .send(conversation, Reply::plain(i18n.t("error-categories-unavailable")))
                    .await;
            }
        };

        self.remember_categories(&categories);

        let title = html::bold(&html::escape(&i18n.t("choose-category")));
        let reply = Reply::html(title)
            .with_suggestions(SuggestedReplies::grid(categories, CATEGORY_BUTTONS_PER_ROW));
        self.send(conversation, reply).await?;

        self.deps
            .store
            .set_state(conversation, FlowState::AwaitingCategory)
            .await;
        info!(conversation = %conversation, requested_count = count, "Awaiting category");
        Ok(())
    }

    /// AWAITING_CATEGORY → AWAITING_SELECTION
    async fn choose_category(&self, conversation: ConversationId, category: &str) -> Result<()> {
        let i18n = self.i18n();

        let recipes = match self.deps.directory.filter_by_category(category).await {
            Ok(recipes) => recipes,
            Err(e) => {
                error!(conversation = %conversation, category, error = %e, "Failed to filter recipes");
                self.deps.store.clear(conversation).await;
                let reply = Reply::plain(i18n.t("error-recipes-unavailable")).with_suggestions(self.main_menu());
                return self.send(conversation, reply).await;
            }
        };

        if recipes.is_empty() {
            info!(conversation = %conversation, category, "No recipes in category");
            self.deps.store.clear(conversation).await;
            let reply = Reply::plain(i18n.t("no-recipes")).with_suggestions(self.main_menu());
            return self.send(conversation, reply).await;
        }

        let available = recipes.len();
        let requested = self
            .deps
            .store
            .get(conversation)
            .await
            .map(|session| session.requested_count)
            .filter(|count| *count > 0)
            .unwrap_or(1);

        let count = if requested > available {
            let notice = i18n.t_args("count-adjusted", &[("count", available.to_string().as_str())]);
            self.send(conversation, Reply::plain(notice)).await?;
            available
        } else {
            requested
        };

        let selected = self.sample(&recipes, count);
        self.deps
            .store
            .update(
                conversation,
                SessionUpdate::selected_recipes(selected.clone()).with_requested_count(count),
            )
            .await;

        let names = join_all(selected.iter().map(|recipe| async move {
            capitalize(
                &translate_or_original(self.deps.translator.as_ref(), &recipe.name, &self.settings.language)
                    .await,
            )
        }))
        .await;

        let keyboard = SuggestedReplies::single_row([i18n.t("choose-recipes-button")]);
        let reply = Reply::html(format_suggestions(&i18n.t("suggestions-title"), &names)).with_suggestions(keyboard);
        self.send(conversation, reply).await?;

        self.deps
            .store
            .set_state(conversation, FlowState::AwaitingSelection)
            .await;
        info!(conversation = %conversation, category, available, selected = count, "Awaiting selection");
        Ok(())
    }

    /// AWAITING_SELECTION → IDLE
    async fn deliver_recipes(&self, conversation: ConversationId) -> Result<()> {
        let i18n = self.i18n();
        let selected = self
            .deps
            .store
            .get(conversation)
            .await
            .map(|session| session.selected_recipes)
            .unwrap_or_default();

        let labels = SectionLabels {
            name: i18n.t("label-name"),
            instructions: i18n.t("label-instructions"),
            ingredients: i18n.t("label-ingredients"),
            placeholder: i18n.t("no-information"),
        };

        // join_all yields results in input order, whatever order they complete in
        let deliveries = join_all(selected.iter().map(|recipe| self.prepare_delivery(conversation, recipe, &labels))).await;

        // The flow is over once the details are in, whatever happens to the sends
        self.deps.store.clear(conversation).await;

        let mut failed_sends = 0usize;
        for (recipe, delivery) in selected.iter().zip(deliveries) {
            let reply = match delivery {
                Delivery::Ready(text) => Reply::html(text),
                Delivery::NotFound => continue,
                Delivery::Failed => {
                    Reply::plain(i18n.t_args("recipe-unavailable", &[("name", recipe.name.as_str())]))
                }
            };
            if let Err(e) = self.send(conversation, reply).await {
                warn!(conversation = %conversation, recipe_id = %recipe.id, error = %e, "Failed to send recipe");
                failed_sends += 1;
            }
        }

        info!(conversation = %conversation, recipes = selected.len(), failed_sends, "Delivered recipes");

        let reply = Reply::plain(i18n.t("next-action")).with_suggestions(self.main_menu());
        self.send(conversation, reply).await
    }

    async fn prepare_delivery(
        &self,
        conversation: ConversationId,
        recipe: &RecipeRef,
        labels: &SectionLabels,
    ) -> Delivery {
        let lookup = tokio::time::timeout(self.settings.lookup_timeout, self.deps.directory.lookup(&recipe.id));

        let detail = match lookup.await {
            Ok(Ok(Some(detail))) => detail,
            Ok(Ok(None)) => {
                warn!(conversation = %conversation, recipe_id = %recipe.id, "Recipe not found");
                return Delivery::NotFound;
            }
            Ok(Err(e)) => {
                warn!(conversation = %conversation, recipe_id = %recipe.id, error = %e, "Recipe lookup failed");
                return Delivery::Failed;
            }
            Err(_) => {
                warn!(
                    conversation = %conversation,
                    recipe_id = %recipe.id,
                    timeout_ms = self.settings.lookup_timeout.as_millis() as u64,
                    "Recipe lookup timed out"
                );
                return Delivery::Failed;
            }
        };

        let text = compose_recipe_text(&detail, labels);
        let translated = translate_or_original(self.deps.translator.as_ref(), &text, &self.settings.language).await;
        Delivery::Ready(emphasize_labels(&translated, labels))
    }

    fn sample(&self, recipes: &[RecipeRef], count: usize) -> Vec<RecipeRef> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sample_recipes(recipes, count, &mut *rng)
    }

    fn remember_categories(&self, categories: &[String]) {
        let mut known = self
            .known_categories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        known.extend(categories.iter().cloned());
    }
}

struct KnownVocabulary<'a> {
    controller: &'a FlowController,
}

impl FlowVocabulary for KnownVocabulary<'_> {
    fn is_category(&self, text: &str) -> bool {
        self.controller
            .known_categories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(text.trim())
    }

    fn is_selection_keyword(&self, text: &str) -> bool {
        self.controller.i18n().t("choose-recipes-button") == text.trim()
    }
}
