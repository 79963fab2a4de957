//! # Recipes Telegram Bot
//!
//! A Telegram bot that suggests random recipes from a chosen meal category,
//! translating names and cooking instructions into the user's language.

pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod dialogue;
pub mod directory;
pub mod errors;
pub mod flow;
pub mod localization;
pub mod recipe_model;
pub mod session_store;
pub mod translation;

// Re-export types for easier access
pub use config::AppConfig;
pub use dialogue::{ConversationId, FlowState, Session};
pub use directory::{MealDbClient, RecipeDirectory};
pub use errors::{BotError, BotResult, CountError};
pub use flow::{FlowController, FlowDependencies, FlowSettings, IncomingMessage};
pub use recipe_model::{RecipeDetail, RecipeRef};
pub use session_store::SessionStore;
pub use translation::{GoogleTranslateClient, PassthroughTranslator, Translator};
