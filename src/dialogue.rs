//! Conversation state for the category search flow.

use serde::{Deserialize, Serialize};

use crate::errors::CountError;
use crate::recipe_model::RecipeRef;

/// Opaque identity of one conversation, as provided by the messaging channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Step of the category search flow a conversation is in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    #[default]
    Idle,
    AwaitingCategory,
    AwaitingSelection,
}

/// Per-conversation session data
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Number of recipes asked for; zero until the search command captured it
    pub requested_count: usize,
    /// Recipes drawn from the chosen category, in presentation order
    pub selected_recipes: Vec<RecipeRef>,
    pub state: FlowState,
}

/// Partial update applied to a session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub requested_count: Option<usize>,
    pub selected_recipes: Option<Vec<RecipeRef>>,
}

impl SessionUpdate {
    pub fn requested_count(count: usize) -> Self {
        Self {
            requested_count: Some(count),
            ..Default::default()
        }
    }

    pub fn selected_recipes(recipes: Vec<RecipeRef>) -> Self {
        Self {
            selected_recipes: Some(recipes),
            ..Default::default()
        }
    }

    pub fn with_requested_count(mut self, count: usize) -> Self {
        self.requested_count = Some(count);
        self
    }

    pub(crate) fn apply_to(self, session: &mut Session) {
        if let Some(count) = self.requested_count {
            session.requested_count = count;
        }
        if let Some(recipes) = self.selected_recipes {
            session.selected_recipes = recipes;
        }
    }
}

/// Validates the argument of the search command as a positive recipe count
pub fn validate_recipe_count(argument: Option<&str>) -> Result<usize, CountError> {
    let trimmed = match argument.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(CountError::Missing),
    };

    let count: i64 = trimmed
        .parse()
        .map_err(|_| CountError::NotANumber(trimmed.to_string()))?;

    if count <= 0 {
        return Err(CountError::NotPositive(count));
    }

    usize::try_from(count).map_err(|_| CountError::NotANumber(trimmed.to_string()))
}
