//! Pure dispatch of user input against the current flow state
//!
//! Every message is first classified into an [`Input`], then
//! [`transition`] maps `(state, input)` to the [`Action`] the controller
//! executes. Neither step performs I/O.

use lazy_static::lazy_static;
use regex::Regex;

use crate::dialogue::FlowState;

/// Name of the command starting a category search
pub const SEARCH_COMMAND: &str = "category_search_random";

lazy_static! {
    // "/name", "/name@bot_name", "/name argument text"
    static ref COMMAND_REGEX: Regex =
        Regex::new(r"(?s)^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s+(.*))?$")
            .expect("Command pattern should be valid");
}

/// Classified user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    /// `/help` or the commands menu button
    Help,
    /// The bot description menu button
    About,
    Search { argument: Option<String> },
    Cancel,
    UnknownCommand(String),
    Text(String),
}

/// Button labels of the top-level menu, in the user's language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLabels {
    pub commands: String,
    pub about: String,
}

/// Classify raw message text
pub fn classify(text: &str, menu: &MenuLabels) -> Input {
    let trimmed = text.trim();

    if let Some(captures) = COMMAND_REGEX.captures(trimmed) {
        let name = captures.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let argument = captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .filter(|arg| !arg.is_empty());

        return match name.as_str() {
            "start" => Input::Start,
            "help" => Input::Help,
            "cancel" => Input::Cancel,
            SEARCH_COMMAND => Input::Search { argument },
            _ => Input::UnknownCommand(name),
        };
    }

    let lowered = trimmed.to_lowercase();
    if lowered == menu.commands.to_lowercase() {
        Input::Help
    } else if lowered == menu.about.to_lowercase() {
        Input::About
    } else {
        // Free text is kept as typed; a category is passed on verbatim
        Input::Text(text.to_string())
    }
}

/// What the controller does in response to an input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Greet,
    ShowCommands,
    ShowAbout,
    /// IDLE → AWAITING_CATEGORY, or restart from any state
    StartSearch { argument: Option<String> },
    /// AWAITING_CATEGORY → AWAITING_SELECTION
    ChooseCategory { category: String },
    /// AWAITING_SELECTION → IDLE
    DeliverRecipes,
    CancelFlow,
    /// A category or selection button tapped with no flow running
    StaleChoice,
    NotUnderstood,
}

/// Known free-text inputs belonging to the flow
pub trait FlowVocabulary {
    fn is_category(&self, text: &str) -> bool;
    fn is_selection_keyword(&self, text: &str) -> bool;
}

/// Map the current state and an input to the next action
///
/// Commands take precedence in every state. Free text is the chosen category
/// while awaiting one, and confirms the selection while awaiting that.
pub fn transition(state: FlowState, input: Input, vocabulary: &dyn FlowVocabulary) -> Action {
    match (state, input) {
        (_, Input::Start) => Action::Greet,
        (_, Input::Help) => Action::ShowCommands,
        (_, Input::About) => Action::ShowAbout,
        (_, Input::Search { argument }) => Action::StartSearch { argument },
        (_, Input::Cancel) => Action::CancelFlow,
        (_, Input::UnknownCommand(_)) => Action::NotUnderstood,

        (FlowState::AwaitingCategory, Input::Text(category)) => Action::ChooseCategory { category },
        (FlowState::AwaitingSelection, Input::Text(_)) => Action::DeliverRecipes,

        (FlowState::Idle, Input::Text(text))
            if vocabulary.is_category(&text) || vocabulary.is_selection_keyword(&text) =>
        {
            Action::StaleChoice
        }
        (FlowState::Idle, Input::Text(_)) => Action::NotUnderstood,
    }
}
