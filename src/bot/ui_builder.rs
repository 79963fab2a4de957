//! UI Builder module for creating keyboards and the bot command list

use teloxide::types::{BotCommand, KeyboardButton, KeyboardMarkup};

use crate::flow::transition::SEARCH_COMMAND;
use crate::flow::SuggestedReplies;
use crate::localization::Localizer;

/// Create a resizable reply keyboard from suggested replies
pub fn build_reply_keyboard(suggestions: &SuggestedReplies) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = suggestions
        .rows
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton::new(label.clone())).collect())
        .collect();

    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Commands advertised in the Telegram command menu
pub fn bot_commands(i18n: Localizer<'_>) -> Vec<BotCommand> {
    let describe = |key: &str| {
        let text = i18n.t(key);
        // Catalog entries read "/command - description"
        text.split_once(" - ")
            .map(|(_, description)| description.trim().to_string())
            .unwrap_or(text)
    };

    vec![
        BotCommand::new("start", describe("commands-start")),
        BotCommand::new("help", describe("commands-help")),
        BotCommand::new(SEARCH_COMMAND, describe("commands-search")),
        BotCommand::new("cancel", describe("commands-cancel")),
    ]
}
