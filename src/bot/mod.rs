//! Bot module for handling Telegram interactions
//!
//! - `message_handler`: Turns incoming Telegram messages into flow input
//! - `telegram_sink`: Delivers flow replies through the Bot API
//! - `ui_builder`: Creates reply keyboards and the registered command list

pub mod message_handler;
pub mod telegram_sink;
pub mod ui_builder;

pub use message_handler::message_handler;
pub use telegram_sink::TelegramSink;
pub use ui_builder::{bot_commands, build_reply_keyboard};
