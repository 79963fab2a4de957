//! Delivery of flow replies through the Telegram Bot API

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

use crate::dialogue::ConversationId;
use crate::flow::{Reply, ReplySink, TextFormat};

use super::ui_builder::build_reply_keyboard;

/// Longest text Telegram accepts in one message, in characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn send(&self, conversation: ConversationId, reply: Reply) -> Result<()> {
        let chat_id = ChatId(conversation.0);
        let parts = match reply.format {
            TextFormat::Html => split_html(&reply.text, MAX_MESSAGE_CHARS),
            TextFormat::Plain => split_message(&reply.text, MAX_MESSAGE_CHARS),
        };
        let last = parts.len().saturating_sub(1);

        for (index, part) in parts.into_iter().enumerate() {
            let mut request = self.bot.send_message(chat_id, part);
            if reply.format == TextFormat::Html {
                request = request.parse_mode(ParseMode::Html);
            }
            // The keyboard goes with the final part only
            if index == last {
                if let Some(suggestions) = &reply.suggested_replies {
                    request = request.reply_markup(build_reply_keyboard(suggestions));
                }
            }
            request.await?;
        }

        debug!(user_id = %chat_id, "Reply sent");
        Ok(())
    }
}

/// Split text into chunks of at most `limit` characters
///
/// Chunks break after a newline when possible. A single line longer than the
/// limit is cut mid-line, never inside an HTML entity or tag.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        let mut rest = line;
        while rest.chars().count() > limit {
            let cut = cut_point(rest, limit);
            parts.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current.push_str(rest);
        current_len = rest.chars().count();
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Split HTML text so that every chunk is well-formed on its own
///
/// A `<b>` span crossing a cut is closed at the end of one chunk and reopened
/// at the start of the next. Chunks left blank by the split are dropped.
pub fn split_html(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit.max(1) {
        return vec![text.to_string()];
    }

    let reserve = BOLD_OPEN.len() + BOLD_CLOSE.len();
    let mut parts = Vec::new();
    let mut open = false;

    for mut part in split_message(text, limit.saturating_sub(reserve).max(1)) {
        if open {
            match part.strip_prefix(BOLD_CLOSE) {
                Some(rest) => part = rest.to_string(),
                None => part.insert_str(0, BOLD_OPEN),
            }
        }
        open = ends_inside_bold(&part);
        if open {
            part.push_str(BOLD_CLOSE);
        }
        if !part.trim().is_empty() && part != format!("{BOLD_OPEN}{BOLD_CLOSE}") {
            parts.push(part);
        }
    }
    parts
}

const BOLD_OPEN: &str = "<b>";
const BOLD_CLOSE: &str = "</b>";

fn ends_inside_bold(part: &str) -> bool {
    match (part.rfind(BOLD_OPEN), part.rfind(BOLD_CLOSE)) {
        (Some(opened), Some(closed)) => opened > closed,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Byte offset of the `limit`-th character, moved back before an open entity or tag
fn cut_point(text: &str, limit: usize) -> usize {
    let mut cut = text.char_indices().nth(limit).map_or(text.len(), |(i, _)| i);
    for (start, end) in [('&', ';'), ('<', '>')] {
        if let Some(begin) = text[..cut].rfind(start) {
            if begin > 0 && !text[begin..cut].contains(end) {
                cut = begin;
            }
        }
    }
    cut
}
