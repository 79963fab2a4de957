//! Outbound message model and the channel seam the flow writes to.

use anyhow::Result;
use async_trait::async_trait;

use crate::dialogue::ConversationId;

/// How the text of a reply is to be interpreted by the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Telegram-flavoured HTML: `<b>` emphasis, everything else escaped
    Html,
}

/// Quick-reply buttons offered with a message, laid out in rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedReplies {
    pub rows: Vec<Vec<String>>,
}

impl SuggestedReplies {
    /// Lay out labels left to right, `per_row` buttons per row
    pub fn grid<I, S>(labels: I, per_row: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let rows = labels
            .chunks(per_row.max(1))
            .map(<[String]>::to_vec)
            .collect();
        Self { rows }
    }

    pub fn single_row<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: vec![labels.into_iter().map(Into::into).collect()],
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}

/// One message emitted by the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub format: TextFormat,
    pub suggested_replies: Option<SuggestedReplies>,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            suggested_replies: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            suggested_replies: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: SuggestedReplies) -> Self {
        self.suggested_replies = Some(suggestions);
        self
    }
}

/// Destination of flow output, implemented by the messaging channel
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, conversation: ConversationId, reply: Reply) -> Result<()>;
}
