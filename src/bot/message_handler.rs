//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::dialogue::ConversationId;
use crate::flow::{FlowController, IncomingMessage};

/// Convert a Telegram message into flow input
pub fn incoming_message(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        conversation: ConversationId(msg.chat.id.0),
        text: msg.text().map(str::to_string),
        sender_name: msg.from.as_ref().map(|user| user.full_name()),
    }
}

pub async fn message_handler(msg: Message, controller: Arc<FlowController>) -> Result<()> {
    let message = incoming_message(&msg);
    debug!(
        user_id = %msg.chat.id,
        has_text = message.text.is_some(),
        "Received message from user"
    );

    if let Err(e) = controller.handle(message).await {
        error!(user_id = %msg.chat.id, error = %e, "Failed to deliver reply");
        return Err(e);
    }

    Ok(())
}
