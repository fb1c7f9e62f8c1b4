//! Telegram side of the router's reply seam and message normalization.

use async_trait::async_trait;
use idea_router_core::{InboundMessage, MessageKind, Replier, ReplyHandle, TransportError};
use teloxide::prelude::*;
use teloxide::types::{MessageId, ReplyParameters};

/// Telegram's maximum message length, in UTF-16 code units.
pub const MAX_MESSAGE_UNITS: usize = 4096;

const TRUNCATION_MARKER: &str = "\n…";

/// Cut a message down to Telegram's length limit.
///
/// Telegram counts UTF-16 code units, so emoji outside the BMP take two.
pub fn truncate_message(text: &str, max_units: usize) -> String {
    if text.encode_utf16().count() <= max_units {
        return text.to_string();
    }
    let budget = max_units.saturating_sub(TRUNCATION_MARKER.encode_utf16().count());
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        out.push(c);
    }
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Sends replies to one chat, threading them under the user's message.
pub struct TelegramReplier {
    bot: Bot,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
}

impl TelegramReplier {
    pub fn new(bot: Bot, chat_id: ChatId, reply_to: Option<MessageId>) -> Self {
        Self {
            bot,
            chat_id,
            reply_to,
        }
    }

    /// Reply to the given message in its chat.
    pub fn for_message(bot: Bot, msg: &Message) -> Self {
        Self::new(bot, msg.chat.id, Some(msg.id))
    }
}

#[async_trait]
impl Replier for TelegramReplier {
    async fn reply(&self, text: &str) -> Result<ReplyHandle, TransportError> {
        let mut req = self
            .bot
            .send_message(self.chat_id, truncate_message(text, MAX_MESSAGE_UNITS));
        if let Some(msg_id) = self.reply_to {
            req = req.reply_parameters(ReplyParameters::new(msg_id));
        }
        let sent = req.await.map_err(|e| TransportError(e.to_string()))?;
        Ok(ReplyHandle(sent.id.0))
    }

    async fn edit(&self, handle: ReplyHandle, text: &str) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(
                self.chat_id,
                MessageId(handle.0),
                truncate_message(text, MAX_MESSAGE_UNITS),
            )
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(())
    }
}

/// Sender id and display name of a message.
///
/// The display name is the username, then the first name, then the chat id.
pub fn sender_of(msg: &Message) -> (i64, String) {
    match msg.from.as_ref() {
        Some(user) => {
            let name = user
                .username
                .clone()
                .unwrap_or_else(|| user.first_name.clone());
            (user.id.0 as i64, name)
        }
        None => (msg.chat.id.0, msg.chat.id.0.to_string()),
    }
}

/// Name of a media kind the bot does not process.
pub fn media_kind(msg: &Message) -> &'static str {
    if msg.photo().is_some() {
        "photo"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.video().is_some() {
        "video"
    } else if msg.video_note().is_some() {
        "video_note"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.document().is_some() {
        "document"
    } else if msg.location().is_some() {
        "location"
    } else if msg.voice().is_some() {
        "voice"
    } else {
        "other"
    }
}

/// Normalize a Telegram message for the router.
pub fn inbound_message(msg: &Message, text: impl Into<String>, kind: MessageKind) -> InboundMessage {
    let (sender_id, name) = sender_of(msg);
    InboundMessage {
        sender_id,
        sender_display_name: name,
        text: text.into(),
        kind,
        received_at: msg.date,
    }
}
