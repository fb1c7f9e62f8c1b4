//! Data model shared by the pipeline steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain text typed by the user.
    Text,
    /// Text produced by transcribing a voice note.
    VoiceTranscript,
    /// Media the bot does not process, named by kind ("photo", "sticker", ...).
    Unsupported(String),
}

impl MessageKind {
    /// Value written to the spreadsheet `message_type` column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::VoiceTranscript => "voice",
            Self::Unsupported(kind) => kind,
        }
    }
}

/// A message normalized by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender_id: i64,
    pub sender_display_name: String,
    pub text: String,
    pub kind: MessageKind,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a text message received now.
    pub fn text(sender_id: i64, sender_display_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender_id, sender_display_name, text, MessageKind::Text)
    }

    /// Create a message of the given kind received now.
    pub fn new(
        sender_id: i64,
        sender_display_name: impl Into<String>,
        text: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            sender_id,
            sender_display_name: sender_display_name.into(),
            text: text.into(),
            kind,
            received_at: Utc::now(),
        }
    }
}

/// Idea priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Label shown to users and written to the spreadsheet.
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "высокий",
            Self::Medium => "средний",
            Self::Low => "низкий",
        }
    }

    /// Numeric priority understood by the task tracker.
    pub fn tracker_value(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Person responsible for a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    /// Display name, written to the spreadsheet.
    pub name: String,
    /// User id in the task tracker.
    pub tracker_id: u32,
}

impl Assignee {
    /// Fallback when no category rule names anyone.
    pub fn unassigned() -> Self {
        Self {
            name: "Не назначен".to_string(),
            tracker_id: 1,
        }
    }
}

/// Result of keyword classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: String,
    pub priority: Priority,
    pub assignee: Assignee,
}

/// Output of the completion step for one message.
#[derive(Debug, Clone)]
pub struct ProcessedResult {
    pub original_text: String,
    pub summary_text: String,
    pub classification: Option<Classification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_tracker_values() {
        assert_eq!(Priority::Low.tracker_value(), 0);
        assert_eq!(Priority::Medium.tracker_value(), 1);
        assert_eq!(Priority::High.tracker_value(), 2);
    }

    #[test]
    fn test_priority_labels() {
        assert_eq!(Priority::High.to_string(), "высокий");
        assert_eq!(Priority::Low.label(), "низкий");
    }

    #[test]
    fn test_message_kind_column_value() {
        assert_eq!(MessageKind::Text.as_str(), "text");
        assert_eq!(MessageKind::VoiceTranscript.as_str(), "voice");
    }
}
