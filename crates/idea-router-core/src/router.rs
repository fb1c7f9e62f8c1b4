//! Per-message orchestration.
//!
//! Every message walks `Received → Classified → Summarized → Dispatched →
//! Replied`, or stops at `Aborted` when it has nothing to process. External
//! failures are absorbed by the step that owns them, so the router always
//! reaches a terminal state and sends exactly one final reply.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::completion::CompletionGateway;
use crate::config::AppConfig;
use crate::error::{ConfigError, InputError, TransportError};
use crate::sinks::{SinkDispatcher, SinkRecord};
use crate::types::{InboundMessage, MessageKind, ProcessedResult};

/// Acknowledgment sent before processing starts.
pub const ACK_TEXT: &str = "🤖 Обрабатываю через GPT...";

/// Reply for messages that cannot be processed.
pub const APOLOGY_TEXT: &str =
    "❌ Не удалось обработать сообщение. Отправьте текст или голосовое сообщение с вашей идеей.";

/// Identifies a reply already sent, so it can be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHandle(pub i32);

/// Sends replies back to the sender of the message being handled.
#[async_trait]
pub trait Replier: Send + Sync {
    /// Send a new reply.
    async fn reply(&self, text: &str) -> Result<ReplyHandle, TransportError>;

    /// Replace the text of a previously sent reply.
    async fn edit(&self, handle: ReplyHandle, text: &str) -> Result<(), TransportError>;
}

/// Pipeline state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Received,
    Classified,
    Summarized,
    Dispatched,
    Replied,
    Aborted,
}

impl RouteState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Replied | Self::Aborted)
    }
}

/// What happened to a message.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// Terminal state reached.
    pub state: RouteState,
    /// Final reply text.
    pub reply: String,
    /// Whether the final reply reached the transport.
    pub delivered: bool,
    /// Completion output, absent for aborted messages.
    pub processed: Option<ProcessedResult>,
}

/// Check that a message has something to process.
pub fn validate(message: &InboundMessage) -> Result<(), InputError> {
    if let MessageKind::Unsupported(kind) = &message.kind {
        return Err(InputError::UnsupportedKind(kind.clone()));
    }
    if message.text.trim().is_empty() {
        return Err(InputError::EmptyText);
    }
    Ok(())
}

/// Characters of a voice transcript shown back to the user.
const TRANSCRIPT_PREVIEW_CHARS: usize = 100;

/// Format the final reply for a processed message.
///
/// Voice replies start with what was recognized.
pub fn format_reply(kind: &MessageKind, processed: &ProcessedResult) -> String {
    let mut reply = String::new();
    if *kind == MessageKind::VoiceTranscript {
        let original = &processed.original_text;
        let mut preview: String = original.chars().take(TRANSCRIPT_PREVIEW_CHARS).collect();
        if preview.len() < original.len() {
            preview.push('…');
        }
        reply.push_str(&format!("📝 Распознано: {}\n\n", preview));
    }
    reply.push_str(&format!("✅ Обработано:\n\n{}", processed.summary_text));
    if let Some(c) = &processed.classification {
        reply.push_str(&format!(
            "\n\n📂 Категория: {}\n⚡ Приоритет: {}\n👤 Ответственный: {}",
            c.category, c.priority, c.assignee.name
        ));
    }
    reply
}

/// Classifies, summarizes, dispatches and replies.
#[derive(Clone)]
pub struct IdeaRouter {
    classifier: Option<Classifier>,
    gateway: CompletionGateway,
    dispatcher: SinkDispatcher,
    acknowledge: bool,
}

impl IdeaRouter {
    /// Create a router. Pass `None` as classifier to skip classification.
    pub fn new(
        classifier: Option<Classifier>,
        gateway: CompletionGateway,
        dispatcher: SinkDispatcher,
    ) -> Self {
        Self {
            classifier,
            gateway,
            dispatcher,
            acknowledge: false,
        }
    }

    /// Send [`ACK_TEXT`] first and edit it into the final reply.
    pub fn with_acknowledgment(mut self, acknowledge: bool) -> Self {
        self.acknowledge = acknowledge;
        self
    }

    /// Build the router and its collaborators from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let classifier = if config.classify {
            Some(Classifier::new(config.classifier_rules()?))
        } else {
            None
        };
        let gateway = CompletionGateway::from_config(&config.completion)?;
        let dispatcher = SinkDispatcher::new(
            config.spreadsheet_url.clone(),
            config.task_tracker_url.clone(),
            config.sink_timeout,
        )?;

        Ok(Self::new(classifier, gateway, dispatcher).with_acknowledgment(config.acknowledge))
    }

    pub fn gateway(&self) -> &CompletionGateway {
        &self.gateway
    }

    pub fn dispatcher(&self) -> &SinkDispatcher {
        &self.dispatcher
    }

    pub fn classifies(&self) -> bool {
        self.classifier.is_some()
    }

    /// Handle one message to a terminal state.
    pub async fn handle(&self, message: InboundMessage, replier: &dyn Replier) -> RouteOutcome {
        let sender_id = message.sender_id;
        debug!(sender_id, state = ?RouteState::Received, kind = message.kind.as_str(), "Message received");

        if let Err(e) = validate(&message) {
            info!(sender_id, step = "validate", error = %e, "Message rejected");
            let delivered = deliver(replier, None, APOLOGY_TEXT, sender_id).await;
            return RouteOutcome {
                state: RouteState::Aborted,
                reply: APOLOGY_TEXT.to_string(),
                delivered,
                processed: None,
            };
        }

        let ack = if self.acknowledge {
            match replier.reply(ACK_TEXT).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(sender_id, step = "acknowledge", error = %e, "Failed to send acknowledgment");
                    None
                }
            }
        } else {
            None
        };

        let classification = self.classifier.as_ref().map(|c| c.classify(&message.text));
        debug!(sender_id, state = ?RouteState::Classified, "Classification done");

        let summary_text = self.gateway.summarize(&message.text).await;
        let processed = ProcessedResult {
            original_text: message.text.clone(),
            summary_text,
            classification,
        };
        debug!(sender_id, state = ?RouteState::Summarized, "Summary ready");

        let record = SinkRecord::build(&message, &processed);
        self.dispatcher.dispatch(&record).await;
        debug!(sender_id, state = ?RouteState::Dispatched, "Sinks done");

        let reply = format_reply(&message.kind, &processed);
        let delivered = deliver(replier, ack, &reply, sender_id).await;
        info!(sender_id, delivered, "Message processed");

        RouteOutcome {
            state: RouteState::Replied,
            reply,
            delivered,
            processed: Some(processed),
        }
    }
}

/// Deliver the final reply once: edit the acknowledgment if there is one.
async fn deliver(
    replier: &dyn Replier,
    ack: Option<ReplyHandle>,
    text: &str,
    sender_id: i64,
) -> bool {
    let result = match ack {
        Some(handle) => replier.edit(handle, text).await,
        None => replier.reply(text).await.map(|_| ()),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(sender_id, step = "reply", error = %e, "Failed to deliver reply");
            false
        }
    }
}
