//! Idea Router core - the message pipeline behind the Telegram bot.
//!
//! An inbound message is classified by keywords, structured by a language
//! model and forwarded to a spreadsheet and a task tracker before the user
//! gets a single reply:
//!
//! - **classifier**: Category, priority and assignee from keyword rules
//! - **completion**: Fail-open summarization via an OpenAI-compatible API
//! - **sinks**: Spreadsheet row and chained task-tracker submission
//! - **router**: Per-message orchestration and the `Replier` seam
//! - **config**: Environment-driven configuration built once at startup
//!
//! The crate knows nothing about Telegram; transports implement [`Replier`]
//! and build [`InboundMessage`] values.

pub mod classifier;
pub mod completion;
pub mod config;
pub mod error;
pub mod router;
pub mod sinks;
pub mod types;

pub use classifier::{CategoryRule, Classifier, ClassifierRules, DEFAULT_CATEGORY};
pub use completion::{
    fallback_text, CompletionGateway, CompletionRequest, CompletionService, OpenAiClient,
};
pub use config::{AppConfig, CompletionConfig};
pub use error::{CompletionError, ConfigError, InputError, SinkError, TransportError};
pub use router::{
    format_reply, validate, IdeaRouter, Replier, ReplyHandle, RouteOutcome, RouteState,
    ACK_TEXT, APOLOGY_TEXT,
};
pub use sinks::{SinkDispatcher, SinkRecord, SpreadsheetRow, TaskFields, TaskRecord};
pub use types::{
    Assignee, Classification, InboundMessage, MessageKind, Priority, ProcessedResult,
};
