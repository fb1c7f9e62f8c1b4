//! Error types for the Telegram bot.

use idea_router_core::ConfigError;
use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Webhook mode requested without a public URL.
    #[error("Public URL not set. Set PUBLIC_URL or RENDER_EXTERNAL_URL for webhook mode.")]
    NoPublicUrl,

    /// Public URL cannot be turned into a webhook URL.
    #[error("Invalid webhook URL: {0}")]
    InvalidWebhookUrl(String),

    /// Webhook registration failed.
    #[error("Failed to register webhook: {0}")]
    WebhookFailed(String),

    /// Voice file could not be downloaded.
    #[error("Failed to download voice file: {0}")]
    DownloadFailed(String),

    /// Transcription service error.
    #[error("Transcription error: {0}")]
    TranscriptionError(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::HttpError(e.to_string())
    }
}
