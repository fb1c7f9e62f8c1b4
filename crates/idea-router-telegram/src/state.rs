//! Shared state for the Telegram bot.

use std::sync::Arc;

use idea_router_core::{AppConfig, IdeaRouter};
use tracing::{info, warn};

use crate::error::Result;
use crate::voice::WhisperTranscriber;

/// State shared by every handler.
pub struct BotState {
    router: IdeaRouter,
    transcriber: Option<WhisperTranscriber>,
}

impl BotState {
    pub fn new(router: IdeaRouter, transcriber: Option<WhisperTranscriber>) -> Self {
        Self {
            router,
            transcriber,
        }
    }

    /// Build the router and transcriber from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let router = IdeaRouter::from_config(config)?;
        let transcriber = WhisperTranscriber::from_config(&config.completion)?;

        if !config.has_completion() {
            warn!("OPENAI_API_KEY not set, messages will be stored without summarization");
        }
        if transcriber.is_none() {
            warn!("Voice transcription disabled (no OPENAI_API_KEY)");
        }
        if !router.dispatcher().has_spreadsheet() {
            warn!("GOOGLE_SCRIPT_URL not set, messages will not be stored");
        }

        info!(
            classify = router.classifies(),
            summarization = router.gateway().is_available(),
            spreadsheet = router.dispatcher().has_spreadsheet(),
            task_tracker = router.dispatcher().has_task_tracker(),
            voice = transcriber.is_some(),
            "Bot state initialized"
        );

        Ok(Self::new(router, transcriber))
    }

    pub fn router(&self) -> &IdeaRouter {
        &self.router
    }

    pub fn transcriber(&self) -> Option<&WhisperTranscriber> {
        self.transcriber.as_ref()
    }

    pub fn has_summarization(&self) -> bool {
        self.router.gateway().is_available()
    }

    pub fn has_spreadsheet(&self) -> bool {
        self.router.dispatcher().has_spreadsheet()
    }

    pub fn has_task_tracker(&self) -> bool {
        self.router.dispatcher().has_task_tracker()
    }

    pub fn has_voice(&self) -> bool {
        self.transcriber.is_some()
    }
}

/// Create shared state wrapped in an Arc.
pub fn create_shared_state(config: &AppConfig) -> Result<Arc<BotState>> {
    Ok(Arc::new(BotState::from_config(config)?))
}
