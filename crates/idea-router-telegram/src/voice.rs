//! Voice note transcription.
//!
//! Voice files are downloaded through the Bot API and sent to an
//! OpenAI-compatible `/audio/transcriptions` endpoint.

use std::time::Duration;

use idea_router_core::CompletionConfig;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Voice;
use tracing::{debug, info};

use crate::error::{Result, TelegramError};

/// Transcription model.
pub const WHISPER_MODEL: &str = "whisper-1";

/// Spoken language of voice notes.
pub const LANGUAGE: &str = "ru";

/// Upper bound for one transcription request.
const TRANSCRIPTION_TIMEOUT_SECS: u64 = 60;

/// Client for OpenAI-compatible transcription endpoints.
#[derive(Clone)]
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TRANSCRIPTION_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from the completion settings, which share the API key and base URL.
    ///
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &CompletionConfig) -> Result<Option<Self>> {
        match &config.api_key {
            Some(key) => Ok(Some(Self::new(key.clone(), config.base_url.clone())?)),
            None => Ok(None),
        }
    }

    /// Transcribe an OGG/Opus voice note.
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        debug!(bytes = audio.len(), "Transcribing voice note");

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name("voice.ogg")
            .mime_str("audio/ogg")?;

        let form = reqwest::multipart::Form::new()
            .text("model", WHISPER_MODEL)
            .text("language", LANGUAGE)
            .text("response_format", "text")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelegramError::TranscriptionError(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let text = response.text().await?.trim().to_string();
        info!(chars = text.chars().count(), "Voice note transcribed");
        Ok(text)
    }
}

/// Download a voice note's audio through the Bot API.
pub async fn download_voice(bot: &Bot, voice: &Voice) -> Result<Vec<u8>> {
    let file = bot
        .get_file(voice.file.id.clone())
        .await
        .map_err(|e| TelegramError::DownloadFailed(e.to_string()))?;

    let mut buf = Vec::with_capacity(voice.file.size as usize);
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| TelegramError::DownloadFailed(e.to_string()))?;

    debug!(bytes = buf.len(), "Voice note downloaded");
    Ok(buf)
}
