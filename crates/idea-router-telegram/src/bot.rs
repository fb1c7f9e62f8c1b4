//! Main Telegram bot implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Json;
use idea_router_core::AppConfig;
use serde_json::{json, Value};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::{webhooks, Polling};
use teloxide::RequestError;
use tracing::{error, info, warn};
use url::Url;

use crate::error::{Result, TelegramError};
use crate::handlers::{
    handle_command, handle_text, handle_unknown_command, handle_unsupported, handle_voice, Command,
};
use crate::state::{create_shared_state, BotState};
use crate::transport::media_kind;

/// Path Telegram pushes updates to in webhook mode.
pub const WEBHOOK_PATH: &str = "/webhook";

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Long polling against the Bot API.
    LongPoll,
    /// Telegram pushes updates to an HTTP endpoint.
    WebhookPush,
}

/// The Idea Router Telegram bot.
pub struct IdeaBot {
    bot: Bot,
    state: Arc<BotState>,
    config: AppConfig,
}

impl IdeaBot {
    /// Create the bot from configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let bot = Bot::new(config.telegram_token.clone());
        let state = create_shared_state(&config)?;
        Ok(Self { bot, state, config })
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Run until Ctrl+C in the given mode.
    pub async fn run(&self, mode: DeliveryMode) -> Result<()> {
        match mode {
            DeliveryMode::LongPoll => self.start_polling().await,
            DeliveryMode::WebhookPush => self.start_webhook().await,
        }
    }

    /// Start the bot in polling mode. Updates queued while offline are dropped.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let listener = Polling::builder(self.bot.clone())
            .drop_pending_updates()
            .build();

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.state)))
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the polling listener"),
            )
            .await;

        Ok(())
    }

    /// Start the bot in webhook mode, serving `/webhook` and `/health`.
    pub async fn start_webhook(&self) -> Result<()> {
        let public_url = self
            .config
            .public_url
            .as_deref()
            .ok_or(TelegramError::NoPublicUrl)?;
        let url = webhook_url(public_url)?;
        let address = SocketAddr::from(([0, 0, 0, 0], self.config.webhook_port));

        info!(url = %url, %address, "Starting Telegram bot in webhook mode...");

        let options = webhooks::Options::new(address, url).drop_pending_updates();
        let (listener, stop_flag, router) = webhooks::axum_to_router(self.bot.clone(), options)
            .await
            .map_err(|e| TelegramError::WebhookFailed(e.to_string()))?;

        let app = router.route("/health", get(health));
        let tcp = tokio::net::TcpListener::bind(address).await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(tcp, app)
                .with_graceful_shutdown(stop_flag)
                .await
            {
                error!(error = %e, "Webhook server failed");
            }
        });

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.state)))
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
            )
            .await;

        Ok(())
    }
}

/// Full webhook URL for a public base URL.
pub fn webhook_url(public_url: &str) -> Result<Url> {
    let raw = format!("{}{}", public_url.trim_end_matches('/'), WEBHOOK_PATH);
    Url::parse(&raw).map_err(|e| TelegramError::InvalidWebhookUrl(format!("{}: {}", raw, e)))
}

/// Liveness check for the hosting platform.
pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "bot": "running"}))
}

/// Update routing shared by both delivery modes.
fn schema(state: Arc<BotState>) -> UpdateHandler<RequestError> {
    let state_for_commands = Arc::clone(&state);
    let state_for_text = Arc::clone(&state);
    let state_for_voice = Arc::clone(&state);
    let state_for_media = Arc::clone(&state);

    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                    let state = Arc::clone(&state_for_commands);
                    info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                    async move { handle_command(bot, msg, cmd, state).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().map(|t| t.starts_with('/')).unwrap_or(false))
                .endpoint(|bot: Bot, msg: Message| async move {
                    handle_unknown_command(bot, msg).await
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some())
                .endpoint(move |bot: Bot, msg: Message| {
                    let state = Arc::clone(&state_for_text);
                    info!(chat_id = %msg.chat.id, "Text message received");
                    async move { handle_text(bot, msg, state).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.voice().is_some())
                .endpoint(move |bot: Bot, msg: Message| {
                    let state = Arc::clone(&state_for_voice);
                    info!(chat_id = %msg.chat.id, "Voice message received");
                    async move { handle_voice(bot, msg, state).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| media_kind(&msg) != "other")
                .endpoint(move |bot: Bot, msg: Message| {
                    let state = Arc::clone(&state_for_media);
                    info!(chat_id = %msg.chat.id, kind = media_kind(&msg), "Unsupported message received");
                    async move { handle_unsupported(bot, msg, state).await }
                }),
        )
}
