//! Telegram front-end for the Idea Router.
//!
//! Text and voice messages sent to the bot are routed through
//! [`idea_router_core::IdeaRouter`]; the user gets one structured reply.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//!
//! Optional:
//! - `OPENAI_API_KEY`: Summarization and voice transcription
//! - `GOOGLE_SCRIPT_URL`: Spreadsheet web app (also serves `/stats`)
//! - `BITRIX_WEBHOOK_URL`: Task tracker inbound webhook
//! - `PUBLIC_URL` / `RENDER_EXTERNAL_URL`: Public base URL (webhook mode)
//! - `PORT`: Webhook listen port (default: 8443)
//!
//! # Example
//!
//! ```no_run
//! use idea_router_core::AppConfig;
//! use idea_router_telegram::{DeliveryMode, IdeaBot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = IdeaBot::new(AppConfig::from_env()?)?;
//!     bot.run(DeliveryMode::LongPoll).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Welcome message and integration status
//! - `/help` - What the bot does
//! - `/stats` - Per-user statistics from the spreadsheet

pub mod bot;
pub mod error;
pub mod handlers;
pub mod state;
pub mod transport;
pub mod voice;

pub use bot::{health, webhook_url, DeliveryMode, IdeaBot};
pub use error::{Result, TelegramError};
pub use handlers::{format_stats, Command};
pub use state::{create_shared_state, BotState};
pub use transport::{truncate_message, TelegramReplier, MAX_MESSAGE_UNITS};
pub use voice::WhisperTranscriber;
