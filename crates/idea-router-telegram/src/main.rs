//! Idea Router Telegram bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p idea-router-telegram
//! ```

use clap::Parser;
use idea_router_core::{config, AppConfig};
use idea_router_telegram::{DeliveryMode, IdeaBot};
use tracing_subscriber::EnvFilter;

/// Idea Router - structure ideas from Telegram and file them
#[derive(Parser, Debug)]
#[command(name = "idea-router")]
#[command(about = "Telegram bot that summarizes ideas and files them to a spreadsheet and task tracker")]
struct Args {
    /// Use webhook mode (default: polling mode)
    #[arg(short, long)]
    webhook: bool,

    /// Webhook port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load environment variables from config directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "idea_router_telegram=info,idea_router_core=info,teloxide=warn",
        1 => "idea_router_telegram=debug,idea_router_core=debug,teloxide=info",
        2 => "idea_router_telegram=trace,idea_router_core=trace,teloxide=debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut app_config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        app_config.webhook_port = port;
    }
    tracing::debug!(config = ?app_config, "Configuration loaded");

    let mode = if args.webhook {
        DeliveryMode::WebhookPush
    } else {
        DeliveryMode::LongPoll
    };

    let bot = IdeaBot::new(app_config)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[robot] Idea Router");
            println!("   Bot: @{}", username);
            println!("   Mode: {}", if args.webhook { "webhook" } else { "polling" });
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\n[phone] Open Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.run(mode).await?;

    Ok(())
}
