//! Command and message handlers for the Telegram bot.

use std::sync::Arc;

use idea_router_core::MessageKind;
use serde_json::Value;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::state::BotState;
use crate::transport::{inbound_message, media_kind, sender_of, TelegramReplier};
use crate::voice::download_voice;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Команды:")]
pub enum Command {
    #[command(description = "запуск")]
    Start,

    #[command(description = "справка")]
    Help,

    #[command(description = "твоя статистика")]
    Stats,
}

fn status_mark(enabled: bool) -> &'static str {
    if enabled {
        "✅"
    } else {
        "❌"
    }
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let welcome = format!(
        "👋 Привет! Я бот для обработки идей.\n\
        Отправь мне текст или голосовое сообщение — я обработаю его через GPT 🤖\n\n\
        Статус:\n\
        {} ChatGPT\n\
        {} Google таблица\n\
        {} Bitrix24\n\
        {} Голосовые сообщения",
        status_mark(state.has_summarization()),
        status_mark(state.has_spreadsheet()),
        status_mark(state.has_task_tracker()),
        status_mark(state.has_voice()),
    );

    bot.send_message(msg.chat.id, welcome).await?;

    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    let help_text = format!(
        "📋 Я умею:\n\
        • Обрабатывать текст через ChatGPT\n\
        • Распознавать голосовые и структурировать мысль\n\
        • Сохранять данные в Google таблицу\n\
        • Создавать задачи в Bitrix24\n\n\
        {}",
        Command::descriptions()
    );
    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}

/// Render the spreadsheet's stats payload for a chat message.
pub fn format_stats(stats: &Value) -> String {
    let body = match stats {
        Value::Object(map) if !map.is_empty() => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("• {}: {}", key, s),
                other => format!("• {}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::String(s) => s.clone(),
        Value::Null => "нет данных".to_string(),
        other => other.to_string(),
    };
    format!("📊 Ваша статистика:\n{}", body)
}

/// Handle the /stats command.
pub async fn handle_stats(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !state.has_spreadsheet() {
        bot.send_message(msg.chat.id, "❌ Статистика недоступна: таблица не подключена")
            .await?;
        return Ok(());
    }

    let (_, username) = sender_of(&msg);
    let reply = match state.router().dispatcher().fetch_stats(&username).await {
        Ok(stats) => format_stats(&stats),
        Err(e) => {
            warn!(error = %e, user = %username, "Failed to fetch stats");
            "❌ Не удалось получить статистику".to_string()
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handle a plain text message.
pub async fn handle_text(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let text = msg.text().unwrap_or_default().to_string();
    let message = inbound_message(&msg, text, MessageKind::Text);
    route(bot, msg, state, message).await
}

/// Handle a voice note: transcribe it, then route the transcript.
pub async fn handle_voice(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(voice) = msg.voice() else {
        return Ok(());
    };

    let Some(transcriber) = state.transcriber() else {
        debug!(chat_id = %msg.chat.id, "Voice received but transcription is disabled");
        let message = inbound_message(&msg, "", MessageKind::Unsupported("voice".to_string()));
        return route(bot, msg, state, message).await;
    };

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        debug!(chat_id = %msg.chat.id, error = %e, "Failed to send typing indicator");
    }

    let transcript = match download_voice(&bot, voice).await {
        Ok(audio) => transcriber.transcribe(audio).await,
        Err(e) => Err(e),
    };
    let text = match transcript {
        Ok(text) => text,
        Err(e) => {
            warn!(chat_id = %msg.chat.id, error = %e, "Voice transcription failed");
            String::new()
        }
    };

    let message = inbound_message(&msg, text, MessageKind::VoiceTranscript);
    route(bot, msg, state, message).await
}

/// Handle media the bot does not process.
pub async fn handle_unsupported(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let kind = media_kind(&msg);
    let message = inbound_message(&msg, "", MessageKind::Unsupported(kind.to_string()));
    route(bot, msg, state, message).await
}

/// Reply to a command the bot does not know.
pub async fn handle_unknown_command(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        let command = text.split_whitespace().next().unwrap_or(text);
        info!(cmd = %command, "Unrecognized command");
        bot.send_message(
            msg.chat.id,
            format!("Неизвестная команда: {}\n\nСписок команд: /help", command),
        )
        .await?;
    }
    Ok(())
}

async fn route(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    message: idea_router_core::InboundMessage,
) -> ResponseResult<()> {
    let replier = TelegramReplier::for_message(bot, &msg);
    let outcome = state.router().handle(message, &replier).await;

    debug!(
        chat_id = %msg.chat.id,
        state = ?outcome.state,
        delivered = outcome.delivered,
        "Message routed"
    );
    Ok(())
}

/// Dispatch a parsed command to its handler.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Stats => handle_stats(bot, msg, state).await,
    }
}
