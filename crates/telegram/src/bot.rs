use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{commands, config::TelegramBotConfig, handlers, state::BotState};

/// Build a bot whose HTTP timeout outlasts the long-polling timeout, so the
/// client doesn't abort `getUpdates` before Telegram responds.
pub fn build_bot(config: &TelegramBotConfig) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
        .build()?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

/// Verify credentials, clear any webhook, register commands and spawn the
/// polling loop.
///
/// The loop runs until `cancel` fires. It cancels the token itself when
/// another instance is polling with the same token.
pub async fn start_polling(
    state: Arc<BotState>,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let me = state.bot.get_me().await?;

    // Long polling does not work while a webhook is set.
    state.bot.delete_webhook().send().await?;

    if let Err(e) = state.bot.set_my_commands(commands::bot_commands()).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?me.username, "telegram bot connected (webhook cleared)");

    Ok(tokio::spawn(poll_updates(state, cancel)))
}

async fn poll_updates(state: Arc<BotState>, cancel: CancellationToken) {
    info!("starting telegram polling loop");
    let mut offset: i32 = 0;

    loop {
        let request = state
            .bot
            .get_updates()
            .offset(offset)
            .timeout(state.config.poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                info!("telegram polling stopped");
                break;
            },
            result = request.send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            let chat_id = msg.chat.id.0;
                            debug!(chat_id, "received telegram message");
                            if let Err(e) = handlers::handle_message(msg, &state).await {
                                error!(chat_id, error = %e, "error handling telegram message");
                            }
                        },
                        other => {
                            debug!("ignoring non-message update: {other:?}");
                        },
                    }
                }
            },
            Err(e) => {
                if is_conflict(&e) {
                    warn!(
                        "telegram polling disabled: another instance is already running with this token"
                    );
                    cancel.cancel();
                    break;
                }

                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(5)) => {},
                }
            },
        }
    }
}

fn is_conflict(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::TerminatedByOtherGetUpdates))
}
