use {
    async_trait::async_trait,
    teloxide::{
        ApiError, RequestError,
        payloads::{CopyMessageSetters, SendMessageSetters},
        prelude::*,
        types::{ChatId, MessageId, ParseMode, Recipient, ReplyParameters},
    },
    tracing::{debug, warn},
};

use relaybot_relay::{ConversationId, Item, ItemId, Notice, Notifier, RelayClient, RelayError};

use crate::{Result, config::CaptionFormat, link::PostLink};

/// Relay client and notifier backed by the Bot API.
pub struct TelegramOutbound {
    bot: Bot,
    parse_mode: Option<ParseMode>,
}

impl TelegramOutbound {
    pub fn new(bot: Bot, caption_format: CaptionFormat) -> Self {
        Self {
            bot,
            parse_mode: caption_format.parse_mode(),
        }
    }

    /// Send a plain-text message, optionally threaded under `reply_to`.
    pub async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId> {
        let mut req = self.bot.send_message(chat_id, text);
        if let Some(rp) = reply_params(reply_to) {
            req = req.reply_parameters(rp);
        }
        Ok(req.await?.id)
    }

    /// Copy a public channel post to `destination`.
    pub async fn relay_post(
        &self,
        link: &PostLink,
        destination: &str,
        caption: &str,
    ) -> std::result::Result<(), RelayError> {
        self.copy_with_fallback(
            destination_recipient(destination),
            Recipient::ChannelUsername(link.channel.clone()),
            MessageId(link.message_id),
            caption,
        )
        .await
        .map(|_| ())
        .map_err(|e| RelayError::new(e.to_string()))
    }

    /// Copy with the configured parse mode, retrying once as plain text when
    /// Telegram rejects the caption entities.
    async fn copy_with_fallback(
        &self,
        to: Recipient,
        from: Recipient,
        message_id: MessageId,
        caption: &str,
    ) -> std::result::Result<MessageId, RequestError> {
        let Some(mode) = self.parse_mode else {
            return self
                .bot
                .copy_message(to, from, message_id)
                .caption(caption)
                .await;
        };

        match self
            .bot
            .copy_message(to.clone(), from.clone(), message_id)
            .caption(caption)
            .parse_mode(mode)
            .await
        {
            Ok(id) => Ok(id),
            Err(e) if is_entity_parse_error(&e) => {
                warn!(
                    message_id = message_id.0,
                    error = %e,
                    "caption entities rejected, retrying as plain text"
                );
                self.bot
                    .copy_message(to, from, message_id)
                    .caption(caption)
                    .await
            },
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RelayClient for TelegramOutbound {
    async fn relay_item(
        &self,
        item: &Item,
        destination: &str,
        caption: &str,
    ) -> std::result::Result<(), RelayError> {
        let copied = self
            .copy_with_fallback(
                destination_recipient(destination),
                Recipient::Id(ChatId(item.conversation.0)),
                MessageId(item.id.0),
                caption,
            )
            .await
            .map_err(|e| RelayError::new(e.to_string()))?;
        debug!(
            item = %item.id,
            destination,
            copied = copied.0,
            "item copied"
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramOutbound {
    async fn notify(
        &self,
        conversation: ConversationId,
        notice: Notice,
    ) -> relaybot_relay::Result<()> {
        let text = render_notice(&notice);
        let reply_to = notice.reply_to().map(|ItemId(id)| MessageId(id));
        self.send_text(ChatId(conversation.0), &text, reply_to)
            .await
            .map(|_| ())
            .map_err(|e| relaybot_relay::Error::external("send notice", e))
    }
}

/// Numeric ids address a chat directly; anything else is a public username.
pub fn destination_recipient(destination: &str) -> Recipient {
    match destination.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(destination.to_string()),
    }
}

/// User-facing text for a pipeline notice.
pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::ChannelNotConfigured => {
            "⚠️ No destination channel is set, so nothing was sent. Set one with /setchannel, \
             then send again."
                .to_string()
        },
        Notice::CaptionDropped { .. } => {
            "⚠️ No destination channel is set, so this item was discarded. Set one with \
             /setchannel, then send the item again."
                .to_string()
        },
        Notice::SettingsUnavailable => {
            "⚠️ Relay settings could not be loaded. Please try again later.".to_string()
        },
        Notice::BatchStarted { total } => {
            format!("✅ Received {total} items. Relaying them to the channel...")
        },
        Notice::BatchReport(report) if report.failed_count() == 0 => {
            format!("✅ All {} items were sent.", report.total)
        },
        Notice::BatchReport(report) => format!(
            "⚠️ Sent {} of {} items, {} failed.",
            report.succeeded,
            report.total,
            report.failed_count()
        ),
        Notice::ItemFailed { reason, .. } => format!("❌ This item was not sent: {reason}"),
        Notice::CaptionRequested { .. } => "✏️ Send the caption for this item.".to_string(),
        Notice::CaptionRequired => {
            "A single item needs a written caption. Send the caption text.".to_string()
        },
        Notice::CaptionStillPending { .. } => {
            "✏️ Send the caption for the previous item before sending new ones.".to_string()
        },
        Notice::Relayed { .. } => "✅ Sent to the channel.".to_string(),
        Notice::RelayFailed { reason, .. } => format!("❌ Error: {reason}"),
    }
}

fn reply_params(reply_to: Option<MessageId>) -> Option<ReplyParameters> {
    reply_to.map(|id| ReplyParameters::new(id).allow_sending_without_reply())
}

fn is_entity_parse_error(error: &RequestError) -> bool {
    match error {
        RequestError::Api(ApiError::CantParseEntities(_)) => true,
        RequestError::Api(ApiError::Unknown(description)) => {
            description.contains("can't parse entities")
        },
        _ => false,
    }
}
