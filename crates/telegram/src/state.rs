use std::sync::Arc;

use relaybot_relay::RelayService;

use crate::{config::TelegramBotConfig, outbound::TelegramOutbound};

/// Runtime state shared by the polling loop and the message handlers.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub config: TelegramBotConfig,
    pub service: Arc<RelayService>,
    pub outbound: Arc<TelegramOutbound>,
}
