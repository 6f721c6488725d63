//! Telegram front end for the relay pipeline.
//!
//! Long-polls the Bot API, turns media messages into relay items, routes
//! follow-up text to pending caption requests or the post-link relay, and
//! serves the administrative commands. [`outbound::TelegramOutbound`]
//! implements the pipeline's relay client and notifier.

pub mod access;
pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod link;
pub mod outbound;
pub mod state;

#[cfg(test)]
mod test_support;

pub use {
    bot::{build_bot, start_polling},
    config::{CaptionFormat, TelegramBotConfig},
    error::{Error, Result},
    outbound::TelegramOutbound,
    state::BotState,
};
