//! Debounced media relay pipeline.
//!
//! Items arriving in a conversation are buffered until a quiet period passes.
//! A burst of several items is relayed as a batch with composed captions and a
//! per-item failure report; a lone item waits for the sender to type a caption.
//! Relay settings live in a durable store fronted by a write-through cache.

pub mod aggregator;
pub mod caption;
pub mod dispatch;
pub mod error;
pub mod outbound;
pub mod pending;
pub mod service;
pub mod settings;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

#[cfg(test)]
mod test_support;

pub use {
    caption::{CAPTION_LIMIT, compose},
    dispatch::{CaptionOutcome, DispatchOutcome},
    error::{Error, RelayError, Result},
    outbound::{Notice, Notifier, RelayClient},
    service::{ArrivalOutcome, RelayService, Timing},
    settings::SettingsCache,
    store::SettingsStore,
    types::{ConversationId, DispatchReport, Item, ItemId, RelaySettings, SenderId},
};

/// Run database migrations for the relay settings tables.
///
/// Call before using [`store_sqlite::SqliteSettingsStore::with_pool`] on a
/// shared pool.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
