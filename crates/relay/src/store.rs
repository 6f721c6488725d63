//! Persistence trait for relay settings.

use async_trait::async_trait;

use crate::{
    Result,
    types::{RelaySettings, SenderId},
};

/// Durable backend for [`RelaySettings`].
///
/// Each mutation is a single durable write; callers keep their own cache.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<RelaySettings>;
    async fn set_channel_id(&self, channel_id: &str) -> Result<()>;
    async fn set_caption_suffix(&self, suffix: Option<&str>) -> Result<()>;
    /// Returns `false` if the user was already authorized.
    async fn add_authorized_user(&self, user: SenderId) -> Result<bool>;
    /// Returns `false` if the user was not authorized.
    async fn remove_authorized_user(&self, user: SenderId) -> Result<bool>;
}
