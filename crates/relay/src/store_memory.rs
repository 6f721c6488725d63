//! In-memory settings store for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    Result,
    store::SettingsStore,
    types::{RelaySettings, SenderId},
};

/// In-memory store backed by a [`RelaySettings`] value. No persistence.
#[derive(Default)]
pub struct InMemorySettingsStore {
    settings: Mutex<RelaySettings>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: RelaySettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<RelaySettings> {
        let settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        Ok(settings.clone())
    }

    async fn set_channel_id(&self, channel_id: &str) -> Result<()> {
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        settings.channel_id = Some(channel_id.to_string());
        Ok(())
    }

    async fn set_caption_suffix(&self, suffix: Option<&str>) -> Result<()> {
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        settings.caption_suffix = suffix.map(str::to_string);
        Ok(())
    }

    async fn add_authorized_user(&self, user: SenderId) -> Result<bool> {
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        Ok(settings.authorized_users.insert(user))
    }

    async fn remove_authorized_user(&self, user: SenderId) -> Result<bool> {
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        Ok(settings.authorized_users.remove(&user))
    }
}
