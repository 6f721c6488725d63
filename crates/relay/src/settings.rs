//! Write-through cache in front of a [`SettingsStore`].
//!
//! Settings are loaded lazily on first read. Every mutation writes the store
//! first and then updates the cached copy while holding the same write lock
//! that readers take, so the next read always observes it.

use std::sync::Arc;

use {tokio::sync::RwLock, tracing::info};

use crate::{
    Error, Result,
    store::SettingsStore,
    types::{RelaySettings, SenderId},
};

/// Maximum accepted suffix length, matching the caption limit.
const MAX_SUFFIX_CHARS: usize = crate::caption::CAPTION_LIMIT;

pub struct SettingsCache {
    store: Arc<dyn SettingsStore>,
    cached: RwLock<Option<RelaySettings>>,
}

impl SettingsCache {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
        }
    }

    /// Current settings, loading them from the store on first use.
    pub async fn get(&self) -> Result<RelaySettings> {
        if let Some(settings) = self.cached.read().await.as_ref() {
            return Ok(settings.clone());
        }

        let mut cached = self.cached.write().await;
        if let Some(settings) = cached.as_ref() {
            return Ok(settings.clone());
        }
        let loaded = self.store.load().await?;
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    pub async fn channel_id(&self) -> Result<Option<String>> {
        Ok(self.get().await?.channel_id)
    }

    pub async fn caption_suffix(&self) -> Result<Option<String>> {
        Ok(self.get().await?.caption_suffix)
    }

    pub async fn is_authorized(&self, sender: SenderId) -> Result<bool> {
        Ok(self.get().await?.is_authorized(sender))
    }

    pub async fn set_channel_id(&self, channel_id: &str) -> Result<()> {
        let channel_id = channel_id.trim();
        validate_channel_id(channel_id)?;

        let mut cached = self.cached.write().await;
        self.store.set_channel_id(channel_id).await?;
        let mut settings = self.loaded(cached.take()).await?;
        settings.channel_id = Some(channel_id.to_string());
        *cached = Some(settings);

        info!(channel_id, "destination channel updated");
        Ok(())
    }

    /// Set or clear the caption suffix. Blank text clears it.
    pub async fn set_caption_suffix(&self, suffix: Option<&str>) -> Result<()> {
        let suffix = suffix.map(str::trim).filter(|s| !s.is_empty());
        if let Some(text) = suffix
            && text.chars().count() > MAX_SUFFIX_CHARS
        {
            return Err(Error::invalid_setting(
                "caption_suffix",
                format!("longer than {MAX_SUFFIX_CHARS} characters"),
            ));
        }

        let mut cached = self.cached.write().await;
        self.store.set_caption_suffix(suffix).await?;
        let mut settings = self.loaded(cached.take()).await?;
        settings.caption_suffix = suffix.map(str::to_string);
        *cached = Some(settings);

        info!(has_suffix = suffix.is_some(), "caption suffix updated");
        Ok(())
    }

    pub async fn add_authorized_user(&self, user: SenderId) -> Result<bool> {
        let mut cached = self.cached.write().await;
        let added = self.store.add_authorized_user(user).await?;
        let mut settings = self.loaded(cached.take()).await?;
        settings.authorized_users.insert(user);
        *cached = Some(settings);

        info!(user = %user, added, "authorized user added");
        Ok(added)
    }

    pub async fn remove_authorized_user(&self, user: SenderId) -> Result<bool> {
        let mut cached = self.cached.write().await;
        let removed = self.store.remove_authorized_user(user).await?;
        let mut settings = self.loaded(cached.take()).await?;
        settings.authorized_users.remove(&user);
        *cached = Some(settings);

        info!(user = %user, removed, "authorized user removed");
        Ok(removed)
    }

    async fn loaded(&self, cached: Option<RelaySettings>) -> Result<RelaySettings> {
        match cached {
            Some(settings) => Ok(settings),
            None => self.store.load().await,
        }
    }
}

/// Accepts a numeric chat id (`-100123…`) or a public `@username`.
fn validate_channel_id(channel_id: &str) -> Result<()> {
    if channel_id.parse::<i64>().is_ok() {
        return Ok(());
    }
    if let Some(name) = channel_id.strip_prefix('@')
        && !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Ok(());
    }
    Err(Error::invalid_setting(
        "channel_id",
        format!("expected a numeric id or @username, got {channel_id:?}"),
    ))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {async_trait::async_trait, rstest::rstest, std::sync::atomic::{AtomicUsize, Ordering}};

    use {super::*, crate::store_memory::InMemorySettingsStore};

    /// Counts loads so tests can observe caching.
    struct CountingStore {
        inner: InMemorySettingsStore,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl SettingsStore for CountingStore {
        async fn load(&self) -> Result<RelaySettings> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load().await
        }

        async fn set_channel_id(&self, channel_id: &str) -> Result<()> {
            self.inner.set_channel_id(channel_id).await
        }

        async fn set_caption_suffix(&self, suffix: Option<&str>) -> Result<()> {
            self.inner.set_caption_suffix(suffix).await
        }

        async fn add_authorized_user(&self, user: SenderId) -> Result<bool> {
            self.inner.add_authorized_user(user).await
        }

        async fn remove_authorized_user(&self, user: SenderId) -> Result<bool> {
            self.inner.remove_authorized_user(user).await
        }
    }

    fn counting() -> Arc<CountingStore> {
        Arc::new(CountingStore {
            inner: InMemorySettingsStore::new(),
            loads: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn loads_once_and_serves_from_cache() {
        let store = counting();
        let cache = SettingsCache::new(store.clone());

        assert!(cache.channel_id().await.unwrap().is_none());
        assert!(cache.caption_suffix().await.unwrap().is_none());
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writes_go_through_to_store_and_cache() {
        let store = counting();
        let cache = SettingsCache::new(store.clone());
        cache.get().await.unwrap();

        cache.set_channel_id("@movies").await.unwrap();
        cache.set_caption_suffix(Some("  Join @movies ")).await.unwrap();
        cache.add_authorized_user(SenderId(5)).await.unwrap();

        let cached = cache.get().await.unwrap();
        assert_eq!(cached.channel_id.as_deref(), Some("@movies"));
        assert_eq!(cached.caption_suffix.as_deref(), Some("Join @movies"));
        assert!(cached.is_authorized(SenderId(5)));

        assert_eq!(store.inner.load().await.unwrap(), cached);
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn write_before_first_read_still_sees_store_contents() {
        let store = Arc::new(InMemorySettingsStore::with_settings(RelaySettings {
            caption_suffix: Some("existing".into()),
            ..Default::default()
        }));
        let cache = SettingsCache::new(store);

        cache.set_channel_id("-1001234").await.unwrap();
        let settings = cache.get().await.unwrap();
        assert_eq!(settings.channel_id.as_deref(), Some("-1001234"));
        assert_eq!(settings.caption_suffix.as_deref(), Some("existing"));
    }

    #[tokio::test]
    async fn blank_suffix_clears() {
        let cache = SettingsCache::new(Arc::new(InMemorySettingsStore::new()));
        cache.set_caption_suffix(Some("x")).await.unwrap();
        cache.set_caption_suffix(Some("   ")).await.unwrap();
        assert!(cache.caption_suffix().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_suffix_rejected() {
        let cache = SettingsCache::new(Arc::new(InMemorySettingsStore::new()));
        let long = "s".repeat(MAX_SUFFIX_CHARS + 1);
        assert!(matches!(
            cache.set_caption_suffix(Some(&long)).await,
            Err(Error::InvalidSetting { .. })
        ));
    }

    #[tokio::test]
    async fn remove_user_revokes_access() {
        let cache = SettingsCache::new(Arc::new(InMemorySettingsStore::new()));
        assert!(cache.add_authorized_user(SenderId(1)).await.unwrap());
        assert!(cache.remove_authorized_user(SenderId(1)).await.unwrap());
        assert!(!cache.is_authorized(SenderId(1)).await.unwrap());
        assert!(!cache.remove_authorized_user(SenderId(1)).await.unwrap());
    }

    #[rstest]
    #[case("-1001234567890", true)]
    #[case("12345", true)]
    #[case("@my_channel", true)]
    #[case("@", false)]
    #[case("my_channel", false)]
    #[case("@bad name", false)]
    #[case("", false)]
    fn channel_id_validation(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(validate_channel_id(input).is_ok(), valid);
    }
}
