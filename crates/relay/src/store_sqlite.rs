//! SQLite-backed settings store using sqlx.

use std::time::{SystemTime, UNIX_EPOCH};

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions},
};

use crate::{
    Result,
    store::SettingsStore,
    types::{RelaySettings, SenderId},
};

const KEY_CHANNEL_ID: &str = "channel_id";
const KEY_CAPTION_SUFFIX: &str = "caption_suffix";

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// SQLite-backed persistence for relay settings and the authorized-user set.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Open a dedicated pool for `database_url` and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO relay_settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM relay_settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self) -> Result<RelaySettings> {
        let mut settings = RelaySettings::default();

        let rows = sqlx::query("SELECT key, value FROM relay_settings")
            .fetch_all(&self.pool)
            .await?;
        for row in rows {
            let key: String = row.get("key");
            let value: String = row.get("value");
            match key.as_str() {
                KEY_CHANNEL_ID => settings.channel_id = Some(value),
                KEY_CAPTION_SUFFIX => settings.caption_suffix = Some(value),
                _ => tracing::debug!(key = %key, "ignoring unknown relay setting"),
            }
        }

        let users = sqlx::query("SELECT user_id FROM authorized_users")
            .fetch_all(&self.pool)
            .await?;
        for row in users {
            let id: i64 = row.get("user_id");
            settings.authorized_users.insert(SenderId(id as u64));
        }

        Ok(settings)
    }

    async fn set_channel_id(&self, channel_id: &str) -> Result<()> {
        self.put(KEY_CHANNEL_ID, channel_id).await
    }

    async fn set_caption_suffix(&self, suffix: Option<&str>) -> Result<()> {
        match suffix {
            Some(text) => self.put(KEY_CAPTION_SUFFIX, text).await,
            None => self.remove(KEY_CAPTION_SUFFIX).await,
        }
    }

    async fn add_authorized_user(&self, user: SenderId) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO authorized_users (user_id, added_at) VALUES (?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user.0 as i64)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_authorized_user(&self, user: SenderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM authorized_users WHERE user_id = ?")
            .bind(user.0 as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteSettingsStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteSettingsStore::with_pool(pool)
    }

    #[tokio::test]
    async fn empty_store_loads_defaults() {
        let store = test_store().await;
        assert_eq!(store.load().await.unwrap(), RelaySettings::default());
    }

    #[tokio::test]
    async fn channel_id_is_replaced() {
        let store = test_store().await;
        store.set_channel_id("-1001").await.unwrap();
        store.set_channel_id("@movies").await.unwrap();

        let settings = store.load().await.unwrap();
        assert_eq!(settings.channel_id.as_deref(), Some("@movies"));
    }

    #[tokio::test]
    async fn caption_suffix_set_and_cleared() {
        let store = test_store().await;
        store.set_caption_suffix(Some("Join @movies")).await.unwrap();
        assert_eq!(
            store.load().await.unwrap().caption_suffix.as_deref(),
            Some("Join @movies")
        );

        store.set_caption_suffix(None).await.unwrap();
        assert!(store.load().await.unwrap().caption_suffix.is_none());
    }

    #[tokio::test]
    async fn authorized_users_add_and_remove() {
        let store = test_store().await;
        assert!(store.add_authorized_user(SenderId(7)).await.unwrap());
        assert!(!store.add_authorized_user(SenderId(7)).await.unwrap());
        assert!(store.add_authorized_user(SenderId(9)).await.unwrap());

        let settings = store.load().await.unwrap();
        assert!(settings.is_authorized(SenderId(7)));
        assert!(settings.is_authorized(SenderId(9)));

        assert!(store.remove_authorized_user(SenderId(7)).await.unwrap());
        assert!(!store.remove_authorized_user(SenderId(7)).await.unwrap());
        assert!(!store.load().await.unwrap().is_authorized(SenderId(7)));
    }
}
