//! Recording collaborators shared by the pipeline tests.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {async_trait::async_trait, tokio::time::Instant};

use crate::{
    Error, RelayError, Result,
    outbound::{Notice, Notifier, RelayClient},
    store::SettingsStore,
    store_memory::InMemorySettingsStore,
    types::{ConversationId, Item, ItemId, RelaySettings, SenderId},
};

pub fn item(conversation: i64, id: i32, caption: Option<&str>) -> Item {
    Item {
        id: ItemId(id),
        conversation: ConversationId(conversation),
        sender: SenderId(100),
        caption: caption.map(str::to_string),
    }
}

#[derive(Debug, Clone)]
pub struct RelayCall {
    pub item: ItemId,
    pub conversation: ConversationId,
    pub destination: String,
    pub caption: String,
    pub at: Instant,
}

/// Records every relay attempt; items listed in `fail` are rejected.
#[derive(Default)]
pub struct RecordingRelay {
    calls: Mutex<Vec<RelayCall>>,
    fail: HashSet<i32>,
}

impl RecordingRelay {
    pub fn failing(ids: &[i32]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: ids.iter().copied().collect(),
        }
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn attempted_ids(&self) -> Vec<i32> {
        self.calls().iter().map(|c| c.item.0).collect()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.calls().iter().map(|c| c.at).collect()
    }
}

#[async_trait]
impl RelayClient for RecordingRelay {
    async fn relay_item(
        &self,
        item: &Item,
        destination: &str,
        caption: &str,
    ) -> std::result::Result<(), RelayError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RelayCall {
                item: item.id,
                conversation: item.conversation,
                destination: destination.to_string(),
                caption: caption.to_string(),
                at: Instant::now(),
            });
        if self.fail.contains(&item.id.0) {
            return Err(RelayError::new(format!("item {} rejected", item.id)));
        }
        Ok(())
    }
}

/// Records notices; an unreachable notifier rejects every one.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(ConversationId, Notice)>>,
    unreachable: bool,
}

impl RecordingNotifier {
    pub fn unreachable() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            unreachable: true,
        }
    }

    pub fn notices_for(&self, conversation: ConversationId) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(c, _)| *c == conversation)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, conversation: ConversationId, notice: Notice) -> Result<()> {
        if self.unreachable {
            return Err(Error::external(
                "send notice",
                std::io::Error::other("bot was blocked by the user"),
            ));
        }
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((conversation, notice));
        Ok(())
    }
}

/// Settings store whose reads can be slowed down or made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemorySettingsStore,
    load_delay: Duration,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn slow(settings: RelaySettings, load_delay: Duration) -> Self {
        Self {
            inner: InMemorySettingsStore::with_settings(settings),
            load_delay,
            failing: AtomicBool::new(false),
        }
    }

    pub fn failing(settings: RelaySettings) -> Self {
        Self {
            inner: InMemorySettingsStore::with_settings(settings),
            load_delay: Duration::ZERO,
            failing: AtomicBool::new(true),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsStore for FlakyStore {
    async fn load(&self) -> Result<RelaySettings> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::external(
                "load settings",
                std::io::Error::other("database is locked"),
            ));
        }
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
