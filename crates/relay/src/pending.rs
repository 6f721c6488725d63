//! Registry of single items waiting for a caption, one per conversation.
//!
//! Requests never expire and are not persisted; a restart drops them.

use std::{collections::HashMap, sync::Mutex};

use crate::types::{ConversationId, Item, ItemId};

/// A single item held back until the sender supplies caption text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCaption {
    pub item: Item,
}

/// std `Mutex` because every operation is a synchronous map access, never
/// held across `.await`.
#[derive(Default)]
pub struct PendingCaptions {
    requests: Mutex<HashMap<ConversationId, PendingCaption>>,
}

impl PendingCaptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a request for `item`, replacing any older one for the conversation.
    pub fn open(&self, item: Item) -> Option<PendingCaption> {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.insert(item.conversation, PendingCaption { item })
    }

    /// Item id of the open request, without consuming it.
    pub fn peek(&self, conversation: ConversationId) -> Option<ItemId> {
        let requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.get(&conversation).map(|p| p.item.id)
    }

    /// Consume the open request. A second call returns `None`.
    pub fn take(&self, conversation: ConversationId) -> Option<PendingCaption> {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.remove(&conversation)
    }

    pub fn len(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
