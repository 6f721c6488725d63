//! Data model shared by the aggregation and dispatch stages.

use std::{collections::BTreeSet, fmt};

/// Identifier of the conversation an item was sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(pub i64);

/// Identifier of an item within its source conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub i32);

/// Identifier of the user who sent an item or command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenderId(pub u64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An incoming relayable media message. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub conversation: ConversationId,
    pub sender: SenderId,
    pub caption: Option<String>,
}

impl Item {
    pub fn caption_or_empty(&self) -> &str {
        self.caption.as_deref().unwrap_or("")
    }
}

/// Process-wide relay settings, as held by the durable store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySettings {
    /// Destination the items are copied to (`-100…` id or `@channel`).
    pub channel_id: Option<String>,
    pub authorized_users: BTreeSet<SenderId>,
    pub caption_suffix: Option<String>,
}

impl RelaySettings {
    pub fn is_authorized(&self, sender: SenderId) -> bool {
        self.authorized_users.contains(&sender)
    }
}

/// Outcome of one flushed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// Items whose relay failed, in buffer order.
    pub failed: Vec<Item>,
}

impl DispatchReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
