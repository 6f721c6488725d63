//! Collaborator traits implemented by the transport layer.

use async_trait::async_trait;

use crate::{
    RelayError, Result,
    types::{ConversationId, DispatchReport, Item, ItemId},
};

/// Copies an item to the destination channel.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Copy `item` from its source conversation to `destination` with `caption`.
    async fn relay_item(
        &self,
        item: &Item,
        destination: &str,
        caption: &str,
    ) -> std::result::Result<(), RelayError>;
}

/// Delivers notices back to a source conversation.
///
/// Callers treat every notice as best-effort: errors are logged and dropped.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, conversation: ConversationId, notice: Notice) -> Result<()>;
}

/// Something the pipeline tells the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No destination channel configured; the burst was dropped.
    ChannelNotConfigured,
    /// Relay settings could not be read; the burst was dropped.
    SettingsUnavailable,
    /// A batch of `total` items is about to be relayed.
    BatchStarted { total: usize },
    /// Summary after a batch finished.
    BatchReport(DispatchReport),
    /// One batch item failed; sent once per failed item.
    ItemFailed { item: ItemId, reason: String },
    /// A single item is waiting for a caption.
    CaptionRequested { item: ItemId },
    /// The `/original` shortcut is not valid for a single item.
    CaptionRequired,
    /// An arrival was refused because a caption is still pending.
    CaptionStillPending { pending: ItemId, refused: ItemId },
    /// The captioned single item was relayed.
    Relayed { reply_to: ItemId },
    /// The captioned single item could not be relayed.
    RelayFailed { reply_to: ItemId, reason: String },
    /// The caption arrived but no destination channel is set; `item` was
    /// discarded and has to be sent again.
    CaptionDropped { item: ItemId },
}

impl Notice {
    /// The message this notice should be threaded under, if any.
    pub fn reply_to(&self) -> Option<ItemId> {
        match self {
            Self::ItemFailed { item, .. }
            | Self::CaptionRequested { item }
            | Self::CaptionDropped { item } => Some(*item),
            Self::CaptionStillPending { refused, .. } => Some(*refused),
            Self::Relayed { reply_to } | Self::RelayFailed { reply_to, .. } => Some(*reply_to),
            Self::ChannelNotConfigured
            | Self::SettingsUnavailable
            | Self::BatchStarted { .. }
            | Self::BatchReport(_)
            | Self::CaptionRequired => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_targets() {
        assert_eq!(
            Notice::ItemFailed {
                item: ItemId(4),
                reason: "x".into()
            }
            .reply_to(),
            Some(ItemId(4))
        );
        assert_eq!(
            Notice::CaptionStillPending {
                pending: ItemId(1),
                refused: ItemId(2)
            }
            .reply_to(),
            Some(ItemId(2))
        );
        assert_eq!(Notice::BatchStarted { total: 3 }.reply_to(), None);
        assert_eq!(Notice::ChannelNotConfigured.reply_to(), None);
        assert_eq!(
            Notice::CaptionDropped { item: ItemId(7) }.reply_to(),
            Some(ItemId(7))
        );
    }
}
