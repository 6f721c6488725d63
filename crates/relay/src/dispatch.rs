//! Flushing a detached burst: batch relay, single-item caption capture, and
//! reporting back to the sender.

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, warn};

use crate::{
    RelayError,
    caption::compose,
    outbound::{Notice, Notifier, RelayClient},
    pending::PendingCaptions,
    settings::SettingsCache,
    types::{ConversationId, DispatchReport, Item, ItemId, RelaySettings},
};

/// Caption text that asks to keep the item's own caption.
const KEEP_ORIGINAL_CAPTION: &str = "/original";

/// What happened to a flushed burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Empty,
    ChannelNotConfigured,
    SettingsUnavailable,
    AwaitingCaption(ItemId),
    Batch(DispatchReport),
}

/// A detached burst after classification, before any relay call or notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Empty,
    SettingsUnavailable { dropped: usize },
    ChannelNotConfigured { dropped: usize },
    /// A caption request was opened for the item.
    AwaitingCaption(ItemId),
    Batch {
        destination: String,
        suffix: Option<String>,
        items: Vec<Item>,
    },
}

/// What happened to a free-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionOutcome {
    /// No caption was pending for the conversation.
    Ignored,
    /// `/original` was sent; the request stays open.
    OriginalRejected,
    /// The request was consumed but there was nowhere to send the item.
    ChannelNotConfigured,
    /// Settings could not be read; the request stays open.
    SettingsUnavailable,
    Relayed(ItemId),
    Failed(ItemId, RelayError),
}

pub struct Dispatcher {
    settings: Arc<SettingsCache>,
    relay: Arc<dyn RelayClient>,
    notifier: Arc<dyn Notifier>,
    pending: Arc<PendingCaptions>,
    pacing: Duration,
}

impl Dispatcher {
    pub fn new(
        settings: Arc<SettingsCache>,
        relay: Arc<dyn RelayClient>,
        notifier: Arc<dyn Notifier>,
        pending: Arc<PendingCaptions>,
        pacing: Duration,
    ) -> Self {
        Self {
            settings,
            relay,
            notifier,
            pending,
            pacing,
        }
    }

    /// Settings for one flush. Errors are logged and reported as `None`.
    pub(crate) async fn read_settings(&self, conversation: ConversationId) -> Option<RelaySettings> {
        match self.settings.get().await {
            Ok(settings) => Some(settings),
            Err(e) => {
                error!(conversation = %conversation, error = %e, "failed to read relay settings");
                None
            },
        }
    }

    /// Decide what a burst becomes. A single item's caption request is opened
    /// here, so this never awaits and may run under the session lock.
    pub fn classify(&self, settings: Option<&RelaySettings>, mut items: Vec<Item>) -> Classified {
        if items.is_empty() {
            return Classified::Empty;
        }
        let Some(settings) = settings else {
            return Classified::SettingsUnavailable {
                dropped: items.len(),
            };
        };
        let Some(destination) = settings.channel_id.clone() else {
            return Classified::ChannelNotConfigured {
                dropped: items.len(),
            };
        };

        if items.len() == 1 {
            let item = items.remove(0);
            let id = item.id;
            if let Some(replaced) = self.pending.open(item) {
                warn!(
                    conversation = %replaced.item.conversation,
                    replaced = %replaced.item.id,
                    "replaced an older pending caption request"
                );
            }
            return Classified::AwaitingCaption(id);
        }

        Classified::Batch {
            destination,
            suffix: settings.caption_suffix.clone(),
            items,
        }
    }

    /// Send the notices and relay calls a classified burst calls for.
    pub async fn complete(
        &self,
        conversation: ConversationId,
        classified: Classified,
    ) -> DispatchOutcome {
        match classified {
            Classified::Empty => DispatchOutcome::Empty,
            Classified::SettingsUnavailable { dropped } => {
                warn!(conversation = %conversation, dropped, "burst dropped, settings unavailable");
                self.notify(conversation, Notice::SettingsUnavailable).await;
                DispatchOutcome::SettingsUnavailable
            },
            Classified::ChannelNotConfigured { dropped } => {
                warn!(conversation = %conversation, dropped, "no destination channel configured");
                self.notify(conversation, Notice::ChannelNotConfigured).await;
                DispatchOutcome::ChannelNotConfigured
            },
            Classified::AwaitingCaption(id) => {
                info!(conversation = %conversation, item = %id, "single item awaiting caption");
                self.notify(conversation, Notice::CaptionRequested { item: id })
                    .await;
                DispatchOutcome::AwaitingCaption(id)
            },
            Classified::Batch {
                destination,
                suffix,
                items,
            } => {
                let report = self
                    .relay_batch(conversation, &destination, suffix.as_deref(), &items)
                    .await;
                DispatchOutcome::Batch(report)
            },
        }
    }

    async fn relay_batch(
        &self,
        conversation: ConversationId,
        destination: &str,
        suffix: Option<&str>,
        items: &[Item],
    ) -> DispatchReport {
        self.notify(conversation, Notice::BatchStarted { total: items.len() })
            .await;

        let mut succeeded = 0;
        let mut failed = Vec::new();
        let mut reasons = Vec::new();

        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing).await;
            }

            let caption = compose(item.caption_or_empty(), suffix);
            match self.relay.relay_item(item, destination, &caption).await {
                Ok(()) => {
                    succeeded += 1;
                    debug!(conversation = %conversation, item = %item.id, "item relayed");
                },
                Err(e) => {
                    warn!(
                        conversation = %conversation,
                        item = %item.id,
                        error = %e,
                        "item relay failed"
                    );
                    failed.push(item.clone());
                    reasons.push(e.reason);
                },
            }
        }

        let report = DispatchReport {
            total: items.len(),
            succeeded,
            failed,
        };
        info!(
            conversation = %conversation,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed_count(),
            "batch dispatched"
        );

        self.notify(conversation, Notice::BatchReport(report.clone()))
            .await;
        for (item, reason) in report.failed.iter().zip(reasons) {
            self.notify(conversation, Notice::ItemFailed {
                item: item.id,
                reason,
            })
            .await;
        }

        report
    }

    /// Use `text` as the caption for the conversation's pending item.
    ///
    /// `message` is the text message itself; acknowledgements reply to it.
    pub async fn capture_caption(
        &self,
        conversation: ConversationId,
        message: ItemId,
        text: &str,
    ) -> CaptionOutcome {
        if self.pending.peek(conversation).is_none() {
            return CaptionOutcome::Ignored;
        }
        if text.trim() == KEEP_ORIGINAL_CAPTION {
            self.notify(conversation, Notice::CaptionRequired).await;
            return CaptionOutcome::OriginalRejected;
        }
        // Read before consuming so a transient store failure keeps the request.
        let Some(settings) = self.read_settings(conversation).await else {
            self.notify(conversation, Notice::SettingsUnavailable).await;
            return CaptionOutcome::SettingsUnavailable;
        };
        let Some(request) = self.pending.take(conversation) else {
            return CaptionOutcome::Ignored;
        };
        let item = request.item;

        let Some(destination) = settings.channel_id else {
            warn!(conversation = %conversation, item = %item.id, "no destination channel configured");
            self.notify(conversation, Notice::CaptionDropped { item: item.id })
                .await;
            return CaptionOutcome::ChannelNotConfigured;
        };

        let caption = compose(text, settings.caption_suffix.as_deref());
        match self.relay.relay_item(&item, &destination, &caption).await {
            Ok(()) => {
                info!(conversation = %conversation, item = %item.id, "captioned item relayed");
                self.notify(conversation, Notice::Relayed { reply_to: message })
                    .await;
                CaptionOutcome::Relayed(item.id)
            },
            Err(e) => {
                warn!(
                    conversation = %conversation,
                    item = %item.id,
                    error = %e,
                    "captioned item relay failed"
                );
                self.notify(conversation, Notice::RelayFailed {
                    reply_to: message,
                    reason: e.reason.clone(),
                })
                .await;
                CaptionOutcome::Failed(item.id, e)
            },
        }
    }

    /// Best-effort delivery; failures are logged and dropped.
    pub(crate) async fn notify(&self, conversation: ConversationId, notice: Notice) {
        if let Err(e) = self.notifier.notify(conversation, notice).await {
            debug!(conversation = %conversation, error = %e, "notice not delivered");
        }
    }
}
