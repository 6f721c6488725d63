//! Entry point for the transport layer: arrivals, follow-up text, and the
//! debounce timers that connect them to the dispatcher.

use std::{sync::Arc, time::Duration};

use {
    tokio_util::task::TaskTracker,
    tracing::{debug, info},
};

use crate::{
    aggregator::Sessions,
    dispatch::{CaptionOutcome, DispatchOutcome, Dispatcher},
    outbound::{Notice, Notifier, RelayClient},
    pending::PendingCaptions,
    settings::SettingsCache,
    types::{ConversationId, Item, ItemId},
};

/// Debounce and pacing intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Quiet period after the last arrival before a burst is flushed.
    pub quiet_period: Duration,
    /// Delay between consecutive relay calls within a batch.
    pub pacing: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(2000),
            pacing: Duration::from_millis(2500),
        }
    }
}

/// Result of handing an item to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// Buffered; the session now holds `buffered` items.
    Buffered { buffered: usize },
    /// Refused because the conversation still owes a caption for `pending`.
    AwaitingCaption { pending: ItemId },
}

pub struct RelayService {
    sessions: Sessions,
    pending: Arc<PendingCaptions>,
    dispatcher: Dispatcher,
    settings: Arc<SettingsCache>,
    timing: Timing,
    /// Debounce timers and the dispatches they run.
    tasks: TaskTracker,
}

impl RelayService {
    pub fn new(
        settings: Arc<SettingsCache>,
        relay: Arc<dyn RelayClient>,
        notifier: Arc<dyn Notifier>,
        timing: Timing,
    ) -> Arc<Self> {
        let pending = Arc::new(PendingCaptions::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&settings),
            relay,
            notifier,
            Arc::clone(&pending),
            timing.pacing,
        );
        Arc::new(Self {
            sessions: Sessions::new(),
            pending,
            dispatcher,
            settings,
            timing,
            tasks: TaskTracker::new(),
        })
    }

    pub fn settings(&self) -> &Arc<SettingsCache> {
        &self.settings
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Buffer an item from an already-authorized sender and rearm its
    /// conversation's debounce timer.
    ///
    /// The item is refused while the conversation owes a caption.
    pub async fn on_arrival(self: &Arc<Self>, item: Item) -> ArrivalOutcome {
        let conversation = item.conversation;
        let id = item.id;
        let quiet_period = self.timing.quiet_period;

        let appended = self.sessions.append(
            item,
            |conversation| self.pending.peek(conversation),
            |generation| {
                let service = Arc::clone(self);
                self.tasks.spawn(async move {
                    tokio::time::sleep(quiet_period).await;
                    service.flush(conversation, generation).await;
                })
            },
        );

        match appended {
            Ok(buffered) => ArrivalOutcome::Buffered { buffered },
            Err(pending) => {
                debug!(
                    conversation = %conversation,
                    item = %id,
                    pending = %pending,
                    "arrival refused while a caption is pending"
                );
                self.dispatcher
                    .notify(conversation, Notice::CaptionStillPending {
                        pending,
                        refused: id,
                    })
                    .await;
                ArrivalOutcome::AwaitingCaption { pending }
            },
        }
    }

    /// Route a free-text message to the pending caption request, if any.
    pub async fn on_text(
        &self,
        conversation: ConversationId,
        message: ItemId,
        text: &str,
    ) -> CaptionOutcome {
        self.dispatcher
            .capture_caption(conversation, message, text)
            .await
    }

    pub fn buffered(&self, conversation: ConversationId) -> usize {
        self.sessions.buffered(conversation)
    }

    pub fn pending_caption(&self, conversation: ConversationId) -> Option<ItemId> {
        self.pending.peek(conversation)
    }

    /// Abort armed timers, dropping their buffered items, then wait for
    /// dispatches already under way to finish.
    pub async fn shutdown(&self) {
        let dropped = self.sessions.clear();
        self.tasks.close();
        info!(
            dropped_sessions = dropped,
            in_flight = self.tasks.len(),
            "relay service stopping"
        );
        self.tasks.wait().await;
        info!(pending_captions = self.pending.len(), "relay service stopped");
    }

    async fn flush(&self, conversation: ConversationId, generation: u64) -> Option<DispatchOutcome> {
        // Read while the session is still attached; an arrival during the read
        // rearms the session and makes this generation stale.
        let settings = self.dispatcher.read_settings(conversation).await;
        let Some(classified) = self.sessions.detach_with(conversation, generation, |items| {
            debug!(conversation = %conversation, items = items.len(), "debounce elapsed");
            self.dispatcher.classify(settings.as_ref(), items)
        }) else {
            debug!(conversation = %conversation, generation, "session already consumed");
            return None;
        };
        Some(self.dispatcher.complete(conversation, classified).await)
    }
}
