//! Per-conversation burst buffers with a single rearmable timer each.
//!
//! Every arrival bumps the session's generation and replaces its timer. A timer
//! only detaches the session when the generation it was armed with is still
//! current, so a timer that already woke up cannot consume a rearmed burst.
//!
//! Admission of an arrival and classification of a detached burst both run
//! under the session lock, so no arrival can slip in between a burst leaving
//! its session and the caption request it may open.

use std::{collections::HashMap, sync::Mutex};

use {tokio::task::JoinHandle, tracing::debug};

use crate::types::{ConversationId, Item, ItemId};

struct Session {
    items: Vec<Item>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<ConversationId, Session>,
    next_generation: u64,
}

/// The aggregation session map. Never locked across `.await`.
#[derive(Default)]
pub struct Sessions {
    inner: Mutex<Inner>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `item` and rearm the conversation's timer.
    ///
    /// `blocked` runs under the session lock first; when it names an item the
    /// arrival is refused with that id and nothing changes. Otherwise `arm`
    /// receives the session's new generation and must return the handle of the
    /// timer task it spawned. Any previous timer is aborted under the same
    /// lock. Returns the number of buffered items.
    pub fn append(
        &self,
        item: Item,
        blocked: impl FnOnce(ConversationId) -> Option<ItemId>,
        arm: impl FnOnce(u64) -> JoinHandle<()>,
    ) -> Result<usize, ItemId> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pending) = blocked(item.conversation) {
            return Err(pending);
        }
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let conversation = item.conversation;

        let session = inner.sessions.entry(conversation).or_insert_with(|| Session {
            items: Vec::new(),
            generation,
            timer: None,
        });
        session.items.push(item);
        session.generation = generation;
        if let Some(previous) = session.timer.take() {
            previous.abort();
        }
        session.timer = Some(arm(generation));

        debug!(
            conversation = %conversation,
            generation,
            buffered = session.items.len(),
            "session timer rearmed"
        );
        Ok(session.items.len())
    }

    /// Remove the buffered items if `generation` is still current and hand
    /// them to `classify` before the session lock is released.
    pub fn detach_with<R>(
        &self,
        conversation: ConversationId,
        generation: u64,
        classify: impl FnOnce(Vec<Item>) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.sessions.get(&conversation) {
            Some(session) if session.generation == generation => {},
            Some(session) => {
                debug!(
                    conversation = %conversation,
                    stale = generation,
                    current = session.generation,
                    "stale session timer ignored"
                );
                return None;
            },
            None => return None,
        }
        inner
            .sessions
            .remove(&conversation)
            .map(|session| classify(session.items))
    }


    /// Number of items currently buffered for `conversation`.
    pub fn buffered(&self, conversation: ConversationId) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .sessions
            .get(&conversation)
            .map_or(0, |session| session.items.len())
    }

    /// Drop every session and abort its timer.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = inner.sessions.len();
        for (_, session) in inner.sessions.drain() {
            if let Some(timer) = session.timer {
                timer.abort();
            }
        }
        dropped
    }
}
