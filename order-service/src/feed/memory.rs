use super::{FeedError, FeedMessage, MessageFeed};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// In-memory feed, used by tests.
///
/// Fetched-but-uncommitted messages stay pending; [`MemoryFeed::redeliver`]
/// puts them back on the queue the way a consumer restart would.
#[derive(Default)]
pub struct MemoryFeed {
    state: Mutex<State>,
    ready: Notify,
}

#[derive(Default)]
struct State {
    next_id: i64,
    queue: VecDeque<FeedMessage>,
    in_flight: Vec<FeedMessage>,
    committed: BTreeSet<i64>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, key: Option<&str>, payload: impl Into<Vec<u8>>) -> i64 {
        let id = {
            let mut state = self.state.lock();
            state.next_id += 1;
            let id = state.next_id;
            state.queue.push_back(FeedMessage {
                id,
                key: key.map(str::to_string),
                payload: payload.into(),
            });
            id
        };
        self.ready.notify_one();
        id
    }

    pub fn is_committed(&self, id: i64) -> bool {
        self.state.lock().committed.contains(&id)
    }

    pub fn committed(&self) -> Vec<i64> {
        self.state.lock().committed.iter().copied().collect()
    }

    /// Messages neither queued nor committed
    pub fn in_flight(&self) -> Vec<i64> {
        self.state.lock().in_flight.iter().map(|m| m.id).collect()
    }

    /// Re-queue every uncommitted in-flight message, oldest first
    pub fn redeliver(&self) -> usize {
        let count = {
            let mut state = self.state.lock();
            let mut pending = std::mem::take(&mut state.in_flight);
            pending.sort_by_key(|m| m.id);
            let count = pending.len();
            for message in pending.into_iter().rev() {
                state.queue.push_front(message);
            }
            count
        };
        if count > 0 {
            self.ready.notify_one();
        }
        count
    }
}

#[async_trait]
impl MessageFeed for MemoryFeed {
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Option<FeedMessage>, FeedError> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(message) = state.queue.pop_front() {
                    state.in_flight.push(message.clone());
                    return Ok(Some(message));
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = self.ready.notified() => {}
            }
        }
    }

    async fn commit(&self, message: &FeedMessage) -> Result<(), FeedError> {
        let mut state = self.state.lock();
        let Some(pos) = state.in_flight.iter().position(|m| m.id == message.id) else {
            return Err(FeedError::UnknownMessage(message.id));
        };
        state.in_flight.remove(pos);
        state.committed.insert(message.id);
        Ok(())
    }
}
