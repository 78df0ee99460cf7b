//! In-process channel store.
//!
//! [`MemoryChannelStore`] keeps, per channel, the last assigned sequence, a
//! bounded backlog of recent messages for resuming clients, and the set of
//! parked waits. Publishing assigns the next sequence and completes every
//! parked wait whose cursor it passes.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::store::{ChannelStore, Delivery, Sequence, WaitHandle, WaitId, WaitNotifier};
use super::ChannelName;

/// A wait that found no message past its cursor yet.
#[derive(Debug)]
struct ParkedWait {
    after: Sequence,
    notifier: WaitNotifier,
}

/// Per-channel state.
#[derive(Debug, Default)]
struct ChannelLog {
    last_sequence: Sequence,
    backlog: VecDeque<(Sequence, serde_json::Value)>,
    waiters: HashMap<WaitId, ParkedWait>,
}

impl ChannelLog {
    /// Nothing published and nothing parked.
    fn is_vacant(&self) -> bool {
        self.last_sequence == 0 && self.waiters.is_empty()
    }
}

/// Single-node channel store backed by in-memory logs.
///
/// # Concurrency
///
/// All channels share one [`parking_lot::Mutex`]. The lock is never held
/// while a notifier is completed, so connection tasks are never woken with
/// the store locked.
#[derive(Debug)]
pub struct MemoryChannelStore {
    backlog_capacity: usize,
    channels: Mutex<HashMap<ChannelName, ChannelLog>>,
}

impl MemoryChannelStore {
    /// Creates a store retaining up to `backlog_capacity` messages per
    /// channel for resume.
    #[must_use]
    pub fn new(backlog_capacity: usize) -> Self {
        Self {
            backlog_capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Publishes `message` on `channel` and returns its sequence.
    ///
    /// Sequences start at 1 and increase by one per message on a channel.
    pub fn publish(&self, channel: &ChannelName, message: serde_json::Value) -> Sequence {
        let (sequence, ready) = {
            let mut channels = self.channels.lock();
            let log = channels.entry(channel.clone()).or_default();

            log.last_sequence = log.last_sequence.saturating_add(1);
            let sequence = log.last_sequence;

            log.backlog.push_back((sequence, message.clone()));
            while log.backlog.len() > self.backlog_capacity {
                log.backlog.pop_front();
            }

            let (ready, parked): (Vec<_>, Vec<_>) = std::mem::take(&mut log.waiters)
                .into_iter()
                .partition(|(_, wait)| wait.after < sequence);
            log.waiters = parked.into_iter().collect();
            (sequence, ready)
        };

        tracing::debug!(%channel, sequence, woken = ready.len(), "message published");
        for (_, wait) in ready {
            wait.notifier.deliver(Delivery {
                message: message.clone(),
                sequence,
            });
        }
        sequence
    }

    /// Returns the last sequence assigned on `channel` (0 if none).
    #[must_use]
    pub fn last_sequence(&self, channel: &ChannelName) -> Sequence {
        self.channels
            .lock()
            .get(channel)
            .map_or(0, |log| log.last_sequence)
    }

    /// Returns the number of channels the store currently tracks.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Returns the number of waits parked on `channel`.
    #[must_use]
    pub fn pending_waits(&self, channel: &ChannelName) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map_or(0, |log| log.waiters.len())
    }
}

impl Default for MemoryChannelStore {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl ChannelStore for MemoryChannelStore {
    fn issue_wait(
        &self,
        channel: &ChannelName,
        after: Sequence,
        notifier: WaitNotifier,
    ) -> WaitHandle {
        let handle = WaitHandle::new(notifier.wait_id(), channel.clone(), after);

        let backlogged = {
            let mut channels = self.channels.lock();
            let next = channels.get(channel).and_then(|log| {
                log.backlog
                    .iter()
                    .find(|(sequence, _)| *sequence > after)
                    .cloned()
            });
            match next {
                Some(found) => Some((found, notifier)),
                None => {
                    channels
                        .entry(channel.clone())
                        .or_default()
                        .waiters
                        .insert(handle.id(), ParkedWait { after, notifier });
                    None
                }
            }
        };

        if let Some(((sequence, message), notifier)) = backlogged {
            tracing::trace!(%channel, after, sequence, "wait satisfied from backlog");
            notifier.deliver(Delivery { message, sequence });
        }
        handle
    }

    fn cancel(&self, handle: &WaitHandle) {
        let parked = {
            let mut channels = self.channels.lock();
            let parked = channels
                .get_mut(handle.channel())
                .and_then(|log| log.waiters.remove(&handle.id()));
            // A channel nobody ever published on only lives as long as its waits.
            if channels.get(handle.channel()).is_some_and(ChannelLog::is_vacant) {
                channels.remove(handle.channel());
            }
            parked
        };

        if let Some(wait) = parked {
            tracing::trace!(channel = %handle.channel(), wait_id = %handle.id(), "wait cancelled");
            wait.notifier.disconnect();
        }
    }
}
