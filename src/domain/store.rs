//! Channel store contract consumed by WebSocket sessions.
//!
//! A session never talks to a store except through [`ChannelStore`]: it
//! issues a wait for "the next message on `channel` after `cursor`" and may
//! later cancel it. The store answers exactly once per wait by consuming the
//! [`WaitNotifier`] it was handed, which pushes a [`WaitResolution`] into the
//! owning connection's resolution queue.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use super::ChannelName;
use crate::error::StoreError;

/// Monotonically increasing message sequence number assigned by the store.
pub type Sequence = u64;

/// Process-unique identifier of a single issued wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaitId(u64);

impl WaitId {
    /// Allocates the next wait identifier.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WaitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message handed out by the store together with its sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Message payload as published.
    pub message: serde_json::Value,
    /// Sequence the store assigned to the message.
    pub sequence: Sequence,
}

/// Outcome of one wait, routed back to the connection that issued it.
#[derive(Debug)]
pub struct WaitResolution {
    /// Wait this resolution belongs to.
    pub wait_id: WaitId,
    /// Channel the wait was issued on.
    pub channel: ChannelName,
    /// Delivered message or failure.
    pub outcome: Result<Delivery, StoreError>,
}

/// One-shot completion side of an issued wait.
///
/// Every resolving method consumes the notifier, so a wait resolves at most
/// once. Sends to a connection that already went away are dropped.
#[derive(Debug)]
pub struct WaitNotifier {
    wait_id: WaitId,
    channel: ChannelName,
    tx: mpsc::UnboundedSender<WaitResolution>,
}

impl WaitNotifier {
    /// Creates a notifier for a freshly allocated wait on `channel`.
    #[must_use]
    pub fn new(channel: ChannelName, tx: mpsc::UnboundedSender<WaitResolution>) -> Self {
        Self {
            wait_id: WaitId::next(),
            channel,
            tx,
        }
    }

    /// Returns the wait this notifier completes.
    #[must_use]
    pub const fn wait_id(&self) -> WaitId {
        self.wait_id
    }

    /// Returns the channel the wait was issued on.
    #[must_use]
    pub const fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Resolves the wait with `outcome`.
    ///
    /// Returns `false` if the owning connection is gone.
    pub fn resolve(self, outcome: Result<Delivery, StoreError>) -> bool {
        self.tx
            .send(WaitResolution {
                wait_id: self.wait_id,
                channel: self.channel,
                outcome,
            })
            .is_ok()
    }

    /// Resolves the wait with a delivered message.
    pub fn deliver(self, delivery: Delivery) -> bool {
        self.resolve(Ok(delivery))
    }

    /// Resolves the wait with the disconnect sentinel.
    pub fn disconnect(self) -> bool {
        self.resolve(Err(StoreError::Disconnected))
    }
}

/// Session-side reference to an outstanding wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitHandle {
    id: WaitId,
    channel: ChannelName,
    after: Sequence,
}

impl WaitHandle {
    /// Creates a handle for wait `id` on `channel` after `after`.
    #[must_use]
    pub const fn new(id: WaitId, channel: ChannelName, after: Sequence) -> Self {
        Self { id, channel, after }
    }

    /// Returns the wait identifier.
    #[must_use]
    pub const fn id(&self) -> WaitId {
        self.id
    }

    /// Returns the channel the wait is on.
    #[must_use]
    pub const fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Returns the cursor the wait was issued with.
    #[must_use]
    pub const fn after(&self) -> Sequence {
        self.after
    }
}

/// Asynchronous channel store as seen by a session.
///
/// Implementations own sequence assignment and fan-out. Both operations must
/// return without blocking on message arrival.
pub trait ChannelStore: Send + Sync + fmt::Debug {
    /// Registers interest in the first message on `channel` whose sequence is
    /// greater than `after`, completing `notifier` once it exists.
    fn issue_wait(
        &self,
        channel: &ChannelName,
        after: Sequence,
        notifier: WaitNotifier,
    ) -> WaitHandle;

    /// Cancels an outstanding wait and unregisters its interest in the
    /// channel. A wait still pending resolves with
    /// [`StoreError::Disconnected`]. Cancelling an unknown or already
    /// resolved wait is a no-op.
    fn cancel(&self, handle: &WaitHandle);
}
