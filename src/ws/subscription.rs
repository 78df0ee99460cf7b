//! Per-channel subscription: the cursor and the single outstanding wait.
//!
//! A [`Subscription`] holds at most one [`WaitHandle`]. Issuing a new wait
//! cancels the previous one first, and a resolution only counts when it
//! carries the id of the wait currently held, so late resolutions of
//! superseded or cancelled waits fall through as no-ops.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{
    ChannelName, ChannelStore, Delivery, Sequence, WaitHandle, WaitId, WaitNotifier,
    WaitResolution,
};
use crate::error::StoreError;

/// Issues and cancels waits on behalf of one connection.
///
/// Every notifier it hands to the store feeds the connection's resolution
/// queue.
#[derive(Debug, Clone)]
pub struct WaitIssuer {
    store: Arc<dyn ChannelStore>,
    resolutions: mpsc::UnboundedSender<WaitResolution>,
}

impl WaitIssuer {
    /// Creates an issuer routing resolutions into `resolutions`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ChannelStore>,
        resolutions: mpsc::UnboundedSender<WaitResolution>,
    ) -> Self {
        Self { store, resolutions }
    }

    /// Issues a wait for the first message on `channel` after `after`.
    #[must_use]
    pub fn issue(&self, channel: &ChannelName, after: Sequence) -> WaitHandle {
        let notifier = WaitNotifier::new(channel.clone(), self.resolutions.clone());
        self.store.issue_wait(channel, after, notifier)
    }

    /// Cancels `handle` at the store.
    pub fn cancel(&self, handle: &WaitHandle) {
        self.store.cancel(handle);
    }
}

/// A delivered message paired with the cursor its wait was issued with.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    /// Message payload.
    pub message: serde_json::Value,
    /// Cursor that was active when the wait was issued.
    pub last_sequence: Sequence,
}

/// Binding of one channel to its cursor and outstanding wait.
#[derive(Debug)]
pub struct Subscription {
    channel: ChannelName,
    last_sequence: Option<Sequence>,
    wait: Option<WaitHandle>,
}

impl Subscription {
    /// Creates a subscription with no history requested and no wait.
    #[must_use]
    pub const fn new(channel: ChannelName) -> Self {
        Self {
            channel,
            last_sequence: None,
            wait: None,
        }
    }

    /// Returns the subscribed channel.
    #[must_use]
    pub const fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Returns the current cursor, if a wait was ever issued.
    #[must_use]
    pub const fn last_sequence(&self) -> Option<Sequence> {
        self.last_sequence
    }

    /// Returns the outstanding wait, if any.
    #[must_use]
    pub const fn wait(&self) -> Option<&WaitHandle> {
        self.wait.as_ref()
    }

    /// Returns `true` while a wait is outstanding.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.wait.is_some()
    }

    /// Issues a wait for the next message after `cursor`, cancelling the
    /// outstanding one first.
    pub fn wait_after(&mut self, issuer: &WaitIssuer, cursor: Sequence) {
        self.cancel(issuer);
        self.wait = Some(issuer.issue(&self.channel, cursor));
        self.last_sequence = Some(cursor);
    }

    /// Cancels the outstanding wait. Returns `false` if there was none.
    pub fn cancel(&mut self, issuer: &WaitIssuer) -> bool {
        match self.wait.take() {
            Some(handle) => {
                issuer.cancel(&handle);
                true
            }
            None => false,
        }
    }

    /// Applies the resolution of wait `wait_id`.
    ///
    /// On delivery the next wait is issued immediately after the delivered
    /// sequence and the message is returned with the cursor it answered.
    /// Resolutions of waits this subscription no longer holds, and the
    /// disconnect sentinel, yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`] for any failure other than the disconnect
    /// sentinel, and [`StoreError::SequenceRegressed`] if a delivery does not
    /// move past the cursor.
    pub fn settle(
        &mut self,
        issuer: &WaitIssuer,
        wait_id: WaitId,
        outcome: Result<Delivery, StoreError>,
    ) -> Result<Option<Settled>, StoreError> {
        if self.wait.as_ref().map(WaitHandle::id) != Some(wait_id) {
            return Ok(None);
        }
        let Some(handle) = self.wait.take() else {
            return Ok(None);
        };
        let cursor = handle.after();

        let delivery = match outcome {
            Ok(delivery) => delivery,
            Err(err) if err.is_disconnect() => return Ok(None),
            Err(err) => return Err(err),
        };
        if delivery.sequence <= cursor {
            return Err(StoreError::SequenceRegressed {
                channel: self.channel.clone(),
                cursor,
                received: delivery.sequence,
            });
        }

        self.wait_after(issuer, delivery.sequence);
        Ok(Some(Settled {
            message: delivery.message,
            last_sequence: cursor,
        }))
    }
}
