//! Test double that records every store call and lets tests resolve waits
//! by hand.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::store::{ChannelStore, Delivery, Sequence, WaitHandle, WaitId, WaitNotifier};
use super::ChannelName;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    issued: Mutex<Vec<WaitHandle>>,
    cancelled: Mutex<Vec<WaitHandle>>,
    notifiers: Mutex<HashMap<WaitId, WaitNotifier>>,
}

impl RecordingStore {
    pub(crate) fn issued(&self) -> Vec<WaitHandle> {
        self.issued.lock().clone()
    }

    pub(crate) fn cancelled(&self) -> Vec<WaitHandle> {
        self.cancelled.lock().clone()
    }

    pub(crate) fn last_issued(&self) -> Option<WaitHandle> {
        self.issued.lock().last().cloned()
    }

    pub(crate) fn pending(&self) -> usize {
        self.notifiers.lock().len()
    }

    /// Completes the wait with a message, as a publish would.
    pub(crate) fn deliver(
        &self,
        handle: &WaitHandle,
        message: serde_json::Value,
        sequence: Sequence,
    ) -> bool {
        let notifier = self.notifiers.lock().remove(&handle.id());
        notifier.is_some_and(|n| n.deliver(Delivery { message, sequence }))
    }

    /// Completes the wait with an arbitrary failure.
    pub(crate) fn fail(&self, handle: &WaitHandle, error: StoreError) -> bool {
        let notifier = self.notifiers.lock().remove(&handle.id());
        notifier.is_some_and(|n| n.resolve(Err(error)))
    }
}

impl ChannelStore for RecordingStore {
    fn issue_wait(
        &self,
        channel: &ChannelName,
        after: Sequence,
        notifier: WaitNotifier,
    ) -> WaitHandle {
        let handle = WaitHandle::new(notifier.wait_id(), channel.clone(), after);
        self.notifiers.lock().insert(handle.id(), notifier);
        self.issued.lock().push(handle.clone());
        handle
    }

    fn cancel(&self, handle: &WaitHandle) {
        self.cancelled.lock().push(handle.clone());
        if let Some(notifier) = self.notifiers.lock().remove(&handle.id()) {
            notifier.disconnect();
        }
    }
}
