//! Domain layer: channel identity, the channel store contract, and the
//! in-memory store the gateway runs on.
//!
//! Sessions in [`crate::ws`] depend only on the [`ChannelStore`] trait;
//! [`MemoryChannelStore`] is the implementation wired up by the binary and
//! the publish endpoint.

pub mod channel;
pub mod memory_store;
pub mod store;

#[cfg(test)]
pub(crate) mod recording;

pub use channel::ChannelName;
pub use memory_store::MemoryChannelStore;
pub use store::{
    ChannelStore, Delivery, Sequence, WaitHandle, WaitId, WaitNotifier, WaitResolution,
};
