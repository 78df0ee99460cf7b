//! Type-safe channel name.
//!
//! [`ChannelName`] is a newtype wrapper around [`String`] so that channel
//! names cannot be confused with connection routes or other free-form text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a pub/sub channel.
///
/// In single-channel mode the connection's URL path (e.g. `/foo`) is used
/// verbatim as the channel name; in multiplexed mode the client supplies it.
/// Used as the key of the per-connection subscription table and of the
/// channel store's per-channel logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Creates a channel name from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the name is empty or only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChannelName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ChannelName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<ChannelName> for String {
    fn from(name: ChannelName) -> Self {
        name.0
    }
}
