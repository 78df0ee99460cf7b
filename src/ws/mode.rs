//! Session mode selection from the upgrade request's query string.

use serde::Deserialize;

/// Query value that turns multiplexing on.
pub const MULTIPLEXING_ENABLED: &str = "enabled";

/// Query parameters inspected on the upgrade request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModeParams {
    /// `enabled` selects [`SessionMode::Multiplexed`].
    pub multiplexing: Option<String>,
}

/// Which session variant governs a connection.
///
/// Chosen once before the upgrade completes and fixed for the connection's
/// lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionMode {
    /// One channel per connection, named by the connection's path.
    #[default]
    Single,
    /// Any number of client-named channels over one connection.
    Multiplexed,
}

impl SessionMode {
    /// Maps the `multiplexing` query value to a mode. Only the exact value
    /// `enabled` selects multiplexing.
    #[must_use]
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(MULTIPLEXING_ENABLED) => Self::Multiplexed,
            _ => Self::Single,
        }
    }

    /// Maps parsed query parameters to a mode.
    #[must_use]
    pub fn from_params(params: &ModeParams) -> Self {
        Self::from_flag(params.multiplexing.as_deref())
    }
}
