//! # seqbus-gateway
//!
//! WebSocket gateway for a sequenced publish/subscribe message bus.
//!
//! Clients attach to named channels over long-lived WebSocket connections
//! and resume delivery after a reconnect by sending the last sequence number
//! they observed. A connection either follows the single channel named by
//! its URL path, or, with `?multiplexing=enabled`, any number of channels
//! the client subscribes to explicitly. Delivery is at-least-once; clients
//! de-duplicate by sequence.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)      POST /publish, GET /health
//!     ├── WS Handler (ws/)          mode selection → Session per connection
//!     │
//!     ├── Session (ws/session)      single | multiplexed state machine
//!     ├── Subscription (ws/)        cursor + one outstanding wait
//!     │
//!     └── ChannelStore (domain/)    issue_wait / cancel, MemoryChannelStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod ws;
