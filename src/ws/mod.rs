//! WebSocket layer: mode selection, frame codec, per-connection sessions.
//!
//! Any path not claimed by the HTTP API upgrades to a WebSocket. In
//! single-channel mode the path is the channel and the client resumes it by
//! sending its last seen sequence; with `?multiplexing=enabled` the client
//! subscribes to named channels explicitly.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod mode;
pub mod session;
pub mod subscription;
