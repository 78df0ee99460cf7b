//! Per-connection session state machine.
//!
//! A [`Session`] is driven by discrete events from the connection loop
//! (opened, inbound text, transport error, wait resolved, closed) and never
//! touches the socket itself: every event returns the frame, if any, to send
//! back. The variant is chosen once from the [`SessionMode`] and never
//! changes.
//!
//! ```text
//! Single:       Idle ──message_sequence──▶ Waiting ⟲ delivery ──close──▶ Closed
//! Multiplexed:  { channel → Waiting ⟲ delivery } ──close──▶ Closed
//! ```

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use super::messages::{InboundFrame, OutboundFrame};
use super::mode::SessionMode;
use super::subscription::{Settled, Subscription, WaitIssuer};
use crate::domain::{ChannelName, Sequence, WaitResolution};
use crate::error::GatewayError;

/// One-channel-per-connection state.
#[derive(Debug)]
pub struct SingleSession {
    channel: ChannelName,
    subscription: Option<Subscription>,
}

impl SingleSession {
    /// Creates an idle session bound to `channel`.
    #[must_use]
    pub const fn new(channel: ChannelName) -> Self {
        Self {
            channel,
            subscription: None,
        }
    }

    /// Returns `true` once the client supplied its resume cursor.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Returns the subscription, if any.
    #[must_use]
    pub const fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    fn on_frame(&mut self, frame: &InboundFrame, issuer: &WaitIssuer) {
        if self.subscription.is_some() {
            return;
        }
        if let Some(cursor) = frame.message_sequence {
            let mut subscription = Subscription::new(self.channel.clone());
            subscription.wait_after(issuer, cursor);
            tracing::debug!(channel = %self.channel, cursor, "subscribed");
            self.subscription = Some(subscription);
        }
    }
}

/// Many-channels-per-connection state.
#[derive(Debug)]
pub struct MultiplexedSession {
    subscriptions: HashMap<ChannelName, Subscription>,
    max_channels: usize,
}

impl MultiplexedSession {
    /// Creates a session accepting up to `max_channels` distinct channels.
    #[must_use]
    pub fn new(max_channels: usize) -> Self {
        Self {
            subscriptions: HashMap::new(),
            max_channels,
        }
    }

    /// Returns the subscription for `channel`, if any.
    #[must_use]
    pub fn subscription(&self, channel: &ChannelName) -> Option<&Subscription> {
        self.subscriptions.get(channel)
    }

    /// Returns the number of subscribed channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns `true` if no channel is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Subscribes `channel` from `cursor`, replacing any existing entry for
    /// the same channel after cancelling its wait.
    pub fn subscribe(&mut self, channel: &ChannelName, cursor: Sequence, issuer: &WaitIssuer) {
        if let Some(existing) = self.subscriptions.get_mut(channel) {
            existing.cancel(issuer);
        } else if self.subscriptions.len() >= self.max_channels {
            tracing::warn!(
                %channel,
                max_channels = self.max_channels,
                "multiplex channel limit reached; subscribe skipped"
            );
            return;
        }

        let mut subscription = Subscription::new(channel.clone());
        subscription.wait_after(issuer, cursor);
        tracing::debug!(%channel, cursor, "multiplexed subscribe");
        self.subscriptions.insert(channel.clone(), subscription);
    }

    fn on_frame(&mut self, frame: &InboundFrame, issuer: &WaitIssuer) -> Option<OutboundFrame> {
        if let Some(entries) = &frame.multiplex_subscribe {
            for (channel, cursor) in entries.iter().filter_map(|entry| entry.complete()) {
                self.subscribe(channel, cursor, issuer);
            }
            None
        } else if frame.is_ping() {
            Some(OutboundFrame::pong())
        } else {
            None
        }
    }
}

/// Variant-specific session state.
#[derive(Debug)]
pub enum SessionKind {
    /// Classic one-channel-per-connection mode.
    Single(SingleSession),
    /// Multiplexed mode.
    Multiplexed(MultiplexedSession),
}

/// State of one upgraded connection.
#[derive(Debug)]
pub struct Session {
    conn_id: Uuid,
    route: String,
    issuer: WaitIssuer,
    kind: SessionKind,
    closed: bool,
}

impl Session {
    /// Creates the session for a connection on `route`.
    ///
    /// In single mode the route is the channel name.
    #[must_use]
    pub fn new(
        conn_id: Uuid,
        route: impl Into<String>,
        mode: SessionMode,
        max_channels: usize,
        issuer: WaitIssuer,
    ) -> Self {
        let route = route.into();
        let kind = match mode {
            SessionMode::Single => {
                SessionKind::Single(SingleSession::new(ChannelName::new(route.clone())))
            }
            SessionMode::Multiplexed => {
                SessionKind::Multiplexed(MultiplexedSession::new(max_channels))
            }
        };
        Self {
            conn_id,
            route,
            issuer,
            kind,
            closed: false,
        }
    }

    /// Returns the variant-specific state.
    #[must_use]
    pub const fn kind(&self) -> &SessionKind {
        &self.kind
    }

    /// Returns `true` once [`Session::closed`] ran.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Transport opened.
    pub fn opened(&self) {
        tracing::debug!(
            conn_id = %self.conn_id,
            route = %self.route,
            mode = ?self.mode(),
            "ws connection opened"
        );
    }

    /// Handles an inbound text payload and returns the reply, if any.
    ///
    /// Pings are answered in every state. Nothing else produces a reply.
    pub fn on_message(&mut self, text: &str) -> Option<OutboundFrame> {
        if self.closed {
            return None;
        }
        let frame = InboundFrame::decode(text);
        match &mut self.kind {
            SessionKind::Single(single) => {
                if frame.is_ping() {
                    return Some(OutboundFrame::pong());
                }
                single.on_frame(&frame, &self.issuer);
                None
            }
            SessionKind::Multiplexed(multi) => multi.on_frame(&frame, &self.issuer),
        }
    }

    /// Handles the resolution of a wait this connection issued.
    ///
    /// Returns the delivery frame to send, or `None` for stale resolutions
    /// and the disconnect sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the store failed the wait with
    /// anything but the disconnect sentinel. The connection must be closed.
    pub fn on_wait_resolved(
        &mut self,
        resolution: WaitResolution,
    ) -> Result<Option<OutboundFrame>, GatewayError> {
        if self.closed {
            return Ok(None);
        }
        let WaitResolution {
            wait_id,
            channel,
            outcome,
        } = resolution;

        let frame = match &mut self.kind {
            SessionKind::Single(single) => {
                let Some(subscription) = single.subscription.as_mut() else {
                    return Ok(None);
                };
                if subscription.channel() != &channel {
                    return Ok(None);
                }
                subscription
                    .settle(&self.issuer, wait_id, outcome)?
                    .map(|Settled { message, last_sequence }| OutboundFrame::Message {
                        message,
                        last_sequence,
                    })
            }
            SessionKind::Multiplexed(multi) => {
                let Some(subscription) = multi.subscriptions.get_mut(&channel) else {
                    return Ok(None);
                };
                subscription
                    .settle(&self.issuer, wait_id, outcome)?
                    .map(|Settled { message, last_sequence }| OutboundFrame::ChannelMessage {
                        channel,
                        message,
                        last_sequence,
                    })
            }
        };

        if frame.is_some() {
            tracing::trace!(conn_id = %self.conn_id, wait_id = %wait_id, "delivery forwarded");
        }
        Ok(frame)
    }

    /// Transport reported an error. Cleanup is left to [`Session::closed`].
    pub fn on_error(&self, error: &dyn fmt::Display) {
        tracing::warn!(
            conn_id = %self.conn_id,
            route = %self.route,
            error = %error,
            "ws transport error"
        );
    }

    /// Transport closed: cancels every outstanding wait and releases every
    /// subscription. Returns the number of waits cancelled; a second call
    /// cancels nothing.
    pub fn closed(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.closed = true;

        let issuer = &self.issuer;
        let cancelled = match &mut self.kind {
            SessionKind::Single(single) => single
                .subscription
                .take()
                .map_or(0, |mut sub| usize::from(sub.cancel(issuer))),
            SessionKind::Multiplexed(multi) => multi
                .subscriptions
                .drain()
                .map(|(_, mut sub)| usize::from(sub.cancel(issuer)))
                .sum(),
        };

        tracing::debug!(
            conn_id = %self.conn_id,
            route = %self.route,
            cancelled,
            "ws connection closed"
        );
        cancelled
    }

    fn mode(&self) -> SessionMode {
        match self.kind {
            SessionKind::Single(_) => SessionMode::Single,
            SessionKind::Multiplexed(_) => SessionMode::Multiplexed,
        }
    }
}
