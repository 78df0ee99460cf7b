//! WebSocket connection loop.
//!
//! Owns the socket for the connection's lifetime and drives its
//! [`Session`]: inbound frames and wait resolutions are multiplexed with
//! `tokio::select!` and fed to the session one at a time, so the session
//! needs no locking of its own.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::mode::SessionMode;
use super::session::Session;
use super::subscription::WaitIssuer;
use crate::domain::ChannelStore;

/// Everything a connection needs besides its socket.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Request path of the upgrade; the channel name in single mode.
    pub route: String,
    /// Session variant selected before the upgrade.
    pub mode: SessionMode,
    /// Store waits are issued against.
    pub store: Arc<dyn ChannelStore>,
    /// Cap on distinct channels in multiplexed mode.
    pub max_multiplex_channels: usize,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads client frames and hands them to the session, sending back any
///   reply (pongs).
/// - Forwards each delivery produced by a resolved wait.
/// - On close, transport error, send failure, or a fatal store error, leaves
///   the loop and closes the session, which cancels every outstanding wait.
pub async fn run_connection(socket: WebSocket, params: ConnectionParams) {
    let conn_id = uuid::Uuid::new_v4();
    let (resolution_tx, mut resolution_rx) = mpsc::unbounded_channel();
    let issuer = WaitIssuer::new(params.store, resolution_tx);
    let mut session = Session::new(
        conn_id,
        params.route,
        params.mode,
        params.max_multiplex_channels,
        issuer,
    );
    session.opened();

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = session.on_message(text.as_str())
                            && ws_tx.send(Message::text(reply.encode())).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        session.on_error(&err);
                        break;
                    }
                    _ => {}
                }
            }
            // Resolution of a wait issued by this session
            Some(resolution) = resolution_rx.recv() => {
                match session.on_wait_resolved(resolution) {
                    Ok(Some(frame)) => {
                        if ws_tx.send(Message::text(frame.encode())).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::error!(%conn_id, error = %err, "fatal store failure; closing connection");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    session.closed();
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::Router;
    use axum::extract::ws::WebSocketUpgrade;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message as ClientMessage;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

    use super::*;
    use crate::domain::recording::RecordingStore;
    use crate::domain::WaitHandle;
    use crate::error::StoreError;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Serves `run_connection` against `store` on an ephemeral port.
    async fn serve(store: &Arc<RecordingStore>, mode: SessionMode) -> SocketAddr {
        let params = ConnectionParams {
            route: "/feed".to_string(),
            mode,
            store: Arc::clone(store) as Arc<dyn ChannelStore>,
            max_multiplex_channels: 8,
        };
        let app = Router::new().fallback(move |ws: WebSocketUpgrade| {
            let params = params.clone();
            async move { ws.on_upgrade(move |socket| run_connection(socket, params)) }
        });
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    async fn connect(addr: SocketAddr) -> Client {
        let Ok((client, _)) = connect_async(format!("ws://{addr}/feed")).await else {
            panic!("websocket connect failed");
        };
        client
    }

    async fn send(client: &mut Client, text: &str) {
        let Ok(()) = client.send(ClientMessage::text(String::from(text))).await else {
            panic!("send failed");
        };
    }

    async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + TIMEOUT;
        while !check() {
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {what}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn issued_on(store: &RecordingStore, channel: &str) -> WaitHandle {
        let Some(handle) = store
            .issued()
            .into_iter()
            .find(|handle| handle.channel().as_str() == channel)
        else {
            panic!("no wait issued on {channel}");
        };
        handle
    }

    #[tokio::test]
    async fn store_failure_closes_socket_and_cancels_other_waits() {
        let store = Arc::new(RecordingStore::default());
        let addr = serve(&store, SessionMode::Multiplexed).await;
        let mut client = connect(addr).await;

        send(
            &mut client,
            r#"{"multiplex_subscribe":[{"channel":"good","message_sequence":0},{"channel":"bad","message_sequence":0}]}"#,
        )
        .await;
        wait_until("two issued waits", || store.issued().len() == 2).await;
        let good = issued_on(&store, "good");
        let bad = issued_on(&store, "bad");

        assert!(store.fail(&bad, StoreError::Unexpected("log corrupted".to_string())));

        loop {
            let Ok(next) = tokio::time::timeout(TIMEOUT, client.next()).await else {
                panic!("timed out waiting for close frame");
            };
            match next {
                Some(Ok(ClientMessage::Close(_))) => break,
                Some(Ok(ClientMessage::Ping(_) | ClientMessage::Pong(_))) => {}
                other => panic!("expected close frame, got {other:?}"),
            }
        }

        wait_until("close cleanup", || !store.cancelled().is_empty()).await;
        assert_eq!(store.cancelled(), vec![good]);
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn dropped_transport_cancels_outstanding_wait() {
        let store = Arc::new(RecordingStore::default());
        let addr = serve(&store, SessionMode::Single).await;
        let mut client = connect(addr).await;

        send(&mut client, r#"{"message_sequence":3}"#).await;
        wait_until("issued wait", || store.issued().len() == 1).await;
        let wait = issued_on(&store, "/feed");
        assert_eq!(wait.after(), 3);

        // No close handshake: the server sees the stream end or error out.
        drop(client);

        wait_until("close cleanup", || !store.cancelled().is_empty()).await;
        assert_eq!(store.cancelled(), vec![wait]);
        assert_eq!(store.pending(), 0);
    }
}
