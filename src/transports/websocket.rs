//! WebSocket front end using `tokio-tungstenite`.
//!
//! [`serve`] accepts connections on a [`TcpListener`] and bridges each
//! socket to the [`MatchServer`] core: inbound text frames are fed to
//! [`MatchServer::handle_text`], the connection's outbox is drained
//! into the socket, and the close/error event is reported via
//! [`MatchServer::connection_closed`] so the reconnect grace window
//! starts ticking.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature
//! is enabled (it is enabled by default).

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::ServerError;
use crate::session::MatchServer;

/// Accept WebSocket connections forever, spawning one task per client.
///
/// # Errors
///
/// Returns [`ServerError::Io`] if the accept loop itself fails;
/// per-connection errors are logged and do not stop the server.
pub async fn serve(listener: TcpListener, server: MatchServer) -> Result<(), ServerError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepting TCP connection");
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_socket(stream, server).await {
                tracing::debug!(%peer, "connection ended with error: {err}");
            }
        });
    }
}

/// Drive one client socket to completion.
async fn handle_socket(stream: TcpStream, server: MatchServer) -> Result<(), ServerError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        let kind = match &e {
            tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
            _ => std::io::ErrorKind::Other,
        };
        ServerError::Io(std::io::Error::new(kind, e))
    })?;
    let (mut sink, mut frames) = ws.split();

    let (conn, mut outbox) = server.open_connection();
    let connection_id = conn.id();
    tracing::info!(connection = %connection_id, "WebSocket connection established");

    // Writer half: drain the outbox into the socket until either side
    // goes away.
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!("failed to serialize server message: {err}");
                }
            }
        }
        let _ = sink.close().await;
    });

    // Reader half: runs on this task so the close event fires as soon
    // as the stream ends.
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                server.handle_text(&conn, text.as_ref()).await;
            }
            Ok(Message::Close(frame)) => {
                tracing::debug!(connection = %connection_id, ?frame, "received close frame");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // tungstenite auto-queues the pong reply.
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(
                    connection = %connection_id,
                    "received unexpected binary frame, skipping"
                );
            }
            Ok(Message::Frame(_)) => {
                // Never produced by the read half; kept for exhaustiveness.
            }
            Err(err) => {
                tracing::debug!(connection = %connection_id, "read error: {err}");
                break;
            }
        }
    }

    tracing::info!(connection = %connection_id, "WebSocket connection closed");
    server.connection_closed(connection_id).await;
    writer.abort();
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;

    /// Bind a server on an ephemeral port and return its URL.
    async fn start_server(server: MatchServer) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = serve(listener, server).await;
        });
        format!("ws://{addr}")
    }

    async fn recv_message(
        ws: &mut tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<TcpStream>,
        >,
    ) -> ServerMessage {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_ref()).unwrap();
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn login_round_trip_over_websocket() {
        let url = start_server(MatchServer::default()).await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        ws.send(Message::Text(
            r#"{"type":"login","username":"alice"}"#.into(),
        ))
        .await
        .unwrap();

        let msg = recv_message(&mut ws).await;
        match msg {
            ServerMessage::LoginSuccess { username, room } => {
                assert_eq!(username, "alice");
                assert!(room.is_none());
            }
            other => panic!("expected login_success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_keeps_the_connection_open() {
        let url = start_server(MatchServer::default()).await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        ws.send(Message::Text("{broken".into())).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"login","username":"bob"}"#.into(),
        ))
        .await
        .unwrap();

        let msg = recv_message(&mut ws).await;
        assert!(matches!(msg, ServerMessage::LoginSuccess { .. }));
    }

    #[tokio::test]
    async fn close_keeps_identity_registered_for_the_grace_window() {
        let server = MatchServer::default();
        let url = start_server(server.clone()).await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        ws.send(Message::Text(
            r#"{"type":"login","username":"carol"}"#.into(),
        ))
        .await
        .unwrap();
        let _ = recv_message(&mut ws).await;

        ws.close(None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        // Still registered: the default grace window is far longer.
        assert_eq!(
            server.registered_players().await,
            vec!["carol".to_string()]
        );
    }
}
