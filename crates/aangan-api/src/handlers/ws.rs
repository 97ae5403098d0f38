//! WebSocket upgrade handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use aangan_realtime::connection::adapter::InboundAction;
use aangan_realtime::connection::heartbeat::run_heartbeat;
use aangan_realtime::connection::ConnectionHandle;

use crate::state::AppState;

/// Hard cap on a single WebSocket frame. Frames between the protocol limit
/// and this cap are answered with `INVALID_MESSAGE`; larger ones end the
/// connection.
const MAX_FRAME_SIZE: usize = 64 * 1024;

/// How long the writer may keep flushing after the connection ends.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /ws
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one WebSocket connection to completion.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let realtime = Arc::clone(&state.realtime);
    let transport = Arc::clone(&realtime.transport);

    let (handle, outbound_rx) = transport.open();
    let conn_id = handle.id;
    let (ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(forward_outbound(Arc::clone(&handle), outbound_rx, ws_tx));
    let heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&handle),
        realtime.heartbeat_config(),
        realtime.shutdown_receiver(),
    ));

    let mut shutdown = realtime.shutdown_receiver();
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if transport.handle_inbound(&conn_id, text.as_str()) == InboundAction::Close {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(conn_id = %conn_id, "Client closed WebSocket");
                    break;
                }
                Some(Ok(_)) => handle.touch(),
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket read error");
                    break;
                }
            },
            _ = handle.closed() => break,
            _ = shutdown.recv() => break,
        }
    }

    transport.close(&conn_id);
    heartbeat.abort();
    if tokio::time::timeout(WRITER_FLUSH_TIMEOUT, writer).await.is_err() {
        warn!(conn_id = %conn_id, "Outbound writer did not finish in time");
    }
}

/// Drains the connection's outbound queue into the socket.
///
/// Once the connection is marked dead, frames still queued (such as a final
/// error) are flushed before the close frame is sent.
async fn forward_outbound<S>(
    handle: Arc<ConnectionHandle>,
    mut outbound_rx: mpsc::Receiver<String>,
    mut ws_tx: S,
) where
    S: futures::Sink<Message> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            frame = outbound_rx.recv() => match frame {
                Some(text) => {
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
            _ = handle.closed() => break,
        }
    }

    while let Ok(text) = outbound_rx.try_recv() {
        if ws_tx.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }
    let _ = ws_tx.send(Message::Close(None)).await;
}
