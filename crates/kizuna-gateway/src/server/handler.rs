//! WebSocket handler
//!
//! One socket runs three tasks: a reader that feeds the command loop, a
//! writer that drains the outbound queue, and a heartbeat monitor. The first
//! to finish ends the connection.

use crate::connection::Connection;
use crate::handlers::{DisconnectHandler, IdentifyHandler, MessageDispatcher, PendingSession};
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let (ws_sink, mut ws_stream) = socket.split();
    let realtime = state.realtime().clone();

    let (tx, rx) = mpsc::channel::<GatewayMessage>(realtime.outbound_buffer.max(1));
    let (close_tx, close_rx) = oneshot::channel::<CloseCode>();
    let mut send_task = tokio::spawn(write_loop(ws_sink, rx, close_rx));

    let hello = GatewayMessage::hello(HelloPayload::with_interval(realtime.heartbeat_interval_ms));
    if tx.try_send(hello).is_err() {
        tracing::warn!("Failed to queue Hello message");
        return;
    }

    // The auth window only bounds credential resolution. Nothing is
    // registered until `activate`, which runs outside it.
    let identified =
        tokio::time::timeout(realtime.auth_timeout(), await_identify(&state, &mut ws_stream, &tx))
            .await;
    let pending = match identified {
        Ok(Ok(pending)) => pending,
        Ok(Err(code)) => {
            finish_writer(send_task, close_tx, code).await;
            return;
        }
        Err(_) => {
            tracing::debug!("No Identify within the auth window");
            finish_writer(send_task, close_tx, Some(CloseCode::AuthenticationTimeout)).await;
            return;
        }
    };
    let connection = match IdentifyHandler::activate(&state, pending).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to bring connection online");
            finish_writer(send_task, close_tx, Some(e.to_close_code())).await;
            return;
        }
    };
    let session_id = connection.session_id().to_string();

    let mut recv_task = tokio::spawn(read_loop(state.clone(), connection.clone(), ws_stream));
    let mut heartbeat_task =
        tokio::spawn(heartbeat_monitor(connection.clone(), realtime.heartbeat_interval()));

    let mut writer_done = false;
    let close_code = tokio::select! {
        result = &mut recv_task => match result {
            Ok(code) => code,
            Err(e) if e.is_panic() => {
                tracing::error!(session_id = %session_id, "Command loop panicked");
                Some(CloseCode::UnknownError)
            }
            Err(_) => Some(CloseCode::UnknownError),
        },
        _ = &mut send_task => {
            tracing::debug!(session_id = %session_id, "Send task ended");
            writer_done = true;
            None
        }
        result = &mut heartbeat_task => result.ok(),
        code = connection.close_requested() => Some(code),
    };

    recv_task.abort();
    heartbeat_task.abort();
    // Wait for the command loop to stop before tearing down its indexes
    let _ = recv_task.await;

    if let Some(code) = close_code {
        tracing::debug!(session_id = %session_id, close_code = %code, "Closing connection");
    }

    DisconnectHandler::handle(&state, &connection).await;

    if !writer_done {
        finish_writer(send_task, close_tx, close_code).await;
    }
}

/// Read frames until `Identify` is accepted. `Err(None)` means the client left.
async fn await_identify(
    state: &GatewayState,
    ws_stream: &mut WsStream,
    tx: &mpsc::Sender<GatewayMessage>,
) -> Result<PendingSession, Option<CloseCode>> {
    while let Some(msg) = ws_stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => return Err(Some(CloseCode::DecodeError)),
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => return Err(None),
        };

        let message = GatewayMessage::parse(&text).map_err(Some)?;
        match MessageDispatcher::dispatch_unauthenticated(state, message, tx).await {
            Ok(Some(pending)) => return Ok(pending),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Closing unauthenticated socket");
                return Err(Some(e.to_close_code()));
            }
        }
    }
    Err(None)
}

/// Feed frames through the command loop, one at a time
async fn read_loop(
    state: GatewayState,
    connection: Arc<Connection>,
    mut ws_stream: WsStream,
) -> Option<CloseCode> {
    let session_id = connection.session_id();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let message = match GatewayMessage::parse(&text) {
                    Ok(message) => message,
                    Err(code) => {
                        tracing::debug!(session_id = %session_id, close_code = %code, "Failed to parse message");
                        return Some(code);
                    }
                };

                tracing::trace!(session_id = %session_id, op = %message.op, "Received message");

                if let Err(e) = MessageDispatcher::dispatch(&state, &connection, message).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Handler error");
                    return Some(e.to_close_code());
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(session_id = %session_id, "Binary messages not supported");
                return Some(CloseCode::DecodeError);
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                tracing::debug!(session_id = %session_id, "Client closed connection");
                return None;
            }
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "WebSocket error");
                return None;
            }
        }
    }
    None
}

/// Close the socket once a connection has been silent for two intervals
async fn heartbeat_monitor(connection: Arc<Connection>, heartbeat_interval: Duration) -> CloseCode {
    let timeout = heartbeat_interval * 2;
    let mut check = interval((heartbeat_interval / 2).max(Duration::from_millis(10)));

    loop {
        check.tick().await;

        let silent_for = connection.time_since_heartbeat();
        if silent_for > timeout {
            tracing::info!(
                session_id = %connection.session_id(),
                silent_ms = silent_for.as_millis(),
                "Connection timed out (no heartbeat)"
            );
            return CloseCode::SessionTimeout;
        }
    }
}

/// Drain the outbound queue into the socket until told to close
async fn write_loop(
    mut sink: WsSink,
    mut rx: mpsc::Receiver<GatewayMessage>,
    mut close_rx: oneshot::Receiver<CloseCode>,
) {
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => {
                    if send_frame(&mut sink, &frame).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
            code = &mut close_rx => {
                // Flush what was queued before the close was decided
                while let Ok(frame) = rx.try_recv() {
                    if send_frame(&mut sink, &frame).await.is_err() {
                        return;
                    }
                }
                if let Ok(code) = code {
                    let frame = CloseFrame {
                        code: code.as_u16(),
                        reason: code.description().into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                }
                break;
            }
        }
    }

    let _ = sink.close().await;
}

async fn send_frame(sink: &mut WsSink, frame: &GatewayMessage) -> Result<(), axum::Error> {
    match frame.to_json() {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize outbound frame");
            Ok(())
        }
    }
}

/// Tell the writer how to close and wait briefly for it to flush
async fn finish_writer(
    send_task: tokio::task::JoinHandle<()>,
    close_tx: oneshot::Sender<CloseCode>,
    code: Option<CloseCode>,
) {
    match code {
        Some(code) => {
            let _ = close_tx.send(code);
        }
        None => drop(close_tx),
    }

    if tokio::time::timeout(Duration::from_secs(5), send_task).await.is_err() {
        tracing::debug!("Writer did not finish within the close grace period");
    }
}
