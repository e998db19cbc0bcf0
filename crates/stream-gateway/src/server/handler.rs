//! WebSocket handler
//!
//! Bridges an axum WebSocket to the gateway: one reader task feeding the
//! classifier, one writer task draining the connection's transport.

use crate::connection::{Connection, Outbound, Session, Transport};
use crate::error::GatewayError;
use crate::protocol::{CloseCode, CloseFrame, InboundFrame, OutboundFrame};
use crate::server::StreamGateway;
use axum::{
    extract::{
        ws::{CloseFrame as WsCloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long a requested close may take to reach the wire
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket gateway handler
///
/// `?sessionId=` (or `?session=`) joins an existing session.
pub async fn gateway_handler(
    State(gateway): State<StreamGateway>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    if gateway.registry().is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "gateway is shutting down").into_response();
    }

    let session_id = Session::from_query(&params);
    ws.on_upgrade(move |socket| handle_socket(gateway, socket, session_id))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(gateway: StreamGateway, mut socket: WebSocket, session_id: Option<String>) {
    let (transport, mut outbound) = Transport::channel(gateway.config().outbound_buffer);

    let connection = match gateway.accept(transport, session_id) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::debug!(error = %e, "Connection refused");
            let close = Message::Close(Some(ws_close_frame(CloseCode::GoingAway.frame())));
            let _ = socket.send(close).await;
            return;
        }
    };

    let connection_id = connection.connection_id().to_string();
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Writer: drain the transport until it is closed
    let connection_send = connection.clone();
    let send_task = tokio::spawn(async move {
        while let Some(item) = outbound.recv().await {
            let message = match item {
                Outbound::Frame(OutboundFrame::Text(text)) => Message::Text(text),
                Outbound::Frame(OutboundFrame::Ping) => Message::Ping(Vec::new()),
                Outbound::Close(frame) => Message::Close(Some(ws_close_frame(frame))),
            };
            let is_close = matches!(message, Message::Close(_));

            if ws_sink.send(message).await.is_err() {
                tracing::debug!(
                    connection_id = %connection_send.connection_id(),
                    "Failed to write to WebSocket"
                );
                break;
            }
            if is_close {
                break;
            }
        }

        let _ = ws_sink.close().await;
    });

    // Reader: classify frames until the peer goes away
    let gateway_recv = gateway.clone();
    let connection_recv = connection.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    gateway_recv.handle_frame(&connection_recv, InboundFrame::Text(text));
                }
                Ok(Message::Binary(bytes)) => {
                    gateway_recv.handle_frame(&connection_recv, InboundFrame::Binary(bytes));
                }
                Ok(Message::Pong(_)) => {
                    connection_recv.record_pong();
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by axum
                    tracing::trace!(connection_id = %connection_recv.connection_id(), "Ping received");
                }
                Ok(Message::Close(frame)) => {
                    return frame.map_or_else(
                        || CloseCode::NoStatus.frame(),
                        |f| CloseFrame::new(f.code, f.reason.into_owned()),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_recv.connection_id(),
                        error = %e,
                        "WebSocket error"
                    );
                    gateway_recv.report_error(&connection_recv, &GatewayError::Transport(e.to_string()));
                }
            }
        }
        CloseCode::Abnormal.frame()
    });

    let frame = supervise(&connection, send_task, recv_task, CLOSE_TIMEOUT).await;

    // No-op when eviction or close() already removed it
    gateway.disconnect(&connection_id, frame);
}

/// Wait for the socket tasks to end and decide the close frame
///
/// Whichever side finishes first wins. Once the gateway requests a close, the
/// writer gets `close_timeout` to put the close frame on the wire; after that
/// both tasks are aborted and the socket is dropped regardless.
async fn supervise(
    connection: &Connection,
    mut send_task: JoinHandle<()>,
    mut recv_task: JoinHandle<CloseFrame>,
    close_timeout: Duration,
) -> CloseFrame {
    let frame = tokio::select! {
        result = &mut recv_task => {
            result.unwrap_or_else(|_| CloseCode::Abnormal.frame())
        }
        _ = &mut send_task => {
            connection
                .close_frame()
                .unwrap_or_else(|| CloseCode::Abnormal.frame())
        }
        Some(frame) = connection.closed() => {
            if tokio::time::timeout(close_timeout, &mut send_task).await.is_err() {
                tracing::debug!(
                    connection_id = %connection.connection_id(),
                    "Close frame not written in time, dropping socket"
                );
            }
            frame
        }
    };

    recv_task.abort();
    send_task.abort();

    frame
}

fn ws_close_frame(frame: CloseFrame) -> WsCloseFrame<'static> {
    WsCloseFrame {
        code: frame.code,
        reason: Cow::Owned(frame.reason),
    }
}
