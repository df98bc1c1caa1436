//! WebSocket connection handler
//!
//! Each connection moves through `Connecting -> Open -> Closing -> Closed`.
//! A writer task drains the connection's outbound queue and sends heartbeat
//! pings; the reader loop answers `ping` text messages and ignores everything
//! else. The connection starts closing when the client closes, the socket
//! errors, the peer goes quiet, or the manager evicts it. Closing waits at most
//! [`CLOSE_TIMEOUT`] for the close handshake before the socket is dropped.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::events::{ClientMessage, MarketEvent};
use super::manager::{ConnectionHandle, ConnectionManager};
use super::state::AppState;

/// Upper bound on the close handshake before the socket is dropped
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Heartbeat intervals without any inbound frame before a peer counts as gone
const IDLE_HEARTBEATS: u32 = 2;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Channel to subscribe to (default: all)
    pub channel: Option<String>,
}

/// Lifecycle of one WebSocket connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Next state in the lifecycle; `Closed` is terminal
    pub fn next(self) -> Self {
        match self {
            ConnectionState::Connecting => ConnectionState::Open,
            ConnectionState::Open => ConnectionState::Closing,
            ConnectionState::Closing | ConnectionState::Closed => ConnectionState::Closed,
        }
    }
}

/// Why the reader stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseCause {
    /// Client sent a close frame or the stream ended
    ClientClosed,
    /// Receive error on the socket
    Error,
    /// No inbound frame, not even a heartbeat pong, for too long
    Idle,
    /// Writer stopped: the connection was evicted or the peer stopped accepting
    WriterStopped,
}

impl CloseCause {
    /// Whether the server started the close and must wait for the peer's reply
    pub fn awaits_close_reply(self) -> bool {
        matches!(self, CloseCause::Idle | CloseCause::WriterStopped)
    }
}

/// GET /ws?channel=... - WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let channel = params.channel.unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, state, channel))
}

/// GET /ws/:channel - WebSocket upgrade handler with the channel in the path
pub async fn ws_channel_handler(
    ws: WebSocketUpgrade,
    Path(channel): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, channel))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, channel: String) {
    let (sink, mut stream) = socket.split();

    // Cancelled when the writer exits for any reason
    let writer_done = CancellationToken::new();
    let (tx, rx) = mpsc::channel(state.send_buffer);
    let mut writer = tokio::spawn(write_loop(
        sink,
        rx,
        state.heartbeat_interval,
        writer_done.clone(),
    ));

    let handle = state.manager.connect_named(tx, &channel).await;
    let mut lifecycle = advance(&handle, ConnectionState::Connecting);

    let idle_timeout = state.heartbeat_interval * IDLE_HEARTBEATS;
    let cause = read_loop(&mut stream, &state.manager, &handle, &writer_done, idle_timeout).await;
    lifecycle = advance(&handle, lifecycle);
    tracing::debug!(connection = handle.id(), ?cause, "WebSocket closing");

    // Dropping the sender lets the writer flush its queue and send a close frame
    state.manager.disconnect(&handle);

    if tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    if cause.awaits_close_reply() {
        await_close_reply(&mut stream, CLOSE_TIMEOUT).await;
    }

    drop(stream);
    advance(&handle, lifecycle);
}

fn advance(handle: &ConnectionHandle, from: ConnectionState) -> ConnectionState {
    let to = from.next();
    tracing::trace!(connection = handle.id(), ?from, ?to, "Connection state change");
    to
}

/// Receive until the client closes, the socket errors, the peer idles out,
/// or the writer stops
async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    manager: &ConnectionManager,
    handle: &ConnectionHandle,
    writer_done: &CancellationToken,
    idle_timeout: Duration,
) -> CloseCause {
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        let result = tokio::select! {
            biased;
            _ = writer_done.cancelled() => return CloseCause::WriterStopped,
            _ = &mut idle => return CloseCause::Idle,
            next = stream.next() => match next {
                Some(result) => result,
                None => return CloseCause::ClientClosed,
            },
        };

        idle.as_mut().reset(Instant::now() + idle_timeout);

        match result {
            Ok(Message::Text(text)) => {
                if ClientMessage::from_text(&text) == ClientMessage::Ping {
                    manager.send_to(handle, MarketEvent::Pong).await;
                }
            }
            Ok(Message::Close(_)) => return CloseCause::ClientClosed,
            // Binary and pong frames are ignored; ping frames are answered by axum
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection = handle.id(), error = %e, "WebSocket receive error");
                return CloseCause::Error;
            }
        }
    }
}

/// Wait for the peer to answer our close frame, giving up after `limit`
async fn await_close_reply(stream: &mut SplitStream<WebSocket>, limit: Duration) {
    let reply = tokio::time::timeout(limit, async {
        while let Some(Ok(message)) = stream.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    })
    .await;

    if reply.is_err() {
        tracing::debug!("Peer did not complete the close handshake, dropping socket");
    }
}

/// Forward queued events to the socket and keep the connection alive
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    heartbeat: Duration,
    done: CancellationToken,
) {
    // Signals the reader even if this task is aborted
    let _done = done.drop_guard();

    let mut ticker = interval(heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            queued = rx.recv() => match queued {
                Some(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break; // Client disconnected
                    }
                }
                None => {
                    // Evicted or shutting down
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}
