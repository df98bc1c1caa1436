//! Broadcast trigger endpoint for producers outside the monitors

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::ApiError;
use crate::api::websocket::channel::Channel;
use crate::api::websocket::events::MarketEvent;
use crate::api::websocket::state::AppState;

/// Body for POST /api/broadcast
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    /// Target channel; defaults to the event's own channel, unknown names mean `all`
    #[serde(default)]
    pub channel: Option<String>,

    /// Event to send, tagged by `type`
    pub event: MarketEvent,
}

impl BroadcastRequest {
    pub fn target_channel(&self) -> Channel {
        match &self.channel {
            Some(name) => Channel::parse_or_all(name),
            None => self.event.default_channel(),
        }
    }
}

/// POST /api/broadcast - Fan an event out to connected clients
///
/// Returns 202 with the broadcast report. Per-connection control events
/// (`connection`, `pong`) cannot be broadcast.
pub async fn broadcast_event(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BroadcastRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if matches!(
        request.event,
        MarketEvent::Connection { .. } | MarketEvent::Pong
    ) {
        return Err(ApiError::bad_request(format!(
            "'{}' events are per-connection and cannot be broadcast",
            request.event.event_type()
        )));
    }

    let channel = request.target_channel();
    let report = state.manager.broadcast(request.event, channel).await;
    tracing::info!(
        event_type = report.event_type,
        %channel,
        delivered = report.delivered,
        "Producer broadcast"
    );

    Ok((StatusCode::ACCEPTED, Json(report)))
}
