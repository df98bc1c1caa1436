//! Registry statistics endpoint

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::api::websocket::registry::RegistryStats;
use crate::api::websocket::state::AppState;

/// GET /api/stats - Connection counts per channel
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<RegistryStats> {
    Json(state.manager.stats())
}
