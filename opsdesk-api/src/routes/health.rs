/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "connections": { "active": 1, "idle": 4 }
/// }
/// ```
///
/// Always answers 200; a failing database shows up as `"degraded"`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use opsdesk_shared::db::pool;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,

    pub connections: ConnectionStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub active: u32,
    pub idle: u32,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    let stats = pool::pool_stats(&state.db);

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: opsdesk_shared::VERSION.to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        connections: ConnectionStats {
            active: stats.active_connections,
            idle: stats.idle_connections,
        },
    }))
}
