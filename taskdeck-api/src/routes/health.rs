/// Health check endpoint
///
/// Liveness only: answers 200 without touching the store, so the endpoint
/// stays up while the database is down. Store reachability is verified once
/// at startup by the pool's health check.
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// Response:
/// ```json
/// { "message": "OK" }
/// ```

use axum::Json;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "OK" when the process answers at all
    pub message: String,
}

/// Health check handler
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "OK".to_string(),
    })
}
