//! HTTP interface for the occupancy state service.
//!
//! Exposes:
//! - `GET /data` -- fresh occupancy map after sensor read-through
//! - `POST /update` -- merge caller-supplied slot values

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde_json::{Value, json};

use crate::{
    error::{ParkError, Result},
    slots::OccupancyMap,
    state_service::StateService,
};

impl IntoResponse for ParkError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "status": "error",
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Builds the router serving the state service.
pub fn build_router(service: Arc<StateService>) -> Router {
    Router::new()
        .route("/data", get(get_data))
        .route("/update", post(post_update))
        .with_state(service)
}

async fn get_data(State(service): State<Arc<StateService>>) -> Result<Json<OccupancyMap>> {
    let snapshot = service.fetch_state().await?;
    Ok(Json(snapshot))
}

async fn post_update(
    State(service): State<Arc<StateService>>,
    body: Bytes,
) -> Result<Json<Value>> {
    let payload = parse_update_body(&body).inspect_err(|e| warn!("Rejected update: {e}"))?;
    let applied = service
        .apply_update(&payload)
        .await
        .inspect_err(|e| warn!("Rejected update: {e}"))?;

    info!("Applied update: {applied:?}");
    Ok(Json(json!({
        "status": "success",
        "updated": applied,
    })))
}

fn parse_update_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ParkError::MalformedInput(
            "No JSON data received".to_string(),
        ));
    }
    serde_json::from_slice(body).map_err(|e| ParkError::MalformedInput(format!("Invalid JSON: {e}")))
}
