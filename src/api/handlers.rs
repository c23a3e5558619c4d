use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::HealthResponse;

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match tokio::fs::metadata(state.layout().root()).await {
        Ok(meta) if meta.is_dir() => {
            components.insert("storage".to_string(), "healthy".to_string());
        }
        Ok(_) => {
            components.insert("storage".to_string(), "unhealthy: not a directory".to_string());
            status = "unhealthy".to_string();
        }
        Err(err) => {
            components.insert("storage".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy".to_string();
        }
    }

    Json(HealthResponse {
        service: state.settings().api().project_name.clone(),
        version: state.settings().api().version.clone(),
        status,
        components,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
