//! Health and version endpoints

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, FullBody};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    healthy: bool,
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    mode: &'static str,
    node_id: String,
    store_backend: &'static str,
    timestamp: String,
}

pub fn health_check(state: &AppState) -> Response<FullBody> {
    let response = HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        store_backend: state.store.backend(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    json_response(StatusCode::OK, &response)
}

pub fn version_info() -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}
