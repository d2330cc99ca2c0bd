//! HTTP route handlers

pub mod admin;
pub mod content;
pub mod feed_ws;
pub mod health;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::schemas::Role;
use crate::moderation::Actor;
use crate::types::CarrelError;

pub(crate) type FullBody = Full<Bytes>;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_steps: Vec<String>,
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub(crate) fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
            failed_steps: Vec::new(),
        },
    )
}

/// Map a service failure onto the wire. Partial failures keep 500 but list
/// which downstream steps were lost, so the operator knows the primary
/// state change stands.
pub(crate) fn failure_response(err: &CarrelError) -> Response<FullBody> {
    let (status, code) = match err {
        CarrelError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CarrelError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CarrelError::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        CarrelError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
        CarrelError::PartialFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "PARTIAL_FAILURE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    };
    let failed_steps = match err {
        CarrelError::PartialFailure { failed, .. } => {
            failed.iter().map(|f| f.step.to_string()).collect()
        }
        _ => Vec::new(),
    };
    json_response(
        status,
        &ErrorResponse {
            error: err.to_string(),
            code: Some(code.to_string()),
            failed_steps,
        },
    )
}

pub(crate) fn not_found_response(path: &str) -> Response<FullBody> {
    error_response(
        StatusCode::NOT_FOUND,
        &format!("No route for {}", path),
        Some("NO_ROUTE"),
    )
}

pub(crate) fn preflight_response() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header(
            "Access-Control-Allow-Headers",
            "content-type, x-actor-id, x-actor-name, x-actor-role",
        )
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Read the acting identity from the `x-actor-*` headers the fronting
/// proxy injects after authentication. An unknown role downgrades to
/// visitor so a bad header can never grant anything.
pub(crate) fn actor_from_headers(
    req: &Request<Incoming>,
) -> std::result::Result<Actor, Response<FullBody>> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    };

    let id = match header("x-actor-id") {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Missing x-actor-id header",
                Some("NO_ACTOR"),
            ))
        }
    };
    let name = header("x-actor-name").unwrap_or_default();
    let role = header("x-actor-role")
        .and_then(|role| role.parse::<Role>().ok())
        .unwrap_or(Role::Visitor);
    Ok(Actor::new(id, name, role))
}

pub(crate) async fn read_json_body<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> std::result::Result<T, Response<FullBody>> {
    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {}", e),
                Some("BAD_BODY"),
            ))
        }
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid JSON body: {}", e),
            Some("BAD_JSON"),
        )
    })
}
