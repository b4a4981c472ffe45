use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use eventhook_api::{ApiError, RemoteEventProperties, RemoteEventResult};
use serde::Serialize;
use serde_json::json;

use crate::dispatcher::InboundEvent;
use crate::endpoint::source_endpoint;
use crate::result::build_result;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Eventhook Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

/// `ProcessEvent`: dispatch the event and answer with a result envelope.
///
/// Only a body that cannot be read as event properties is refused at the
/// HTTP level; every dispatched event gets a result, failures included.
pub async fn process_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    payload: Result<Json<RemoteEventProperties>, JsonRejection>,
) -> Result<Json<RemoteEventResult>, ApiError> {
    let Json(properties) = payload.map_err(reject_payload)?;
    let endpoint = source_endpoint(&headers, &uri, &state.scheme);
    let event = InboundEvent::from_properties(properties, endpoint);
    let outcome = state.dispatcher.handle(&event).await;
    Ok(Json(build_result(outcome)))
}

fn reject_payload(rejection: JsonRejection) -> ApiError {
    tracing::warn!(status = %rejection.status(), error = %rejection.body_text(), "Rejecting event payload");
    match rejection {
        JsonRejection::MissingJsonContentType(e) => ApiError::unsupported_media_type(e.body_text()),
        other => ApiError::bad_request(other.body_text()),
    }
}

/// `ProcessOneWayEvent`: no event is delivered one-way to this endpoint.
pub async fn process_one_way_event() -> ApiError {
    tracing::error!("One-way event delivery is not implemented");
    ApiError::not_implemented("ProcessOneWayEvent is not implemented")
}
