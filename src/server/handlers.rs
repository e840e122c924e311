use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::ui::{meeting_page, pairing_full_page};
use super::AppState;
use crate::session::{Description, Error, Fetch, PublishRequest, Role};

/// Body returned while the counterpart has not published
pub const NOT_AVAILABLE_BODY: &str = "no offer yet";

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::PairingFull | Error::RoleNotClaimed(_) | Error::StalePairing { .. } => {
            StatusCode::CONFLICT
        }
        Error::UnknownRole(_) | Error::MalformedDescription(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub async fn serve_root(State(state): State<AppState>) -> impl IntoResponse {
    Redirect::temporary(&state.page.meeting_path)
}

/// GET <meeting path>: claim a role and serve the page for it
pub async fn arrive(State(state): State<AppState>) -> Response {
    match state.coordinator.arrive() {
        Ok(arrival) => meeting_page(&arrival, &state.page).into_response(),
        Err(Error::PairingFull) => (StatusCode::CONFLICT, pairing_full_page()).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pairing: Option<u64>,
}

/// GET <meeting path>/:role[?pairing=N]: the description published by the other role
pub async fn fetch_other(
    State(state): State<AppState>,
    Path(role): Path<String>,
    Query(params): Query<FetchParams>,
) -> Response {
    let result = Role::from_segment(&role).and_then(|role| {
        let role_id = i64::from(role.id());
        match params.pairing {
            Some(pairing) => state.coordinator.fetch_other_in(pairing, role_id),
            None => state.coordinator.fetch_other(role_id),
        }
    });

    match result {
        Ok(Fetch::Available(description)) => Json(description).into_response(),
        Ok(Fetch::NotAvailable) => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            NOT_AVAILABLE_BODY,
        )
            .into_response(),
        Err(e) => {
            warn!("Fetch rejected: {}", e);
            e.into_response()
        }
    }
}

/// POST <meeting path>: `{"id": <role>, "offer": <description>, "pairing": <n>}`
pub async fn publish(State(state): State<AppState>, body: Bytes) -> Response {
    let result = PublishRequest::parse(&body).and_then(|request| {
        let description = Description::new(request.offer)?;
        match request.pairing {
            Some(pairing) => state.coordinator.publish_in(pairing, request.id, description),
            None => state.coordinator.publish(request.id, description),
        }
    });

    match result {
        Ok(role) => Json(json!({
            "success": true,
            "role": role.id(),
        }))
        .into_response(),
        Err(e) => {
            warn!("Publish rejected: {}", e);
            e.into_response()
        }
    }
}

pub async fn reset_pairing(State(state): State<AppState>) -> impl IntoResponse {
    let pairing = state.coordinator.reset();
    Json(json!({
        "success": true,
        "pairing": pairing,
    }))
}

pub async fn pairing_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.status())
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    debug!("{} => 404 Not Found", uri);
    (StatusCode::NOT_FOUND, "Not found")
}
