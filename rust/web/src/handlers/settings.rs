use crate::settings::{SettingsError, SettingsStore, UnresponsivePolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub decision_timeout_secs: Option<u64>,
    pub max_players: Option<usize>,
    pub ai_kind: Option<String>,
    pub room_code_length: Option<usize>,
    pub unresponsive_policy: Option<UnresponsivePolicy>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub field: String,
    pub value: serde_json::Value,
}

/// Get current settings
pub async fn get_settings(store: Arc<SettingsStore>) -> Response {
    match store.get() {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => settings_error(err),
    }
}

/// Update settings. Only new rooms see the change.
pub async fn update_settings(
    store: Arc<SettingsStore>,
    request: UpdateSettingsRequest,
) -> Response {
    let mut current = match store.get() {
        Ok(s) => s,
        Err(err) => return settings_error(err),
    };

    if let Some(timeout) = request.decision_timeout_secs {
        current.decision_timeout_secs = timeout;
    }
    if let Some(max_players) = request.max_players {
        current.max_players = max_players;
    }
    if let Some(kind) = request.ai_kind {
        current.ai_kind = kind;
    }
    if let Some(length) = request.room_code_length {
        current.room_code_length = length;
    }
    if let Some(policy) = request.unresponsive_policy {
        current.unresponsive_policy = policy;
    }

    match store.update(current) {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => settings_error(err),
    }
}

/// Update a single field
pub async fn update_field(store: Arc<SettingsStore>, request: UpdateFieldRequest) -> Response {
    match store.update_field(&request.field, request.value) {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => settings_error(err),
    }
}

/// Reset settings to defaults
pub async fn reset_settings(store: Arc<SettingsStore>) -> Response {
    match store.reset() {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => settings_error(err),
    }
}

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn settings_error(err: SettingsError) -> Response {
    use crate::errors::IntoErrorResponse;
    err.into_http_response()
}
