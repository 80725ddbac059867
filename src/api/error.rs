use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::errors::ShuffleError;

/// HTTP status reported for a failed request.
pub fn status_for(error: &ShuffleError) -> StatusCode {
    match error {
        ShuffleError::NotFound(_) => StatusCode::NOT_FOUND,
        ShuffleError::NoDevices
        | ShuffleError::InvalidChoice(_)
        | ShuffleError::EmptySource(_)
        | ShuffleError::InvalidTrackId(_) => StatusCode::BAD_REQUEST,
        ShuffleError::DuplicateBundle => StatusCode::CONFLICT,
        ShuffleError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ShuffleError::RemoteService { .. } | ShuffleError::Timeout => StatusCode::BAD_GATEWAY,
        ShuffleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ShuffleError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
