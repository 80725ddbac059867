use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::ShuffleError,
    playback::run_bundle_check,
    server::AppState,
    spotify,
    types::{Bundle, NewBundle},
};

#[derive(Debug, Deserialize)]
pub struct BundleQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BundleUpdate {
    pub strict: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BundleCheckRequest {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BundleCheckResponse {
    pub message: String,
}

pub async fn list_bundles(
    State(state): State<AppState>,
    Query(query): Query<BundleQuery>,
) -> Json<Vec<Bundle>> {
    Json(state.bundles.for_user(&query.user_id).await)
}

pub async fn create_bundle(
    State(state): State<AppState>,
    Json(new): Json<NewBundle>,
) -> Result<(StatusCode, Json<Bundle>), ShuffleError> {
    let bundle = state.bundles.create(new).await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}

pub async fn update_bundle(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<BundleUpdate>,
) -> Result<Json<Bundle>, ShuffleError> {
    Ok(Json(state.bundles.set_strict(id, update.strict).await?))
}

pub async fn delete_bundle(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Bundle>, ShuffleError> {
    Ok(Json(state.bundles.delete(id).await?))
}

/// Checks the now-playing track against the user's bundles once.
///
/// Without `user_id` the bundles of the token's owner are used: the caller's
/// token is resolved through `GET /me`, the stored login by its recorded user.
pub async fn bundle_check(
    State(state): State<AppState>,
    Json(request): Json<BundleCheckRequest>,
) -> Result<Json<BundleCheckResponse>, ShuffleError> {
    let user_id = match (request.user_id, request.token.as_deref()) {
        (Some(user_id), _) => user_id,
        (None, Some(token)) => spotify::auth::get_current_user(token).await?.id,
        (None, None) => state
            .tokens
            .lock()
            .await
            .user_id()
            .map(str::to_string)
            .ok_or_else(|| ShuffleError::NotFound("user of the stored login".to_string()))?,
    };

    let bundles = state.bundles.for_user(&user_id).await;
    let player = state.player_for(request.token);
    let check = run_bundle_check(
        player.as_ref(),
        &bundles,
        state.scheduler.config().call_timeout,
    )
    .await?;

    Ok(Json(BundleCheckResponse {
        message: check.message(),
    }))
}
