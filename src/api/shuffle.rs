use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::ShuffleError,
    info,
    playback::{start_shuffle, stop_shuffle},
    server::AppState,
    types::{ShuffleChoice, ShuffleSummary},
};

#[derive(Debug, Deserialize)]
pub struct ShuffleRequest {
    pub user_id: String,
    /// `1|liked`, `2|playlist` or `3|random`, as string or number.
    pub shuffle_choice: Value,
    pub playlist_id: Option<String>,
    /// Caller's access token; the stored login is used when absent.
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub message: String,
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub state: String,
    pub cursor: usize,
    pub num_tracks: usize,
    pub device_id: Option<String>,
}

fn parse_choice(raw: &Value) -> Result<ShuffleChoice, ShuffleError> {
    match raw {
        Value::String(s) => s.parse(),
        Value::Number(n) => n.to_string().parse(),
        other => Err(ShuffleError::InvalidChoice(other.to_string())),
    }
}

pub async fn shuffle(
    State(state): State<AppState>,
    Json(request): Json<ShuffleRequest>,
) -> Result<Json<ShuffleSummary>, ShuffleError> {
    let choice = parse_choice(&request.shuffle_choice)?;
    let library = state.library.load(&request.user_id).await?;
    let bundles = state.bundles.for_user(&request.user_id).await;
    let player = state.player_for(request.token);

    let summary = start_shuffle(
        &state.scheduler,
        player,
        &request.user_id,
        choice,
        request.playlist_id.as_deref(),
        &library,
        &bundles,
    )
    .await?;

    info!(
        "{} for {} ({} tracks)",
        summary.message, request.user_id, summary.num_tracks
    );
    Ok(Json(summary))
}

pub async fn stop(
    State(state): State<AppState>,
    Json(request): Json<UserRequest>,
) -> Result<Json<StopResponse>, ShuffleError> {
    let stopped = stop_shuffle(&state.scheduler, &request.user_id).await?;
    let message = if stopped {
        format!("stopped shuffling for {}", request.user_id)
    } else {
        format!("no shuffle running for {}", request.user_id)
    };
    Ok(Json(StopResponse { message, stopped }))
}

pub async fn session(
    State(state): State<AppState>,
    Query(request): Query<UserRequest>,
) -> Result<Json<SessionResponse>, ShuffleError> {
    let cursors = state.scheduler.cursors();
    if !cursors.is_registered(&request.user_id).await {
        return Err(ShuffleError::NotFound(format!("user {}", request.user_id)));
    }

    let job = state.scheduler.job_state(&request.user_id).await;
    let session = state.scheduler.session(&request.user_id).await;
    Ok(Json(SessionResponse {
        state: job.to_string(),
        cursor: cursors.get(&request.user_id).await,
        num_tracks: session.as_ref().map_or(0, |s| s.queue.len()),
        device_id: session.map(|s| s.device_id),
        user_id: request.user_id,
    }))
}
