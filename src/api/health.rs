use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::{playback::JobState, server::AppState};

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let active = state
        .scheduler
        .jobs()
        .await
        .into_iter()
        .filter(|(_, job)| matches!(job, JobState::Armed | JobState::Running))
        .count();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": active
    }))
}
