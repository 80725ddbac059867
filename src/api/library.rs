use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::ShuffleError,
    info,
    server::AppState,
    spotify,
    types::TrackId,
};

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    pub user_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub num_tracks: usize,
}

#[derive(Debug, Serialize)]
pub struct SavedSongs {
    pub num_saved_songs: usize,
    pub tracks: Vec<TrackId>,
}

#[derive(Debug, Serialize)]
pub struct CacheResponse {
    pub message: String,
}

pub async fn playlists(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> Result<Json<Vec<PlaylistSummary>>, ShuffleError> {
    let library = state.library.load(&query.user_id).await?;
    Ok(Json(
        library
            .playlists
            .into_iter()
            .map(|(id, playlist)| PlaylistSummary {
                id,
                name: playlist.name,
                num_tracks: playlist.tracks.len(),
            })
            .collect(),
    ))
}

pub async fn saved_songs(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> Result<Json<SavedSongs>, ShuffleError> {
    let library = state.library.load(&query.user_id).await?;
    Ok(Json(SavedSongs {
        num_saved_songs: library.saved_tracks.len(),
        tracks: library.saved_tracks,
    }))
}

/// Re-fetches the user's library from Spotify and registers the user's
/// cursor row.
pub async fn refresh_cache(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<CacheResponse>, ShuffleError> {
    let token = match request.token {
        Some(token) => token,
        None => state.tokens.lock().await.get_valid_token().await,
    };
    let user_id = match request.user_id {
        Some(user_id) => user_id,
        None => spotify::auth::get_current_user(&token).await?.id,
    };

    let library = spotify::library::fetch_library(&token, |_| {}).await?;
    state.library.persist(&user_id, &library).await?;
    state.scheduler.cursors().register(&user_id).await?;

    let message = format!(
        "cached {} saved songs and {} playlists for {}",
        library.saved_tracks.len(),
        library.playlists.len(),
        user_id
    );
    info!("{}", message);
    Ok(Json(CacheResponse { message }))
}

pub async fn clear_cache(
    State(state): State<AppState>,
    Json(request): Json<LibraryQuery>,
) -> Result<Json<CacheResponse>, ShuffleError> {
    let message = if state.library.clear(&request.user_id).await? {
        format!("cleared library cache of {}", request.user_id)
    } else {
        format!("no library cache for {}", request.user_id)
    };
    Ok(Json(CacheResponse { message }))
}
