use tabled::Table;

use crate::{
    config, error, info,
    management::{CursorManager, SessionManager},
    playback::bounded,
    spotify::player::{PlayerGateway, SpotifyPlayer, TokenSource},
    types::SessionTableRow,
    warning,
};

use super::context;

/// Shows what is playing and the persisted shuffle sessions.
pub async fn status() {
    let tokens = context::token_manager().await;
    let player = SpotifyPlayer::new(TokenSource::Managed(tokens));

    match bounded(config::call_timeout(), player.currently_playing()).await {
        Ok(Some(track)) => info!("Now playing: {} - {}", track.artists.join(", "), track.name),
        Ok(None) => info!("Nothing playing."),
        Err(e) => warning!("Cannot read the player state: {}", e),
    }

    let sessions = match SessionManager::load().await {
        Ok(sessions) => sessions.all().await,
        Err(e) => error!("Cannot load sessions. Err: {}", e),
    };
    let cursors = match CursorManager::load().await {
        Ok(cursors) => cursors,
        Err(e) => error!("Cannot load cursors. Err: {}", e),
    };

    let mut rows = Vec::new();
    for session in sessions {
        let cursor = cursors.get(&session.user_id).await;
        let state = if cursor >= session.queue.len() {
            "exhausted"
        } else {
            "pending"
        };
        rows.push(SessionTableRow {
            user: session.user_id,
            state: state.to_string(),
            cursor,
            tracks: session.queue.len(),
        });
    }

    if rows.is_empty() {
        info!("No shuffle sessions.");
        return;
    }
    println!("{}", Table::new(rows));
}
