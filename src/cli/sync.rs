use tabled::Table;

use crate::{
    error,
    management::{CursorManager, LibraryManager},
    spotify, success,
    types::PlaylistTableRow,
};

use super::context;

/// Caches the user's saved tracks and playlists and registers the user's
/// cursor row.
pub async fn sync() {
    let tokens = context::token_manager().await;
    let user_id = context::user_id(&tokens).await;
    let token = tokens.lock().await.get_valid_token().await;

    let pb = context::spinner("Fetching saved tracks...");
    let result = spotify::library::fetch_library(&token, |name| {
        pb.set_message(format!("Fetching playlist {}...", name))
    })
    .await;
    pb.finish_and_clear();

    let library = match result {
        Ok(library) => library,
        Err(e) => error!("Cannot sync library. Err: {}", e),
    };

    if let Err(e) = LibraryManager::default_location()
        .persist(&user_id, &library)
        .await
    {
        error!("Failed to persist library. Err: {}", e);
    }

    match CursorManager::load().await {
        Ok(cursors) => {
            if let Err(e) = cursors.register(&user_id).await {
                error!("Failed to register {}. Err: {}", user_id, e);
            }
        }
        Err(e) => error!("Cannot load cursors. Err: {}", e),
    }

    let rows: Vec<PlaylistTableRow> = library
        .playlists
        .iter()
        .map(|(id, playlist)| PlaylistTableRow {
            id: id.clone(),
            name: playlist.name.clone(),
            tracks: playlist.tracks.len(),
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }

    success!(
        "Synced {} saved tracks and {} playlists for {}",
        library.saved_tracks.len(),
        library.playlists.len(),
        user_id
    );
}
