use std::time::Duration;

use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    config,
    errors::ShuffleError,
    types::{
        CachedPlaylist, Paging, PlaylistTrackItem, SavedTrackItem, SimplePlaylist, TrackId,
        UserLibrary,
    },
    warning,
};

const PAGE_LIMIT: u32 = 50;

/// Retrieves all tracks saved in the user's library ("Liked Songs").
///
/// Pages through `GET /me/tracks` 50 items at a time, following the `next`
/// link until the listing is exhausted. Local files, episodes and items
/// without an id are skipped.
///
/// # Arguments
///
/// * `token` - Valid access token for Spotify API authentication
///
/// # Retry Logic
///
/// See [`get_page`]: 502 responses are retried after 10 seconds and 429
/// responses after the advertised `Retry-After` delay (up to 120 seconds).
pub async fn get_saved_tracks(token: &str) -> Result<Vec<TrackId>, ShuffleError> {
    let first = format!(
        "{uri}/me/tracks?limit={limit}",
        uri = &config::spotify_apiurl(),
        limit = PAGE_LIMIT
    );

    let items: Vec<SavedTrackItem> = get_all_pages(token, first).await?;
    Ok(items
        .iter()
        .filter_map(|item| item.track.as_ref())
        .filter_map(|track| track.track_id())
        .collect())
}

/// Retrieves the playlists owned or followed by the user.
pub async fn get_playlists(token: &str) -> Result<Vec<SimplePlaylist>, ShuffleError> {
    let first = format!(
        "{uri}/me/playlists?limit={limit}",
        uri = &config::spotify_apiurl(),
        limit = PAGE_LIMIT
    );

    get_all_pages(token, first).await
}

/// Retrieves the track ids of one playlist, skipping episodes and local files.
pub async fn get_playlist_tracks(
    token: &str,
    playlist_id: &str,
) -> Result<Vec<TrackId>, ShuffleError> {
    let first = format!(
        "{uri}/playlists/{id}/tracks?limit={limit}",
        uri = &config::spotify_apiurl(),
        id = playlist_id,
        limit = PAGE_LIMIT
    );

    let items: Vec<PlaylistTrackItem> = get_all_pages(token, first).await?;
    Ok(items
        .iter()
        .filter_map(|item| item.track.as_ref())
        .filter_map(|track| track.track_id())
        .collect())
}

/// Fetches everything a shuffle can draw from: saved tracks and the tracks
/// of every playlist. A track listed several times in a playlist stays in
/// it that many times.
///
/// `on_playlist` is called with each playlist name before its tracks are
/// fetched, for progress output.
pub async fn fetch_library(
    token: &str,
    mut on_playlist: impl FnMut(&str),
) -> Result<UserLibrary, ShuffleError> {
    let saved_tracks = get_saved_tracks(token).await?;

    let mut library = UserLibrary {
        saved_tracks,
        ..Default::default()
    };

    for playlist in get_playlists(token).await? {
        on_playlist(&playlist.name);
        let tracks = get_playlist_tracks(token, &playlist.id).await?;
        library.playlists.insert(
            playlist.id,
            CachedPlaylist {
                name: playlist.name,
                tracks,
            },
        );
    }

    Ok(library)
}

async fn get_all_pages<T: DeserializeOwned>(
    token: &str,
    first: String,
) -> Result<Vec<T>, ShuffleError> {
    let client = Client::new();
    let mut items = Vec::new();
    let mut next = Some(first);

    while let Some(url) = next {
        let page: Paging<T> = get_page(&client, token, &url).await?;
        items.extend(page.items);
        next = page.next;
    }

    Ok(items)
}

/// Fetches and decodes one listing page.
///
/// 502 Bad Gateway responses are retried after 10 seconds. 429 responses
/// are retried after the `Retry-After` delay when it is at most 120 seconds;
/// longer delays are reported and surface as [`ShuffleError::RateLimited`].
async fn get_page<T: DeserializeOwned>(
    client: &Client,
    token: &str,
    url: &str,
) -> Result<T, ShuffleError> {
    loop {
        let response = client.get(url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::BAD_GATEWAY => {
                sleep(Duration::from_secs(10)).await;
                continue; // retry
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                match retry_after {
                    Some(secs) if secs <= 120 => {
                        sleep(Duration::from_secs(secs)).await;
                        continue;
                    }
                    _ => {
                        warning!(
                            "Retry after has reached an abnormal high of {:?} seconds. Try again later.",
                            retry_after
                        );
                        return Err(ShuffleError::RateLimited { retry_after });
                    }
                }
            }
            status if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(ShuffleError::remote(status.as_u16(), message));
            }
            _ => return Ok(response.json::<T>().await?),
        }
    }
}
