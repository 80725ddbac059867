use std::sync::Arc;

use rand::{
    Rng,
    seq::{IndexedRandom, SliceRandom},
};

use crate::{
    errors::ShuffleError,
    playback::{apply_bundles, bounded, scheduler::QueueScheduler},
    spotify::player::PlayerGateway,
    types::{
        Bundle, Device, QueueSession, ShuffleChoice, ShuffleQueue, ShuffleSummary, TrackId,
        UserLibrary,
    },
};

/// A named list of tracks to shuffle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleSource {
    pub name: String,
    pub tracks: Vec<TrackId>,
}

/// Picks the tracks a session plays from the user's cached library.
///
/// `Playlist` needs a `playlist_id` owned by the user; `Random` picks one of
/// the user's playlists uniformly.
pub fn resolve_source<R: Rng + ?Sized>(
    choice: ShuffleChoice,
    playlist_id: Option<&str>,
    library: &UserLibrary,
    rng: &mut R,
) -> Result<ShuffleSource, ShuffleError> {
    match choice {
        ShuffleChoice::Liked => Ok(ShuffleSource {
            name: "liked songs".to_string(),
            tracks: library.saved_tracks.clone(),
        }),
        ShuffleChoice::Playlist => {
            let id = playlist_id.ok_or_else(|| ShuffleError::NotFound("playlist_id".to_string()))?;
            let playlist = library
                .playlists
                .get(id)
                .ok_or_else(|| ShuffleError::NotFound(format!("playlist {}", id)))?;
            Ok(ShuffleSource {
                name: playlist.name.clone(),
                tracks: playlist.tracks.clone(),
            })
        }
        ShuffleChoice::Random => {
            let ids: Vec<&String> = library.playlists.keys().collect();
            let id = ids
                .choose(rng)
                .ok_or_else(|| ShuffleError::NotFound("playlists".to_string()))?;
            let playlist = &library.playlists[id.as_str()];
            Ok(ShuffleSource {
                name: playlist.name.clone(),
                tracks: playlist.tracks.clone(),
            })
        }
    }
}

/// Uniform in-place shuffle (Fisher-Yates).
pub fn shuffle_tracks<R: Rng + ?Sized>(tracks: &mut [TrackId], rng: &mut R) {
    tracks.shuffle(rng);
}

/// Shuffles `source` and runs the bundle reorder pass over it.
pub fn build_queue<R: Rng + ?Sized>(
    source: ShuffleSource,
    bundles: &[Bundle],
    rng: &mut R,
) -> Result<ShuffleQueue, ShuffleError> {
    let ShuffleSource { name, mut tracks } = source;
    if tracks.is_empty() {
        return Err(ShuffleError::EmptySource(name));
    }

    shuffle_tracks(&mut tracks, rng);
    ShuffleQueue::new(apply_bundles(&tracks, bundles))
}

/// Chooses the playback target: the active device if there is one,
/// otherwise the first listed. Restricted devices and devices without an
/// id cannot be controlled and are skipped.
pub fn pick_device(devices: &[Device]) -> Result<String, ShuffleError> {
    let usable = || devices.iter().filter(|d| !d.is_restricted && d.id.is_some());

    usable()
        .find(|d| d.is_active)
        .or_else(|| usable().next())
        .and_then(|d| d.id.clone())
        .ok_or(ShuffleError::NoDevices)
}

fn prepare(
    choice: ShuffleChoice,
    playlist_id: Option<&str>,
    library: &UserLibrary,
    bundles: &[Bundle],
) -> Result<(String, ShuffleQueue), ShuffleError> {
    let mut rng = rand::rng();
    let source = resolve_source(choice, playlist_id, library, &mut rng)?;
    let name = source.name.clone();
    let queue = build_queue(source, bundles, &mut rng)?;
    Ok((name, queue))
}

/// Starts a shuffle session for `user_id`.
///
/// Resolves and shuffles the source, reorders it by the user's bundles,
/// picks a device and hands the session to [`QueueScheduler::launch`],
/// which replaces any running session of the user, starts playback with
/// the first track and arms the refill job on the rest (cursor 1). Nothing
/// is armed when any step before arming fails.
pub async fn start_shuffle<G: PlayerGateway + 'static>(
    scheduler: &QueueScheduler,
    gateway: Arc<G>,
    user_id: &str,
    choice: ShuffleChoice,
    playlist_id: Option<&str>,
    library: &UserLibrary,
    bundles: &[Bundle],
) -> Result<ShuffleSummary, ShuffleError> {
    if !scheduler.cursors().is_registered(user_id).await {
        return Err(ShuffleError::NotFound(format!("user {}", user_id)));
    }

    let (name, queue) = prepare(choice, playlist_id, library, bundles)?;

    let timeout = scheduler.config().call_timeout;
    let devices = bounded(timeout, gateway.devices()).await?;
    let device_id = pick_device(&devices)?;

    let num_tracks = queue.len();
    scheduler
        .launch(
            QueueSession {
                user_id: user_id.to_string(),
                device_id,
                queue,
            },
            gateway,
        )
        .await?;

    Ok(ShuffleSummary {
        message: format!("shuffling {}!", name),
        num_tracks,
    })
}

/// Ends the user's session; false when none was running.
pub async fn stop_shuffle(scheduler: &QueueScheduler, user_id: &str) -> Result<bool, ShuffleError> {
    scheduler.stop(user_id).await
}
