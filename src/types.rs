use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::errors::ShuffleError;

const TRACK_URI_PREFIX: &str = "spotify:track:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
    /// Spotify user the token belongs to, filled in after the `/me` handshake.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

/// Catalog identifier of a single track.
///
/// Accepts bare base62 ids as well as `spotify:track:<id>` URIs; the prefix
/// is stripped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackId(String);

impl TrackId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ShuffleError> {
        let raw = raw.as_ref().trim();
        let id = raw.strip_prefix(TRACK_URI_PREFIX).unwrap_or(raw);
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ShuffleError::InvalidTrackId(raw.to_string()));
        }
        Ok(TrackId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn uri(&self) -> String {
        format!("{}{}", TRACK_URI_PREFIX, self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TrackId {
    type Err = ShuffleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackId::new(s)
    }
}

impl TryFrom<String> for TrackId {
    type Error = ShuffleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TrackId::new(value)
    }
}

impl From<TrackId> for String {
    fn from(id: TrackId) -> Self {
        id.0
    }
}

/// A pinned (intro, main) pair owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: u64,
    pub user_id: String,
    #[serde(rename = "intro_song_id")]
    pub intro: TrackId,
    #[serde(rename = "main_song_id")]
    pub main: TrackId,
    pub strict: bool,
}

impl Bundle {
    /// Whether `track` triggers this bundle while reordering a sequence.
    ///
    /// Strict bundles react to either side, non-strict ones only to the intro.
    pub fn triggers_on(&self, track: &TrackId) -> bool {
        if self.strict {
            *track == self.intro || *track == self.main
        } else {
            *track == self.intro
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBundle {
    pub user_id: String,
    #[serde(rename = "intro_song_id")]
    pub intro: TrackId,
    #[serde(rename = "main_song_id")]
    pub main: TrackId,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Tabled)]
pub struct BundleTableRow {
    pub id: u64,
    pub intro: String,
    pub main: String,
    pub strict: bool,
}

/// Ordered track sequence of one shuffle session.
///
/// Immutable once built and cheap to clone, so the scheduler job and the
/// session store can share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TrackId>", into = "Vec<TrackId>")]
pub struct ShuffleQueue(Arc<[TrackId]>);

impl ShuffleQueue {
    pub fn new(tracks: Vec<TrackId>) -> Result<Self, ShuffleError> {
        if tracks.is_empty() {
            return Err(ShuffleError::EmptySource("shuffle queue".to_string()));
        }
        Ok(ShuffleQueue(tracks.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> &TrackId {
        &self.0[0]
    }

    pub fn tracks(&self) -> &[TrackId] {
        &self.0
    }
}

impl TryFrom<Vec<TrackId>> for ShuffleQueue {
    type Error = ShuffleError;

    fn try_from(value: Vec<TrackId>) -> Result<Self, Self::Error> {
        ShuffleQueue::new(value)
    }
}

impl From<ShuffleQueue> for Vec<TrackId> {
    fn from(queue: ShuffleQueue) -> Self {
        queue.0.to_vec()
    }
}

/// Everything a scheduler job needs to keep refilling one user's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSession {
    pub user_id: String,
    pub device_id: String,
    pub queue: ShuffleQueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleChoice {
    Liked,
    Playlist,
    Random,
}

impl FromStr for ShuffleChoice {
    type Err = ShuffleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "liked" => Ok(ShuffleChoice::Liked),
            "2" | "playlist" => Ok(ShuffleChoice::Playlist),
            "3" | "random" => Ok(ShuffleChoice::Random),
            other => Err(ShuffleError::InvalidChoice(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShuffleSummary {
    pub message: String,
    pub num_tracks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentTrack {
    pub id: TrackId,
    pub name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_restricted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedPlaylist {
    pub name: String,
    pub tracks: Vec<TrackId>,
}

/// Locally cached library of one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserLibrary {
    pub saved_tracks: Vec<TrackId>,
    pub playlists: BTreeMap<String, CachedPlaylist>,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub id: String,
    pub name: String,
    pub tracks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrackItem {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTrackItem {
    pub track: Option<TrackObject>,
}

/// Track or episode object as returned by the Web API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    #[serde(default)]
    pub is_local: bool,
}

impl TrackObject {
    /// Track id of a playable catalog track, `None` for episodes, local
    /// files and malformed items.
    pub fn track_id(&self) -> Option<TrackId> {
        if self.is_local || self.kind.as_deref().is_some_and(|k| k != "track") {
            return None;
        }
        self.id.as_deref().and_then(|id| TrackId::new(id).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplePlaylist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueResponse {
    pub currently_playing: Option<TrackObject>,
    #[serde(default)]
    pub queue: Vec<TrackObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentlyPlayingResponse {
    pub item: Option<TrackObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPlaybackRequest {
    pub uris: Vec<String>,
}

#[derive(Tabled)]
pub struct SessionTableRow {
    pub user: String,
    pub state: String,
    pub cursor: usize,
    pub tracks: usize,
}
