use std::{future::Future, sync::Arc};

use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{CONTENT_LENGTH, RETRY_AFTER},
};
use tokio::sync::Mutex;

use crate::{
    config,
    errors::ShuffleError,
    management::TokenManager,
    types::{
        CurrentTrack, CurrentlyPlayingResponse, Device, DevicesResponse, QueueResponse,
        StartPlaybackRequest, TrackId,
    },
};

/// Contract over the remote playback service.
///
/// Everything the shuffle core needs from the player goes through this
/// trait: starting playback, appending to the remote queue, reading the
/// queue and the current item, skipping, and listing devices. Every call is
/// a network round trip and may fail with a [`ShuffleError`]; callers treat
/// any error as a failed operation and never retry inside the call.
///
/// The futures are `Send` so scheduler jobs can drive a gateway from a
/// spawned task.
pub trait PlayerGateway: Send + Sync {
    /// Starts playback of `tracks` on `device_id`; the first track plays
    /// immediately. `tracks` must not be empty.
    fn start(
        &self,
        tracks: &[TrackId],
        device_id: &str,
    ) -> impl Future<Output = Result<(), ShuffleError>> + Send;

    /// Appends one track to the live remote queue, on `device_id` or on the
    /// active device when `None`.
    ///
    /// The service gives no feedback when its hidden queue cap is exceeded;
    /// callers must limit themselves.
    fn enqueue(
        &self,
        track: &TrackId,
        device_id: Option<&str>,
    ) -> impl Future<Output = Result<(), ShuffleError>> + Send;

    /// Current remote queue, excluding the currently playing item. May lag
    /// behind recent enqueues.
    fn queue_snapshot(&self) -> impl Future<Output = Result<Vec<TrackId>, ShuffleError>> + Send;

    /// The currently playing track, `None` when nothing plays or the state
    /// is unknown.
    fn currently_playing(
        &self,
    ) -> impl Future<Output = Result<Option<CurrentTrack>, ShuffleError>> + Send;

    fn skip_next(&self) -> impl Future<Output = Result<(), ShuffleError>> + Send;

    /// Replaces whatever is playing with `track`.
    fn play_now(&self, track: &TrackId) -> impl Future<Output = Result<(), ShuffleError>> + Send;

    fn devices(&self) -> impl Future<Output = Result<Vec<Device>, ShuffleError>> + Send;
}

/// Where a [`SpotifyPlayer`] takes its bearer token from.
#[derive(Clone)]
pub enum TokenSource {
    /// The locally stored login, refreshed when it is about to expire.
    Managed(Arc<Mutex<TokenManager>>),
    /// A token handed in by a caller, used as is.
    Bearer(String),
}

/// [`PlayerGateway`] backed by the Spotify Web API player endpoints.
///
/// # API Coverage
///
/// - `PUT /me/player/play` - start playback / play a track now
/// - `POST /me/player/queue` - append to the queue
/// - `GET /me/player/queue` - queue snapshot
/// - `GET /me/player/currently-playing` - current item
/// - `POST /me/player/next` - skip
/// - `GET /me/player/devices` - available devices
///
/// # Error Mapping
///
/// - `429 Too Many Requests` becomes [`ShuffleError::RateLimited`] carrying
///   the `Retry-After` value; the refill scheduler retries on its next tick.
/// - Any other non-2xx status becomes [`ShuffleError::RemoteService`] with
///   the response body as message.
/// - Transport failures map through `From<reqwest::Error>`.
pub struct SpotifyPlayer {
    client: Client,
    api_url: String,
    token: TokenSource,
}

impl SpotifyPlayer {
    pub fn new(token: TokenSource) -> Self {
        Self::with_api_url(config::spotify_apiurl(), token)
    }

    pub fn with_api_url(api_url: impl Into<String>, token: TokenSource) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn bearer(&self) -> String {
        match &self.token {
            TokenSource::Managed(manager) => manager.lock().await.get_valid_token().await,
            TokenSource::Bearer(token) => token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ShuffleError> {
        let token = self.bearer().await;
        let response = request.bearer_auth(token).send().await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, ShuffleError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        return Err(ShuffleError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ShuffleError::remote(status.as_u16(), message));
    }

    Ok(response)
}

impl PlayerGateway for SpotifyPlayer {
    async fn start(&self, tracks: &[TrackId], device_id: &str) -> Result<(), ShuffleError> {
        if tracks.is_empty() {
            return Err(ShuffleError::EmptySource("playback request".to_string()));
        }

        let body = StartPlaybackRequest {
            uris: tracks.iter().map(TrackId::uri).collect(),
        };
        let request = self
            .client
            .put(self.url("/me/player/play"))
            .query(&[("device_id", device_id)])
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn enqueue(&self, track: &TrackId, device_id: Option<&str>) -> Result<(), ShuffleError> {
        let uri = track.uri();
        let mut request = self
            .client
            .post(self.url("/me/player/queue"))
            .query(&[("uri", uri.as_str())])
            .header(CONTENT_LENGTH, 0);
        if let Some(device_id) = device_id {
            request = request.query(&[("device_id", device_id)]);
        }
        self.send(request).await?;
        Ok(())
    }

    async fn queue_snapshot(&self) -> Result<Vec<TrackId>, ShuffleError> {
        let request = self.client.get(self.url("/me/player/queue"));
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let queue = response.json::<QueueResponse>().await?;
        // episodes occupy queue slots too, so keep anything with an id
        Ok(queue
            .queue
            .iter()
            .filter_map(|item| item.id.as_deref())
            .filter_map(|id| TrackId::new(id).ok())
            .collect())
    }

    async fn currently_playing(&self) -> Result<Option<CurrentTrack>, ShuffleError> {
        let request = self.client.get(self.url("/me/player/currently-playing"));
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let playing = response.json::<CurrentlyPlayingResponse>().await?;
        Ok(playing.item.and_then(|item| {
            item.track_id().map(|id| CurrentTrack {
                id,
                name: item.name.clone(),
                artists: item.artists.iter().map(|a| a.name.clone()).collect(),
            })
        }))
    }

    async fn skip_next(&self) -> Result<(), ShuffleError> {
        let request = self
            .client
            .post(self.url("/me/player/next"))
            .header(CONTENT_LENGTH, 0);
        self.send(request).await?;
        Ok(())
    }

    async fn play_now(&self, track: &TrackId) -> Result<(), ShuffleError> {
        let body = StartPlaybackRequest {
            uris: vec![track.uri()],
        };
        let request = self.client.put(self.url("/me/player/play")).json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, ShuffleError> {
        let request = self.client.get(self.url("/me/player/devices"));
        let response = self.send(request).await?;
        let devices = response.json::<DevicesResponse>().await?;
        Ok(devices.devices)
    }
}
