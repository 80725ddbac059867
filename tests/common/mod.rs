#![allow(dead_code)]

use std::{sync::Mutex, time::Duration};

use shufflr::{
    errors::ShuffleError,
    spotify::player::PlayerGateway,
    types::{Bundle, CurrentTrack, Device, QueueSession, ShuffleQueue, TrackId},
};

/// A gateway call as observed by [`FakePlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(Vec<TrackId>, String),
    Enqueue(TrackId, Option<String>),
    Snapshot,
    CurrentlyPlaying,
    SkipNext,
    PlayNow(TrackId),
    Devices,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    queue: Vec<TrackId>,
    playing: Option<CurrentTrack>,
    devices: Vec<Device>,
    enqueues: usize,
    fail_enqueue_from: Option<usize>,
    fail_all: Option<ShuffleError>,
    fail_snapshot: bool,
    hang: bool,
    delay: Duration,
}

/// In-memory player. Enqueued tracks land in its remote queue, so queue
/// snapshots reflect earlier pushes.
#[derive(Default)]
pub struct FakePlayer {
    state: Mutex<FakeState>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        let player = Self::default();
        player.state.lock().unwrap().devices = devices;
        player
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn enqueued(&self) -> Vec<TrackId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Enqueue(track, _) => Some(track),
                _ => None,
            })
            .collect()
    }

    pub fn remote_queue(&self) -> Vec<TrackId> {
        self.state.lock().unwrap().queue.clone()
    }

    pub fn set_queue(&self, queue: Vec<TrackId>) {
        self.state.lock().unwrap().queue = queue;
    }

    pub fn set_playing(&self, id: &str) {
        self.state.lock().unwrap().playing = Some(current(id));
    }

    pub fn stop_playing(&self) {
        self.state.lock().unwrap().playing = None;
    }

    /// Every enqueue from the `n`-th (0-based) on fails.
    pub fn fail_enqueue_from(&self, n: usize) {
        self.state.lock().unwrap().fail_enqueue_from = Some(n);
    }

    pub fn fail_all(&self, error: Option<ShuffleError>) {
        self.state.lock().unwrap().fail_all = error;
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_enqueue_from = None;
        state.fail_all = None;
    }

    pub fn fail_snapshot(&self, fail: bool) {
        self.state.lock().unwrap().fail_snapshot = fail;
    }

    /// Every call takes `delay` before it answers.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = delay;
    }

    /// Makes every call hang for an hour.
    pub fn hang(&self, hang: bool) {
        self.state.lock().unwrap().hang = hang;
    }

    async fn enter(&self, call: Call) -> Result<(), ShuffleError> {
        let (hang, delay, failure) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            (state.hang, state.delay, state.fail_all.clone())
        };
        if hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl PlayerGateway for FakePlayer {
    async fn start(&self, tracks: &[TrackId], device_id: &str) -> Result<(), ShuffleError> {
        self.enter(Call::Start(tracks.to_vec(), device_id.to_string()))
            .await?;
        let mut state = self.state.lock().unwrap();
        state.playing = tracks.first().map(|t| current(t.as_str()));
        state.queue = tracks.iter().skip(1).cloned().collect();
        Ok(())
    }

    async fn enqueue(&self, track: &TrackId, device_id: Option<&str>) -> Result<(), ShuffleError> {
        self.enter(Call::Enqueue(track.clone(), device_id.map(str::to_string)))
            .await?;
        let mut state = self.state.lock().unwrap();
        let index = state.enqueues;
        state.enqueues += 1;
        if state.fail_enqueue_from.is_some_and(|n| index >= n) {
            return Err(ShuffleError::remote(500, "enqueue failed"));
        }
        state.queue.push(track.clone());
        Ok(())
    }

    async fn queue_snapshot(&self) -> Result<Vec<TrackId>, ShuffleError> {
        self.enter(Call::Snapshot).await?;
        let state = self.state.lock().unwrap();
        if state.fail_snapshot {
            return Err(ShuffleError::remote(500, "queue unavailable"));
        }
        Ok(state.queue.clone())
    }

    async fn currently_playing(&self) -> Result<Option<CurrentTrack>, ShuffleError> {
        self.enter(Call::CurrentlyPlaying).await?;
        Ok(self.state.lock().unwrap().playing.clone())
    }

    async fn skip_next(&self) -> Result<(), ShuffleError> {
        self.enter(Call::SkipNext).await?;
        let mut state = self.state.lock().unwrap();
        state.playing = if state.queue.is_empty() {
            None
        } else {
            Some(current(state.queue.remove(0).as_str()))
        };
        Ok(())
    }

    async fn play_now(&self, track: &TrackId) -> Result<(), ShuffleError> {
        self.enter(Call::PlayNow(track.clone())).await?;
        self.state.lock().unwrap().playing = Some(current(track.as_str()));
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, ShuffleError> {
        self.enter(Call::Devices).await?;
        Ok(self.state.lock().unwrap().devices.clone())
    }
}

pub fn track(id: &str) -> TrackId {
    TrackId::new(id).unwrap()
}

/// `prefix0`, `prefix1`, ... `prefix{n-1}`.
pub fn tracks(prefix: &str, n: usize) -> Vec<TrackId> {
    (0..n).map(|i| track(&format!("{}{}", prefix, i))).collect()
}

pub fn current(id: &str) -> CurrentTrack {
    CurrentTrack {
        id: track(id),
        name: format!("Song {}", id),
        artists: vec!["Artist".to_string()],
    }
}

pub fn device(id: &str, active: bool) -> Device {
    Device {
        id: Some(id.to_string()),
        name: format!("Device {}", id),
        is_active: active,
        is_restricted: false,
    }
}

pub fn bundle(id: u64, intro: &str, main: &str, strict: bool) -> Bundle {
    Bundle {
        id,
        user_id: "user1".to_string(),
        intro: track(intro),
        main: track(main),
        strict,
    }
}

pub fn session(user_id: &str, queue: Vec<TrackId>) -> QueueSession {
    QueueSession {
        user_id: user_id.to_string(),
        device_id: "dev1".to_string(),
        queue: ShuffleQueue::new(queue).unwrap(),
    }
}
