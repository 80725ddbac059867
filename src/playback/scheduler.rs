use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, sleep},
};

use crate::{
    config,
    errors::ShuffleError,
    info,
    management::{CursorManager, SessionManager},
    playback::bounded,
    spotify::player::PlayerGateway,
    types::QueueSession,
    warning,
};

/// Tuning of the queue refill scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between two refill passes of one job.
    pub tick_interval: Duration,
    /// Playback slots (current track plus remote queue) to keep filled.
    pub target_depth: usize,
    /// Bound for each remote call made during a tick.
    pub call_timeout: Duration,
    /// Enqueue calls issued back to back before pausing.
    pub burst_size: usize,
    pub burst_cooldown: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(config::DEFAULT_TICK_INTERVAL_SECS),
            target_depth: config::DEFAULT_QUEUE_TARGET_DEPTH,
            call_timeout: Duration::from_secs(config::DEFAULT_CALL_TIMEOUT_SECS),
            burst_size: config::DEFAULT_BURST_SIZE,
            burst_cooldown: Duration::from_secs(config::DEFAULT_BURST_COOLDOWN_SECS),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            tick_interval: config::tick_interval().max(Duration::from_secs(1)),
            target_depth: config::queue_target_depth().max(1),
            call_timeout: config::call_timeout().max(Duration::from_secs(1)),
            burst_size: config::burst_size().max(1),
            burst_cooldown: config::burst_cooldown(),
        }
    }
}

/// Lifecycle of a user's refill job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// No job for the user.
    Idle,
    /// Installed, the immediate first tick ran, periodic ticks pending.
    Armed,
    /// At least one periodic tick ran.
    Running,
    /// The cursor reached the end of the queue; no further ticks.
    Exhausted,
    /// A tick failed in a way retrying cannot fix; no further ticks.
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Armed => "armed",
            JobState::Running => "running",
            JobState::Exhausted => "exhausted",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Refilled { pushed: usize, cursor: usize },
    Exhausted,
}

/// One refill pass for a session.
///
/// Reads the user's cursor; a cursor at or past the end of the queue means
/// the session is exhausted and no remote call is made. Otherwise the
/// remote queue is read and tracks are pushed from the cursor on until the
/// observed depth (queue length plus the playing track) reaches the target
/// depth or the queue runs out. Pushes are paced in bursts of
/// `burst_size`. The cursor is written once, after the last push.
///
/// Any failed or timed out remote call aborts the pass and leaves the
/// cursor untouched, so the next pass starts from the same position. Tracks
/// pushed before the failure will be pushed again.
pub async fn run_tick<G: PlayerGateway>(
    gateway: &G,
    cursors: &CursorManager,
    session: &QueueSession,
    config: &SchedulerConfig,
) -> Result<TickOutcome, ShuffleError> {
    let start = cursors.get(&session.user_id).await;
    let total = session.queue.len();
    if start >= total {
        return Ok(TickOutcome::Exhausted);
    }

    let snapshot = bounded(config.call_timeout, gateway.queue_snapshot()).await?;
    let mut depth = snapshot.len() + 1;
    let mut cursor = start;

    while depth < config.target_depth && cursor < total {
        let pushed = cursor - start;
        if pushed > 0 && pushed % config.burst_size == 0 {
            sleep(config.burst_cooldown).await;
        }

        let track = &session.queue.tracks()[cursor];
        bounded(
            config.call_timeout,
            gateway.enqueue(track, Some(&session.device_id)),
        )
        .await?;
        cursor += 1;
        depth += 1;
    }

    cursors.set(&session.user_id, cursor).await?;
    Ok(TickOutcome::Refilled {
        pushed: cursor - start,
        cursor,
    })
}

struct ScheduledJob {
    generation: u64,
    state: JobState,
    session: QueueSession,
    handle: Option<JoinHandle<()>>,
}

/// Registry of per-user refill jobs.
///
/// Each user has at most one job. Launching, arming and stopping take the
/// user's tick lock, then cancel the previous job and wait until it has
/// stopped, so two jobs never work on the same cursor and a replaced
/// session never ticks again. Ticks of different users run concurrently
/// and no registry lock is held while a tick waits on the remote player.
#[derive(Clone)]
pub struct QueueScheduler {
    config: SchedulerConfig,
    cursors: Arc<CursorManager>,
    sessions: Arc<SessionManager>,
    jobs: Arc<Mutex<HashMap<String, ScheduledJob>>>,
    tick_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    generation: Arc<AtomicU64>,
}

impl QueueScheduler {
    pub fn new(
        config: SchedulerConfig,
        cursors: Arc<CursorManager>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            config,
            cursors,
            sessions,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            tick_locks: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn cursors(&self) -> &Arc<CursorManager> {
        &self.cursors
    }

    /// Starts playback of `session` and installs its refill job, replacing
    /// any previous session of the user.
    ///
    /// Runs entirely under the user's tick lock: the old job is stopped,
    /// the first track is started, the cursor moves to 1 and the first tick
    /// runs before any other tick of the user can. Nothing is installed when
    /// starting playback fails.
    pub async fn launch<G: PlayerGateway + 'static>(
        &self,
        session: QueueSession,
        gateway: Arc<G>,
    ) -> Result<JobState, ShuffleError> {
        let lock = self.tick_lock(&session.user_id).await;
        let _guard = lock.lock().await;

        self.cancel(&session.user_id).await;
        self.sessions.remove(&session.user_id).await?;

        let Some(first) = session.queue.tracks().first() else {
            return Err(ShuffleError::EmptySource("shuffle queue".to_string()));
        };
        bounded(
            self.config.call_timeout,
            gateway.start(std::slice::from_ref(first), &session.device_id),
        )
        .await?;
        self.cursors.set(&session.user_id, 1).await?;

        self.install(session, gateway).await
    }

    /// Installs the refill job for `session.user_id` at its current cursor,
    /// replacing any previous job of that user, and runs the first tick
    /// right away.
    ///
    /// Returns [`JobState::Exhausted`] when the first tick finds nothing
    /// left to push, [`JobState::Armed`] otherwise. A first tick failing
    /// with a retryable error is logged and retried on the regular interval;
    /// any other failure ends the job and is returned.
    pub async fn arm<G: PlayerGateway + 'static>(
        &self,
        session: QueueSession,
        gateway: Arc<G>,
    ) -> Result<JobState, ShuffleError> {
        let lock = self.tick_lock(&session.user_id).await;
        let _guard = lock.lock().await;

        self.cancel(&session.user_id).await;
        self.install(session, gateway).await
    }

    /// Caller holds the user's tick lock.
    async fn install<G: PlayerGateway + 'static>(
        &self,
        session: QueueSession,
        gateway: Arc<G>,
    ) -> Result<JobState, ShuffleError> {
        let user_id = session.user_id.clone();
        self.sessions.save(&session).await?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.replace(
            &user_id,
            ScheduledJob {
                generation,
                state: JobState::Armed,
                session: session.clone(),
                handle: None,
            },
        )
        .await;

        match self.refill(gateway.as_ref(), &session).await {
            Ok(TickOutcome::Exhausted) => {
                self.finish(&user_id, generation, JobState::Exhausted).await;
                return Ok(JobState::Exhausted);
            }
            Err(e) if !e.is_retryable() => {
                self.finish(&user_id, generation, JobState::Failed).await;
                return Err(e);
            }
            _ => {}
        }

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            scheduler.run_job(generation, session, gateway).await;
        });

        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&user_id) {
            Some(job) if job.generation == generation => {
                job.handle = Some(handle);
                Ok(job.state)
            }
            _ => {
                // cancelled while the first tick ran
                handle.abort();
                Ok(JobState::Idle)
            }
        }
    }

    /// Cancels the user's job without touching its persisted session.
    /// Returns once the job's task has stopped. Caller holds the user's tick
    /// lock.
    async fn cancel(&self, user_id: &str) -> bool {
        let removed = self.jobs.lock().await.remove(user_id);
        match removed {
            Some(job) => {
                if let Some(handle) = job.handle {
                    handle.abort();
                    let _ = handle.await;
                }
                true
            }
            None => false,
        }
    }

    /// Ends the user's session: waits for a running tick, cancels the job
    /// and forgets the session.
    pub async fn stop(&self, user_id: &str) -> Result<bool, ShuffleError> {
        let lock = self.tick_lock(user_id).await;
        let _guard = lock.lock().await;

        let cancelled = self.cancel(user_id).await;
        self.sessions.remove(user_id).await?;
        Ok(cancelled)
    }

    pub async fn job_state(&self, user_id: &str) -> JobState {
        self.jobs
            .lock()
            .await
            .get(user_id)
            .map(|job| job.state)
            .unwrap_or(JobState::Idle)
    }

    pub async fn session(&self, user_id: &str) -> Option<QueueSession> {
        self.jobs
            .lock()
            .await
            .get(user_id)
            .map(|job| job.session.clone())
    }

    /// Users with a job and the state of that job, sorted by user.
    pub async fn jobs(&self) -> Vec<(String, JobState)> {
        let mut jobs: Vec<(String, JobState)> = self
            .jobs
            .lock()
            .await
            .iter()
            .map(|(user, job)| (user.clone(), job.state))
            .collect();
        jobs.sort_by(|a, b| a.0.cmp(&b.0));
        jobs
    }

    /// Re-arms every persisted session whose cursor has not reached its end.
    /// Exhausted leftovers are dropped. Returns the number of resumed jobs.
    pub async fn resume<G: PlayerGateway + 'static>(&self, gateway: Arc<G>) -> usize {
        let mut resumed = 0;
        for session in self.sessions.all().await {
            let cursor = self.cursors.get(&session.user_id).await;
            if cursor >= session.queue.len() {
                if let Err(e) = self.sessions.remove(&session.user_id).await {
                    warning!("Failed to drop finished session of {}: {}", session.user_id, e);
                }
                continue;
            }

            let user_id = session.user_id.clone();
            match self.arm(session, Arc::clone(&gateway)).await {
                Ok(JobState::Armed) | Ok(JobState::Running) => {
                    info!("Resumed shuffle session of {} at track {}", user_id, cursor);
                    resumed += 1;
                }
                Ok(_) => {}
                Err(e) => warning!("Failed to resume session of {}: {}", user_id, e),
            }
        }
        resumed
    }

    async fn run_job<G: PlayerGateway>(
        self,
        generation: u64,
        session: QueueSession,
        gateway: Arc<G>,
    ) {
        let period = self.config.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        // a tick that overruns its slot swallows the missed ones
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !self
                .set_state(&session.user_id, generation, JobState::Running)
                .await
            {
                return;
            }

            match self.tick(gateway.as_ref(), &session).await {
                Ok(TickOutcome::Exhausted) => {
                    self.finish(&session.user_id, generation, JobState::Exhausted)
                        .await;
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    self.finish(&session.user_id, generation, JobState::Failed)
                        .await;
                    return;
                }
                _ => {}
            }
        }
    }

    /// Runs one pass under the user's tick lock.
    async fn tick<G: PlayerGateway>(
        &self,
        gateway: &G,
        session: &QueueSession,
    ) -> Result<TickOutcome, ShuffleError> {
        let lock = self.tick_lock(&session.user_id).await;
        let _guard = lock.lock().await;
        self.refill(gateway, session).await
    }

    /// Runs one pass and logs its result. Caller holds the user's tick lock.
    async fn refill<G: PlayerGateway>(
        &self,
        gateway: &G,
        session: &QueueSession,
    ) -> Result<TickOutcome, ShuffleError> {
        let result = run_tick(gateway, &self.cursors, session, &self.config).await;
        match &result {
            Ok(TickOutcome::Refilled { pushed, cursor }) if *pushed > 0 => {
                info!(
                    "Queued {} tracks for {} ({}/{})",
                    pushed,
                    session.user_id,
                    cursor,
                    session.queue.len()
                );
            }
            Ok(TickOutcome::Refilled { .. }) => {}
            Ok(TickOutcome::Exhausted) => {
                info!("Shuffle session of {} is exhausted", session.user_id);
            }
            Err(e) if e.is_retryable() => {
                warning!(
                    "Refill for {} failed, retrying next tick: {}",
                    session.user_id,
                    e
                );
            }
            Err(e) => {
                warning!("Refill for {} failed, ending session: {}", session.user_id, e);
            }
        }
        result
    }

    async fn tick_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.tick_locks.lock().await;
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    async fn replace(&self, user_id: &str, job: ScheduledJob) {
        let displaced = self.jobs.lock().await.insert(user_id.to_string(), job);
        if let Some(handle) = displaced.and_then(|old| old.handle) {
            handle.abort();
            let _ = handle.await;
        }
    }

    /// Updates the state of the job with `generation`; false when that job
    /// is no longer installed.
    async fn set_state(&self, user_id: &str, generation: u64, state: JobState) -> bool {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(user_id) {
            Some(job) if job.generation == generation => {
                job.state = state;
                true
            }
            _ => false,
        }
    }

    /// Marks the job with `generation` as ended and drops its session.
    async fn finish(&self, user_id: &str, generation: u64, state: JobState) {
        {
            let mut jobs = self.jobs.lock().await;
            match jobs.get_mut(user_id) {
                Some(job) if job.generation == generation => {
                    job.state = state;
                    // dropping the handle detaches it; the task is ending anyway
                    job.handle = None;
                }
                _ => return,
            }
        }

        if let Err(e) = self.sessions.remove(user_id).await {
            warning!("Failed to drop finished session of {}: {}", user_id, e);
        }
    }
}
