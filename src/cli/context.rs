use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Mutex;

use crate::{
    config, error,
    management::{BundleManager, CursorManager, SessionManager, TokenManager},
    playback::{QueueScheduler, SchedulerConfig},
};

pub(crate) async fn token_manager() -> Arc<Mutex<TokenManager>> {
    match TokenManager::load().await {
        Ok(manager) => Arc::new(Mutex::new(manager)),
        Err(e) => error!("Failed to load token. Please run shufflr auth. Err: {}", e),
    }
}

/// The user commands operate on: `SPOTIFY_USER_ID`, else the login's user.
pub(crate) async fn user_id(tokens: &Mutex<TokenManager>) -> String {
    if let Some(user) = config::spotify_user() {
        return user;
    }

    match tokens.lock().await.user_id() {
        Some(user) => user.to_string(),
        None => error!("Unknown user. Set SPOTIFY_USER_ID or run shufflr auth again."),
    }
}

pub(crate) async fn scheduler() -> QueueScheduler {
    let cursors = match CursorManager::load().await {
        Ok(cursors) => cursors,
        Err(e) => error!("Cannot load cursors. Err: {}", e),
    };
    let sessions = match SessionManager::load().await {
        Ok(sessions) => sessions,
        Err(e) => error!("Cannot load sessions. Err: {}", e),
    };

    QueueScheduler::new(
        SchedulerConfig::from_env(),
        Arc::new(cursors),
        Arc::new(sessions),
    )
}

pub(crate) async fn bundles() -> BundleManager {
    match BundleManager::load().await {
        Ok(bundles) => bundles,
        Err(e) => error!("Cannot load bundles. Err: {}", e),
    }
}

pub(crate) fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}
