//! Configuration management for shufflr.
//!
//! This module loads configuration values from environment variables and an
//! optional `.env` file. It provides a single place for the Spotify API
//! credentials, the local server address and the tuning knobs of the queue
//! refill scheduler and the bundle watcher.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (only for the tuning values)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::warning;

/// Name of the application directory below the platform data directory.
pub const APP_DIR: &str = "shufflr";

/// Default interval between two refill passes of a scheduler job.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 30;

/// Default number of playback slots (current track plus queue) to keep filled.
pub const DEFAULT_QUEUE_TARGET_DEPTH: usize = 50;

/// Default upper bound for a single remote player call.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// Default number of enqueue calls issued before a pacing pause.
pub const DEFAULT_BURST_SIZE: usize = 50;

/// Default pacing pause between two enqueue bursts.
pub const DEFAULT_BURST_COOLDOWN_SECS: u64 = 2;

/// Default poll interval of the now-playing bundle watcher.
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 5;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the `shufflr` directory below the platform-specific local data
/// directory if it does not exist yet and loads `shufflr/.env` from it.
/// Variables already present in the process environment are not overridden.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/shufflr/.env`
/// - macOS: `~/Library/Application Support/shufflr/.env`
/// - Windows: `%LOCALAPPDATA%/shufflr/.env`
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or the `.env`
/// file cannot be read or parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    dotenv::from_path(&path)
        .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;
    Ok(())
}

/// Returns the root directory for caches and persisted state.
///
/// Resolves to `<data_local_dir>/shufflr`, or `./shufflr` when the platform
/// has no local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Returns the server address for the local HTTP server.
///
/// # Panics
///
/// Panics if the `SERVER_ADDRESS` environment variable is not set.
pub fn server_addr() -> String {
    env::var("SERVER_ADDRESS").expect("SERVER_ADDRESS must be set")
}

/// Returns the configured Spotify user ID, if any.
///
/// The CLI uses this value to select whose library, cursor and bundles it
/// operates on. When it is unset the user stored at login time is used.
pub fn spotify_user() -> Option<String> {
    env::var("SPOTIFY_USER_ID")
        .ok()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
}

/// Returns the Spotify API client ID for authentication.
///
/// # Panics
///
/// Panics if the `SPOTIFY_API_AUTH_CLIENT_ID` environment variable is not set.
pub fn spotify_client_id() -> String {
    env::var("SPOTIFY_API_AUTH_CLIENT_ID").expect("SPOTIFY_API_AUTH_CLIENT_ID must be set")
}

/// Returns the Spotify OAuth redirect URI.
///
/// This must match the redirect URI registered in the Spotify application
/// settings and point at the `/callback` route of the local server.
///
/// # Panics
///
/// Panics if the `SPOTIFY_API_REDIRECT_URI` environment variable is not set.
pub fn spotify_redirect_uri() -> String {
    env::var("SPOTIFY_API_REDIRECT_URI").expect("SPOTIFY_API_REDIRECT_URI must be set")
}

/// Returns the Spotify API scope permissions.
///
/// Shuffling needs at least `user-read-playback-state`,
/// `user-modify-playback-state`, `playlist-read-private` and
/// `user-library-read`.
///
/// # Panics
///
/// Panics if the `SPOTIFY_API_AUTH_SCOPE` environment variable is not set.
pub fn spotify_scope() -> String {
    env::var("SPOTIFY_API_AUTH_SCOPE").expect("SPOTIFY_API_AUTH_SCOPE must be set")
}

/// Returns the Spotify OAuth authorization URL.
///
/// # Panics
///
/// Panics if the `SPOTIFY_API_AUTH_URL` environment variable is not set.
pub fn spotify_apiauth_url() -> String {
    env::var("SPOTIFY_API_AUTH_URL").expect("SPOTIFY_API_AUTH_URL must be set")
}

/// Returns the Spotify Web API base URL, e.g. `https://api.spotify.com/v1`.
///
/// # Panics
///
/// Panics if the `SPOTIFY_API_URL` environment variable is not set.
pub fn spotify_apiurl() -> String {
    env::var("SPOTIFY_API_URL").expect("SPOTIFY_API_URL must be set")
}

/// Returns the Spotify OAuth token exchange URL.
///
/// # Panics
///
/// Panics if the `SPOTIFY_API_TOKEN_URL` environment variable is not set.
pub fn spotify_apitoken_url() -> String {
    env::var("SPOTIFY_API_TOKEN_URL").expect("SPOTIFY_API_TOKEN_URL must be set")
}

/// Interval between two refill passes (`SHUFFLR_TICK_INTERVAL_SECS`, default 30s).
pub fn tick_interval() -> Duration {
    Duration::from_secs(env_or(
        "SHUFFLR_TICK_INTERVAL_SECS",
        DEFAULT_TICK_INTERVAL_SECS,
    ))
}

/// Target playback depth (`SHUFFLR_QUEUE_TARGET_DEPTH`, default 50).
pub fn queue_target_depth() -> usize {
    env_or("SHUFFLR_QUEUE_TARGET_DEPTH", DEFAULT_QUEUE_TARGET_DEPTH)
}

/// Bound for one remote player call (`SHUFFLR_CALL_TIMEOUT_SECS`, default 10s).
pub fn call_timeout() -> Duration {
    Duration::from_secs(env_or("SHUFFLR_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS))
}

/// Enqueue calls per burst (`SHUFFLR_BURST_SIZE`, default 50).
pub fn burst_size() -> usize {
    env_or("SHUFFLR_BURST_SIZE", DEFAULT_BURST_SIZE)
}

/// Pause between enqueue bursts (`SHUFFLR_BURST_COOLDOWN_SECS`, default 2s).
pub fn burst_cooldown() -> Duration {
    Duration::from_secs(env_or(
        "SHUFFLR_BURST_COOLDOWN_SECS",
        DEFAULT_BURST_COOLDOWN_SECS,
    ))
}

/// Poll interval of the bundle watcher (`SHUFFLR_WATCH_INTERVAL_SECS`, default 5s).
pub fn watch_interval() -> Duration {
    Duration::from_secs(env_or(
        "SHUFFLR_WATCH_INTERVAL_SECS",
        DEFAULT_WATCH_INTERVAL_SECS,
    ))
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warning!(
                    "Ignoring invalid value '{}' for {}, using {}",
                    raw,
                    key,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}
