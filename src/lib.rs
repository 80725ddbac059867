//! Spotify Queue Shuffler Library
//!
//! This library shuffles a user's liked songs or playlists by driving the
//! Spotify player's remote queue: playback is started with the first track of
//! a shuffled sequence and a background scheduler keeps topping up the remote
//! queue from a persisted cursor. Pinned track pairs ("bundles") are kept
//! together, both while building the sequence and while watching the player.
//!
//! # Modules
//!
//! - `api` - HTTP API endpoints of the local server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `errors` - Error type shared by the core and the gateway
//! - `management` - Persisted state: token, library cache, cursors, bundles, sessions
//! - `playback` - Shuffle orchestration, bundle engine and queue refill scheduler
//! - `server` - Local HTTP server
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use shufflr::{cli, config, types::ShuffleChoice};
//!
//! #[tokio::main]
//! async fn main() {
//!     if config::load_env().await.is_ok() {
//!         cli::shuffle(ShuffleChoice::Liked, None).await;
//!     }
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod management;
pub mod playback;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Refilling queue for {}", user_id);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Queued {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal errors on CLI startup paths. Background tasks (scheduler
/// jobs, the bundle watcher, HTTP handlers) must use [`warning!`] instead.
///
/// # Example
///
/// ```
/// error!("Failed to load token. Please run shufflr auth");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues such as a failed refill tick that will be
/// retried on the next interval.
///
/// # Example
///
/// ```
/// warning!("Tick for {} failed: {}", user_id, e);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
