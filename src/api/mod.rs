//! # API Module
//!
//! HTTP endpoints of the local shufflr server.
//!
//! ## Endpoints
//!
//! ### Authentication and monitoring
//!
//! - [`callback`] - OAuth PKCE callback, completes a login
//! - [`health`] - status, version and the number of running refill jobs
//!
//! ### Shuffle sessions
//!
//! - [`shuffle`] - `POST /api/shuffle` starts a session
//! - [`stop`] - `POST /api/stop` ends a session
//! - [`session`] - `GET /api/session` reports a user's session
//!
//! ### Bundles
//!
//! - [`list_bundles`], [`create_bundle`], [`update_bundle`], [`delete_bundle`]
//! - [`bundle_check`] - one reactive check of the now-playing track
//!
//! ### Library cache
//!
//! - [`playlists`], [`saved_songs`], [`refresh_cache`], [`clear_cache`]
//!
//! Handlers return `Result<_, ShuffleError>`; errors are rendered as
//! `{"error": "..."}` with a status derived from the error kind.

mod bundles;
mod callback;
mod error;
mod health;
mod library;
mod shuffle;

pub use bundles::{bundle_check, create_bundle, delete_bundle, list_bundles, update_bundle};
pub use callback::callback;
pub use error::status_for;
pub use health::health;
pub use library::{clear_cache, playlists, refresh_cache, saved_songs};
pub use shuffle::{session, shuffle, stop};
