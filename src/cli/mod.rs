//! # CLI Module
//!
//! User-facing commands of shufflr. Each command resolves the current user
//! (`SPOTIFY_USER_ID`, else the user recorded at login), loads the persisted
//! state it needs and delegates to [`crate::playback`], [`crate::management`]
//! and [`crate::spotify`].
//!
//! ## Typical use
//!
//! ```bash
//! shufflr auth                     # log in, registers the user
//! shufflr sync                     # cache liked songs and playlists
//! shufflr bundles add <intro> <main> --strict
//! shufflr shuffle --liked          # runs until the queue is used up
//! shufflr check --watch            # keep bundles together in any playback
//! shufflr serve                    # HTTP API, resumes persisted sessions
//! ```
//!
//! Startup failures (no login, unreadable state) end the process through
//! [`crate::error!`]. Once a command runs, remote failures are reported with
//! [`crate::warning!`] and retried where the command loops.

mod auth;
mod bundles;
mod check;
mod context;
mod serve;
mod shuffle;
mod status;
mod sync;

pub use auth::auth;
pub use bundles::{add_bundle, list_bundles, remove_bundle, set_bundle_strict};
pub use check::check;
pub use serve::serve;
pub use shuffle::shuffle;
pub use status::status;
pub use sync::sync;
