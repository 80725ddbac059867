//! # Playback Module
//!
//! Shuffled playback on top of a remote player that only offers a shallow,
//! append-only queue.
//!
//! ```text
//! shuffle::start_shuffle
//!     ├── resolve source (liked / playlist / random playlist)
//!     ├── uniform shuffle
//!     ├── bundles::apply_bundles        (static reorder pass)
//!     ├── gateway.start(first track)
//!     └── scheduler::QueueScheduler::arm
//!              └── run_tick every interval: snapshot → enqueue → cursor
//!
//! bundles::BundleWatcher                (reactive now-playing pass)
//! ```
//!
//! The shuffle and bundle computations are pure. All remote calls go
//! through [`crate::spotify::player::PlayerGateway`] and are bounded by the
//! scheduler's call timeout.

use std::{future::Future, time::Duration};

use crate::errors::ShuffleError;

pub mod bundles;
pub mod scheduler;
pub mod shuffle;

pub use bundles::{
    BundleCheck, BundleRole, BundleWatcher, apply_bundles, check_bundle, run_bundle_check,
};
pub use scheduler::{JobState, QueueScheduler, SchedulerConfig, TickOutcome, run_tick};
pub use shuffle::{ShuffleSource, start_shuffle, stop_shuffle};

/// Runs a remote call, turning an overrun of `limit` into [`ShuffleError::Timeout`].
pub async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ShuffleError>>,
) -> Result<T, ShuffleError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ShuffleError::Timeout)?
}
