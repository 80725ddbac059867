//! # Spotify Integration Module
//!
//! This module is the integration layer between shufflr and the Spotify Web
//! API. It covers the three concerns the rest of the crate consumes:
//!
//! ```text
//! Application Layer (CLI, HTTP API, Playback)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (OAuth 2.0 PKCE, /me handshake)
//!     ├── Library listings (liked songs, playlists)
//!     └── Player gateway (start, queue, now playing, skip, devices)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Authentication
//!
//! [`auth`] implements the PKCE flow: a random code verifier, its SHA256
//! challenge, a temporary local callback server, token exchange and refresh.
//! After login the profile of the user is looked up once so the token can be
//! associated with a user id.
//!
//! ## Library listings
//!
//! [`library`] pages through `GET /me/tracks`, `GET /me/playlists` and
//! `GET /playlists/{id}/tracks`. Listings tolerate transient failures:
//! 502 responses are retried after a fixed delay and 429 responses honour
//! `Retry-After` up to two minutes.
//!
//! ## Player gateway
//!
//! [`player`] defines [`player::PlayerGateway`], the only surface through
//! which the playback core touches the remote player, and
//! [`player::SpotifyPlayer`], its Web API implementation. Player calls are
//! never retried internally: the refill scheduler bounds each call with a
//! timeout and retries on its next tick.
//!
//! ## Usage Patterns
//!
//! ```rust
//! let player = SpotifyPlayer::new(TokenSource::Managed(token_mgr));
//! let devices = player.devices().await?;
//! player.start(&tracks[..1], device_id).await?;
//! player.enqueue(&tracks[1], device_id).await?;
//! ```
//!
//! ## Error Types
//!
//! Player and library functions return [`crate::errors::ShuffleError`];
//! token exchange functions return `String` errors.

pub mod auth;
pub mod library;
pub mod player;
