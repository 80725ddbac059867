use axum::{
    Extension, Router,
    routing::{get, patch, post},
};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::sync::Mutex;

use crate::{
    api, config,
    management::{BundleManager, LibraryManager, TokenManager},
    playback::QueueScheduler,
    spotify::player::{SpotifyPlayer, TokenSource},
    types::PkceToken,
};

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: QueueScheduler,
    pub bundles: Arc<BundleManager>,
    pub library: Arc<LibraryManager>,
    pub tokens: Arc<Mutex<TokenManager>>,
    /// Player driven with the stored login.
    pub player: Arc<SpotifyPlayer>,
    pub pkce: Arc<Mutex<Option<PkceToken>>>,
}

impl AppState {
    pub fn new(
        scheduler: QueueScheduler,
        bundles: Arc<BundleManager>,
        library: Arc<LibraryManager>,
        tokens: Arc<Mutex<TokenManager>>,
    ) -> Self {
        let player = Arc::new(SpotifyPlayer::new(TokenSource::Managed(Arc::clone(&tokens))));
        Self {
            scheduler,
            bundles,
            library,
            tokens,
            player,
            pkce: Arc::new(Mutex::new(None)),
        }
    }

    /// The stored login's player, or a player using the caller's token.
    pub fn player_for(&self, token: Option<String>) -> Arc<SpotifyPlayer> {
        match token.filter(|t| !t.trim().is_empty()) {
            Some(token) => Arc::new(SpotifyPlayer::new(TokenSource::Bearer(token))),
            None => Arc::clone(&self.player),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/callback",
            get(api::callback).layer(Extension(Arc::clone(&state.pkce))),
        )
        .route("/api/shuffle", post(api::shuffle))
        .route("/api/stop", post(api::stop))
        .route("/api/session", get(api::session))
        .route("/api/bundle_check", post(api::bundle_check))
        .route("/api/bundles", get(api::list_bundles).post(api::create_bundle))
        .route(
            "/api/bundles/{id}",
            patch(api::update_bundle).delete(api::delete_bundle),
        )
        .route("/api/playlists", get(api::playlists))
        .route("/api/saved_songs", get(api::saved_songs))
        .route("/api/cache/refresh", post(api::refresh_cache))
        .route("/api/cache/clear", post(api::clear_cache))
        .with_state(state)
}

/// Serves the full API on `SERVER_ADDRESS` until the process ends.
pub async fn start_api_server(state: AppState) -> Result<(), String> {
    serve(router(state)).await
}

/// Serves only the OAuth callback, for the duration of `shufflr auth`.
pub async fn start_auth_server(state: Arc<Mutex<Option<PkceToken>>>) -> Result<(), String> {
    let app = Router::new().route("/callback", get(api::callback).layer(Extension(state)));
    serve(app).await
}

async fn serve(app: Router) -> Result<(), String> {
    let addr = SocketAddr::from_str(&config::server_addr())
        .map_err(|e| format!("Failed to parse server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, app).await.map_err(|e| e.to_string())
}
