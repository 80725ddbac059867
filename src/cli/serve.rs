use std::sync::Arc;

use crate::{
    config, error, info,
    management::LibraryManager,
    server::{self, AppState},
};

use super::context;

/// Runs the HTTP API. Sessions persisted by an earlier run are resumed first.
pub async fn serve() {
    let tokens = context::token_manager().await;
    let scheduler = context::scheduler().await;
    let bundles = Arc::new(context::bundles().await);
    let library = Arc::new(LibraryManager::default_location());

    let state = AppState::new(scheduler, bundles, library, tokens);

    let resumed = state.scheduler.resume(Arc::clone(&state.player)).await;
    if resumed > 0 {
        info!("Resumed {} shuffle sessions", resumed);
    }

    info!("Listening on {}", config::server_addr());
    if let Err(e) = server::start_api_server(state).await {
        error!("Server stopped. Err: {}", e);
    }
}
