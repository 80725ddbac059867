use std::{sync::Arc, time::Duration};

use tokio::time::interval;

use crate::{
    error, info,
    management::LibraryManager,
    playback::{JobState, start_shuffle},
    spotify::player::{SpotifyPlayer, TokenSource},
    success,
    types::ShuffleChoice,
    warning,
};

use super::context;

/// Starts a session and keeps refilling the queue in the foreground until
/// every track is queued or Ctrl-C is pressed.
pub async fn shuffle(choice: ShuffleChoice, playlist_id: Option<String>) {
    let tokens = context::token_manager().await;
    let user_id = context::user_id(&tokens).await;

    let library = match LibraryManager::default_location().load(&user_id).await {
        Ok(library) => library,
        Err(e) => error!("{}. Run shufflr sync first.", e),
    };
    let bundles = context::bundles().await.for_user(&user_id).await;
    let scheduler = context::scheduler().await;
    let player = Arc::new(SpotifyPlayer::new(TokenSource::Managed(tokens)));

    let summary = match start_shuffle(
        &scheduler,
        player,
        &user_id,
        choice,
        playlist_id.as_deref(),
        &library,
        &bundles,
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => error!("Cannot start shuffle. Err: {}", e),
    };

    success!("{} ({} tracks)", summary.message, summary.num_tracks);
    info!("Keeping the queue filled. Press Ctrl-C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                if let Err(e) = scheduler.stop(&user_id).await {
                    warning!("Failed to clear session: {}", e);
                }
                info!("Stopped shuffling.");
                return;
            }
            _ = poll.tick() => match scheduler.job_state(&user_id).await {
                JobState::Armed | JobState::Running => {}
                JobState::Failed => {
                    warning!("The queue can no longer be refilled. Run `shufflr auth` and shuffle again.");
                    return;
                }
                _ => {
                    success!("All {} tracks are queued.", summary.num_tracks);
                    return;
                }
            },
        }
    }
}
