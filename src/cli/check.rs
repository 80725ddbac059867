use std::sync::Arc;

use tokio::time::{MissedTickBehavior, interval};

use crate::{
    config, error, info,
    playback::{BundleCheck, BundleWatcher, run_bundle_check},
    spotify::player::{SpotifyPlayer, TokenSource},
    success, warning,
};

use super::context;

/// Checks the now-playing track against the user's bundles, once or, with
/// `watch`, on every track change until Ctrl-C.
pub async fn check(watch: bool) {
    let tokens = context::token_manager().await;
    let user_id = context::user_id(&tokens).await;
    let bundle_store = context::bundles().await;
    let player = SpotifyPlayer::new(TokenSource::Managed(Arc::clone(&tokens)));
    let call_timeout = config::call_timeout();

    if !watch {
        let bundles = bundle_store.for_user(&user_id).await;
        match run_bundle_check(&player, &bundles, call_timeout).await {
            Ok(check) => report(&check),
            Err(e) => error!("Bundle check failed. Err: {}", e),
        }
        return;
    }

    let period = config::watch_interval();
    info!(
        "Watching playback every {}s. Press Ctrl-C to stop.",
        period.as_secs()
    );

    let mut watcher = BundleWatcher::new();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Stopped watching.");
                return;
            }
            _ = ticker.tick() => {
                // bundles may change while watching
                let bundles = bundle_store.for_user(&user_id).await;
                match watcher.poll(&player, &bundles, call_timeout).await {
                    Ok(Some(check)) => report(&check),
                    Ok(None) => {}
                    Err(e) => warning!("Bundle check failed: {}", e),
                }
            }
        }
    }
}

fn report(check: &BundleCheck) {
    match check {
        BundleCheck::QueuedMain { .. } | BundleCheck::InsertedIntro { .. } => {
            success!("{}", check.message())
        }
        _ => info!("{}", check.message()),
    }
}
