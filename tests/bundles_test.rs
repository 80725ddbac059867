mod common;

use std::time::Duration;

use common::{Call, FakePlayer, bundle, track, tracks};
use shufflr::{
    errors::ShuffleError,
    playback::{BundleCheck, BundleRole, BundleWatcher, apply_bundles, check_bundle, run_bundle_check},
    types::TrackId,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn seq(ids: &[&str]) -> Vec<TrackId> {
    ids.iter().map(|id| track(id)).collect()
}

#[test]
fn test_apply_bundles_without_bundles_is_identity() {
    let input = tracks("t", 8);
    assert_eq!(apply_bundles(&input, &[]), input);
}

#[test]
fn test_apply_bundles_non_strict_duplicates_natural_main() {
    let bundles = vec![bundle(1, "A", "B", false)];
    let out = apply_bundles(&seq(&["X", "A", "Y", "B", "Z"]), &bundles);
    assert_eq!(out, seq(&["X", "A", "B", "Y", "B", "Z"]));
}

#[test]
fn test_apply_bundles_non_strict_ignores_main_before_intro() {
    let bundles = vec![bundle(1, "A", "B", false)];
    let out = apply_bundles(&seq(&["B", "X", "A"]), &bundles);
    assert_eq!(out, seq(&["B", "X", "A", "B"]));
}

#[test]
fn test_apply_bundles_strict_fires_on_main_first() {
    let bundles = vec![bundle(1, "A", "B", true)];
    let out = apply_bundles(&seq(&["X", "B", "Y", "A", "Z"]), &bundles);
    // the pair already covered the later intro
    assert_eq!(out, seq(&["X", "A", "B", "Y", "Z"]));
}

#[test]
fn test_apply_bundles_strict_drops_covered_side() {
    let bundles = vec![bundle(1, "A", "B", true)];
    assert_eq!(
        apply_bundles(&seq(&["X", "A", "Y", "B", "Z"]), &bundles),
        seq(&["X", "A", "B", "Y", "Z"])
    );
    assert_eq!(apply_bundles(&seq(&["A", "X", "B"]), &bundles), seq(&["A", "B", "X"]));
    assert_eq!(apply_bundles(&seq(&["B", "X", "A"]), &bundles), seq(&["A", "B", "X"]));
}

#[test]
fn test_apply_bundles_strict_covers_one_occurrence() {
    let bundles = vec![bundle(1, "A", "B", true)];
    let out = apply_bundles(&seq(&["A", "B", "X", "B"]), &bundles);
    assert_eq!(out, seq(&["A", "B", "X", "B"]));
}

#[test]
fn test_apply_bundles_fires_each_bundle_once() {
    let bundles = vec![bundle(1, "A", "B", false)];
    let out = apply_bundles(&seq(&["A", "X", "A"]), &bundles);
    assert_eq!(out, seq(&["A", "B", "X", "A"]));
}

#[test]
fn test_apply_bundles_multiple_bundles() {
    let bundles = vec![bundle(1, "A", "B", false), bundle(2, "C", "D", true)];
    let out = apply_bundles(&seq(&["D", "X", "A", "Y"]), &bundles);
    assert_eq!(out, seq(&["C", "D", "X", "A", "B", "Y"]));
}

#[test]
fn test_apply_bundles_mixed_sequence() {
    let bundles = vec![bundle(1, "t3", "t7", false), bundle(2, "t5", "t1", true)];
    let input = tracks("t", 10);
    let out = apply_bundles(&input, &bundles);

    assert_eq!(
        out,
        seq(&["t0", "t5", "t1", "t2", "t3", "t7", "t4", "t6", "t7", "t8", "t9"])
    );
    assert!(out.len() >= input.len());
}

#[test]
fn test_apply_bundles_keeps_every_input_track_in_order() {
    let bundles = vec![bundle(1, "t2", "t6", true), bundle(2, "t8", "t0", false)];
    let input = tracks("t", 10);
    let out = apply_bundles(&input, &bundles);

    for t in &input {
        assert!(out.contains(t), "{} missing", t);
    }

    // tracks outside any bundle keep their relative order
    let members = seq(&["t0", "t2", "t6", "t8"]);
    let untouched = |ts: &[TrackId]| -> Vec<TrackId> {
        ts.iter().filter(|t| !members.contains(t)).cloned().collect()
    };
    assert_eq!(untouched(&out), untouched(&input));
}

#[test]
fn test_check_bundle_matches_intro_of_any_bundle() {
    let bundles = vec![bundle(1, "A", "B", false)];
    let (role, found) = check_bundle(&track("A"), &bundles).unwrap();
    assert_eq!(role, BundleRole::Intro);
    assert_eq!(found.id, 1);
}

#[test]
fn test_check_bundle_matches_main_only_when_strict() {
    let lenient = vec![bundle(1, "A", "B", false)];
    assert!(check_bundle(&track("B"), &lenient).is_none());

    let strict = vec![bundle(2, "A", "B", true)];
    let (role, _) = check_bundle(&track("B"), &strict).unwrap();
    assert_eq!(role, BundleRole::Main);
}

#[test]
fn test_check_bundle_prefers_intro_role() {
    // B is the main of one bundle and the intro of another
    let bundles = vec![bundle(1, "A", "B", true), bundle(2, "B", "C", false)];
    let (role, found) = check_bundle(&track("B"), &bundles).unwrap();
    assert_eq!(role, BundleRole::Intro);
    assert_eq!(found.id, 2);
}

#[test]
fn test_check_bundle_unrelated_track() {
    let bundles = vec![bundle(1, "A", "B", true)];
    assert!(check_bundle(&track("X"), &bundles).is_none());
}

#[tokio::test]
async fn test_run_bundle_check_nothing_playing() {
    let player = FakePlayer::new();
    let bundles = vec![bundle(1, "A", "B", true)];

    let check = run_bundle_check(&player, &bundles, TIMEOUT).await.unwrap();
    assert_eq!(check, BundleCheck::NothingPlaying);
    assert_eq!(player.calls(), vec![Call::CurrentlyPlaying]);
}

#[tokio::test]
async fn test_run_bundle_check_queues_main_after_intro() {
    let player = FakePlayer::new();
    player.set_playing("A");
    let bundles = vec![bundle(1, "A", "B", false)];

    let check = run_bundle_check(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(check, BundleCheck::QueuedMain { .. }));
    assert_eq!(player.enqueued(), vec![track("B")]);
    assert!(player.calls().contains(&Call::Enqueue(track("B"), None)));
}

#[tokio::test]
async fn test_run_bundle_check_skips_enqueue_when_main_is_next() {
    let player = FakePlayer::new();
    player.set_playing("A");
    player.set_queue(seq(&["B", "X"]));
    let bundles = vec![bundle(1, "A", "B", false)];

    let check = run_bundle_check(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(check, BundleCheck::MainAlreadyNext { .. }));
    assert!(player.enqueued().is_empty());
}

#[tokio::test]
async fn test_run_bundle_check_queues_main_when_snapshot_fails() {
    let player = FakePlayer::new();
    player.set_playing("A");
    player.set_queue(seq(&["B"]));
    player.fail_snapshot(true);
    let bundles = vec![bundle(1, "A", "B", false)];

    let check = run_bundle_check(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(check, BundleCheck::QueuedMain { .. }));
    assert_eq!(player.enqueued(), vec![track("B")]);
}

#[tokio::test]
async fn test_run_bundle_check_inserts_intro_before_strict_main() {
    let player = FakePlayer::new();
    player.set_playing("B");
    let bundles = vec![bundle(1, "A", "B", true)];

    let check = run_bundle_check(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(check, BundleCheck::InsertedIntro { .. }));
    assert_eq!(
        player.calls(),
        vec![
            Call::CurrentlyPlaying,
            Call::SkipNext,
            Call::PlayNow(track("A")),
            Call::Enqueue(track("B"), None),
        ]
    );
}

#[tokio::test]
async fn test_run_bundle_check_ignores_lenient_main() {
    let player = FakePlayer::new();
    player.set_playing("B");
    let bundles = vec![bundle(1, "A", "B", false)];

    let check = run_bundle_check(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(check, BundleCheck::NoBundle(_)));
    assert_eq!(player.calls(), vec![Call::CurrentlyPlaying]);
}

#[tokio::test]
async fn test_run_bundle_check_propagates_gateway_error() {
    let player = FakePlayer::new();
    player.set_playing("A");
    player.fail_all(Some(ShuffleError::remote(503, "unavailable")));
    let bundles = vec![bundle(1, "A", "B", false)];

    let err = run_bundle_check(&player, &bundles, TIMEOUT).await.unwrap_err();
    assert_eq!(err, ShuffleError::remote(503, "unavailable"));
}

#[tokio::test(start_paused = true)]
async fn test_run_bundle_check_times_out() {
    let player = FakePlayer::new();
    player.hang(true);

    let err = run_bundle_check(&player, &[], Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err, ShuffleError::Timeout);
}

#[tokio::test]
async fn test_watcher_reacts_once_per_track_change() {
    let player = FakePlayer::new();
    player.set_playing("A");
    let bundles = vec![bundle(1, "A", "B", false)];
    let mut watcher = BundleWatcher::new();

    let first = watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(first, Some(BundleCheck::QueuedMain { .. })));

    let second = watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(second.is_none());
    assert_eq!(player.enqueued().len(), 1);

    player.set_playing("X");
    let third = watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(third, Some(BundleCheck::NoBundle(_))));
}

#[tokio::test]
async fn test_watcher_does_not_requeue_after_inserting_intro() {
    let player = FakePlayer::new();
    player.set_playing("B");
    let bundles = vec![bundle(1, "A", "B", true)];
    let mut watcher = BundleWatcher::new();

    let first = watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(first, Some(BundleCheck::InsertedIntro { .. })));

    // the fake now plays the intro; it must not queue the main a second time
    let second = watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(second.is_none());
    assert_eq!(player.enqueued(), vec![track("B")]);
}

#[tokio::test]
async fn test_watcher_retries_track_after_failed_reaction() {
    let player = FakePlayer::new();
    player.set_playing("A");
    player.fail_enqueue_from(0);
    let bundles = vec![bundle(1, "A", "B", false)];
    let mut watcher = BundleWatcher::new();

    assert!(watcher.poll(&player, &bundles, TIMEOUT).await.is_err());

    player.clear_failures();
    let retried = watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    assert!(matches!(retried, Some(BundleCheck::QueuedMain { .. })));
    assert_eq!(player.remote_queue(), vec![track("B")]);
}

#[tokio::test]
async fn test_watcher_resets_when_playback_stops() {
    let player = FakePlayer::new();
    player.set_playing("A");
    let bundles = vec![bundle(1, "A", "B", false)];
    let mut watcher = BundleWatcher::new();

    watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    player.stop_playing();
    assert!(watcher.poll(&player, &bundles, TIMEOUT).await.unwrap().is_none());

    player.set_playing("A");
    let again = watcher.poll(&player, &bundles, TIMEOUT).await.unwrap();
    // checked again; the main queued by the first poll is still next
    assert!(matches!(again, Some(BundleCheck::MainAlreadyNext { .. })));
}
