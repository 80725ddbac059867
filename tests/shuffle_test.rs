mod common;

use std::{collections::HashMap, sync::Arc, time::Duration};

use common::{Call, FakePlayer, bundle, device, track, tracks};
use rand::{SeedableRng, rngs::StdRng};
use tokio::time::sleep;
use shufflr::{
    errors::ShuffleError,
    management::{CursorManager, SessionManager},
    playback::{
        JobState, QueueScheduler, SchedulerConfig, ShuffleSource, start_shuffle, stop_shuffle,
        shuffle::{build_queue, pick_device, resolve_source, shuffle_tracks},
    },
    types::{CachedPlaylist, Device, ShuffleChoice, TrackId, UserLibrary},
};

fn library() -> UserLibrary {
    let mut library = UserLibrary {
        saved_tracks: tracks("s", 10),
        ..Default::default()
    };
    library.playlists.insert(
        "p1".to_string(),
        CachedPlaylist {
            name: "Road Trip".to_string(),
            tracks: tracks("r", 4),
        },
    );
    library.playlists.insert(
        "p2".to_string(),
        CachedPlaylist {
            name: "Empty".to_string(),
            tracks: Vec::new(),
        },
    );
    library
}

async fn scheduler() -> QueueScheduler {
    let cursors = CursorManager::in_memory();
    cursors.register("user1").await.unwrap();
    QueueScheduler::new(
        SchedulerConfig::default(),
        Arc::new(cursors),
        Arc::new(SessionManager::in_memory()),
    )
}

#[test]
fn test_shuffle_tracks_is_permutation() {
    let mut rng = StdRng::seed_from_u64(7);
    let original = tracks("t", 50);
    let mut shuffled = original.clone();
    shuffle_tracks(&mut shuffled, &mut rng);

    assert_ne!(shuffled, original);
    let mut sorted = shuffled.clone();
    sorted.sort();
    let mut expected = original.clone();
    expected.sort();
    assert_eq!(sorted, expected);
}

#[test]
fn test_shuffle_tracks_is_uniform() {
    let mut rng = StdRng::seed_from_u64(42);
    let base = tracks("t", 3);
    let trials = 6000;
    let mut counts: HashMap<Vec<TrackId>, usize> = HashMap::new();

    for _ in 0..trials {
        let mut t = base.clone();
        shuffle_tracks(&mut t, &mut rng);
        *counts.entry(t).or_default() += 1;
    }

    assert_eq!(counts.len(), 6);
    for (perm, count) in counts {
        assert!(
            (850..=1150).contains(&count),
            "{:?} appeared {} times",
            perm,
            count
        );
    }
}

#[test]
fn test_shuffle_tracks_empty_and_single() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut empty: Vec<TrackId> = Vec::new();
    shuffle_tracks(&mut empty, &mut rng);
    assert!(empty.is_empty());

    let mut single = vec![track("only")];
    shuffle_tracks(&mut single, &mut rng);
    assert_eq!(single, vec![track("only")]);
}

#[test]
fn test_resolve_source_liked() {
    let mut rng = StdRng::seed_from_u64(1);
    let source = resolve_source(ShuffleChoice::Liked, None, &library(), &mut rng).unwrap();
    assert_eq!(source.name, "liked songs");
    assert_eq!(source.tracks, tracks("s", 10));
}

#[test]
fn test_resolve_source_playlist() {
    let mut rng = StdRng::seed_from_u64(1);
    let source =
        resolve_source(ShuffleChoice::Playlist, Some("p1"), &library(), &mut rng).unwrap();
    assert_eq!(source.name, "Road Trip");
    assert_eq!(source.tracks.len(), 4);

    let err = resolve_source(ShuffleChoice::Playlist, Some("nope"), &library(), &mut rng)
        .unwrap_err();
    assert_eq!(err, ShuffleError::NotFound("playlist nope".to_string()));

    let err = resolve_source(ShuffleChoice::Playlist, None, &library(), &mut rng).unwrap_err();
    assert!(matches!(err, ShuffleError::NotFound(_)));
}

#[test]
fn test_resolve_source_random_picks_a_playlist() {
    let mut rng = StdRng::seed_from_u64(3);
    let source = resolve_source(ShuffleChoice::Random, None, &library(), &mut rng).unwrap();
    assert!(["Road Trip", "Empty"].contains(&source.name.as_str()));

    let err = resolve_source(ShuffleChoice::Random, None, &UserLibrary::default(), &mut rng)
        .unwrap_err();
    assert!(matches!(err, ShuffleError::NotFound(_)));
}

#[test]
fn test_build_queue_rejects_empty_source() {
    let mut rng = StdRng::seed_from_u64(1);
    let source = ShuffleSource {
        name: "Empty".to_string(),
        tracks: Vec::new(),
    };
    let err = build_queue(source, &[], &mut rng).unwrap_err();
    assert_eq!(err, ShuffleError::EmptySource("Empty".to_string()));
}

#[test]
fn test_build_queue_keeps_repeated_entries() {
    let mut rng = StdRng::seed_from_u64(3);
    let source = ShuffleSource {
        name: "Repeats".to_string(),
        tracks: vec![track("a"), track("b"), track("a"), track("c")],
    };
    let queue = build_queue(source, &[], &mut rng).unwrap();

    assert_eq!(queue.len(), 4);
    assert_eq!(queue.tracks().iter().filter(|t| **t == track("a")).count(), 2);
}

#[test]
fn test_build_queue_keeps_bundles_together() {
    let bundles = vec![bundle(1, "s2", "s8", false), bundle(2, "s4", "s5", true)];

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let source = ShuffleSource {
            name: "liked songs".to_string(),
            tracks: tracks("s", 10),
        };
        let queue = build_queue(source, &bundles, &mut rng).unwrap();
        let tracks = queue.tracks();

        for b in &bundles {
            let first = tracks
                .iter()
                .position(|t| *t == b.intro || (b.strict && *t == b.main))
                .unwrap();
            assert_eq!(tracks[first], b.intro, "seed {}", seed);
            assert_eq!(tracks[first + 1], b.main, "seed {}", seed);
        }
    }
}

#[test]
fn test_pick_device_prefers_active() {
    let devices = vec![device("a", false), device("b", true), device("c", false)];
    assert_eq!(pick_device(&devices).unwrap(), "b");
}

#[test]
fn test_pick_device_falls_back_to_first() {
    let devices = vec![device("a", false), device("b", false)];
    assert_eq!(pick_device(&devices).unwrap(), "a");
}

#[test]
fn test_pick_device_skips_unusable() {
    let restricted = Device {
        is_restricted: true,
        ..device("r", true)
    };
    let anonymous = Device {
        id: None,
        ..device("x", true)
    };
    let devices = vec![restricted, anonymous, device("ok", false)];
    assert_eq!(pick_device(&devices).unwrap(), "ok");

    assert_eq!(pick_device(&[]).unwrap_err(), ShuffleError::NoDevices);
}

#[tokio::test(start_paused = true)]
async fn test_start_shuffle_starts_playback_and_arms_job() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::with_devices(vec![device("dev1", true)]));

    let summary = start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "user1",
        ShuffleChoice::Liked,
        None,
        &library(),
        &[],
    )
    .await
    .unwrap();

    assert_eq!(summary.message, "shuffling liked songs!");
    assert_eq!(summary.num_tracks, 10);

    let calls = player.calls();
    assert_eq!(calls[0], Call::Devices);
    let Call::Start(started, device_id) = &calls[1] else {
        panic!("expected playback start, got {:?}", calls[1]);
    };
    assert_eq!(started.len(), 1);
    assert_eq!(device_id, "dev1");

    let session = scheduler.session("user1").await.unwrap();
    assert_eq!(session.queue.first(), &started[0]);
    assert_eq!(session.device_id, "dev1");
    // the first tick pushed everything after the started track
    assert_eq!(player.enqueued(), session.queue.tracks()[1..].to_vec());
    assert_eq!(scheduler.cursors().get("user1").await, 10);
    assert_eq!(scheduler.job_state("user1").await, JobState::Armed);
}

#[tokio::test(start_paused = true)]
async fn test_start_shuffle_counts_bundle_insertions() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::with_devices(vec![device("dev1", true)]));
    let bundles = vec![bundle(1, "r0", "s0", false)];

    let summary = start_shuffle(
        &scheduler,
        player,
        "user1",
        ShuffleChoice::Playlist,
        Some("p1"),
        &library(),
        &bundles,
    )
    .await
    .unwrap();

    assert_eq!(summary.message, "shuffling Road Trip!");
    assert_eq!(summary.num_tracks, 5);
}

#[tokio::test]
async fn test_start_shuffle_unknown_user() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::with_devices(vec![device("dev1", true)]));

    let err = start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "stranger",
        ShuffleChoice::Liked,
        None,
        &library(),
        &[],
    )
    .await
    .unwrap_err();

    assert_eq!(err, ShuffleError::NotFound("user stranger".to_string()));
    assert!(player.calls().is_empty());
}

#[tokio::test]
async fn test_start_shuffle_without_devices() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::new());

    let err = start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "user1",
        ShuffleChoice::Liked,
        None,
        &library(),
        &[],
    )
    .await
    .unwrap_err();

    assert_eq!(err, ShuffleError::NoDevices);
    assert_eq!(player.calls(), vec![Call::Devices]);
    assert_eq!(scheduler.job_state("user1").await, JobState::Idle);
}

#[tokio::test]
async fn test_start_shuffle_empty_playlist() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::with_devices(vec![device("dev1", true)]));

    let err = start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "user1",
        ShuffleChoice::Playlist,
        Some("p2"),
        &library(),
        &[],
    )
    .await
    .unwrap_err();

    assert_eq!(err, ShuffleError::EmptySource("Empty".to_string()));
    assert!(player.calls().is_empty());
}

#[tokio::test]
async fn test_start_shuffle_remote_failure_arms_nothing() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::with_devices(vec![device("dev1", true)]));
    player.fail_all(Some(ShuffleError::remote(502, "bad gateway")));

    let err = start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "user1",
        ShuffleChoice::Liked,
        None,
        &library(),
        &[],
    )
    .await
    .unwrap_err();

    assert_eq!(err, ShuffleError::remote(502, "bad gateway"));
    assert_eq!(scheduler.job_state("user1").await, JobState::Idle);
    assert_eq!(scheduler.cursors().get("user1").await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_shuffle_replaces_running_one() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::with_devices(vec![device("dev1", true)]));
    let library = library();

    start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "user1",
        ShuffleChoice::Liked,
        None,
        &library,
        &[],
    )
    .await
    .unwrap();
    start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "user1",
        ShuffleChoice::Playlist,
        Some("p1"),
        &library,
        &[],
    )
    .await
    .unwrap();

    assert_eq!(scheduler.jobs().await.len(), 1);
    let session = scheduler.session("user1").await.unwrap();
    assert_eq!(session.queue.len(), 4);
    assert_eq!(scheduler.cursors().get("user1").await, 4);

    assert!(stop_shuffle(&scheduler, "user1").await.unwrap());
    assert_eq!(scheduler.job_state("user1").await, JobState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_starts_do_not_mix_sessions() {
    let scheduler = scheduler().await;
    let player = Arc::new(FakePlayer::with_devices(vec![device("dev1", true)]));
    player.set_delay(Duration::from_millis(10));

    let mut library = library();
    library.saved_tracks = tracks("a", 100);
    library.playlists.insert(
        "p3".to_string(),
        CachedPlaylist {
            name: "Long".to_string(),
            tracks: tracks("b", 100),
        },
    );

    let first = tokio::spawn({
        let scheduler = scheduler.clone();
        let player = Arc::clone(&player);
        let library = library.clone();
        async move {
            start_shuffle(&scheduler, player, "user1", ShuffleChoice::Liked, None, &library, &[])
                .await
        }
    });

    sleep(Duration::from_millis(50)).await;
    start_shuffle(
        &scheduler,
        Arc::clone(&player),
        "user1",
        ShuffleChoice::Playlist,
        Some("p3"),
        &library,
        &[],
    )
    .await
    .unwrap();
    first.await.unwrap().unwrap();

    let session = scheduler.session("user1").await.unwrap();
    assert!(session.queue.first().as_str().starts_with('b'));

    // everything after the second start belongs to the second session
    let calls = player.calls();
    let second_start = calls
        .iter()
        .rposition(|c| matches!(c, Call::Start(..)))
        .unwrap();
    let pushed: Vec<TrackId> = calls[second_start..]
        .iter()
        .filter_map(|call| match call {
            Call::Enqueue(track, _) => Some(track.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(pushed, session.queue.tracks()[1..50].to_vec());
    assert_eq!(scheduler.cursors().get("user1").await, 50);
    assert_eq!(scheduler.jobs().await.len(), 1);
}
