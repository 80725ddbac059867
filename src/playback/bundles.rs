use std::{collections::HashMap, time::Duration};

use crate::{
    errors::ShuffleError,
    playback::bounded,
    spotify::player::PlayerGateway,
    types::{Bundle, CurrentTrack, TrackId},
    warning,
};

/// Which side of a bundle the now-playing track matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleRole {
    Intro,
    Main,
}

/// Rewrites a shuffled sequence so bundled tracks play back to back.
///
/// Scans left to right. For each track the first bundle that has not fired
/// yet and is triggered by it (strict: intro or main, non-strict: intro
/// only) fires: `[intro, main]` is emitted in place of the track. Each
/// bundle fires at most once per pass. A strict bundle's pair covers one
/// later occurrence of its other side, which is dropped when the scan
/// reaches it. Tracks that trigger nothing are emitted unchanged, so
/// relative order is preserved and every input track is emitted at least
/// once.
///
/// A non-strict main that also occurs naturally later in the sequence ends
/// up in the output twice.
pub fn apply_bundles(sequence: &[TrackId], bundles: &[Bundle]) -> Vec<TrackId> {
    let mut fired = vec![false; bundles.len()];
    let mut covered: HashMap<&TrackId, usize> = HashMap::new();
    let mut out = Vec::with_capacity(sequence.len() + bundles.len());

    for track in sequence {
        if let Some(count) = covered.get_mut(track).filter(|c| **c > 0) {
            *count -= 1;
            continue;
        }

        let hit = bundles
            .iter()
            .enumerate()
            .find(|(i, b)| !fired[*i] && b.triggers_on(track));

        match hit {
            Some((i, bundle)) => {
                fired[i] = true;
                if bundle.strict {
                    let other = if *track == bundle.intro {
                        &bundle.main
                    } else {
                        &bundle.intro
                    };
                    *covered.entry(other).or_default() += 1;
                }
                out.push(bundle.intro.clone());
                out.push(bundle.main.clone());
            }
            None => out.push(track.clone()),
        }
    }

    out
}

/// Matches the now-playing track against a user's bundles.
///
/// Any bundle's intro matches as [`BundleRole::Intro`]. Otherwise only a
/// strict bundle's main matches, as [`BundleRole::Main`]; non-strict mains
/// are ignored.
pub fn check_bundle<'a>(current: &TrackId, bundles: &'a [Bundle]) -> Option<(BundleRole, &'a Bundle)> {
    if let Some(bundle) = bundles.iter().find(|b| b.intro == *current) {
        return Some((BundleRole::Intro, bundle));
    }

    bundles
        .iter()
        .find(|b| b.strict && b.main == *current)
        .map(|b| (BundleRole::Main, b))
}

/// Result of one reactive bundle check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleCheck {
    NothingPlaying,
    NoBundle(CurrentTrack),
    /// The intro is playing and its main was queued to follow it.
    QueuedMain { track: CurrentTrack, bundle: Bundle },
    /// The intro is playing and its main is already next in the queue.
    MainAlreadyNext { track: CurrentTrack, bundle: Bundle },
    /// A strict main started on its own: it was skipped, the intro started
    /// and the main was queued behind it.
    InsertedIntro { track: CurrentTrack, bundle: Bundle },
}

impl BundleCheck {
    pub fn message(&self) -> String {
        match self {
            BundleCheck::NothingPlaying => "nothing playing".to_string(),
            BundleCheck::NoBundle(track) => format!("{} is not part of a bundle", track.name),
            BundleCheck::QueuedMain { track, bundle } => {
                format!("{} is an intro, queued {}", track.name, bundle.main)
            }
            BundleCheck::MainAlreadyNext { track, bundle } => {
                format!("{} is an intro, {} is already next", track.name, bundle.main)
            }
            BundleCheck::InsertedIntro { track, bundle } => {
                format!("{} started without its intro, playing {} first", track.name, bundle.intro)
            }
        }
    }
}

/// Reads the now-playing track and applies the compensating queue
/// operations for it.
pub async fn run_bundle_check<G: PlayerGateway>(
    gateway: &G,
    bundles: &[Bundle],
    call_timeout: Duration,
) -> Result<BundleCheck, ShuffleError> {
    match bounded(call_timeout, gateway.currently_playing()).await? {
        Some(track) => react(gateway, track, bundles, call_timeout).await,
        None => Ok(BundleCheck::NothingPlaying),
    }
}

async fn react<G: PlayerGateway>(
    gateway: &G,
    track: CurrentTrack,
    bundles: &[Bundle],
    call_timeout: Duration,
) -> Result<BundleCheck, ShuffleError> {
    let Some((role, bundle)) = check_bundle(&track.id, bundles) else {
        return Ok(BundleCheck::NoBundle(track));
    };
    let bundle = bundle.clone();

    match role {
        BundleRole::Intro => {
            // a reordered shuffle already put the main right behind its intro
            let next = match bounded(call_timeout, gateway.queue_snapshot()).await {
                Ok(queue) => queue.into_iter().next(),
                Err(e) => {
                    warning!("Queue snapshot failed, queueing {} anyway: {}", bundle.main, e);
                    None
                }
            };
            if next.as_ref() == Some(&bundle.main) {
                return Ok(BundleCheck::MainAlreadyNext { track, bundle });
            }

            bounded(call_timeout, gateway.enqueue(&bundle.main, None)).await?;
            Ok(BundleCheck::QueuedMain { track, bundle })
        }
        BundleRole::Main => {
            bounded(call_timeout, gateway.skip_next()).await?;
            bounded(call_timeout, gateway.play_now(&bundle.intro)).await?;
            bounded(call_timeout, gateway.enqueue(&bundle.main, None)).await?;
            Ok(BundleCheck::InsertedIntro { track, bundle })
        }
    }
}

/// Poll-driven reactive bundle checks.
///
/// Only a change of the now-playing track triggers a check, so an intro
/// that keeps playing across several polls queues its main once. After an
/// intro was inserted in front of a strict main, that intro is treated as
/// already handled.
#[derive(Debug, Default)]
pub struct BundleWatcher {
    last_seen: Option<TrackId>,
}

impl BundleWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one poll. `Ok(None)` means the track did not change.
    pub async fn poll<G: PlayerGateway>(
        &mut self,
        gateway: &G,
        bundles: &[Bundle],
        call_timeout: Duration,
    ) -> Result<Option<BundleCheck>, ShuffleError> {
        let Some(track) = bounded(call_timeout, gateway.currently_playing()).await? else {
            self.last_seen = None;
            return Ok(None);
        };

        if self.last_seen.as_ref() == Some(&track.id) {
            return Ok(None);
        }
        self.last_seen = Some(track.id.clone());

        let check = match react(gateway, track, bundles, call_timeout).await {
            Ok(check) => check,
            Err(e) => {
                // let the next poll try this track again
                self.last_seen = None;
                return Err(e);
            }
        };
        if let BundleCheck::InsertedIntro { bundle, .. } = &check {
            self.last_seen = Some(bundle.intro.clone());
        }
        Ok(Some(check))
    }
}
