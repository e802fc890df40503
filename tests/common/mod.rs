#![allow(dead_code)]

use scattershot::prelude::*;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Builds an item the way a real probe would, for a fixed set of attributes.
pub fn item(id: Key, mode: Mode, rating: f64) -> Item {
  Item {
    id,
    title: format!("Set {}", id),
    artist: "Tester".to_string(),
    status: RankStatus::Ranked,
    mode,
    rating,
    url: Item::url_for(id),
    thumbnail: None,
  }
}

/// A beatmap set with a single difficulty.
pub fn single_set(id: Key, status: RankStatus, mode_int: u8, rating: f64) -> BeatmapSet {
  BeatmapSet {
    id,
    title: format!("Set {}", id),
    artist: "Tester".to_string(),
    status,
    beatmaps: vec![Beatmap {
      mode_int,
      difficulty_rating: rating,
    }],
    covers: Covers::default(),
  }
}

/// What a `StubProbe` answers for a key.
pub type Behavior = dyn Fn(Key) -> ProbeOutcome + Send + Sync;

/// A probe with scripted answers that records how it is used.
pub struct StubProbe {
  behavior: Box<Behavior>,
  delay: Duration,
  pub calls: AtomicUsize,
  pub in_flight: AtomicUsize,
  pub max_in_flight: AtomicUsize,
}

impl StubProbe {
  pub fn new(behavior: impl Fn(Key) -> ProbeOutcome + Send + Sync + 'static) -> Arc<Self> {
    Self::with_delay(Duration::ZERO, behavior)
  }

  pub fn with_delay(
    delay: Duration,
    behavior: impl Fn(Key) -> ProbeOutcome + Send + Sync + 'static,
  ) -> Arc<Self> {
    Arc::new(Self {
      behavior: Box::new(behavior),
      delay,
      calls: AtomicUsize::new(0),
      in_flight: AtomicUsize::new(0),
      max_in_flight: AtomicUsize::new(0),
    })
  }

  /// Matches only `target`, with an osu!standard difficulty of 5 stars.
  pub fn only(target: Key) -> Arc<Self> {
    Self::new(move |key| {
      if key == target {
        ProbeOutcome::Match(item(key, Mode::Osu, 5.0))
      } else {
        ProbeOutcome::NoMatch
      }
    })
  }

  /// Never matches.
  pub fn never() -> Arc<Self> {
    Self::new(|_| ProbeOutcome::NoMatch)
  }

  /// Always fails transiently.
  pub fn failing() -> Arc<Self> {
    Self::new(|_| ProbeOutcome::TransientError(ProbeError::Network("connection reset".into())))
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn max_in_flight(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }
}

impl Probe for StubProbe {
  fn probe(&self, key: Key, _filter: &dyn Predicate, _ctx: &ProbeContext) -> ProbeOutcome {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !self.delay.is_zero() {
      thread::sleep(self.delay);
    }
    let outcome = (self.behavior)(key);
    self.in_flight.fetch_sub(1, Ordering::SeqCst);
    outcome
  }
}

/// Observer recording lifecycle events.
#[derive(Default)]
pub struct Recorder {
  pub starts: AtomicUsize,
  pub rounds_started: AtomicU64,
  pub rounds_ended: AtomicU64,
  pub started: AtomicUsize,
  pub transient_errors: AtomicUsize,
  pub finishes: Mutex<Vec<(SearchOutcome, u64)>>,
}

impl Recorder {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Probes the rounds reported as started, summed over all rounds.
  pub fn started(&self) -> usize {
    self.started.load(Ordering::SeqCst)
  }

  pub fn rounds(&self) -> u64 {
    self.rounds_started.load(Ordering::SeqCst)
  }

  /// Polls until at least `rounds` rounds have ended or `timeout` passes.
  pub fn wait_for_rounds(&self, rounds: u64, timeout: Duration) -> bool {
    let until = Instant::now() + timeout;
    while Instant::now() < until {
      if self.rounds_ended.load(Ordering::SeqCst) >= rounds {
        return true;
      }
      thread::sleep(Duration::from_millis(1));
    }
    false
  }
}

impl SearchObserver for Recorder {
  fn on_start(&self, _request: &SearchRequest) {
    self.starts.fetch_add(1, Ordering::SeqCst);
  }

  fn on_round_start(&self, _round: u64) {
    self.rounds_started.fetch_add(1, Ordering::SeqCst);
  }

  fn on_round_end(&self, report: &RoundReport) {
    self.started.fetch_add(report.stats.started, Ordering::SeqCst);
    self
      .transient_errors
      .fetch_add(report.stats.transient_errors, Ordering::SeqCst);
    self.rounds_ended.fetch_add(1, Ordering::SeqCst);
  }

  fn on_finish(&self, outcome: &SearchOutcome, rounds: u64) {
    self.finishes.lock().unwrap().push((outcome.clone(), rounds));
  }
}

/// An engine around `probe` with a static token and `recorder` attached.
pub fn engine(probe: Arc<StubProbe>, recorder: Arc<Recorder>) -> SearchEngineBuilder {
  SearchEngine::builder()
    .shared_probe(probe)
    .credentials(StaticToken::new("test-token"))
    .with_shared_observer(recorder)
}

pub fn request(keyspace_max: Key, round_size: usize) -> SearchRequest {
  SearchRequest::builder()
    .keyspace_max(keyspace_max)
    .round_size(round_size)
    .probe_timeout(Duration::from_secs(5))
    .build()
}
