use crossbeam_channel as channel;
use scattershot::prelude::*;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

mod common;
use common::{engine, request, single_set, Recorder, StubProbe};

#[test]
fn test_empty_mode_set_fails_without_probing() {
  let probe = StubProbe::only(42);
  let recorder = Recorder::new();
  let engine = engine(probe.clone(), recorder.clone()).build().unwrap();

  let request = SearchRequest::builder()
    .filter(BeatmapFilter::builder().modes([]).build())
    .build();
  let handle = engine.start(request);
  assert!(handle.is_finished());

  let outcome = handle.wait();
  assert!(matches!(outcome, SearchOutcome::Failed(SearchError::InvalidRequest(_))));
  assert_eq!(probe.calls(), 0);
  assert_eq!(recorder.rounds(), 0);
  assert_eq!(recorder.starts.load(std::sync::atomic::Ordering::SeqCst), 0);
  let finishes = recorder.finishes.lock().unwrap();
  assert_eq!(finishes.len(), 1);
  assert_eq!(finishes[0].1, 0);
}

#[test]
fn test_inverted_rating_range_fails_without_probing() {
  let probe = StubProbe::only(42);
  let engine = engine(probe.clone(), Recorder::new()).build().unwrap();

  let filter = BeatmapFilter::builder().min_rating(7.0).max_rating(2.0).build();
  let request = SearchRequest::builder().filter(filter).build();
  let outcome = engine.run(&request, &Liveness::new());

  assert!(matches!(outcome, SearchOutcome::Failed(SearchError::InvalidRequest(_))));
  assert_eq!(probe.calls(), 0);
}

#[test]
fn test_finds_the_only_matching_key() {
  let probe = StubProbe::only(42);
  let recorder = Recorder::new();
  let engine = engine(probe.clone(), recorder.clone()).build().unwrap();

  let outcome = engine.start(request(3_000, 15)).wait();

  let item = outcome.item().expect("search should find key 42");
  assert_eq!(item.id, 42);
  assert_eq!(item.url, "https://osu.ppy.sh/beatmapsets/42");
  assert!(recorder.rounds() >= 1);
  assert_eq!(recorder.finishes.lock().unwrap().len(), 1);
}

#[test]
fn test_seeded_search_finds_single_key_in_full_keyspace() {
  let seed = 2024;
  let request = request(3_000_000, 15);

  // Same seed, same key sequence: pick a key the engine will draw in round 40.
  let mut sampler = BatchDispatcher::new(StubProbe::never(), 15, Some(seed)).unwrap();
  let rounds: Vec<Vec<Key>> = (0..40).map(|_| sampler.draw_keys(&request)).collect();
  let target = rounds[39][7];
  let expected_round = rounds
    .iter()
    .position(|keys| keys.contains(&target))
    .unwrap() as u64
    + 1;

  let probe = StubProbe::only(target);
  let recorder = Recorder::new();
  let engine = engine(probe.clone(), recorder.clone())
    .seed(seed)
    .build()
    .unwrap();

  let outcome = engine.run(&request, &Liveness::new());
  assert_eq!(outcome.item().map(|item| item.id), Some(target));
  assert_eq!(recorder.rounds(), expected_round);
  assert_eq!(recorder.finishes.lock().unwrap()[0].1, expected_round);
}

#[test]
#[ignore = "samples a 3M keyspace; takes a while"]
fn test_finds_the_only_matching_key_in_full_keyspace() {
  let probe = StubProbe::only(42);
  let engine = engine(probe, Recorder::new()).build().unwrap();

  let outcome = engine.start(request(3_000_000, 15)).wait();
  assert_eq!(outcome.item().map(|item| item.id), Some(42));
}

#[test]
fn test_found_item_satisfies_filter() {
  let catalog = Arc::new(InMemoryCatalog::new());
  for id in 1..=400u64 {
    let status = if id % 5 == 0 {
      RankStatus::Graveyard
    } else {
      RankStatus::Ranked
    };
    let mode_int = (id % 4) as u8;
    let rating = (id % 9) as f64 + 0.5;
    catalog.insert(single_set(id, status, mode_int, rating));
  }

  let filter = BeatmapFilter::builder()
    .modes([Mode::Taiko])
    .min_rating(3.0)
    .max_rating(5.0)
    .build();
  let engine = SearchEngine::builder()
    .shared_probe(catalog)
    .credentials(StaticToken::new("token"))
    .build()
    .unwrap();
  let request = SearchRequest::builder()
    .filter(filter.clone())
    .keyspace_max(400)
    .round_size(8)
    .build();

  for _ in 0..5 {
    let outcome = engine.start(request.clone()).wait();
    let item = outcome.item().expect("a matching set exists");
    assert!(filter.accepts(&item.candidate()), "{:?} does not pass the filter", item);
    assert_eq!(item.mode, Mode::Taiko);
    assert_ne!(item.status, RankStatus::Graveyard);
  }
}

#[test]
fn test_in_flight_probes_never_exceed_round_size() {
  let probe = StubProbe::with_delay(Duration::from_millis(3), |_| ProbeOutcome::NoMatch);
  let recorder = Recorder::new();
  let engine = engine(probe.clone(), recorder.clone())
    .max_rounds(10)
    .build()
    .unwrap();

  let outcome = engine.start(request(1_000_000, 4)).wait();

  assert_eq!(outcome, SearchOutcome::Failed(SearchError::Exhausted { rounds: 10 }));
  assert_eq!(probe.calls(), 40);
  assert_eq!(recorder.started(), 40);
  assert!(probe.max_in_flight() >= 1);
  assert!(probe.max_in_flight() <= 4, "saw {} probes in flight", probe.max_in_flight());
}

#[test]
fn test_timed_out_stragglers_do_not_raise_concurrency() {
  // Probes outlive their round; the next rounds must queue behind them.
  let probe = StubProbe::with_delay(Duration::from_millis(40), |_| ProbeOutcome::NoMatch);
  let engine = engine(probe.clone(), Recorder::new())
    .max_rounds(4)
    .build()
    .unwrap();
  let request = SearchRequest::builder()
    .keyspace_max(1_000)
    .round_size(3)
    .probe_timeout(Duration::from_millis(5))
    .build();

  let outcome = engine.start(request).wait();
  assert!(matches!(outcome, SearchOutcome::Failed(SearchError::Exhausted { .. })));
  assert!(probe.max_in_flight() <= 3);
}

#[test]
fn test_no_lookups_start_after_search_ends() {
  let probe = StubProbe::with_delay(Duration::from_millis(60), |_| ProbeOutcome::NoMatch);
  let recorder = Recorder::new();
  let engine = engine(probe.clone(), recorder.clone())
    .max_rounds(20)
    .build()
    .unwrap();
  let request = SearchRequest::builder()
    .keyspace_max(1_000)
    .round_size(2)
    .probe_timeout(Duration::from_millis(10))
    .build();

  let outcome = engine.run(&request, &Liveness::new());
  assert_eq!(outcome, SearchOutcome::Failed(SearchError::Exhausted { rounds: 20 }));

  // Let the stragglers of the last rounds return.
  thread::sleep(Duration::from_millis(150));
  let settled = probe.calls();
  assert_eq!(settled, recorder.started(), "every lookup belongs to an open round");
  assert!(settled < 40, "queued jobs of closed rounds ran: {}", settled);

  thread::sleep(Duration::from_millis(200));
  assert_eq!(probe.calls(), settled);
}

#[test]
fn test_lookup_context_ends_with_search() {
  let seen: Arc<Mutex<Option<ProbeContext>>> = Arc::new(Mutex::new(None));
  let captured = Arc::clone(&seen);
  let engine = SearchEngine::builder()
    .probe(move |key: Key, _filter: &dyn Predicate, ctx: &ProbeContext| {
      assert!(ctx.is_live());
      *captured.lock().unwrap() = Some(ctx.clone());
      ProbeOutcome::Match(common::item(key, Mode::Osu, 2.0))
    })
    .credentials(StaticToken::new("token"))
    .build()
    .unwrap();

  let liveness = Liveness::new();
  let outcome = engine.run(&request(1, 1), &liveness);
  assert!(matches!(outcome, SearchOutcome::Found(_)));

  let ctx = seen.lock().unwrap().clone().expect("the lookup ran");
  assert!(!ctx.is_live());
  assert!(liveness.is_live());
}

#[test]
fn test_transient_errors_never_found_and_cancel_yields_cancelled() {
  let probe = StubProbe::failing();
  let recorder = Recorder::new();
  let engine = engine(probe.clone(), recorder.clone()).build().unwrap();

  let handle = engine.start(request(3_000_000, 15));
  assert!(recorder.wait_for_rounds(3, Duration::from_secs(10)));
  assert!(handle.cancel());

  let outcome = handle.wait();
  assert_eq!(outcome, SearchOutcome::Cancelled);
  assert!(recorder.transient_errors.load(std::sync::atomic::Ordering::SeqCst) >= 3 * 15);

  // No round starts once the search has terminated.
  let rounds = recorder.rounds();
  thread::sleep(Duration::from_millis(30));
  assert_eq!(recorder.rounds(), rounds);

  let finishes = recorder.finishes.lock().unwrap();
  assert_eq!(finishes.len(), 1);
  assert_eq!(finishes[0].0, SearchOutcome::Cancelled);
  assert!(finishes[0].1 >= 3);
}

/// Blocks inside the probe until released, then matches.
struct GateProbe {
  entered: channel::Sender<()>,
  release: channel::Receiver<()>,
}

impl Probe for GateProbe {
  fn probe(&self, key: Key, _filter: &dyn Predicate, _ctx: &ProbeContext) -> ProbeOutcome {
    let _ = self.entered.send(());
    let _ = self.release.recv_timeout(Duration::from_secs(5));
    ProbeOutcome::Match(common::item(key, Mode::Mania, 2.0))
  }
}

#[test]
fn test_match_after_cancellation_is_discarded() {
  let (entered_tx, entered_rx) = channel::unbounded();
  let (release_tx, release_rx) = channel::unbounded();
  let engine = SearchEngine::builder()
    .probe(GateProbe {
      entered: entered_tx,
      release: release_rx,
    })
    .credentials(StaticToken::new("token"))
    .build()
    .unwrap();
  let request = SearchRequest::builder()
    .keyspace_max(10)
    .round_size(1)
    .probe_timeout(Duration::from_secs(10))
    .build();

  let handle = engine.start(request);
  entered_rx
    .recv_timeout(Duration::from_secs(5))
    .expect("probe should start");
  assert!(handle.cancel());
  release_tx.send(()).unwrap();

  assert_eq!(handle.wait(), SearchOutcome::Cancelled);
}

#[test]
fn test_cancel_is_idempotent() {
  let engine = engine(StubProbe::never(), Recorder::new()).build().unwrap();

  let handle = engine.start(request(1_000, 5));
  assert!(handle.cancel());
  assert!(!handle.cancel());
  assert!(handle.is_cancelled());
  assert_eq!(handle.wait(), SearchOutcome::Cancelled);
}

#[test]
fn test_cancel_after_found_has_no_effect() {
  let engine = engine(StubProbe::only(1), Recorder::new()).build().unwrap();

  let mut handle = engine.start(request(1, 2));
  let outcome = handle
    .wait_timeout(Duration::from_secs(5))
    .cloned()
    .expect("key 1 is the whole keyspace");
  assert!(matches!(outcome, SearchOutcome::Found(_)));

  assert!(!handle.cancel());
  assert!(!handle.cancel());
  assert!(!handle.is_cancelled());
  assert_eq!(handle.try_outcome(), Some(&outcome));
  assert_eq!(handle.wait(), outcome);
}

#[test]
fn test_missing_credentials_fail_without_probing() {
  let probe = StubProbe::only(1);
  let engine = SearchEngine::builder()
    .shared_probe(probe.clone())
    .credentials(|| -> scattershot::error::Result<AccessToken> {
      Err(SearchError::credential("token endpoint refused client"))
    })
    .build()
    .unwrap();

  let outcome = engine.start(request(1, 1)).wait();
  assert_eq!(
    outcome,
    SearchOutcome::Failed(SearchError::Credential("token endpoint refused client".into()))
  );
  assert_eq!(probe.calls(), 0);

  let without_provider = SearchEngine::builder()
    .shared_probe(probe.clone())
    .build()
    .unwrap();
  let outcome = without_provider.run(&request(1, 1), &Liveness::new());
  assert!(matches!(outcome, SearchOutcome::Failed(SearchError::Credential(_))));
  assert_eq!(probe.calls(), 0);
}

#[test]
fn test_round_limit_exhausts() {
  let recorder = Recorder::new();
  let engine = engine(StubProbe::never(), recorder.clone())
    .max_rounds(3)
    .build()
    .unwrap();

  let outcome = engine.run(&request(1_000, 2), &Liveness::new());
  assert_eq!(outcome, SearchOutcome::Failed(SearchError::Exhausted { rounds: 3 }));
  assert_eq!(recorder.rounds(), 3);
  assert_eq!(recorder.starts.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_backoff_wakes_up_on_cancel() {
  let recorder = Recorder::new();
  let engine = engine(StubProbe::never(), recorder.clone())
    .round_backoff(Duration::from_secs(30))
    .build()
    .unwrap();

  let mut handle = engine.start(request(1_000, 2));
  assert!(recorder.wait_for_rounds(1, Duration::from_secs(5)));

  let started = Instant::now();
  handle.cancel();
  let outcome = handle.wait_timeout(Duration::from_secs(5)).cloned();
  assert_eq!(outcome, Some(SearchOutcome::Cancelled));
  assert!(started.elapsed() < Duration::from_secs(5));
  assert_eq!(recorder.rounds(), 1);
}

#[test]
fn test_dropping_handle_cancels_search() {
  let recorder = Recorder::new();
  let engine = engine(StubProbe::never(), recorder.clone()).build().unwrap();

  let handle = engine.start(request(1_000, 2));
  let liveness = handle.liveness();
  drop(handle);
  assert!(!liveness.is_live());

  let until = Instant::now() + Duration::from_secs(5);
  while recorder.finishes.lock().unwrap().is_empty() && Instant::now() < until {
    thread::sleep(Duration::from_millis(1));
  }
  let finishes = recorder.finishes.lock().unwrap();
  assert_eq!(finishes.len(), 1);
  assert_eq!(finishes[0].0, SearchOutcome::Cancelled);
}

#[test]
fn test_run_on_calling_thread_with_external_cancel() {
  let engine = engine(StubProbe::never(), Recorder::new()).build().unwrap();
  let liveness = Liveness::new();
  let canceller = liveness.clone();

  let cancel_thread = thread::spawn(move || {
    thread::sleep(Duration::from_millis(20));
    canceller.cancel();
  });
  let outcome = engine.run(&request(1_000_000, 3), &liveness);
  cancel_thread.join().unwrap();

  assert_eq!(outcome, SearchOutcome::Cancelled);
}

#[test]
fn test_engine_requires_probe() {
  let result = SearchEngine::builder()
    .credentials(StaticToken::new("token"))
    .build();
  assert!(matches!(result, Err(SearchError::Config(_))));
}
