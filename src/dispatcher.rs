//! The batch dispatcher: one round of concurrent speculative probes.

use crate::error::{ProbeError, Result, SearchError};
use crate::probe::{Probe, ProbeContext};
use crate::request::SearchRequest;
use crate::types::{Item, Key, ProbeOutcome};
use crossbeam_channel::{self as channel, RecvTimeoutError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on how long the dispatcher waits before re-reading the
/// liveness flag.
pub const LIVENESS_POLL: Duration = Duration::from_millis(10);

/// How a round ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
  /// A probe matched. The first match received wins the round.
  Match(Item),
  /// Nothing matched (misses, timeouts, or a mix including some errors).
  NoMatch,
  /// Every probe of the round failed transiently; carries the first error.
  TransientError(ProbeError),
  /// The search was cancelled while the round was running.
  Interrupted,
}

/// Counters of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundStats {
  /// Probes submitted.
  pub launched: usize,
  /// Probes that began running while the round was open. Jobs still queued
  /// behind earlier stragglers when the round ends never start.
  pub started: usize,
  /// Probes that reported `NoMatch`.
  pub misses: usize,
  /// Probes that reported a transient error.
  pub transient_errors: usize,
  /// Probes still outstanding when the round deadline passed.
  pub timed_out: usize,
  /// Probes that reported a skip because the search was cancelled before
  /// they started.
  pub skipped: usize,
  /// Probes that ended without reporting (a panicking probe).
  pub lost: usize,
  /// Wall time of the round.
  pub elapsed: Duration,
}

/// The result of one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
  /// 1-based round number.
  pub round: u64,
  /// How the round ended.
  pub outcome: RoundOutcome,
  /// Round counters.
  pub stats: RoundStats,
}

/// What a worker sends back for one submitted probe.
enum WorkerReport {
  Done(Key, ProbeOutcome),
  Skipped,
}

const GATE_CLOSED: usize = 1 << (usize::BITS - 1);

/// Admission to one round's probes.
///
/// Workers enter while the round is open. Closing the gate turns every job
/// of the round that is still queued into a skip, so a finished round never
/// starts another probe.
struct RoundGate {
  // High bit: closed. Remaining bits: probes entered.
  state: AtomicUsize,
}

impl RoundGate {
  fn new() -> Self {
    Self {
      state: AtomicUsize::new(0),
    }
  }

  /// Counts a probe as started, unless the round is closed.
  fn enter(&self) -> bool {
    self
      .state
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
        (state & GATE_CLOSED == 0).then_some(state + 1)
      })
      .is_ok()
  }

  /// Closes the round and returns how many probes entered it.
  fn close(&self) -> usize {
    self.state.fetch_or(GATE_CLOSED, Ordering::AcqRel) & !GATE_CLOSED
  }
}

/// Runs rounds of `B` concurrent probes against random keys.
///
/// The dispatcher owns a worker pool of exactly `B` threads. Probes that
/// outlive their round keep occupying a worker until they return, so the
/// number of probes in flight never exceeds `B`, across rounds included.
/// Jobs of a round that were still queued behind such stragglers when the
/// round ended are dropped without probing.
pub struct BatchDispatcher {
  pool: ThreadPool,
  probe: Arc<dyn Probe>,
  rng: StdRng,
}

impl BatchDispatcher {
  /// Creates a dispatcher with `workers` probe threads.
  ///
  /// `seed` fixes the key sequence; `None` seeds from the operating system.
  pub fn new(probe: Arc<dyn Probe>, workers: usize, seed: Option<u64>) -> Result<Self> {
    if workers == 0 {
      return Err(SearchError::invalid("round size must be at least 1"));
    }
    let pool = ThreadPoolBuilder::new()
      .num_threads(workers)
      .thread_name(|index| format!("scattershot-probe-{}", index))
      .panic_handler(|_| log::error!("A probe panicked; its result is lost"))
      .build()
      .map_err(|e| SearchError::WorkerPool(e.to_string()))?;
    let rng = match seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_os_rng(),
    };
    Ok(Self { pool, probe, rng })
  }

  /// Number of probe worker threads.
  pub fn workers(&self) -> usize {
    self.pool.current_num_threads()
  }

  /// Draws one round's keys, uniformly from `[1, N]`, repeats allowed.
  pub fn draw_keys(&mut self, request: &SearchRequest) -> Vec<Key> {
    let max = request.keyspace_max().max(1);
    (0..request.round_size())
      .map(|_| self.rng.random_range(1..=max))
      .collect()
  }

  /// Runs one round.
  ///
  /// Submits `B` probes at once and waits until the first match, until every
  /// probe has reported, until the round deadline (round start plus the probe
  /// timeout) passes, or until the search is cancelled, whichever comes
  /// first. Outstanding probes are not waited for; their results go nowhere,
  /// and those that had not started yet never will.
  pub fn run_round(&mut self, request: &SearchRequest, ctx: &ProbeContext, round: u64) -> RoundReport {
    let round_start = Instant::now();
    let deadline = round_start + request.probe_timeout();
    let keys = self.draw_keys(request);
    let launched = keys.len();

    let gate = Arc::new(RoundGate::new());
    let (tx, rx) = channel::bounded::<WorkerReport>(launched);
    for key in keys {
      let tx = tx.clone();
      let gate = Arc::clone(&gate);
      let probe = Arc::clone(&self.probe);
      let filter = request.shared_filter();
      let ctx = ctx.clone();
      self.pool.spawn(move || {
        if !ctx.is_live() || !gate.enter() {
          let _ = tx.send(WorkerReport::Skipped);
          return;
        }
        let outcome = probe.probe(key, filter.as_ref(), &ctx);
        // The round may be over already; a closed channel discards the result.
        let _ = tx.send(WorkerReport::Done(key, outcome));
      });
    }
    drop(tx);

    let mut stats = RoundStats {
      launched,
      ..Default::default()
    };
    let mut first_error: Option<ProbeError> = None;
    let mut pending = launched;

    let outcome = loop {
      if pending == 0 {
        break Self::aggregate(&stats, first_error.take());
      }
      if !ctx.is_live() {
        break RoundOutcome::Interrupted;
      }
      let now = Instant::now();
      if now >= deadline {
        stats.timed_out = pending;
        break Self::aggregate(&stats, first_error.take());
      }

      match rx.recv_timeout((deadline - now).min(LIVENESS_POLL)) {
        Ok(WorkerReport::Done(key, ProbeOutcome::Match(item))) => {
          log::debug!("Round {}: key {} matched", round, key);
          break RoundOutcome::Match(item);
        }
        Ok(WorkerReport::Done(_, ProbeOutcome::NoMatch)) => {
          stats.misses += 1;
          pending -= 1;
        }
        Ok(WorkerReport::Done(key, ProbeOutcome::TransientError(err))) => {
          log::debug!("Round {}: probe of key {} failed: {}", round, key, err);
          stats.transient_errors += 1;
          first_error.get_or_insert(err);
          pending -= 1;
        }
        Ok(WorkerReport::Skipped) => {
          stats.skipped += 1;
          pending -= 1;
        }
        Err(RecvTimeoutError::Timeout) => {}
        Err(RecvTimeoutError::Disconnected) => {
          stats.lost = pending;
          pending = 0;
        }
      }
    };

    stats.started = gate.close();
    stats.elapsed = round_start.elapsed();
    RoundReport {
      round,
      outcome,
      stats,
    }
  }

  fn aggregate(stats: &RoundStats, first_error: Option<ProbeError>) -> RoundOutcome {
    match first_error {
      Some(err) if stats.transient_errors == stats.launched => RoundOutcome::TransientError(err),
      _ => RoundOutcome::NoMatch,
    }
  }
}

impl std::fmt::Debug for BatchDispatcher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BatchDispatcher")
      .field("workers", &self.workers())
      .finish_non_exhaustive()
  }
}
