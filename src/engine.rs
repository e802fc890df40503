//! The search engine: owns the search loop and its collaborators.

use crate::channel;
use crate::config::SearchConfig;
use crate::credentials::{AccessToken, CredentialProvider};
use crate::dispatcher::{BatchDispatcher, RoundOutcome, LIVENESS_POLL};
use crate::error::{Result, SearchError};
use crate::handle::SearchHandle;
use crate::observer::SearchObserver;
use crate::probe::{Probe, ProbeContext};
use crate::request::SearchRequest;
use crate::state::{Liveness, SearchState};
use crate::types::SearchOutcome;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// The random-sampling search engine.
///
/// `SearchEngine` repeatedly dispatches rounds of concurrent probes against
/// random keys until one of them finds an item the request's filter accepts,
/// the caller cancels, or the search fails. Its collaborators are pluggable:
/// the [`Probe`] doing the lookups, the [`CredentialProvider`] authorizing
/// them, and any number of [`SearchObserver`]s following progress.
///
/// A search goes through `Idle -> Running -> {Found, Cancelled, Failed}`:
///
/// 1.  **Validation**: the request is checked; a filter that can never accept
///     anything fails with `InvalidRequest` before any probe runs.
/// 2.  **`on_start` hook**.
/// 3.  **Credentials**: one token is fetched for the whole search. Failure
///     ends the search with `Credential`, again without probing.
/// 4.  **Rounds**: `B` probes per round on a pool of `B` workers. A match ends
///     the search, anything else starts the next round (after the optional
///     backoff). `on_round_start`/`on_round_end` hooks wrap every round.
/// 5.  **Cancellation**: clearing the liveness flag ends the search at the
///     next check, within a round or between rounds. A match reported after
///     cancellation is discarded.
/// 6.  **`on_finish` hook**, then delivery of the single outcome.
///
/// Engines are cheap to clone and can run any number of searches, each with
/// its own state.
///
/// # Examples
///
/// ```rust
/// use scattershot::prelude::*;
///
/// let catalog = InMemoryCatalog::from_json(r#"[
///   { "id": 3, "title": "Song", "artist": "Someone", "status": "ranked",
///     "beatmaps": [{ "mode_int": 0, "difficulty_rating": 4.2 }] }
/// ]"#).unwrap();
///
/// let engine = SearchEngine::builder()
///   .probe(catalog)
///   .credentials(StaticToken::new("token"))
///   .build()
///   .unwrap();
///
/// let request = SearchRequest::builder().keyspace_max(5).round_size(4).build();
/// let handle = engine.start(request);
///
/// match handle.wait() {
///   SearchOutcome::Found(item) => assert_eq!(item.id, 3),
///   other => panic!("unexpected outcome {:?}", other),
/// }
/// ```
#[derive(Clone)]
pub struct SearchEngine {
  probe: Arc<dyn Probe>,
  credentials: Option<Arc<dyn CredentialProvider>>,
  observers: Vec<Arc<dyn SearchObserver>>,
  round_backoff: Duration,
  max_rounds: Option<u64>,
  seed: Option<u64>,
}

impl SearchEngine {
  /// Creates a new `SearchEngineBuilder` to construct an engine.
  pub fn builder() -> SearchEngineBuilder {
    SearchEngineBuilder::new()
  }

  /// Starts a search on a background thread.
  ///
  /// Validation is synchronous: an invalid request returns a handle whose
  /// outcome is already `Failed(InvalidRequest)`, and no thread is started.
  pub fn start(&self, request: SearchRequest) -> SearchHandle {
    let liveness = Liveness::new();
    let (sender, receiver) = channel::outcome();

    if let Err(err) = request.validate() {
      log::warn!("Rejecting search request: {}", err);
      let outcome = SearchOutcome::Failed(err);
      self.notify_finish(&outcome, 0);
      sender.deliver(outcome);
      return SearchHandle::new(liveness, receiver, None);
    }

    let engine = self.clone();
    let search_liveness = liveness.clone();
    let fallback = sender.clone();
    let spawned = thread::Builder::new()
      .name("scattershot-search".to_string())
      .spawn(move || {
        let mut state = SearchState::new(search_liveness);
        let outcome = engine.run_validated(&request, &mut state);
        engine.notify_finish(&outcome, state.round());
        sender.deliver(outcome);
      });

    match spawned {
      Ok(thread) => SearchHandle::new(liveness, receiver, Some(thread)),
      Err(err) => {
        let outcome = SearchOutcome::Failed(SearchError::WorkerPool(err.to_string()));
        self.notify_finish(&outcome, 0);
        fallback.deliver(outcome);
        SearchHandle::new(liveness, receiver, None)
      }
    }
  }

  /// Runs a search on the calling thread until it terminates.
  ///
  /// `liveness` may be cancelled from another thread to stop the search.
  pub fn run(&self, request: &SearchRequest, liveness: &Liveness) -> SearchOutcome {
    let mut state = SearchState::new(liveness.clone());
    let outcome = match request.validate() {
      Ok(()) => self.run_validated(request, &mut state),
      Err(err) => {
        log::warn!("Rejecting search request: {}", err);
        SearchOutcome::Failed(err)
      }
    };
    self.notify_finish(&outcome, state.round());
    outcome
  }

  /// The search loop proper, for a request that passed validation.
  fn run_validated(&self, request: &SearchRequest, state: &mut SearchState) -> SearchOutcome {
    log::info!(
      "Starting search over [1, {}] with {} probes per round",
      request.keyspace_max(),
      request.round_size()
    );
    for observer in &self.observers {
      observer.on_start(request);
    }

    let token = match self.fetch_token() {
      Ok(token) => token,
      Err(err) => {
        log::warn!("Cannot search without credentials: {}", err);
        return SearchOutcome::Failed(err);
      }
    };

    let mut dispatcher =
      match BatchDispatcher::new(Arc::clone(&self.probe), request.round_size(), self.seed) {
        Ok(dispatcher) => dispatcher,
        Err(err) => return SearchOutcome::Failed(err),
      };
    let ctx = ProbeContext::new(token, state.liveness().clone(), request.probe_timeout());

    let outcome = self.run_rounds(request, state, &mut dispatcher, &ctx);
    // Probes still queued or running see the search as over from here on.
    ctx.finish();
    outcome
  }

  fn run_rounds(
    &self,
    request: &SearchRequest,
    state: &mut SearchState,
    dispatcher: &mut BatchDispatcher,
    ctx: &ProbeContext,
  ) -> SearchOutcome {
    loop {
      if !state.is_live() {
        return SearchOutcome::Cancelled;
      }
      if let Some(max_rounds) = self.max_rounds {
        if state.round() >= max_rounds {
          return SearchOutcome::Failed(SearchError::Exhausted {
            rounds: state.round(),
          });
        }
      }

      let round = state.next_round();
      for observer in &self.observers {
        observer.on_round_start(round);
      }

      let report = dispatcher.run_round(request, ctx, round);
      log::debug!(
        "Round {} finished in {:?}: {} started, {} misses, {} errors, {} timed out",
        round,
        report.stats.elapsed,
        report.stats.started,
        report.stats.misses,
        report.stats.transient_errors,
        report.stats.timed_out
      );
      for observer in &self.observers {
        observer.on_round_end(&report);
      }

      match report.outcome {
        RoundOutcome::Match(item) => {
          if !state.is_live() {
            log::debug!("Discarding match for key {} reported after cancellation", item.id);
            return SearchOutcome::Cancelled;
          }
          return SearchOutcome::Found(item);
        }
        RoundOutcome::Interrupted => return SearchOutcome::Cancelled,
        RoundOutcome::TransientError(err) => {
          log::debug!("Every probe of round {} failed, first error: {}", round, err);
        }
        RoundOutcome::NoMatch => {}
      }

      self.pause(state.liveness());
    }
  }

  fn fetch_token(&self) -> Result<AccessToken> {
    let provider = self
      .credentials
      .as_ref()
      .ok_or_else(|| SearchError::credential("no credential provider configured"))?;
    provider.access_token().map_err(|err| match err {
      SearchError::Credential(_) => err,
      other => SearchError::credential(other.to_string()),
    })
  }

  /// Sleeps for the inter-round backoff, waking early on cancellation.
  fn pause(&self, liveness: &Liveness) {
    if self.round_backoff.is_zero() {
      return;
    }
    let until = Instant::now() + self.round_backoff;
    while liveness.is_live() {
      let now = Instant::now();
      if now >= until {
        break;
      }
      thread::sleep((until - now).min(LIVENESS_POLL));
    }
  }

  fn notify_finish(&self, outcome: &SearchOutcome, rounds: u64) {
    match outcome {
      SearchOutcome::Found(item) => {
        log::info!("Found {} after {} rounds", item.display_title(), rounds)
      }
      SearchOutcome::Cancelled => log::info!("Search cancelled after {} rounds", rounds),
      SearchOutcome::Failed(err) => log::info!("Search failed after {} rounds: {}", rounds, err),
    }
    for observer in &self.observers {
      observer.on_finish(outcome, rounds);
    }
  }
}

impl std::fmt::Debug for SearchEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SearchEngine")
      .field("observers", &self.observers.len())
      .field("round_backoff", &self.round_backoff)
      .field("max_rounds", &self.max_rounds)
      .field("seed", &self.seed)
      .finish_non_exhaustive()
  }
}

/// A builder for creating `SearchEngine` instances.
///
/// A probe is required; everything else has a default. Without credentials
/// every search fails with [`SearchError::Credential`].
#[derive(Default)]
pub struct SearchEngineBuilder {
  probe: Option<Arc<dyn Probe>>,
  credentials: Option<Arc<dyn CredentialProvider>>,
  observers: Vec<Arc<dyn SearchObserver>>,
  round_backoff: Duration,
  max_rounds: Option<u64>,
  seed: Option<u64>,
}

impl SearchEngineBuilder {
  /// Creates a new, empty `SearchEngineBuilder`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the probe doing the lookups.
  pub fn probe(self, probe: impl Probe + 'static) -> Self {
    self.shared_probe(Arc::new(probe))
  }

  /// Sets a probe the caller keeps a handle to.
  pub fn shared_probe(mut self, probe: Arc<dyn Probe>) -> Self {
    self.probe = Some(probe);
    self
  }

  /// Sets the credential provider.
  pub fn credentials(mut self, credentials: impl CredentialProvider + 'static) -> Self {
    self.credentials = Some(Arc::new(credentials));
    self
  }

  /// Adds an observer.
  pub fn with_observer(mut self, observer: impl SearchObserver + 'static) -> Self {
    self.observers.push(Arc::new(observer));
    self
  }

  /// Adds an observer the caller keeps a handle to.
  pub fn with_shared_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
    self.observers.push(observer);
    self
  }

  /// Sets the pause between rounds. Zero (the default) repeats immediately.
  pub fn round_backoff(mut self, backoff: Duration) -> Self {
    self.round_backoff = backoff;
    self
  }

  /// Gives up with [`SearchError::Exhausted`] after `max_rounds` rounds.
  pub fn max_rounds(mut self, max_rounds: u64) -> Self {
    self.max_rounds = Some(max_rounds);
    self
  }

  /// Fixes the sampling seed.
  pub fn seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  /// Applies the loop settings of a configuration (backoff, round limit,
  /// seed). Request settings are taken by [`SearchRequest::from_config`].
  pub fn config(mut self, config: &SearchConfig) -> Self {
    self.round_backoff = config.round_backoff();
    self.max_rounds = config.max_rounds;
    self.seed = config.seed;
    self
  }

  /// Builds the engine.
  pub fn build(self) -> Result<SearchEngine> {
    let probe = self
      .probe
      .ok_or_else(|| SearchError::Config("a probe is required".to_string()))?;
    Ok(SearchEngine {
      probe,
      credentials: self.credentials,
      observers: self.observers,
      round_backoff: self.round_backoff,
      max_rounds: self.max_rounds,
      seed: self.seed,
    })
  }
}
