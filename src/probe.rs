//! The `Probe` trait, which defines the lookup a search is built on.

use crate::credentials::AccessToken;
use crate::filter::Predicate;
use crate::state::Liveness;
use crate::types::{Key, ProbeOutcome};
use std::time::Duration;

/// Context handed to every probe call.
///
/// Gives the probe the search-wide authorization, the liveness flag of the
/// search it belongs to and the time it is allowed to take.
///
/// Clones share their flags. Besides the caller's liveness, every context
/// carries a flag of its own that the search loop clears when the search
/// terminates, whatever the outcome.
#[derive(Debug, Clone)]
pub struct ProbeContext {
  token: AccessToken,
  liveness: Liveness,
  running: Liveness,
  timeout: Duration,
}

impl ProbeContext {
  /// Creates a context.
  pub fn new(token: AccessToken, liveness: Liveness, timeout: Duration) -> Self {
    Self {
      token,
      liveness,
      running: Liveness::new(),
      timeout,
    }
  }

  /// The search's access token.
  pub fn token(&self) -> &AccessToken {
    &self.token
  }

  /// The time budget of a single probe. Long-running probes should honor it
  /// themselves; the dispatcher stops waiting for them once it has elapsed.
  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  /// Returns `true` while the search still wants this probe's result.
  ///
  /// Probes doing several steps (a lookup, then a thumbnail fetch...) can
  /// check this between steps and bail out with `NoMatch`.
  pub fn is_live(&self) -> bool {
    self.liveness.is_live() && self.running.is_live()
  }

  /// Marks the search as terminated. The caller's liveness flag is left
  /// untouched.
  pub(crate) fn finish(&self) {
    self.running.cancel();
  }
}

/// A lookup of a single key.
///
/// A `Probe` resolves a candidate key against the remote catalog (or any other
/// source) and reports whether it holds an item the filter accepts. Probes are
/// called concurrently from the dispatcher's worker threads, hence the `Send`
/// and `Sync` bounds; they must not share mutable state across calls.
///
/// Closures with the same signature as [`Probe::probe`] implement the trait:
///
/// ```rust
/// use scattershot::prelude::*;
///
/// let probe = |key: Key, _filter: &dyn Predicate, _ctx: &ProbeContext| {
///   if key == 42 {
///     ProbeOutcome::TransientError(ProbeError::Status(503))
///   } else {
///     ProbeOutcome::NoMatch
///   }
/// };
/// let ctx = ProbeContext::new(
///   AccessToken::new("token"),
///   Liveness::new(),
///   std::time::Duration::from_secs(1),
/// );
/// let filter = BeatmapFilter::default();
/// assert_eq!(probe.probe(7, &filter, &ctx), ProbeOutcome::NoMatch);
/// ```
pub trait Probe: Send + Sync {
  /// Looks up `key` and evaluates it against `filter`.
  ///
  /// Must return [`ProbeOutcome::Match`] only with an item whose attributes
  /// `filter` accepts. Lookup failures are reported as
  /// [`ProbeOutcome::TransientError`], never as panics.
  fn probe(&self, key: Key, filter: &dyn Predicate, ctx: &ProbeContext) -> ProbeOutcome;
}

impl<F> Probe for F
where
  F: Fn(Key, &dyn Predicate, &ProbeContext) -> ProbeOutcome + Send + Sync,
{
  fn probe(&self, key: Key, filter: &dyn Predicate, ctx: &ProbeContext) -> ProbeOutcome {
    self(key, filter, ctx)
  }
}
