//! Defines the observer hooks of the search lifecycle.

use crate::dispatcher::RoundReport;
use crate::request::SearchRequest;
use crate::types::SearchOutcome;

/// A trait for observers that follow a search as it runs.
///
/// Every hook has an empty default, so an observer only implements what it
/// cares about. Hooks run on the search thread between rounds; they should
/// return quickly, since the next round waits for them.
///
/// # Examples
///
/// Counting rounds:
///
/// ```rust
/// use scattershot::prelude::*;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// #[derive(Default)]
/// struct RoundCounter(AtomicU64);
///
/// impl SearchObserver for RoundCounter {
///   fn on_round_start(&self, _round: u64) {
///     self.0.fetch_add(1, Ordering::Relaxed);
///   }
/// }
/// ```
pub trait SearchObserver: Send + Sync {
  /// Called once the request is validated, before credentials are fetched.
  fn on_start(&self, _request: &SearchRequest) {}

  /// Called before each round is dispatched.
  fn on_round_start(&self, _round: u64) {}

  /// Called after each round with its outcome and counters.
  fn on_round_end(&self, _report: &RoundReport) {}

  /// Called exactly once with the terminal outcome and the number of rounds
  /// run, right before the outcome is delivered to the caller.
  ///
  /// Also called for requests rejected by validation, with zero rounds and on
  /// the thread that started the search. [`on_start`](Self::on_start) is not
  /// called for those.
  fn on_finish(&self, _outcome: &SearchOutcome, _rounds: u64) {}
}
