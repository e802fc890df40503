//! Per-search mutable state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The shared "keep going" flag of one search.
///
/// Cloning yields another handle to the same flag. The search loop, the
/// dispatcher and the probes only read it; whoever wants the search to stop
/// clears it with [`Liveness::cancel`].
#[derive(Debug, Clone)]
pub struct Liveness {
  live: Arc<AtomicBool>,
}

impl Liveness {
  /// Creates a flag in the live state.
  pub fn new() -> Self {
    Self {
      live: Arc::new(AtomicBool::new(true)),
    }
  }

  /// Returns `true` while the search should continue.
  pub fn is_live(&self) -> bool {
    self.live.load(Ordering::Acquire)
  }

  /// Clears the flag. Returns `true` if this call did the clearing, `false`
  /// if the flag was already cleared.
  pub fn cancel(&self) -> bool {
    self.live.swap(false, Ordering::AcqRel)
  }
}

impl Default for Liveness {
  fn default() -> Self {
    Self::new()
  }
}

/// State owned by the search loop for the lifetime of one search.
#[derive(Debug)]
pub struct SearchState {
  liveness: Liveness,
  round: u64,
}

impl SearchState {
  /// Creates the state for a search controlled by `liveness`.
  pub fn new(liveness: Liveness) -> Self {
    Self { liveness, round: 0 }
  }

  /// The search's liveness flag.
  pub fn liveness(&self) -> &Liveness {
    &self.liveness
  }

  /// Returns `true` while the search should continue.
  pub fn is_live(&self) -> bool {
    self.liveness.is_live()
  }

  /// Number of rounds started so far.
  pub fn round(&self) -> u64 {
    self.round
  }

  /// Advances the round counter and returns the new round number (1-based).
  pub fn next_round(&mut self) -> u64 {
    self.round += 1;
    self.round
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cancel_is_idempotent() {
    let liveness = Liveness::new();
    let other = liveness.clone();
    assert!(other.is_live());
    assert!(liveness.cancel());
    assert!(!liveness.cancel());
    assert!(!other.is_live());
  }

  #[test]
  fn test_round_counter() {
    let mut state = SearchState::new(Liveness::new());
    assert_eq!(state.round(), 0);
    assert_eq!(state.next_round(), 1);
    assert_eq!(state.next_round(), 2);
    assert!(state.is_live());
  }
}
