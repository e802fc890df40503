//! The caller's side of a running search.

use crate::channel::OutcomeReceiver;
use crate::error::SearchError;
use crate::state::Liveness;
use crate::types::SearchOutcome;
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle to a search started with [`SearchEngine::start`](crate::engine::SearchEngine::start).
///
/// Dropping the handle cancels the search.
#[derive(Debug)]
pub struct SearchHandle {
  liveness: Liveness,
  receiver: Option<OutcomeReceiver>,
  outcome: Option<SearchOutcome>,
  thread: Option<JoinHandle<()>>,
}

impl SearchHandle {
  pub(crate) fn new(
    liveness: Liveness,
    receiver: OutcomeReceiver,
    thread: Option<JoinHandle<()>>,
  ) -> Self {
    Self {
      liveness,
      receiver: Some(receiver),
      outcome: None,
      thread,
    }
  }

  /// Asks the search to stop.
  ///
  /// Returns `true` if this call cancelled a running search. Cancelling twice,
  /// or after the search has terminated, does nothing and returns `false`.
  pub fn cancel(&self) -> bool {
    if self.is_finished() {
      return false;
    }
    self.liveness.cancel()
  }

  /// Returns `true` once the search was asked to stop.
  pub fn is_cancelled(&self) -> bool {
    !self.liveness.is_live()
  }

  /// Returns `true` once the terminal outcome has been delivered.
  pub fn is_finished(&self) -> bool {
    self.outcome.is_some() || self.receiver.as_ref().map_or(true, OutcomeReceiver::is_delivered)
  }

  /// A copy of the search's liveness flag, for cancelling from elsewhere.
  pub fn liveness(&self) -> Liveness {
    self.liveness.clone()
  }

  /// Returns the outcome if the search has terminated, without blocking.
  pub fn try_outcome(&mut self) -> Option<&SearchOutcome> {
    if self.outcome.is_none() {
      self.outcome = self.receiver.as_mut().and_then(OutcomeReceiver::try_recv);
    }
    self.outcome.as_ref()
  }

  /// Waits up to `timeout` for the outcome.
  pub fn wait_timeout(&mut self, timeout: Duration) -> Option<&SearchOutcome> {
    if self.outcome.is_none() {
      self.outcome = self
        .receiver
        .as_mut()
        .and_then(|receiver| receiver.recv_timeout(timeout));
    }
    self.outcome.as_ref()
  }

  /// Blocks until the search terminates and returns its outcome.
  pub fn wait(mut self) -> SearchOutcome {
    let outcome = match self.outcome.take() {
      Some(outcome) => outcome,
      None => match self.receiver.take() {
        Some(receiver) => receiver.recv(),
        None => SearchOutcome::Failed(SearchError::Disconnected),
      },
    };
    if let Some(thread) = self.thread.take() {
      if thread.join().is_err() {
        log::error!("Search thread panicked");
      }
    }
    outcome
  }
}

impl Drop for SearchHandle {
  fn drop(&mut self) {
    if !self.is_finished() {
      log::debug!("Search handle dropped, cancelling");
      self.liveness.cancel();
    }
  }
}
