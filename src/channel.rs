//! Single-assignment delivery of a search's terminal outcome.
//!
//! The sender side may be cloned and called from any thread; only the first
//! [`OutcomeSender::deliver`] takes effect. The receiver yields that outcome
//! exactly once.

use crate::error::SearchError;
use crate::types::SearchOutcome;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Creates a connected outcome sender/receiver pair.
pub fn outcome() -> (OutcomeSender, OutcomeReceiver) {
  let (tx, rx) = crossbeam_channel::bounded(1);
  let delivered = Arc::new(AtomicBool::new(false));
  let sender = OutcomeSender {
    delivered: Arc::clone(&delivered),
    tx,
  };
  let receiver = OutcomeReceiver {
    delivered,
    rx,
    taken: false,
  };
  (sender, receiver)
}

/// Write side of the outcome channel.
#[derive(Debug, Clone)]
pub struct OutcomeSender {
  delivered: Arc<AtomicBool>,
  tx: Sender<SearchOutcome>,
}

impl OutcomeSender {
  /// Delivers `outcome` if nothing was delivered yet.
  ///
  /// Returns `true` if this call delivered. Later calls are ignored and
  /// return `false`.
  pub fn deliver(&self, outcome: SearchOutcome) -> bool {
    if self
      .delivered
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      log::trace!("Dropping duplicate outcome {:?}", outcome);
      return false;
    }
    // Capacity 1 and a single successful writer: this never blocks. The
    // receiver may be gone already, which is fine.
    let _ = self.tx.try_send(outcome);
    true
  }

  /// Returns `true` once an outcome has been delivered.
  pub fn is_delivered(&self) -> bool {
    self.delivered.load(Ordering::Acquire)
  }
}

/// Read side of the outcome channel.
#[derive(Debug)]
pub struct OutcomeReceiver {
  delivered: Arc<AtomicBool>,
  rx: Receiver<SearchOutcome>,
  taken: bool,
}

impl OutcomeReceiver {
  /// Returns `true` once an outcome has been delivered, whether or not it
  /// has been received yet.
  pub fn is_delivered(&self) -> bool {
    self.delivered.load(Ordering::Acquire)
  }

  /// Blocks until the outcome is available.
  ///
  /// If every sender is dropped without delivering, yields
  /// `Failed(SearchError::Disconnected)`.
  pub fn recv(self) -> SearchOutcome {
    self
      .rx
      .recv()
      .unwrap_or(SearchOutcome::Failed(SearchError::Disconnected))
  }

  /// Waits up to `timeout` for the outcome.
  ///
  /// Returns `None` if it is not available yet or was already taken.
  pub fn recv_timeout(&mut self, timeout: Duration) -> Option<SearchOutcome> {
    if self.taken {
      return None;
    }
    match self.rx.recv_timeout(timeout) {
      Ok(outcome) => Some(self.take(outcome)),
      Err(RecvTimeoutError::Timeout) => None,
      Err(RecvTimeoutError::Disconnected) => {
        Some(self.take(SearchOutcome::Failed(SearchError::Disconnected)))
      }
    }
  }

  /// Returns the outcome if it is available right now.
  pub fn try_recv(&mut self) -> Option<SearchOutcome> {
    if self.taken {
      return None;
    }
    match self.rx.try_recv() {
      Ok(outcome) => Some(self.take(outcome)),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        Some(self.take(SearchOutcome::Failed(SearchError::Disconnected)))
      }
    }
  }

  fn take(&mut self, outcome: SearchOutcome) -> SearchOutcome {
    self.taken = true;
    outcome
  }
}
