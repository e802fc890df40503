//! Error types for scattershot.

use thiserror::Error;

/// Result type used by fallible scattershot operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that end a search or prevent one from starting.
///
/// Only request validation, credential and infrastructure failures are
/// represented here. Failures of individual probes are [`ProbeError`]s and
/// never terminate a search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
  /// The request can never match anything (empty mode set, inverted rating
  /// range, zero-sized keyspace...). Reported before any probe is issued.
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  /// The authorization needed to probe could not be obtained.
  #[error("credential error: {0}")]
  Credential(String),

  /// The configured round limit was reached without a match.
  #[error("no match found after {rounds} rounds")]
  Exhausted {
    /// Number of rounds that were run.
    rounds: u64,
  },

  /// The probe worker pool or the search thread could not be created.
  #[error("worker pool error: {0}")]
  WorkerPool(String),

  /// Configuration could not be read or parsed.
  #[error("configuration error: {0}")]
  Config(String),

  /// The search ended without delivering an outcome.
  #[error("search ended without an outcome")]
  Disconnected,
}

impl SearchError {
  /// Shorthand for [`SearchError::InvalidRequest`].
  pub fn invalid(reason: impl Into<String>) -> Self {
    Self::InvalidRequest(reason.into())
  }

  /// Shorthand for [`SearchError::Credential`].
  pub fn credential(reason: impl Into<String>) -> Self {
    Self::Credential(reason.into())
  }
}

impl From<serde_json::Error> for SearchError {
  fn from(err: serde_json::Error) -> Self {
    Self::Config(err.to_string())
  }
}

impl From<std::io::Error> for SearchError {
  fn from(err: std::io::Error) -> Self {
    Self::Config(err.to_string())
  }
}

/// A single probe's lookup failure.
///
/// Transient by definition: the dispatcher counts and logs these, and the
/// search carries on with the next round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
  /// The lookup did not answer in time.
  #[error("probe timed out")]
  Timeout,
  /// The remote side answered with an unexpected status code.
  #[error("unexpected status {0}")]
  Status(u16),
  /// The response could not be decoded.
  #[error("malformed response: {0}")]
  Decode(String),
  /// Transport-level failure.
  #[error("network error: {0}")]
  Network(String),
}
