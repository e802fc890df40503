//! The immutable description of one search.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::filter::{BeatmapFilter, Predicate};
use crate::types::Key;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What to search for and how hard to try per round.
///
/// Created once per user-initiated search and never modified afterwards.
/// Cloning is cheap; the filter is shared.
#[derive(Clone)]
pub struct SearchRequest {
  filter: Arc<dyn Predicate>,
  keyspace_max: Key,
  round_size: usize,
  probe_timeout: Duration,
}

impl SearchRequest {
  /// Creates a new `SearchRequestBuilder` with the default configuration.
  pub fn builder() -> SearchRequestBuilder {
    SearchRequestBuilder::default()
  }

  /// Creates a request from a configuration, filter included.
  ///
  /// Use [`SearchRequestBuilder::config`] to take the numbers from a
  /// configuration but search with another filter.
  pub fn from_config(config: &SearchConfig) -> Self {
    Self::builder().config(config).build()
  }

  /// The filter predicate.
  pub fn filter(&self) -> &dyn Predicate {
    self.filter.as_ref()
  }

  /// A shared handle to the filter predicate.
  pub fn shared_filter(&self) -> Arc<dyn Predicate> {
    Arc::clone(&self.filter)
  }

  /// Upper bound `N` of the keyspace `[1, N]`.
  pub fn keyspace_max(&self) -> Key {
    self.keyspace_max
  }

  /// Probes per round.
  pub fn round_size(&self) -> usize {
    self.round_size
  }

  /// Time budget of one probe.
  pub fn probe_timeout(&self) -> Duration {
    self.probe_timeout
  }

  /// Rejects requests that can never produce a match.
  pub fn validate(&self) -> Result<()> {
    if self.keyspace_max == 0 {
      return Err(SearchError::invalid("keyspace is empty"));
    }
    if self.round_size == 0 {
      return Err(SearchError::invalid("round size must be at least 1"));
    }
    if self.probe_timeout.is_zero() {
      return Err(SearchError::invalid("probe timeout must be positive"));
    }
    self.filter.validate()
  }
}

impl fmt::Debug for SearchRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SearchRequest")
      .field("keyspace_max", &self.keyspace_max)
      .field("round_size", &self.round_size)
      .field("probe_timeout", &self.probe_timeout)
      .finish_non_exhaustive()
  }
}

/// A builder for [`SearchRequest`].
pub struct SearchRequestBuilder {
  filter: Arc<dyn Predicate>,
  keyspace_max: Key,
  round_size: usize,
  probe_timeout: Duration,
}

impl Default for SearchRequestBuilder {
  fn default() -> Self {
    let config = SearchConfig::default();
    Self {
      filter: Arc::new(BeatmapFilter::default()),
      keyspace_max: config.keyspace_max,
      round_size: config.round_size,
      probe_timeout: config.probe_timeout(),
    }
  }
}

impl SearchRequestBuilder {
  /// Takes keyspace, round size, probe timeout and filter from `config`.
  pub fn config(mut self, config: &SearchConfig) -> Self {
    self.filter = Arc::new(config.filter.clone());
    self.keyspace_max = config.keyspace_max;
    self.round_size = config.round_size;
    self.probe_timeout = config.probe_timeout();
    self
  }

  /// Sets the filter predicate.
  pub fn filter(mut self, filter: impl Predicate + 'static) -> Self {
    self.filter = Arc::new(filter);
    self
  }

  /// Sets an already shared filter predicate.
  pub fn shared_filter(mut self, filter: Arc<dyn Predicate>) -> Self {
    self.filter = filter;
    self
  }

  /// Sets the keyspace upper bound `N`.
  pub fn keyspace_max(mut self, keyspace_max: Key) -> Self {
    self.keyspace_max = keyspace_max;
    self
  }

  /// Sets the number of probes per round `B`.
  pub fn round_size(mut self, round_size: usize) -> Self {
    self.round_size = round_size;
    self
  }

  /// Sets the per-probe timeout.
  pub fn probe_timeout(mut self, probe_timeout: Duration) -> Self {
    self.probe_timeout = probe_timeout;
    self
  }

  /// Builds the request. Validation happens when the search starts.
  pub fn build(self) -> SearchRequest {
    SearchRequest {
      filter: self.filter,
      keyspace_max: self.keyspace_max,
      round_size: self.round_size,
      probe_timeout: self.probe_timeout,
    }
  }
}
