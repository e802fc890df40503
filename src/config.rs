//! Search configuration.

use crate::error::{Result, SearchError};
use crate::filter::BeatmapFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables of a search.
///
/// Every field has a default, so a configuration file only needs to name
/// what it changes:
///
/// ```rust
/// use scattershot::config::SearchConfig;
///
/// let config = SearchConfig::from_json_str(r#"{ "round_size": 8 }"#).unwrap();
/// assert_eq!(config.round_size, 8);
/// assert_eq!(config.keyspace_max, 3_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
  /// Upper bound `N` of candidate keys; keys are drawn from `[1, N]`.
  #[serde(default = "default_keyspace_max")]
  pub keyspace_max: u64,
  /// Probes per round `B`, which is also the probe concurrency.
  #[serde(default = "default_round_size")]
  pub round_size: usize,
  /// Time budget of a single probe, in milliseconds.
  #[serde(default = "default_probe_timeout_ms")]
  pub probe_timeout_ms: u64,
  /// Pause between rounds, in milliseconds. Zero starts the next round
  /// immediately.
  #[serde(default)]
  pub round_backoff_ms: u64,
  /// Give up after this many rounds. `None` searches until found or cancelled.
  #[serde(default)]
  pub max_rounds: Option<u64>,
  /// Seed for key sampling. `None` seeds from the operating system.
  #[serde(default)]
  pub seed: Option<u64>,
  /// Default filter for searches started from this configuration.
  #[serde(default)]
  pub filter: BeatmapFilter,
}

fn default_keyspace_max() -> u64 {
  3_000_000
}

fn default_round_size() -> usize {
  15
}

fn default_probe_timeout_ms() -> u64 {
  5_000
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      keyspace_max: default_keyspace_max(),
      round_size: default_round_size(),
      probe_timeout_ms: default_probe_timeout_ms(),
      round_backoff_ms: 0,
      max_rounds: None,
      seed: None,
      filter: BeatmapFilter::default(),
    }
  }
}

impl SearchConfig {
  /// Parses and validates a JSON configuration.
  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  /// Reads, parses and validates a JSON configuration file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
      .map_err(|e| SearchError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    log::debug!("Loaded search configuration from {}", path.display());
    Self::from_json_str(&json)
  }

  /// Checks the numeric settings. The filter is validated when a search
  /// starts.
  pub fn validate(&self) -> Result<()> {
    if self.keyspace_max == 0 {
      return Err(SearchError::Config("keyspace_max must be at least 1".into()));
    }
    if self.round_size == 0 {
      return Err(SearchError::Config("round_size must be at least 1".into()));
    }
    if self.probe_timeout_ms == 0 {
      return Err(SearchError::Config("probe_timeout_ms must be at least 1".into()));
    }
    if self.max_rounds == Some(0) {
      return Err(SearchError::Config("max_rounds must be at least 1".into()));
    }
    Ok(())
  }

  /// Sets the keyspace upper bound.
  pub fn keyspace_max(mut self, keyspace_max: u64) -> Self {
    self.keyspace_max = keyspace_max;
    self
  }

  /// Sets the number of probes per round.
  pub fn round_size(mut self, round_size: usize) -> Self {
    self.round_size = round_size;
    self
  }

  /// Sets the per-probe timeout in milliseconds.
  pub fn probe_timeout_ms(mut self, probe_timeout_ms: u64) -> Self {
    self.probe_timeout_ms = probe_timeout_ms;
    self
  }

  /// Sets the pause between rounds in milliseconds.
  pub fn round_backoff_ms(mut self, round_backoff_ms: u64) -> Self {
    self.round_backoff_ms = round_backoff_ms;
    self
  }

  /// Limits the number of rounds.
  pub fn max_rounds(mut self, max_rounds: u64) -> Self {
    self.max_rounds = Some(max_rounds);
    self
  }

  /// Fixes the sampling seed.
  pub fn seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  /// Sets the default filter.
  pub fn filter(mut self, filter: BeatmapFilter) -> Self {
    self.filter = filter;
    self
  }

  /// The per-probe timeout as a `Duration`.
  pub fn probe_timeout(&self) -> Duration {
    Duration::from_millis(self.probe_timeout_ms)
  }

  /// The inter-round pause as a `Duration`.
  pub fn round_backoff(&self) -> Duration {
    Duration::from_millis(self.round_backoff_ms)
  }
}
