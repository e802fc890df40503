//! Filter predicates deciding which candidates a search accepts.
//!
//! A predicate is a pure function over a [`Candidate`]. Probes call it once
//! per difficulty of a probed set; the engine calls [`Predicate::validate`]
//! once before any probing so that filters which can never accept anything
//! fail fast.

use crate::error::{Result, SearchError};
use crate::types::{Candidate, Mode, RankStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ratings at or above this value mean "no upper bound" in [`BeatmapFilterBuilder::max_rating`].
pub const UNBOUNDED_RATING: f64 = 10.0;

/// A caller-supplied acceptance test over candidate attributes.
///
/// Implementations must be pure and side-effect free: probes call `accepts`
/// concurrently from many worker threads.
///
/// Closures `Fn(&Candidate) -> bool` implement this trait directly:
///
/// ```rust
/// use scattershot::prelude::*;
///
/// let hard_only = |c: &Candidate| c.rating >= 6.0;
/// let candidate = Candidate { status: RankStatus::Ranked, mode: Mode::Osu, rating: 6.5 };
/// assert!(hard_only.accepts(&candidate));
/// ```
pub trait Predicate: Send + Sync {
  /// Decides whether a candidate is acceptable.
  fn accepts(&self, candidate: &Candidate) -> bool;

  /// Checks that the predicate can accept anything at all.
  ///
  /// Returns [`SearchError::InvalidRequest`] when it cannot, in which case the
  /// search fails without issuing a single probe.
  fn validate(&self) -> Result<()> {
    Ok(())
  }
}

impl<F> Predicate for F
where
  F: Fn(&Candidate) -> bool + Send + Sync,
{
  fn accepts(&self, candidate: &Candidate) -> bool {
    self(candidate)
  }
}

/// Filter over play modes, rank statuses and a star rating range.
///
/// The range is inclusive on both ends; `max_rating: None` leaves it open
/// above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapFilter {
  /// Accepted play modes.
  #[serde(default = "default_modes")]
  pub modes: BTreeSet<Mode>,
  /// Accepted rank statuses.
  #[serde(default = "default_statuses")]
  pub statuses: BTreeSet<RankStatus>,
  /// Minimum star rating.
  #[serde(default)]
  pub min_rating: f64,
  /// Maximum star rating, `None` for unbounded.
  #[serde(default)]
  pub max_rating: Option<f64>,
}

fn default_modes() -> BTreeSet<Mode> {
  Mode::ALL.into_iter().collect()
}

fn default_statuses() -> BTreeSet<RankStatus> {
  RankStatus::LISTED.into_iter().collect()
}

impl Default for BeatmapFilter {
  /// Every mode, listed statuses only, any rating.
  fn default() -> Self {
    Self {
      modes: default_modes(),
      statuses: default_statuses(),
      min_rating: 0.0,
      max_rating: None,
    }
  }
}

impl BeatmapFilter {
  /// Creates a new `BeatmapFilterBuilder` starting from the default filter.
  pub fn builder() -> BeatmapFilterBuilder {
    BeatmapFilterBuilder::default()
  }
}

impl Predicate for BeatmapFilter {
  fn accepts(&self, candidate: &Candidate) -> bool {
    self.statuses.contains(&candidate.status)
      && self.modes.contains(&candidate.mode)
      && self.min_rating <= candidate.rating
      && self.max_rating.map_or(true, |max| candidate.rating <= max)
  }

  fn validate(&self) -> Result<()> {
    if self.modes.is_empty() {
      return Err(SearchError::invalid("select at least one mode"));
    }
    if self.statuses.is_empty() {
      return Err(SearchError::invalid("select at least one status"));
    }
    if self.min_rating.is_nan() || self.max_rating.is_some_and(f64::is_nan) {
      return Err(SearchError::invalid("star rating bounds must be numbers"));
    }
    if let Some(max) = self.max_rating {
      if max < self.min_rating {
        return Err(SearchError::invalid(format!(
          "max stars ({}) < min stars ({})",
          max, self.min_rating
        )));
      }
      // A continuous rating practically never hits a single point.
      if max == self.min_rating {
        return Err(SearchError::invalid(format!(
          "max stars = min stars ({})",
          max
        )));
      }
    }
    Ok(())
  }
}

/// A builder for [`BeatmapFilter`].
#[derive(Debug, Default)]
pub struct BeatmapFilterBuilder {
  filter: BeatmapFilter,
}

impl BeatmapFilterBuilder {
  /// Replaces the accepted modes.
  pub fn modes(mut self, modes: impl IntoIterator<Item = Mode>) -> Self {
    self.filter.modes = modes.into_iter().collect();
    self
  }

  /// Replaces the accepted statuses.
  pub fn statuses(mut self, statuses: impl IntoIterator<Item = RankStatus>) -> Self {
    self.filter.statuses = statuses.into_iter().collect();
    self
  }

  /// Sets the minimum star rating.
  pub fn min_rating(mut self, min: f64) -> Self {
    self.filter.min_rating = min;
    self
  }

  /// Sets the maximum star rating. Values at or above [`UNBOUNDED_RATING`]
  /// remove the upper bound.
  pub fn max_rating(mut self, max: f64) -> Self {
    self.filter.max_rating = if max >= UNBOUNDED_RATING { None } else { Some(max) };
    self
  }

  /// Builds the filter. Validation happens when a search starts.
  pub fn build(self) -> BeatmapFilter {
    self.filter
  }
}
