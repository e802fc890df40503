//! In-memory catalog probe.

use crate::beatmap::BeatmapSet;
use crate::error::{ProbeError, Result};
use crate::filter::Predicate;
use crate::probe::{Probe, ProbeContext};
use crate::types::{Key, ProbeOutcome};
use dashmap::{DashMap, DashSet};

/// A [`Probe`] over beatmap sets held in memory.
///
/// Lookups are lock-striped through `DashMap`, so any number of dispatcher
/// workers can probe concurrently while the catalog is being filled.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
  sets: DashMap<Key, BeatmapSet>,
  failing: DashSet<Key>,
}

impl InMemoryCatalog {
  /// Creates an empty catalog.
  pub fn new() -> Self {
    Self::default()
  }

  /// Loads a catalog from a JSON array of beatmap set documents.
  pub fn from_json(json: &str) -> Result<Self> {
    let sets: Vec<BeatmapSet> = serde_json::from_str(json)?;
    let catalog = Self::new();
    for set in sets {
      catalog.insert(set);
    }
    Ok(catalog)
  }

  /// Adds or replaces a set, keyed by its id.
  pub fn insert(&self, set: BeatmapSet) -> Option<BeatmapSet> {
    self.sets.insert(set.id, set)
  }

  /// Removes a set.
  pub fn remove(&self, key: Key) -> Option<BeatmapSet> {
    self.sets.remove(&key).map(|(_, set)| set)
  }

  /// Returns a copy of the set stored under `key`.
  pub fn get(&self, key: Key) -> Option<BeatmapSet> {
    self.sets.get(&key).map(|set| set.value().clone())
  }

  /// Makes every probe of `key` fail with a transient error.
  pub fn fail_key(&self, key: Key) {
    self.failing.insert(key);
  }

  /// Number of stored sets.
  pub fn len(&self) -> usize {
    self.sets.len()
  }

  /// Returns `true` if the catalog holds no sets.
  pub fn is_empty(&self) -> bool {
    self.sets.is_empty()
  }
}

impl Probe for InMemoryCatalog {
  fn probe(&self, key: Key, filter: &dyn Predicate, ctx: &ProbeContext) -> ProbeOutcome {
    if !ctx.is_live() {
      return ProbeOutcome::NoMatch;
    }
    if self.failing.contains(&key) {
      return ProbeOutcome::TransientError(ProbeError::Status(503));
    }
    match self.sets.get(&key) {
      Some(set) => match set.select(filter) {
        Some(item) => ProbeOutcome::Match(item),
        None => ProbeOutcome::NoMatch,
      },
      None => ProbeOutcome::NoMatch,
    }
  }
}
