//! Core data types for the scattershot search engine.

use crate::error::{ProbeError, SearchError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base URL of a beatmap set's public page.
pub const BEATMAPSET_URL: &str = "https://osu.ppy.sh/beatmapsets";

/// Type alias for keys in the searched keyspace.
pub type Key = u64;

/// The play mode of a single difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// osu!standard.
  Osu,
  /// osu!taiko.
  Taiko,
  /// osu!catch, called "fruits" by the API.
  Fruits,
  /// osu!mania.
  Mania,
}

impl Mode {
  /// All play modes, in `mode_int` order.
  pub const ALL: [Mode; 4] = [Mode::Osu, Mode::Taiko, Mode::Fruits, Mode::Mania];

  /// Maps the API's numeric mode to a `Mode`. Unknown values yield `None`.
  pub fn from_int(mode_int: u8) -> Option<Self> {
    Self::ALL.get(usize::from(mode_int)).copied()
  }

  /// Human readable name, e.g. "Taiko".
  pub fn label(self) -> &'static str {
    match self {
      Mode::Osu => "Osu",
      Mode::Taiko => "Taiko",
      Mode::Fruits => "Fruits",
      Mode::Mania => "Mania",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// The ranking status of a beatmap set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankStatus {
  /// Ranked.
  Ranked,
  /// Loved by the community.
  Loved,
  /// Qualified, about to be ranked.
  Qualified,
  /// Approved (legacy ranked status).
  Approved,
  /// Pending.
  Pending,
  /// Work in progress.
  Wip,
  /// Graveyarded.
  Graveyard,
  /// Any status this crate does not know about.
  #[serde(other)]
  Unknown,
}

impl RankStatus {
  /// Statuses accepted by default: the ones with a leaderboard.
  pub const LISTED: [RankStatus; 4] = [
    RankStatus::Ranked,
    RankStatus::Loved,
    RankStatus::Qualified,
    RankStatus::Approved,
  ];

  /// Human readable name, e.g. "Ranked".
  pub fn label(self) -> &'static str {
    match self {
      RankStatus::Ranked => "Ranked",
      RankStatus::Loved => "Loved",
      RankStatus::Qualified => "Qualified",
      RankStatus::Approved => "Approved",
      RankStatus::Pending => "Pending",
      RankStatus::Wip => "Wip",
      RankStatus::Graveyard => "Graveyard",
      RankStatus::Unknown => "Unknown",
    }
  }
}

impl fmt::Display for RankStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// The attributes a filter predicate decides on.
///
/// One candidate is built per difficulty of a probed set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  /// Status of the enclosing set.
  pub status: RankStatus,
  /// Play mode of the difficulty.
  pub mode: Mode,
  /// Star rating of the difficulty.
  pub rating: f64,
}

/// A discovered item.
///
/// Built by a probe once a key resolves to something the filter accepts.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  /// Canonical identifier (the probed key).
  pub id: Key,
  /// Title of the set.
  pub title: String,
  /// Artist the set is attributed to.
  pub artist: String,
  /// Status category.
  pub status: RankStatus,
  /// Play mode of the accepted difficulty.
  pub mode: Mode,
  /// Star rating of the accepted difficulty.
  pub rating: f64,
  /// Canonical URL of the set.
  pub url: String,
  /// Optional thumbnail reference.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail: Option<String>,
}

impl Item {
  /// Returns the canonical URL for a set id.
  pub fn url_for(id: Key) -> String {
    format!("{}/{}", BEATMAPSET_URL, id)
  }

  /// One-line summary, e.g. `"Title [Artist] (Ranked, Taiko) - 4.25★"`.
  pub fn display_title(&self) -> String {
    format!(
      "{} [{}] ({}, {}) - {:.2}★",
      self.title, self.artist, self.status, self.mode, self.rating
    )
  }

  /// The candidate view of this item.
  pub fn candidate(&self) -> Candidate {
    Candidate {
      status: self.status,
      mode: self.mode,
      rating: self.rating,
    }
  }
}

/// The result of probing a single key.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
  /// The key resolved to an item the filter accepts.
  Match(Item),
  /// The key does not exist or nothing under it passes the filter.
  NoMatch,
  /// The lookup failed; another key may well succeed.
  TransientError(ProbeError),
}

impl ProbeOutcome {
  /// Returns `true` for [`ProbeOutcome::Match`].
  pub fn is_match(&self) -> bool {
    matches!(self, ProbeOutcome::Match(_))
  }
}

/// The terminal outcome of a search. Exactly one is delivered per search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
  /// A matching item was found.
  Found(Item),
  /// The caller cancelled the search.
  Cancelled,
  /// The search could not run or gave up.
  Failed(SearchError),
}

impl SearchOutcome {
  /// The found item, if any.
  pub fn item(&self) -> Option<&Item> {
    match self {
      SearchOutcome::Found(item) => Some(item),
      _ => None,
    }
  }

  /// The failure reason, if any.
  pub fn error(&self) -> Option<&SearchError> {
    match self {
      SearchOutcome::Failed(err) => Some(err),
      _ => None,
    }
  }
}
