//! The beatmap set document returned by the lookup API, and the rule that
//! turns one into an [`Item`].

use crate::filter::Predicate;
use crate::types::{Candidate, Item, Key, Mode, RankStatus};
use serde::{Deserialize, Serialize};

fn not_available() -> String {
  "N/A".to_string()
}

fn unknown_status() -> RankStatus {
  RankStatus::Unknown
}

/// A beatmap set as served by `GET /api/v2/beatmapsets/{id}`.
///
/// Only the fields the engine needs are modelled; everything else in the
/// document is ignored. Missing text fields fall back to `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapSet {
  /// Set id.
  pub id: Key,
  /// Song title.
  #[serde(default = "not_available")]
  pub title: String,
  /// Song artist.
  #[serde(default = "not_available")]
  pub artist: String,
  /// Ranking status of the set.
  #[serde(default = "unknown_status")]
  pub status: RankStatus,
  /// The difficulties of the set, in document order.
  #[serde(default)]
  pub beatmaps: Vec<Beatmap>,
  /// Cover images.
  #[serde(default)]
  pub covers: Covers,
}

/// A single difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
  /// Numeric play mode, see [`Mode::from_int`].
  pub mode_int: u8,
  /// Star rating.
  #[serde(default)]
  pub difficulty_rating: f64,
}

impl Beatmap {
  /// Play mode of the difficulty, `None` for modes this crate does not know.
  pub fn mode(&self) -> Option<Mode> {
    Mode::from_int(self.mode_int)
  }
}

/// Cover image URLs of a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Covers {
  /// Regular resolution cover.
  #[serde(default)]
  pub cover: Option<String>,
  /// Double resolution cover.
  #[serde(default, rename = "cover@2x")]
  pub cover_2x: Option<String>,
}

impl Covers {
  /// The best available cover: `cover@2x`, then `cover`.
  pub fn best(&self) -> Option<&str> {
    self
      .cover_2x
      .as_deref()
      .filter(|url| !url.is_empty())
      .or_else(|| self.cover.as_deref().filter(|url| !url.is_empty()))
  }
}

impl BeatmapSet {
  /// The candidates of this set, one per difficulty with a known mode.
  pub fn candidates(&self) -> impl Iterator<Item = (Candidate, &Beatmap)> + '_ {
    self.beatmaps.iter().filter_map(move |beatmap| {
      let mode = beatmap.mode()?;
      let candidate = Candidate {
        status: self.status,
        mode,
        rating: beatmap.difficulty_rating,
      };
      Some((candidate, beatmap))
    })
  }

  /// Picks the first difficulty `filter` accepts and builds the item for it.
  ///
  /// Returns `None` when no difficulty is accepted.
  pub fn select(&self, filter: &dyn Predicate) -> Option<Item> {
    let (candidate, _) = self
      .candidates()
      .find(|(candidate, _)| filter.accepts(candidate))?;

    Some(Item {
      id: self.id,
      title: self.title.clone(),
      artist: self.artist.clone(),
      status: candidate.status,
      mode: candidate.mode,
      rating: candidate.rating,
      url: Item::url_for(self.id),
      thumbnail: self.covers.best().map(str::to_string),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filter::BeatmapFilter;

  const DOCUMENT: &str = r#"{
    "id": 1234,
    "title": "Blue Zenith",
    "artist": "xi",
    "status": "ranked",
    "play_count": 100,
    "beatmaps": [
      { "mode_int": 0, "difficulty_rating": 6.1234, "version": "FOUR DIMENSIONS" },
      { "mode_int": 1, "difficulty_rating": 4.5 },
      { "mode_int": 7, "difficulty_rating": 1.0 }
    ],
    "covers": { "cover": "https://assets/cover.jpg", "cover@2x": "https://assets/cover@2x.jpg" }
  }"#;

  #[test]
  fn test_select_first_accepted_difficulty() {
    let set: BeatmapSet = serde_json::from_str(DOCUMENT).unwrap();
    let filter = BeatmapFilter::builder().modes([Mode::Taiko]).build();

    let item = set.select(&filter).unwrap();
    assert_eq!(item.id, 1234);
    assert_eq!(item.mode, Mode::Taiko);
    assert_eq!(item.rating, 4.5);
    assert_eq!(item.url, "https://osu.ppy.sh/beatmapsets/1234");
    assert_eq!(item.thumbnail.as_deref(), Some("https://assets/cover@2x.jpg"));
    assert_eq!(item.display_title(), "Blue Zenith [xi] (Ranked, Taiko) - 4.50★");
  }

  #[test]
  fn test_unlisted_status_is_rejected_by_default() {
    let mut set: BeatmapSet = serde_json::from_str(DOCUMENT).unwrap();
    set.status = RankStatus::Graveyard;
    assert_eq!(set.select(&BeatmapFilter::default()), None);
  }

  #[test]
  fn test_unknown_modes_are_skipped() {
    let set: BeatmapSet = serde_json::from_str(DOCUMENT).unwrap();
    assert_eq!(set.candidates().count(), 2);
  }

  #[test]
  fn test_lenient_document() {
    let set: BeatmapSet =
      serde_json::from_str(r#"{ "id": 9, "status": "something_new", "covers": { "cover": "c.jpg" } }"#)
        .unwrap();
    assert_eq!(set.title, "N/A");
    assert_eq!(set.status, RankStatus::Unknown);
    assert!(set.beatmaps.is_empty());
    assert_eq!(set.covers.best(), Some("c.jpg"));
    assert_eq!(set.select(&BeatmapFilter::default()), None);
  }
}
