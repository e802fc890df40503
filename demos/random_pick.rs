//! Picks a random beatmap set from a sparse in-memory catalog.
//!
//! Run with `cargo run --example random_pick -- [mode] [min] [max]`, e.g.
//! `cargo run --example random_pick -- taiko 3 5`.

use scattershot::prelude::*;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::time::{Duration, Instant};

const KEYSPACE: Key = 50_000;
const SETS: Key = 500;

/// Fills the catalog with `SETS` sets spread over the keyspace.
fn sample_catalog() -> InMemoryCatalog {
  let catalog = InMemoryCatalog::new();
  let statuses = [
    RankStatus::Ranked,
    RankStatus::Loved,
    RankStatus::Graveyard,
    RankStatus::Qualified,
    RankStatus::Pending,
  ];
  for n in 0..SETS {
    let id = n * (KEYSPACE / SETS) + (n * 37) % (KEYSPACE / SETS) + 1;
    let beatmaps = (0..1 + n % 3)
      .map(|diff| Beatmap {
        mode_int: ((n + diff) % 4) as u8,
        difficulty_rating: 1.0 + ((n * 7 + diff * 13) % 70) as f64 / 10.0,
      })
      .collect();
    catalog.insert(BeatmapSet {
      id,
      title: format!("Song #{}", n + 1),
      artist: format!("Artist {}", n % 40 + 1),
      status: statuses[(n % 5) as usize],
      beatmaps,
      covers: Covers {
        cover: Some(format!("https://assets.ppy.sh/beatmaps/{}/covers/cover.jpg", id)),
        cover_2x: None,
      },
    });
  }
  catalog
}

fn parse_filter(args: &[String]) -> BeatmapFilter {
  let mut builder = BeatmapFilter::builder();
  if let Some(mode) = args.first() {
    let mode = match mode.as_str() {
      "osu" => Mode::Osu,
      "taiko" => Mode::Taiko,
      "fruits" => Mode::Fruits,
      "mania" => Mode::Mania,
      other => {
        eprintln!("Unknown mode '{}', searching every mode", other);
        return builder.build();
      }
    };
    builder = builder.modes([mode]);
  }
  if let Some(min) = args.get(1).and_then(|s| s.parse().ok()) {
    builder = builder.min_rating(min);
  }
  if let Some(max) = args.get(2).and_then(|s| s.parse().ok()) {
    builder = builder.max_rating(max);
  }
  builder.build()
}

fn main() {
  TermLogger::init(
    LevelFilter::Info,
    Config::default(),
    TerminalMode::Mixed,
    ColorChoice::Auto,
  )
  .unwrap();

  let args: Vec<String> = std::env::args().skip(1).collect();
  let filter = parse_filter(&args);
  println!("Filter: {:?}", filter);

  let config = SearchConfig::default()
    .keyspace_max(KEYSPACE)
    .probe_timeout_ms(500)
    .max_rounds(2_000)
    .filter(filter);
  let engine = SearchEngine::builder()
    .probe(sample_catalog())
    .credentials(StaticToken::new("demo-token"))
    .config(&config)
    .build()
    .unwrap();

  let started = Instant::now();
  let mut handle = engine.start(SearchRequest::from_config(&config));
  let outcome = loop {
    if let Some(outcome) = handle.wait_timeout(Duration::from_secs(1)) {
      break outcome.clone();
    }
    println!("Still searching...");
  };

  match outcome {
    SearchOutcome::Found(item) => {
      println!("{}", item.display_title());
      println!("  {}", item.url);
      if let Some(thumbnail) = &item.thumbnail {
        println!("  {}", thumbnail);
      }
    }
    SearchOutcome::Cancelled => println!("Search cancelled"),
    SearchOutcome::Failed(err) => println!("Search failed: {}", err),
  }
  println!("Took {:?}", started.elapsed());
}
