//! Record extraction: raw games in, perspective-normalized records out.
//!
//! A raw game is two-sided; a [`GameRecord`] describes the same game from one
//! tracked identity's point of view. Games where no side is tracked produce
//! nothing.

use crate::config::{AnalysisConfig, PerspectivePolicy};
use crate::errors::Result;
use crate::parsing::{parse_or_default, SpeedClass, TimeControl};
use crate::pgn_source::RawGame;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Colour played by the tracked identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    fn name_header(&self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }

    fn elo_header(&self) -> &'static str {
        match self {
            Side::White => "WhiteElo",
            Side::Black => "BlackElo",
        }
    }

    fn rating_diff_header(&self) -> &'static str {
        match self {
            Side::White => "WhiteRatingDiff",
            Side::Black => "BlackRatingDiff",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game result from the tracked identity's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Side-aware reading of a PGN `Result` string. Anything other than a
    /// decisive `1-0` / `0-1` counts as a draw, including `*`.
    pub fn from_result(result: &str, side: Side) -> Self {
        match (result.trim(), side) {
            ("1-0", Side::White) | ("0-1", Side::Black) => Outcome::Win,
            ("0-1", Side::White) | ("1-0", Side::Black) => Outcome::Loss,
            _ => Outcome::Draw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Draw => "draw",
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked identity's participation in one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Position of the source game in its input
    pub source_index: usize,
    pub identity: String,
    pub opponent: String,
    pub side: Side,
    pub outcome: Outcome,
    pub identity_rating: i32,
    pub opponent_rating: i32,
    /// `identity_rating - opponent_rating`; negative when the opponent is stronger
    pub rating_gap: i32,
    pub rating_delta: i32,
    pub time_control: TimeControl,
    pub raw_time_control: String,
    pub speed_class: SpeedClass,
    pub opening_name: String,
    pub opening_code: String,
    pub termination_reason: String,
    pub ply_count: usize,
    pub raw_date: String,
    pub raw_utc_date: String,
    pub raw_utc_time: String,
    pub site: String,
    pub event: String,
}

impl GameRecord {
    /// Build the record for `side` of `raw`. Numeric fields never fail:
    /// unparsable values become 0.
    pub fn from_raw(raw: &RawGame, side: Side) -> Self {
        let identity = raw.header_or_empty(side.name_header());
        let opponent = raw.header_or_empty(side.opposite().name_header());

        let identity_rating: i32 = parse_or_default(raw.header(side.elo_header()));
        let opponent_rating: i32 = parse_or_default(raw.header(side.opposite().elo_header()));
        let rating_delta: i32 = parse_or_default(raw.header(side.rating_diff_header()));

        let raw_time_control = raw.header_or_empty("TimeControl");
        let time_control = TimeControl::parse(&raw_time_control);

        Self {
            source_index: raw.index,
            identity,
            opponent,
            side,
            outcome: Outcome::from_result(raw.header("Result").unwrap_or_default(), side),
            identity_rating,
            opponent_rating,
            rating_gap: identity_rating.saturating_sub(opponent_rating),
            rating_delta,
            speed_class: time_control.speed_class(),
            time_control,
            raw_time_control,
            opening_name: raw.header_or_empty("Opening"),
            opening_code: raw.header_or_empty("ECO"),
            termination_reason: raw.header_or_empty("Termination"),
            ply_count: raw.ply_count(),
            raw_date: raw.header_or_empty("Date"),
            raw_utc_date: raw.header_or_empty("UTCDate"),
            raw_utc_time: raw.header_or_empty("UTCTime"),
            site: raw.header_or_empty("Site"),
            event: raw.header_or_empty("Event"),
        }
    }
}

/// Counters kept while a source is being drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub entries_seen: usize,
    pub entries_untracked: usize,
    pub entries_failed: usize,
    pub records_emitted: usize,
}

/// Filters raw games down to tracked identities and normalizes perspective
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    tracked: HashSet<String>,
    policy: PerspectivePolicy,
}

impl RecordExtractor {
    pub fn new<I, S>(identities: I, policy: PerspectivePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracked: identities.into_iter().map(Into::into).collect(),
            policy,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.tracked_identities.iter().cloned(), config.perspective)
    }

    pub fn policy(&self) -> PerspectivePolicy {
        self.policy
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked.contains(name)
    }

    /// Sides of `raw` played by a tracked identity, White first. A game
    /// missing either player header has no sides.
    pub fn tracked_sides(&self, raw: &RawGame) -> Vec<Side> {
        if raw.header(Side::White.name_header()).is_none()
            || raw.header(Side::Black.name_header()).is_none()
        {
            return Vec::new();
        }

        let mut sides: Vec<Side> = [Side::White, Side::Black]
            .into_iter()
            .filter(|side| {
                raw.header(side.name_header())
                    .is_some_and(|name| self.is_tracked(name))
            })
            .collect();

        if self.policy == PerspectivePolicy::FirstMatch {
            sides.truncate(1);
        }
        sides
    }

    /// Records for a single raw game: none, one, or (for two tracked
    /// opponents under `EachTrackedSide`) two.
    pub fn extract_game(&self, raw: &RawGame) -> Vec<GameRecord> {
        self.tracked_sides(raw)
            .into_iter()
            .map(|side| GameRecord::from_raw(raw, side))
            .collect()
    }

    /// Lazily extract records from a stream of raw games.
    pub fn records<I>(&self, source: I) -> ExtractedRecords<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Result<RawGame>>,
    {
        ExtractedRecords {
            extractor: self,
            source: source.into_iter(),
            pending: VecDeque::new(),
            stats: ExtractionStats::default(),
        }
    }

    /// Drain a source completely, returning the records and final counters.
    pub fn extract_all<I>(&self, source: I) -> (Vec<GameRecord>, ExtractionStats)
    where
        I: IntoIterator<Item = Result<RawGame>>,
    {
        let mut records = self.records(source);
        let collected: Vec<GameRecord> = records.by_ref().collect();
        (collected, records.finish())
    }
}

/// Single forward pass over a raw-game source.
///
/// Failed entries are logged, counted and skipped; the pass continues with
/// the next entry.
pub struct ExtractedRecords<'a, I> {
    extractor: &'a RecordExtractor,
    source: I,
    pending: VecDeque<GameRecord>,
    stats: ExtractionStats,
}

impl<I> ExtractedRecords<'_, I> {
    pub fn stats(&self) -> ExtractionStats {
        self.stats
    }

    pub fn finish(self) -> ExtractionStats {
        debug!(
            "Extraction finished: {} entries, {} untracked, {} failed, {} records",
            self.stats.entries_seen,
            self.stats.entries_untracked,
            self.stats.entries_failed,
            self.stats.records_emitted
        );
        self.stats
    }
}

impl<I> Iterator for ExtractedRecords<'_, I>
where
    I: Iterator<Item = Result<RawGame>>,
{
    type Item = GameRecord;

    fn next(&mut self) -> Option<GameRecord> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                self.stats.records_emitted += 1;
                return Some(record);
            }

            let entry = self.source.next()?;
            self.stats.entries_seen += 1;

            match entry {
                Ok(raw) => {
                    let records = self.extractor.extract_game(&raw);
                    if records.is_empty() {
                        self.stats.entries_untracked += 1;
                    }
                    #[cfg(feature = "verbose")]
                    debug!("Game #{} produced {} record(s)", raw.index, records.len());
                    self.pending.extend(records);
                }
                Err(error) => {
                    self.stats.entries_failed += 1;
                    warn!("Skipping game entry: {}", error);
                }
            }
        }
    }
}
