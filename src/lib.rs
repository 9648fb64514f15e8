//! # Chess Insights
//!
//! Turns PGN game archives into a per-account table of games with derived
//! temporal features, and computes the descriptive statistics that reports
//! and charts are built from.
//!
//! ## Pipeline
//!
//! - **Record extraction**: every game where a tracked account played becomes a
//!   [`GameRecord`] seen from that account's side (colour, win/loss/draw,
//!   own and opponent rating, rating change, time control and speed class).
//! - **Feature derivation**: each record is enriched with calendar buckets
//!   (hour, weekday, season, time of day), the gap since the account's
//!   previous game, and a session number.
//! - **Consumers**: [`EnrichedTable`] exports to CSV/JSON, the [`stats`]
//!   module aggregates, and [`InsightsReport`] renders a text report.
//!
//! ## Quick Start
//!
//! ```rust
//! use chess_insights::{AnalysisConfig, Pipeline, PgnSource, Outcome};
//!
//! let pgn = r#"[White "IsmatS"]
//! [Black "Bot"]
//! [Result "1-0"]
//! [UTCDate "2024.01.10"]
//! [UTCTime "10:00:00"]
//!
//! 1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0
//! "#;
//!
//! let config = AnalysisConfig::new(["IsmatS"]);
//! let pipeline = Pipeline::from_config(&config).unwrap();
//! let (table, stats) = pipeline.run(PgnSource::new(pgn.as_bytes()));
//!
//! assert_eq!(stats.records_emitted, 1);
//! assert_eq!(table.records()[0].record.outcome, Outcome::Win);
//! assert_eq!(table.records()[0].record.ply_count, 7);
//! ```

pub mod errors;

pub mod calendar;
pub mod config;
pub mod deriver;
pub mod extractor;
pub mod parsing;
pub mod pgn_source;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod table;

pub use calendar::{CalendarFields, Season, TimePeriod};
pub use config::{AnalysisConfig, PerspectivePolicy, ReportOptions};
pub use deriver::{EnrichedRecord, FeatureDeriver};
pub use errors::{AnalysisError, Result};
pub use extractor::{ExtractedRecords, ExtractionStats, GameRecord, Outcome, RecordExtractor, Side};
pub use parsing::{SpeedClass, TimeControl};
pub use pgn_source::{PgnSource, PgnSources, RawGame};
pub use pipeline::Pipeline;
pub use report::{IdentityInsights, InsightsReport};
pub use stats::{IdentitySummary, OutcomeTally};
pub use table::{EnrichedTable, TableRow};
