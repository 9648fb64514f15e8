//! The enriched table handed to report and chart consumers, plus CSV/JSON
//! export.

use crate::calendar::{Season, TimePeriod};
use crate::deriver::EnrichedRecord;
use crate::errors::Result;
use crate::extractor::{Outcome, Side};
use crate::parsing::SpeedClass;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Export columns, in [`TableRow`] field order
pub const COLUMNS: [&str; 35] = [
    "identity",
    "opponent",
    "side",
    "outcome",
    "identity_rating",
    "opponent_rating",
    "rating_gap",
    "rating_delta",
    "base_seconds",
    "increment_seconds",
    "time_control",
    "speed_class",
    "opening_name",
    "opening_code",
    "termination_reason",
    "ply_count",
    "raw_date",
    "raw_utc_date",
    "raw_utc_time",
    "site",
    "event",
    "timestamp",
    "hour",
    "minute",
    "weekday_name",
    "month",
    "quarter",
    "year",
    "day_of_year",
    "week_of_year",
    "time_period",
    "is_weekend",
    "season",
    "gap_since_previous_hours",
    "session_id",
];

/// Read-only collection of enriched records in output order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedTable {
    records: Vec<EnrichedRecord>,
}

impl EnrichedTable {
    pub fn new(records: Vec<EnrichedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EnrichedRecord> {
        self.records
    }

    /// Distinct identities, sorted
    pub fn identities(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(EnrichedRecord::identity)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn for_identity<'a>(
        &'a self,
        identity: &'a str,
    ) -> impl Iterator<Item = &'a EnrichedRecord> + 'a {
        self.records.iter().filter(move |r| r.identity() == identity)
    }

    /// An identity's timed records in chronological order (stable for ties).
    /// Records without a timestamp are left out.
    pub fn chronological<'a>(&'a self, identity: &'a str) -> Vec<&'a EnrichedRecord> {
        let mut timed: Vec<&EnrichedRecord> = self
            .for_identity(identity)
            .filter(|r| r.timestamp.is_some())
            .collect();
        timed.sort_by_key(|r| r.timestamp);
        timed
    }

    pub fn rows(&self) -> Vec<TableRow<'_>> {
        self.records.iter().map(TableRow::from).collect()
    }

    /// One header row, then one row per record. Null fields are empty cells.
    /// An empty table still gets its header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(COLUMNS)?;
        for row in self.rows() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.rows())?;
        Ok(())
    }
}

/// Flat export view of one [`EnrichedRecord`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow<'a> {
    pub identity: &'a str,
    pub opponent: &'a str,
    pub side: Side,
    pub outcome: Outcome,
    pub identity_rating: i32,
    pub opponent_rating: i32,
    pub rating_gap: i32,
    pub rating_delta: i32,
    pub base_seconds: u32,
    pub increment_seconds: u32,
    pub time_control: &'a str,
    pub speed_class: SpeedClass,
    pub opening_name: &'a str,
    pub opening_code: &'a str,
    pub termination_reason: &'a str,
    pub ply_count: usize,
    pub raw_date: &'a str,
    pub raw_utc_date: &'a str,
    pub raw_utc_time: &'a str,
    pub site: &'a str,
    pub event: &'a str,
    pub timestamp: Option<String>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub weekday_name: Option<&'static str>,
    pub month: Option<u32>,
    pub quarter: Option<u32>,
    pub year: Option<i32>,
    pub day_of_year: Option<u32>,
    pub week_of_year: Option<u32>,
    pub time_period: Option<TimePeriod>,
    pub is_weekend: Option<bool>,
    pub season: Option<Season>,
    pub gap_since_previous_hours: Option<f64>,
    pub session_id: Option<u32>,
}

impl<'a> From<&'a EnrichedRecord> for TableRow<'a> {
    fn from(enriched: &'a EnrichedRecord) -> Self {
        let record = &enriched.record;
        let calendar = enriched.calendar.as_ref();

        Self {
            identity: &record.identity,
            opponent: &record.opponent,
            side: record.side,
            outcome: record.outcome,
            identity_rating: record.identity_rating,
            opponent_rating: record.opponent_rating,
            rating_gap: record.rating_gap,
            rating_delta: record.rating_delta,
            base_seconds: record.time_control.base_seconds,
            increment_seconds: record.time_control.increment_seconds,
            time_control: &record.raw_time_control,
            speed_class: record.speed_class,
            opening_name: &record.opening_name,
            opening_code: &record.opening_code,
            termination_reason: &record.termination_reason,
            ply_count: record.ply_count,
            raw_date: &record.raw_date,
            raw_utc_date: &record.raw_utc_date,
            raw_utc_time: &record.raw_utc_time,
            site: &record.site,
            event: &record.event,
            timestamp: enriched
                .timestamp
                .map(|ts| ts.format(EXPORT_TIMESTAMP_FORMAT).to_string()),
            hour: calendar.map(|c| c.hour),
            minute: calendar.map(|c| c.minute),
            weekday_name: calendar.map(|c| c.weekday_name()),
            month: calendar.map(|c| c.month),
            quarter: calendar.map(|c| c.quarter),
            year: calendar.map(|c| c.year),
            day_of_year: calendar.map(|c| c.day_of_year),
            week_of_year: calendar.map(|c| c.week_of_year),
            time_period: calendar.map(|c| c.time_period),
            is_weekend: calendar.map(|c| c.is_weekend),
            season: calendar.map(|c| c.season),
            gap_since_previous_hours: enriched.gap_hours(),
            session_id: enriched.session_id,
        }
    }
}
