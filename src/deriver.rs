//! Feature derivation: calendar buckets, inter-game gaps and sessions.
//!
//! The deriver is one-to-one: every input record comes back, in input order.
//! A record whose timestamp does not parse keeps its place with every
//! time-derived field set to `None`.

use crate::calendar::{parse_timestamp, CalendarFields, Season, TimePeriod};
use crate::config::AnalysisConfig;
use crate::extractor::GameRecord;
use chrono::{Duration, NaiveDateTime};
use log::debug;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// A [`GameRecord`] plus its derived temporal features
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: GameRecord,
    pub timestamp: Option<NaiveDateTime>,
    pub calendar: Option<CalendarFields>,
    /// Time since the same identity's chronologically previous game
    pub gap_since_previous: Option<Duration>,
    /// 1-based session number within the identity
    pub session_id: Option<u32>,
}

impl EnrichedRecord {
    pub fn identity(&self) -> &str {
        &self.record.identity
    }

    pub fn hour(&self) -> Option<u32> {
        self.calendar.map(|c| c.hour)
    }

    pub fn weekday_name(&self) -> Option<&'static str> {
        self.calendar.map(|c| c.weekday_name())
    }

    pub fn month(&self) -> Option<u32> {
        self.calendar.map(|c| c.month)
    }

    pub fn year(&self) -> Option<i32> {
        self.calendar.map(|c| c.year)
    }

    pub fn time_period(&self) -> Option<TimePeriod> {
        self.calendar.map(|c| c.time_period)
    }

    pub fn season(&self) -> Option<Season> {
        self.calendar.map(|c| c.season)
    }

    pub fn is_weekend(&self) -> Option<bool> {
        self.calendar.map(|c| c.is_weekend)
    }

    pub fn gap_hours(&self) -> Option<f64> {
        self.gap_since_previous.map(duration_hours)
    }
}

/// Fractional hours of a duration
pub fn duration_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.0
}

/// A gap strictly longer than the threshold, or no previous game at all,
/// starts a new session.
pub fn starts_new_session(gap: Option<Duration>, threshold: Duration) -> bool {
    match gap {
        None => true,
        Some(gap) => gap > threshold,
    }
}

/// Session ids for a chronologically sorted run of gaps. The counter starts
/// at 0 and the first record always opens a session, so ids begin at 1.
pub fn assign_sessions(gaps: &[Option<Duration>], threshold: Duration) -> Vec<u32> {
    let mut session = 0;
    gaps.iter()
        .map(|gap| {
            if starts_new_session(*gap, threshold) {
                session += 1;
            }
            session
        })
        .collect()
}

/// Turns extracted records into enriched records
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    session_gap: Duration,
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}

impl FeatureDeriver {
    pub fn new(session_gap: Duration) -> Self {
        Self { session_gap }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.session_gap())
    }

    pub fn session_gap(&self) -> Duration {
        self.session_gap
    }

    pub fn derive(&self, records: Vec<GameRecord>) -> Vec<EnrichedRecord> {
        let timestamps: Vec<Option<NaiveDateTime>> = records
            .iter()
            .map(|r| parse_timestamp(&r.raw_utc_date, &r.raw_utc_time))
            .collect();

        // Indices are pushed in input order, so a stable sort keeps input
        // order among equal timestamps.
        let mut partitions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            if timestamps[index].is_some() {
                partitions
                    .entry(record.identity.as_str())
                    .or_default()
                    .push(index);
            }
        }

        let untimed = timestamps.iter().filter(|t| t.is_none()).count();
        debug!(
            "Deriving features for {} records ({} identities, {} without timestamp)",
            records.len(),
            partitions.len(),
            untimed
        );

        let threshold = self.session_gap;
        let partition_results: Vec<Vec<(usize, Option<Duration>, u32)>> = partitions
            .into_values()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|mut indices| {
                indices.sort_by_key(|&i| timestamps[i]);

                let gaps: Vec<Option<Duration>> = indices
                    .iter()
                    .enumerate()
                    .map(|(position, &i)| {
                        let previous = position.checked_sub(1).map(|p| indices[p]);
                        match (previous.and_then(|p| timestamps[p]), timestamps[i]) {
                            (Some(prev), Some(current)) => Some(current - prev),
                            _ => None,
                        }
                    })
                    .collect();

                let sessions = assign_sessions(&gaps, threshold);

                indices
                    .into_iter()
                    .zip(gaps)
                    .zip(sessions)
                    .map(|((i, gap), session)| (i, gap, session))
                    .collect()
            })
            .collect();

        let mut gaps: Vec<Option<Duration>> = vec![None; records.len()];
        let mut sessions: Vec<Option<u32>> = vec![None; records.len()];
        for (index, gap, session) in partition_results.into_iter().flatten() {
            gaps[index] = gap;
            sessions[index] = Some(session);
        }

        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let timestamp = timestamps[index];
                EnrichedRecord {
                    record,
                    timestamp,
                    calendar: timestamp.as_ref().map(CalendarFields::from_timestamp),
                    gap_since_previous: gaps[index],
                    session_id: sessions[index],
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Side;
    use crate::pgn_source::RawGame;

    fn record(identity: &str, date: &str, time: &str) -> GameRecord {
        let raw = RawGame::new(0)
            .with_header("White", identity)
            .with_header("Black", "Opponent")
            .with_header("Result", "1-0")
            .with_header("UTCDate", date)
            .with_header("UTCTime", time);
        GameRecord::from_raw(&raw, Side::White)
    }

    #[test]
    fn test_session_boundary_is_strict() {
        let threshold = Duration::hours(1);
        assert!(starts_new_session(None, threshold));
        assert!(!starts_new_session(Some(Duration::hours(1)), threshold));
        // 1.0001 hours
        assert!(starts_new_session(
            Some(Duration::milliseconds(3_600_360)),
            threshold
        ));
    }

    #[test]
    fn test_assign_sessions() {
        let h = |hours: i64| Some(Duration::hours(hours));
        let gaps = [None, h(0), h(1), h(2), h(0), h(3)];
        assert_eq!(
            assign_sessions(&gaps, Duration::hours(1)),
            vec![1, 1, 1, 2, 2, 3]
        );
        assert_eq!(
            assign_sessions(&gaps, Duration::hours(2)),
            vec![1, 1, 1, 1, 1, 2]
        );
        assert!(assign_sessions(&[], Duration::hours(1)).is_empty());
    }

    #[test]
    fn test_one_hour_gap_stays_in_session() {
        let records = vec![
            record("IsmatS", "2024.01.10", "10:00:00"),
            record("IsmatS", "2024.01.10", "11:00:00"),
            record("IsmatS", "2024.01.10", "12:00:01"),
        ];
        let enriched = FeatureDeriver::new(Duration::hours(1)).derive(records);

        assert_eq!(enriched[0].gap_since_previous, None);
        assert_eq!(enriched[1].gap_since_previous, Some(Duration::hours(1)));
        assert_eq!(enriched[1].gap_hours(), Some(1.0));
        assert_eq!(enriched[2].gap_since_previous, Some(Duration::seconds(3601)));

        let sessions: Vec<Option<u32>> = enriched.iter().map(|e| e.session_id).collect();
        assert_eq!(sessions, vec![Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn test_output_keeps_input_order() {
        let records = vec![
            record("IsmatS", "2024.01.10", "12:00:00"),
            record("Cassiny", "2024.01.10", "09:00:00"),
            record("IsmatS", "2024.01.10", "08:00:00"),
            record("Cassiny", "2024.01.12", "09:00:00"),
        ];
        let enriched = FeatureDeriver::default().derive(records);

        let order: Vec<(&str, Option<u32>)> = enriched
            .iter()
            .map(|e| (e.identity(), e.hour()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("IsmatS", Some(12)),
                ("Cassiny", Some(9)),
                ("IsmatS", Some(8)),
                ("Cassiny", Some(9)),
            ]
        );

        // Gaps are computed within each identity in time order
        assert_eq!(enriched[2].gap_since_previous, None);
        assert_eq!(enriched[0].gap_since_previous, Some(Duration::hours(4)));
        assert_eq!(enriched[1].gap_since_previous, None);
        assert_eq!(enriched[3].gap_since_previous, Some(Duration::hours(48)));

        assert_eq!(enriched[2].session_id, Some(1));
        assert_eq!(enriched[0].session_id, Some(2));
        assert_eq!(enriched[1].session_id, Some(1));
        assert_eq!(enriched[3].session_id, Some(2));
    }

    #[test]
    fn test_unparsable_timestamp_is_kept_with_nulls() {
        let records = vec![
            record("IsmatS", "2024.01.10", "10:00:00"),
            record("IsmatS", "????.??.??", "10:30:00"),
            record("IsmatS", "2024.01.10", "10:45:00"),
        ];
        let enriched = FeatureDeriver::default().derive(records);

        assert_eq!(enriched.len(), 3);
        let broken = &enriched[1];
        assert!(broken.timestamp.is_none());
        assert!(broken.calendar.is_none());
        assert!(broken.gap_since_previous.is_none());
        assert!(broken.session_id.is_none());
        assert_eq!(broken.hour(), None);

        // The broken record does not interrupt the timed ones
        assert_eq!(enriched[2].gap_since_previous, Some(Duration::minutes(45)));
        assert_eq!(enriched[2].session_id, Some(1));
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let mut first = record("IsmatS", "2024.01.10", "10:00:00");
        first.opponent = "first".to_string();
        let mut second = record("IsmatS", "2024.01.10", "10:00:00");
        second.opponent = "second".to_string();

        let enriched = FeatureDeriver::default().derive(vec![first, second]);
        assert_eq!(enriched[0].gap_since_previous, None);
        assert_eq!(enriched[1].gap_since_previous, Some(Duration::zero()));
        assert_eq!(enriched[0].session_id, Some(1));
        assert_eq!(enriched[1].session_id, Some(1));
    }

    #[test]
    fn test_empty_input() {
        assert!(FeatureDeriver::default().derive(Vec::new()).is_empty());
    }

    #[test]
    fn test_calendar_columns_populated() {
        let records = vec![record("IsmatS", "2024.07.06", "23:15:00")];
        let enriched = FeatureDeriver::default().derive(records);
        let e = &enriched[0];
        assert_eq!(e.weekday_name(), Some("Saturday"));
        assert_eq!(e.is_weekend(), Some(true));
        assert_eq!(e.season(), Some(Season::Summer));
        assert_eq!(e.time_period(), Some(TimePeriod::LateNight));
        assert_eq!(e.month(), Some(7));
        assert_eq!(e.year(), Some(2024));
    }
}
