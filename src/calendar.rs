//! Calendar decomposition and fixed bucketing of game timestamps.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of `UTCDate + " " + UTCTime` in PGN headers
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Parse the concatenation of a PGN date and time. `None` when either half
/// is missing or malformed.
pub fn parse_timestamp(raw_date: &str, raw_time: &str) -> Option<NaiveDateTime> {
    let combined = format!("{} {}", raw_date.trim(), raw_time.trim());
    NaiveDateTime::parse_from_str(&combined, TIMESTAMP_FORMAT).ok()
}

/// Weekdays in ISO order, indexed by `num_days_from_monday`
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Full English weekday name
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Part of the day a game was played in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    #[serde(rename = "Early Morning")]
    EarlyMorning,
    #[serde(rename = "Late Morning")]
    LateMorning,
    #[serde(rename = "Lunch Time")]
    LunchTime,
    Afternoon,
    Evening,
    Night,
    #[serde(rename = "Late Night")]
    LateNight,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 7] = [
        TimePeriod::EarlyMorning,
        TimePeriod::LateMorning,
        TimePeriod::LunchTime,
        TimePeriod::Afternoon,
        TimePeriod::Evening,
        TimePeriod::Night,
        TimePeriod::LateNight,
    ];

    /// Boundaries at 5, 9, 12, 14, 17, 20 and 23; 23:00-04:59 is late night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=8 => TimePeriod::EarlyMorning,
            9..=11 => TimePeriod::LateMorning,
            12..=13 => TimePeriod::LunchTime,
            14..=16 => TimePeriod::Afternoon,
            17..=19 => TimePeriod::Evening,
            20..=22 => TimePeriod::Night,
            _ => TimePeriod::LateNight,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::EarlyMorning => "Early Morning",
            TimePeriod::LateMorning => "Late Morning",
            TimePeriod::LunchTime => "Lunch Time",
            TimePeriod::Afternoon => "Afternoon",
            TimePeriod::Evening => "Evening",
            TimePeriod::Night => "Night",
            TimePeriod::LateNight => "Late Night",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meteorological season (northern hemisphere)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything derived from a single timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFields {
    pub hour: u32,
    pub minute: u32,
    pub weekday: Weekday,
    pub month: u32,
    pub quarter: u32,
    pub year: i32,
    pub day_of_year: u32,
    /// ISO-8601 week number
    pub week_of_year: u32,
    pub time_period: TimePeriod,
    pub is_weekend: bool,
    pub season: Season,
}

impl CalendarFields {
    pub fn from_timestamp(timestamp: &NaiveDateTime) -> Self {
        let hour = timestamp.hour();
        let month = timestamp.month();
        let weekday = timestamp.weekday();

        Self {
            hour,
            minute: timestamp.minute(),
            weekday,
            month,
            quarter: (month - 1) / 3 + 1,
            year: timestamp.year(),
            day_of_year: timestamp.ordinal(),
            week_of_year: timestamp.iso_week().week(),
            time_period: TimePeriod::from_hour(hour),
            is_weekend: is_weekend(weekday),
            season: Season::from_month(month),
        }
    }

    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024.03.09", "21:05:33").unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(21, 5, 33)
                .unwrap()
        );

        assert!(parse_timestamp("", "21:05:33").is_none());
        assert!(parse_timestamp("2024.03.09", "").is_none());
        assert!(parse_timestamp("????.??.??", "??:??:??").is_none());
        assert!(parse_timestamp("2024-03-09", "21:05:33").is_none());
    }

    #[test]
    fn test_time_period_boundaries() {
        let expected = [
            (0, TimePeriod::LateNight),
            (4, TimePeriod::LateNight),
            (5, TimePeriod::EarlyMorning),
            (8, TimePeriod::EarlyMorning),
            (9, TimePeriod::LateMorning),
            (12, TimePeriod::LunchTime),
            (14, TimePeriod::Afternoon),
            (17, TimePeriod::Evening),
            (20, TimePeriod::Night),
            (22, TimePeriod::Night),
            (23, TimePeriod::LateNight),
        ];
        for (hour, period) in expected {
            assert_eq!(TimePeriod::from_hour(hour), period, "hour {hour}");
        }
    }

    #[test]
    fn test_season_mapping() {
        let seasons: Vec<Season> = (1..=12).map(Season::from_month).collect();
        assert_eq!(
            seasons,
            vec![
                Season::Winter,
                Season::Winter,
                Season::Spring,
                Season::Spring,
                Season::Spring,
                Season::Summer,
                Season::Summer,
                Season::Summer,
                Season::Autumn,
                Season::Autumn,
                Season::Autumn,
                Season::Winter,
            ]
        );
    }

    #[test]
    fn test_calendar_fields() {
        // Saturday 9 March 2024, ISO week 10
        let ts = parse_timestamp("2024.03.09", "21:05:33").unwrap();
        let fields = CalendarFields::from_timestamp(&ts);

        assert_eq!(fields.hour, 21);
        assert_eq!(fields.minute, 5);
        assert_eq!(fields.weekday_name(), "Saturday");
        assert!(fields.is_weekend);
        assert_eq!(fields.month, 3);
        assert_eq!(fields.quarter, 1);
        assert_eq!(fields.year, 2024);
        assert_eq!(fields.day_of_year, 69);
        assert_eq!(fields.week_of_year, 10);
        assert_eq!(fields.time_period, TimePeriod::Night);
        assert_eq!(fields.season, Season::Spring);
    }

    #[test]
    fn test_weekday_is_not_weekend() {
        // Wednesday 1 January 2025 belongs to ISO week 1
        let ts = parse_timestamp("2025.01.01", "07:30:00").unwrap();
        let fields = CalendarFields::from_timestamp(&ts);
        assert_eq!(fields.weekday_name(), "Wednesday");
        assert!(!fields.is_weekend);
        assert_eq!(fields.quarter, 1);
        assert_eq!(fields.week_of_year, 1);
        assert_eq!(fields.time_period, TimePeriod::EarlyMorning);
        assert_eq!(fields.season, Season::Winter);
    }

    #[test]
    fn test_week_is_indexed_from_monday() {
        for (index, weekday) in WEEK.iter().enumerate() {
            assert_eq!(weekday.num_days_from_monday() as usize, index);
        }
    }
}
