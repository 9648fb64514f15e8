//! Tolerant header-field parsing.
//!
//! Game headers are produced by whatever server exported the archive, so a
//! numeric field may be missing, empty, `"?"` or otherwise malformed. Every
//! numeric field goes through [`parse_or_default`]: a parse failure yields the
//! type's default (0) instead of an error. Keeping the lossy policy in one
//! place makes it testable on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Moves assumed per game when folding the increment into a total budget.
pub const ASSUMED_MOVES_PER_GAME: u32 = 40;

/// Parse an optional raw header value, falling back to `T::default()`.
pub fn parse_or_default<T>(raw: Option<&str>) -> T
where
    T: FromStr + Default,
{
    parse_or(raw, T::default())
}

/// Parse an optional raw header value, falling back to `default`.
pub fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Base time and increment in seconds, as written in a `TimeControl` header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeControl {
    pub base_seconds: u32,
    pub increment_seconds: u32,
}

impl TimeControl {
    pub fn new(base_seconds: u32, increment_seconds: u32) -> Self {
        Self {
            base_seconds,
            increment_seconds,
        }
    }

    /// Parse `"<base>+<increment>"`. Without a `+` the whole string is the
    /// base and the increment is 0. Each half degrades to 0 on its own.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('+') {
            Some((base, increment)) => Self {
                base_seconds: parse_or_default(Some(base)),
                increment_seconds: parse_or_default(Some(increment)),
            },
            None => Self {
                base_seconds: parse_or_default(Some(raw)),
                increment_seconds: 0,
            },
        }
    }

    /// Estimated total clock budget for one side.
    pub fn estimated_total_seconds(&self) -> u32 {
        self.base_seconds
            .saturating_add(self.increment_seconds.saturating_mul(ASSUMED_MOVES_PER_GAME))
    }

    pub fn speed_class(&self) -> SpeedClass {
        SpeedClass::from_total_seconds(self.estimated_total_seconds())
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.base_seconds, self.increment_seconds)
    }
}

/// Coarse time-control category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedClass {
    Bullet,
    Blitz,
    Rapid,
    Classical,
}

impl SpeedClass {
    pub const ALL: [SpeedClass; 4] = [
        SpeedClass::Bullet,
        SpeedClass::Blitz,
        SpeedClass::Rapid,
        SpeedClass::Classical,
    ];

    /// Step function over the estimated total budget (lower bounds inclusive).
    pub fn from_total_seconds(total: u32) -> Self {
        match total {
            t if t < 180 => SpeedClass::Bullet,
            t if t < 600 => SpeedClass::Blitz,
            t if t < 1800 => SpeedClass::Rapid,
            _ => SpeedClass::Classical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedClass::Bullet => "bullet",
            SpeedClass::Blitz => "blitz",
            SpeedClass::Rapid => "rapid",
            SpeedClass::Classical => "classical",
        }
    }
}

impl fmt::Display for SpeedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
