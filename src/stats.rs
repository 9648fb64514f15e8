//! Descriptive statistics over the enriched table.
//!
//! Everything here is a pure function of already-derived records. Win rates
//! are percentages in `0.0..=100.0`.

use crate::calendar::{TimePeriod, WEEK};
use crate::deriver::EnrichedRecord;
use crate::extractor::{Outcome, Side};
use crate::parsing::SpeedClass;
use crate::table::EnrichedTable;
use chrono::{NaiveDateTime, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// z-score for a two-sided 95% interval
const Z_95: f64 = 1.96;

/// Trailing window and minimum fill for the consistency profile
pub const CONSISTENCY_WINDOW: usize = 50;
pub const CONSISTENCY_MIN_PERIODS: usize = 25;

/// Minimum games in a weekday/hour cell before it can be the golden time
pub const GOLDEN_TIME_MIN_GAMES: usize = 5;

/// An opening worth developing: a strong win rate over a handful of games
pub const DEVELOP_MIN_WIN_RATE: f64 = 60.0;
pub const DEVELOP_GAMES: std::ops::RangeInclusive<usize> = 3..=10;

/// Win/loss/draw counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
}

impl OutcomeTally {
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
    }

    pub fn games(&self) -> usize {
        self.wins + self.losses + self.draws
    }

    pub fn win_rate(&self) -> f64 {
        percentage(self.wins as f64, self.games())
    }

    /// Points scored with a draw worth half a point
    pub fn score_rate(&self) -> f64 {
        percentage(self.wins as f64 + self.draws as f64 / 2.0, self.games())
    }
}

impl FromIterator<Outcome> for OutcomeTally {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut tally = OutcomeTally::default();
        for outcome in iter {
            tally.add(outcome);
        }
        tally
    }
}

fn percentage(part: f64, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part / total as f64 * 100.0
    }
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Group records by `key` and tally outcomes. Records for which `key`
/// returns `None` (e.g. no timestamp) are left out.
pub fn tally_by<'a, K, I, F>(records: I, key: F) -> BTreeMap<K, OutcomeTally>
where
    K: Ord,
    I: IntoIterator<Item = &'a EnrichedRecord>,
    F: Fn(&EnrichedRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, OutcomeTally> = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            groups.entry(k).or_default().add(record.record.outcome);
        }
    }
    groups
}

/// Highest and lowest win-rate groups among those with at least `min_games`.
/// Ties go to the first group in key order.
pub fn best_and_worst<K: Clone>(
    groups: &BTreeMap<K, OutcomeTally>,
    min_games: usize,
) -> Option<((K, OutcomeTally), (K, OutcomeTally))> {
    let mut eligible = groups.iter().filter(|(_, t)| t.games() >= min_games);
    let (first_key, first_tally) = eligible.next()?;

    let mut best = (first_key, first_tally);
    let mut worst = (first_key, first_tally);
    for (key, tally) in eligible {
        if tally.win_rate() > best.1.win_rate() {
            best = (key, tally);
        }
        if tally.win_rate() < worst.1.win_rate() {
            worst = (key, tally);
        }
    }
    Some(((best.0.clone(), *best.1), (worst.0.clone(), *worst.1)))
}

/// A run of consecutive identical outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub outcome: Outcome,
    pub length: usize,
}

pub fn streaks(outcomes: &[Outcome]) -> Vec<Streak> {
    let mut runs: Vec<Streak> = Vec::new();
    for &outcome in outcomes {
        match runs.last_mut() {
            Some(run) if run.outcome == outcome => run.length += 1,
            _ => runs.push(Streak { outcome, length: 1 }),
        }
    }
    runs
}

pub fn longest_streak(runs: &[Streak], outcome: Outcome) -> usize {
    runs.iter()
        .filter(|s| s.outcome == outcome)
        .map(|s| s.length)
        .max()
        .unwrap_or(0)
}

/// Cumulative rating: the first game's rating plus the running sum of
/// rating changes. Input must be chronological.
pub fn rating_trajectory(chronological: &[&EnrichedRecord]) -> Vec<(NaiveDateTime, i32)> {
    let Some(first) = chronological.first() else {
        return Vec::new();
    };

    let mut rating = first.record.identity_rating;
    chronological
        .iter()
        .filter_map(|r| {
            rating = rating.saturating_add(r.record.rating_delta);
            r.timestamp.map(|ts| (ts, rating))
        })
        .collect()
}

/// Trailing-window win rate, one value per game (minimum one game).
pub fn rolling_win_rate(outcomes: &[Outcome], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut wins_in_window = 0usize;
    outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            if outcome.is_win() {
                wins_in_window += 1;
            }
            if i >= window && outcomes[i - window].is_win() {
                wins_in_window -= 1;
            }
            percentage(wins_in_window as f64, (i + 1).min(window))
        })
        .collect()
}

/// Games and win rate for one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyPerformance {
    pub year: i32,
    pub month: u32,
    pub tally: OutcomeTally,
    /// Half-width of the 95% interval around the win rate; `None` below two games
    pub confidence_half_width: Option<f64>,
}

impl MonthlyPerformance {
    pub fn win_rate(&self) -> f64 {
        self.tally.win_rate()
    }
}

pub fn monthly_performance<'a, I>(records: I) -> Vec<MonthlyPerformance>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    tally_by(records, |r| r.calendar.map(|c| (c.year, c.month)))
        .into_iter()
        .map(|((year, month), tally)| MonthlyPerformance {
            year,
            month,
            tally,
            confidence_half_width: win_rate_confidence(&tally),
        })
        .collect()
}

/// `1.96 * s / sqrt(n)` with `s` the sample standard deviation of the win
/// indicator, in percentage points.
pub fn win_rate_confidence(tally: &OutcomeTally) -> Option<f64> {
    let n = tally.games();
    if n < 2 {
        return None;
    }
    let n = n as f64;
    let p = tally.wins as f64 / n;
    let sample_variance = p * (1.0 - p) * n / (n - 1.0);
    Some(Z_95 * sample_variance.sqrt() * 100.0 / n.sqrt())
}

/// One session of consecutive games
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub identity: String,
    pub session_id: u32,
    pub tally: OutcomeTally,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SessionSummary {
    pub fn games(&self) -> usize {
        self.tally.games()
    }

    pub fn duration_hours(&self) -> f64 {
        crate::deriver::duration_hours(self.end - self.start)
    }
}

/// Sessions ordered by identity then session id
pub fn session_summaries(records: &[EnrichedRecord]) -> Vec<SessionSummary> {
    let mut sessions: BTreeMap<(&str, u32), SessionSummary> = BTreeMap::new();

    for record in records {
        let (Some(session_id), Some(timestamp)) = (record.session_id, record.timestamp) else {
            continue;
        };

        let summary = sessions
            .entry((record.identity(), session_id))
            .or_insert_with(|| SessionSummary {
                identity: record.identity().to_string(),
                session_id,
                tally: OutcomeTally::default(),
                start: timestamp,
                end: timestamp,
            });
        summary.tally.add(record.record.outcome);
        summary.start = summary.start.min(timestamp);
        summary.end = summary.end.max(timestamp);
    }

    sessions.into_values().collect()
}

/// Bucket for the time elapsed since the previous game
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GapCategory {
    UnderOneHour,
    OneToSixHours,
    SixToTwentyFourHours,
    OneToThreeDays,
    ThreeDaysOrMore,
}

impl GapCategory {
    /// Gaps shorter than a minute or longer than a week are not bucketed.
    pub fn from_hours(hours: f64) -> Option<Self> {
        if !(1.0 / 60.0..=168.0).contains(&hours) {
            return None;
        }
        Some(match hours {
            h if h < 1.0 => GapCategory::UnderOneHour,
            h if h < 6.0 => GapCategory::OneToSixHours,
            h if h < 24.0 => GapCategory::SixToTwentyFourHours,
            h if h < 72.0 => GapCategory::OneToThreeDays,
            _ => GapCategory::ThreeDaysOrMore,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            GapCategory::UnderOneHour => "< 1 hour",
            GapCategory::OneToSixHours => "1-6 hours",
            GapCategory::SixToTwentyFourHours => "6-24 hours",
            GapCategory::OneToThreeDays => "1-3 days",
            GapCategory::ThreeDaysOrMore => "3+ days",
        }
    }
}

impl fmt::Display for GapCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bucket for `rating_gap` (own rating minus opponent rating)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RatingGapBucket {
    MuchWeaker,
    Weaker,
    SlightlyWeaker,
    Even,
    SlightlyStronger,
    Stronger,
    MuchStronger,
    Dominant,
}

impl RatingGapBucket {
    /// Right-closed intervals with edges -200, -100, -50, 0, 50, 100, 200.
    pub fn from_gap(gap: i32) -> Self {
        match gap {
            g if g <= -200 => RatingGapBucket::MuchWeaker,
            g if g <= -100 => RatingGapBucket::Weaker,
            g if g <= -50 => RatingGapBucket::SlightlyWeaker,
            g if g <= 0 => RatingGapBucket::Even,
            g if g <= 50 => RatingGapBucket::SlightlyStronger,
            g if g <= 100 => RatingGapBucket::Stronger,
            g if g <= 200 => RatingGapBucket::MuchStronger,
            _ => RatingGapBucket::Dominant,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RatingGapBucket::MuchWeaker => "<= -200",
            RatingGapBucket::Weaker => "-199..-100",
            RatingGapBucket::SlightlyWeaker => "-99..-50",
            RatingGapBucket::Even => "-49..0",
            RatingGapBucket::SlightlyStronger => "1..50",
            RatingGapBucket::Stronger => "51..100",
            RatingGapBucket::MuchStronger => "101..200",
            RatingGapBucket::Dominant => "> 200",
        }
    }
}

impl fmt::Display for RatingGapBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Win rate for one opening name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningPerformance {
    pub opening: String,
    pub tally: OutcomeTally,
}

/// Openings with at least `min_games`, best win rate first (then most
/// played, then name).
pub fn opening_performance<'a, I>(records: I, min_games: usize) -> Vec<OpeningPerformance>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut openings: Vec<OpeningPerformance> = tally_by(records, |r| {
        Some(r.record.opening_name.clone()).filter(|name| !name.is_empty())
    })
    .into_iter()
    .filter(|(_, tally)| tally.games() >= min_games)
    .map(|(opening, tally)| OpeningPerformance { opening, tally })
    .collect();

    openings.sort_by(|a, b| {
        b.tally
            .win_rate()
            .total_cmp(&a.tally.win_rate())
            .then_with(|| b.tally.games().cmp(&a.tally.games()))
            .then_with(|| a.opening.cmp(&b.opening))
    });
    openings
}

/// Most played openings first (then name), at most `limit`
pub fn most_played_openings<'a, I>(records: I, limit: usize) -> Vec<OpeningPerformance>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut openings = opening_performance(records, 1);
    openings.sort_by(|a, b| {
        b.tally
            .games()
            .cmp(&a.tally.games())
            .then_with(|| a.opening.cmp(&b.opening))
    });
    openings.truncate(limit);
    openings
}

/// Best-scoring opening among those with few games and a win rate of at
/// least [`DEVELOP_MIN_WIN_RATE`]. Ties go to the opening with more games,
/// then by name.
pub fn opening_to_develop<'a, I>(records: I) -> Option<OpeningPerformance>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    opening_performance(records, *DEVELOP_GAMES.start())
        .into_iter()
        .filter(|o| DEVELOP_GAMES.contains(&o.tally.games()))
        .find(|o| o.tally.win_rate() >= DEVELOP_MIN_WIN_RATE)
}

/// How many distinct openings an identity plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpeningDiversity {
    pub white: usize,
    pub black: usize,
    /// Time period with the most distinct openings and that count
    pub most_diverse_period: Option<(TimePeriod, usize)>,
}

impl OpeningDiversity {
    /// Fewer than this many distinct openings across both colours is a
    /// specialist repertoire
    pub const GENERALIST_THRESHOLD: usize = 100;

    pub fn style(&self) -> &'static str {
        if self.white + self.black < Self::GENERALIST_THRESHOLD {
            "Specialist"
        } else {
            "Generalist"
        }
    }
}

pub fn opening_diversity<'a, I>(records: I) -> OpeningDiversity
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut by_side: BTreeMap<Side, BTreeSet<&str>> = BTreeMap::new();
    let mut by_period: BTreeMap<TimePeriod, BTreeSet<&str>> = BTreeMap::new();

    for record in records {
        let opening = record.record.opening_name.as_str();
        if opening.is_empty() {
            continue;
        }
        by_side.entry(record.record.side).or_default().insert(opening);
        if let Some(period) = record.time_period() {
            by_period.entry(period).or_default().insert(opening);
        }
    }

    let distinct = |side| by_side.get(&side).map_or(0, BTreeSet::len);
    // Ties go to the earliest period of the day
    let most_diverse_period = by_period
        .iter()
        .map(|(period, openings)| (*period, openings.len()))
        .fold(None, |best: Option<(TimePeriod, usize)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        });

    OpeningDiversity {
        white: distinct(Side::White),
        black: distinct(Side::Black),
        most_diverse_period,
    }
}

/// Outcomes per termination reason, most frequent first (then name).
/// A missing reason is reported as `Unknown`.
pub fn termination_breakdown<'a, I>(records: I) -> Vec<(String, OutcomeTally)>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut reasons: Vec<(String, OutcomeTally)> = tally_by(records, |r| {
        let reason = r.record.termination_reason.trim();
        Some(if reason.is_empty() { "Unknown" } else { reason }.to_string())
    })
    .into_iter()
    .collect();
    reasons.sort_by(|a, b| b.1.games().cmp(&a.1.games()).then_with(|| a.0.cmp(&b.0)));
    reasons
}

/// Best weekday and hour combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoldenTime {
    pub weekday: Weekday,
    pub hour: u32,
    pub tally: OutcomeTally,
}

/// Highest win-rate weekday/hour cell with at least `min_games`. Ties go to
/// the earliest cell in the week.
pub fn golden_time<'a, I>(records: I, min_games: usize) -> Option<GoldenTime>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let cells = tally_by(records, |r| {
        r.calendar
            .map(|c| (c.weekday.num_days_from_monday() as usize, c.hour))
    });
    let (((day, hour), tally), _) = best_and_worst(&cells, min_games)?;
    Some(GoldenTime {
        weekday: WEEK[day],
        hour,
        tally,
    })
}

/// How steady results are over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ConsistencyLevel {
    VeryConsistent,
    ModeratelyConsistent,
    HighVolatility,
}

impl ConsistencyLevel {
    pub fn from_volatility(volatility: f64) -> Self {
        if volatility < 45.0 {
            ConsistencyLevel::VeryConsistent
        } else if volatility < 50.0 {
            ConsistencyLevel::ModeratelyConsistent
        } else {
            ConsistencyLevel::HighVolatility
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConsistencyLevel::VeryConsistent => "Very Consistent",
            ConsistencyLevel::ModeratelyConsistent => "Moderately Consistent",
            ConsistencyLevel::HighVolatility => "High Volatility",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Consistency {
    /// Mean trailing-window standard deviation of the win indicator, percent
    pub volatility: f64,
    pub level: ConsistencyLevel,
}

/// Average over all trailing windows (holding at least `min_periods` games)
/// of the sample standard deviation of the win indicator. Needs at least two
/// full windows of chronological outcomes.
pub fn performance_consistency(
    outcomes: &[Outcome],
    window: usize,
    min_periods: usize,
) -> Option<Consistency> {
    let window = window.max(2);
    if outcomes.len() < 2 * window {
        return None;
    }
    let min_periods = min_periods.clamp(2, window);

    let deviations = (0..outcomes.len()).filter_map(|end| {
        let start = (end + 1).saturating_sub(window);
        let slice = &outcomes[start..=end];
        if slice.len() < min_periods {
            return None;
        }
        let n = slice.len() as f64;
        let p = slice.iter().filter(|o| o.is_win()).count() as f64 / n;
        Some((p * (1.0 - p) * n / (n - 1.0)).sqrt() * 100.0)
    });

    let volatility = mean(deviations)?;
    Some(Consistency {
        volatility,
        level: ConsistencyLevel::from_volatility(volatility),
    })
}

/// Headline numbers for one tracked identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentitySummary {
    pub identity: String,
    pub tally: OutcomeTally,
    pub by_side: BTreeMap<Side, OutcomeTally>,
    pub by_speed: BTreeMap<SpeedClass, OutcomeTally>,
    /// Means ignore unknown (zero) ratings
    pub mean_rating: Option<f64>,
    pub mean_opponent_rating: Option<f64>,
    pub peak_rating: Option<i32>,
    /// End point of the rating trajectory
    pub latest_rating: Option<i32>,
    pub mean_ply_count: Option<f64>,
    pub longest_win_streak: usize,
    pub longest_loss_streak: usize,
    pub first_game: Option<NaiveDateTime>,
    pub last_game: Option<NaiveDateTime>,
}

impl IdentitySummary {
    pub fn build(table: &EnrichedTable, identity: &str) -> Self {
        let records: Vec<&EnrichedRecord> = table.for_identity(identity).collect();
        let chronological = table.chronological(identity);
        let outcomes: Vec<Outcome> = chronological.iter().map(|r| r.record.outcome).collect();
        let runs = streaks(&outcomes);
        let trajectory = rating_trajectory(&chronological);

        Self {
            identity: identity.to_string(),
            tally: records.iter().map(|r| r.record.outcome).collect(),
            by_side: tally_by(records.iter().copied(), |r| Some(r.record.side)),
            by_speed: tally_by(records.iter().copied(), |r| Some(r.record.speed_class)),
            mean_rating: mean(
                records
                    .iter()
                    .map(|r| r.record.identity_rating)
                    .filter(|&rating| rating > 0)
                    .map(f64::from),
            ),
            mean_opponent_rating: mean(
                records
                    .iter()
                    .map(|r| r.record.opponent_rating)
                    .filter(|&rating| rating > 0)
                    .map(f64::from),
            ),
            peak_rating: records
                .iter()
                .map(|r| r.record.identity_rating)
                .filter(|&rating| rating > 0)
                .max(),
            latest_rating: trajectory.last().map(|&(_, rating)| rating),
            mean_ply_count: mean(records.iter().map(|r| r.record.ply_count as f64)),
            longest_win_streak: longest_streak(&runs, Outcome::Win),
            longest_loss_streak: longest_streak(&runs, Outcome::Loss),
            first_game: chronological.first().and_then(|r| r.timestamp),
            last_game: chronological.last().and_then(|r| r.timestamp),
        }
    }
}
