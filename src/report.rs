//! Plain-text insights report built from the enriched table.

use crate::calendar::{weekday_name, Season, TimePeriod};
use crate::config::ReportOptions;
use crate::deriver::EnrichedRecord;
use crate::extractor::Outcome;
use crate::stats::{
    best_and_worst, golden_time, monthly_performance, most_played_openings, opening_diversity,
    opening_performance, opening_to_develop, performance_consistency, rolling_win_rate,
    session_summaries, tally_by, termination_breakdown, Consistency, GapCategory, GoldenTime,
    IdentitySummary, MonthlyPerformance, OpeningDiversity, OpeningPerformance, OutcomeTally,
    RatingGapBucket, SessionSummary, CONSISTENCY_MIN_PERIODS, CONSISTENCY_WINDOW,
    GOLDEN_TIME_MIN_GAMES,
};
use crate::table::EnrichedTable;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;

const RULE_WIDTH: usize = 60;
const DATE_FORMAT: &str = "%Y-%m-%d";
const MOST_PLAYED_OPENINGS: usize = 3;

/// Everything the report shows for one identity
#[derive(Debug, Clone)]
pub struct IdentityInsights {
    pub summary: IdentitySummary,
    pub by_hour: BTreeMap<u32, OutcomeTally>,
    pub by_period: BTreeMap<TimePeriod, OutcomeTally>,
    pub weekday: OutcomeTally,
    pub weekend: OutcomeTally,
    pub by_season: BTreeMap<Season, OutcomeTally>,
    pub openings: Vec<OpeningPerformance>,
    pub most_played: Vec<OpeningPerformance>,
    pub opening_to_develop: Option<OpeningPerformance>,
    pub diversity: OpeningDiversity,
    pub terminations: Vec<(String, OutcomeTally)>,
    pub golden_time: Option<GoldenTime>,
    pub consistency: Option<Consistency>,
    pub sessions: Vec<SessionSummary>,
    pub by_gap: BTreeMap<GapCategory, OutcomeTally>,
    pub by_rating_gap: BTreeMap<RatingGapBucket, OutcomeTally>,
    pub monthly: Vec<MonthlyPerformance>,
    /// Win rate over the trailing window ending at the latest game
    pub recent_form: Option<f64>,
}

impl IdentityInsights {
    pub fn build(table: &EnrichedTable, identity: &str, options: &ReportOptions) -> Self {
        let records: Vec<EnrichedRecord> = table.for_identity(identity).cloned().collect();
        let chronological = table.chronological(identity);
        let outcomes: Vec<Outcome> = chronological.iter().map(|r| r.record.outcome).collect();

        let weekend_split = tally_by(&records, |r| r.is_weekend());

        let mut openings = opening_performance(&records, options.min_games_per_opening);
        openings.truncate(options.top_openings);

        Self {
            summary: IdentitySummary::build(table, identity),
            by_hour: tally_by(&records, |r| r.hour()),
            by_period: tally_by(&records, |r| r.time_period()),
            weekday: weekend_split.get(&false).copied().unwrap_or_default(),
            weekend: weekend_split.get(&true).copied().unwrap_or_default(),
            by_season: tally_by(&records, |r| r.season()),
            openings,
            most_played: most_played_openings(&records, MOST_PLAYED_OPENINGS),
            opening_to_develop: opening_to_develop(&records),
            diversity: opening_diversity(&records),
            terminations: termination_breakdown(&records),
            golden_time: golden_time(&records, GOLDEN_TIME_MIN_GAMES),
            consistency: performance_consistency(
                &outcomes,
                CONSISTENCY_WINDOW,
                CONSISTENCY_MIN_PERIODS,
            ),
            sessions: session_summaries(&records),
            by_gap: tally_by(&records, |r| r.gap_hours().and_then(GapCategory::from_hours)),
            by_rating_gap: tally_by(&records, |r| {
                Some(RatingGapBucket::from_gap(r.record.rating_gap))
            }),
            monthly: monthly_performance(&records),
            recent_form: rolling_win_rate(&outcomes, options.rolling_window)
                .last()
                .copied(),
        }
    }
}

/// The full report across all identities in a table
#[derive(Debug, Clone)]
pub struct InsightsReport {
    pub total_records: usize,
    pub untimed_records: usize,
    pub first_game: Option<NaiveDateTime>,
    pub last_game: Option<NaiveDateTime>,
    pub identities: Vec<IdentityInsights>,
    options: ReportOptions,
}

impl InsightsReport {
    pub fn build(table: &EnrichedTable, options: &ReportOptions) -> Self {
        let timestamps = table.records().iter().filter_map(|r| r.timestamp);

        Self {
            total_records: table.len(),
            untimed_records: table.records().iter().filter(|r| r.timestamp.is_none()).count(),
            first_game: timestamps.clone().min(),
            last_game: timestamps.max(),
            identities: table
                .identities()
                .into_iter()
                .map(|identity| IdentityInsights::build(table, identity, options))
                .collect(),
            options: options.clone(),
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    fn write_identity(
        &self,
        f: &mut fmt::Formatter<'_>,
        insights: &IdentityInsights,
    ) -> fmt::Result {
        let s = &insights.summary;
        let min_games = self.options.min_games_per_bucket;

        section(f, &s.identity)?;
        writeln!(
            f,
            "Games: {} ({}W / {}L / {}D)  Win rate: {:.1}%  Score: {:.1}%",
            s.tally.games(),
            s.tally.wins,
            s.tally.losses,
            s.tally.draws,
            s.tally.win_rate(),
            s.tally.score_rate()
        )?;
        if let (Some(mean), Some(peak)) = (s.mean_rating, s.peak_rating) {
            write!(f, "Rating: mean {:.0}, peak {}", mean, peak)?;
            if let Some(latest) = s.latest_rating {
                write!(f, ", latest {}", latest)?;
            }
            writeln!(f)?;
        }
        if let Some(opponent) = s.mean_opponent_rating {
            writeln!(f, "Mean opponent rating: {:.0}", opponent)?;
        }
        if let Some(plies) = s.mean_ply_count {
            writeln!(f, "Mean game length: {:.1} plies", plies)?;
        }
        writeln!(
            f,
            "Longest streaks: {} wins, {} losses",
            s.longest_win_streak, s.longest_loss_streak
        )?;
        if let Some(form) = insights.recent_form {
            writeln!(
                f,
                "Recent form (last {} games): {:.1}%",
                self.options.rolling_window, form
            )?;
        }

        subsection(f, "By colour")?;
        for (side, tally) in &s.by_side {
            tally_line(f, side, tally)?;
        }

        subsection(f, "By speed")?;
        for (speed, tally) in &s.by_speed {
            tally_line(f, speed, tally)?;
        }

        subsection(f, "Circadian rhythm")?;
        match best_and_worst(&insights.by_hour, min_games) {
            Some(((best, best_tally), (worst, worst_tally))) => {
                writeln!(
                    f,
                    "  Peak hour: {:02}:00 ({:.1}%)  Worst hour: {:02}:00 ({:.1}%)  Swing: {:.1}%",
                    best,
                    best_tally.win_rate(),
                    worst,
                    worst_tally.win_rate(),
                    best_tally.win_rate() - worst_tally.win_rate()
                )?;
            }
            None => writeln!(f, "  Not enough games per hour (minimum {})", min_games)?,
        }
        for period in TimePeriod::ALL {
            if let Some(tally) = insights.by_period.get(&period) {
                tally_line(f, period, tally)?;
            }
        }

        if let Some(golden) = &insights.golden_time {
            writeln!(
                f,
                "  Golden time: {} at {:02}:00 ({:.1}% over {} games)",
                weekday_name(golden.weekday),
                golden.hour,
                golden.tally.win_rate(),
                golden.tally.games()
            )?;
        }

        subsection(f, "Weekday vs weekend")?;
        tally_line(f, "Weekday", &insights.weekday)?;
        tally_line(f, "Weekend", &insights.weekend)?;

        subsection(f, "Seasons")?;
        for season in Season::ALL {
            if let Some(tally) = insights.by_season.get(&season) {
                tally_line(f, season, tally)?;
            }
        }

        subsection(f, "Top openings")?;
        if insights.openings.is_empty() {
            writeln!(
                f,
                "  No opening with at least {} games",
                self.options.min_games_per_opening
            )?;
        }
        for opening in &insights.openings {
            tally_line(f, &opening.opening, &opening.tally)?;
        }

        subsection(f, "Most played openings")?;
        for opening in &insights.most_played {
            tally_line(f, &opening.opening, &opening.tally)?;
        }
        if let Some(develop) = &insights.opening_to_develop {
            writeln!(
                f,
                "  Opening to develop: {} ({:.1}% over {} games)",
                develop.opening,
                develop.tally.win_rate(),
                develop.tally.games()
            )?;
        }

        subsection(f, "Repertoire")?;
        let diversity = &insights.diversity;
        writeln!(
            f,
            "  {} openings as white, {} as black ({})",
            diversity.white,
            diversity.black,
            diversity.style()
        )?;
        if let Some((period, count)) = diversity.most_diverse_period {
            writeln!(f, "  Most varied period: {} ({} openings)", period, count)?;
        }

        subsection(f, "Terminations")?;
        for (reason, tally) in &insights.terminations {
            tally_line(f, reason, tally)?;
        }

        subsection(f, "Sessions")?;
        write_sessions(f, &insights.sessions)?;

        subsection(f, "Time since previous game")?;
        for (category, tally) in &insights.by_gap {
            tally_line(f, category, tally)?;
        }

        subsection(f, "Rating gap (own minus opponent)")?;
        for (bucket, tally) in &insights.by_rating_gap {
            tally_line(f, bucket, tally)?;
        }

        subsection(f, "Consistency")?;
        match &insights.consistency {
            Some(consistency) => writeln!(
                f,
                "  Volatility {:.1}% over {}-game windows: {}",
                consistency.volatility, CONSISTENCY_WINDOW, consistency.level
            )?,
            None => writeln!(
                f,
                "  Needs at least {} timed games",
                2 * CONSISTENCY_WINDOW
            )?,
        }

        subsection(f, "Monthly win rate (95% CI)")?;
        for month in &insights.monthly {
            write!(
                f,
                "  {}-{:02}: {:>5.1}% over {:>4} games",
                month.year,
                month.month,
                month.win_rate(),
                month.tally.games()
            )?;
            match month.confidence_half_width {
                Some(ci) => writeln!(f, "  ± {:.1}", ci)?,
                None => writeln!(f)?,
            }
        }

        Ok(())
    }
}

impl fmt::Display for InsightsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CHESS PERFORMANCE INSIGHTS")?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f, "Records analyzed: {}", self.total_records)?;
        for insights in &self.identities {
            writeln!(
                f,
                "  {}: {} games",
                insights.summary.identity,
                insights.summary.tally.games()
            )?;
        }
        if let (Some(first), Some(last)) = (self.first_game, self.last_game) {
            writeln!(
                f,
                "Date range: {} to {}",
                first.format(DATE_FORMAT),
                last.format(DATE_FORMAT)
            )?;
        }
        if self.untimed_records > 0 {
            writeln!(f, "Records without a timestamp: {}", self.untimed_records)?;
        }

        for insights in &self.identities {
            writeln!(f)?;
            self.write_identity(f, insights)?;
        }
        Ok(())
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{}", title.to_uppercase())?;
    writeln!(f, "{}", "-".repeat(RULE_WIDTH))
}

fn subsection(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}:", title)
}

fn tally_line<L: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    label: L,
    tally: &OutcomeTally,
) -> fmt::Result {
    // Display impls here ignore width flags, so pad the rendered string
    let label_text = label.to_string();
    writeln!(
        f,
        "  {:<24} {:>5.1}% over {:>4} games",
        label_text,
        tally.win_rate(),
        tally.games()
    )
}

fn write_sessions(f: &mut fmt::Formatter<'_>, sessions: &[SessionSummary]) -> fmt::Result {
    if sessions.is_empty() {
        return writeln!(f, "  No timed games");
    }

    let games: usize = sessions.iter().map(SessionSummary::games).sum();
    let longest = sessions.iter().map(SessionSummary::games).max().unwrap_or(0);
    let mean_duration =
        sessions.iter().map(SessionSummary::duration_hours).sum::<f64>() / sessions.len() as f64;

    writeln!(
        f,
        "  {} sessions, {:.1} games per session, longest {} games, mean length {:.1} h",
        sessions.len(),
        games as f64 / sessions.len() as f64,
        longest,
        mean_duration
    )?;

    let marathon: OutcomeTally = sessions
        .iter()
        .filter(|s| s.games() >= 3)
        .map(|s| s.tally)
        .fold(OutcomeTally::default(), |acc, t| OutcomeTally {
            wins: acc.wins + t.wins,
            losses: acc.losses + t.losses,
            draws: acc.draws + t.draws,
        });
    if marathon.games() > 0 {
        tally_line(f, "Sessions of 3+ games", &marathon)?;
    }
    Ok(())
}
