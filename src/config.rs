use crate::errors::{AnalysisError, Result};
use crate::{config_error, validation_error};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// How a game between two tracked identities is turned into records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerspectivePolicy {
    /// Check White first, then Black, and emit at most one record per game.
    /// A game between two tracked identities only counts for White.
    FirstMatch,
    /// Emit one record for every tracked side of the game.
    #[default]
    EachTrackedSide,
}

/// Thresholds used when turning the enriched table into a text report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Hours, weekdays, etc. with fewer games are left out of best/worst picks
    pub min_games_per_bucket: usize,
    /// Openings with fewer games are left out of the opening ranking
    pub min_games_per_opening: usize,
    /// Number of openings listed
    pub top_openings: usize,
    /// Trailing window for the rolling win rate
    pub rolling_window: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            min_games_per_bucket: 10,
            min_games_per_opening: 10,
            top_openings: 10,
            rolling_window: 50,
        }
    }
}

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Account names whose games are extracted
    pub tracked_identities: Vec<String>,
    /// A gap strictly longer than this starts a new session
    pub session_gap_hours: f64,
    pub perspective: PerspectivePolicy,
    pub report: ReportOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tracked_identities: vec!["IsmatS".to_string(), "Cassiny".to_string()],
            session_gap_hours: 1.0,
            perspective: PerspectivePolicy::default(),
            report: ReportOptions::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration tracking the given identities
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracked_identities: identities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_session_gap_hours(mut self, hours: f64) -> Self {
        self.session_gap_hours = hours;
        self
    }

    pub fn with_perspective(mut self, perspective: PerspectivePolicy) -> Self {
        self.perspective = perspective;
        self
    }

    pub fn with_report_options(mut self, report: ReportOptions) -> Self {
        self.report = report;
        self
    }

    /// Load a JSON configuration file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            config_error!("cannot open config file {}: {}", path.display(), e)
        })?;
        let config: AnalysisConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Session-break threshold as a duration (millisecond precision).
    pub fn session_gap(&self) -> Duration {
        Duration::milliseconds((self.session_gap_hours * 3_600_000.0).round() as i64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracked_identities.is_empty() {
            return Err(config_error!("at least one tracked identity is required"));
        }

        if let Some(position) = self
            .tracked_identities
            .iter()
            .position(|name| name.trim().is_empty())
        {
            return Err(config_error!("tracked identity #{} is blank", position));
        }

        if !self.session_gap_hours.is_finite() || self.session_gap_hours <= 0.0 {
            return Err(validation_error!(
                "session_gap_hours",
                self.session_gap_hours,
                "a positive number of hours"
            ));
        }

        if self.report.rolling_window == 0 {
            return Err(validation_error!(
                "report.rolling_window",
                0,
                "a window of at least one game"
            ));
        }

        Ok(())
    }
}

impl std::str::FromStr for PerspectivePolicy {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first_match" | "first-match" => Ok(PerspectivePolicy::FirstMatch),
            "each_tracked_side" | "each-tracked-side" => Ok(PerspectivePolicy::EachTrackedSide),
            other => Err(validation_error!(
                "perspective",
                other,
                "first_match or each_tracked_side"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracked_identities, vec!["IsmatS", "Cassiny"]);
        assert_eq!(config.session_gap(), Duration::hours(1));
        assert_eq!(config.perspective, PerspectivePolicy::EachTrackedSide);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let empty = AnalysisConfig::new(Vec::<String>::new());
        assert!(matches!(
            empty.validate(),
            Err(AnalysisError::ConfigurationError(_))
        ));

        let blank = AnalysisConfig::new(["IsmatS", "  "]);
        assert!(blank.validate().is_err());

        let zero_gap = AnalysisConfig::default().with_session_gap_hours(0.0);
        assert!(matches!(
            zero_gap.validate(),
            Err(AnalysisError::ValidationError { .. })
        ));

        let nan_gap = AnalysisConfig::default().with_session_gap_hours(f64::NAN);
        assert!(nan_gap.validate().is_err());
    }

    #[test]
    fn test_session_gap_conversion() {
        let config = AnalysisConfig::default().with_session_gap_hours(2.0);
        assert_eq!(config.session_gap(), Duration::hours(2));

        let config = AnalysisConfig::default().with_session_gap_hours(0.5);
        assert_eq!(config.session_gap(), Duration::minutes(30));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tracked_identities": ["alice"], "perspective": "first_match"}}"#
        )
        .unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tracked_identities, vec!["alice"]);
        assert_eq!(config.perspective, PerspectivePolicy::FirstMatch);
        assert_eq!(config.session_gap_hours, 1.0);
        assert_eq!(config.report, ReportOptions::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = AnalysisConfig::new(["bob"])
            .with_session_gap_hours(2.0)
            .with_perspective(PerspectivePolicy::FirstMatch);
        config.save_to_file(&path).unwrap();

        let loaded = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = AnalysisConfig::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(AnalysisError::ConfigurationError(_))));
    }

    #[test]
    fn test_perspective_from_str() {
        assert_eq!(
            "first-match".parse::<PerspectivePolicy>().unwrap(),
            PerspectivePolicy::FirstMatch
        );
        assert!("both".parse::<PerspectivePolicy>().is_err());
    }
}
