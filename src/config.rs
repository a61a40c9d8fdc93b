/// Runtime configuration
///
/// Every section falls back to its defaults, so a config file only needs the
/// values it wants to change.

use crate::error::{Result, TaskMindError};
use crate::intelligence::criteria::RankingCriteria;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "TASKMIND_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: PatternDetectorConfig,
    #[serde(default)]
    pub ranking: RankingCriteria,
    #[serde(default)]
    pub bottlenecks: BottleneckConfig,
}

/// Thresholds for pattern mining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternDetectorConfig {
    pub min_occurrences: u32,
    pub min_confidence: f64,
    pub min_support: f64,
    pub min_pattern_length: usize,
    pub max_pattern_length: usize,
    /// Completions further apart than this start a new sequence
    pub sequence_gap_hours: i64,
    /// Longest session the temporal analyzer trusts; longer ones are timers
    /// left running and are skipped
    pub temporal_window_hours: i64,
    /// Average productivity a time bucket needs to count as a peak
    pub significance_threshold: f64,
    pub pattern_expiry_days: i64,
    pub refresh_window_days: i64,
    pub learning_rate: f64,
    /// A task still counts as a success up to estimate × this
    pub overrun_tolerance: f64,
}

impl Default for PatternDetectorConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            min_confidence: 0.6,
            min_support: 0.1,
            min_pattern_length: 2,
            max_pattern_length: 5,
            sequence_gap_hours: 4,
            temporal_window_hours: 24,
            significance_threshold: 0.7,
            pattern_expiry_days: 30,
            refresh_window_days: 30,
            learning_rate: 0.1,
            overrun_tolerance: 1.5,
        }
    }
}

impl PatternDetectorConfig {
    pub fn sequence_gap(&self) -> Duration {
        Duration::hours(self.sequence_gap_hours)
    }

    pub fn pattern_expiry(&self) -> Duration {
        Duration::days(self.pattern_expiry_days)
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::days(self.refresh_window_days)
    }
}

/// Thresholds for the bottleneck detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BottleneckConfig {
    /// Task types averaging longer than this are flagged
    pub cycle_time_threshold_hours: f64,
    pub min_samples: usize,
    /// A task blocking at least this many others is flagged
    pub min_blocked_tasks: usize,
    pub low_productivity_threshold: f64,
}

impl Default for BottleneckConfig {
    fn default() -> Self {
        Self {
            cycle_time_threshold_hours: 2.0,
            min_samples: 3,
            min_blocked_tasks: 2,
            low_productivity_threshold: 0.4,
        }
    }
}

impl Config {
    /// Load from `explicit_path`, else `$TASKMIND_CONFIG`, else
    /// `~/.taskmind/config.json`, else defaults.
    ///
    /// An explicitly named file that doesn't exist is an error; a missing
    /// default file is not.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let config = match explicit {
            Some(path) => Self::load_file(&path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path)?,
                _ => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".taskmind").join("config.json"))
    }

    fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TaskMindError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&raw)
            .map_err(|e| TaskMindError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Reject values the algorithms can't work with
    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        check_unit("detector.min_confidence", d.min_confidence)?;
        check_unit("detector.min_support", d.min_support)?;
        check_unit("detector.significance_threshold", d.significance_threshold)?;
        check_unit("detector.learning_rate", d.learning_rate)?;

        if d.min_pattern_length < 1 {
            return Err(TaskMindError::Config("detector.min_pattern_length must be at least 1".into()));
        }
        if d.max_pattern_length < d.min_pattern_length {
            return Err(TaskMindError::Config(format!(
                "detector.max_pattern_length ({}) is below min_pattern_length ({})",
                d.max_pattern_length, d.min_pattern_length
            )));
        }
        if d.sequence_gap_hours <= 0 || d.pattern_expiry_days <= 0 || d.refresh_window_days <= 0 {
            return Err(TaskMindError::Config("detector time windows must be positive".into()));
        }
        if d.overrun_tolerance < 1.0 {
            return Err(TaskMindError::Config("detector.overrun_tolerance must be at least 1.0".into()));
        }

        let r = &self.ranking;
        for (name, value) in [
            ("ranking.relevance_weight", r.relevance_weight),
            ("ranking.urgency_weight", r.urgency_weight),
            ("ranking.confidence_weight", r.confidence_weight),
            ("ranking.personalization_weight", r.personalization_weight),
            ("ranking.learning_rate", r.learning_rate),
            ("ranking.exploration_factor", r.exploration_factor),
            ("ranking.diversity_target", r.diversity_target),
        ] {
            check_unit(name, value)?;
        }
        if r.core_weight_sum() <= 0.0 {
            return Err(TaskMindError::Config("ranking core weights are all zero".into()));
        }

        check_unit("bottlenecks.low_productivity_threshold", self.bottlenecks.low_productivity_threshold)?;
        if self.bottlenecks.cycle_time_threshold_hours <= 0.0 {
            return Err(TaskMindError::Config(
                "bottlenecks.cycle_time_threshold_hours must be positive".into(),
            ));
        }

        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TaskMindError::Config(format!("{} must be within 0..=1, got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"detector": {{"min_support": 0.25}}}}"#).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.detector.min_support, 0.25);
        assert_eq!(config.detector.min_occurrences, 3);
        assert_eq!(config.ranking, RankingCriteria::default());
        assert_eq!(config.bottlenecks.min_blocked_tasks, 2);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"detector": {{"min_confidence": 1.5}}}}"#).unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, TaskMindError::Config(_)));
    }

    #[test]
    fn test_inverted_pattern_lengths_rejected() {
        let mut config = Config::default();
        config.detector.min_pattern_length = 4;
        config.detector.max_pattern_length = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
