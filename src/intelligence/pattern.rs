/// Pattern types shared by the detectors, the matcher and the ranker

use crate::db::models::{Priority, TaskType};
use crate::error::{Result, TaskMindError};
use crate::intelligence::keywords;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// How many recent samples the median is computed over
const MEDIAN_WINDOW: usize = 32;

/// Occurrences at which the occurrence score reaches one half
const OCCURRENCE_HALF_POINT: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Sequence,
    Workflow,
    Temporal,
    Project,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Sequence => "sequence",
            PatternType::Workflow => "workflow",
            PatternType::Temporal => "temporal",
            PatternType::Project => "project",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = TaskMindError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequence" => Ok(PatternType::Sequence),
            "workflow" => Ok(PatternType::Workflow),
            "temporal" => Ok(PatternType::Temporal),
            "project" => Ok(PatternType::Project),
            other => Err(TaskMindError::InvalidData(format!("unknown pattern type '{}'", other))),
        }
    }
}

/// Streaming duration statistics in minutes.
///
/// Mean and variance use Welford's online update so they never need the full
/// sample history. The median is taken over the most recent samples only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DurationStats {
    pub samples: u64,
    pub mean: f64,
    pub m2: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    #[serde(default)]
    recent: VecDeque<f64>,
}

impl DurationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sample(minutes: f64) -> Self {
        let mut stats = Self::new();
        stats.add_sample(minutes);
        stats
    }

    pub fn add_sample(&mut self, minutes: f64) {
        if !minutes.is_finite() || minutes < 0.0 {
            return;
        }

        self.samples += 1;
        if self.samples == 1 {
            self.min = minutes;
            self.max = minutes;
        } else {
            self.min = self.min.min(minutes);
            self.max = self.max.max(minutes);
        }

        let delta = minutes - self.mean;
        self.mean += delta / self.samples as f64;
        self.m2 += delta * (minutes - self.mean);

        self.recent.push_back(minutes);
        if self.recent.len() > MEDIAN_WINDOW {
            self.recent.pop_front();
        }
        self.median = median(&self.recent);
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Population variance
    pub fn variance(&self) -> f64 {
        if self.samples < 2 {
            0.0
        } else {
            self.m2 / self.samples as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

fn median(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted: Vec<f64> = values.iter().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// One position in a pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternStep {
    pub order: usize,
    pub task_type: TaskType,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub duration: DurationStats,
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub probability: f64,
}

/// What happened when someone followed a pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternOutcome {
    pub pattern_id: String,
    pub completed: bool,
    /// 0..=1 for partial completion
    pub completion_rate: f64,
    /// Minutes
    pub actual_duration: f64,
    /// How far the actual duration strayed from the predicted one
    pub deviation: f64,
    pub satisfaction: f64,
    pub recorded_at: DateTime<Utc>,
}

impl PatternOutcome {
    /// Success credit this outcome contributes to the running success rate
    pub fn credit(&self) -> f64 {
        if self.completed {
            1.0
        } else {
            self.completion_rate.clamp(0.0, 1.0)
        }
    }
}

/// A recurring behavior detected in a repository's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskPattern {
    pub id: String,
    /// Stable identity across mining runs, e.g. `bugfix:high->testing:medium`
    pub key: String,
    pub pattern_type: PatternType,
    pub name: String,
    pub description: String,
    pub sequence: Vec<PatternStep>,
    pub frequency: f64,
    pub confidence: f64,
    pub success_rate: f64,
    pub occurrences: u32,
    pub repository: String,
    pub project_type: Option<String>,
    pub metadata: serde_json::Value,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskPattern {
    /// Fresh pattern with no occurrences yet
    pub fn new(
        key: impl Into<String>,
        pattern_type: PatternType,
        repository: impl Into<String>,
        sequence: Vec<PatternStep>,
        seen_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key: key.into(),
            pattern_type,
            name: String::new(),
            description: String::new(),
            sequence,
            frequency: 0.0,
            confidence: 0.0,
            success_rate: 0.0,
            occurrences: 0,
            repository: repository.into(),
            project_type: None,
            metadata: serde_json::json!({}),
            first_seen: seen_at,
            last_seen: seen_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// `occurrences/(occurrences+10)·0.6 + success_rate·0.4`, clamped
    pub fn confidence_for(occurrences: u32, success_rate: f64) -> f64 {
        let occurrences = occurrences as f64;
        let occurrence_score = occurrences / (occurrences + OCCURRENCE_HALF_POINT);
        (occurrence_score * 0.6 + success_rate * 0.4).clamp(0.0, 1.0)
    }

    /// Recompute and store confidence from the current counters
    pub fn calculate_confidence(&mut self) -> f64 {
        self.confidence = Self::confidence_for(self.occurrences, self.success_rate);
        self.confidence
    }

    /// Count one more occurrence. `success_credit` (0..=1) folds into the running
    /// mean success rate.
    pub fn add_occurrence(&mut self, success_credit: f64, seen_at: DateTime<Utc>) {
        self.occurrences = self.occurrences.saturating_add(1);

        let credit = success_credit.clamp(0.0, 1.0);
        self.success_rate += (credit - self.success_rate) / self.occurrences as f64;
        self.success_rate = self.success_rate.clamp(0.0, 1.0);

        if seen_at > self.last_seen {
            self.last_seen = seen_at;
        }
        if seen_at < self.first_seen {
            self.first_seen = seen_at;
        }

        self.calculate_confidence();
        self.updated_at = Utc::now();
    }

    /// Set support from the number of sequences observed in the same pass
    pub fn set_frequency(&mut self, total_sequences: usize) {
        self.frequency = if total_sequences == 0 {
            0.0
        } else {
            (self.occurrences as f64 / total_sequences as f64).clamp(0.0, 1.0)
        };
    }

    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen > max_age
    }

    /// Seen often enough and trusted enough. Uses the stored confidence.
    pub fn is_significant(&self, min_occurrences: u32, min_confidence: f64) -> bool {
        self.occurrences >= min_occurrences && self.confidence >= min_confidence
    }

    /// Significant and not expired
    pub fn is_active(
        &self,
        min_occurrences: u32,
        min_confidence: f64,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        self.is_significant(min_occurrences, min_confidence) && !self.is_expired(max_age, now)
    }

    /// All step keywords, deduplicated
    pub fn keywords(&self) -> Vec<String> {
        let mut all = Vec::new();
        for step in &self.sequence {
            keywords::merge(&mut all, &step.keywords);
        }
        all
    }

    /// Sum of the mean step durations in minutes
    pub fn estimated_duration(&self) -> f64 {
        self.sequence.iter().map(|step| step.duration.mean).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn step(task_type: TaskType) -> PatternStep {
        PatternStep {
            order: 0,
            task_type,
            keywords: vec!["login".to_string()],
            duration: DurationStats::new(),
            priority: Priority::High,
            tags: Vec::new(),
            probability: 1.0,
        }
    }

    #[test]
    fn test_confidence_formula() {
        // 4 occurrences at 0.8 success: (4/14)·0.6 + 0.32
        let confidence = TaskPattern::confidence_for(4, 0.8);
        assert!((confidence - 0.491_428).abs() < 1e-5);
        assert!(confidence < 0.5);
    }

    #[test]
    fn test_add_occurrence_running_success_rate() {
        let mut pattern = TaskPattern::new("k", PatternType::Sequence, "acme/api", vec![], Utc::now());

        pattern.add_occurrence(1.0, Utc::now());
        pattern.add_occurrence(0.0, Utc::now());
        pattern.add_occurrence(0.5, Utc::now());

        assert_eq!(pattern.occurrences, 3);
        assert!((pattern.success_rate - 0.5).abs() < 1e-9);
        assert!((pattern.confidence - TaskPattern::confidence_for(3, 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut pattern = TaskPattern::new("k", PatternType::Sequence, "acme/api", vec![], now);
        pattern.occurrences = 50;
        pattern.success_rate = 1.0;
        pattern.calculate_confidence();
        pattern.last_seen = now - Duration::days(31);

        assert!(pattern.is_significant(3, 0.6));
        assert!(pattern.is_expired(Duration::days(30), now));
        assert!(!pattern.is_active(3, 0.6, Duration::days(30), now));
    }

    #[test]
    fn test_keywords_deduplicated_across_steps() {
        let mut pattern = TaskPattern::new(
            "k",
            PatternType::Sequence,
            "acme/api",
            vec![step(TaskType::Bugfix), step(TaskType::Testing)],
            Utc::now(),
        );
        pattern.sequence[1].keywords.push("oauth".to_string());

        assert_eq!(pattern.keywords(), vec!["login", "oauth"]);
    }

    #[test]
    fn test_duration_stats_median_and_bounds() {
        let mut stats = DurationStats::new();
        for minutes in [30.0, 10.0, 20.0, 40.0] {
            stats.add_sample(minutes);
        }

        assert_eq!(stats.samples, 4);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.median, 25.0);
        assert!((stats.mean - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_stats_ignores_garbage() {
        let mut stats = DurationStats::from_sample(10.0);
        stats.add_sample(f64::NAN);
        stats.add_sample(-5.0);
        assert_eq!(stats.samples, 1);
    }

    proptest! {
        #[test]
        fn welford_matches_two_pass(samples in prop::collection::vec(0.0f64..10_000.0, 1..60)) {
            let mut stats = DurationStats::new();
            for s in &samples {
                stats.add_sample(*s);
            }

            let n = samples.len() as f64;
            let mean = samples.iter().sum::<f64>() / n;
            let variance = if samples.len() < 2 {
                0.0
            } else {
                samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n
            };

            prop_assert!((stats.mean - mean).abs() < 1e-6 * mean.max(1.0));
            prop_assert!((stats.variance() - variance).abs() < 1e-6 * variance.max(1.0));
        }

        #[test]
        fn counters_stay_bounded(credits in prop::collection::vec(-1.0f64..2.0, 1..40)) {
            let mut pattern = TaskPattern::new("k", PatternType::Sequence, "r", vec![], Utc::now());
            let mut previous = 0;
            for credit in credits {
                pattern.add_occurrence(credit, Utc::now());
                prop_assert!(pattern.occurrences > previous);
                previous = pattern.occurrences;
                prop_assert!((0.0..=1.0).contains(&pattern.success_rate));
                prop_assert!((0.0..=1.0).contains(&pattern.confidence));
            }
        }
    }
}
