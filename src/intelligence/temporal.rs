/// When is this person productive?
///
/// Sessions are bucketed by hour of day and by day of week. Buckets with enough
/// samples and a high average productivity become one temporal pattern per
/// dimension.

use crate::config::PatternDetectorConfig;
use crate::db::models::Session;
use crate::intelligence::pattern::{PatternType, TaskPattern};
use chrono::{Datelike, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalDimension {
    Hourly,
    Weekly,
}

impl TemporalDimension {
    fn as_str(&self) -> &'static str {
        match self {
            TemporalDimension::Hourly => "hourly",
            TemporalDimension::Weekly => "weekly",
        }
    }

    fn bucket(&self, session: &Session) -> u32 {
        match self {
            TemporalDimension::Hourly => session.start_time.hour(),
            TemporalDimension::Weekly => session.start_time.weekday().num_days_from_monday(),
        }
    }

    fn label(&self, bucket: u32) -> String {
        match self {
            TemporalDimension::Hourly => format!("{:02}:00", bucket),
            TemporalDimension::Weekly => {
                const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
                DAYS.get(bucket as usize).copied().unwrap_or("?").to_string()
            }
        }
    }
}

/// One qualifying time bucket
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductiveSlot {
    pub bucket: u32,
    pub label: String,
    pub avg_score: f64,
    pub samples: usize,
}

/// Average productivity per bucket, for buckets with at least `min_samples`
pub fn bucket_averages(
    sessions: &[&Session],
    dimension: TemporalDimension,
    min_samples: usize,
) -> BTreeMap<u32, (f64, usize)> {
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for session in sessions {
        buckets
            .entry(dimension.bucket(session))
            .or_default()
            .push(session.productivity_score);
    }

    buckets
        .into_iter()
        .filter(|(_, scores)| !scores.is_empty() && scores.len() >= min_samples)
        .map(|(bucket, scores)| {
            let avg = scores.iter().sum::<f64>() / scores.len() as f64;
            (bucket, (avg, scores.len()))
        })
        .collect()
}

/// Build the temporal pattern for one dimension, if any bucket qualifies
pub fn analyze_dimension(
    repository: &str,
    sessions: &[&Session],
    dimension: TemporalDimension,
    config: &PatternDetectorConfig,
) -> Option<TaskPattern> {
    let averages = bucket_averages(sessions, dimension, config.min_occurrences as usize);

    let slots: Vec<ProductiveSlot> = averages
        .iter()
        .filter(|(_, (avg, _))| *avg > config.significance_threshold)
        .map(|(bucket, (avg, samples))| ProductiveSlot {
            bucket: *bucket,
            label: dimension.label(*bucket),
            avg_score: *avg,
            samples: *samples,
        })
        .collect();

    if slots.is_empty() {
        return None;
    }

    let best = slots
        .iter()
        .map(|s| s.avg_score)
        .fold(0.0_f64, f64::max)
        .clamp(0.0, 1.0);
    let occurrences: usize = slots.iter().map(|s| s.samples).sum();

    let first_seen = sessions.iter().map(|s| s.start_time).min().unwrap_or_else(Utc::now);
    let last_seen = sessions.iter().map(|s| s.start_time).max().unwrap_or_else(Utc::now);

    let mut pattern = TaskPattern::new(
        format!("temporal:{}", dimension.as_str()),
        PatternType::Temporal,
        repository,
        Vec::new(),
        first_seen,
    );
    pattern.last_seen = last_seen;
    pattern.name = match dimension {
        TemporalDimension::Hourly => "Daily Productivity Pattern".to_string(),
        TemporalDimension::Weekly => "Weekly Productivity Pattern".to_string(),
    };
    pattern.description = format!(
        "High productivity {}: {}",
        match dimension {
            TemporalDimension::Hourly => "hours",
            TemporalDimension::Weekly => "days",
        },
        slots.iter().map(|s| s.label.as_str()).collect::<Vec<_>>().join(", ")
    );
    pattern.occurrences = u32::try_from(occurrences).unwrap_or(u32::MAX);
    pattern.success_rate = best;
    pattern.frequency = best;
    pattern.confidence = best;
    pattern.metadata = serde_json::json!({
        "dimension": dimension.as_str(),
        "productive_slots": slots,
        "best_score": best,
    });

    Some(pattern)
}

/// Hourly and weekly patterns for a set of sessions from one repository.
///
/// Sessions longer than the temporal window are left-running timers and are
/// ignored.
pub fn detect(sessions: &[Session], config: &PatternDetectorConfig) -> Vec<TaskPattern> {
    let Some(repository) = sessions.first().map(|s| s.repository.clone()) else {
        return Vec::new();
    };

    let window_mins = (config.temporal_window_hours * 60) as f64;
    let usable: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.duration_mins <= window_mins)
        .collect();

    [TemporalDimension::Hourly, TemporalDimension::Weekly]
        .into_iter()
        .filter_map(|dimension| analyze_dimension(&repository, &usable, dimension, config))
        .collect()
}
