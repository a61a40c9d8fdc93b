// Finds patterns in your task history
//
// Like when every bugfix goes reproduce -> patch -> regression test,
// or when your best work always happens Tuesday mornings.

use crate::config::PatternDetectorConfig;
use crate::db::models::{Session, Task};
use crate::db::repository::{PatternRepository, SessionRepository, TaskRepository};
use crate::db::Database;
use crate::error::{RepositoryContext, Result, TaskMindError};
use crate::intelligence::matcher::PatternMatcher;
use crate::intelligence::pattern::{PatternOutcome, PatternType, TaskPattern};
use crate::intelligence::{sequence_miner, temporal, workflow};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// A stored pattern has to score above this to be suggested
const MIN_SUGGESTION_SCORE: f64 = 0.3;

const MAX_PATTERN_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// The window of length `span` ending now
    pub fn last(span: Duration) -> Self {
        let end = Utc::now();
        Self { start: end - span, end }
    }
}

/// What a refresh did to the pattern store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub created: usize,
    pub updated: usize,
    /// Writes that failed and were skipped
    pub failed: usize,
}

impl RefreshReport {
    pub fn total(&self) -> usize {
        self.created + self.updated
    }
}

pub struct PatternDetector {
    tasks: Arc<dyn TaskRepository>,
    sessions: Arc<dyn SessionRepository>,
    patterns: Arc<dyn PatternRepository>,
    config: PatternDetectorConfig,
}

impl PatternDetector {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        sessions: Arc<dyn SessionRepository>,
        patterns: Arc<dyn PatternRepository>,
        config: PatternDetectorConfig,
    ) -> Self {
        Self {
            tasks,
            sessions,
            patterns,
            config,
        }
    }

    /// Everything backed by one database
    pub fn with_database(db: Arc<Database>, config: PatternDetectorConfig) -> Self {
        Self::new(db.clone(), db.clone(), db, config)
    }

    pub fn config(&self) -> &PatternDetectorConfig {
        &self.config
    }

    /// Task sequences that recur often (support) and reliably (confidence)
    ///
    /// # Arguments
    /// * `tasks` - Tasks of one repository, any order
    /// * `min_support` - Minimum share of sequences a pattern must appear in
    pub fn detect_sequence_patterns(&self, tasks: &[Task], min_support: f64) -> Result<Vec<TaskPattern>> {
        self.detect_sequence_patterns_with_cancel(tasks, min_support, &CancellationToken::new())
    }

    pub fn detect_sequence_patterns_with_cancel(
        &self,
        tasks: &[Task],
        min_support: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskPattern>> {
        let repository = tasks.first().map(|t| t.repository.as_str()).unwrap_or_default();
        info!(
            repository = %repository,
            task_count = tasks.len(),
            min_support,
            "detecting sequence patterns"
        );

        let patterns =
            sequence_miner::mine_sequence_patterns(repository, tasks, &self.config, min_support, cancel)?;

        info!(patterns_found = patterns.len(), "sequence pattern detection completed");
        Ok(patterns)
    }

    /// Workflows per project kind over the tasks created in `range`
    pub async fn detect_workflow_patterns(&self, repository: &str, range: TimeRange) -> Result<Vec<TaskPattern>> {
        info!(repository = %repository, start = %range.start, end = %range.end, "detecting workflow patterns");

        let tasks = self
            .tasks
            .find_tasks_by_time_range(repository, range.start, range.end)
            .await
            .context("failed to get tasks")?;

        let patterns = workflow::detect(repository, &tasks, self.config.min_occurrences as usize);

        info!(patterns_found = patterns.len(), "workflow pattern detection completed");
        Ok(patterns)
    }

    /// Productive hours and days, keeping only significant ones
    pub fn detect_temporal_patterns(&self, sessions: &[Session]) -> Result<Vec<TaskPattern>> {
        info!(session_count = sessions.len(), "detecting temporal patterns");

        let patterns: Vec<TaskPattern> = temporal::detect(sessions, &self.config)
            .into_iter()
            .filter(|p| p.is_significant(self.config.min_occurrences, self.config.min_confidence))
            .collect();

        info!(patterns_found = patterns.len(), "temporal pattern detection completed");
        Ok(patterns)
    }

    pub fn calculate_pattern_score(&self, pattern: &TaskPattern, candidate: &[Task]) -> f64 {
        PatternMatcher::score(pattern, candidate)
    }

    /// Fold an observed outcome into the pattern and persist it
    ///
    /// The occurrence updates the running success rate; confidence is then
    /// nudged toward 1 on completion or toward 0 otherwise by the learning rate.
    pub async fn update_pattern_statistics(
        &self,
        pattern: &mut TaskPattern,
        outcome: &PatternOutcome,
    ) -> Result<()> {
        debug!(pattern_id = %pattern.id, completed = outcome.completed, "updating pattern statistics");

        pattern.add_occurrence(outcome.credit(), outcome.recorded_at);

        let rate = self.config.learning_rate;
        if outcome.completed {
            pattern.confidence += rate * (1.0 - pattern.confidence);
        } else {
            pattern.confidence -= rate * pattern.confidence;
        }
        pattern.confidence = pattern.confidence.clamp(0.0, 1.0);

        if let Some(meta) = pattern.metadata.as_object_mut() {
            meta.insert("last_outcome_minutes".to_string(), outcome.actual_duration.into());
            meta.insert("last_outcome_deviation".to_string(), outcome.deviation.into());
        }

        self.patterns
            .update_pattern(pattern)
            .await
            .context("failed to update pattern")
    }

    /// Significant, unexpired patterns of a repository
    pub async fn get_active_patterns(&self, repository: &str) -> Result<Vec<TaskPattern>> {
        let patterns = self
            .patterns
            .find_patterns_by_repository(repository)
            .await
            .context("failed to get patterns")?;

        let now = Utc::now();
        Ok(patterns
            .into_iter()
            .filter(|p| self.is_active(p, now))
            .collect())
    }

    pub fn is_active(&self, pattern: &TaskPattern, now: DateTime<Utc>) -> bool {
        pattern.is_active(
            self.config.min_occurrences,
            self.config.min_confidence,
            self.config.pattern_expiry(),
            now,
        )
    }

    /// Re-mine recent history and merge the results into the store
    pub async fn refresh_patterns(&self, repository: &str) -> Result<RefreshReport> {
        self.refresh_patterns_with_cancel(repository, &CancellationToken::new())
            .await
    }

    pub async fn refresh_patterns_with_cancel(
        &self,
        repository: &str,
        cancel: &CancellationToken,
    ) -> Result<RefreshReport> {
        info!(repository = %repository, "refreshing patterns");

        let range = TimeRange::last(self.config.refresh_window());

        let tasks = self
            .tasks
            .find_tasks_by_time_range(repository, range.start, range.end)
            .await
            .context("failed to get recent tasks")?;

        let sessions = self
            .sessions
            .find_sessions_by_time_range(repository, range.start, range.end)
            .await
            .context("failed to get recent sessions")?;

        let mut mined = self.detect_sequence_patterns_with_cancel(&tasks, self.config.min_support, cancel)?;
        if cancel.is_cancelled() {
            return Err(TaskMindError::Cancelled);
        }
        mined.extend(workflow::detect(repository, &tasks, self.config.min_occurrences as usize));
        mined.extend(self.detect_temporal_patterns(&sessions)?);

        let totals = FrequencyTotals {
            sequences: sequence_miner::extract_sequences(
                &tasks,
                self.config.sequence_gap(),
                self.config.min_pattern_length,
            )
            .len(),
            tasks: tasks.len(),
        };

        let stored = self
            .patterns
            .find_patterns_by_repository(repository)
            .await
            .context("failed to get stored patterns")?;

        let mut by_key: HashMap<&str, &TaskPattern> = HashMap::new();
        for pattern in &stored {
            by_key.entry(pattern.key.as_str()).or_insert(pattern);
        }

        let mut report = RefreshReport::default();
        for mut pattern in mined {
            pattern.repository = repository.to_string();

            let result = match by_key.get(pattern.key.as_str()) {
                Some(existing) => {
                    merge_with_stored(existing, &mut pattern, &totals);
                    self.patterns
                        .update_pattern(&pattern)
                        .await
                        .map(|_| report.updated += 1)
                }
                None => self
                    .patterns
                    .create_pattern(&pattern)
                    .await
                    .map(|_| report.created += 1),
            };

            if let Err(e) = result {
                warn!(repository = %repository, key = %pattern.key, error = %e, "failed to save pattern");
                report.failed += 1;
            }
        }

        info!(
            repository = %repository,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "pattern refresh completed"
        );

        Ok(report)
    }

    /// Active patterns that the tasks in flight look like, best first
    pub async fn get_pattern_suggestions(&self, current_tasks: &[Task]) -> Result<Vec<TaskPattern>> {
        let Some(first) = current_tasks.first() else {
            return Ok(Vec::new());
        };

        let active = self.get_active_patterns(&first.repository).await?;

        let mut scored: Vec<(f64, TaskPattern)> = active
            .into_iter()
            .map(|p| (self.calculate_pattern_score(&p, current_tasks), p))
            .filter(|(score, _)| *score > MIN_SUGGESTION_SCORE)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(MAX_PATTERN_SUGGESTIONS)
            .map(|(_, p)| p)
            .collect())
    }
}

/// What mined frequencies are relative to in one refresh
#[derive(Debug, Clone, Copy)]
struct FrequencyTotals {
    sequences: usize,
    tasks: usize,
}

/// Carry identity and outcome history from the stored pattern into a freshly
/// mined one with the same key
///
/// Occurrences never go down. Frequency is recomputed from the merged count,
/// and confidence keeps whatever outcome feedback moved it away from the
/// formula.
fn merge_with_stored(stored: &TaskPattern, mined: &mut TaskPattern, totals: &FrequencyTotals) {
    mined.id = stored.id.clone();
    mined.created_at = stored.created_at;
    mined.first_seen = stored.first_seen.min(mined.first_seen);
    mined.last_seen = stored.last_seen.max(mined.last_seen);

    // Temporal scores come from the current window only
    if mined.pattern_type == PatternType::Temporal {
        return;
    }

    mined.occurrences = stored.occurrences.max(mined.occurrences);
    mined.success_rate = stored.success_rate;

    match mined.pattern_type {
        PatternType::Workflow => mined.set_frequency(totals.tasks),
        _ => mined.set_frequency(totals.sequences),
    }

    let learned = stored.confidence - TaskPattern::confidence_for(stored.occurrences, stored.success_rate);
    mined.confidence = (mined.calculate_confidence() + learned).clamp(0.0, 1.0);
}
