// Mines task sequences that keep showing up
//
// Completed tasks are chained into sequences (a long quiet gap starts a new one),
// every contiguous window of each sequence is counted, and windows seen often
// and reliably enough become sequence patterns.

use crate::config::PatternDetectorConfig;
use crate::db::models::Task;
use crate::error::{Result, TaskMindError};
use crate::intelligence::keywords;
use crate::intelligence::pattern::{DurationStats, PatternStep, PatternType, TaskPattern};
use chrono::Duration;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

// Frequencies closer than this are treated as a tie
const FREQUENCY_TIE: f64 = 0.001;

/// Split a repository's completed tasks into time-bounded sequences
///
/// Tasks are ordered by completion time. A gap longer than `max_gap` between two
/// completions starts a new sequence; sequences shorter than `min_length` are
/// dropped.
pub fn extract_sequences<'a>(tasks: &'a [Task], max_gap: Duration, min_length: usize) -> Vec<Vec<&'a Task>> {
    let mut completed: Vec<&Task> = tasks.iter().filter(|t| t.is_completed()).collect();
    completed.sort_by_key(|t| t.completion_time());

    let mut sequences = Vec::new();
    let mut current: Vec<&Task> = Vec::new();

    for task in completed {
        if let Some(last) = current.last() {
            if task.completion_time() - last.completion_time() > max_gap {
                sequences.push(std::mem::take(&mut current));
            }
        }
        current.push(task);
    }
    if !current.is_empty() {
        sequences.push(current);
    }

    sequences.retain(|seq| seq.len() >= min_length.max(1));
    sequences
}

/// All contiguous windows of length `min_len..=max_len`
pub fn generate_subsequences<'s, 'a>(
    sequence: &'s [&'a Task],
    min_len: usize,
    max_len: usize,
) -> Vec<&'s [&'a Task]> {
    let min_len = min_len.max(1);
    let max_len = max_len.min(sequence.len());

    (min_len..=max_len)
        .flat_map(|len| sequence.windows(len))
        .collect()
}

/// Stable identity of a window: `type:priority` per task joined by `->`
pub fn pattern_key(window: &[&Task]) -> String {
    window
        .iter()
        .map(|t| format!("{}:{}", t.inferred_type(), t.priority))
        .collect::<Vec<_>>()
        .join("->")
}

/// Counts windows across sequences and builds patterns from them
pub struct PatternAggregator {
    repository: String,
    overrun_tolerance: f64,
    patterns: HashMap<String, TaskPattern>,
    total_sequences: usize,
}

impl PatternAggregator {
    pub fn new(repository: impl Into<String>, overrun_tolerance: f64) -> Self {
        Self {
            repository: repository.into(),
            overrun_tolerance,
            patterns: HashMap::new(),
            total_sequences: 0,
        }
    }

    /// Count every window of one sequence
    pub fn observe_sequence(&mut self, sequence: &[&Task], min_len: usize, max_len: usize) {
        self.total_sequences += 1;
        for window in generate_subsequences(sequence, min_len, max_len) {
            self.observe_window(window);
        }
    }

    pub fn observe_window(&mut self, window: &[&Task]) {
        let Some(last) = window.last() else {
            return;
        };
        let seen_at = last.completion_time();
        let credit = self.success_credit(window);
        let key = pattern_key(window);

        match self.patterns.get_mut(&key) {
            Some(pattern) => {
                for (step, task) in pattern.sequence.iter_mut().zip(window) {
                    if let Some(minutes) = task.duration_minutes() {
                        step.duration.add_sample(minutes);
                    }
                    keywords::merge(&mut step.keywords, &keywords::extract(&task.content));
                }
                pattern.add_occurrence(credit, seen_at);
            }
            None => {
                let first_seen = window.first().map(|t| t.completion_time()).unwrap_or(seen_at);
                let mut pattern = TaskPattern::new(
                    key.clone(),
                    PatternType::Sequence,
                    self.repository.clone(),
                    window.iter().enumerate().map(|(i, t)| step_from_task(i, t)).collect(),
                    first_seen,
                );
                pattern.name = pattern_name(window);
                pattern.description = format!(
                    "Common sequence of {} tasks typically completed together",
                    window.len()
                );
                pattern.add_occurrence(credit, seen_at);
                self.patterns.insert(key, pattern);
            }
        }
    }

    /// Share of the window's tasks that finished within their estimate
    fn success_credit(&self, window: &[&Task]) -> f64 {
        if window.is_empty() {
            return 0.0;
        }
        let met = window
            .iter()
            .filter(|t| t.met_estimate(self.overrun_tolerance))
            .count();
        met as f64 / window.len() as f64
    }

    pub fn total_sequences(&self) -> usize {
        self.total_sequences
    }

    /// Keep the patterns that clear both thresholds, best first
    pub fn finish(self, min_support: f64, min_confidence: f64) -> Vec<TaskPattern> {
        retain_significant(
            self.patterns.into_values().collect(),
            self.total_sequences,
            min_support,
            min_confidence,
        )
    }
}

/// Set support from `total_sequences`, refresh confidence, drop anything below
/// either threshold and sort by frequency then confidence.
pub fn retain_significant(
    patterns: Vec<TaskPattern>,
    total_sequences: usize,
    min_support: f64,
    min_confidence: f64,
) -> Vec<TaskPattern> {
    let mut kept: Vec<TaskPattern> = patterns
        .into_iter()
        .filter_map(|mut pattern| {
            pattern.set_frequency(total_sequences);
            pattern.calculate_confidence();
            (pattern.frequency >= min_support && pattern.confidence >= min_confidence).then_some(pattern)
        })
        .collect();

    kept.sort_by(|a, b| {
        if (a.frequency - b.frequency).abs() < FREQUENCY_TIE {
            b.confidence.total_cmp(&a.confidence)
        } else {
            b.frequency.total_cmp(&a.frequency)
        }
    });
    kept
}

/// Full mining pass over one repository's tasks
pub fn mine_sequence_patterns(
    repository: &str,
    tasks: &[Task],
    config: &PatternDetectorConfig,
    min_support: f64,
    cancel: &CancellationToken,
) -> Result<Vec<TaskPattern>> {
    let sequences = extract_sequences(tasks, config.sequence_gap(), config.min_pattern_length);
    let mut aggregator = PatternAggregator::new(repository, config.overrun_tolerance);

    for sequence in &sequences {
        if cancel.is_cancelled() {
            return Err(TaskMindError::Cancelled);
        }
        aggregator.observe_sequence(sequence, config.min_pattern_length, config.max_pattern_length);
    }

    tracing::debug!(
        repository = %repository,
        sequences = aggregator.total_sequences(),
        "sequence mining counted windows"
    );

    Ok(aggregator.finish(min_support, config.min_confidence))
}

fn step_from_task(order: usize, task: &Task) -> PatternStep {
    PatternStep {
        order,
        task_type: task.inferred_type(),
        keywords: keywords::extract(&task.content),
        duration: task
            .duration_minutes()
            .map(DurationStats::from_sample)
            .unwrap_or_default(),
        priority: task.priority,
        tags: task.tags.clone(),
        probability: 1.0,
    }
}

fn pattern_name(window: &[&Task]) -> String {
    window
        .iter()
        .map(|t| t.inferred_type().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Priority, TaskStatus, TaskType};
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn done(content: &str, task_type: TaskType, priority: Priority, completed_at: DateTime<Utc>) -> Task {
        let mut task = Task::new("acme/api", content);
        task.task_type = Some(task_type);
        task.priority = priority;
        task.status = TaskStatus::Completed;
        task.created_at = completed_at - Duration::minutes(30);
        task.updated_at = completed_at;
        task.completed_at = Some(completed_at);
        task
    }

    fn bugfix_day(start: DateTime<Utc>) -> Vec<Task> {
        (0..5)
            .map(|i| {
                done(
                    &format!("fix login crash {}", i),
                    TaskType::Bugfix,
                    Priority::High,
                    start + Duration::hours(i),
                )
            })
            .collect()
    }

    #[test]
    fn test_same_day_tasks_form_one_sequence() {
        let tasks = bugfix_day(base());
        let sequences = extract_sequences(&tasks, Duration::hours(4), 2);

        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].len(), 5);
        assert_eq!(generate_subsequences(&sequences[0], 2, 5).len(), 10);
    }

    #[test]
    fn test_gap_splits_and_short_sequences_drop() {
        let mut tasks = bugfix_day(base());
        // Lone task a day later forms a sequence of one, which is dropped
        tasks.push(done("deploy", TaskType::Deployment, Priority::Low, base() + Duration::days(1)));
        // Pending tasks never count
        let mut pending = Task::new("acme/api", "later");
        pending.created_at = base();
        tasks.push(pending);

        let sequences = extract_sequences(&tasks, Duration::hours(4), 2);
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].len(), 5);
    }

    #[test]
    fn test_sequences_sorted_by_completion_time() {
        let mut tasks = bugfix_day(base());
        tasks.reverse();
        let sequences = extract_sequences(&tasks, Duration::hours(4), 2);
        assert!(sequences[0].windows(2).all(|w| w[0].completion_time() <= w[1].completion_time()));
    }

    #[test]
    fn test_pattern_key() {
        let a = done("fix", TaskType::Bugfix, Priority::High, base());
        let b = done("test", TaskType::Testing, Priority::Medium, base());
        assert_eq!(pattern_key(&[&a, &b]), "bugfix:high->testing:medium");
    }

    #[test]
    fn test_aggregator_counts_and_merges() {
        let mut aggregator = PatternAggregator::new("acme/api", 1.5);
        for day in 0..4 {
            let tasks = bugfix_day(base() + Duration::days(day));
            let sequences = extract_sequences(&tasks, Duration::hours(4), 2);
            aggregator.observe_sequence(&sequences[0], 2, 2);
        }

        let patterns = aggregator.finish(0.1, 0.0);
        assert_eq!(patterns.len(), 1);

        let pattern = &patterns[0];
        assert_eq!(pattern.key, "bugfix:high->bugfix:high");
        // 4 windows of length 2 per day, 4 days
        assert_eq!(pattern.occurrences, 16);
        assert_eq!(pattern.frequency, 1.0);
        assert_eq!(pattern.success_rate, 1.0);
        assert_eq!(pattern.sequence[0].duration.samples, 16);
        assert!(pattern.sequence[0].keywords.contains(&"login".to_string()));
    }

    #[test]
    fn test_overrun_lowers_success() {
        let mut aggregator = PatternAggregator::new("acme/api", 1.5);
        let mut tasks = bugfix_day(base());
        tasks[0].estimated_mins = Some(10);
        tasks[0].actual_mins = Some(60);

        let sequences = extract_sequences(&tasks, Duration::hours(4), 2);
        let window = &sequences[0][0..2];
        aggregator.observe_window(window);

        let patterns = aggregator.finish(0.0, 0.0);
        assert!((patterns[0].success_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_excluded_despite_support() {
        let mut pattern = TaskPattern::new(
            "bugfix:high->bugfix:high",
            PatternType::Sequence,
            "acme/api",
            Vec::new(),
            base(),
        );
        pattern.occurrences = 4;
        pattern.success_rate = 0.8;

        let kept = retain_significant(vec![pattern.clone()], 10, 0.3, 0.5);
        assert!(kept.is_empty());

        let kept = retain_significant(vec![pattern], 10, 0.3, 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].frequency - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_mining() {
        let tasks = bugfix_day(base());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = mine_sequence_patterns(
            "acme/api",
            &tasks,
            &PatternDetectorConfig::default(),
            0.1,
            &cancel,
        );
        assert!(matches!(result, Err(TaskMindError::Cancelled)));
    }

    proptest! {
        #[test]
        fn window_count_matches_formula(n in 0usize..12, min in 1usize..4, extra in 0usize..4) {
            let max = min + extra;
            let tasks: Vec<Task> = (0..n).map(|i| {
                done("work", TaskType::General, Priority::Medium, base() + Duration::minutes(i as i64))
            }).collect();
            let refs: Vec<&Task> = tasks.iter().collect();

            let expected: usize = (min..=max.min(n)).map(|len| n - len + 1).sum();
            prop_assert_eq!(generate_subsequences(&refs, min, max).len(), expected);
        }

        #[test]
        fn output_respects_thresholds(days in 1i64..6, min_support in 0.0f64..1.0, min_conf in 0.0f64..1.0) {
            let tasks: Vec<Task> = (0..days).flat_map(|d| bugfix_day(base() + Duration::days(d))).collect();
            let config = PatternDetectorConfig { min_confidence: min_conf, ..Default::default() };

            let patterns = mine_sequence_patterns("acme/api", &tasks, &config, min_support, &CancellationToken::new()).unwrap();
            for p in patterns {
                prop_assert!(p.frequency >= min_support);
                prop_assert!(p.confidence >= min_conf);
                prop_assert!((0.0..=1.0).contains(&p.frequency));
                prop_assert!((0.0..=1.0).contains(&p.success_rate));
            }
        }
    }
}
