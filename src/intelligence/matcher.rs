/// Scores how closely a live task sequence follows a stored pattern

use crate::db::models::Task;
use crate::intelligence::keywords;
use crate::intelligence::pattern::TaskPattern;

const TYPE_WEIGHT: f64 = 0.4;
const KEYWORD_WEIGHT: f64 = 0.3;
const PRIORITY_WEIGHT: f64 = 0.2;
const DURATION_WEIGHT: f64 = 0.1;

/// Floor for the spread used when scoring durations, in minutes
const MIN_DURATION_SPREAD: f64 = 1.0;

/// Stateless scorer, like `Scorer`
pub struct PatternMatcher;

impl PatternMatcher {
    /// Similarity of `candidate` to `pattern` in [0, 1]
    ///
    /// Positions are aligned from the start; ratios are over the pattern length
    /// so a short candidate can't fully match a long pattern.
    pub fn score(pattern: &TaskPattern, candidate: &[Task]) -> f64 {
        if pattern.sequence.is_empty() || candidate.is_empty() {
            return 0.0;
        }

        let pattern_len = pattern.sequence.len() as f64;
        let aligned = || pattern.sequence.iter().zip(candidate);

        let type_matches = aligned()
            .filter(|(step, task)| step.task_type == task.inferred_type())
            .count() as f64;
        let priority_matches = aligned()
            .filter(|(step, task)| step.priority == task.priority)
            .count() as f64;

        let mut candidate_keywords = Vec::new();
        for task in candidate {
            keywords::merge(&mut candidate_keywords, &keywords::extract(&task.content));
        }
        let keyword_similarity = keywords::jaccard(&pattern.keywords(), &candidate_keywords);

        let score = (type_matches / pattern_len) * TYPE_WEIGHT
            + keyword_similarity * KEYWORD_WEIGHT
            + (priority_matches / pattern_len) * PRIORITY_WEIGHT
            + Self::duration_similarity(pattern, candidate) * DURATION_WEIGHT;

        score.clamp(0.0, 1.0)
    }

    /// Gaussian similarity of task durations to the step statistics, averaged
    /// over positions where both sides have data. 0.5 when nothing compares.
    pub fn duration_similarity(pattern: &TaskPattern, candidate: &[Task]) -> f64 {
        let similarities: Vec<f64> = pattern
            .sequence
            .iter()
            .zip(candidate)
            .filter_map(|(step, task)| {
                if step.duration.is_empty() {
                    return None;
                }
                let actual = task.duration_minutes()?;
                let mean = step.duration.mean;
                let spread = step
                    .duration
                    .std_dev()
                    .max(0.25 * mean)
                    .max(MIN_DURATION_SPREAD);
                let z = (actual - mean).abs() / spread;
                Some((-z * z / 2.0).exp())
            })
            .collect();

        if similarities.is_empty() {
            0.5
        } else {
            similarities.iter().sum::<f64>() / similarities.len() as f64
        }
    }
}
