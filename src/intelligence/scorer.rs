/// Scoring algorithms for suggestions
///
/// Every function returns a score between 0.0 and 1.0. Missing data scores a
/// neutral 0.5 (or the documented default) rather than failing.

use crate::db::models::{Priority, SessionGoal};
use crate::intelligence::context_detector::TimeOfDay;
use crate::intelligence::keywords;
use crate::intelligence::personalization::PersonalizationProfile;
use crate::intelligence::suggestion::{SourceType, SuggestionType, TaskSuggestion, WorkContext};
use chrono::Duration;
use std::collections::HashSet;

/// Scorer for the individual ranking signals
pub struct Scorer;

impl Scorer {
    /// How well the suggestion fits the repository, work and goals at hand
    pub fn relevance(suggestion: &TaskSuggestion, context: &WorkContext) -> f64 {
        let repository = if suggestion.repository == context.repository { 1.0 } else { 0.3 };

        let task_type = match suggestion.task_type {
            Some(t) if context.active_task_types().contains(&t) => 0.9,
            _ => 0.5,
        };

        let keyword = keywords::jaccard(&suggestion.keywords, &context.task_keywords());
        let pattern = Self::pattern_relevance(suggestion, context);
        let goal = Self::goal_relevance(suggestion, &context.goals);

        let score = repository * 0.3 + task_type * 0.25 + keyword * 0.2 + pattern * 0.15 + goal * 0.1;
        score.clamp(0.0, 1.0)
    }

    fn pattern_relevance(suggestion: &TaskSuggestion, context: &WorkContext) -> f64 {
        let Some(pattern_id) = suggestion.pattern_id.as_deref() else {
            return 0.5;
        };

        if let Some(primary) = context.primary_patterns().into_iter().find(|p| p.id == pattern_id) {
            return primary.confidence;
        }
        match context.find_active_pattern(pattern_id) {
            Some(pattern) => pattern.confidence * 0.8,
            None => 0.3,
        }
    }

    /// Best alignment with any goal; 0.5 when there are none
    pub fn goal_relevance(suggestion: &TaskSuggestion, goals: &[SessionGoal]) -> f64 {
        if goals.is_empty() {
            return 0.5;
        }
        goals
            .iter()
            .map(|g| Self::goal_alignment(suggestion, g))
            .fold(0.0, f64::max)
    }

    /// Dice overlap of the words longer than three characters
    pub fn goal_alignment(suggestion: &TaskSuggestion, goal: &SessionGoal) -> f64 {
        let text = format!("{} {}", suggestion.content, suggestion.description).to_lowercase();
        let goal_text = goal.description.to_lowercase();

        let suggestion_words: HashSet<&str> = text.split_whitespace().collect();
        let goal_words: HashSet<&str> = goal_text.split_whitespace().collect();

        if suggestion_words.is_empty() || goal_words.is_empty() {
            return 0.5;
        }

        let common = suggestion_words
            .intersection(&goal_words)
            .filter(|w| w.chars().count() > 3)
            .count();

        (2.0 * common as f64 / (suggestion_words.len() + goal_words.len()) as f64).clamp(0.0, 1.0)
    }

    pub fn urgency(suggestion: &TaskSuggestion, context: &WorkContext) -> f64 {
        let mut urgency = suggestion.urgency;

        if suggestion.suggestion_type == SuggestionType::Break
            && (context.energy_level < 0.3 || context.is_high_stress())
        {
            urgency += 0.3;
        }

        urgency += match suggestion.priority {
            Priority::Critical => 0.2,
            Priority::High => 0.1,
            Priority::Medium => 0.0,
            Priority::Low => -0.1,
        };

        urgency += Self::deadline_pressure(suggestion, context) * 0.2;

        if suggestion.suggestion_type == SuggestionType::Optimization && context.productivity_score < 0.5 {
            urgency += 0.15;
        }

        urgency.clamp(0.0, 1.0)
    }

    /// How long the related work has been sitting open, as a deadline proxy
    pub fn deadline_pressure(suggestion: &TaskSuggestion, context: &WorkContext) -> f64 {
        let related = context
            .current_tasks
            .iter()
            .find(|t| suggestion.related_task_ids.contains(&t.id));

        let Some(task) = related else {
            return 0.0;
        };

        let age = context.now - task.created_at;
        if task.priority >= Priority::High && age > Duration::hours(24) {
            0.9
        } else if task.priority == Priority::Medium && age > Duration::days(3) {
            0.6
        } else if age > Duration::days(7) {
            0.3
        } else {
            0.0
        }
    }

    /// Source confidence adjusted by what backs it up
    ///
    /// `historical_acceptance` is the share of accepted feedback for the
    /// suggestion type.
    pub fn confidence(suggestion: &TaskSuggestion, context: &WorkContext, historical_acceptance: f64) -> f64 {
        let mut confidence = suggestion.source.confidence;

        match suggestion.source.source_type {
            SourceType::Pattern => {
                if let Some(pattern) = suggestion
                    .pattern_id
                    .as_deref()
                    .and_then(|id| context.find_active_pattern(id))
                {
                    confidence += (pattern.success_rate - 0.5) * 0.2;
                }
            }
            SourceType::Ai => {
                confidence += (Self::context_richness(context) - 0.5) * 0.1;
            }
            SourceType::Analytics => {
                if context.recent_tasks.len() > 5 {
                    confidence += 0.1;
                }
            }
            SourceType::Template | SourceType::History => {}
        }

        confidence += historical_acceptance * 0.15;

        if context.now - suggestion.generated_at < Duration::hours(1) {
            confidence += 0.05;
        }

        confidence.clamp(0.0, 1.0)
    }

    pub fn context_richness(context: &WorkContext) -> f64 {
        let richness = context.current_tasks.len() as f64 / 10.0
            + context.recent_tasks.len() as f64 / 20.0
            + context.active_patterns.len() as f64 / 5.0;
        richness.min(1.0)
    }

    pub fn personalization(
        suggestion: &TaskSuggestion,
        context: &WorkContext,
        profile: Option<&PersonalizationProfile>,
    ) -> f64 {
        let Some(profile) = profile else {
            return 0.5;
        };

        let type_preference = profile.type_preference(suggestion.suggestion_type);
        let timing_preference = profile.timing_preference(context.time_of_day);
        let complexity_fit = 1.0 - (Self::complexity(suggestion) - profile.preferred_complexity).abs();

        let content = suggestion.content.to_lowercase();
        let matches = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| !p.is_empty() && content.contains(&p.to_lowercase()))
                .count() as f64
        };
        let avoidance = (1.0 - 0.3 * matches(&profile.avoidance_patterns)).max(0.0);
        let success = (0.5 + 0.2 * matches(&profile.successful_patterns)).min(1.0);

        let score = type_preference * 0.3
            + timing_preference * 0.2
            + complexity_fit * 0.2
            + avoidance * 0.15
            + success * 0.15;
        score.clamp(0.0, 1.0)
    }

    pub fn context_fit(suggestion: &TaskSuggestion, context: &WorkContext) -> f64 {
        use SuggestionType::*;

        let kind = suggestion.suggestion_type;
        let energy = context.energy_level;
        let focus = context.focus_level;
        let productivity = context.productivity_score;
        let stress = (context.stress_indicators.len() as f64 / 5.0).min(1.0);
        let workload = (context.current_tasks.len() as f64 / 10.0).min(1.0);

        let energy_fit = match kind {
            Break => 1.0 - energy,
            NextTask => energy,
            Optimization => 0.5 + (energy - 0.5) * 0.5,
            _ => 0.7,
        };
        let focus_fit = match kind {
            Break => 1.0 - focus,
            NextTask | Pattern => focus,
            _ => 0.6,
        };
        let productivity_fit = match kind {
            Optimization => 1.0 - productivity,
            NextTask => productivity,
            _ => 0.6,
        };
        let stress_fit = match kind {
            Break => stress,
            Optimization => stress * 0.8,
            _ => 1.0 - stress * 0.5,
        };
        let workload_fit = match kind {
            Break => workload,
            NextTask => 1.0 - workload * 0.5,
            _ => 0.7 - workload * 0.2,
        };

        let score = energy_fit * 0.25
            + focus_fit * 0.25
            + productivity_fit * 0.2
            + stress_fit * 0.15
            + workload_fit * 0.15;
        score.clamp(0.0, 1.0)
    }

    pub fn timing(suggestion: &TaskSuggestion, context: &WorkContext) -> f64 {
        use SuggestionType::*;

        let kind = suggestion.suggestion_type;

        let time_of_day = match (context.time_of_day, kind) {
            (TimeOfDay::Morning, NextTask) => 0.9,
            (TimeOfDay::Morning, Learning | Pattern) => 0.8,
            (TimeOfDay::Morning, Break) => 0.3,
            (TimeOfDay::Afternoon, NextTask) => 0.8,
            (TimeOfDay::Afternoon, Optimization) => 0.9,
            (TimeOfDay::Afternoon, Workflow) => 0.8,
            (TimeOfDay::Afternoon, Break) => 0.7,
            (TimeOfDay::Evening, Optimization) => 0.7,
            (TimeOfDay::Evening, Break) => 0.8,
            (TimeOfDay::Evening, NextTask) => 0.6,
            _ => 0.6,
        };

        let day_of_week = if context.day_of_week.is_weekend() {
            match kind {
                Break | Learning => 0.8,
                _ => 0.5,
            }
        } else {
            0.7
        };

        let working_hours = match context.working_hours {
            None => 1.0,
            Some(hours) if hours.contains(context.local_time) => match kind {
                NextTask | Pattern | Workflow => 0.9,
                Break => 0.6,
                _ => 0.7,
            },
            Some(_) => match kind {
                Break | Learning => 0.8,
                _ => 0.4,
            },
        };

        let session = match context.session_length() {
            None => 0.6,
            Some(length) => match kind {
                Break if length > Duration::hours(2) => 0.9,
                Break if length > Duration::hours(1) => 0.6,
                Break => 0.3,
                NextTask if length < Duration::minutes(30) => 0.9,
                NextTask if length > Duration::hours(4) => 0.4,
                NextTask => 0.7,
                _ => 0.6,
            },
        };

        let score: f64 = time_of_day * 0.3 + day_of_week * 0.2 + working_hours * 0.25 + session * 0.25;
        score.clamp(0.0, 1.0)
    }

    pub fn pattern_match(suggestion: &TaskSuggestion, context: &WorkContext) -> f64 {
        match suggestion.pattern_id.as_deref() {
            None => 0.5,
            Some(id) => context
                .find_active_pattern(id)
                .map(|p| p.confidence.clamp(0.0, 1.0))
                .unwrap_or(0.3),
        }
    }

    /// Rough effort estimate from the suggestion's shape
    pub fn complexity(suggestion: &TaskSuggestion) -> f64 {
        Self::complexity_of(suggestion.suggestion_type, &suggestion.content)
    }

    pub fn complexity_of(suggestion_type: SuggestionType, content: &str) -> f64 {
        let mut complexity: f64 = 0.5;

        if content.chars().count() > 100 {
            complexity += 0.2;
        }
        match suggestion_type {
            SuggestionType::Learning | SuggestionType::Workflow => complexity += 0.2,
            SuggestionType::Break => complexity -= 0.3,
            _ => {}
        }

        complexity.clamp(0.0, 1.0)
    }
}
