/// Suggestion ranking
///
/// Combines the `Scorer` signals into one composite score per suggestion,
/// applies boosts and penalties, keeps the result list diverse and learns from
/// feedback.

use crate::intelligence::context_detector::TimeOfDay;
use crate::intelligence::criteria::RankingCriteria;
use crate::intelligence::personalization::{
    push_bounded, InMemoryPersonalizationStore, PersonalizationProfile, PersonalizationStore, ShownSuggestion,
};
use crate::intelligence::scorer::Scorer;
use crate::intelligence::suggestion::{
    RankingDetails, ScoreComponents, SuggestionFeedback, SuggestionType, TaskSuggestion, WorkContext,
};
use chrono::{Duration, Local, Timelike};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

// How far back rejections and impressions count against a suggestion
const RECENCY_WINDOW_HOURS: i64 = 24;
const REPETITION_WINDOW_HOURS: i64 = 4;

const NEAR_DUPLICATE: f64 = 0.8;
const SIMILAR: f64 = 0.6;

// The best suggestions survive the diversity cap regardless of type
const ALWAYS_KEEP: usize = 3;

/// What the ranker needs from the store for one pass
struct RankingInputs {
    profile: Option<PersonalizationProfile>,
    rejected: Vec<SuggestionFeedback>,
    shown: Vec<ShownSuggestion>,
}

pub struct SuggestionRanker {
    criteria: RankingCriteria,
    store: Arc<dyn PersonalizationStore>,
    matcher: SkimMatcherV2,
}

impl SuggestionRanker {
    pub fn new(criteria: RankingCriteria, store: Arc<dyn PersonalizationStore>) -> Self {
        let mut criteria = criteria;
        criteria.normalize();
        Self {
            criteria,
            store,
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Default criteria with an in-memory store
    pub fn with_defaults() -> Self {
        Self::new(RankingCriteria::default(), Arc::new(InMemoryPersonalizationStore::new()))
    }

    pub fn criteria(&self) -> &RankingCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: RankingCriteria) {
        self.criteria = criteria;
        self.criteria.normalize();
    }

    pub fn store(&self) -> &Arc<dyn PersonalizationStore> {
        &self.store
    }

    /// Rank with the ranker's own criteria
    pub fn rank_suggestions(&self, suggestions: Vec<TaskSuggestion>, context: &WorkContext) -> Vec<TaskSuggestion> {
        self.rank_with_criteria(suggestions, &self.criteria, context)
    }

    /// Score, sort and diversify `suggestions`
    ///
    /// Each returned suggestion carries its `RankingDetails`; the suggestion's
    /// own fields are left as given, so ranking the same list again scores the
    /// same. `criteria` core weights are normalized first. The returned list is
    /// remembered as shown for the repetition penalty.
    pub fn rank_with_criteria(
        &self,
        suggestions: Vec<TaskSuggestion>,
        criteria: &RankingCriteria,
        context: &WorkContext,
    ) -> Vec<TaskSuggestion> {
        if suggestions.is_empty() {
            return suggestions;
        }

        let total = suggestions.len();
        let criteria = normalized(criteria);
        let criteria = &criteria;
        let inputs = self.load_inputs(context);

        let mut scored: Vec<TaskSuggestion> = suggestions
            .into_iter()
            .map(|mut suggestion| {
                let (score, components) = self.score(&suggestion, criteria, context, &inputs);
                suggestion.ranking = Some(RankingDetails {
                    score,
                    components,
                    position: 0,
                });
                suggestion
            })
            .collect();

        scored.sort_by(|a, b| {
            let a = a.score().unwrap_or(0.0);
            let b = b.score().unwrap_or(0.0);
            b.total_cmp(&a)
        });

        let mut ranked = diversify(scored, criteria.diversity_target);
        for (index, suggestion) in ranked.iter_mut().enumerate() {
            if let Some(ranking) = suggestion.ranking.as_mut() {
                ranking.position = index + 1;
            }
        }

        self.store.record_shown(
            &context.repository,
            ranked.iter().map(|s| ShownSuggestion::of(s, context.now)).collect(),
        );

        info!(
            repository = %context.repository,
            candidates = total,
            ranked = ranked.len(),
            "ranked suggestions"
        );

        ranked
    }

    /// Composite score of one suggestion in [0, 1]
    pub fn calculate_composite_score(
        &self,
        suggestion: &TaskSuggestion,
        criteria: &RankingCriteria,
        context: &WorkContext,
    ) -> f64 {
        let inputs = self.load_inputs(context);
        self.score(suggestion, &normalized(criteria), context, &inputs).0
    }

    fn load_inputs(&self, context: &WorkContext) -> RankingInputs {
        let repository = context.repository.as_str();
        let rejected = self
            .store
            .recent_feedback(repository, context.now - Duration::hours(RECENCY_WINDOW_HOURS))
            .into_iter()
            .filter(|f| !f.accepted)
            .collect();
        let shown = self
            .store
            .recently_shown(repository, context.now - Duration::hours(REPETITION_WINDOW_HOURS));

        RankingInputs {
            profile: self.store.profile(repository),
            rejected,
            shown,
        }
    }

    fn score(
        &self,
        suggestion: &TaskSuggestion,
        criteria: &RankingCriteria,
        context: &WorkContext,
        inputs: &RankingInputs,
    ) -> (f64, ScoreComponents) {
        let historical = self
            .store
            .acceptance_rate(&context.repository, suggestion.suggestion_type)
            .unwrap_or(0.5);

        let components = ScoreComponents {
            relevance: Scorer::relevance(suggestion, context),
            urgency: Scorer::urgency(suggestion, context),
            confidence: Scorer::confidence(suggestion, context, historical),
            personalization: Scorer::personalization(suggestion, context, inputs.profile.as_ref()),
            context_fit: Scorer::context_fit(suggestion, context),
            timing: Scorer::timing(suggestion, context),
            pattern_match: Scorer::pattern_match(suggestion, context),
        };

        let base = components.relevance * criteria.relevance_weight
            + components.urgency * criteria.urgency_weight
            + components.confidence * criteria.confidence_weight
            + components.personalization * criteria.personalization_weight;

        let contextual = components.context_fit * criteria.context_fit_weight
            + components.timing * criteria.timing_weight
            + components.pattern_match * criteria.pattern_match_weight;

        let boosts = self.boosts(suggestion, criteria, context);
        let penalties = self.penalties(suggestion, criteria, context, inputs);

        let score = base + contextual + boosts - penalties;
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };

        debug!(
            suggestion = %suggestion.id,
            score,
            base,
            contextual,
            boosts,
            penalties,
            "scored suggestion"
        );

        (score, components)
    }

    fn boosts(&self, suggestion: &TaskSuggestion, criteria: &RankingCriteria, context: &WorkContext) -> f64 {
        let mut boost = 0.0;

        if context.productivity_score > 0.8 && suggestion.suggestion_type == SuggestionType::NextTask {
            boost += criteria.productivity_boost;
        }

        if context.focus_level > 0.8
            && matches!(suggestion.suggestion_type, SuggestionType::NextTask | SuggestionType::Pattern)
        {
            boost += criteria.focus_boost;
        }

        if context
            .goals
            .iter()
            .any(|goal| Scorer::goal_alignment(suggestion, goal) > 0.6)
        {
            boost += criteria.goal_alignment_boost;
        }

        boost
    }

    fn penalties(
        &self,
        suggestion: &TaskSuggestion,
        criteria: &RankingCriteria,
        context: &WorkContext,
        inputs: &RankingInputs,
    ) -> f64 {
        let mut penalty = 0.0;

        let recently_rejected = inputs.rejected.iter().any(|f| {
            self.similarity(&suggestion.content, &suggestion.keywords, &f.content, &f.keywords) >= SIMILAR
        });
        if recently_rejected {
            penalty += criteria.recency_penalty;
        }

        let repeated = inputs.shown.iter().any(|s| {
            s.id != suggestion.id
                && self.similarity(&suggestion.content, &suggestion.keywords, &s.content, &s.keywords)
                    >= NEAR_DUPLICATE
        });
        if repeated {
            penalty += criteria.repetition_penalty;
        }

        if Scorer::complexity(suggestion) > 0.8 && context.energy_level < 0.4 {
            penalty += criteria.complexity_penalty;
        }

        penalty
    }

    /// Similarity of two suggestions' contents in [0, 1]
    ///
    /// The larger of the keyword overlap and a fuzzy match of the raw text,
    /// so rewordings and typo'd duplicates both count.
    pub fn similarity(&self, a: &str, a_keywords: &[String], b: &str, b_keywords: &[String]) -> f64 {
        let keyword_overlap = {
            let left: HashSet<&str> = a_keywords.iter().map(String::as_str).collect();
            let right: HashSet<&str> = b_keywords.iter().map(String::as_str).collect();
            if left.is_empty() || right.is_empty() {
                0.0
            } else {
                left.intersection(&right).count() as f64 / left.union(&right).count() as f64
            }
        };

        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        let fuzzy = self.fuzzy_ratio(&a, &b).max(self.fuzzy_ratio(&b, &a));

        keyword_overlap.max(fuzzy).clamp(0.0, 1.0)
    }

    // How much of `choice`'s self-match `pattern` achieves
    fn fuzzy_ratio(&self, choice: &str, pattern: &str) -> f64 {
        if choice.is_empty() || pattern.is_empty() {
            return 0.0;
        }
        let Some(best) = self.matcher.fuzzy_match(choice, choice).filter(|s| *s > 0) else {
            return 0.0;
        };
        self.matcher
            .fuzzy_match(choice, pattern)
            .map(|score| (score as f64 / best as f64).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    /// Nudge the core weights toward what the feedback says works
    ///
    /// Returns the adapted criteria; the ranker's own criteria are left alone
    /// so callers decide when to adopt them.
    pub fn adapt_ranking_weights(&self, feedback: &[SuggestionFeedback]) -> RankingCriteria {
        let mut criteria = self.criteria.clone();
        if feedback.is_empty() {
            return criteria;
        }

        let accepted = feedback.iter().filter(|f| f.accepted).count();
        let acceptance_rate = accepted as f64 / feedback.len() as f64;
        let lr = criteria.learning_rate;

        if acceptance_rate < 0.3 {
            criteria.personalization_weight += lr * 0.1;
            criteria.relevance_weight -= lr * 0.05;
        } else if acceptance_rate > 0.8 {
            criteria.confidence_weight += lr * 0.05;
        }

        criteria.normalize();

        info!(
            feedback = feedback.len(),
            acceptance_rate,
            relevance = criteria.relevance_weight,
            personalization = criteria.personalization_weight,
            "adapted ranking weights"
        );

        criteria
    }

    /// Fold feedback into the repository profiles and the feedback history
    pub fn update_personalization_model(&self, feedback: &[SuggestionFeedback]) {
        let lr = self.criteria.learning_rate;

        for item in feedback {
            let target = if item.accepted { 1.0 } else { 0.0 };
            let time_of_day = TimeOfDay::from_hour(item.provided_at.with_timezone(&Local).hour());
            let complexity = Scorer::complexity_of(item.suggestion_type, &item.content);

            self.store.update_profile(&item.repository, &mut |profile| {
                let preference = profile.type_preference(item.suggestion_type);
                profile
                    .preferred_types
                    .insert(item.suggestion_type, (preference + lr * (target - preference)).clamp(0.0, 1.0));

                let timing = profile.timing_preference(time_of_day);
                profile
                    .preferred_timing
                    .insert(time_of_day, (timing + lr * (target - timing)).clamp(0.0, 1.0));

                if item.accepted {
                    profile.preferred_complexity = (profile.preferred_complexity
                        + lr * (complexity - profile.preferred_complexity))
                        .clamp(0.0, 1.0);
                    if item.helpful {
                        push_bounded(&mut profile.successful_patterns, &item.keywords);
                    }
                    profile.avoidance_patterns.retain(|k| !item.keywords.contains(k));
                } else {
                    push_bounded(&mut profile.avoidance_patterns, &item.keywords);
                }

                profile.feedback_count += 1;
            });

            self.store.record_feedback(item.clone());
        }

        if !feedback.is_empty() {
            debug!(feedback = feedback.len(), "updated personalization model");
        }
    }
}

fn normalized(criteria: &RankingCriteria) -> RankingCriteria {
    let mut criteria = criteria.clone();
    criteria.normalize();
    criteria
}

/// Cap each suggestion type at `round(len * target)` entries of an already
/// sorted list. The first few are always kept. A target of zero or less turns
/// the cap off.
pub fn diversify(sorted: Vec<TaskSuggestion>, target: f64) -> Vec<TaskSuggestion> {
    if target <= 0.0 || !target.is_finite() {
        return sorted;
    }

    let cap = (sorted.len() as f64 * target).round().max(0.0) as usize;
    let mut per_type: HashMap<SuggestionType, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(sorted.len());

    for suggestion in sorted {
        let count = per_type.entry(suggestion.suggestion_type).or_default();
        if kept.len() < ALWAYS_KEEP || *count < cap {
            *count += 1;
            kept.push(suggestion);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{SessionGoal, Task};
    use crate::intelligence::suggestion::{SourceType, SuggestionSource};
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn monday_afternoon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap()
    }

    fn context() -> WorkContext {
        WorkContext::at("acme/api", monday_afternoon())
    }

    fn suggestion(kind: SuggestionType, content: &str) -> TaskSuggestion {
        let source = SuggestionSource {
            source_type: SourceType::History,
            name: "history".to_string(),
            confidence: 0.6,
            algorithm: "recent".to_string(),
        };
        let mut s = TaskSuggestion::new(kind, content, "acme/api", source);
        s.generated_at = monday_afternoon();
        s
    }

    fn scored(kind: SuggestionType, score: f64) -> TaskSuggestion {
        let mut s = suggestion(kind, "x");
        s.ranking = Some(RankingDetails {
            score,
            components: ScoreComponents::default(),
            position: 0,
        });
        s
    }

    #[test]
    fn test_empty_input() {
        let ranker = SuggestionRanker::with_defaults();
        assert!(ranker.rank_suggestions(Vec::new(), &context()).is_empty());
    }

    #[test]
    fn test_neutral_composite_score() {
        let ranker = SuggestionRanker::with_defaults();
        let s = suggestion(SuggestionType::NextTask, "Write release notes");

        // relevance .65, urgency .5, confidence .725, personalization .5,
        // context fit .65, timing .78, pattern .5
        let expected = 0.65 * 0.3 + 0.5 * 0.25 + 0.725 * 0.2 + 0.5 * 0.25 + 0.65 * 0.15 + 0.78 * 0.1 + 0.5 * 0.15;
        let score = ranker.calculate_composite_score(&s, ranker.criteria(), &context());
        assert!((score - expected).abs() < 1e-9, "score {}", score);
    }

    #[test]
    fn test_ranked_order_and_positions() {
        let ranker = SuggestionRanker::with_defaults();
        let mut ctx = context();
        ctx.energy_level = 0.1;
        ctx.focus_level = 0.1;

        let ranked = ranker.rank_suggestions(
            vec![
                suggestion(SuggestionType::NextTask, "Start the billing migration"),
                suggestion(SuggestionType::Break, "Step away for ten minutes"),
            ],
            &ctx,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].suggestion_type, SuggestionType::Break);
        let positions: Vec<usize> = ranked.iter().filter_map(|s| s.ranking.as_ref()).map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert!(ranked[0].score() >= ranked[1].score());
    }

    #[test]
    fn test_repetition_penalty_for_reshown_duplicate() {
        let ranker = SuggestionRanker::with_defaults();
        let ctx = context();

        let first = ranker.rank_suggestions(vec![suggestion(SuggestionType::NextTask, "Write release notes")], &ctx);
        let again = ranker.rank_suggestions(vec![suggestion(SuggestionType::NextTask, "Write release notes")], &ctx);

        let delta = first[0].score().unwrap() - again[0].score().unwrap();
        assert!((delta - 0.3).abs() < 1e-9, "delta {}", delta);
    }

    #[test]
    fn test_same_suggestion_is_not_its_own_duplicate() {
        let ranker = SuggestionRanker::with_defaults();
        let ctx = context();
        let s = suggestion(SuggestionType::NextTask, "Write release notes");

        let first = ranker.rank_suggestions(vec![s.clone()], &ctx);
        let second = ranker.rank_suggestions(vec![s], &ctx);
        assert_eq!(first[0].score(), second[0].score());
    }

    #[test]
    fn test_reranking_does_not_compound_adjustments() {
        let ranker = SuggestionRanker::with_defaults();
        let mut ctx = context();
        ctx.energy_level = 0.1;

        let first = ranker.rank_suggestions(vec![suggestion(SuggestionType::Break, "Step away for ten minutes")], &ctx);
        let second = ranker.rank_suggestions(first.clone(), &ctx);

        assert_eq!(second[0].urgency, 0.5);
        let urgency = |s: &TaskSuggestion| s.ranking.as_ref().map(|r| r.components.urgency);
        assert_eq!(urgency(&first[0]), urgency(&second[0]));
        assert_eq!(first[0].score(), second[0].score());
    }

    #[test]
    fn test_caller_criteria_are_normalized() {
        let ranker = SuggestionRanker::with_defaults();
        let s = suggestion(SuggestionType::NextTask, "Write release notes");
        let doubled = RankingCriteria {
            relevance_weight: 0.6,
            urgency_weight: 0.5,
            confidence_weight: 0.4,
            personalization_weight: 0.5,
            ..RankingCriteria::default()
        };

        let expected = ranker.calculate_composite_score(&s, ranker.criteria(), &context());
        let score = ranker.calculate_composite_score(&s, &doubled, &context());
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_recency_penalty_after_rejection() {
        let ranker = SuggestionRanker::with_defaults();
        let ctx = context();
        let s = suggestion(SuggestionType::Learning, "Read the sqlx migration guide");
        let before = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);

        let mut rejected = SuggestionFeedback::for_suggestion(&s, false, ctx.now - Duration::hours(2));
        rejected.suggestion_id = "older".to_string();
        ranker.store().record_feedback(rejected);

        // history 0.0 instead of 0.5 drops confidence by 0.075, weighted 0.2
        let after = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);
        assert!((before - after - (0.2 + 0.075 * 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_goal_alignment_boost() {
        let ranker = SuggestionRanker::with_defaults();
        let s = suggestion(SuggestionType::NextTask, "Ship the payment retry logic");

        let mut ctx = context();
        let plain = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);

        ctx.goals.push(SessionGoal {
            id: "g".to_string(),
            description: "ship payment retry logic".to_string(),
            completed: false,
            due_at: None,
        });
        let with_goal = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);
        assert!(with_goal > plain);
    }

    #[test]
    fn test_complexity_penalty_when_tired() {
        let ranker = SuggestionRanker::with_defaults();
        let long = format!("Work through {}", "the onboarding course chapters ".repeat(5));
        let s = suggestion(SuggestionType::Learning, &long);

        let mut ctx = context();
        ctx.energy_level = 0.6;
        let rested = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);
        ctx.energy_level = 0.3;
        let tired = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);

        // Learning context fit ignores energy, so only the penalty differs
        assert!((rested - tired - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_diversity_caps_types_but_keeps_top_three() {
        let mut sorted: Vec<TaskSuggestion> = (0..9)
            .map(|i| scored(SuggestionType::NextTask, 0.9 - i as f64 * 0.01))
            .collect();
        sorted.push(scored(SuggestionType::Break, 0.5));

        // 10 * 0.3 = 3 per type
        let kept = diversify(sorted, 0.3);
        let next = kept.iter().filter(|s| s.suggestion_type == SuggestionType::NextTask).count();
        assert_eq!(next, 3);
        assert_eq!(kept.len(), 4);
        assert_eq!(kept.last().map(|s| s.suggestion_type), Some(SuggestionType::Break));

    }

    #[test]
    fn test_zero_diversity_target_keeps_everything() {
        let sorted: Vec<TaskSuggestion> = (0..10).map(|_| scored(SuggestionType::Pattern, 0.5)).collect();
        assert_eq!(diversify(sorted.clone(), 0.0).len(), 10);
        assert_eq!(diversify(sorted, -1.0).len(), 10);
    }

    #[test]
    fn test_small_diversity_target_still_keeps_top_three() {
        // round(5 * 0.05) = 0 per type
        let sorted: Vec<TaskSuggestion> = (0..5).map(|_| scored(SuggestionType::Pattern, 0.5)).collect();
        assert_eq!(diversify(sorted, 0.05).len(), 3);
    }

    #[test]
    fn test_adapt_weights_on_rejections() {
        let ranker = SuggestionRanker::with_defaults();
        let s = suggestion(SuggestionType::NextTask, "anything");
        let feedback: Vec<_> = (0..5)
            .map(|_| SuggestionFeedback::for_suggestion(&s, false, monday_afternoon()))
            .collect();

        let adapted = ranker.adapt_ranking_weights(&feedback);
        assert!(adapted.personalization_weight > ranker.criteria().personalization_weight);
        assert!(adapted.relevance_weight < ranker.criteria().relevance_weight);
        assert!((adapted.core_weight_sum() - 1.0).abs() < 1e-9);

        assert_eq!(ranker.adapt_ranking_weights(&[]), *ranker.criteria());
    }

    #[test]
    fn test_adapt_weights_on_acceptance() {
        let ranker = SuggestionRanker::with_defaults();
        let s = suggestion(SuggestionType::NextTask, "anything");
        let feedback: Vec<_> = (0..5)
            .map(|_| SuggestionFeedback::for_suggestion(&s, true, monday_afternoon()))
            .collect();

        let adapted = ranker.adapt_ranking_weights(&feedback);
        assert!(adapted.confidence_weight > ranker.criteria().confidence_weight);
        assert!((adapted.core_weight_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_personalization_model() {
        let ranker = SuggestionRanker::with_defaults();
        let accepted = suggestion(SuggestionType::Break, "Take a short walk outside");
        let rejected = suggestion(SuggestionType::Learning, "Watch the conference keynote");

        ranker.update_personalization_model(&[
            SuggestionFeedback::for_suggestion(&accepted, true, monday_afternoon()),
            SuggestionFeedback::for_suggestion(&rejected, false, monday_afternoon()),
        ]);

        let profile = ranker.store().profile("acme/api").unwrap();
        assert!((profile.type_preference(SuggestionType::Break) - 0.55).abs() < 1e-9);
        assert!((profile.type_preference(SuggestionType::Learning) - 0.45).abs() < 1e-9);
        assert!(profile.successful_patterns.contains(&"walk".to_string()));
        assert!(profile.avoidance_patterns.contains(&"keynote".to_string()));
        assert_eq!(profile.feedback_count, 2);
        assert_eq!(ranker.store().acceptance_rate("acme/api", SuggestionType::Break), Some(1.0));
    }

    #[test]
    fn test_similarity() {
        let ranker = SuggestionRanker::with_defaults();
        let kw = |s: &str| crate::intelligence::keywords::extract(s);

        let a = "Write release notes";
        assert_eq!(ranker.similarity(a, &kw(a), a, &kw(a)), 1.0);

        let b = "Benchmark the sqlite pool";
        assert!(ranker.similarity(a, &kw(a), b, &kw(b)) < SIMILAR);
    }

    #[test]
    fn test_workload_from_current_tasks() {
        let ranker = SuggestionRanker::with_defaults();
        let mut s = suggestion(SuggestionType::Break, "Stretch");
        s.keywords.clear();
        let mut ctx = context();
        let idle = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);
        ctx.current_tasks = (0..10).map(|i| Task::new("acme/api", format!("task {}", i))).collect();
        let busy = ranker.calculate_composite_score(&s, ranker.criteria(), &ctx);
        assert!(busy > idle);
    }

    fn arb_type() -> impl Strategy<Value = SuggestionType> {
        prop_oneof![
            Just(SuggestionType::NextTask),
            Just(SuggestionType::Break),
            Just(SuggestionType::Optimization),
            Just(SuggestionType::Learning),
            Just(SuggestionType::Pattern),
            Just(SuggestionType::Workflow),
        ]
    }

    proptest! {
        #[test]
        fn composite_score_is_bounded(
            kind in arb_type(),
            energy in -1.0f64..2.0,
            focus in -1.0f64..2.0,
            productivity in -1.0f64..2.0,
            urgency in -5.0f64..5.0,
            source_confidence in -5.0f64..5.0,
            boost in 0.0f64..10.0,
            penalty in 0.0f64..10.0,
        ) {
            let ranker = SuggestionRanker::with_defaults();
            let mut ctx = context();
            ctx.energy_level = energy;
            ctx.focus_level = focus;
            ctx.productivity_score = productivity;

            let mut s = suggestion(kind, "Refactor the session importer");
            s.urgency = urgency;
            s.source.confidence = source_confidence;

            let criteria = RankingCriteria {
                productivity_boost: boost,
                focus_boost: boost,
                goal_alignment_boost: boost,
                complexity_penalty: penalty,
                ..RankingCriteria::default()
            };

            let score = ranker.calculate_composite_score(&s, &criteria, &ctx);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
