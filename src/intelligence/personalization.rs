/// Per-repository personalization state
///
/// Profiles, feedback history and the suggestions shown recently. The ranker
/// only talks to the `PersonalizationStore` trait so a persistent store can be
/// dropped in later.

use crate::intelligence::context_detector::TimeOfDay;
use crate::intelligence::suggestion::{SuggestionFeedback, SuggestionType, TaskSuggestion};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

const MAX_FEEDBACK: usize = 200;
const MAX_SHOWN: usize = 100;
pub const MAX_PATTERN_KEYWORDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationProfile {
    pub repository: String,
    /// 0-1 preference per suggestion type, 0.5 when unknown
    pub preferred_types: HashMap<SuggestionType, f64>,
    pub preferred_timing: HashMap<TimeOfDay, f64>,
    pub preferred_complexity: f64,
    /// Keywords of suggestions the user keeps rejecting
    pub avoidance_patterns: Vec<String>,
    pub successful_patterns: Vec<String>,
    pub feedback_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl PersonalizationProfile {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            preferred_types: HashMap::new(),
            preferred_timing: HashMap::new(),
            preferred_complexity: 0.5,
            avoidance_patterns: Vec::new(),
            successful_patterns: Vec::new(),
            feedback_count: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn type_preference(&self, suggestion_type: SuggestionType) -> f64 {
        self.preferred_types.get(&suggestion_type).copied().unwrap_or(0.5)
    }

    pub fn timing_preference(&self, time_of_day: TimeOfDay) -> f64 {
        self.preferred_timing.get(&time_of_day).copied().unwrap_or(0.5)
    }
}

/// A suggestion as it was shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShownSuggestion {
    pub id: String,
    pub suggestion_type: SuggestionType,
    pub content: String,
    pub keywords: Vec<String>,
    pub shown_at: DateTime<Utc>,
}

impl ShownSuggestion {
    pub fn of(suggestion: &TaskSuggestion, shown_at: DateTime<Utc>) -> Self {
        Self {
            id: suggestion.id.clone(),
            suggestion_type: suggestion.suggestion_type,
            content: suggestion.content.clone(),
            keywords: suggestion.keywords.clone(),
            shown_at,
        }
    }
}

/// Where the ranker keeps what it has learned about each repository
pub trait PersonalizationStore: Send + Sync {
    fn profile(&self, repository: &str) -> Option<PersonalizationProfile>;

    /// Apply `update` to the repository's profile, creating it if needed
    fn update_profile(&self, repository: &str, update: &mut dyn FnMut(&mut PersonalizationProfile));

    fn record_feedback(&self, feedback: SuggestionFeedback);

    /// Feedback provided at or after `since`, oldest first
    fn recent_feedback(&self, repository: &str, since: DateTime<Utc>) -> Vec<SuggestionFeedback>;

    /// Share of accepted feedback for a suggestion type, None without any
    fn acceptance_rate(&self, repository: &str, suggestion_type: SuggestionType) -> Option<f64>;

    fn record_shown(&self, repository: &str, shown: Vec<ShownSuggestion>);

    fn recently_shown(&self, repository: &str, since: DateTime<Utc>) -> Vec<ShownSuggestion>;
}

#[derive(Debug, Default)]
struct RepositoryState {
    profile: Option<PersonalizationProfile>,
    feedback: VecDeque<SuggestionFeedback>,
    shown: VecDeque<ShownSuggestion>,
}

/// In-memory store; one lock per repository so rankers for different
/// repositories never wait on each other
#[derive(Default)]
pub struct InMemoryPersonalizationStore {
    repositories: RwLock<HashMap<String, Arc<Mutex<RepositoryState>>>>,
}

impl InMemoryPersonalizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, repository: &str) -> Arc<Mutex<RepositoryState>> {
        if let Some(state) = self.repositories.read().get(repository) {
            return Arc::clone(state);
        }
        Arc::clone(
            self.repositories
                .write()
                .entry(repository.to_string())
                .or_default(),
        )
    }

    fn existing(&self, repository: &str) -> Option<Arc<Mutex<RepositoryState>>> {
        self.repositories.read().get(repository).map(Arc::clone)
    }
}

impl PersonalizationStore for InMemoryPersonalizationStore {
    fn profile(&self, repository: &str) -> Option<PersonalizationProfile> {
        self.existing(repository)?.lock().profile.clone()
    }

    fn update_profile(&self, repository: &str, update: &mut dyn FnMut(&mut PersonalizationProfile)) {
        let state = self.state(repository);
        let mut state = state.lock();
        let profile = state
            .profile
            .get_or_insert_with(|| PersonalizationProfile::new(repository));
        update(profile);
        profile.last_updated = Utc::now();
    }

    fn record_feedback(&self, feedback: SuggestionFeedback) {
        let state = self.state(&feedback.repository);
        let mut state = state.lock();
        state.feedback.push_back(feedback);
        while state.feedback.len() > MAX_FEEDBACK {
            state.feedback.pop_front();
        }
    }

    fn recent_feedback(&self, repository: &str, since: DateTime<Utc>) -> Vec<SuggestionFeedback> {
        let Some(state) = self.existing(repository) else {
            return Vec::new();
        };
        let state = state.lock();
        state
            .feedback
            .iter()
            .filter(|f| f.provided_at >= since)
            .cloned()
            .collect()
    }

    fn acceptance_rate(&self, repository: &str, suggestion_type: SuggestionType) -> Option<f64> {
        let state = self.existing(repository)?;
        let state = state.lock();
        let (accepted, total) = state
            .feedback
            .iter()
            .filter(|f| f.suggestion_type == suggestion_type)
            .fold((0usize, 0usize), |(a, n), f| (a + usize::from(f.accepted), n + 1));

        (total > 0).then(|| accepted as f64 / total as f64)
    }

    fn record_shown(&self, repository: &str, shown: Vec<ShownSuggestion>) {
        if shown.is_empty() {
            return;
        }
        let state = self.state(repository);
        let mut state = state.lock();
        state.shown.extend(shown);
        while state.shown.len() > MAX_SHOWN {
            state.shown.pop_front();
        }
    }

    fn recently_shown(&self, repository: &str, since: DateTime<Utc>) -> Vec<ShownSuggestion> {
        let Some(state) = self.existing(repository) else {
            return Vec::new();
        };
        let state = state.lock();
        state
            .shown
            .iter()
            .filter(|s| s.shown_at >= since)
            .cloned()
            .collect()
    }
}

/// Push `incoming` keywords onto a bounded list, dropping the oldest
pub fn push_bounded(list: &mut Vec<String>, incoming: &[String]) {
    for keyword in incoming {
        if let Some(pos) = list.iter().position(|k| k == keyword) {
            list.remove(pos);
        }
        list.push(keyword.clone());
    }
    if list.len() > MAX_PATTERN_KEYWORDS {
        let excess = list.len() - MAX_PATTERN_KEYWORDS;
        list.drain(..excess);
    }
}
