/// Suggestions, the context they are ranked against and the feedback they earn

use crate::db::models::{Priority, Session, SessionGoal, Task, TaskType};
use crate::intelligence::context_detector::{ContextDetector, DayOfWeek, TimeOfDay, WorkingHours};
use crate::intelligence::keywords;
use crate::intelligence::pattern::TaskPattern;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// Patterns treated as the primary ones for a context
const PRIMARY_PATTERNS: usize = 3;
const HIGH_STRESS_SEVERITY: f64 = 0.7;
const HIGH_STRESS_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    NextTask,
    Related,
    Optimization,
    Template,
    Learning,
    Pattern,
    Workflow,
    Break,
    Priority,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::NextTask => "next_task",
            SuggestionType::Related => "related",
            SuggestionType::Optimization => "optimization",
            SuggestionType::Template => "template",
            SuggestionType::Learning => "learning",
            SuggestionType::Pattern => "pattern",
            SuggestionType::Workflow => "workflow",
            SuggestionType::Break => "break",
            SuggestionType::Priority => "priority",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SuggestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "next_task" => Ok(SuggestionType::NextTask),
            "related" => Ok(SuggestionType::Related),
            "optimization" => Ok(SuggestionType::Optimization),
            "template" => Ok(SuggestionType::Template),
            "learning" => Ok(SuggestionType::Learning),
            "pattern" => Ok(SuggestionType::Pattern),
            "workflow" => Ok(SuggestionType::Workflow),
            "break" => Ok(SuggestionType::Break),
            "priority" => Ok(SuggestionType::Priority),
            other => Err(format!("unknown suggestion type: {}", other)),
        }
    }
}

/// Where a suggestion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Pattern,
    Ai,
    Template,
    History,
    Analytics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSource {
    pub source_type: SourceType,
    pub name: String,
    pub confidence: f64,
    pub algorithm: String,
}

/// Per-signal scores behind a ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub relevance: f64,
    pub urgency: f64,
    pub confidence: f64,
    pub personalization: f64,
    pub context_fit: f64,
    pub timing: f64,
    pub pattern_match: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingDetails {
    pub score: f64,
    pub components: ScoreComponents,
    /// 1-based position in the ranked list
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSuggestion {
    pub id: String,
    pub suggestion_type: SuggestionType,
    pub content: String,
    pub description: String,
    pub reasoning: String,
    pub priority: Priority,
    pub task_type: Option<TaskType>,
    pub estimated_mins: Option<u32>,
    pub confidence: f64,
    pub relevance: f64,
    pub urgency: f64,
    pub source: SuggestionSource,
    pub pattern_id: Option<String>,
    #[serde(default)]
    pub related_task_ids: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub repository: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub ranking: Option<RankingDetails>,
}

impl TaskSuggestion {
    pub fn new(
        suggestion_type: SuggestionType,
        content: impl Into<String>,
        repository: impl Into<String>,
        source: SuggestionSource,
    ) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            suggestion_type,
            keywords: keywords::extract(&content),
            content,
            description: String::new(),
            reasoning: String::new(),
            priority: Priority::Medium,
            task_type: None,
            estimated_mins: None,
            confidence: source.confidence.clamp(0.0, 1.0),
            relevance: 0.5,
            urgency: 0.5,
            source,
            pattern_id: None,
            related_task_ids: Vec::new(),
            tags: Vec::new(),
            repository: repository.into(),
            generated_at: Utc::now(),
            expires_at: None,
            ranking: None,
        }
    }

    /// Suggest following a detected pattern
    pub fn from_pattern(pattern: &TaskPattern) -> Self {
        let source = SuggestionSource {
            source_type: SourceType::Pattern,
            name: pattern.name.clone(),
            confidence: pattern.confidence,
            algorithm: format!("{}_mining", pattern.pattern_type),
        };
        let suggestion_type = match pattern.pattern_type {
            crate::intelligence::pattern::PatternType::Workflow => SuggestionType::Workflow,
            _ => SuggestionType::Pattern,
        };

        let mut suggestion = Self::new(
            suggestion_type,
            format!("Follow pattern: {}", pattern.name),
            pattern.repository.clone(),
            source,
        );
        suggestion.description = pattern.description.clone();
        suggestion.reasoning = format!(
            "Seen {} times with {:.0}% success",
            pattern.occurrences,
            pattern.success_rate * 100.0
        );
        suggestion.pattern_id = Some(pattern.id.clone());
        suggestion.task_type = pattern.sequence.first().map(|s| s.task_type);
        if let Some(first) = pattern.sequence.first() {
            suggestion.priority = first.priority;
        }
        let estimate = pattern.estimated_duration();
        if estimate > 0.0 {
            suggestion.estimated_mins = Some(estimate.round() as u32);
        }
        keywords::merge(&mut suggestion.keywords, &pattern.keywords());
        suggestion
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn score(&self) -> Option<f64> {
        self.ranking.as_ref().map(|r| r.score)
    }
}

/// What the user thought of a suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionFeedback {
    pub suggestion_id: String,
    pub repository: String,
    pub suggestion_type: SuggestionType,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub accepted: bool,
    pub helpful: bool,
    pub relevant: bool,
    /// 1-5 when given
    pub rating: Option<u8>,
    pub reason: Option<String>,
    pub provided_at: DateTime<Utc>,
}

impl SuggestionFeedback {
    pub fn for_suggestion(suggestion: &TaskSuggestion, accepted: bool, provided_at: DateTime<Utc>) -> Self {
        Self {
            suggestion_id: suggestion.id.clone(),
            repository: suggestion.repository.clone(),
            suggestion_type: suggestion.suggestion_type,
            content: suggestion.content.clone(),
            keywords: suggestion.keywords.clone(),
            accepted,
            helpful: accepted,
            relevant: accepted,
            rating: None,
            reason: None,
            provided_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressIndicator {
    pub kind: String,
    pub severity: f64,
    pub description: String,
    pub detected_at: DateTime<Utc>,
}

/// Everything the ranker knows about the moment it is ranking for
#[derive(Debug, Clone)]
pub struct WorkContext {
    pub repository: String,
    pub current_tasks: Vec<Task>,
    pub recent_tasks: Vec<Task>,
    pub current_session: Option<Session>,
    pub time_of_day: TimeOfDay,
    pub day_of_week: DayOfWeek,
    /// Wall-clock time in the user's timezone
    pub local_time: NaiveTime,
    pub working_hours: Option<WorkingHours>,
    pub active_patterns: Vec<TaskPattern>,
    pub focus_level: f64,
    pub energy_level: f64,
    pub productivity_score: f64,
    pub stress_indicators: Vec<StressIndicator>,
    pub goals: Vec<SessionGoal>,
    pub now: DateTime<Utc>,
}

impl WorkContext {
    /// An empty context with neutral levels
    pub fn at<Tz: TimeZone>(repository: impl Into<String>, now: DateTime<Tz>) -> Self {
        Self {
            repository: repository.into(),
            current_tasks: Vec::new(),
            recent_tasks: Vec::new(),
            current_session: None,
            time_of_day: ContextDetector::time_of_day(&now),
            day_of_week: ContextDetector::day_of_week(&now),
            local_time: now.naive_local().time(),
            working_hours: None,
            active_patterns: Vec::new(),
            focus_level: 0.5,
            energy_level: 0.5,
            productivity_score: 0.5,
            stress_indicators: Vec::new(),
            goals: Vec::new(),
            now: now.with_timezone(&Utc),
        }
    }

    pub fn active_task_types(&self) -> HashSet<TaskType> {
        self.current_tasks.iter().map(|t| t.inferred_type()).collect()
    }

    /// The most confident active patterns
    pub fn primary_patterns(&self) -> Vec<&TaskPattern> {
        let mut patterns: Vec<&TaskPattern> = self.active_patterns.iter().collect();
        patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        patterns.truncate(PRIMARY_PATTERNS);
        patterns
    }

    pub fn find_active_pattern(&self, id: &str) -> Option<&TaskPattern> {
        self.active_patterns.iter().find(|p| p.id == id)
    }

    pub fn is_high_stress(&self) -> bool {
        self.stress_indicators
            .iter()
            .filter(|s| s.severity > HIGH_STRESS_SEVERITY)
            .count()
            >= HIGH_STRESS_COUNT
    }

    /// Keywords across current and recent tasks
    pub fn task_keywords(&self) -> Vec<String> {
        let mut merged = Vec::new();
        for task in self.current_tasks.iter().chain(&self.recent_tasks) {
            keywords::merge(&mut merged, &keywords::extract(&task.content));
        }
        merged
    }

    pub fn session_length(&self) -> Option<Duration> {
        self.current_session
            .as_ref()
            .map(|s| Duration::milliseconds((s.duration_mins * 60_000.0) as i64))
    }
}
