/// Main analyzer orchestrator
///
/// Coordinates pattern refresh, bottleneck detection and suggestion ranking for
/// one repository.

use crate::config::Config;
use crate::db::models::{Session, Task, TaskStatus};
use crate::db::repository::{SessionRepository, TaskRepository};
use crate::db::Database;
use crate::error::{RepositoryContext, Result};
use crate::intelligence::bottleneck::{Bottleneck, BottleneckDetector, Severity};
use crate::intelligence::context_detector::ContextDetector;
use crate::intelligence::pattern::{PatternType, TaskPattern};
use crate::intelligence::pattern_detector::{PatternDetector, RefreshReport, TimeRange};
use crate::intelligence::ranker::SuggestionRanker;
use crate::intelligence::suggestion::{SourceType, SuggestionSource, SuggestionType, TaskSuggestion};
use crate::intelligence::personalization::PersonalizationStore;
use chrono::{Local, Utc};
use std::sync::Arc;
use tracing::info;

// Completed tasks handed to the ranker as recent context
const RECENT_TASKS: usize = 10;

/// Main analyzer
pub struct Analyzer {
    detector: PatternDetector,
    ranker: SuggestionRanker,
    bottlenecks: BottleneckDetector,
    tasks: Arc<dyn TaskRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl Analyzer {
    /// Create an analyzer backed by one database
    pub fn new(db: Arc<Database>, config: &Config, store: Arc<dyn PersonalizationStore>) -> Self {
        Self {
            detector: PatternDetector::with_database(Arc::clone(&db), config.detector.clone()),
            ranker: SuggestionRanker::new(config.ranking.clone(), store),
            bottlenecks: BottleneckDetector::new(config.bottlenecks.clone()),
            tasks: db.clone(),
            sessions: db,
        }
    }

    pub fn detector(&self) -> &PatternDetector {
        &self.detector
    }

    pub fn ranker(&self) -> &SuggestionRanker {
        &self.ranker
    }

    /// Run full analysis
    ///
    /// Refreshes the stored patterns, looks for bottlenecks in the same window
    /// and ranks suggestions built from both.
    pub async fn analyze(&self, repository: &str) -> Result<AnalysisReport> {
        info!(repository = %repository, "starting analysis");

        let refresh = self.detector.refresh_patterns(repository).await?;
        let active = self.detector.get_active_patterns(repository).await?;

        let range = TimeRange::last(self.detector.config().refresh_window());
        let tasks = self
            .tasks
            .find_tasks_by_time_range(repository, range.start, range.end)
            .await
            .context("failed to get tasks for analysis")?;
        let sessions = self
            .sessions
            .find_sessions_by_time_range(repository, range.start, range.end)
            .await
            .context("failed to get sessions for analysis")?;

        let bottlenecks = self.bottlenecks.detect(&tasks, &sessions, Utc::now());

        let (open, recent) = split_tasks(tasks);

        // Patterns the work in flight resembles come first; without open work
        // every active pattern is a candidate
        let mut candidates = self.detector.get_pattern_suggestions(&open).await?;
        if candidates.is_empty() {
            candidates = active.clone();
        }

        let mut suggestions: Vec<TaskSuggestion> = candidates
            .iter()
            .filter(|p| p.pattern_type != PatternType::Temporal)
            .map(TaskSuggestion::from_pattern)
            .collect();
        suggestions.extend(
            bottlenecks
                .iter()
                .filter(|b| b.severity >= Severity::High)
                .map(|b| bottleneck_suggestion(repository, b)),
        );

        let current_session = latest_open_session(sessions);
        let context = ContextDetector::detect(repository, Local::now(), open, recent, current_session, active.clone());
        let suggestions = self.ranker.rank_suggestions(suggestions, &context);

        info!(
            repository = %repository,
            patterns_found = active.len(),
            bottlenecks = bottlenecks.len(),
            suggestions = suggestions.len(),
            "analysis completed"
        );

        Ok(AnalysisReport {
            repository: repository.to_string(),
            patterns_found: active.len(),
            suggestions_generated: suggestions.len(),
            refresh,
            patterns: active,
            bottlenecks,
            suggestions,
        })
    }
}

/// Open tasks, and the most recently completed ones
fn split_tasks(tasks: Vec<Task>) -> (Vec<Task>, Vec<Task>) {
    let (mut done, open): (Vec<Task>, Vec<Task>) = tasks
        .into_iter()
        .filter(|t| t.status != TaskStatus::Cancelled)
        .partition(|t| t.is_completed());

    done.sort_by_key(|t| std::cmp::Reverse(t.completion_time()));
    done.truncate(RECENT_TASKS);
    (open, done)
}

fn latest_open_session(sessions: Vec<Session>) -> Option<Session> {
    sessions
        .into_iter()
        .filter(|s| s.end_time.is_none())
        .max_by_key(|s| s.start_time)
}

fn bottleneck_suggestion(repository: &str, bottleneck: &Bottleneck) -> TaskSuggestion {
    let source = SuggestionSource {
        source_type: SourceType::Analytics,
        name: "bottleneck_detector".to_string(),
        confidence: 0.7,
        algorithm: format!("{:?}", bottleneck.kind).to_lowercase(),
    };

    let content = bottleneck
        .suggestions
        .first()
        .cloned()
        .unwrap_or_else(|| bottleneck.description.clone());

    let mut suggestion = TaskSuggestion::new(SuggestionType::Optimization, content, repository, source);
    suggestion.description = bottleneck.description.clone();
    suggestion.reasoning = format!("About {:.1} hours lost", bottleneck.impact);
    suggestion.related_task_ids = bottleneck.affected_tasks.clone();
    suggestion.urgency = match bottleneck.severity {
        Severity::Critical => 0.8,
        Severity::High => 0.6,
        _ => 0.4,
    };
    suggestion
}

/// Analysis report
#[derive(Debug)]
pub struct AnalysisReport {
    pub repository: String,
    pub patterns_found: usize,
    pub suggestions_generated: usize,
    pub refresh: RefreshReport,
    pub patterns: Vec<TaskPattern>,
    pub bottlenecks: Vec<Bottleneck>,
    pub suggestions: Vec<TaskSuggestion>,
}
