/// Intelligence module
///
/// Mines task and session history for patterns and ranks suggestions built
/// from them.

pub mod analyzer;
pub mod bottleneck;
pub mod context_detector;
pub mod criteria;
pub mod keywords;
pub mod matcher;
pub mod pattern;
pub mod pattern_detector;
pub mod personalization;
pub mod ranker;
pub mod scorer;
pub mod sequence_miner;
pub mod suggestion;
pub mod temporal;
pub mod workflow;

pub use analyzer::{AnalysisReport, Analyzer};
pub use bottleneck::{Bottleneck, BottleneckDetector, BottleneckKind, Severity};
pub use context_detector::{ContextDetector, DayOfWeek, TimeOfDay, WorkingHours};
pub use criteria::RankingCriteria;
pub use matcher::PatternMatcher;
pub use pattern::{DurationStats, PatternOutcome, PatternStep, PatternType, TaskPattern};
pub use pattern_detector::{PatternDetector, RefreshReport, TimeRange};
pub use personalization::{
    InMemoryPersonalizationStore, PersonalizationProfile, PersonalizationStore, ShownSuggestion,
};
pub use ranker::SuggestionRanker;
pub use scorer::Scorer;
pub use suggestion::{
    RankingDetails, ScoreComponents, SourceType, StressIndicator, SuggestionFeedback, SuggestionSource,
    SuggestionType, TaskSuggestion, WorkContext,
};
