/// Data models for database entities
///
/// Tasks and sessions are owned by the storage layer; the intelligence module
/// only reads them. Rows come out of SQLite as plain text/number columns and are
/// converted into the typed domain structs here.

use crate::error::{Result, TaskMindError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskMindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(TaskMindError::InvalidData(format!("unknown task status '{}'", other))),
        }
    }
}

/// Task importance level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskMindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" | "urgent" => Ok(Priority::Critical),
            other => Err(TaskMindError::InvalidData(format!("unknown priority '{}'", other))),
        }
    }
}

/// What kind of work a task is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Feature,
    Bugfix,
    Refactor,
    Testing,
    Documentation,
    Planning,
    Implementation,
    Review,
    Deployment,
    General,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Feature => "feature",
            TaskType::Bugfix => "bugfix",
            TaskType::Refactor => "refactor",
            TaskType::Testing => "testing",
            TaskType::Documentation => "documentation",
            TaskType::Planning => "planning",
            TaskType::Implementation => "implementation",
            TaskType::Review => "review",
            TaskType::Deployment => "deployment",
            TaskType::General => "general",
        }
    }

    /// Guess the type from free text. Order matters: "fix the test" is a bugfix.
    pub fn infer(content: &str) -> TaskType {
        let content = content.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| content.contains(n));

        if has(&["plan", "design", "spec"]) {
            TaskType::Planning
        } else if has(&["bug", "fix", "crash", "broken"]) {
            TaskType::Bugfix
        } else if has(&["test"]) {
            TaskType::Testing
        } else if has(&["refactor", "cleanup", "clean up", "improve"]) {
            TaskType::Refactor
        } else if has(&["review"]) {
            TaskType::Review
        } else if has(&["deploy", "release", "ship"]) {
            TaskType::Deployment
        } else if has(&["doc", "readme"]) {
            TaskType::Documentation
        } else if has(&["implement", "code", "build"]) {
            TaskType::Implementation
        } else if has(&["feature", "add", "support"]) {
            TaskType::Feature
        } else {
            TaskType::General
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = TaskMindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "feature" | "feat" => Ok(TaskType::Feature),
            "bugfix" | "bug" | "fix" => Ok(TaskType::Bugfix),
            "refactor" => Ok(TaskType::Refactor),
            "testing" | "test" => Ok(TaskType::Testing),
            "documentation" | "docs" | "doc" => Ok(TaskType::Documentation),
            "planning" | "plan" => Ok(TaskType::Planning),
            "implementation" => Ok(TaskType::Implementation),
            "review" => Ok(TaskType::Review),
            "deployment" | "deploy" | "release" => Ok(TaskType::Deployment),
            "general" => Ok(TaskType::General),
            other => Err(TaskMindError::InvalidData(format!("unknown task type '{}'", other))),
        }
    }
}

/// A unit of work tracked for a repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub repository: String,
    pub content: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    /// Ids of tasks this one is waiting on
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub estimated_mins: Option<u32>,
    #[serde(default)]
    pub actual_mins: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending medium-priority task
    pub fn new(repository: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            repository: repository.into(),
            content: content.into().trim().to_string(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            task_type: None,
            tags: Vec::new(),
            parent_task_id: None,
            dependencies: Vec::new(),
            estimated_mins: None,
            actual_mins: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Explicit type, else the first tag that names a type, else a content guess
    pub fn inferred_type(&self) -> TaskType {
        if let Some(task_type) = self.task_type {
            return task_type;
        }

        self.tags
            .iter()
            .find_map(|tag| tag.parse::<TaskType>().ok())
            .unwrap_or_else(|| TaskType::infer(&self.content))
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// When the task was finished, falling back to the last update
    pub fn completion_time(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.updated_at)
    }

    /// How long the task took in minutes, if we can tell
    pub fn duration_minutes(&self) -> Option<f64> {
        if let Some(actual) = self.actual_mins {
            return Some(actual as f64);
        }

        self.completed_at
            .map(|done| (done - self.created_at).num_seconds() as f64 / 60.0)
            .filter(|mins| *mins > 0.0)
    }

    /// Finished without blowing through its estimate by more than `tolerance`
    pub fn met_estimate(&self, tolerance: f64) -> bool {
        match (self.estimated_mins, self.actual_mins) {
            (Some(estimated), Some(actual)) if estimated > 0 => {
                actual as f64 <= estimated as f64 * tolerance
            }
            _ => true,
        }
    }
}

/// A goal the user set for a work session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionGoal {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// A contiguous block of work with productivity measurements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub repository: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in minutes
    #[serde(default)]
    pub duration_mins: f64,
    #[serde(default)]
    pub tasks_started: u32,
    #[serde(default)]
    pub tasks_completed: u32,
    #[serde(default)]
    pub focus_score: f64,
    pub productivity_score: f64,
    #[serde(default)]
    pub goals: Vec<SessionGoal>,
}

impl Session {
    pub fn new(repository: impl Into<String>, start_time: DateTime<Utc>, productivity_score: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            repository: repository.into(),
            start_time,
            end_time: None,
            duration_mins: 0.0,
            tasks_started: 0,
            tasks_completed: 0,
            focus_score: 0.0,
            productivity_score,
            goals: Vec::new(),
        }
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_mins / 60.0
    }
}

/// Timestamps are stored as RFC 3339 UTC text so range queries compare lexically
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| TaskMindError::InvalidData(format!("bad timestamp '{}': {}", raw, e)))
}

fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

/// Raw task row
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: String,
    pub repository: String,
    pub content: String,
    pub status: String,
    pub priority: String,
    pub task_type: Option<String>,
    pub tags: String,                 // JSON array
    pub parent_task_id: Option<String>,
    pub dependencies: String,         // JSON array
    pub estimated_mins: Option<i64>,
    pub actual_mins: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = TaskMindError;

    fn try_from(row: TaskRow) -> Result<Self> {
        Ok(Task {
            id: row.id,
            repository: row.repository,
            content: row.content,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            task_type: row.task_type.as_deref().map(str::parse).transpose()?,
            tags: serde_json::from_str(&row.tags)?,
            parent_task_id: row.parent_task_id,
            dependencies: serde_json::from_str(&row.dependencies)?,
            estimated_mins: row.estimated_mins.map(|m| m.max(0) as u32),
            actual_mins: row.actual_mins.map(|m| m.max(0) as u32),
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            completed_at: parse_optional_timestamp(row.completed_at)?,
        })
    }
}

/// Raw session row
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub repository: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub duration_mins: f64,
    pub tasks_started: i64,
    pub tasks_completed: i64,
    pub focus_score: f64,
    pub productivity_score: f64,
    pub goals: String, // JSON array
}

impl TryFrom<SessionRow> for Session {
    type Error = TaskMindError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Session {
            id: row.id,
            repository: row.repository,
            start_time: parse_timestamp(&row.start_time)?,
            end_time: parse_optional_timestamp(row.end_time)?,
            duration_mins: row.duration_mins,
            tasks_started: row.tasks_started.max(0) as u32,
            tasks_completed: row.tasks_completed.max(0) as u32,
            focus_score: row.focus_score,
            productivity_score: row.productivity_score,
            goals: serde_json::from_str(&row.goals)?,
        })
    }
}

/// Raw pattern row. Steps and metadata live in JSON columns.
#[derive(Debug, Clone, FromRow)]
pub struct PatternRow {
    pub id: String,
    pub pattern_key: String,
    pub pattern_type: String,
    pub name: String,
    pub description: String,
    pub sequence: String, // JSON array of steps
    pub frequency: f64,
    pub confidence: f64,
    pub success_rate: f64,
    pub occurrences: i64,
    pub repository: String,
    pub project_type: Option<String>,
    pub metadata: String, // JSON object
    pub first_seen: String,
    pub last_seen: String,
    pub created_at: String,
    pub updated_at: String,
}
