/// Storage seams the intelligence layer depends on
///
/// `Database` implements all three; tests and embedders can swap in their own.

use crate::db::models::{Session, Task};
use crate::error::Result;
use crate::intelligence::pattern::TaskPattern;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Tasks of `repository` created within `[start, end]`
    async fn find_tasks_by_time_range(
        &self,
        repository: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Sessions of `repository` started within `[start, end]`
    async fn find_sessions_by_time_range(
        &self,
        repository: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>>;
}

#[async_trait]
pub trait PatternRepository: Send + Sync {
    async fn find_patterns_by_repository(&self, repository: &str) -> Result<Vec<TaskPattern>>;

    async fn create_pattern(&self, pattern: &TaskPattern) -> Result<()>;

    async fn update_pattern(&self, pattern: &TaskPattern) -> Result<()>;
}
