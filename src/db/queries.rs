/// SQL query functions for database operations
///
/// `Database` is the SQLite-backed implementation of the repository traits.

use crate::db::models::*;
use crate::db::repository::{PatternRepository, SessionRepository, TaskRepository};
use crate::db::Database;
use crate::error::{Result, TaskMindError};
use crate::intelligence::pattern::TaskPattern;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

impl Database {
    /// Insert a task, replacing any stored task with the same id
    pub async fn insert_task(&self, task: &Task) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, repository, content, status, priority, task_type, tags,
                               parent_task_id, dependencies, estimated_mins, actual_mins,
                               created_at, updated_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                repository = excluded.repository,
                content = excluded.content,
                status = excluded.status,
                priority = excluded.priority,
                task_type = excluded.task_type,
                tags = excluded.tags,
                parent_task_id = excluded.parent_task_id,
                dependencies = excluded.dependencies,
                estimated_mins = excluded.estimated_mins,
                actual_mins = excluded.actual_mins,
                updated_at = excluded.updated_at,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&task.id)
        .bind(&task.repository)
        .bind(&task.content)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.task_type.map(|t| t.as_str()))
        .bind(serde_json::to_string(&task.tags)?)
        .bind(&task.parent_task_id)
        .bind(serde_json::to_string(&task.dependencies)?)
        .bind(task.estimated_mins.map(i64::from))
        .bind(task.actual_mins.map(i64::from))
        .bind(format_timestamp(&task.created_at))
        .bind(format_timestamp(&task.updated_at))
        .bind(task.completed_at.as_ref().map(format_timestamp))
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Insert a session, replacing any stored session with the same id
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, repository, start_time, end_time, duration_mins,
                                  tasks_started, tasks_completed, focus_score,
                                  productivity_score, goals)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                end_time = excluded.end_time,
                duration_mins = excluded.duration_mins,
                tasks_started = excluded.tasks_started,
                tasks_completed = excluded.tasks_completed,
                focus_score = excluded.focus_score,
                productivity_score = excluded.productivity_score,
                goals = excluded.goals
            "#,
        )
        .bind(&session.id)
        .bind(&session.repository)
        .bind(format_timestamp(&session.start_time))
        .bind(session.end_time.as_ref().map(format_timestamp))
        .bind(session.duration_mins)
        .bind(i64::from(session.tasks_started))
        .bind(i64::from(session.tasks_completed))
        .bind(session.focus_score)
        .bind(session.productivity_score)
        .bind(serde_json::to_string(&session.goals)?)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn write_pattern(&self, pattern: &TaskPattern, upsert: bool) -> Result<()> {
        let conflict = if upsert {
            r#"
            ON CONFLICT(id) DO UPDATE SET
                pattern_key = excluded.pattern_key,
                name = excluded.name,
                description = excluded.description,
                sequence = excluded.sequence,
                frequency = excluded.frequency,
                confidence = excluded.confidence,
                success_rate = excluded.success_rate,
                occurrences = excluded.occurrences,
                project_type = excluded.project_type,
                metadata = excluded.metadata,
                first_seen = excluded.first_seen,
                last_seen = excluded.last_seen,
                updated_at = excluded.updated_at
            "#
        } else {
            ""
        };

        let sql = format!(
            r#"
            INSERT INTO task_patterns (id, pattern_key, pattern_type, name, description, sequence,
                                       frequency, confidence, success_rate, occurrences, repository,
                                       project_type, metadata, first_seen, last_seen,
                                       created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            {}
            "#,
            conflict
        );

        sqlx::query(&sql)
            .bind(&pattern.id)
            .bind(&pattern.key)
            .bind(pattern.pattern_type.as_str())
            .bind(&pattern.name)
            .bind(&pattern.description)
            .bind(serde_json::to_string(&pattern.sequence)?)
            .bind(pattern.frequency)
            .bind(pattern.confidence)
            .bind(pattern.success_rate)
            .bind(i64::from(pattern.occurrences))
            .bind(&pattern.repository)
            .bind(&pattern.project_type)
            .bind(serde_json::to_string(&pattern.metadata)?)
            .bind(format_timestamp(&pattern.first_seen))
            .bind(format_timestamp(&pattern.last_seen))
            .bind(format_timestamp(&pattern.created_at))
            .bind(format_timestamp(&pattern.updated_at))
            .execute(self.pool())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TaskRepository for Database {
    async fn find_tasks_by_time_range(
        &self,
        repository: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE repository = ? AND created_at >= ? AND created_at <= ? ORDER BY created_at ASC",
        )
        .bind(repository)
        .bind(format_timestamp(&start))
        .bind(format_timestamp(&end))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }
}

#[async_trait]
impl SessionRepository for Database {
    async fn find_sessions_by_time_range(
        &self,
        repository: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE repository = ? AND start_time >= ? AND start_time <= ? ORDER BY start_time ASC",
        )
        .bind(repository)
        .bind(format_timestamp(&start))
        .bind(format_timestamp(&end))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Session::try_from).collect()
    }
}

#[async_trait]
impl PatternRepository for Database {
    async fn find_patterns_by_repository(&self, repository: &str) -> Result<Vec<TaskPattern>> {
        let rows = sqlx::query_as::<_, PatternRow>(
            "SELECT * FROM task_patterns WHERE repository = ? ORDER BY confidence DESC",
        )
        .bind(repository)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TaskPattern::try_from).collect()
    }

    async fn create_pattern(&self, pattern: &TaskPattern) -> Result<()> {
        self.write_pattern(pattern, false).await
    }

    async fn update_pattern(&self, pattern: &TaskPattern) -> Result<()> {
        self.write_pattern(pattern, true).await
    }
}

impl TryFrom<PatternRow> for TaskPattern {
    type Error = TaskMindError;

    fn try_from(row: PatternRow) -> Result<Self> {
        Ok(TaskPattern {
            id: row.id,
            key: row.pattern_key,
            pattern_type: row.pattern_type.parse()?,
            name: row.name,
            description: row.description,
            sequence: serde_json::from_str(&row.sequence)?,
            frequency: row.frequency,
            confidence: row.confidence,
            success_rate: row.success_rate,
            occurrences: u32::try_from(row.occurrences.max(0)).unwrap_or(u32::MAX),
            repository: row.repository,
            project_type: row.project_type,
            metadata: serde_json::from_str(&row.metadata)?,
            first_seen: parse_timestamp(&row.first_seen)?,
            last_seen: parse_timestamp(&row.last_seen)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::pattern::{DurationStats, PatternStep, PatternType};
    use chrono::Duration;

    fn task_at(content: &str, created_at: DateTime<Utc>) -> Task {
        let mut task = Task::new("acme/api", content);
        task.created_at = created_at;
        task.updated_at = created_at;
        task
    }

    #[tokio::test]
    async fn test_insert_and_find_tasks_in_range() {
        let db = Database::new_test().await.unwrap();
        let now = Utc::now();

        let mut old = task_at("ancient chore", now - Duration::days(40));
        old.tags = vec!["legacy".to_string()];
        db.insert_task(&old).await.unwrap();

        let mut recent = task_at("fix login crash", now - Duration::hours(2));
        recent.status = TaskStatus::Completed;
        recent.priority = Priority::High;
        recent.dependencies = vec![old.id.clone()];
        recent.completed_at = Some(now - Duration::hours(1));
        db.insert_task(&recent).await.unwrap();

        let mut other_repo = task_at("unrelated", now);
        other_repo.repository = "acme/web".to_string();
        db.insert_task(&other_repo).await.unwrap();

        let found = db
            .find_tasks_by_time_range("acme/api", now - Duration::days(30), now)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, recent.id);
        assert_eq!(found[0].status, TaskStatus::Completed);
        assert_eq!(found[0].priority, Priority::High);
        assert_eq!(found[0].dependencies, vec![old.id.clone()]);
        assert!(found[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_insert_task_twice_updates() {
        let db = Database::new_test().await.unwrap();
        let now = Utc::now();

        let mut task = task_at("write docs", now);
        db.insert_task(&task).await.unwrap();
        task.status = TaskStatus::Completed;
        db.insert_task(&task).await.unwrap();

        let found = db
            .find_tasks_by_time_range("acme/api", now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_sessions_roundtrip() {
        let db = Database::new_test().await.unwrap();
        let now = Utc::now();

        let mut session = Session::new("acme/api", now - Duration::hours(3), 0.85);
        session.duration_mins = 95.0;
        session.tasks_completed = 4;
        db.insert_session(&session).await.unwrap();

        let found = db
            .find_sessions_by_time_range("acme/api", now - Duration::days(1), now)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].productivity_score, 0.85);
        assert_eq!(found[0].tasks_completed, 4);
    }

    #[tokio::test]
    async fn test_pattern_create_then_update() {
        let db = Database::new_test().await.unwrap();
        let now = Utc::now();

        let step = PatternStep {
            order: 0,
            task_type: TaskType::Bugfix,
            keywords: vec!["login".to_string()],
            duration: DurationStats::from_sample(30.0),
            priority: Priority::High,
            tags: Vec::new(),
            probability: 1.0,
        };
        let mut pattern = TaskPattern::new(
            "bugfix:high",
            PatternType::Sequence,
            "acme/api",
            vec![step],
            now,
        );
        pattern.add_occurrence(1.0, now);
        db.create_pattern(&pattern).await.unwrap();

        // Creating the same id again is a conflict
        assert!(db.create_pattern(&pattern).await.is_err());

        pattern.add_occurrence(1.0, now);
        db.update_pattern(&pattern).await.unwrap();

        let stored = db.find_patterns_by_repository("acme/api").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].occurrences, 2);
        assert_eq!(stored[0].key, "bugfix:high");
        assert_eq!(stored[0].sequence[0].duration.samples, 1);
    }
}
