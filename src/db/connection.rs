/// Database connection management with connection pooling
///
/// Provides a thread-safe connection pool to SQLite database.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Maximum number of database connections in the pool
const MAX_CONNECTIONS: u32 = 5;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `db_path`
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Examples
    /// ```no_run
    /// use taskmind_lib::db::Database;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new("/tmp/taskmind.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path,
        };

        db.initialize_schema().await?;
        tracing::debug!(path = %db.db_path.display(), "database ready");

        Ok(db)
    }

    /// Create a test database in memory
    ///
    /// Every pooled connection to `sqlite::memory:` would get its own empty
    /// database, so the test pool holds exactly one.
    #[cfg(test)]
    pub async fn new_test() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path: PathBuf::from(":memory:"),
        };

        db.initialize_schema().await?;

        Ok(db)
    }

    /// Creates all tables and indexes if they don't exist
    async fn initialize_schema(&self) -> Result<()> {
        let schema = include_str!("../../database/schema.sql");

        // sqlx runs one statement per query here
        for statement in schema.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(self.pool.as_ref()).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Close all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Row counts, for `taskmind status`
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let task_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(self.pool.as_ref())
            .await?;

        let session_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(self.pool.as_ref())
            .await?;

        let pattern_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_patterns")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(DatabaseStats {
            total_tasks: task_count.0,
            total_sessions: session_count.0,
            total_patterns: pattern_count.0,
            pool_size: self.pool.size(),
            idle_connections: self.pool.num_idle(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub total_tasks: i64,
    pub total_sessions: i64,
    pub total_patterns: i64,
    pub pool_size: u32,
    pub idle_connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_creation() {
        let db = Database::new_test().await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn test_database_stats_empty() {
        let db = Database::new_test().await.unwrap();
        let stats = db.stats().await.unwrap();

        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.total_patterns, 0);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("taskmind.db");

        let db = Database::new(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());
        db.close().await;
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskmind.db");

        tokio_test::block_on(async {
            let db = Database::new(&path).await.unwrap();
            db.insert_task(&crate::db::models::Task::new("acme/api", "write docs"))
                .await
                .unwrap();
            db.close().await;

            let reopened = Database::new(&path).await.unwrap();
            assert_eq!(reopened.stats().await.unwrap().total_tasks, 1);
            reopened.close().await;
        });
    }
}
