/// Error types for taskmind
///
/// This module defines all possible errors that can occur in the library.
/// Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Main error type for taskmind operations
#[derive(Error, Debug)]
pub enum TaskMindError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored data could not be turned back into a domain value
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A call into an injected repository failed
    #[error("{context}: {source}")]
    Repository {
        context: String,
        #[source]
        source: Box<TaskMindError>,
    },

    /// Pattern detection error
    #[error("Pattern detection error: {0}")]
    PatternDetection(String),

    /// A long-running pass was cancelled by its caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for taskmind operations
pub type Result<T> = std::result::Result<T, TaskMindError>;

impl TaskMindError {
    /// Wrap an error coming back from a repository call with what we were doing
    pub fn repository(context: impl Into<String>, source: TaskMindError) -> Self {
        TaskMindError::Repository {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Convert TaskMindError to a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TaskMindError::Database(e) => {
                format!("Database error occurred. Please try again. Details: {}", e)
            }
            TaskMindError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            TaskMindError::Git(e) => {
                format!("Git operation failed. Details: {}", e)
            }
            TaskMindError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            TaskMindError::Config(msg) => {
                format!("Configuration issue: {}", msg)
            }
            TaskMindError::InvalidData(msg) => {
                format!("Stored data looks corrupted: {}", msg)
            }
            TaskMindError::Repository { context, source } => {
                format!("{} ({})", context, source.user_message())
            }
            TaskMindError::PatternDetection(msg) => {
                format!("Pattern detection failed: {}", msg)
            }
            TaskMindError::Cancelled => "Analysis was cancelled before it finished".to_string(),
            TaskMindError::Generic(msg) => msg.clone(),
        }
    }
}

/// Attach repository context to a result, the way callers of the storage layer do
pub trait RepositoryContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> RepositoryContext<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TaskMindError::repository(context, e))
    }
}
