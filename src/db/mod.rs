/// Database module for taskmind
///
/// SQLite storage for tasks, sessions and mined patterns, exposed to the
/// intelligence layer through the repository traits.

pub mod connection;
pub mod models;
pub mod queries;
pub mod repository;

pub use connection::Database;
pub use models::*;
pub use repository::{PatternRepository, SessionRepository, TaskRepository};
