/// taskmind library
///
/// Learns the order people work in from their task and session history and
/// turns it into ranked suggestions.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod intelligence;

// Re-exports for convenience
pub use config::Config;
pub use db::Database;
pub use error::{Result, TaskMindError};
