use thiserror::Error;

use crate::config::ConfigError;
use crate::scheduler::ScheduleError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("topic {0} not found")]
    TopicNotFound(i64),

    #[error("note {0} not found")]
    NoteNotFound(i64),

    #[error("note text is empty")]
    EmptyNote,

    #[error("unknown category '{0}'. Use: science, memory or skills")]
    InvalidCategory(String),

    #[error("invalid timestamp '{0}': expected RFC 3339, e.g. 2025-03-10T17:30:00+01:00")]
    InvalidTimestamp(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
