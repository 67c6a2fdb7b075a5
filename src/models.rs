use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scheduler::ScheduleError;

pub const MAX_LEVEL: i32 = 5;
pub const MASTERED_LEVEL: i32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

// Informational grouping, never consulted by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Science,
    Memory,
    Skills,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Science => "science",
            Category::Memory => "memory",
            Category::Skills => "skills",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "science" | "sci" => Some(Category::Science),
            "memory" | "mem" => Some(Category::Memory),
            "skills" | "skill" => Some(Category::Skills),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub profile_id: i64,
    pub subject: String,
    pub name: String,
    pub category: Category,
    pub unlocked: bool,
    pub level: i32,
    pub next_review: NaiveDate,
    pub last_review: Option<NaiveDate>,
    pub last_error: Option<String>,
    pub extra_queue: bool,
    pub position: i64,
}

impl Topic {
    /// A topic is due once it is in rotation and either its review date has
    /// arrived or it was pushed onto today's extra queue.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.unlocked && (self.extra_queue || self.next_review <= today)
    }

    pub fn is_mastered(&self) -> bool {
        self.level >= MASTERED_LEVEL
    }

    pub fn overdue_days(&self, today: NaiveDate) -> i64 {
        (today - self.next_review).num_days().max(0)
    }

    pub fn mastery_label(&self) -> &'static str {
        match self.level {
            0 => "New",
            1 => "Learning",
            2 => "Familiar",
            3 => "Comfortable",
            4 => "Proficient",
            5 => "Mastered",
            _ => "Unknown",
        }
    }
}

// Self-rated recall quality after a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Ok,
    Mid,
    Bad,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Ok => "ok",
            Rating::Mid => "mid",
            Rating::Bad => "bad",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Ok => "Easy",
            Rating::Mid => "Regular",
            Rating::Bad => "Hard",
        }
    }
}

impl FromStr for Rating {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ok" | "good" | "easy" | "pass" | "p" | "y" | "yes" => Ok(Rating::Ok),
            "mid" | "medium" | "regular" | "m" | "partial" => Ok(Rating::Mid),
            "bad" | "hard" | "fail" | "f" | "n" | "no" => Ok(Rating::Bad),
            _ => Err(ScheduleError::InvalidRating(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub topic_id: i64,
    pub rating: Rating,
    pub level_before: i32,
    pub level_after: i32,
    pub next_review: NaiveDate,
    pub reviewed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub profile_id: i64,
    pub text: String,
    pub created_at: String,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
pub(crate) fn make_topic(level: i32, unlocked: bool, next_review: NaiveDate) -> Topic {
    Topic {
        id: 1,
        profile_id: 1,
        subject: "Física".to_string(),
        name: "Campo Eléctrico".to_string(),
        category: Category::Science,
        unlocked,
        level,
        next_review,
        last_review: None,
        last_error: None,
        extra_queue: false,
        position: 0,
    }
}
