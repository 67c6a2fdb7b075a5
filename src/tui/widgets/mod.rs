pub mod dashboard;
pub mod notes;
pub mod syllabus;

use crate::models::MAX_LEVEL;

pub fn mastery_bar(level: i32) -> String {
    let filled = level.clamp(0, MAX_LEVEL) as usize;
    let empty = MAX_LEVEL as usize - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}
