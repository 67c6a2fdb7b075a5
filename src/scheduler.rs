//! Review scheduling.
//!
//! Two incompatible review curves are supported. One of them is picked per
//! installation through `config.toml`; they are never blended, because doing
//! so would silently change the cadence of topics already in rotation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{Rating, Topic, MAX_LEVEL};

/// Fixed-interval ladder, in days, indexed by `new_level - 1`.
pub const LADDER_INTERVALS: [u64; 5] = [1, 3, 7, 14, 30];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid rating '{0}'. Use: ok, mid or bad")]
    InvalidRating(String),

    #[error("rating '{rating}' is not supported by the {scheduler} scheduler")]
    UnsupportedRating {
        rating: &'static str,
        scheduler: &'static str,
    },

    #[error("topic '{0}' is locked; unlock it before reviewing")]
    Locked(String),

    #[error("next review date is out of range")]
    DateOutOfRange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Binary pass/fail against a fixed interval ladder.
    Ladder,
    /// Ternary ok/mid/bad; a bad recall resets to level 1.
    #[default]
    Graded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewResult {
    pub new_level: i32,
    pub interval_days: u64,
    pub next_review: NaiveDate,
}

pub fn clamp_level(level: i32) -> i32 {
    level.clamp(0, MAX_LEVEL)
}

impl SchedulerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerKind::Ladder => "ladder",
            SchedulerKind::Graded => "graded",
        }
    }

    pub fn supports(&self, rating: Rating) -> bool {
        !matches!((self, rating), (SchedulerKind::Ladder, Rating::Mid))
    }

    /// Compute the next mastery level and review date.
    ///
    /// Stale levels from older data are clamped into `[0, 5]` first. The
    /// returned date is always at least one day after `today`.
    pub fn review(
        &self,
        level: i32,
        rating: Rating,
        today: NaiveDate,
    ) -> Result<ReviewResult, ScheduleError> {
        let level = clamp_level(level);

        let (new_level, interval_days) = match (self, rating) {
            (SchedulerKind::Ladder, Rating::Ok) => {
                let new_level = (level + 1).min(MAX_LEVEL);
                let idx = (new_level - 1).clamp(0, LADDER_INTERVALS.len() as i32 - 1);
                (new_level, LADDER_INTERVALS[idx as usize])
            }
            (SchedulerKind::Ladder, Rating::Bad) => ((level - 1).max(1), 1),
            (SchedulerKind::Ladder, Rating::Mid) => {
                return Err(ScheduleError::UnsupportedRating {
                    rating: rating.as_str(),
                    scheduler: self.as_str(),
                })
            }
            (SchedulerKind::Graded, Rating::Ok) => {
                let new_level = (level + 1).min(MAX_LEVEL);
                (new_level, new_level as u64 * 5 + 3)
            }
            (SchedulerKind::Graded, Rating::Mid) => (level, 3),
            (SchedulerKind::Graded, Rating::Bad) => (1, 1),
        };

        let next_review = today
            .checked_add_days(Days::new(interval_days))
            .ok_or(ScheduleError::DateOutOfRange)?;

        debug!(
            scheduler = self.as_str(),
            rating = rating.as_str(),
            level,
            new_level,
            interval_days,
            "scheduled review"
        );

        Ok(ReviewResult {
            new_level,
            interval_days,
            next_review,
        })
    }

    /// Run a review against a topic and return the updated copy.
    ///
    /// The input is left untouched, so a failed review never leaves a
    /// half-applied state behind.
    pub fn apply_review(
        &self,
        topic: &Topic,
        rating: Rating,
        today: NaiveDate,
    ) -> Result<(Topic, ReviewResult), ScheduleError> {
        if !topic.unlocked {
            return Err(ScheduleError::Locked(topic.name.clone()));
        }

        let result = self.review(topic.level, rating, today)?;
        let updated = Topic {
            level: result.new_level,
            next_review: result.next_review,
            last_review: Some(today),
            extra_queue: false,
            ..topic.clone()
        };
        Ok((updated, result))
    }
}

/// The due set for `today`, in the order given.
pub fn due_topics(topics: &[Topic], today: NaiveDate) -> Vec<&Topic> {
    topics.iter().filter(|t| t.is_due(today)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_topic;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn days_after(n: i64) -> NaiveDate {
        today() + chrono::Duration::days(n)
    }

    mod ladder_tests {
        use super::*;

        const LADDER: SchedulerKind = SchedulerKind::Ladder;

        #[test]
        fn pass_increments_level_up_to_cap() {
            for level in 1..=5 {
                let r = LADDER.review(level, Rating::Ok, today()).unwrap();
                assert_eq!(r.new_level, (level + 1).min(5));
            }
        }

        #[test]
        fn pass_interval_within_ladder_bounds() {
            for level in 1..=5 {
                let r = LADDER.review(level, Rating::Ok, today()).unwrap();
                let gap = (r.next_review - today()).num_days();
                assert!((1..=30).contains(&gap), "level {} gave {} days", level, gap);
            }
        }

        #[test]
        fn pass_follows_fixed_intervals() {
            let gaps: Vec<u64> = (0..=4)
                .map(|l| LADDER.review(l, Rating::Ok, today()).unwrap().interval_days)
                .collect();
            assert_eq!(gaps, vec![1, 3, 7, 14, 30]);

            // already mastered stays on the longest rung
            let r = LADDER.review(5, Rating::Ok, today()).unwrap();
            assert_eq!(r.interval_days, 30);
            assert_eq!(r.next_review, days_after(30));
        }

        #[test]
        fn fail_decrements_and_floors_at_one() {
            for level in 1..=5 {
                let r = LADDER.review(level, Rating::Bad, today()).unwrap();
                assert_eq!(r.new_level, (level - 1).max(1));
                assert_eq!(r.next_review, days_after(1));
            }
        }

        #[test]
        fn mid_is_rejected() {
            let err = LADDER.review(3, Rating::Mid, today()).unwrap_err();
            assert_eq!(
                err,
                ScheduleError::UnsupportedRating {
                    rating: "mid",
                    scheduler: "ladder"
                }
            );
            assert!(!LADDER.supports(Rating::Mid));
        }
    }

    mod graded_tests {
        use super::*;

        const GRADED: SchedulerKind = SchedulerKind::Graded;

        #[test]
        fn ok_grows_interval_with_level() {
            let r = GRADED.review(2, Rating::Ok, today()).unwrap();
            assert_eq!(r.new_level, 3);
            assert_eq!(r.interval_days, 18);
            assert_eq!(r.next_review, days_after(18));
        }

        #[test]
        fn ok_caps_level_at_five() {
            let r = GRADED.review(5, Rating::Ok, today()).unwrap();
            assert_eq!(r.new_level, 5);
            assert_eq!(r.interval_days, 28);
        }

        #[test]
        fn mid_keeps_level() {
            let r = GRADED.review(4, Rating::Mid, today()).unwrap();
            assert_eq!(r.new_level, 4);
            assert_eq!(r.next_review, days_after(3));
        }

        #[test]
        fn bad_is_a_hard_reset() {
            let r = GRADED.review(3, Rating::Bad, today()).unwrap();
            assert_eq!(r.new_level, 1);
            assert_eq!(r.next_review, days_after(1));

            let r = GRADED.review(5, Rating::Bad, today()).unwrap();
            assert_eq!(r.new_level, 1);
        }

        #[test]
        fn first_review_from_level_zero() {
            let r = GRADED.review(0, Rating::Ok, today()).unwrap();
            assert_eq!(r.new_level, 1);
            assert_eq!(r.interval_days, 8);

            let r = GRADED.review(0, Rating::Mid, today()).unwrap();
            assert_eq!(r.new_level, 0);
        }
    }

    mod invariant_tests {
        use super::*;

        #[test]
        fn stale_levels_are_clamped() {
            let r = SchedulerKind::Graded.review(-4, Rating::Mid, today()).unwrap();
            assert_eq!(r.new_level, 0);

            let r = SchedulerKind::Graded.review(12, Rating::Ok, today()).unwrap();
            assert_eq!(r.new_level, 5);

            let r = SchedulerKind::Ladder.review(-1, Rating::Bad, today()).unwrap();
            assert_eq!(r.new_level, 1);
        }

        #[test]
        fn never_schedules_into_the_past_and_stays_in_range() {
            for kind in [SchedulerKind::Ladder, SchedulerKind::Graded] {
                for level in -2..=7 {
                    for rating in [Rating::Ok, Rating::Mid, Rating::Bad] {
                        if !kind.supports(rating) {
                            continue;
                        }
                        let r = kind.review(level, rating, today()).unwrap();
                        assert!(r.next_review > today());
                        assert!((0..=5).contains(&r.new_level));
                    }
                }
            }
        }

        #[test]
        fn deterministic() {
            let a = SchedulerKind::Graded.review(2, Rating::Ok, today());
            let b = SchedulerKind::Graded.review(2, Rating::Ok, today());
            assert_eq!(a, b);
        }

        #[test]
        fn overflow_is_an_error() {
            let r = SchedulerKind::Graded.review(5, Rating::Ok, NaiveDate::MAX);
            assert_eq!(r.unwrap_err(), ScheduleError::DateOutOfRange);
        }
    }

    mod apply_tests {
        use super::*;

        #[test]
        fn apply_updates_topic_and_clears_extra_queue() {
            let mut topic = make_topic(2, true, days_after(-5));
            topic.extra_queue = true;
            topic.last_error = Some("sign error".to_string());

            let (updated, result) = SchedulerKind::Graded
                .apply_review(&topic, Rating::Ok, today())
                .unwrap();

            assert_eq!(updated.level, 3);
            assert_eq!(updated.next_review, result.next_review);
            assert_eq!(updated.last_review, Some(today()));
            assert!(!updated.extra_queue);
            assert_eq!(updated.last_error.as_deref(), Some("sign error"));
            assert_eq!(topic.level, 2);
        }

        #[test]
        fn apply_rejects_locked_topic() {
            let topic = make_topic(0, false, today());
            let err = SchedulerKind::Graded
                .apply_review(&topic, Rating::Ok, today())
                .unwrap_err();
            assert!(matches!(err, ScheduleError::Locked(_)));
        }

        #[test]
        fn due_topics_filters_locked_and_future() {
            let mut future = make_topic(3, true, days_after(4));
            future.id = 2;
            let mut locked = make_topic(0, false, days_after(-100));
            locked.id = 3;
            let stale = make_topic(2, true, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());

            let topics = vec![future, locked, stale];
            let due = due_topics(&topics, today());
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].id, 1);
        }
    }

    #[test]
    fn graded_is_the_default() {
        assert_eq!(SchedulerKind::default(), SchedulerKind::Graded);
        assert_eq!(SchedulerKind::Ladder.as_str(), "ladder");
    }
}
