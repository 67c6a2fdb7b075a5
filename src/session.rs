//! Per-invocation context.
//!
//! A `Session` ties the open database to one profile, one notion of "today"
//! and the configured scheduler and timetable. Every CLI handler and the TUI
//! go through it, so nothing reads ambient global state.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::db::{Database, Stats};
use crate::error::{AppError, Result};
use crate::models::{Category, Note, Profile, Rating, ReviewRecord, Topic};
use crate::scheduler::SchedulerKind;
use crate::timetable::{countdown, BlockKind, ClockTime, Timetable, STUDY_TZ};

/// Current calendar date in Madrid.
pub fn madrid_today() -> NaiveDate {
    Utc::now().with_timezone(&STUDY_TZ).date_naive()
}

pub struct Session {
    db: Database,
    pub profile: Profile,
    pub today: NaiveDate,
    pub scheduler: SchedulerKind,
    pub timetable: Timetable,
    /// Topics inserted from the default syllabus when the session opened.
    pub seeded: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub topic: Topic,
    pub rating: Rating,
    pub level_before: i32,
    pub interval_days: u64,
}

/// The block active at an instant, rendered for display.
#[derive(Debug, Clone, Serialize)]
pub struct BlockStatus {
    pub timetable: &'static str,
    pub local_time: String,
    pub label: &'static str,
    pub kind: BlockKind,
    pub focus: Option<&'static str>,
    pub end_time: Option<ClockTime>,
    pub countdown: String,
}

impl Session {
    /// Prepare the schema, resolve the profile and provision its syllabus on
    /// first use.
    pub fn open(db: Database, config: &Config, profile: &str, today: NaiveDate) -> Result<Self> {
        db.init()?;
        let profile = db.get_or_create_profile(profile)?;
        let seeded = db.seed_defaults(profile.id, today)?;

        Ok(Self {
            db,
            profile,
            today,
            scheduler: config.scheduler,
            timetable: config.timetable,
            seeded,
        })
    }

    pub fn topic(&self, id: i64) -> Result<Topic> {
        self.db
            .get_topic(self.profile.id, id)?
            .ok_or(AppError::TopicNotFound(id))
    }

    pub fn topics(&self, subject: Option<&str>) -> Result<Vec<Topic>> {
        Ok(self.db.list_topics(self.profile.id, subject)?)
    }

    pub fn add_topic(&self, subject: &str, name: &str, category: Category) -> Result<Topic> {
        let id = self
            .db
            .add_topic(self.profile.id, subject, name, category, self.today)?;
        self.topic(id)
    }

    pub fn remove_topic(&self, id: i64) -> Result<()> {
        if !self.db.delete_topic(self.profile.id, id)? {
            return Err(AppError::TopicNotFound(id));
        }
        Ok(())
    }

    pub fn set_unlocked(&self, id: i64, unlocked: bool) -> Result<Topic> {
        if !self
            .db
            .set_unlocked(self.profile.id, id, unlocked, self.today)?
        {
            return Err(AppError::TopicNotFound(id));
        }
        self.topic(id)
    }

    pub fn toggle_unlocked(&self, id: i64) -> Result<Topic> {
        let topic = self.topic(id)?;
        self.set_unlocked(id, !topic.unlocked)
    }

    pub fn set_flagged(&self, id: i64, flagged: bool) -> Result<Topic> {
        if !self.db.set_extra_queue(self.profile.id, id, flagged)? {
            return Err(AppError::TopicNotFound(id));
        }
        self.topic(id)
    }

    /// Blank text clears the stored mistake.
    pub fn set_error(&self, id: i64, error: Option<&str>) -> Result<Topic> {
        let error = error.map(str::trim).filter(|e| !e.is_empty());
        if !self.db.set_last_error(self.profile.id, id, error)? {
            return Err(AppError::TopicNotFound(id));
        }
        self.topic(id)
    }

    pub fn due(&self) -> Result<Vec<Topic>> {
        Ok(self.db.due_topics(self.profile.id, self.today)?)
    }

    pub fn next(&self) -> Result<Option<Topic>> {
        Ok(self.db.get_next_topic(self.profile.id, self.today)?)
    }

    /// Schedule a review and persist it. Nothing is written when the
    /// scheduler rejects the rating or the topic is locked.
    pub fn review(&self, id: i64, rating: Rating) -> Result<ReviewOutcome> {
        let before = self.topic(id)?;
        let (after, result) = self.scheduler.apply_review(&before, rating, self.today)?;
        self.db.save_review(&before, &after, rating)?;

        info!(
            topic_id = id,
            rating = rating.as_str(),
            level = after.level,
            next_review = %after.next_review,
            "review recorded"
        );

        Ok(ReviewOutcome {
            topic: after,
            rating,
            level_before: before.level,
            interval_days: result.interval_days,
        })
    }

    pub fn history(&self, id: i64) -> Result<Vec<ReviewRecord>> {
        let topic = self.topic(id)?;
        Ok(self.db.review_history(topic.id)?)
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(self.db.get_stats(self.profile.id, self.today)?)
    }

    pub fn notes(&self) -> Result<Vec<Note>> {
        Ok(self.db.list_notes(self.profile.id)?)
    }

    pub fn add_note(&self, text: &str) -> Result<i64> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::EmptyNote);
        }
        Ok(self.db.add_note(self.profile.id, text)?)
    }

    pub fn delete_note(&self, id: i64) -> Result<()> {
        if !self.db.delete_note(self.profile.id, id)? {
            return Err(AppError::NoteNotFound(id));
        }
        Ok(())
    }

    pub fn reset(&self) -> Result<usize> {
        Ok(self.db.reset_profile(self.profile.id, self.today)?)
    }

    pub fn block_at<Z: TimeZone>(&self, now: &DateTime<Z>) -> BlockStatus {
        BlockStatus::at(self.timetable, now)
    }
}

impl BlockStatus {
    pub fn at<Z: TimeZone>(timetable: Timetable, now: &DateTime<Z>) -> Self {
        let block = timetable.classify(now);
        Self {
            timetable: timetable.as_str(),
            local_time: now
                .with_timezone(&STUDY_TZ)
                .format("%a %H:%M:%S")
                .to_string(),
            label: block.label,
            kind: block.kind,
            focus: block.focus,
            end_time: block.end_time,
            countdown: countdown(now, &block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ScheduleError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_with(config: Config, today: NaiveDate) -> Session {
        let db = Database::open(":memory:").unwrap();
        Session::open(db, &config, "test", today).unwrap()
    }

    fn setup_session() -> Session {
        open_with(Config::default(), date(2025, 3, 10))
    }

    #[test]
    fn open_seeds_once() {
        let session = setup_session();
        assert_eq!(session.seeded, crate::syllabus::topic_count());
        assert_eq!(session.profile.name, "test");
        assert!(session.due().unwrap().is_empty());
    }

    #[test]
    fn missing_topic_is_an_error() {
        let session = setup_session();
        assert!(matches!(session.topic(9999), Err(AppError::TopicNotFound(9999))));
        assert!(matches!(
            session.set_unlocked(9999, true),
            Err(AppError::TopicNotFound(9999))
        ));
        assert!(matches!(
            session.remove_topic(9999),
            Err(AppError::TopicNotFound(9999))
        ));
    }

    #[test]
    fn unlock_makes_topic_due_today() {
        let session = setup_session();
        let topic = session.set_unlocked(1, true).unwrap();
        assert_eq!(topic.next_review, session.today);

        let due = session.due().unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, 1);
    }

    #[test]
    fn toggle_unlock_flips() {
        let session = setup_session();
        assert!(session.toggle_unlocked(2).unwrap().unlocked);
        assert!(!session.toggle_unlocked(2).unwrap().unlocked);
    }

    #[test]
    fn review_locked_topic_is_rejected_without_writes() {
        let session = setup_session();
        let err = session.review(1, Rating::Ok).unwrap_err();
        assert!(matches!(err, AppError::Schedule(ScheduleError::Locked(_))));
        assert!(session.history(1).unwrap().is_empty());
        assert_eq!(session.topic(1).unwrap().level, 0);
    }

    #[test]
    fn graded_review_persists_and_leaves_due_set() {
        let session = setup_session();
        session.set_unlocked(1, true).unwrap();

        let outcome = session.review(1, Rating::Ok).unwrap();
        assert_eq!(outcome.level_before, 0);
        assert_eq!(outcome.topic.level, 1);
        assert_eq!(outcome.interval_days, 8);
        assert_eq!(outcome.topic.next_review, date(2025, 3, 18));
        assert_eq!(outcome.topic.last_review, Some(session.today));

        assert_eq!(session.topic(1).unwrap(), outcome.topic);
        assert!(session.due().unwrap().is_empty());
        assert_eq!(session.history(1).unwrap().len(), 1);
    }

    #[test]
    fn review_clears_flag_but_keeps_error_note() {
        let session = setup_session();
        session.set_unlocked(1, true).unwrap();
        session.set_flagged(1, true).unwrap();
        session.set_error(1, Some("sign of the determinant")).unwrap();

        let outcome = session.review(1, Rating::Mid).unwrap();
        assert!(!outcome.topic.extra_queue);
        assert_eq!(
            outcome.topic.last_error.as_deref(),
            Some("sign of the determinant")
        );
    }

    #[test]
    fn ladder_rejects_mid_without_writes() {
        let config = Config {
            scheduler: SchedulerKind::Ladder,
            ..Config::default()
        };
        let session = open_with(config, date(2025, 3, 10));
        session.set_unlocked(1, true).unwrap();

        let err = session.review(1, Rating::Mid).unwrap_err();
        assert!(matches!(
            err,
            AppError::Schedule(ScheduleError::UnsupportedRating { .. })
        ));
        assert!(session.history(1).unwrap().is_empty());

        let outcome = session.review(1, Rating::Ok).unwrap();
        assert_eq!(outcome.interval_days, 1);
        assert_eq!(outcome.topic.next_review, date(2025, 3, 11));
    }

    #[test]
    fn stale_topic_due_on_later_day() {
        let session = setup_session();
        session.set_unlocked(5, true).unwrap();
        session.review(5, Rating::Ok).unwrap();

        assert!(session.due().unwrap().is_empty());

        let mut session = session;
        session.today = date(2031, 1, 1);
        assert_eq!(session.due().unwrap().len(), 1);
    }

    #[test]
    fn notes_lifecycle() {
        let session = setup_session();
        let id = session.add_note("Traer calculadora").unwrap();
        assert_eq!(session.notes().unwrap().len(), 1);
        session.delete_note(id).unwrap();
        assert!(matches!(
            session.delete_note(id),
            Err(AppError::NoteNotFound(_))
        ));
    }

    #[test]
    fn blank_note_is_rejected() {
        let session = setup_session();
        assert!(matches!(session.add_note("   "), Err(AppError::EmptyNote)));
        assert!(session.notes().unwrap().is_empty());

        session.add_note("  Repasar pH  ").unwrap();
        assert_eq!(session.notes().unwrap()[0].text, "Repasar pH");
    }

    #[test]
    fn blank_mistake_clears_the_error() {
        let session = setup_session();
        session.set_error(1, Some("olvidé el signo")).unwrap();

        let topic = session.set_error(1, Some("  ")).unwrap();
        assert_eq!(topic.last_error, None);
    }

    #[test]
    fn reset_relocks_everything() {
        let session = setup_session();
        session.set_unlocked(1, true).unwrap();
        session.set_unlocked(2, true).unwrap();

        let inserted = session.reset().unwrap();
        assert_eq!(inserted, crate::syllabus::topic_count());
        assert_eq!(session.stats().unwrap().unlocked, 0);
    }

    #[test]
    fn block_at_reports_madrid_time() {
        let config = Config {
            timetable: Timetable::Elite,
            ..Config::default()
        };
        let session = open_with(config, date(2025, 1, 15));
        // 16:15 UTC is 17:15 in Madrid on a winter Wednesday
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 16, 15, 0).unwrap();

        let status = session.block_at(&now);
        assert_eq!(status.timetable, "elite");
        assert_eq!(status.local_time, "Wed 17:15:00");
        assert_eq!(status.label, "Homework / Study");
        assert_eq!(status.countdown, "00:15:00");
    }
}
