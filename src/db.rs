use chrono::{NaiveDate, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::models::{Category, Note, Profile, Rating, ReviewRecord, Topic, MAX_LEVEL};
use crate::scheduler::{clamp_level, due_topics};
use crate::syllabus::DEFAULT_SYLLABUS;

const TOPIC_COLUMNS: &str = "id, profile_id, subject, name, category, unlocked, level, \
     next_review, last_review, last_error, extra_queue, position";

pub struct Database {
    conn: Connection,
}

fn topic_from_row(row: &Row) -> Result<Topic> {
    let category_str: String = row.get(4)?;
    let category = Category::from_str(&category_str).unwrap_or_else(|| {
        warn!(category = %category_str, "unknown stored category, reading as science");
        Category::Science
    });
    Ok(Topic {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        subject: row.get(2)?,
        name: row.get(3)?,
        category,
        unlocked: row.get(5)?,
        level: row.get(6)?,
        next_review: row.get(7)?,
        last_review: row.get(8)?,
        last_error: row.get(9)?,
        extra_queue: row.get(10)?,
        position: row.get(11)?,
    })
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id INTEGER NOT NULL,
                subject TEXT NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'science',
                unlocked INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 0,
                next_review TEXT NOT NULL DEFAULT (date('now')),
                last_review TEXT,
                last_error TEXT,
                extra_queue INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL DEFAULT 0,
                UNIQUE (profile_id, subject, name),
                FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS review_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id INTEGER NOT NULL,
                rating TEXT NOT NULL CHECK(rating IN ('ok', 'mid', 'bad')),
                level_before INTEGER NOT NULL,
                level_after INTEGER NOT NULL,
                next_review TEXT NOT NULL,
                reviewed_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_topics_profile ON topics(profile_id);
            CREATE INDEX IF NOT EXISTS idx_topics_next_review ON topics(next_review);
            CREATE INDEX IF NOT EXISTS idx_review_history_topic ON review_history(topic_id);
            CREATE INDEX IF NOT EXISTS idx_notes_profile ON notes(profile_id);
            "#,
        )?;

        self.migrate()?;

        Ok(())
    }

    // Databases created before the extra queue and error annotations existed
    fn migrate(&self) -> Result<()> {
        let has_extra_queue = self
            .conn
            .prepare("SELECT extra_queue FROM topics LIMIT 1")
            .is_ok();

        if !has_extra_queue {
            info!("migrating topics table: adding extra_queue and last_error");
            self.conn.execute_batch(
                r#"
                ALTER TABLE topics ADD COLUMN extra_queue INTEGER NOT NULL DEFAULT 0;
                ALTER TABLE topics ADD COLUMN last_error TEXT;
                "#,
            )?;
        }

        Ok(())
    }

    // Profile operations
    pub fn get_profile(&self, name: &str) -> Result<Option<Profile>> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM profiles WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Profile {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn get_or_create_profile(&self, name: &str) -> Result<Profile> {
        if let Some(profile) = self.get_profile(name)? {
            return Ok(profile);
        }

        self.conn
            .execute("INSERT INTO profiles (name) VALUES (?1)", params![name])?;
        info!(profile = name, "created profile");

        self.get_profile(name)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Provision the default syllabus for a profile that has no topics yet.
    /// Returns the number of topics inserted.
    pub fn seed_defaults(&self, profile_id: i64, today: NaiveDate) -> Result<usize> {
        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM topics WHERE profile_id = ?1",
            params![profile_id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let inserted = Self::insert_defaults(&tx, profile_id, today)?;
        tx.commit()?;

        info!(profile_id, inserted, "seeded default syllabus");
        Ok(inserted)
    }

    fn insert_defaults(conn: &Connection, profile_id: i64, today: NaiveDate) -> Result<usize> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO topics (profile_id, subject, name, category, next_review, position)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;

        let mut position = 0i64;
        for subject in DEFAULT_SYLLABUS {
            for name in subject.topics {
                stmt.execute(params![
                    profile_id,
                    subject.name,
                    name,
                    subject.category.as_str(),
                    today,
                    position
                ])?;
                position += 1;
            }
        }

        Ok(position as usize)
    }

    /// Drop every topic and note of the profile and recreate the defaults.
    pub fn reset_profile(&self, profile_id: i64, today: NaiveDate) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM topics WHERE profile_id = ?1", params![profile_id])?;
        tx.execute("DELETE FROM notes WHERE profile_id = ?1", params![profile_id])?;
        let inserted = Self::insert_defaults(&tx, profile_id, today)?;
        tx.commit()?;

        info!(profile_id, inserted, "profile reset to default syllabus");
        Ok(inserted)
    }

    // Topic operations
    pub fn add_topic(
        &self,
        profile_id: i64,
        subject: &str,
        name: &str,
        category: Category,
        today: NaiveDate,
    ) -> Result<i64> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM topics WHERE profile_id = ?1",
            params![profile_id],
            |row| row.get(0),
        )?;

        self.conn.execute(
            r#"
            INSERT INTO topics (profile_id, subject, name, category, next_review, position)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![profile_id, subject, name, category.as_str(), today, position],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_topic(&self, profile_id: i64, id: i64) -> Result<Option<Topic>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM topics WHERE id = ?1 AND profile_id = ?2",
                    TOPIC_COLUMNS
                ),
                params![id, profile_id],
                topic_from_row,
            )
            .optional()
    }

    pub fn list_topics(&self, profile_id: i64, subject: Option<&str>) -> Result<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM topics
            WHERE profile_id = ?1 AND (?2 IS NULL OR subject = ?2)
            ORDER BY position, id
            "#,
            TOPIC_COLUMNS
        ))?;

        let rows = stmt.query_map(params![profile_id, subject], topic_from_row)?;
        rows.collect()
    }

    pub fn delete_topic(&self, profile_id: i64, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM topics WHERE id = ?1 AND profile_id = ?2",
            params![id, profile_id],
        )?;
        Ok(rows > 0)
    }

    /// Unlocking puts the topic straight into today's rotation.
    pub fn set_unlocked(
        &self,
        profile_id: i64,
        id: i64,
        unlocked: bool,
        today: NaiveDate,
    ) -> Result<bool> {
        let rows = if unlocked {
            self.conn.execute(
                "UPDATE topics SET unlocked = 1, next_review = ?1 WHERE id = ?2 AND profile_id = ?3",
                params![today, id, profile_id],
            )?
        } else {
            self.conn.execute(
                "UPDATE topics SET unlocked = 0 WHERE id = ?1 AND profile_id = ?2",
                params![id, profile_id],
            )?
        };
        Ok(rows > 0)
    }

    pub fn set_extra_queue(&self, profile_id: i64, id: i64, queued: bool) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE topics SET extra_queue = ?1 WHERE id = ?2 AND profile_id = ?3",
            params![queued, id, profile_id],
        )?;
        Ok(rows > 0)
    }

    pub fn set_last_error(&self, profile_id: i64, id: i64, error: Option<&str>) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE topics SET last_error = ?1 WHERE id = ?2 AND profile_id = ?3",
            params![error, id, profile_id],
        )?;
        Ok(rows > 0)
    }

    /// Persist a scheduled review. The topic row is overwritten
    /// unconditionally; concurrent sessions resolve as last write wins.
    pub fn save_review(&self, before: &Topic, after: &Topic, rating: Rating) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            r#"
            UPDATE topics
            SET level = ?1,
                next_review = ?2,
                last_review = ?3,
                extra_queue = ?4
            WHERE id = ?5
            "#,
            params![
                clamp_level(after.level),
                after.next_review,
                after.last_review,
                after.extra_queue,
                after.id
            ],
        )?;

        tx.execute(
            r#"
            INSERT INTO review_history (topic_id, rating, level_before, level_after, next_review, reviewed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                after.id,
                rating.as_str(),
                before.level,
                after.level,
                after.next_review,
                Utc::now().to_rfc3339()
            ],
        )?;

        tx.commit()?;
        debug!(topic_id = after.id, rating = rating.as_str(), "review saved");
        Ok(())
    }

    pub fn review_history(&self, topic_id: i64) -> Result<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, topic_id, rating, level_before, level_after, next_review, reviewed_at
            FROM review_history
            WHERE topic_id = ?1
            ORDER BY id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![topic_id], |row| {
            let rating_str: String = row.get(2)?;
            Ok(ReviewRecord {
                id: row.get(0)?,
                topic_id: row.get(1)?,
                rating: rating_str.parse().unwrap_or(Rating::Mid),
                level_before: row.get(3)?,
                level_after: row.get(4)?,
                next_review: row.get(5)?,
                reviewed_at: row.get(6)?,
            })
        })?;

        rows.collect()
    }

    /// Today's due set, most overdue first, weakest first within a day.
    pub fn due_topics(&self, profile_id: i64, today: NaiveDate) -> Result<Vec<Topic>> {
        let topics = self.list_topics(profile_id, None)?;
        let mut due: Vec<Topic> = due_topics(&topics, today).into_iter().cloned().collect();
        due.sort_by_key(|t| (t.next_review, t.level, t.position));
        Ok(due)
    }

    // Stochastic selection for next topic to review
    pub fn get_next_topic(&self, profile_id: i64, today: NaiveDate) -> Result<Option<Topic>> {
        let topics = self.due_topics(profile_id, today)?;
        let mut rng = rand::thread_rng();
        Ok(choose_weighted(&topics, today, &mut rng).cloned())
    }

    // Note operations
    pub fn add_note(&self, profile_id: i64, text: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO notes (profile_id, text, created_at) VALUES (?1, ?2, ?3)",
            params![profile_id, text, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_notes(&self, profile_id: i64) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, profile_id, text, created_at
            FROM notes
            WHERE profile_id = ?1
            ORDER BY id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![profile_id], |row| {
            Ok(Note {
                id: row.get(0)?,
                profile_id: row.get(1)?,
                text: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        rows.collect()
    }

    pub fn delete_note(&self, profile_id: i64, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND profile_id = ?2",
            params![id, profile_id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_stats(&self, profile_id: i64, today: NaiveDate) -> Result<Stats> {
        let topics = self.list_topics(profile_id, None)?;

        let total_reviews: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM review_history rh
            JOIN topics t ON t.id = rh.topic_id
            WHERE t.profile_id = ?1
            "#,
            params![profile_id],
            |row| row.get(0),
        )?;

        Ok(Stats::from_topics(&topics, today, total_reviews))
    }
}

/// Weighted draw favouring overdue and weakly known topics.
pub fn choose_weighted<'a, R: Rng>(
    topics: &'a [Topic],
    today: NaiveDate,
    rng: &mut R,
) -> Option<&'a Topic> {
    if topics.is_empty() {
        return None;
    }

    let weights: Vec<f64> = topics
        .iter()
        .map(|t| {
            let overdue = t.overdue_days(today) as f64 + 1.0;
            let weakness = (MAX_LEVEL + 1 - clamp_level(t.level)) as f64;
            overdue * weakness
        })
        .collect();

    let total_weight: f64 = weights.iter().sum();
    let mut random_point = rng.gen::<f64>() * total_weight;

    for (topic, weight) in topics.iter().zip(&weights) {
        random_point -= weight;
        if random_point <= 0.0 {
            return Some(topic);
        }
    }

    topics.first()
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectProgress {
    pub subject: String,
    pub total: usize,
    pub unlocked: usize,
    pub unlocked_percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_topics: usize,
    pub unlocked: usize,
    pub mastered: usize,
    pub due_now: usize,
    pub total_reviews: i64,
    pub mastery_percent: u32,
    pub subjects: Vec<SubjectProgress>,
}

impl Stats {
    pub fn from_topics(topics: &[Topic], today: NaiveDate, total_reviews: i64) -> Self {
        let total_levels = topics.len() as i64 * MAX_LEVEL as i64;
        let current_levels: i64 = topics
            .iter()
            .map(|t| clamp_level(t.level) as i64)
            .sum();
        let mastery_percent = if total_levels > 0 {
            (current_levels * 100 / total_levels) as u32
        } else {
            0
        };

        let mut subjects: Vec<SubjectProgress> = Vec::new();
        for topic in topics {
            let idx = match subjects.iter().position(|s| s.subject == topic.subject) {
                Some(i) => i,
                None => {
                    subjects.push(SubjectProgress {
                        subject: topic.subject.clone(),
                        total: 0,
                        unlocked: 0,
                        unlocked_percent: 0,
                    });
                    subjects.len() - 1
                }
            };
            subjects[idx].total += 1;
            if topic.unlocked {
                subjects[idx].unlocked += 1;
            }
        }
        for s in &mut subjects {
            s.unlocked_percent = (s.unlocked * 100 / s.total) as u32;
        }

        Self {
            total_topics: topics.len(),
            unlocked: topics.iter().filter(|t| t.unlocked).count(),
            mastered: topics.iter().filter(|t| t.is_mastered()).count(),
            due_now: topics.iter().filter(|t| t.is_due(today)).count(),
            total_reviews,
            mastery_percent,
            subjects,
        }
    }
}
