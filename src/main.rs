mod config;
mod db;
mod error;
mod models;
mod scheduler;
mod session;
mod syllabus;
mod timetable;
mod tui;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use config::{get_config_path, get_db_path, Config};
use db::Database;
use error::{AppError, Result};
use models::{Category, JsonOutput, Rating, Topic};
use session::{madrid_today, BlockStatus, Session};

#[derive(Parser)]
#[command(name = "pau")]
#[command(about = "Spaced-repetition study tracker for the PAU entrance exam")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Profile to act on (overrides config)
    #[arg(long, short, global = true)]
    profile: Option<String>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and seed the default syllabus
    Init,

    /// Manage topics
    #[command(subcommand)]
    Topic(TopicCommands),

    /// List topics due for review today
    Due,

    /// Get next topic to review (stochastic selection)
    Next,

    /// Record a self-rating for a topic
    Review {
        /// Topic ID
        id: i64,

        /// Recall quality: ok/mid/bad
        #[arg(long, short)]
        rating: String,
    },

    /// Show the active study block and its countdown
    Now {
        /// Instant to classify (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Show study statistics
    Stats,

    /// Quick notes
    #[command(subcommand)]
    Note(NoteCommands),

    /// Delete all topics and notes of the profile and reseed the syllabus
    Reset,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// List topics
    List {
        /// Filter by subject
        #[arg(long, short)]
        subject: Option<String>,

        /// Only topics in rotation
        #[arg(long, short)]
        unlocked: bool,
    },

    /// Show topic details and review history
    Show {
        /// Topic ID
        id: i64,
    },

    /// Add a custom topic
    Add {
        /// Subject name
        subject: String,

        /// Topic name
        name: String,

        /// science, memory or skills
        #[arg(long, short, default_value = "science")]
        category: String,
    },

    /// Remove a topic
    Remove {
        /// Topic ID
        id: i64,
    },

    /// Put a topic into the review rotation, due today
    Unlock {
        /// Topic ID
        id: i64,
    },

    /// Take a topic out of the review rotation
    Lock {
        /// Topic ID
        id: i64,
    },

    /// Force a topic into today's due set
    Flag {
        /// Topic ID
        id: i64,
    },

    /// Remove a topic from the extra queue
    Unflag {
        /// Topic ID
        id: i64,
    },

    /// Record the last mistake made on a topic
    Error {
        /// Topic ID
        id: i64,

        /// What went wrong
        text: String,
    },

    /// Clear the recorded mistake
    ClearError {
        /// Topic ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note
    Add {
        /// Note text
        text: String,
    },

    /// List notes
    List,

    /// Delete a note
    Delete {
        /// Note ID
        id: i64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pau=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            match serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                Ok(out) => println!("{}", out),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&get_config_path())?;

    // Pure clock query, no database needed
    if let Commands::Now { at } = &cli.command {
        let status = match at {
            Some(raw) => {
                let instant = DateTime::parse_from_rfc3339(raw)
                    .map_err(|_| AppError::InvalidTimestamp(raw.clone()))?;
                BlockStatus::at(config.timetable, &instant)
            }
            None => BlockStatus::at(config.timetable, &Utc::now()),
        };
        return print_block(&status, cli.json);
    }

    let rating = match &cli.command {
        Commands::Review { rating, .. } => Some(rating.parse::<Rating>()?),
        _ => None,
    };

    let today = cli.today.unwrap_or_else(madrid_today);
    let profile = cli.profile.clone().unwrap_or_else(|| config.profile.clone());
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;
    let session = Session::open(db, &config, &profile, today)?;

    match cli.command {
        Commands::Init => {
            if cli.json {
                print_json(serde_json::json!({
                    "db_path": db_path,
                    "profile": session.profile.name,
                    "seeded": session.seeded
                }))?;
            } else {
                println!("Database initialized at: {}", db_path.display());
                println!("Profile: {}", session.profile.name);
                if session.seeded > 0 {
                    println!("Seeded {} topics from the default syllabus.", session.seeded);
                }
            }
        }

        Commands::Topic(topic_cmd) => run_topic(&session, topic_cmd, cli.json)?,

        Commands::Due => {
            let due = session.due()?;
            if cli.json {
                print_json(&due)?;
            } else if due.is_empty() {
                println!("Nothing due for {}.", session.today);
            } else {
                println!("=== Due on {} ({}) ===", session.today, due.len());
                print_topic_table(&due, session.today);
            }
        }

        Commands::Next => {
            if let Some(topic) = session.next()? {
                if cli.json {
                    print_json(&topic)?;
                } else {
                    println!("=== Next Topic to Review ===");
                    println!();
                    println!(
                        "{} {} / {} (ID: {})",
                        syllabus::icon_for(&topic.subject),
                        topic.subject,
                        topic.name,
                        topic.id
                    );
                    println!(
                        "Current mastery: {} (level {})",
                        topic.mastery_label(),
                        topic.level
                    );
                    if let Some(err) = &topic.last_error {
                        println!("Last mistake: {}", err);
                    }
                    println!();
                    println!("After review, record the result with:");
                    println!("  pau review {} --rating <ok|mid|bad>", topic.id);
                }
            } else if cli.json {
                print_json(())?;
            } else {
                println!("Nothing due. Unlock topics with `pau topic unlock <id>`.");
            }
        }

        Commands::Review { id, .. } => {
            let Some(rating) = rating else {
                return Ok(());
            };
            let outcome = session.review(id, rating)?;

            if cli.json {
                print_json(&outcome)?;
            } else {
                println!(
                    "Reviewed '{}' as {}.",
                    outcome.topic.name,
                    outcome.rating.label()
                );
                println!(
                    "Level: {} -> {} ({})",
                    outcome.level_before,
                    outcome.topic.level,
                    outcome.topic.mastery_label()
                );
                println!(
                    "Next review: {} (in {} days)",
                    outcome.topic.next_review, outcome.interval_days
                );
            }
        }

        Commands::Now { .. } => {}

        Commands::Stats => {
            let stats = session.stats()?;
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("=== Study Statistics ({}) ===", session.profile.name);
                println!("Total topics: {}", stats.total_topics);
                println!("Unlocked: {}", stats.unlocked);
                println!("Mastered (level 4+): {}", stats.mastered);
                println!("Due for review: {}", stats.due_now);
                println!("Total reviews: {}", stats.total_reviews);
                println!("Overall mastery: {}%", stats.mastery_percent);
                println!();
                for s in &stats.subjects {
                    println!(
                        "{} {:<24} {:>3}/{:<3} {:>3}%",
                        syllabus::icon_for(&s.subject),
                        truncate(&s.subject, 24),
                        s.unlocked,
                        s.total,
                        s.unlocked_percent
                    );
                }
            }
        }

        Commands::Note(note_cmd) => match note_cmd {
            NoteCommands::Add { text } => {
                let id = session.add_note(&text)?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "text": text }))?;
                } else {
                    println!("Added note {}.", id);
                }
            }

            NoteCommands::List => {
                let notes = session.notes()?;
                if cli.json {
                    print_json(&notes)?;
                } else if notes.is_empty() {
                    println!("No notes.");
                } else {
                    for note in notes {
                        println!("[{}] {}", note.id, note.text);
                    }
                }
            }

            NoteCommands::Delete { id } => {
                session.delete_note(id)?;
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Note {} deleted.", id);
                }
            }
        },

        Commands::Reset => {
            let inserted = session.reset()?;
            if cli.json {
                print_json(serde_json::json!({ "seeded": inserted }))?;
            } else {
                println!(
                    "Profile '{}' reset: {} topics reseeded, notes cleared.",
                    session.profile.name, inserted
                );
            }
        }

        Commands::Tui => {
            tui::run(session, cli.today.is_some())?;
        }
    }

    Ok(())
}

fn run_topic(session: &Session, cmd: TopicCommands, json: bool) -> Result<()> {
    match cmd {
        TopicCommands::List { subject, unlocked } => {
            let topics: Vec<Topic> = session
                .topics(subject.as_deref())?
                .into_iter()
                .filter(|t| !unlocked || t.unlocked)
                .collect();

            if json {
                print_json(&topics)?;
            } else if topics.is_empty() {
                println!("No topics found.");
            } else {
                print_topic_table(&topics, session.today);
            }
        }

        TopicCommands::Show { id } => {
            let topic = session.topic(id)?;
            let history = session.history(id)?;

            if json {
                print_json(serde_json::json!({
                    "topic": topic,
                    "history": history
                }))?;
            } else {
                println!("Topic: {}", topic.name);
                println!("ID: {}", topic.id);
                println!(
                    "Subject: {} {} ({})",
                    syllabus::icon_for(&topic.subject),
                    topic.subject,
                    topic.category.as_str()
                );
                println!("Unlocked: {}", if topic.unlocked { "yes" } else { "no" });
                println!("Mastery: {} (level {})", topic.mastery_label(), topic.level);
                println!("Next review: {}", topic.next_review);
                if let Some(last) = topic.last_review {
                    println!("Last reviewed: {}", last);
                }
                if topic.extra_queue {
                    println!("Flagged for extra review");
                }
                if let Some(err) = &topic.last_error {
                    println!("Last mistake: {}", err);
                }

                if !history.is_empty() {
                    println!();
                    println!("--- History ---");
                    for h in history {
                        println!(
                            "{}  {:<8} {} -> {}  next {}",
                            h.reviewed_at.chars().take(10).collect::<String>(),
                            h.rating.label(),
                            h.level_before,
                            h.level_after,
                            h.next_review
                        );
                    }
                }
            }
        }

        TopicCommands::Add {
            subject,
            name,
            category,
        } => {
            let category = Category::from_str(&category)
                .ok_or_else(|| AppError::InvalidCategory(category.clone()))?;
            let topic = session.add_topic(&subject, &name, category)?;

            if json {
                print_json(&topic)?;
            } else {
                println!("Added topic '{}' to {} with ID: {}", name, subject, topic.id);
            }
        }

        TopicCommands::Remove { id } => {
            session.remove_topic(id)?;
            if json {
                print_json(())?;
            } else {
                println!("Topic {} removed.", id);
            }
        }

        TopicCommands::Unlock { id } => {
            let topic = session.set_unlocked(id, true)?;
            report_topic(&topic, json, "unlocked, due today")?;
        }

        TopicCommands::Lock { id } => {
            let topic = session.set_unlocked(id, false)?;
            report_topic(&topic, json, "locked")?;
        }

        TopicCommands::Flag { id } => {
            let topic = session.set_flagged(id, true)?;
            report_topic(&topic, json, "added to today's extra queue")?;
        }

        TopicCommands::Unflag { id } => {
            let topic = session.set_flagged(id, false)?;
            report_topic(&topic, json, "removed from the extra queue")?;
        }

        TopicCommands::Error { id, text } => {
            let topic = session.set_error(id, Some(&text))?;
            let action = match topic.last_error {
                Some(_) => "mistake recorded",
                None => "mistake cleared",
            };
            report_topic(&topic, json, action)?;
        }

        TopicCommands::ClearError { id } => {
            let topic = session.set_error(id, None)?;
            report_topic(&topic, json, "mistake cleared")?;
        }
    }

    Ok(())
}

fn report_topic(topic: &Topic, json: bool, what: &str) -> Result<()> {
    if json {
        print_json(topic)
    } else {
        println!("Topic {} '{}': {}.", topic.id, topic.name, what);
        Ok(())
    }
}

fn print_block(status: &BlockStatus, json: bool) -> Result<()> {
    if json {
        return print_json(status);
    }

    println!("{}  [{}]", status.local_time, status.timetable);
    println!("Block: {}", status.label);
    if status.kind.is_free() {
        println!("No study block scheduled (remaining {})", status.countdown);
        return Ok(());
    }
    if let Some(focus) = status.focus {
        println!("Focus: {}", focus);
    }
    if let Some(end) = status.end_time {
        println!("Ends at {} (remaining {})", end, status.countdown);
    }
    Ok(())
}

fn print_topic_table(topics: &[Topic], today: NaiveDate) {
    println!(
        "{:<5} {:<20} {:<40} {:<4} {:<11} FLAGS",
        "ID", "SUBJECT", "NAME", "LVL", "NEXT"
    );
    println!("{}", "-".repeat(90));
    for topic in topics {
        let mut flags = String::new();
        if !topic.unlocked {
            flags.push('L');
        }
        if topic.extra_queue {
            flags.push('!');
        }
        if topic.is_due(today) {
            flags.push('*');
        }
        println!(
            "{:<5} {:<20} {:<40} {:<4} {:<11} {}",
            topic.id,
            truncate(&topic.subject, 18),
            truncate(&topic.name, 38),
            topic.level,
            topic.next_review.to_string(),
            flags
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
