mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::db::Stats;
use crate::error::{AppError, Result};
use crate::models::{Note, Rating, Topic};
use crate::scheduler::SchedulerKind;
use crate::session::{madrid_today, BlockStatus, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Syllabus,
    Notes,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Syllabus,
            View::Syllabus => View::Notes,
            View::Notes => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Notes,
            View::Syllabus => View::Dashboard,
            View::Notes => View::Syllabus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a new note
    Note,
    /// Typing the last mistake for the selected topic
    Mistake,
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    /// Swap in fresh items, keeping the cursor where it was when possible.
    fn replace(&mut self, items: Vec<T>) {
        self.selected = match (self.selected, items.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.items = items;
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    session: Session,
    pin_today: bool,
    pub view: View,
    pub due: StatefulList<Topic>,
    pub topics: StatefulList<Topic>,
    pub notes: StatefulList<Note>,
    pub stats: Stats,
    pub input: String,
    pub input_mode: InputMode,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: Session, pin_today: bool) -> Result<Self> {
        let stats = session.stats()?;
        let due = session.due()?;
        let topics = session.topics(None)?;
        let notes = session.notes()?;

        Ok(Self {
            session,
            pin_today,
            view: View::Dashboard,
            due: StatefulList::with_items(due),
            topics: StatefulList::with_items(topics),
            notes: StatefulList::with_items(notes),
            stats,
            input: String::new(),
            input_mode: InputMode::Normal,
            status: None,
            should_quit: false,
        })
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        self.stats = self.session.stats()?;
        self.due.replace(self.session.due()?);
        self.topics.replace(self.session.topics(None)?);
        self.notes.replace(self.session.notes()?);
        Ok(())
    }

    pub fn profile_name(&self) -> &str {
        &self.session.profile.name
    }

    pub fn scheduler(&self) -> SchedulerKind {
        self.session.scheduler
    }

    pub fn today(&self) -> chrono::NaiveDate {
        self.session.today
    }

    /// Recomputed on every frame from the wall clock.
    pub fn block_status(&self) -> BlockStatus {
        self.session.block_at(&Utc::now())
    }

    /// Follow the Madrid date across midnight unless it was pinned.
    fn tick(&mut self) -> Result<()> {
        if self.pin_today {
            return Ok(());
        }
        let today = madrid_today();
        if today != self.session.today {
            debug!(%today, "day rolled over");
            self.session.today = today;
            self.refresh_data()?;
        }
        Ok(())
    }

    /// Scheduler rejections are shown in the status bar; anything else aborts.
    fn report(&mut self, result: Result<String>) -> Result<()> {
        match result {
            Ok(msg) => self.status = Some(msg),
            Err(AppError::Schedule(e)) => self.status = Some(e.to_string()),
            Err(e) => return Err(e),
        }
        self.refresh_data()
    }

    fn rate_selected(&mut self, rating: Rating) -> Result<()> {
        let Some(id) = self.due.selected_item().map(|t| t.id) else {
            return Ok(());
        };
        let result = self.session.review(id, rating).map(|outcome| {
            format!(
                "{}: {} -> level {}, next {}",
                outcome.topic.name,
                rating.label(),
                outcome.topic.level,
                outcome.topic.next_review
            )
        });
        self.report(result)
    }

    fn toggle_unlock_selected(&mut self) -> Result<()> {
        let Some(id) = self.topics.selected_item().map(|t| t.id) else {
            return Ok(());
        };
        let result = self.session.toggle_unlocked(id).map(|t| {
            format!(
                "{} {}",
                t.name,
                if t.unlocked { "unlocked" } else { "locked" }
            )
        });
        self.report(result)
    }

    fn toggle_flag_selected(&mut self) -> Result<()> {
        let Some((id, flagged)) = self
            .topics
            .selected_item()
            .map(|t| (t.id, t.extra_queue))
        else {
            return Ok(());
        };
        let result = self.session.set_flagged(id, !flagged).map(|t| {
            format!(
                "{} {}",
                t.name,
                if t.extra_queue {
                    "added to extra queue"
                } else {
                    "removed from extra queue"
                }
            )
        });
        self.report(result)
    }

    fn delete_selected_note(&mut self) -> Result<()> {
        let Some(id) = self.notes.selected_item().map(|n| n.id) else {
            return Ok(());
        };
        let result = self
            .session
            .delete_note(id)
            .map(|_| format!("Note {} deleted", id));
        self.report(result)
    }

    fn submit_input(&mut self) -> Result<()> {
        let text = self.input.trim().to_string();
        self.input.clear();
        let mode = std::mem::replace(&mut self.input_mode, InputMode::Normal);

        match mode {
            InputMode::Note if !text.is_empty() => {
                let result = self
                    .session
                    .add_note(&text)
                    .map(|id| format!("Note {} added", id));
                self.report(result)
            }
            InputMode::Mistake => {
                let Some(id) = self.topics.selected_item().map(|t| t.id) else {
                    return Ok(());
                };
                let result = self
                    .session
                    .set_error(id, Some(&text))
                    .map(|t| match &t.last_error {
                        Some(_) => format!("Mistake recorded for {}", t.name),
                        None => format!("Mistake cleared for {}", t.name),
                    });
                self.report(result)
            }
            _ => Ok(()),
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if self.input_mode != InputMode::Normal {
            match key {
                KeyCode::Esc => {
                    self.input_mode = InputMode::Normal;
                    self.input.clear();
                }
                KeyCode::Enter => self.submit_input()?,
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => self.input.push(c),
                _ => {}
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            // Navigation between views: h/l (left/right like vim)
            KeyCode::Char('h') | KeyCode::Left => self.view = self.view.prev(),
            KeyCode::Char('l') | KeyCode::Right => self.view = self.view.next(),
            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => self.view = self.view.prev(),

            // List navigation: j/k (vim up/down)
            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Dashboard => self.due.next(),
                View::Syllabus => self.topics.next(),
                View::Notes => self.notes.next(),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Dashboard => self.due.previous(),
                View::Syllabus => self.topics.previous(),
                View::Notes => self.notes.previous(),
            },
            KeyCode::Char('g') => match self.view {
                View::Dashboard => self.due.first(),
                View::Syllabus => self.topics.first(),
                View::Notes => self.notes.first(),
            },
            KeyCode::Char('G') => match self.view {
                View::Dashboard => self.due.last(),
                View::Syllabus => self.topics.last(),
                View::Notes => self.notes.last(),
            },

            // Self-rating on the due list
            KeyCode::Char('o') if self.view == View::Dashboard => {
                self.rate_selected(Rating::Ok)?
            }
            KeyCode::Char('m') if self.view == View::Dashboard => {
                self.rate_selected(Rating::Mid)?
            }
            KeyCode::Char('b') if self.view == View::Dashboard => {
                self.rate_selected(Rating::Bad)?
            }

            KeyCode::Char(' ') | KeyCode::Char('u') if self.view == View::Syllabus => {
                self.toggle_unlock_selected()?
            }
            KeyCode::Char('f') if self.view == View::Syllabus => self.toggle_flag_selected()?,
            KeyCode::Char('e') if self.view == View::Syllabus => {
                if self.topics.selected_item().is_some() {
                    self.input_mode = InputMode::Mistake;
                    self.input.clear();
                }
            }

            KeyCode::Char('a') if self.view == View::Notes => {
                self.input_mode = InputMode::Note;
                self.input.clear();
            }
            KeyCode::Char('d') if self.view == View::Notes => self.delete_selected_note()?,

            KeyCode::Esc => self.status = None,

            _ => {}
        }
        Ok(())
    }
}

pub fn run(session: Session, pin_today: bool) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(session, pin_today).and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick()?;
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use chrono::NaiveDate;

    fn setup_app(config: Config) -> App {
        let db = Database::open(":memory:").unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let session = Session::open(db, &config, "tui", today).unwrap();
        App::new(session, true).unwrap()
    }

    fn press(app: &mut App, c: char) {
        app.handle_key(KeyCode::Char(c), KeyModifiers::NONE).unwrap();
    }

    #[test]
    fn views_cycle_both_ways() {
        let mut app = setup_app(Config::default());
        press(&mut app, 'l');
        assert_eq!(app.view, View::Syllabus);
        press(&mut app, 'l');
        assert_eq!(app.view, View::Notes);
        press(&mut app, 'l');
        assert_eq!(app.view, View::Dashboard);
        press(&mut app, 'h');
        assert_eq!(app.view, View::Notes);
    }

    #[test]
    fn unlock_then_review_from_dashboard() {
        let mut app = setup_app(Config::default());
        assert!(app.due.items.is_empty());

        press(&mut app, 'l');
        press(&mut app, ' ');
        assert!(app.topics.items[0].unlocked);
        assert_eq!(app.due.items.len(), 1);

        press(&mut app, 'h');
        press(&mut app, 'o');
        assert!(app.due.items.is_empty());
        assert_eq!(app.topics.items[0].level, 1);
        assert_eq!(app.stats.total_reviews, 1);
    }

    #[test]
    fn ladder_mid_is_reported_not_fatal() {
        let config = Config {
            scheduler: SchedulerKind::Ladder,
            ..Config::default()
        };
        let mut app = setup_app(config);
        press(&mut app, 'l');
        press(&mut app, 'u');
        press(&mut app, 'h');

        press(&mut app, 'm');
        assert!(app.status.as_deref().unwrap().contains("not supported"));
        assert_eq!(app.due.items.len(), 1);
    }

    #[test]
    fn mistake_input_records_and_clears() {
        let mut app = setup_app(Config::default());
        press(&mut app, 'l');
        press(&mut app, 'j');
        press(&mut app, 'e');
        assert_eq!(app.input_mode, InputMode::Mistake);
        for c in "signo".chars() {
            press(&mut app, c);
        }
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.topics.items[1].last_error.as_deref(), Some("signo"));

        press(&mut app, 'e');
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE).unwrap();
        assert!(app.topics.items[1].last_error.is_none());
    }

    #[test]
    fn notes_add_and_delete() {
        let mut app = setup_app(Config::default());
        app.handle_key(KeyCode::BackTab, KeyModifiers::NONE).unwrap();
        assert_eq!(app.view, View::Notes);

        press(&mut app, 'a');
        // 'q' while typing is text, not quit
        for c in "quiz".chars() {
            press(&mut app, c);
        }
        assert!(!app.should_quit);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE).unwrap();
        assert_eq!(app.notes.items.len(), 1);
        assert_eq!(app.notes.items[0].text, "quiz");

        press(&mut app, 'd');
        assert!(app.notes.items.is_empty());
    }

    #[test]
    fn stateful_list_replace_keeps_cursor_in_bounds() {
        let mut list = StatefulList::with_items(vec![1, 2, 3]);
        list.last();
        list.replace(vec![1]);
        assert_eq!(list.selected, Some(0));
        list.replace(vec![]);
        assert_eq!(list.selected, None);
        list.replace(vec![4, 5]);
        assert_eq!(list.selected, Some(0));
    }
}
