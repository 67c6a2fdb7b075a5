use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, notes, syllabus};
use super::{App, InputMode, View};
use crate::models::Rating;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);
    draw_help_bar(f, app, chunks[3]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Syllabus", "Notes"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Syllabus => 1,
        View::Notes => 2,
    };

    let title = format!(
        " PAU Tracker · {} · {} · {} ",
        app.profile_name(),
        app.today(),
        app.scheduler().as_str()
    );

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Syllabus => syllabus::draw(f, app, area),
        View::Notes => notes::draw(f, app, area),
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(msg) => Line::from(Span::styled(msg.as_str(), Style::default().fg(Color::Yellow))),
        None => Line::from(""),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));

    let help_text = match app.input_mode {
        InputMode::Note | InputMode::Mistake => {
            let prompt = if app.input_mode == InputMode::Note {
                "note> "
            } else {
                "mistake> "
            };
            vec![
                Span::styled(prompt, Style::default().fg(Color::Yellow)),
                Span::raw(&app.input),
                Span::styled("█", Style::default().fg(Color::Yellow)),
                Span::raw(" | "),
                key("<CR>"),
                Span::raw(" Save  "),
                key("<Esc>"),
                Span::raw(" Cancel"),
            ]
        }
        InputMode::Normal => {
            let mut spans = vec![key("h/l"), Span::raw(" Views  "), key("j/k"), Span::raw(" Nav  ")];

            match app.view {
                View::Dashboard => {
                    spans.extend(vec![key("o"), Span::raw(" Easy  ")]);
                    if app.scheduler().supports(Rating::Mid) {
                        spans.extend(vec![key("m"), Span::raw(" Regular  ")]);
                    }
                    spans.extend(vec![key("b"), Span::raw(" Hard  ")]);
                }
                View::Syllabus => {
                    spans.extend(vec![
                        key("<Space>"),
                        Span::raw(" Unlock  "),
                        key("f"),
                        Span::raw(" Flag  "),
                        key("e"),
                        Span::raw(" Mistake  "),
                    ]);
                }
                View::Notes => {
                    spans.extend(vec![
                        key("a"),
                        Span::raw(" Add  "),
                        key("d"),
                        Span::raw(" Delete  "),
                    ]);
                }
            }

            spans.extend(vec![
                key("^r"),
                Span::raw(" Refresh  "),
                key("q"),
                Span::raw(" Quit"),
            ]);
            spans
        }
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
