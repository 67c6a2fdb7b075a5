use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::mastery_bar;
use crate::syllabus::icon_for;
use crate::tui::App;
use crate::truncate;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Topic list
            Constraint::Length(4), // Selected topic detail
        ])
        .split(area);

    draw_list(f, app, chunks[0]);
    draw_detail(f, app, chunks[1]);
}

fn draw_list(f: &mut Frame, app: &App, area: Rect) {
    let today = app.today();

    let items: Vec<ListItem> = app
        .topics
        .items
        .iter()
        .map(|topic| {
            let (lock, lock_color) = if topic.unlocked {
                ("●", Color::Green)
            } else {
                ("○", Color::DarkGray)
            };

            let (next_text, next_color) = if !topic.unlocked {
                ("-".to_string(), Color::DarkGray)
            } else if topic.is_due(today) {
                (format!("{} !", topic.next_review.format("%b %d")), Color::Red)
            } else {
                (topic.next_review.format("%b %d").to_string(), Color::White)
            };

            let mut spans = vec![
                Span::styled(format!("{} ", lock), Style::default().fg(lock_color)),
                Span::raw(format!("{} ", icon_for(&topic.subject))),
                Span::styled(
                    format!("{:<40}", truncate(&topic.name, 38)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(mastery_bar(topic.level), Style::default().fg(Color::Green)),
                Span::styled(
                    format!(" {:<12}", topic.mastery_label()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(next_text, Style::default().fg(next_color)),
            ];
            if topic.extra_queue {
                spans.push(Span::styled(" ⚑", Style::default().fg(Color::Magenta)));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let unlocked = app.topics.items.iter().filter(|t| t.unlocked).count();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Syllabus ({}/{} unlocked) ",
            unlocked,
            app.topics.items.len()
        ))
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.topics.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let text = match app.topics.selected_item() {
        Some(topic) => {
            let last_review = topic
                .last_review
                .map(|d| d.to_string())
                .unwrap_or_else(|| "never".to_string());
            vec![
                Line::from(vec![
                    Span::styled(
                        format!("{} · {}", topic.subject, topic.category.as_str()),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(
                        format!("  last review: {}", last_review),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
                Line::from(vec![
                    Span::styled("Mistake: ", Style::default().fg(Color::Gray)),
                    Span::styled(
                        topic.last_error.as_deref().unwrap_or("-"),
                        Style::default().fg(Color::LightRed),
                    ),
                ]),
            ]
        }
        None => vec![Line::from("No topics")],
    };

    let block = Block::default().borders(Borders::ALL).title(" Detail ");
    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
