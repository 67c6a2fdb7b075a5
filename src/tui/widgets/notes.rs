use chrono::DateTime;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .notes
        .items
        .iter()
        .map(|note| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", format_date(&note.created_at)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(note.text.as_str(), Style::default().fg(Color::White)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Notes ({}) ", app.notes.items.len()))
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.notes.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}
