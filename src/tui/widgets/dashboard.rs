use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::mastery_bar;
use crate::syllabus::icon_for;
use crate::timetable::BlockKind;
use crate::tui::App;
use crate::truncate;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Clock + Stats row
            Constraint::Length(3), // Overall mastery
            Constraint::Min(0),    // Due list + subjects
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    let bottom_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);

    draw_clock(f, app, top_chunks[0]);
    draw_stats(f, app, top_chunks[1]);
    draw_mastery(f, app, chunks[1]);
    draw_due_topics(f, app, bottom_chunks[0]);
    draw_subjects(f, app, bottom_chunks[1]);
}

fn block_color(kind: BlockKind) -> Color {
    match kind {
        BlockKind::School => Color::Blue,
        BlockKind::Science => Color::Cyan,
        BlockKind::Memory => Color::Magenta,
        BlockKind::Review => Color::Green,
        BlockKind::Gym => Color::LightRed,
        BlockKind::Sleep => Color::DarkGray,
        BlockKind::Mock => Color::Red,
        BlockKind::Free => Color::Gray,
    }
}

fn draw_clock(f: &mut Frame, app: &App, area: Rect) {
    let status = app.block_status();
    let color = block_color(status.kind);

    let mut text = vec![Line::from(vec![Span::styled(
        status.label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )])];
    if status.kind.is_free() {
        text.push(Line::from(Span::styled(
            "No study block scheduled",
            Style::default().fg(Color::Gray),
        )));
    } else {
        text.push(Line::from(vec![
            Span::styled("Remaining: ", Style::default().fg(Color::Gray)),
            Span::styled(
                status.countdown.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
    }
    if let Some(focus) = status.focus {
        text.push(Line::from(vec![
            Span::styled("Focus: ", Style::default().fg(Color::Gray)),
            Span::styled(focus, Style::default().fg(Color::White)),
        ]));
    }
    if let Some(end) = status.end_time {
        text.push(Line::from(vec![
            Span::styled("Ends: ", Style::default().fg(Color::Gray)),
            Span::styled(end.to_string(), Style::default().fg(Color::White)),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} · {} ", status.local_time, status.timetable))
        .title_style(Style::default().fg(color));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;

    let text = vec![
        Line::from(vec![
            Span::styled("Unlocked: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}/{}", stats.unlocked, stats.total_topics),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Mastered: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.mastered),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::styled("Due: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.due_now),
                Style::default().fg(if stats.due_now > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Reviews: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_reviews),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_mastery(f: &mut Frame, app: &App, area: Rect) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Overall Mastery "),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .percent(app.stats.mastery_percent.min(100) as u16);

    f.render_widget(gauge, area);
}

fn draw_due_topics(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .due
        .items
        .iter()
        .map(|topic| {
            let style = if topic.extra_queue {
                Style::default().fg(Color::Magenta)
            } else if topic.level == 0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Yellow)
            };

            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", icon_for(&topic.subject))),
                Span::styled(format!("{:<32}", truncate(&topic.name, 30)), style),
                Span::styled(mastery_bar(topic.level), Style::default().fg(Color::Green)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Due Today ({}) ", app.due.items.len()))
        .title_style(Style::default().fg(Color::Yellow));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.due.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_subjects(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .stats
        .subjects
        .iter()
        .map(|s| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", icon_for(&s.subject))),
                Span::styled(
                    format!("{:<20}", truncate(&s.subject, 18)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>3}%", s.unlocked_percent),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Subjects ")
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
