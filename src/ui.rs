//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! Layout, top to bottom: a header line (mode, notification state, next poll,
//! counts), the scrollable job list, the toast strip and the status bar.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::feed::FeedStats;
use crate::source::JobItem;
use crate::toast::ToastLevel;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let toast_rows = app.toasts.len().min(3) as u16;
    let [header_area, main_area, toast_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(toast_rows),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);
    draw_job_list(app, frame, main_area);
    draw_toasts(app, frame, toast_area);
    draw_status_bar(app, frame, status_area);
}

fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let notifications = if app.awaiting_permission() {
        Span::styled("alerts: asking…", Style::default().fg(Color::Yellow))
    } else if app.notifications_enabled() && app.seen().is_baseline() {
        Span::styled("alerts: on (arming)", Style::default().fg(Color::Green))
    } else if app.notifications_enabled() {
        Span::styled("alerts: on", Style::default().fg(Color::Green))
    } else {
        Span::styled("alerts: off", Style::default().fg(Color::DarkGray))
    };

    let next_poll = match app.scheduler().next_tick() {
        Some(at) => format!("next poll {}", at.format("%H:%M:%S")),
        None => "polling idle".to_string(),
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.mode.label()),
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
        ),
        Span::raw(" "),
        notifications,
        Span::raw("  "),
        Span::styled(next_poll, Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::raw(stats_line(&app.feed.stats())),
    ];
    if app.showing_sample {
        spans.push(Span::styled(
            "  [sample data]",
            Style::default().fg(Color::Red),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn stats_line(stats: &FeedStats) -> String {
    let by_status: Vec<String> = stats
        .by_status
        .iter()
        .map(|(status, n)| format!("{status} {n}"))
        .collect();
    format!(
        "{} jobs · {} assigned · {}",
        stats.total,
        stats.assigned,
        by_status.join(" / ")
    )
}

fn job_line(item: &JobItem) -> Line<'_> {
    let date_str = item
        .posted_on
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "no date".into());

    let mut spans = vec![
        Span::styled(
            format!("{:<18}", date_str),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{:<9}", item.status.as_deref().unwrap_or("New")),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(" "),
        Span::styled(item.display_title(), Style::default().fg(Color::White)),
    ];
    if let Some(amount) = item.amount_label() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(amount, Style::default().fg(Color::Green)));
    }
    if let Some(who) = &item.assigned_to {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("@{who}"),
            Style::default().fg(Color::Cyan),
        ));
    }
    Line::from(spans)
}

/// Render the scrollable job list.
fn draw_job_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .feed
        .items()
        .iter()
        .map(|item| ListItem::new(job_line(item)))
        .collect();

    let title = if app.is_loading() {
        " Jobs (loading…) ".to_string()
    } else {
        " Jobs ".to_string()
    };

    let list = List::new(list_items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Newest toasts last, at most as many as fit.
fn draw_toasts(app: &App, frame: &mut Frame, area: Rect) {
    if area.height == 0 || app.toasts.is_empty() {
        return;
    }
    let skip = app.toasts.len().saturating_sub(area.height as usize);
    let lines: Vec<Line> = app
        .toasts
        .iter()
        .skip(skip)
        .map(|toast| {
            let color = match toast.level {
                ToastLevel::Info => Color::Blue,
                ToastLevel::Success => Color::Green,
                ToastLevel::Warning => Color::Yellow,
                ToastLevel::Error => Color::Red,
            };
            Line::from(Span::styled(
                format!(" • {}", toast.text),
                Style::default().fg(color),
            ))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  q: quit  ↑/↓: scroll  r: refresh  m: mode  n: alerts  s: status  a: assign"),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests (rendering smoke tests)
// ---------------------------------------------------------------------------
