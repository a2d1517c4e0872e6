use crate::surface::app::SurfaceApp;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use std::time::Instant;

const KEY_HINTS: &str = " m mic  v camera  s share  c chat  a/r admit/reject  q leave";

pub fn draw(f: &mut Frame, app: &SurfaceApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Stage
            Constraint::Length(1), // Separator
            Constraint::Length(1), // Key hints
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_stage(f, app, chunks[1]);
    f.render_widget(Span::raw("─".repeat(chunks[2].width as usize)), chunks[2]);
    f.render_widget(
        Paragraph::new(Span::styled(KEY_HINTS, Style::default().fg(Color::DarkGray))),
        chunks[3],
    );

    draw_notifications(f, app);
}

fn draw_header(f: &mut Frame, app: &SurfaceApp, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("VideoMeet")
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut spans = vec![
        Span::styled(
            format!("#{}", app.room_id),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(app.display_name.clone()),
        Span::raw("  "),
    ];

    if app.is_moderator {
        spans.push(Span::styled(
            "[moderator] ",
            Style::default().fg(Color::Black).bg(Color::Green),
        ));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::styled(
        format!("participants: {}", app.session.participant_count),
        Style::default().fg(Color::Cyan),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn indicator(label: &str, on: bool) -> Span<'static> {
    let (text, color) = if on {
        (format!("{} on ", label), Color::Green)
    } else {
        (format!("{} off", label), Color::Red)
    };
    Span::styled(text, Style::default().fg(color))
}

fn draw_stage(f: &mut Frame, app: &SurfaceApp, area: Rect) {
    let phase_style = if app.is_waiting() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Green)
    };

    let mut items = vec![
        ListItem::new(Line::from(vec![
            Span::raw("status: "),
            Span::styled(app.phase_label(), phase_style),
        ])),
        ListItem::new(Line::from(vec![
            indicator("mic", !app.session.audio_muted),
            Span::raw("  "),
            indicator("camera", !app.session.video_muted),
            Span::raw("  "),
            indicator("screen share", app.session.screen_sharing),
        ])),
    ];

    if !app.session.knocking.is_empty() {
        items.push(ListItem::new(""));
        items.push(ListItem::new(Span::styled(
            "Waiting in lobby:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for guest in &app.session.knocking {
            items.push(ListItem::new(format!("  {} ({})", guest.name, guest.id)));
        }
    }

    let list = List::new(items).block(Block::default().borders(Borders::NONE));
    f.render_widget(list, area);
}

fn draw_notifications(f: &mut Frame, app: &SurfaceApp) {
    let now = Instant::now();
    let notifications: Vec<_> = app
        .notifications
        .iter()
        .filter(|n| now.duration_since(n.timestamp) < n.duration)
        .collect();

    if notifications.is_empty() {
        return;
    }

    let max_width = f.area().width.saturating_sub(4);
    let mut current_y = f.area().height.saturating_sub(3);

    for notification in notifications.iter().rev() {
        let message: String = format!(" {}", notification.message)
            .chars()
            .take(max_width as usize)
            .collect();
        let width = (message.chars().count() as u16 + 2).min(f.area().width);
        let x = f.area().width.saturating_sub(width).saturating_sub(1);

        let p = Paragraph::new(message).style(Style::default().bg(Color::DarkGray).fg(Color::White));
        f.render_widget(p, Rect::new(x, current_y, width, 1));

        current_y = current_y.saturating_sub(1);
        if current_y <= 3 {
            break;
        }
    }
}
