use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Gauge, Padding, Paragraph, Row, Table, Wrap,
};

use crate::player::episode::{format_duration, split_latest, strip_html, truncate};
use crate::player::{AudioBridge, AudioResource, PlaybackSession};

use super::{DetailView, LATEST_COUNT, LibraryView};

const ACCENT: Color = Color::Rgb(4, 211, 97);
const MUTED: Color = Color::Rgb(185, 195, 210);

pub(super) fn draw_tui<R: AudioResource>(
    frame: &mut Frame,
    library: &mut LibraryView,
    session: &PlaybackSession,
    bridge: &AudioBridge<R>,
    status: &str,
    detail: Option<&DetailView>,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let today = Local::now().format("%a, %-d %B").to_string();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "PODCASTR",
            Style::default()
                .fg(Color::Rgb(145, 100, 255))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled("The best for listening, always", Style::default().fg(MUTED)),
        Span::styled("   ", Style::default()),
        Span::styled(today, Style::default().fg(Color::Yellow)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Podcastr"));
    frame.render_widget(header, chunks[0]);

    draw_library(frame, chunks[1], library);
    draw_player(frame, chunks[2], session, bridge);

    let controls = Paragraph::new(controls_line(session))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[3]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[4]);

    if let Some(detail) = detail {
        draw_detail(frame, detail);
    }
}

fn draw_library(frame: &mut Frame, area: Rect, library: &mut LibraryView) {
    let (latest, _) = split_latest(&library.episodes, LATEST_COUNT);
    let latest_count = latest.len();
    let rows: Vec<Row> = library
        .episodes
        .iter()
        .enumerate()
        .map(|(idx, episode)| {
            let marker = if idx < latest_count { "NEW" } else { "" };
            Row::new(vec![
                Cell::from(marker).style(Style::default().fg(ACCENT)),
                Cell::from(episode.title.clone()),
                Cell::from(episode.members.clone()),
                Cell::from(episode.published_at.clone()),
                Cell::from(episode.duration_display.clone()),
            ])
        })
        .collect();

    let title = if library.loading {
        "Episodes (loading...)"
    } else {
        "Episodes"
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Percentage(44),
            Constraint::Percentage(28),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["", "Podcast", "Members", "Date", "Duration"]).style(
            Style::default()
                .fg(Color::Rgb(145, 100, 255))
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel_block(title))
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(145, 100, 255))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, area, &mut library.table_state);
}

fn draw_player<R: AudioResource>(
    frame: &mut Frame,
    area: Rect,
    session: &PlaybackSession,
    bridge: &AudioBridge<R>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);

    let Some(episode) = session.current_episode() else {
        let empty = Paragraph::new("Select a podcast to listen to")
            .style(Style::default().fg(MUTED))
            .alignment(Alignment::Center)
            .block(panel_block("Now Playing"));
        frame.render_widget(empty, rows[0]);
        let idle = Gauge::default()
            .block(panel_block("Progress"))
            .gauge_style(Style::default().fg(Color::Rgb(72, 82, 96)))
            .label(format!("{} / {}", format_duration(0), format_duration(0)))
            .ratio(0.0);
        frame.render_widget(idle, rows[1]);
        return;
    };

    let mut spans = vec![
        Span::styled(
            if session.is_playing() { "▶ " } else { "⏸ " },
            Style::default().fg(ACCENT),
        ),
        Span::styled(
            truncate(&episode.title, 60),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", truncate(&episode.members, 40)),
            Style::default().fg(MUTED),
        ),
        Span::styled(
            format!(
                "  [{}/{}]",
                session.current_index() + 1,
                session.queue().len()
            ),
            Style::default().fg(MUTED),
        ),
    ];
    if bridge.is_stalled() {
        spans.push(Span::styled(
            "  stalled",
            Style::default()
                .fg(Color::Rgb(255, 145, 120))
                .add_modifier(Modifier::BOLD),
        ));
    }
    let now_playing = Paragraph::new(Line::from(spans)).block(panel_block("Now Playing"));
    frame.render_widget(now_playing, rows[0]);

    let progress = bridge.progress();
    let ratio = if episode.duration == 0 {
        0.0
    } else {
        (progress as f64 / episode.duration as f64).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .block(panel_block("Progress"))
        .gauge_style(
            Style::default()
                .fg(ACCENT)
                .bg(Color::Rgb(159, 117, 255))
                .add_modifier(Modifier::BOLD),
        )
        .label(format!(
            "{} / {}",
            format_duration(progress),
            episode.duration_display
        ))
        .ratio(ratio);
    frame.render_widget(gauge, rows[1]);
}

fn pill(label: &'static str, active: bool, enabled: bool) -> Span<'static> {
    let style = if !enabled {
        Style::default()
            .bg(Color::Rgb(40, 44, 52))
            .fg(Color::Rgb(95, 100, 110))
    } else if active {
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .bg(Color::Rgb(72, 82, 96))
            .fg(Color::Rgb(230, 235, 242))
    };
    Span::styled(label, style)
}

fn controls_line(session: &PlaybackSession) -> Line<'static> {
    let active = session.is_active();
    Line::from(vec![
        pill(" SHUFFLE ", session.is_shuffling(), active),
        Span::raw(" "),
        pill(" PREV ", false, active && session.has_previous()),
        Span::raw(" "),
        pill(
            if session.is_playing() { " PAUSE " } else { " PLAY " },
            session.is_playing(),
            active,
        ),
        Span::raw(" "),
        pill(" NEXT ", false, active && session.has_next()),
        Span::raw(" "),
        pill(" LOOP ", session.is_looping(), active),
        Span::styled(
            "   Enter queue  p play  space pause  b/n prev/next  ←/→ seek  s shuffle  l loop  i info  r refresh  q quit",
            Style::default().fg(MUTED),
        ),
    ])
}

fn draw_detail(frame: &mut Frame, detail: &DetailView) {
    let (title, text) = match detail {
        DetailView::Loading { id } => ("Episode", format!("Loading {id}...")),
        DetailView::NotFound { id } => (
            "Not Found",
            format!("Episode not found: {id}\n\nPress any key to close."),
        ),
        DetailView::Failed { id, message } => (
            "Episode",
            format!("Could not load {id}:\n{message}\n\nPress any key to close."),
        ),
        DetailView::Ready { episode } => {
            let description = strip_html(&episode.description);
            (
                "Episode",
                format!(
                    "{}\n{}\n{} | {}\n\n{}\n\n[p / Enter] Play   [any key] Close",
                    episode.title,
                    episode.members,
                    episode.published_at,
                    episode.duration_display,
                    truncate(&description, 600)
                ),
            )
        }
    };

    let area = centered_rect(frame.area(), 76, 20);
    frame.render_widget(Clear, area);
    let popup = Paragraph::new(text)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true })
        .block(modal_block(title));
    frame.render_widget(popup, area);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(205, 165, 255))
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2).max(1));
    let height = height.min(area.height.saturating_sub(2).max(1));
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
