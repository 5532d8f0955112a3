use crate::app::{App, SearchResults};
use crate::audio::MediaOutput;
use crate::command::NoticeLevel;
use crate::i18n::{Locale, MessageKey};
use crate::visualiser::{CANVAS_SIZE, Point, Rgb, Shape, VisualFrame};
use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{self, Canvas, Circle};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::time::Duration;

const BG: Color = Color::Rgb(12, 14, 20);
const PANEL_BG: Color = Color::Rgb(20, 24, 32);
const TEXT: Color = Color::Rgb(220, 224, 232);
const MUTED: Color = Color::Rgb(120, 128, 144);
const ACCENT: Color = Color::Rgb(110, 190, 255);
const BORDER: Color = Color::Rgb(60, 70, 90);
const WARN: Color = Color::Rgb(240, 190, 90);
const ALERT: Color = Color::Rgb(240, 100, 100);

pub fn draw(frame: &mut Frame, app: &App, output: &dyn MediaOutput) {
    let locale = app.locale();
    frame.render_widget(
        Block::default().style(Style::default().bg(BG)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            locale.text(MessageKey::WindowTitle),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(output.output_name(), Style::default().fg(TEXT)),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(locale.code(), Style::default().fg(MUTED)),
    ]))
    .block(panel_block(" ", PANEL_BG));
    frame.render_widget(header, vertical[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[1]);

    draw_visualiser(frame, body[0], app, locale);
    match &app.search {
        Some(results) => draw_search_results(frame, body[1], results, locale),
        None => draw_playlist(frame, body[1], app, locale),
    }

    let timeline = Paragraph::new(timeline_line(
        app.progress.position,
        app.progress.duration,
        vertical[2].width.saturating_sub(20) as usize,
    ))
    .style(Style::default().fg(TEXT))
    .block(panel_block("", PANEL_BG));
    frame.render_widget(timeline, vertical[2]);

    let controls = Paragraph::new(controls_line(app, output, locale))
        .block(panel_block("", PANEL_BG));
    frame.render_widget(controls, vertical[3]);

    frame.render_widget(Paragraph::new(status_line(app, locale)), vertical[4]);
}

fn draw_visualiser(frame: &mut Frame, area: Rect, app: &App, locale: Locale) {
    let block = panel_block(locale.text(MessageKey::Visualisation), BG);
    let Some(visual) = app.frame.as_ref().filter(|_| app.visualiser.is_running()) else {
        frame.render_widget(block, area);
        return;
    };

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .background_color(BG)
        .x_bounds([0.0, CANVAS_SIZE])
        .y_bounds([0.0, CANVAS_SIZE])
        .paint(|ctx| paint_frame(ctx, visual));
    frame.render_widget(canvas, area);
}

fn paint_frame(ctx: &mut canvas::Context, visual: &VisualFrame) {
    for shape in &visual.shapes {
        let color = to_color(shape.color());
        match shape {
            Shape::Polygon { points, .. } => {
                for (index, from) in points.iter().enumerate() {
                    let to = points[(index + 1) % points.len()];
                    draw_segment(ctx, *from, to, color);
                }
            }
            Shape::Circle { center, radius, .. } => ctx.draw(&Circle {
                x: center.x,
                y: flip(center.y),
                radius: *radius,
                color,
            }),
            Shape::Line { from, to, .. } => draw_segment(ctx, *from, *to, color),
        }
    }
}

fn draw_segment(ctx: &mut canvas::Context, from: Point, to: Point, color: Color) {
    ctx.draw(&canvas::Line {
        x1: from.x,
        y1: flip(from.y),
        x2: to.x,
        y2: flip(to.y),
        color,
    });
}

// Shapes use image coordinates with y growing downwards.
fn flip(y: f64) -> f64 {
    CANVAS_SIZE - y
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn draw_playlist(frame: &mut Frame, area: Rect, app: &App, locale: Locale) {
    let playlist = app.sequencer.playlist();
    let items: Vec<ListItem> = playlist
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let marker = if app.sequencer.cursor() == Some(index) && app.sequencer.is_playing() {
                "> "
            } else {
                "  "
            };
            let style = if track.is_stream() {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(TEXT)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(MUTED)),
                Span::styled(track.display_name(), style),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(app.sequencer.cursor());

    let title = format!(
        "{} ({})",
        locale.text(MessageKey::PlaylistTitle),
        playlist.len()
    );
    let list = List::new(items)
        .block(panel_block(&title, PANEL_BG))
        .highlight_style(
            Style::default()
                .bg(BORDER)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_search_results(frame: &mut Frame, area: Rect, results: &SearchResults, locale: Locale) {
    let items: Vec<ListItem> = results
        .hits
        .iter()
        .map(|hit| {
            let mut spans = vec![Span::styled(hit.title.clone(), Style::default().fg(TEXT))];
            if !hit.artist.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", hit.artist),
                    Style::default().fg(MUTED),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(results.selected));

    let title = format!(
        "{} ({})",
        locale.text(MessageKey::SearchResultsTitle),
        results.service
    );
    let list = List::new(items)
        .block(panel_block(&title, PANEL_BG))
        .highlight_style(Style::default().bg(BORDER).fg(Color::White))
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn controls_line(app: &App, output: &dyn MediaOutput, locale: Locale) -> Line<'static> {
    let transport = if output.is_playing() {
        MessageKey::Pause
    } else {
        MessageKey::Play
    };
    let toggle = |key: MessageKey, on: bool| {
        let style = if on {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        Span::styled(format!("{} ", locale.text(key)), style)
    };
    let label = |hint: &str, key: MessageKey| {
        Span::styled(
            format!("[{hint}] {}  ", locale.text(key)),
            Style::default().fg(TEXT),
        )
    };

    Line::from(vec![
        label("space", transport),
        label("p", MessageKey::Previous),
        label("n", MessageKey::Next),
        label("o", MessageKey::OpenFiles),
        label("S", MessageKey::ShufflePlaylist),
        Span::styled("[s] ", Style::default().fg(TEXT)),
        toggle(MessageKey::Shuffle, app.sequencer.shuffle()),
        Span::styled("[r] ", Style::default().fg(TEXT)),
        toggle(MessageKey::Repeat, app.sequencer.repeat()),
        Span::styled(
            format!(" {} {:>3}%", locale.text(MessageKey::Volume), output.volume()),
            Style::default().fg(TEXT),
        ),
    ])
}

fn status_line(app: &App, locale: Locale) -> Line<'static> {
    if let Some(prompt) = app.prompt {
        return Line::from(vec![
            Span::styled(
                format!("{} ", locale.text(prompt.label())),
                Style::default().fg(ACCENT),
            ),
            Span::styled(format!("{}_", app.input), Style::default().fg(TEXT)),
        ]);
    }

    let Some(notice) = &app.notice else {
        return Line::from(Span::styled(
            "1 SoundCloud  2 Spotify  3 YouTube  !@# search  v mode  l lang  q quit",
            Style::default().fg(MUTED),
        ));
    };
    let color = match notice.level {
        NoticeLevel::Info => TEXT,
        NoticeLevel::Warning => WARN,
        NoticeLevel::Error => ALERT,
    };
    Line::from(Span::styled(notice.render(locale), Style::default().fg(color)))
}

fn panel_block(title: &str, bg: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(bg))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(position: Duration, duration: Option<Duration>, bar_width: usize) -> String {
    let ratio = duration.and_then(|total| {
        let total_secs = total.as_secs_f64();
        (total_secs > 0.0).then_some((position.as_secs_f64() / total_secs).clamp(0.0, 1.0))
    });
    format!(
        "{} / {} {}",
        format_duration(position),
        duration
            .map(format_duration)
            .unwrap_or_else(|| String::from("--:--")),
        progress_bar(ratio, bar_width)
    )
}
