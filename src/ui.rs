use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ChatRole, InputMode};
use crate::markdown::render_markdown;
use crate::theme::theme;
use crate::toast::ToastPhase;

const CARDS_PER_ROW: u16 = 3;
const CARD_HEIGHT: u16 = 7;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_cards(app, frame, body_area);
    render_footer(app, frame, footer_area);

    // Overlays, back to front: chat widget, toast, tooltip
    if app.chat_open {
        render_chat(app, frame, area);
    }
    render_toast(app, frame, area);
    render_tooltip(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let activity = if app.pending.is_empty() {
        String::new()
    } else {
        format!(" [{} request(s) in flight]", app.pending.len())
    };

    let title = Line::from(vec![
        Span::styled(
            " NetRouter AI — Network Troubleshooting ",
            Style::default().fg(theme().accent).bold(),
        ),
        Span::styled(activity, Style::default().fg(theme().muted)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(theme().muted),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(theme().muted));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints: Vec<Span> = if !app.chat_open {
        vec![
            Span::styled(" 💬 c ", Style::default().fg(theme().accent).bold()),
            Span::raw("open chat  "),
            Span::styled("r ", Style::default().fg(theme().accent).bold()),
            Span::raw("refresh  "),
            Span::styled("q ", Style::default().fg(theme().accent).bold()),
            Span::raw("quit"),
        ]
    } else if app.input_mode == InputMode::Editing {
        vec![
            Span::styled(" Enter ", Style::default().fg(theme().accent).bold()),
            Span::raw("send  "),
            Span::styled("Esc ", Style::default().fg(theme().accent).bold()),
            Span::raw("keys"),
        ]
    } else {
        vec![
            Span::styled(" i ", Style::default().fg(theme().accent).bold()),
            Span::raw("write  "),
            Span::styled("y ", Style::default().fg(theme().accent).bold()),
            Span::raw("copy reply  "),
            Span::styled("L ", Style::default().fg(theme().accent).bold()),
            Span::raw("clear  "),
            Span::styled("j/k ", Style::default().fg(theme().accent).bold()),
            Span::raw("scroll  "),
            Span::styled("Esc ", Style::default().fg(theme().accent).bold()),
            Span::raw("close"),
        ]
    };

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().fg(ratatui::style::Color::Gray));
    frame.render_widget(footer, area);
}

/// Dashboard cards in a grid, revealed one by one by the tick-driven
/// stagger. Hidden cards keep their slot but draw nothing, so the layout
/// does not shift as they appear.
fn render_cards(app: &mut App, frame: &mut Frame, area: Rect) {
    app.card_areas.clear();

    if app.cards.is_empty() {
        let placeholder = Paragraph::new("Loading dashboard...")
            .style(Style::default().fg(theme().muted))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(placeholder, area);
        return;
    }

    let rows = (app.cards.len() as u16).div_ceil(CARDS_PER_ROW);
    let row_constraints: Vec<Constraint> = (0..rows)
        .map(|_| Constraint::Length(CARD_HEIGHT))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let row_areas = Layout::vertical(row_constraints).split(area);

    for (i, card) in app.cards.iter().enumerate() {
        let row = i as u16 / CARDS_PER_ROW;
        let col = i as u16 % CARDS_PER_ROW;
        let row_area = row_areas[row as usize];
        if row_area.height == 0 {
            app.card_areas.push(Rect::default());
            continue;
        }

        let col_areas = Layout::horizontal([
            Constraint::Ratio(1, CARDS_PER_ROW as u32),
            Constraint::Ratio(1, CARDS_PER_ROW as u32),
            Constraint::Ratio(1, CARDS_PER_ROW as u32),
        ])
        .split(row_area);
        let card_area = col_areas[col as usize];

        if i >= app.revealed_cards {
            // Not revealed yet: invisible, and not a tooltip target
            app.card_areas.push(Rect::default());
            continue;
        }
        app.card_areas.push(card_area);

        let just_revealed = app.reveal_in_progress() && i + 1 == app.revealed_cards;
        let border_color = if just_revealed {
            theme().card_revealed
        } else {
            theme().card_border
        };

        let mut lines: Vec<Line> = vec![Line::from(Span::styled(
            card.title.clone(),
            Style::default().fg(theme().accent).add_modifier(Modifier::BOLD),
        ))];
        for text in &card.lines {
            lines.push(Line::from(text.clone()));
        }

        let widget = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border_color)),
            );
        frame.render_widget(widget, card_area);
    }
}

/// The floating chat widget: transcript on top, input at the bottom.
fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_area = centered_rect(area, 60, 75);
    frame.render_widget(Clear, chat_area);

    let [transcript_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(chat_area);

    // Store transcript dimensions for scroll calculations (inner size minus borders)
    app.chat_height = transcript_area.height.saturating_sub(2);
    app.chat_width = transcript_area.width.saturating_sub(2);

    let transcript_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme().accent))
        .title(" NetRouter AI Assistant ");

    let transcript = if app.chat_messages.is_empty() && app.pending.is_empty() {
        Text::from(Span::styled(
            "Ask anything about your network...",
            Style::default().fg(theme().muted),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.chat_messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled("You:", theme().user)));
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                    lines.push(Line::default());
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled("AI:", theme().assistant)));
                    lines.extend(render_markdown(&msg.content).lines);
                    lines.push(Line::default());
                }
                ChatRole::Pending => {
                    lines.push(Line::from(Span::styled("AI:", theme().assistant)));
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat(app.ellipsis_frame() + 1);
                    lines.push(Line::from(Span::styled(
                        format!("Thinking{}", dots),
                        theme().pending,
                    )));
                    lines.push(Line::default());
                }
                ChatRole::Error => {
                    for line in msg.content.lines() {
                        lines.push(Line::from(Span::styled(line.to_string(), theme().error)));
                    }
                    lines.push(Line::default());
                }
            }
        }

        Text::from(lines)
    };

    let transcript_widget = Paragraph::new(transcript)
        .block(transcript_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(transcript_widget, transcript_area);

    // Input field, highlighted while editing
    let input_border = if app.input_mode == InputMode::Editing {
        ratatui::style::Color::Yellow
    } else {
        theme().muted
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border))
        .title(" Message ");

    // Horizontal scroll keeps the cursor visible
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.chat_cursor >= inner_width {
        app.chat_cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .chat_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text).block(input_block);
    frame.render_widget(input, input_area);

    if app.input_mode == InputMode::Editing {
        let cursor_x = input_area.x + 1 + (app.chat_cursor - scroll_offset) as u16;
        let cursor_y = input_area.y + 1;
        frame.set_cursor_position(Position::new(cursor_x, cursor_y));
    }
}

/// Top-right toast overlay. Rendering dims during the fade-out phase; the
/// expired toast is dropped by the tick handler.
fn render_toast(app: &App, frame: &mut Frame, area: Rect) {
    let Some(toast) = &app.toast else {
        return;
    };

    let phase = toast.phase(Instant::now());
    if phase == ToastPhase::Expired {
        return;
    }

    let content = format!("{} {}", toast.kind.icon(), toast.message);
    let width = (content.chars().count() as u16 + 4).min(area.width.saturating_sub(2));
    let toast_area = Rect {
        x: area.width.saturating_sub(width + 1),
        y: 1,
        width,
        height: 3,
    };

    let style = if phase == ToastPhase::Fading {
        Style::default()
            .fg(toast.kind.color())
            .add_modifier(Modifier::DIM)
    } else {
        Style::default().fg(toast.kind.color())
    };

    frame.render_widget(Clear, toast_area);
    let widget = Paragraph::new(content).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(style),
    );
    frame.render_widget(widget, toast_area);
}

/// The single tooltip, floated directly above its anchor card and centered
/// on it, clamped to the frame.
fn render_tooltip(app: &App, frame: &mut Frame, area: Rect) {
    let Some(tooltip) = &app.tooltip else {
        return;
    };

    let max_width = area.width.saturating_sub(2).min(44);
    let width = (tooltip.text.chars().count() as u16 + 2).min(max_width);
    if width <= 2 {
        return;
    }
    let inner = width - 2;
    let text_rows = (tooltip.text.chars().count() as u16).div_ceil(inner).max(1);
    let height = text_rows.min(4);

    let anchor = tooltip.anchor;
    let centered_x = (anchor.x + anchor.width / 2).saturating_sub(width / 2);
    let x = centered_x.min(area.width.saturating_sub(width));
    let y = anchor.y.saturating_sub(height);

    let tooltip_area = Rect {
        x,
        y,
        width,
        height,
    };

    frame.render_widget(Clear, tooltip_area);
    let widget = Paragraph::new(tooltip.text.clone())
        .style(theme().tooltip)
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, tooltip_area);
}

/// Centered popup rect sized as a percentage of the frame.
fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}
