use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Notice, NoticeLevel};
use super::markdown::parse_markdown;
use crate::constants::UI_SIDEBAR_PERCENT;
use crate::models::{ChatMessage, MessageRole};
use crate::session::ResponseMode;

const COMMANDS: &[(&str, &str)] = &[
    (":model [id]", "Switch model or show current"),
    (":split [on|off]", "Toggle smart prompt splitting"),
    (":clear", "Clear the conversation"),
    (":sidebar", "Toggle settings sidebar"),
    (":help", "Show command help"),
    (":quit", "Quit the application"),
];

fn mode_color(mode: ResponseMode) -> Color {
    match mode {
        ResponseMode::Direct => Color::Green,
        ResponseMode::Decompose => Color::Magenta,
    }
}

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Main content
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);

    if app.show_sidebar {
        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(UI_SIDEBAR_PERCENT),
                Constraint::Percentage(100 - UI_SIDEBAR_PERCENT),
            ])
            .split(chunks[1]);
        render_sidebar(frame, content[0], app);
        render_chat(frame, content[1], app);
    } else {
        render_chat(frame, chunks[1], app);
    }

    render_input(frame, chunks[2], app);
    render_status_bar(frame, chunks[3], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mode = app.session.mode();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "ChainChat",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Model: "),
        Span::styled(app.session.model_name().to_string(), Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::styled(mode.display_name().to_string(), Style::default().fg(mode_color(mode))),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);

    frame.render_widget(header, area);
}

fn setting<'a>(label: &'a str, value: String, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let session = &app.session;
    let config = session.config();
    let mode = session.mode();

    let model = if session.model_is_local() {
        format!("{} (local)", session.model_name())
    } else {
        session.model_name().to_string()
    };

    let mut lines = vec![
        setting("Model", model, Color::Green),
        setting(
            "Smart split",
            (if mode.is_decompose() { "on" } else { "off" }).to_string(),
            mode_color(mode),
        ),
    ];

    if mode.is_decompose() {
        if let Some(planner) = session.planner_name() {
            if planner != session.model_name() {
                lines.push(setting("Planner", planner.to_string(), Color::Cyan));
            }
        }
        lines.push(setting(
            "Max parts",
            config.decomposition.max_sub_queries.to_string(),
            Color::White,
        ));
    }

    lines.push(setting(
        "History",
        match config.session.history_limit() {
            Some(turns) => format!("last {} turns", turns),
            None => "unlimited".to_string(),
        },
        Color::White,
    ));
    lines.push(setting(
        "Temperature",
        format!("{:.1}", config.default_model.temperature),
        Color::White,
    ));
    lines.push(setting(
        "Max tokens",
        config.default_model.max_tokens.to_string(),
        Color::White,
    ));
    lines.push(setting(
        "Turns",
        session.transcript().turn_count().to_string(),
        Color::White,
    ));

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        mode.description().to_string(),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));
    lines.push(Line::default());

    for (keys, action) in [
        ("Ctrl+D", "toggle split"),
        ("Ctrl+L", "clear chat"),
        ("Ctrl+B", "hide sidebar"),
        ("PgUp/PgDn", "scroll"),
        (":help", "commands"),
    ] {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", keys), Style::default().fg(Color::Yellow)),
            Span::styled(action, Style::default().fg(Color::DarkGray)),
        ]));
    }

    let sidebar = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Settings ")
                .borders(Borders::RIGHT)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(sidebar, area);
}

fn role_header(role: MessageRole) -> Line<'static> {
    let (label, color) = match role {
        MessageRole::User => ("You", Color::Blue),
        MessageRole::Assistant => ("Assistant", Color::Green),
        MessageRole::System => ("System", Color::Yellow),
    };
    Line::from(Span::styled(
        format!("[{}]", label),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn push_message(lines: &mut Vec<Line<'static>>, message: &ChatMessage, line_numbers: bool) {
    lines.push(role_header(message.role));
    match message.role {
        MessageRole::Assistant => lines.extend(parse_markdown(&message.content, line_numbers)),
        _ => {
            for line in message.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
    }
    lines.push(Line::default());
}

fn push_notice(lines: &mut Vec<Line<'static>>, notice: &Notice) {
    let (icon, color) = match notice.level {
        NoticeLevel::Info => ("ℹ", Color::Cyan),
        NoticeLevel::Warning => ("⚠", Color::Yellow),
        NoticeLevel::Error => ("✗", Color::Red),
    };
    for (i, text) in notice.text.lines().enumerate() {
        let prefix = if i == 0 { format!("{} ", icon) } else { "  ".to_string() };
        lines.push(Line::from(vec![
            Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(text.to_string(), Style::default().fg(color)),
        ]));
    }
    lines.push(Line::default());
}

/// All lines of the chat area, oldest first
pub fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let messages = app.session.transcript().messages();
    let notices_at = |anchor: usize| app.notices.iter().filter(move |n| n.anchor == anchor);

    for (i, message) in messages.iter().enumerate() {
        for notice in notices_at(i) {
            push_notice(&mut lines, notice);
        }
        push_message(&mut lines, message, app.show_line_numbers);
    }
    for notice in notices_at(messages.len()) {
        push_notice(&mut lines, notice);
    }

    if let Some(query) = &app.pending_query {
        push_message(&mut lines, &ChatMessage::user(query.as_str()), false);
        for notice in notices_at(messages.len() + 1) {
            push_notice(&mut lines, notice);
        }

        if !app.live_parts.is_empty() {
            lines.push(role_header(MessageRole::Assistant));
            for part in &app.live_parts {
                let text = format!("**Part {}**: *{}*\n\n{}", part.index, part.sub_query, part.answer);
                lines.extend(parse_markdown(&text, app.show_line_numbers));
                lines.push(Line::default());
            }
        }

        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", app.spinner()),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                app.phase.label(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    lines
}

/// Rows `lines` occupy once word-wrapped to `width` columns
///
/// Uses the same wrapper the chat paragraph renders with.
fn wrapped_height(lines: &[Line<'static>], width: u16) -> u16 {
    let rows = Paragraph::new(lines.to_vec())
        .wrap(Wrap { trim: false })
        .line_count(width.max(1));
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_chat(frame: &mut Frame, area: Rect, app: &App) {
    let lines = chat_lines(app);
    let mode = app.session.mode();

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let total = wrapped_height(&lines, inner_width);
    let max_scroll = total.saturating_sub(inner_height);
    // scroll_offset counts up from the bottom
    let top = max_scroll.saturating_sub(app.scroll_offset.min(max_scroll));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" Chat [{}] ", mode.display_name()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(mode_color(mode))),
        )
        .wrap(Wrap { trim: false })
        .scroll((top, 0));

    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let showing_command_hints = app.input.starts_with(':') && !app.input.starts_with("::");

    let input_area = if showing_command_hints {
        let typed = app.input.trim_start_matches(':').to_lowercase();
        let typed = typed.split_whitespace().next().unwrap_or("");
        let filtered: Vec<_> = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.trim_start_matches(':').starts_with(typed))
            .collect();

        // Draw hints over the bottom of the chat area
        let hints_height = (filtered.len() as u16 + 2).min(8);
        if !filtered.is_empty() && area.y >= hints_height {
            let hints_area = Rect::new(area.x, area.y - hints_height, area.width, hints_height);
            let hint_lines: Vec<Line> = filtered
                .iter()
                .map(|(cmd, desc)| {
                    Line::from(vec![
                        Span::styled(
                            format!("  {:<20}", cmd),
                            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(*desc, Style::default().fg(Color::Gray)),
                    ])
                })
                .collect();
            let hints = Paragraph::new(hint_lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(" Commands "),
            );
            frame.render_widget(ratatui::widgets::Clear, hints_area);
            frame.render_widget(hints, hints_area);
        }
        area
    } else {
        area
    };

    let title = if showing_command_hints {
        " Enter Command "
    } else if app.phase.is_busy() {
        " Message (answer in progress) "
    } else {
        " Message (Enter to send • Esc to clear • :help for commands) "
    };

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if showing_command_hints {
                    Color::Yellow
                } else {
                    Color::DarkGray
                }))
                .title(title),
        );

    frame.render_widget(input, input_area);

    let cursor_offset = u16::try_from(app.input.chars().count()).unwrap_or(u16::MAX);
    let cursor_x = input_area
        .x
        .saturating_add(1)
        .saturating_add(cursor_offset)
        .min(input_area.x + input_area.width.saturating_sub(2));
    frame.set_cursor_position((cursor_x, input_area.y + 1));
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mode = app.session.mode();

    let status_text = if app.phase.is_busy() {
        format!("{} {}", app.spinner(), app.phase.label())
    } else if let Some(status) = &app.status_message {
        status.clone()
    } else {
        "Ready".to_string()
    };

    let spans = vec![
        Span::styled(
            format!(" {} ", mode.display_name()),
            Style::default()
                .bg(mode_color(mode))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(status_text),
        Span::raw(" | "),
        Span::styled("Ctrl+D: split", Style::default().fg(Color::DarkGray)),
        Span::raw(" | "),
        Span::styled("Ctrl+C: quit", Style::default().fg(Color::DarkGray)),
    ];

    let status_bar = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::Black))
        .block(Block::default());

    frame.render_widget(status_bar, area);
}
