use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::math::{latex_to_unicode, normalize_math_delimiters};

const MATH_STYLE: Style = Style::new().fg(Color::LightMagenta);

fn current(stack: &[Style]) -> Style {
    stack.last().copied().unwrap_or_default()
}

fn flush(lines: &mut Vec<Line<'static>>, spans: &mut Vec<Span<'static>>) {
    if !spans.is_empty() {
        lines.push(Line::from(std::mem::take(spans)));
    }
}

/// Render a fenced or indented code block
///
/// The language label sits in the opening rule; line numbers are optional.
pub fn render_code_block(code: &str, lang: &str, line_numbers: bool) -> Vec<Line<'static>> {
    let rule = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    let label = if lang.is_empty() { "code" } else { lang };
    lines.push(Line::from(vec![
        Span::styled("╭─ ", rule),
        Span::styled(label.to_string(), Style::default().fg(Color::Magenta)),
        Span::styled(" ─", rule),
    ]));

    let code_lines: Vec<&str> = code.trim_end_matches('\n').lines().collect();
    let width = code_lines.len().to_string().len();
    for (i, line) in code_lines.iter().enumerate() {
        let mut spans = vec![Span::styled("│ ", rule)];
        if line_numbers {
            spans.push(Span::styled(
                format!("{:>width$} ", i + 1, width = width),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::styled(line.to_string(), Style::default().fg(Color::Gray)));
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled("╰─", rule)));
    lines
}

/// Parse markdown and convert to styled ratatui Lines
pub fn parse_markdown(input: &str, line_numbers: bool) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_MATH);

    let source = normalize_math_delimiters(input);
    let parser = Parser::new_ext(&source, options);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current_line_spans: Vec<Span<'static>> = Vec::new();
    let mut style_stack = vec![Style::default()];
    let mut code_block: Option<(String, String)> = None;
    let mut list_stack: Vec<Option<u64>> = Vec::new();

    for event in parser {
        match event {
            Event::Start(tag) => {
                let base = current(&style_stack);
                let new_style = match tag {
                    Tag::Heading { level, .. } => {
                        flush(&mut lines, &mut current_line_spans);
                        match level {
                            HeadingLevel::H1 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                            HeadingLevel::H2 => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                            HeadingLevel::H3 => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                            _ => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                        }
                    }
                    Tag::Emphasis => base.add_modifier(Modifier::ITALIC),
                    Tag::Strong => base.add_modifier(Modifier::BOLD),
                    Tag::Strikethrough => base.add_modifier(Modifier::CROSSED_OUT),
                    Tag::CodeBlock(kind) => {
                        flush(&mut lines, &mut current_line_spans);
                        let lang = match kind {
                            CodeBlockKind::Fenced(lang) => {
                                lang.split_whitespace().next().unwrap_or("").to_string()
                            }
                            CodeBlockKind::Indented => String::new(),
                        };
                        code_block = Some((lang, String::new()));
                        base
                    }
                    Tag::List(start) => {
                        flush(&mut lines, &mut current_line_spans);
                        list_stack.push(start);
                        base
                    }
                    Tag::Item => {
                        flush(&mut lines, &mut current_line_spans);
                        let indent = "  ".repeat(list_stack.len().saturating_sub(1));
                        current_line_spans.push(Span::raw(indent));
                        let marker = match list_stack.last_mut() {
                            Some(Some(n)) => {
                                let marker = format!("{}. ", n);
                                *n += 1;
                                marker
                            }
                            _ => "• ".to_string(),
                        };
                        current_line_spans.push(Span::styled(marker, Style::default().fg(Color::Yellow)));
                        base
                    }
                    Tag::Link { .. } => {
                        current_line_spans.push(Span::styled("[", Style::default().fg(Color::Blue)));
                        Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED)
                    }
                    Tag::BlockQuote(_) => {
                        flush(&mut lines, &mut current_line_spans);
                        current_line_spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
                        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)
                    }
                    _ => base,
                };
                style_stack.push(new_style);
            }
            Event::End(tag) => {
                style_stack.pop();
                match tag {
                    TagEnd::Paragraph => {
                        flush(&mut lines, &mut current_line_spans);
                        if list_stack.is_empty() {
                            lines.push(Line::default());
                        }
                    }
                    TagEnd::Heading(_) | TagEnd::Item | TagEnd::BlockQuote(_) => {
                        flush(&mut lines, &mut current_line_spans);
                    }
                    TagEnd::CodeBlock => {
                        if let Some((lang, code)) = code_block.take() {
                            lines.extend(render_code_block(&code, &lang, line_numbers));
                        }
                    }
                    TagEnd::List(_) => {
                        list_stack.pop();
                        if list_stack.is_empty() {
                            lines.push(Line::default());
                        }
                    }
                    TagEnd::Link => {
                        current_line_spans.push(Span::styled("]", Style::default().fg(Color::Blue)));
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                if let Some((_, code)) = code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    current_line_spans.push(Span::styled(text.to_string(), current(&style_stack)));
                }
            }
            Event::Code(code) => {
                let style = Style::default()
                    .fg(Color::Yellow)
                    .bg(Color::Rgb(40, 40, 40));
                current_line_spans.push(Span::styled(format!(" {} ", code), style));
            }
            Event::InlineMath(math) => {
                current_line_spans.push(Span::styled(latex_to_unicode(&math), MATH_STYLE));
            }
            Event::DisplayMath(math) => {
                flush(&mut lines, &mut current_line_spans);
                for line in latex_to_unicode(math.trim()).lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        lines.push(Line::from(Span::styled(format!("    {}", line), MATH_STYLE)));
                    }
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                flush(&mut lines, &mut current_line_spans);
            }
            Event::Rule => {
                flush(&mut lines, &mut current_line_spans);
                lines.push(Line::from(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::default());
            }
            _ => {}
        }
    }

    flush(&mut lines, &mut current_line_spans);

    // Drop trailing blank lines left by the last block
    while lines.last().is_some_and(|l| l.width() == 0) {
        lines.pop();
    }

    lines
}
