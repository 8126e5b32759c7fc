use chrono::Local;
use gtm_core::markdown::{InlineStyle, StyledSpan};
use gtm_core::{render as render_markdown, ChatMessage, RenderBlock, Team, SUGGESTED_QUESTIONS};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, FocusPane, InputMode};

const HISTORY_WIDTH: u16 = 34;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, input, footer
    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let main_area = if app.show_history {
        let [history_area, main_area] =
            Layout::horizontal([Constraint::Length(HISTORY_WIDTH), Constraint::Min(0)]).areas(body_area);
        render_history(app, frame, history_area);
        main_area
    } else {
        body_area
    };

    if app.is_welcome() {
        render_welcome(app, frame, main_area);
    } else {
        render_transcript(app, frame, main_area);
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_suggestions {
        render_suggestions(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" GTM Intelligence ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.team.display_name()), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(app.call_count_label(), Style::default().fg(Color::Green)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut hints: Vec<Span> = Vec::new();
    if app.show_suggestions {
        hints.extend(hint("j/k", "nav"));
        hints.extend(hint("Enter/1-5", "ask"));
        hints.extend(hint("Esc", "close"));
    } else {
        match (app.input_mode, app.focus) {
            (InputMode::Editing, _) => {
                hints.extend(hint("Enter", "ask"));
                hints.extend(hint("Esc", "done"));
                hints.extend(hint("Tab", "history"));
            }
            (InputMode::Normal, FocusPane::History) => {
                hints.extend(hint("j/k", "nav"));
                hints.extend(hint("Enter", "ask again"));
                hints.extend(hint("C", "clear history"));
                hints.extend(hint("Tab", "chat"));
            }
            (InputMode::Normal, FocusPane::Main) => {
                if app.is_welcome() {
                    hints.extend(hint("j/k", "card"));
                    hints.extend(hint("Enter/1-4", "ask"));
                    hints.extend(hint("h/l", "team"));
                } else {
                    hints.extend(hint("j/k", "scroll"));
                    hints.extend(hint("n", "new chat"));
                }
                hints.extend(hint("i", "type"));
                hints.extend(hint("s", "suggestions"));
                hints.extend(hint("H", "history"));
            }
        }
        hints.extend(hint("q", "quit"));
    }

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(hints);
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::History;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat History ");

    if app.conversation.history().is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No conversations yet",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .conversation
        .history()
        .iter()
        .map(|item| {
            let when = item.created_at.with_timezone(&Local).format("%H:%M").to_string();
            ListItem::new(vec![
                Line::from(Span::styled(truncate(&item.question, width), Style::default().bold())),
                Line::from(Span::styled(
                    truncate(&item.preview, width),
                    Style::default().fg(Color::Gray),
                )),
                Line::from(Span::styled(when, Style::default().fg(Color::DarkGray))),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.history_state);
}

fn render_welcome(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Main;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Ask about your sales calls ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [tabs_area, desc_area, cards_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(inner);

    let teams = Team::all();
    let selected = teams.iter().position(|t| *t == app.team).unwrap_or(0);
    let tabs = Tabs::new(teams.iter().map(|t| t.display_name()))
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
        .divider("|");
    frame.render_widget(tabs, tabs_area);

    let description = Paragraph::new(Span::styled(
        app.team.description(),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    ));
    frame.render_widget(description, desc_area);

    let items: Vec<ListItem> = app
        .team
        .questions()
        .iter()
        .enumerate()
        .map(|(i, card)| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                    Span::styled(card.title, Style::default().bold()),
                ]),
                Line::from(Span::styled(
                    format!("   {}", card.description),
                    Style::default().fg(Color::Gray),
                )),
                Line::default(),
            ])
        })
        .collect();

    let cards = List::new(items)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");
    frame.render_stateful_widget(cards, cards_area, &mut app.card_state);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Main;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(format!(" {} ", app.team.display_name()));

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in app.conversation.messages() {
        message_lines(msg, app, inner_width as usize, &mut lines);
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            "AI",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Analyzing your sales calls{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let total = wrapped_height(&lines, inner_width);
    app.update_chat_metrics(total, inner_height);

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn message_lines(msg: &ChatMessage, app: &App, width: usize, lines: &mut Vec<Line<'static>>) {
    let when = msg.created_at.with_timezone(&Local).format("%H:%M").to_string();

    if msg.is_user() {
        lines.push(
            Line::from(vec![
                Span::styled(when, Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            ])
            .alignment(Alignment::Right),
        );
        for text in msg.content.lines() {
            lines.push(Line::from(text.to_string()).alignment(Alignment::Right));
        }
        lines.push(Line::default());
        return;
    }

    let label_color = if msg.is_error { Color::Red } else { Color::Yellow };
    lines.push(Line::from(vec![
        Span::styled("AI", Style::default().fg(label_color).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(when, Style::default().fg(Color::DarkGray)),
    ]));

    if msg.is_error {
        lines.push(Line::from(Span::styled(msg.content.clone(), Style::default().fg(Color::Red))));
    } else {
        for block in render_markdown(&msg.content) {
            block_lines(&block, width, lines);
        }
    }

    if !msg.sources.is_empty() {
        let mut badges = vec![Span::styled("Sources: ", Style::default().fg(Color::DarkGray))];
        for source in &msg.sources {
            badges.push(Span::styled(
                source.badge_label(),
                Style::default().fg(Color::Blue).bg(Color::Black),
            ));
            badges.push(Span::raw(" "));
        }
        lines.push(Line::from(badges));
    }

    if let Some(cost) = &msg.cost {
        lines.push(Line::from(Span::styled(
            format!("Cost {}", cost.label(&app.pricing)),
            Style::default().fg(Color::Green),
        )));
    }

    lines.push(Line::default());
}

/// Lay one Markdown block out as terminal lines.
pub fn block_lines(block: &RenderBlock, width: usize, lines: &mut Vec<Line<'static>>) {
    match block {
        RenderBlock::SectionHeader { label, divider } => {
            if *divider {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "─".repeat(width.max(1)),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            let pill = Style::default()
                .bg(Color::Indexed(54))
                .fg(Color::White)
                .add_modifier(Modifier::BOLD);
            let mut spans = vec![Span::styled(" ", pill)];
            spans.extend(label.iter().map(|s| Span::styled(s.text.clone(), pill)));
            spans.push(Span::styled(" ", pill));
            lines.push(Line::from(spans));
        }
        RenderBlock::Heading { level, spans } => {
            let style = match level {
                1 => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                2 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                3 => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                _ => Style::default().add_modifier(Modifier::BOLD | Modifier::ITALIC),
            };
            push_wrapped(lines, Vec::new(), spans, style);
        }
        RenderBlock::Paragraph { indent, spans } => {
            let prefix = vec![Span::raw("  ".repeat(*indent))];
            push_wrapped(lines, prefix, spans, Style::default());
        }
        RenderBlock::Bullet { depth, marker, spans } => {
            let marker = match (marker.is_empty(), *depth) {
                (false, _) => format!("{} ", marker),
                (true, 0) => "• ".to_string(),
                (true, _) => "◦ ".to_string(),
            };
            let prefix = vec![
                Span::raw("  ".repeat(*depth)),
                Span::styled(marker, Style::default().fg(Color::Cyan)),
            ];
            push_wrapped(lines, prefix, spans, Style::default());
        }
        RenderBlock::Quote { blocks } => {
            let mut inner = Vec::new();
            for block in blocks {
                block_lines(block, width.saturating_sub(2), &mut inner);
            }
            for line in inner {
                let mut spans = vec![Span::styled("│ ", Style::default().fg(Color::DarkGray))];
                spans.extend(line.spans.into_iter().map(|s| {
                    let style = s.style.add_modifier(Modifier::ITALIC).fg(Color::Gray);
                    Span::styled(s.content, style)
                }));
                lines.push(Line::from(spans));
            }
        }
        RenderBlock::Table { header, rows } => table_lines(header, rows, lines),
        RenderBlock::Code { lang, lines: code } => {
            if let Some(lang) = lang {
                lines.push(Line::from(Span::styled(
                    format!("  {}", lang),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            for text in code {
                lines.push(Line::from(Span::styled(
                    format!("  {}", text),
                    Style::default().fg(Color::LightYellow),
                )));
            }
        }
        RenderBlock::Rule => lines.push(Line::from(Span::styled(
            "─".repeat(width.max(1)),
            Style::default().fg(Color::DarkGray),
        ))),
    }
}

fn table_lines(header: &[Vec<StyledSpan>], rows: &[Vec<Vec<StyledSpan>>], lines: &mut Vec<Line<'static>>) {
    let cell_width = |cell: &Vec<StyledSpan>| cell.iter().map(|s| s.text.chars().count()).sum::<usize>();
    let columns = std::iter::once(header)
        .chain(rows.iter().map(Vec::as_slice))
        .map(|row| row.len())
        .max()
        .unwrap_or(0);

    let mut widths = vec![0usize; columns];
    for row in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell_width(cell));
        }
    }

    let border = Style::default().fg(Color::DarkGray);
    let row_line = |row: &[Vec<StyledSpan>], base: Style| {
        let mut spans = vec![Span::styled("│", border)];
        for (i, width) in widths.iter().enumerate() {
            spans.push(Span::raw(" "));
            let mut used = 0;
            if let Some(cell) = row.get(i) {
                for s in cell {
                    used += s.text.chars().count();
                    spans.push(Span::styled(s.text.clone(), inline_style(s.style, base)));
                }
            }
            spans.push(Span::raw(" ".repeat(width - used + 1)));
            spans.push(Span::styled("│", border));
        }
        Line::from(spans)
    };

    lines.push(row_line(header, Style::default().add_modifier(Modifier::BOLD)));
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    lines.push(Line::from(Span::styled(format!("├{}┤", rule.join("┼")), border)));
    for row in rows {
        lines.push(row_line(row, Style::default()));
    }
}

/// Push spans after `prefix`, starting a new line at each hard break.
fn push_wrapped(
    lines: &mut Vec<Line<'static>>,
    prefix: Vec<Span<'static>>,
    spans: &[StyledSpan],
    base: Style,
) {
    let indent: String = " ".repeat(prefix.iter().map(|s| s.width()).sum());
    let mut current = prefix;
    for span in spans {
        let style = inline_style(span.style, base);
        let mut parts = span.text.split('\n');
        if let Some(first) = parts.next() {
            if !first.is_empty() {
                current.push(Span::styled(first.to_string(), style));
            }
        }
        for part in parts {
            lines.push(Line::from(std::mem::take(&mut current)));
            current.push(Span::raw(indent.clone()));
            if !part.is_empty() {
                current.push(Span::styled(part.to_string(), style));
            }
        }
    }
    lines.push(Line::from(current));
}

fn inline_style(style: InlineStyle, base: Style) -> Style {
    let mut out = base;
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.strikethrough {
        out = out.add_modifier(Modifier::CROSSED_OUT);
    }
    if style.code {
        out = out.fg(Color::LightYellow);
    }
    if style.link {
        out = out.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
    }
    out
}

/// Rows the lines take once wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = lines.iter().map(|line| line.width().div_ceil(width).max(1)).sum();
    rows.min(u16::MAX as usize) as u16
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_loading() {
        " Ask a question (waiting for answer) "
    } else {
        " Ask a question "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;

    // Scroll horizontally to keep the cursor visible
    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };

    let input = if app.query_input.is_empty() && !editing {
        Paragraph::new(Span::styled(
            "Press i to ask about your sales calls...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = app
            .query_input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    if editing && !app.show_suggestions {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_suggestions(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 48.min(area.width.saturating_sub(4));
    let popup_height = (SUGGESTED_QUESTIONS.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Suggested questions ");

    let items: Vec<ListItem> = SUGGESTED_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, question)| ListItem::new(format!("{}. {}", i + 1, question)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.suggestion_state);
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let head: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn layout(markdown: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for block in render_markdown(markdown) {
            block_lines(&block, width, &mut lines);
        }
        lines.iter().map(text_of).collect()
    }

    #[test]
    fn test_section_header_is_a_pill() {
        assert_eq!(layout("**Pricing**\n- too high", 10), vec![" Pricing ", "• too high"]);
    }

    #[test]
    fn test_second_header_gets_divider() {
        let lines = layout("- **Pricing**\n- **Timing**", 4);
        assert_eq!(lines, vec![" Pricing ", "", "────", " Timing "]);
    }

    #[test]
    fn test_nested_bullets_indent_under_header() {
        let lines = layout("- **Deals**\n  - Acme\n  - Globex", 20);
        assert_eq!(lines, vec![" Deals ", "  ◦ Acme", "  ◦ Globex"]);
    }

    #[test]
    fn test_ordered_items_keep_numbers() {
        assert_eq!(layout("1. first\n2. second", 20), vec!["1. first", "2. second"]);
    }

    #[test]
    fn test_table_columns_align() {
        let lines = layout("| Deal | Stage |\n|---|---|\n| Acme | Won |", 40);
        assert_eq!(lines[0], "│ Deal │ Stage │");
        assert_eq!(lines[1], "├──────┼───────┤");
        assert_eq!(lines[2], "│ Acme │ Won   │");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("a".repeat(25)), Line::default(), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 10), 3 + 1 + 1);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer question", 10), "a much ...");
    }
}
