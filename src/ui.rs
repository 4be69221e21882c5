use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::conversation::Author;
use crate::markdown::render_markdown;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input row, footer
    let [header_area, chat_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input_row(app, frame, input_row);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let session = match &app.session_id {
        Some(id) => format!(" session {}", id.chars().take(8).collect::<String>()),
        None => " no session".to_string(),
    };
    let session_style = if app.session_id.is_some() {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::Red)
    };

    let title = Line::from(vec![
        Span::styled(" chatline ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}]", app.mode.display_name()), Style::default().fg(Color::Yellow)),
        Span::styled(session, session_style),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn author_line(author: Author) -> Line<'static> {
    match author {
        Author::User => Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Author::Assistant => Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    }
}

/// Every line of the chat pane, as drawn. Scroll math measures this same list.
fn chat_lines(app: &App) -> Vec<Line<'static>> {
    if app.conversation.is_empty() && !app.is_loading() {
        return vec![Line::from(Span::styled(
            "Type a message and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.conversation.list() {
        lines.push(author_line(msg.author()));
        match msg.author() {
            Author::User => {
                for line in msg.text().lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Author::Assistant => lines.extend(render_markdown(msg.text())),
        }
        lines.push(Line::default());
    }

    // Prompts still waiting for a reply
    for prompt in app.requests.pending_prompts() {
        lines.push(author_line(Author::User));
        for line in prompt.lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(author_line(Author::Assistant));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn chat_paragraph(lines: Vec<Line<'static>>) -> Paragraph<'static> {
    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

/// Rows the chat needs once wrapped to `width` columns
pub fn chat_content_height(app: &App, width: u16) -> usize {
    chat_paragraph(chat_lines(app)).line_count(width)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    // Inner size minus borders, for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.input_mode == InputMode::Normal;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.client.base_url()));

    let chat = chat_paragraph(chat_lines(app))
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn button(label: &str, color: Color) -> Paragraph<'_> {
    Paragraph::new(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
}

fn render_input_row(app: &mut App, frame: &mut Frame, area: Rect) {
    let mode_label = app.mode.display_name();

    let [input_area, send_area, clear_area, mode_area] = Layout::horizontal([
        Constraint::Min(10),
        Constraint::Length(8),
        Constraint::Length(17),
        Constraint::Length(mode_label.len() as u16 + 4),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.input_area = Some(input_area);
    app.send_button = Some(send_area);
    app.clear_button = Some(clear_area);
    app.mode_button = Some(mode_area);

    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Type your message... ");

    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Horizontal scroll that keeps the cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    let send_color = if app.input.trim().is_empty() { Color::DarkGray } else { Color::Green };
    frame.render_widget(button("Send", send_color), send_area);
    frame.render_widget(button("Clear History", Color::Red), clear_area);
    frame.render_widget(button(mode_label, Color::Magenta), mode_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((
            input_area.x + cursor_x + 1,
            input_area.y + 1,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" m ", key_style),
            Span::styled(" mode ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" clear ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    if app.input_mode == InputMode::Normal && app.is_loading() {
        hints.extend(vec![
            Span::styled(" Esc ", key_style),
            Span::styled(format!(" cancel {} ", app.requests.len()), label_style),
        ]);
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
