use quill_core::{Alignment, Block as DocBlock, Composer, Message, Node, Role, TextRun, View};
use ratatui::{
    layout::{self, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane, Screen};

/// Runs at or above this size render as headings
const LARGE_FONT: f64 = 20.0;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if close == 0 {
            // "****" is literal
            spans.push(Span::raw(rest[..open + 4].to_string()));
            rest = &after_open[2..];
            continue;
        }
        if open > 0 {
            spans.push(Span::raw(rest[..open].to_string()));
        }
        spans.push(Span::styled(
            after_open[..close].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

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

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Document => render_document_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(format!(" {label} "), Style::default().fg(Color::Black).bg(Color::Cyan).bold())
        } else {
            Span::styled(format!(" {label} "), Style::default().fg(Color::Gray))
        }
    };

    let session = app
        .session_id
        .as_ref()
        .map(|id| id.as_str().chars().take(8).collect::<String>())
        .unwrap_or_else(|| "no session".to_string());

    let title = Line::from(vec![
        Span::styled(" Quill ", Style::default().fg(Color::Cyan).bold()),
        tab("Chat", app.screen == Screen::Chat),
        tab("Document", app.screen == Screen::Document),
        Span::styled(
            format!("  {} [{}] ", app.endpoint, session),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let pending = match app.screen {
        Screen::Chat => app.chat_pending(),
        Screen::Document => app.document_pending(),
    };
    let (mode_text, mode_style) = if pending {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        match app.screen {
            Screen::Chat => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
            Screen::Document => (" DOC ", Style::default().bg(Color::Magenta).fg(Color::White)),
        }
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {key} "), key_style),
            Span::styled(format!(" {label} "), label_style),
        ]
    };

    let mut hints: Vec<Span> = Vec::new();
    match (app.screen, app.focus) {
        (Screen::Chat, _) => {
            hints.extend(hint("Enter", "send"));
            hints.extend(hint("PgUp/PgDn", "scroll"));
        }
        (Screen::Document, FocusPane::Input) => {
            hints.extend(hint("Enter", "run AI"));
            hints.extend(hint("Tab", "edit document"));
        }
        (Screen::Document, FocusPane::Editor) => {
            hints.extend(hint("↑/↓", "paragraph"));
            hints.extend(hint("^B", "bold"));
            hints.extend(hint("^L/^E/^R/^J", "align"));
            hints.extend(hint("Alt+↑/↓", "size"));
            hints.extend(hint("Tab", "AI command"));
        }
    }
    hints.extend(hint("S-Tab", "switch view"));
    hints.extend(hint("^Q", "quit"));

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

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let pending = app.chat.is_in_flight();
    let messages = app.chat.snapshot();

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat ");

    let chat_text = if messages.is_empty() && !pending {
        Text::from(Span::styled(
            "Type a message…",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines = chat_lines(&messages);

        if pending {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(
        frame,
        input_area,
        &app.chat.input(),
        " Message (Enter to send) ",
        true,
        pending,
    );
}

fn chat_lines(messages: &[Message]) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(msg.content.clone()));
            }
            Role::Assistant if msg.is_error() => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(Span::styled(
                    msg.content.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            Role::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                // Split response into lines and parse markdown
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    lines
}

fn render_document_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [doc_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    let pending = app.document.is_in_flight();
    let editor_focused = app.focus == FocusPane::Editor;
    let border_color = if editor_focused && !pending {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = if pending {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!(" Document - formatting{} ", dots)
    } else {
        " Document ".to_string()
    };

    let doc_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let document = app.document.current();
    let selected = editor_focused.then_some(app.selected_block);
    let mut lines: Vec<Line> = Vec::new();
    for (i, block) in document.blocks().iter().enumerate() {
        lines.extend(block_lines(block, selected == Some(i)));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(doc_block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, doc_area);

    render_input(
        frame,
        input_area,
        &app.document.input(),
        " Tell the AI what to do… ",
        app.focus == FocusPane::Input,
        pending,
    );
}

/// One line per block; nested blocks become indented lines below their parent.
fn block_lines(block: &DocBlock, selected: bool) -> Vec<Line<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut nested: Vec<Line<'static>> = Vec::new();

    for node in &block.children {
        match node {
            Node::Text(run) => spans.push(run_span(run)),
            Node::Block(child) => {
                for mut line in block_lines(child, false) {
                    line.spans.insert(0, Span::raw("  "));
                    nested.push(line);
                }
            }
        }
    }

    let mut line = Line::from(spans).alignment(match block.alignment() {
        Alignment::Left | Alignment::Justify => layout::Alignment::Left,
        Alignment::Center => layout::Alignment::Center,
        Alignment::Right => layout::Alignment::Right,
    });
    if selected {
        line = line.style(Style::default().bg(Color::Rgb(40, 40, 60)));
    }

    let mut lines = vec![line];
    lines.extend(nested);
    lines.push(Line::default());
    lines
}

fn run_span(run: &TextRun) -> Span<'static> {
    let mut style = Style::default();
    if run.is_bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if run.is_italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if run.font_size.is_some_and(|size| size >= LARGE_FONT) {
        style = style.fg(Color::LightYellow).add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(run.text.clone(), style)
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    input: &Composer,
    title: &str,
    focused: bool,
    pending: bool,
) {
    let border_color = if pending {
        Color::DarkGray
    } else if focused {
        Color::Yellow
    } else {
        Color::Gray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = input.cursor();

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = input
        .text()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if pending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let paragraph = Paragraph::new(visible_text)
        .style(text_style)
        .block(input_block);

    frame.render_widget(paragraph, area);

    if focused && !pending {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
