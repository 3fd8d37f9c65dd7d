use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use alter_ego_core::{ChatRole, CounterLevel, SendButton};
use crate::app::{App, InputMode, Screen};

const SUGGESTED_TOPICS: [&str; 4] = [
    "Technical skills and expertise",
    "Work experience and projects",
    "Education and certifications",
    "Career goals and interests",
];

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
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
        Screen::Landing => render_landing_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.session.is_pending() {
        Span::styled(" [waiting for reply]", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(format!(" {}", app.api_base_url), Style::default().fg(Color::Gray))
    };

    let title = Line::from(vec![
        Span::styled(" Alter Ego ", Style::default().fg(Color::Magenta).bold()),
        status,
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
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Landing => " HOME ",
        Screen::Chat => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match (app.screen, app.input_mode) {
        (Screen::Landing, _) => &[(" Enter ", " start chatting "), (" q ", " quit ")],
        (Screen::Chat, InputMode::Normal) => &[
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" Tab ", " home "),
            (" q ", " quit "),
        ],
        (Screen::Chat, InputMode::Editing) => &[
            (" Enter ", " send "),
            (" Esc ", " clear / stop typing "),
            (" ↑/↓ ", " scroll "),
            (" Tab ", " home "),
        ],
    };

    let hints = pairs.iter().flat_map(|(key, label)| {
        [Span::styled(*key, key_style), Span::styled(*label, label_style)]
    });

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

fn render_landing_screen(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Welcome ");

    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "Alter Ego",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "AI-Powered Personal Chatbot",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
        Line::from(
            "Welcome to my AI assistant! I'm here to answer questions about my professional \
             background, skills, and experience. Whether you're a recruiter or just curious, \
             feel free to ask me anything about my career journey.",
        ),
        Line::default(),
        Line::from(Span::styled("What you can ask:", Style::default().bold())),
    ];

    for topic in SUGGESTED_TOPICS {
        lines.push(Line::from(vec![
            Span::styled("  • ", Style::default().fg(Color::Magenta)),
            Span::raw(topic),
        ]));
    }

    lines.push(Line::default());
    let (indicator, label) = if app.session.is_pending() {
        (Color::Yellow, "AI Assistant Thinking")
    } else {
        (Color::Green, "AI Assistant Ready")
    };
    lines.push(Line::from(vec![
        Span::styled("● ", Style::default().fg(indicator)),
        Span::raw(label),
    ]));

    let landing = Paragraph::new(Text::from(lines))
        .block(block)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    frame.render_widget(landing, area);
}

/// Message log as styled lines; keep in step with `App::total_chat_lines`
fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in app.session.conversation().messages() {
        let time = msg.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string();
        let (label, color) = match msg.role {
            ChatRole::User => ("You:", Color::Cyan),
            ChatRole::Assistant => ("AI:", Color::Magenta),
        };

        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)),
        ]));

        for line in msg.content.lines() {
            match msg.role {
                ChatRole::User => lines.push(Line::from(line.to_string())),
                ChatRole::Assistant => lines.push(parse_markdown_line(line)),
            }
        }
        lines.push(Line::default());
    }

    if app.session.is_pending() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let error_height = if app.session.conversation().last_error().is_some() { 3 } else { 0 };

    let [chat_area, error_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(error_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Conversation ");

    let chat_text = if app.session.conversation().is_empty() && !app.session.is_pending() {
        Text::from(Span::styled(
            "Start a conversation by typing a message below",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(chat_lines(app))
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if let Some(error) = app.session.conversation().last_error() {
        let banner = Paragraph::new(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(Color::Red).bold()),
            Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(banner, error_area);
    }

    render_input(app, frame, input_area);
    render_status_line(app, frame, status_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let button = app.session.send_button();
    let border_color = match button {
        SendButton::Ready => Color::Green,
        SendButton::Wait(_) => Color::Yellow,
        SendButton::Sending | SendButton::Disabled => {
            if app.input_mode == InputMode::Editing {
                Color::Yellow
            } else {
                Color::DarkGray
            }
        }
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ")
        .title(
            ratatui::widgets::block::Title::from(format!(" [{}] ", button.label()))
                .alignment(Alignment::Right),
        );

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .session
        .draft()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input_style = if app.session.rejection().is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text).style(input_style).block(input_block);
    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing && app.screen == Screen::Chat {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Validation message on the left, character counter on the right
fn render_status_line(app: &App, frame: &mut Frame, area: Rect) {
    let counter = app.session.counter();
    let counter_text = counter.to_string();
    let counter_style = match counter.level() {
        CounterLevel::Normal => Style::default().fg(Color::DarkGray),
        CounterLevel::Warning => Style::default().fg(Color::Yellow),
        CounterLevel::Over => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    };

    let counter_width = counter_text.chars().count() as u16 + 1;
    let [rejection_area, counter_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(counter_width),
    ])
    .areas(area);

    if let Some(rejection) = app.session.rejection() {
        let rejection = Paragraph::new(Span::styled(
            format!(" {}", rejection),
            Style::default().fg(Color::Red),
        ));
        frame.render_widget(rejection, rejection_area);
    }

    let counter = Paragraph::new(Span::styled(counter_text, counter_style)).alignment(Alignment::Right);
    frame.render_widget(counter, counter_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};

    fn render_to_string(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("I know **Rust** well");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Rust");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("a **b");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }

    #[test]
    fn test_landing_screen_renders_intro() {
        let (mut app, _rx) = test_app(false);
        let screen = render_to_string(&mut app, 100, 30);

        assert!(screen.contains("Alter Ego"));
        assert!(screen.contains("AI-Powered Personal Chatbot"));
        assert!(screen.contains("Work experience and projects"));
        assert!(screen.contains("AI Assistant Ready"));
    }

    #[test]
    fn test_chat_screen_shows_placeholder_and_counter() {
        let (mut app, _rx) = test_app(false);
        app.open_chat();
        app.session.set_draft("Hello");
        app.cursor_end();

        let screen = render_to_string(&mut app, 100, 30);

        assert!(screen.contains("Start a conversation by typing a message below"));
        assert!(screen.contains("5 / 5000 characters"));
        assert!(screen.contains("[Send]"));
        assert_eq!(app.chat_width, 98);
    }

    #[test]
    fn test_chat_screen_shows_rejection() {
        let (mut app, _rx) = test_app(false);
        app.open_chat();
        app.session.set_draft("a".repeat(5001));
        app.submit();

        let screen = render_to_string(&mut app, 100, 30);

        assert!(screen.contains("Message too long (5001/5000 characters)"));
        assert!(screen.contains("5001 / 5000 characters"));
    }
}
