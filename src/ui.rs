use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, StatusLine};
use crate::chat::Entry;
use crate::message::Role;
use unicode_width::UnicodeWidthChar;

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
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // Unclosed or empty, keep the markers as typed
                current_text.push_str("**");
                current_text.push_str(&bold_text);
                if found_close {
                    current_text.push_str("**");
                }
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

/// Drop control characters so message text cannot drive the terminal.
/// Newlines survive, tabs become spaces.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' => Some(c),
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, log, input, footer
    let [header_area, log_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_log(app, frame, log_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" docchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.backend.endpoint().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

/// Lines for one log entry, followed by a blank separator line.
fn entry_lines(entry: &Entry) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let message = &entry.message;
    let text = sanitize(&message.text);

    match message.role {
        Role::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            lines.extend(text.lines().map(|l| Line::from(l.to_string())));
        }
        Role::Bot => {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            if entry.is_loading() {
                lines.push(Line::from(Span::styled(
                    text,
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                lines.extend(text.lines().map(parse_markdown_line));
            }
        }
    }

    // Evidence block only when there is an image
    if let Some(evidence) = &message.evidence {
        lines.push(Line::from(Span::styled(
            evidence.caption(),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(vec![
            Span::styled(evidence.summary(), Style::default().fg(Color::Magenta)),
            Span::styled(" Ctrl+S to save", Style::default().fg(Color::DarkGray)),
        ]));
    }

    lines.push(Line::default());
    lines
}

pub fn log_lines(entries: &[Entry]) -> Vec<Line<'static>> {
    entries.iter().flat_map(entry_lines).collect()
}

/// Rows the paragraph takes once wrapped to `width`, measured by the widget.
fn wrapped_height(paragraph: &Paragraph<'_>, width: u16) -> u16 {
    u16::try_from(paragraph.line_count(width)).unwrap_or(u16::MAX)
}

fn render_log(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);
    app.log_height = inner_height;

    if app.chat.entries().is_empty() {
        let hint = Paragraph::new(Text::from(Span::styled(
            "Ask a question about the document...",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let log = Paragraph::new(Text::from(log_lines(app.chat.entries()))).wrap(Wrap { trim: false });
    let total = wrapped_height(&log, inner_width);
    let offset = app.chat.clamp_scroll(total, inner_height);
    let log = log.block(block).scroll((offset, 0));

    frame.render_widget(log, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Ask (Enter to send) ");

    let inner_width = usize::from(area.width.saturating_sub(2));
    let (visible_text, cursor_col) =
        input_window(&sanitize(app.chat.input()), app.chat.cursor(), inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if inner_width > 0 {
        let x = area.x + 1 + u16::try_from(cursor_col).unwrap_or(0);
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

/// Slice of `text` that fits `width` terminal cells with the cursor in view,
/// plus the cursor's column inside that slice. `cursor` counts chars.
fn input_window(text: &str, cursor: usize, width: usize) -> (String, usize) {
    if width == 0 {
        return (String::new(), 0);
    }

    let widths: Vec<usize> = text.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor = cursor.min(widths.len());

    // Drop chars from the left until the cursor cell fits
    let mut start = 0;
    let mut cursor_col: usize = widths[..cursor].iter().sum();
    while start < cursor && cursor_col + 1 > width {
        cursor_col -= widths[start];
        start += 1;
    }

    let mut used = 0;
    let visible = text
        .chars()
        .zip(&widths)
        .skip(start)
        .take_while(|(_, &w)| {
            used += w;
            used <= width
        })
        .map(|(c, _)| c)
        .collect();

    (visible, cursor_col)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = Vec::new();

    // Transient state first so narrow terminals cut the hints, not the news
    let pending = app.chat.pending_count();
    if pending > 0 {
        let noun = if pending == 1 { "reply" } else { "replies" };
        spans.push(Span::styled(
            format!(" {} waiting for {} {} ", app.spinner(), pending, noun),
            Style::default().fg(Color::Yellow),
        ));
    }

    match &app.status {
        Some(StatusLine::Info(msg)) => {
            spans.push(Span::styled(format!(" {} ", msg), Style::default().fg(Color::Green)));
        }
        Some(StatusLine::Error(msg)) => {
            spans.push(Span::styled(format!(" {} ", msg), Style::default().fg(Color::Red)));
        }
        None => {}
    }

    spans.extend(vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" ↑/↓ PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Ctrl+S ", key_style),
        Span::styled(" save image ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Answer, ApiError};
    use crate::chat::{ERROR_NOTICE, LOADING_TEXT};
    use crate::evidence::Evidence;
    use crate::message::Message;
    use crate::test_utils::{buffer_text, create_test_terminal};
    use std::path::PathBuf;

    fn test_app() -> App {
        App::new_for_test("http://localhost:8000", PathBuf::from("."))
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = create_test_terminal();
        terminal.draw(|f| render(app, f)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn submit(app: &mut App, text: &str) -> crate::chat::Submission {
        for c in text.chars() {
            app.chat.insert_char(c);
        }
        app.chat.submit().unwrap()
    }

    #[test]
    fn test_empty_log_shows_hint() {
        let mut app = test_app();
        let screen = draw(&mut app);
        assert!(screen.contains("Ask a question about the document..."));
        assert!(screen.contains("http://localhost:8000/api/chat"));
    }

    #[test]
    fn test_placeholder_visible_while_waiting() {
        let mut app = test_app();
        submit(&mut app, "What is on page 3?");

        let screen = draw(&mut app);
        assert!(screen.contains("What is on page 3?"));
        assert!(screen.contains(LOADING_TEXT.trim_start_matches('🔍').trim()));
        assert!(screen.contains("waiting for 1 reply"));
    }

    #[test]
    fn test_answer_without_image_has_no_evidence_block() {
        let mut app = test_app();
        let submission = submit(&mut app, "What is on page 3?");
        app.chat.resolve(
            submission.id,
            Ok(Answer { text: "It shows a diagram.".to_string(), evidence: None }),
        );

        let screen = draw(&mut app);
        assert!(screen.contains("It shows a diagram."));
        assert!(!screen.contains("Retrieved from Page"));
        assert!(!screen.contains("Scanning document visuals"));
    }

    #[test]
    fn test_answer_with_image_has_evidence_block() {
        let mut app = test_app();
        let submission = submit(&mut app, "What is on page 3?");
        let evidence = Evidence { image: vec![0xFF, 0xD8, 0xFF, 0xE0], page: Some(3) };
        app.chat.resolve(
            submission.id,
            Ok(Answer { text: "See figure.".to_string(), evidence: Some(evidence) }),
        );

        let screen = draw(&mut app);
        assert!(screen.contains("See figure."));
        assert!(screen.contains("Retrieved from Page 3:"));
        assert!(screen.contains("[jpeg image, 4 B]"));
    }

    #[test]
    fn test_failure_shows_notice() {
        let mut app = test_app();
        let submission = submit(&mut app, "hello");
        app.chat.resolve(
            submission.id,
            Err(ApiError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
        );

        let screen = draw(&mut app);
        assert!(screen.contains(ERROR_NOTICE.trim_start_matches("⚠️").trim()));
        assert!(!screen.contains("Scanning document visuals"));
    }

    #[test]
    fn test_log_follows_newest_entry() {
        let mut app = test_app();
        for i in 0..30 {
            app.chat.render_message(Message::bot(format!("answer number {}", i), None));
        }

        let screen = draw(&mut app);
        assert!(screen.contains("answer number 29"));
        assert!(!screen.contains("answer number 0 "));
    }

    #[test]
    fn test_log_follows_wide_character_answers() {
        let mut app = test_app();
        for _ in 0..8 {
            app.chat.render_message(Message::bot("图".repeat(100), None));
        }
        app.chat.render_message(Message::bot("NEWEST ANSWER", None));

        let screen = draw(&mut app);
        assert!(screen.contains("NEWEST ANSWER"));
    }

    #[test]
    fn test_log_follows_word_wrapped_answers() {
        let mut app = test_app();
        let long_words = ["a", "b", "c", "d"].map(|c| c.repeat(40)).join(" ");
        for _ in 0..12 {
            app.chat.render_message(Message::bot(long_words.clone(), None));
        }
        app.chat.render_message(Message::bot("NEWEST ANSWER", None));

        let screen = draw(&mut app);
        assert!(screen.contains("NEWEST ANSWER"));
    }

    #[test]
    fn test_reply_visible_after_wrapped_history() {
        let mut app = test_app();
        for _ in 0..6 {
            app.chat.render_message(Message::bot("答".repeat(120), None));
        }
        let submission = submit(&mut app, "What is on page 3?");
        app.chat.resolve(
            submission.id,
            Ok(Answer { text: "Fresh reply.".to_string(), evidence: None }),
        );

        let screen = draw(&mut app);
        assert!(screen.contains("Fresh reply."));
    }

    #[test]
    fn test_status_line() {
        let mut app = test_app();
        app.status = Some(StatusLine::Error("No evidence image to save".to_string()));
        let screen = draw(&mut app);
        assert!(screen.contains("No evidence image to save"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("plain"), "plain");
        assert_eq!(sanitize("a\x1b[31mred\x1b[0m"), "a[31mred[0m");
        assert_eq!(sanitize("line1\nline2\tx\r"), "line1\nline2 x");
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("see **page 3** now");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "page 3");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let unclosed = parse_markdown_line("a **b");
        assert_eq!(unclosed.spans.len(), 1);
        assert_eq!(unclosed.spans[0].content, "a **b");

        let empty = parse_markdown_line("a ****");
        assert_eq!(empty.spans.len(), 1);
        assert_eq!(empty.spans[0].content, "a ****");
    }

    #[test]
    fn test_wrapped_height() {
        let plain = Paragraph::new(vec![Line::from("abcdef"), Line::default(), Line::from("ab")])
            .wrap(Wrap { trim: false });
        assert_eq!(wrapped_height(&plain, 4), 4);
        assert_eq!(wrapped_height(&plain, 10), 3);

        // Double-width chars fill rows twice as fast
        let wide = Paragraph::new("图图图图").wrap(Wrap { trim: false });
        assert_eq!(wrapped_height(&wide, 4), 2);

        // Words move whole to the next row
        let words = Paragraph::new("aaa bbb").wrap(Wrap { trim: false });
        assert_eq!(wrapped_height(&words, 5), 2);
    }

    #[test]
    fn test_input_window_ascii() {
        assert_eq!(input_window("abc", 3, 10), ("abc".to_string(), 3));
        assert_eq!(input_window("abcdef", 6, 4), ("def".to_string(), 3));
        assert_eq!(input_window("abcdef", 0, 4), ("abcd".to_string(), 0));
        assert_eq!(input_window("abc", 1, 0), (String::new(), 0));
    }

    #[test]
    fn test_input_window_wide_chars() {
        // Cursor column counts cells, not chars
        assert_eq!(input_window("图图a", 2, 10), ("图图a".to_string(), 4));

        // Scrolled window never exceeds the box
        let (visible, col) = input_window("图图图图图", 5, 6);
        assert_eq!(visible, "图图");
        assert_eq!(col, 4);

        let (visible, col) = input_window("图图图图图", 0, 5);
        assert_eq!(visible, "图图");
        assert_eq!(col, 0);
    }

    #[test]
    fn test_input_cursor_after_wide_chars() {
        let mut app = test_app();
        for c in "图图".chars() {
            app.chat.insert_char(c);
        }
        let mut terminal = create_test_terminal();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        // Input box starts at column 0; border plus two double-width chars
        let cursor = terminal.get_cursor_position().unwrap();
        assert_eq!(cursor.x, 5);
    }
}
