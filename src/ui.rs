use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::chat::Role;
use crate::notify::{Notice, NoticeKind};

/// Input box height including borders (three visible draft rows).
const INPUT_HEIGHT: u16 = 5;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_attach_prompt {
        render_attach_prompt(app, frame, area);
    }

    if let Some(notice) = app.toasts.current() {
        render_toast(notice, frame, chat_area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" charla ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.model.clone(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let conversation = app.session.conversation();

    let text = if conversation.messages().is_empty() && !conversation.busy() {
        Text::from(Span::styled(
            "Say something...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for message in conversation.messages() {
            let (label, label_color) = match message.role {
                Role::User => ("You:", Color::Cyan),
                Role::Assistant => ("AI:", Color::Yellow),
            };
            let stamp = message
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%H:%M");
            lines.push(Line::from(vec![
                Span::styled(
                    label,
                    Style::default().fg(label_color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(format!("{stamp}"), Style::default().fg(Color::DarkGray)),
            ]));
            if let Some(image) = &message.image {
                lines.push(Line::from(Span::styled(
                    format!("[image: {}]", image.content_type()),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
            for line in message.text.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());
        }

        if conversation.busy() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.transcript_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let draft = app.session.conversation().draft();
    let title = match &draft.image {
        Some(image) => format!(" Message [image: {}] ", image.content_type()),
        None => " Message ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    let rows = wrap_chars(&draft.text, inner_width);
    let (cursor_row, cursor_col) = cursor_row_col(&draft.text, app.draft_cursor, inner_width);

    // Scroll so the cursor row stays visible
    let scroll = cursor_row.saturating_sub(inner_height.saturating_sub(1));

    let visible: Vec<Line> = rows
        .iter()
        .skip(scroll)
        .take(inner_height.max(1))
        .map(|row| Line::from(row.clone()))
        .collect();

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    // Show cursor when editing (the attach prompt draws its own)
    if editing && !app.show_attach_prompt {
        frame.set_cursor_position((
            area.x + 1 + cursor_col as u16,
            area.y + 1 + (cursor_row - scroll) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<Span> = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" ^O ", key_style),
            Span::styled(" attach ", label_style),
            Span::styled(" ^X ", key_style),
            Span::styled(" unattach ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" browse ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" compose ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" o ", key_style),
            Span::styled(" attach ", label_style),
            Span::styled(" x ", key_style),
            Span::styled(" unattach ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" copy ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach image ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Path to an image file. Enter to stage, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    // Keep the cursor in view on long paths
    let inner_width = inner.width as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.attach_cursor >= inner_width {
        app.attach_cursor - inner_width + 1
    } else {
        0
    };
    let visible_text: String = app
        .attach_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let input = Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    let cursor_x = (app.attach_cursor - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

fn render_toast(notice: &Notice, frame: &mut Frame, area: Rect) {
    let style = match notice.kind {
        NoticeKind::Error => Style::default().bg(Color::Red).fg(Color::White),
    };

    let text = format!(" {}: {} ", notice.title, notice.description);
    let width = (text.chars().count() as u16).min(area.width.saturating_sub(2));
    let toast_area = Rect::new(
        area.x + area.width.saturating_sub(width + 1),
        area.y + area.height.saturating_sub(2),
        width,
        1,
    );

    frame.render_widget(Clear, toast_area);
    frame.render_widget(Paragraph::new(text).style(style), toast_area);
}

/// Wrap text into rows of at most `width` characters, hard-breaking long
/// lines. Newlines always start a new row. Used for the draft box, where the
/// cursor position must agree exactly with what is drawn.
fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            rows.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            rows.push(chunk.iter().collect());
        }
    }
    rows
}

/// Row and column of a character index under the same wrapping as
/// `wrap_chars`.
fn cursor_row_col(text: &str, cursor: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let mut row = 0;
    let mut consumed = 0;

    for line in text.split('\n') {
        let len = line.chars().count();
        if cursor <= consumed + len {
            let offset = cursor - consumed;
            return (row + offset / width, offset % width);
        }
        consumed += len + 1; // account for the '\n'
        row += if len == 0 { 1 } else { (len + width - 1) / width };
    }

    (row, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_chars_hard_breaks_long_lines() {
        let rows = wrap_chars("abcdefgh", 3);
        assert_eq!(rows, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_chars_keeps_empty_lines() {
        let rows = wrap_chars("a\n\nb", 10);
        assert_eq!(rows, vec!["a", "", "b"]);
    }

    #[test]
    fn test_cursor_position_follows_wrapping() {
        // "abcdef" wrapped at 3: rows "abc" / "def"
        assert_eq!(cursor_row_col("abcdef", 0, 3), (0, 0));
        assert_eq!(cursor_row_col("abcdef", 4, 3), (1, 1));
    }

    #[test]
    fn test_cursor_position_after_newline() {
        // "ab\ncd": cursor after the newline sits at the start of row 1
        assert_eq!(cursor_row_col("ab\ncd", 3, 10), (1, 0));
        assert_eq!(cursor_row_col("ab\ncd", 5, 10), (1, 2));
    }

    #[test]
    fn test_cursor_at_end_of_text() {
        assert_eq!(cursor_row_col("", 0, 10), (0, 0));
        assert_eq!(cursor_row_col("ab", 2, 10), (0, 2));
    }
}
