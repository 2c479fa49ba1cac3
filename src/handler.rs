use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode};
use crate::chat::char_to_byte_index;
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if app.show_attach_prompt {
        handle_attach_prompt(app, key).await;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Compose
        KeyCode::Char('i') | KeyCode::Char('a') => {
            app.input_mode = InputMode::Editing;
            // Cursor at end of existing text
            app.draft_cursor = app.session.conversation().draft().text.chars().count();
        }

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        // Attachment
        KeyCode::Char('o') => app.open_attach_prompt(),
        KeyCode::Char('x') => app.clear_attachment(),

        // Copy the latest message (image attachments go along as a data URL)
        KeyCode::Char('c') => {
            if let Some(message) = app.session.conversation().messages().last() {
                let mut text = message.text.clone();
                if let Some(image) = &message.image {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&image.data_url());
                }
                copy_to_clipboard(&text);
            }
        }

        _ => {}
    }
}

fn copy_to_clipboard(text: &str) {
    use std::io::Write;
    use std::process::{Command, Stdio};

    for tool in ["pbcopy", "wl-copy", "xclip"] {
        let mut command = Command::new(tool);
        if tool == "xclip" {
            command.args(["-selection", "clipboard"]);
        }
        if let Ok(mut child) = command.stdin(Stdio::piped()).spawn() {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(text.as_bytes());
            }
            break;
        }
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }

        // Enter submits; with the newline modifier it extends the draft instead
        KeyCode::Enter => {
            if key.modifiers.contains(KeyModifiers::ALT)
                || key.modifiers.contains(KeyModifiers::SHIFT)
            {
                app.session
                    .conversation_mut()
                    .insert_draft_char(app.draft_cursor, '\n');
                app.draft_cursor += 1;
            } else {
                app.submit();
            }
        }

        // Attachment (also reachable without leaving the draft)
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.open_attach_prompt();
        }
        KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_attachment();
        }

        KeyCode::Backspace => {
            if app.draft_cursor > 0 {
                app.draft_cursor -= 1;
                app.session
                    .conversation_mut()
                    .delete_draft_char(app.draft_cursor);
            }
        }
        KeyCode::Delete => {
            app.session
                .conversation_mut()
                .delete_draft_char(app.draft_cursor);
        }
        KeyCode::Left => {
            app.draft_cursor = app.draft_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.conversation().draft().text.chars().count();
            app.draft_cursor = (app.draft_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.draft_cursor = 0;
        }
        KeyCode::End => {
            app.draft_cursor = app.session.conversation().draft().text.chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.session
                .conversation_mut()
                .insert_draft_char(app.draft_cursor, c);
            app.draft_cursor += 1;
        }

        _ => {}
    }
}

async fn handle_attach_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.close_attach_prompt();
        }
        KeyCode::Enter => {
            app.stage_attachment().await;
        }
        KeyCode::Backspace => {
            if app.attach_cursor > 0 {
                app.attach_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.attach_input, app.attach_cursor);
                app.attach_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.attach_cursor = app.attach_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.attach_input.chars().count();
            app.attach_cursor = (app.attach_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.attach_cursor = 0;
        }
        KeyCode::End => {
            app.attach_cursor = app.attach_input.chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte_pos = char_to_byte_index(&app.attach_input, app.attach_cursor);
            app.attach_input.insert(byte_pos, c);
            app.attach_cursor += 1;
        }
        _ => {}
    }
}
