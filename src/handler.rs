use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Completed(completion) => app.handle_completion(completion),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,

        // Buttons
        KeyCode::Char('m') => app.toggle_mode(),
        KeyCode::Char('c') => {
            app.clear_history();
        }

        // Abort anything still waiting on the backend
        KeyCode::Esc => app.cancel_pending(),

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Pasted text goes in at the cursor as one line, since Enter sends
fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode != InputMode::Editing {
        return;
    }

    let flattened: String = text
        .chars()
        .filter(|c| *c != '\r')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();

    let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
    app.input.insert_str(byte_pos, &flattened);
    app.input_cursor += flattened.chars().count();
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn hit(area: Option<Rect>, mouse: &MouseEvent) -> bool {
    area.is_some_and(|rect| point_in_rect(mouse.column, mouse.row, rect))
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if hit(app.send_button, &mouse) {
                // Same path as Enter in the input box
                app.submit_input();
            } else if hit(app.clear_button, &mouse) {
                app.clear_history();
            } else if hit(app.mode_button, &mouse) {
                app.toggle_mode();
            } else if hit(app.input_area, &mouse) {
                app.input_mode = InputMode::Editing;
            } else if hit(app.chat_area, &mouse) {
                app.input_mode = InputMode::Normal;
            }
        }
        MouseEventKind::ScrollDown => app.scroll_down(),
        MouseEventKind::ScrollUp => app.scroll_up(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatClient, ChatMode};
    use crossterm::event::{KeyEventKind, KeyEventState};
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn click(column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn offline_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            ChatClient::new("http://127.0.0.1:9"),
            Some("S".to_string()),
            ChatMode::Chat,
            tx,
        );
        (app, rx)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 10), s.len());
    }

    #[tokio::test]
    async fn test_editing_with_cursor() {
        let (mut app, _rx) = offline_app();
        type_text(&mut app, "hllo");
        handle_event(&mut app, key(KeyCode::Home)).unwrap();
        handle_event(&mut app, key(KeyCode::Right)).unwrap();
        type_text(&mut app, "e");
        assert_eq!(app.input, "hello");

        handle_event(&mut app, key(KeyCode::End)).unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.input, "hell");

        handle_event(&mut app, key(KeyCode::Home)).unwrap();
        handle_event(&mut app, key(KeyCode::Delete)).unwrap();
        assert_eq!(app.input, "ell");
        assert_eq!(app.input_cursor, 0);
    }

    #[tokio::test]
    async fn test_paste_inserts_at_cursor_as_one_line() {
        let (mut app, _rx) = offline_app();
        type_text(&mut app, "ab");
        handle_event(&mut app, key(KeyCode::Left)).unwrap();
        handle_event(&mut app, AppEvent::Paste("x\r\nyé".to_string())).unwrap();

        assert_eq!(app.input, "ax yéb");
        assert_eq!(app.input_cursor, 5);
        assert!(!app.is_loading());

        // Ignored outside editing mode
        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        handle_event(&mut app, AppEvent::Paste("zzz".to_string())).unwrap();
        assert_eq!(app.input, "ax yéb");
    }

    #[tokio::test]
    async fn test_enter_and_send_button_are_the_same_trigger() {
        let (mut app, _rx) = offline_app();
        app.send_button = Some(Rect::new(50, 20, 8, 3));

        type_text(&mut app, "first");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.requests.pending_prompts().collect::<Vec<_>>(), vec!["first"]);

        type_text(&mut app, "second");
        handle_event(&mut app, click(52, 21)).unwrap();
        assert_eq!(
            app.requests.pending_prompts().collect::<Vec<_>>(),
            vec!["first", "second"]
        );
        app.cancel_pending();
    }

    #[tokio::test]
    async fn test_whitespace_enter_does_nothing() {
        let (mut app, _rx) = offline_app();
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn test_mode_button_and_key_toggle() {
        let (mut app, _rx) = offline_app();
        app.mode_button = Some(Rect::new(70, 20, 15, 3));

        handle_event(&mut app, click(71, 20)).unwrap();
        assert_eq!(app.mode, ChatMode::Search);

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_event(&mut app, key(KeyCode::Char('m'))).unwrap();
        assert_eq!(app.mode, ChatMode::Chat);
    }

    #[tokio::test]
    async fn test_clear_key_starts_clear_request() {
        let (mut app, _rx) = offline_app();
        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        handle_event(&mut app, key(KeyCode::Char('c'))).unwrap();
        assert_eq!(app.requests.len(), 1);
        assert_eq!(app.requests.pending_prompts().count(), 0);
        app.cancel_pending();
    }

    #[tokio::test]
    async fn test_esc_in_normal_mode_cancels_requests() {
        let (mut app, _rx) = offline_app();
        type_text(&mut app, "hello");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.is_loading());

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert!(app.is_loading());
        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_editing() {
        let (mut app, _rx) = offline_app();
        let ctrl_c = AppEvent::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        });
        handle_event(&mut app, ctrl_c).unwrap();
        assert!(app.should_quit);
        assert!(app.input.is_empty());
    }
}
