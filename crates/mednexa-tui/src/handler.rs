use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode, Screen};
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch.
const WHEEL_LINES: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('l') if app.screen == Screen::Chat => {
                app.clear_chat();
                return;
            }
            _ => {}
        }
    }

    match (app.screen, app.input_mode) {
        (Screen::Chat, InputMode::Editing) => handle_chat_editing(app, key),
        (Screen::Chat, InputMode::Normal) => handle_chat_normal(app, key),
        (Screen::Reports, _) => handle_reports(app, key),
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }

        // Tab cycles focus, skipping the picker when nothing is offered
        KeyCode::Tab => {
            let has_options = !app.clarification_options().is_empty();
            app.focus = match app.focus {
                FocusPane::Transcript if has_options => FocusPane::Clarifications,
                FocusPane::Transcript | FocusPane::Clarifications => FocusPane::Input,
                FocusPane::Input => FocusPane::Transcript,
            };
            if app.focus == FocusPane::Clarifications && app.clarification_state.selected().is_none() {
                app.clarification_state.select(Some(0));
            }
            if app.focus == FocusPane::Input {
                app.input_mode = InputMode::Editing;
            }
        }

        KeyCode::Char('j') | KeyCode::Down => {
            if app.focus == FocusPane::Clarifications {
                app.clarification_nav_down();
            } else {
                app.scroll_down(1);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.focus == FocusPane::Clarifications {
                app.clarification_nav_up();
            } else {
                app.scroll_up(1);
            }
        }
        KeyCode::Char('g') => {
            app.follow_tail = false;
            app.chat_scroll = 0;
        }
        KeyCode::Char('G') => app.follow_tail = true,

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down((app.chat_height / 2).max(1));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up((app.chat_height / 2).max(1));
        }

        KeyCode::Enter => {
            if app.focus == FocusPane::Clarifications {
                app.select_clarification();
            } else {
                app.focus = FocusPane::Input;
                app.input_mode = InputMode::Editing;
            }
        }

        KeyCode::Char('d') => app.download_latest_report(),
        KeyCode::Char('C') => app.clear_chat(),
        KeyCode::Char('R') => app.open_reports(),

        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Transcript;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Transcript;
        }
        KeyCode::Enter => {
            app.submit_query();
        }
        KeyCode::Backspace => {
            if app.query_cursor > 0 {
                app.query_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.query_input.chars().count();
            if app.query_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.query_cursor = app.query_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.query_input.chars().count();
            app.query_cursor = (app.query_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.query_cursor = 0;
        }
        KeyCode::End => {
            app.query_cursor = app.query_input.chars().count();
        }
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert(byte_pos, c);
            app.query_cursor += 1;
        }
        _ => {}
    }
}

fn handle_reports(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => app.back_to_chat(),
        KeyCode::Char('j') | KeyCode::Down => app.reports_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.reports_nav_up(),
        KeyCode::Char('g') => {
            if !app.reports.is_empty() {
                app.reports_state.select(Some(0));
            }
        }
        KeyCode::Char('G') => {
            if !app.reports.is_empty() {
                app.reports_state.select(Some(app.reports.len() - 1));
            }
        }
        KeyCode::Enter => app.request_report_pdf(),
        KeyCode::Char('r') => app.refresh_reports(),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);
    let in_transcript = app.transcript_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_list = app.list_area.is_some_and(|r| point_in_rect(x, y, r));

    match (mouse.kind, app.screen) {
        (MouseEventKind::ScrollDown, Screen::Chat) => {
            if in_list {
                app.clarification_nav_down();
            } else if in_transcript {
                app.scroll_down(WHEEL_LINES);
            }
        }
        (MouseEventKind::ScrollUp, Screen::Chat) => {
            if in_list {
                app.clarification_nav_up();
            } else if in_transcript {
                app.scroll_up(WHEEL_LINES);
            }
        }
        (MouseEventKind::ScrollDown, Screen::Reports) if in_list => app.reports_nav_down(),
        (MouseEventKind::ScrollUp, Screen::Reports) if in_list => app.reports_nav_up(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use crossterm::event::KeyEventKind;
    use mednexa_core::{AnalysisClient, Responder};
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app() -> App {
        let client = AnalysisClient::new("http://127.0.0.1:9");
        let responder = Responder::new(Arc::new(client.clone()));
        App::new(client, responder, std::env::temp_dir())
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn char_index_maps_multibyte_text() {
        assert_eq!(char_to_byte_index("αβγ", 2), 4);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn editing_inserts_at_cursor() {
        let mut app = app();
        type_text(&mut app, "oncolgy");
        handle_key(&mut app, key(KeyCode::Left));
        handle_key(&mut app, key(KeyCode::Left));
        type_text(&mut app, "o");
        assert_eq!(app.query_input, "oncology");
        handle_key(&mut app, key(KeyCode::Home));
        handle_key(&mut app, key(KeyCode::Delete));
        assert_eq!(app.query_input, "ncology");
        assert_eq!(app.query_cursor, 0);
    }

    #[tokio::test]
    async fn enter_sends_and_clears_input() {
        let mut app = app();
        type_text(&mut app, "patent cliffs");
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.query_input.is_empty());
        assert!(app.session.is_loading());
        assert_eq!(app.session.messages()[1].content, "patent cliffs");
    }

    #[test]
    fn blank_input_is_not_sent() {
        let mut app = app();
        type_text(&mut app, "   ");
        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.messages().len(), 1);
        assert!(!app.session.is_loading());
    }

    #[test]
    fn tab_skips_picker_without_options() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Esc));
        assert_eq!(app.focus, FocusPane::Transcript);
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut app = app();
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn resize_leaves_state_alone() {
        let mut app = app();
        type_text(&mut app, "exim");
        handle_event(&mut app, AppEvent::Resize).await.unwrap();
        assert!(!app.should_quit);
        assert_eq!(app.query_input, "exim");
        assert_eq!(app.session.messages().len(), 1);
    }
}
