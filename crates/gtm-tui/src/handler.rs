use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, FocusPane, InputMode};
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
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Answer { pending, result } => app.complete(pending, result),
        AppEvent::CallCount(count) => app.call_count = count,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_suggestions {
        handle_suggestions(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

fn handle_suggestions(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.show_suggestions = false,
        KeyCode::Char('j') | KeyCode::Down => app.suggestion_down(),
        KeyCode::Char('k') | KeyCode::Up => app.suggestion_up(),
        KeyCode::Enter => {
            if let Some(i) = app.suggestion_state.selected() {
                app.ask_suggestion(i);
            }
        }
        KeyCode::Char(c @ '1'..='5') => {
            app.ask_suggestion(c as usize - '1' as usize);
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Start typing
        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('g') => match app.focus {
            FocusPane::History if !app.conversation.history().is_empty() => {
                app.history_state.select(Some(0));
            }
            FocusPane::Main if app.is_welcome() => app.card_state.select(Some(0)),
            _ => app.scroll_to_top(),
        },
        KeyCode::Char('G') => match app.focus {
            FocusPane::History if !app.conversation.history().is_empty() => {
                app.history_state.select(Some(app.conversation.history().len() - 1));
            }
            FocusPane::Main if app.is_welcome() => {
                app.card_state.select(Some(app.team.questions().len() - 1));
            }
            _ => app.scroll_to_bottom(),
        },

        KeyCode::Enter => match app.focus {
            FocusPane::History => app.replay_selected(),
            FocusPane::Main if app.is_welcome() => app.ask_selected_card(),
            FocusPane::Main => app.input_mode = InputMode::Editing,
        },

        // Question cards by number
        KeyCode::Char(c @ '1'..='4') if app.is_welcome() => {
            app.ask_card(c as usize - '1' as usize);
        }

        // Teams
        KeyCode::Char('h') | KeyCode::Left if app.is_welcome() => app.prev_team(),
        KeyCode::Char('l') | KeyCode::Right if app.is_welcome() => app.next_team(),
        KeyCode::Char('t') => app.next_team(),

        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('H') => app.toggle_history(),
        KeyCode::Char('s') => app.open_suggestions(),
        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('C') => app.clear_history(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_input(),
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.toggle_focus();
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
