use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

const WHEEL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.pin_chat_if_at_end(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(event) => app.apply_reply(event),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Page scrolling works while typing too
    let page = app.chat_height.max(1);
    match (key.code, app.input_mode) {
        (KeyCode::PageDown, _) => app.scroll_chat_down(page),
        (KeyCode::PageUp, _) => app.scroll_chat_up(page),
        (_, InputMode::Normal) => handle_normal_mode(app, key),
        (_, InputMode::Editing) => handle_editing_mode(app, key),
    }
}

fn focus_input(app: &mut App) {
    app.focus = FocusPane::Input;
    app.input_mode = InputMode::Editing;
    app.cursor_end();
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => {
            app.focus = app.focus.next();
            if app.focus == FocusPane::Input {
                focus_input(app);
            }
        }

        KeyCode::Char('i') => focus_input(app),

        // Half-page scroll (must be before plain 'd'/'u' to match first)
        KeyCode::Char('d') if ctrl => app.scroll_chat_down(app.half_page()),
        KeyCode::Char('u') if ctrl => app.scroll_chat_up(app.half_page()),

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Reference => app.reference.select_next(),
            FocusPane::Chat => app.scroll_chat_down(1),
            FocusPane::Input => {}
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Reference => app.reference.select_prev(),
            FocusPane::Chat => app.scroll_chat_up(1),
            FocusPane::Input => {}
        },

        KeyCode::Enter | KeyCode::Char(' ') => match app.focus {
            FocusPane::Reference => app.reference.toggle_selected(),
            FocusPane::Input if key.code == KeyCode::Enter => focus_input(app),
            _ => {}
        },

        KeyCode::Char('g') if app.focus == FocusPane::Chat => app.chat_scroll = 0,
        KeyCode::Char('G') if app.focus == FocusPane::Chat => app.scroll_chat_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = app.focus.next();
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_reference = app.reference_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_chat_down(WHEEL_LINES);
            } else if in_reference {
                app.reference.scroll = app.reference.scroll.saturating_add(WHEEL_LINES);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_chat_up(WHEEL_LINES);
            } else if in_reference {
                app.reference.scroll = app.reference.scroll.saturating_sub(WHEEL_LINES);
            }
        }
        _ => {}
    }
}
