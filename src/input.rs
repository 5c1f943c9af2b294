use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::models::Screen;

/// Applies one key press. Returns `Ok(true)` when the app should quit.
pub fn handle_key(key: KeyEvent, app: &mut App) -> Result<bool> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    match app.screen {
        Screen::Summary => match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('r') => {
                // Inert while a manual refresh is already running.
                app.refresh_now();
            }
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => app.open_selected(),
            _ => {}
        },
        Screen::Detail => match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => app.close_detail(),
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(detail) = app.detail.as_mut() {
                    detail.scroll_down();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(detail) = app.detail.as_mut() {
                    detail.scroll_up();
                }
            }
            _ => {}
        },
    }
    Ok(false)
}
