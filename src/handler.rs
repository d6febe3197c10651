use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, Focus, Mode, SettingsField};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string edits.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_tasks().await;
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Ctrl-C quits from any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.mode {
        Mode::Normal => handle_normal(app, key).await,
        Mode::Insert => handle_insert(app, key),
        Mode::Settings => handle_settings(app, key).await,
        Mode::UploadPrompt => handle_upload_prompt(app, key),
        Mode::History => handle_history(app, key).await,
        Mode::HistoryEdit => handle_history_edit(app, key).await,
    }

    Ok(())
}

async fn handle_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::ChatList => Focus::Thread,
                Focus::Thread => Focus::ChatList,
            };
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            Focus::ChatList => app.chat_nav_down(),
            Focus::Thread => app.scroll_thread_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            Focus::ChatList => app.chat_nav_up(),
            Focus::Thread => app.scroll_thread_up(1),
        },
        KeyCode::PageDown => app.scroll_thread_down(10),
        KeyCode::PageUp => app.scroll_thread_up(10),
        KeyCode::Char('G') => app.scroll_thread_to_bottom(),

        KeyCode::Enter => {
            if app.focus == Focus::ChatList {
                app.open_selected().await;
            }
        }

        KeyCode::Char('n') => app.new_chat().await,
        KeyCode::Char('d') => {
            if app.focus == Focus::ChatList {
                app.delete_selected().await;
            }
        }
        KeyCode::Char('x') => app.clear_current().await,
        KeyCode::Char('r') => app.refresh_chats().await,
        KeyCode::Char('s') => app.open_settings(),
        KeyCode::Char('u') => {
            app.upload_input.clear();
            app.mode = Mode::UploadPrompt;
        }
        KeyCode::Char('H') => app.open_history().await,
        KeyCode::Char('i') => {
            app.status = None;
            app.mode = Mode::Insert;
        }
        _ => {}
    }
}

fn handle_insert(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Enter => app.send(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(pos);
            }
        }
        KeyCode::Delete => {
            if app.input_cursor < app.input.chars().count() {
                let pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(pos);
            }
        }
        KeyCode::Left => app.input_cursor = app.input_cursor.saturating_sub(1),
        KeyCode::Right => {
            app.input_cursor = (app.input_cursor + 1).min(app.input.chars().count());
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        KeyCode::Char(c) => {
            let pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

async fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Tab => app.settings_field = app.settings_field.next(),
        KeyCode::Enter => app.save_settings().await,
        KeyCode::Left => {
            if app.settings_field == SettingsField::Model {
                app.model_index = app.model_index.saturating_sub(1);
            }
        }
        KeyCode::Right => {
            if app.settings_field == SettingsField::Model && !app.models.is_empty() {
                app.model_index = (app.model_index + 1).min(app.models.len() - 1);
            }
        }
        KeyCode::Backspace => {
            match app.settings_field {
                SettingsField::Title => {
                    app.title_input.pop();
                }
                SettingsField::SystemPrompt => {
                    app.prompt_input.pop();
                }
                SettingsField::Model => {}
            };
        }
        KeyCode::Char(c) => match app.settings_field {
            SettingsField::Title => app.title_input.push(c),
            SettingsField::SystemPrompt => app.prompt_input.push(c),
            SettingsField::Model => {}
        },
        _ => {}
    }
}

fn handle_upload_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.upload_input.clear();
            app.mode = Mode::Normal;
        }
        KeyCode::Enter => app.upload(),
        KeyCode::Backspace => {
            app.upload_input.pop();
        }
        KeyCode::Char(c) => app.upload_input.push(c),
        _ => {}
    }
}

async fn handle_history(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.mode = Mode::Normal,
        KeyCode::Char('j') | KeyCode::Down => app.history_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.history_nav_up(),
        KeyCode::Char('e') | KeyCode::Enter => app.begin_history_edit(),
        KeyCode::Char('d') => app.delete_history_selected().await,
        KeyCode::Char('X') => app.clear_history().await,
        KeyCode::Char('r') => app.open_history().await,
        _ => {}
    }
}

async fn handle_history_edit(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.mode = Mode::History,
        KeyCode::Enter => app.submit_history_edit().await,
        KeyCode::Backspace => {
            app.history_input.pop();
        }
        KeyCode::Char(c) => app.history_input.push(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_thread_up(3),
        MouseEventKind::ScrollDown => app.scroll_thread_down(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[tokio::test]
    async fn ctrl_c_quits_in_any_mode() {
        let mut app = App::new(Config::new());
        app.mode = Mode::Insert;
        let event = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        handle_key(&mut app, event).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn insert_mode_edits_respect_utf8_boundaries() {
        let mut app = App::new(Config::new());
        app.mode = Mode::Insert;
        for c in "héllo".chars() {
            handle_key(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        assert_eq!(app.input, "héllo");
        assert_eq!(app.input_cursor, 5);

        handle_key(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_key(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_key(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_key(&mut app, key(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.input, "hllo");
        assert_eq!(app.input_cursor, 1);
    }

    #[tokio::test]
    async fn escape_leaves_upload_prompt_and_clears_it() {
        let mut app = App::new(Config::new());
        app.mode = Mode::UploadPrompt;
        handle_key(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        assert_eq!(app.upload_input, "a");
        handle_key(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.upload_input.is_empty());
    }

    #[tokio::test]
    async fn settings_tab_cycles_fields() {
        let mut app = App::new(Config::new());
        app.mode = Mode::Settings;
        assert_eq!(app.settings_field, SettingsField::Title);
        handle_key(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.settings_field, SettingsField::SystemPrompt);
        handle_key(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.settings_field, SettingsField::Model);
        handle_key(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.settings_field, SettingsField::Title);
    }

    #[tokio::test]
    async fn model_picker_clamps_to_available_models() {
        let mut app = App::new(Config::new());
        app.mode = Mode::Settings;
        app.settings_field = SettingsField::Model;
        let last = app.models.len() - 1;
        for _ in 0..20 {
            handle_key(&mut app, key(KeyCode::Right)).await.unwrap();
        }
        assert_eq!(app.model_index, last);
        for _ in 0..20 {
            handle_key(&mut app, key(KeyCode::Left)).await.unwrap();
        }
        assert_eq!(app.model_index, 0);
    }
}
