use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, FocusPane, InputMode, TextInput};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.settings.is_some() {
        handle_settings(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_question_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Workspaces => FocusPane::Question,
                FocusPane::Question => FocusPane::Answer,
                FocusPane::Answer => FocusPane::Workspaces,
            };
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Workspaces => app.workspace_nav_down(),
            FocusPane::Answer => app.scroll_answer_down(),
            FocusPane::Question => {}
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Workspaces => app.workspace_nav_up(),
            FocusPane::Answer => app.scroll_answer_up(),
            FocusPane::Question => {}
        },

        // Picking a workspace moves straight on to the question
        KeyCode::Enter if app.focus != FocusPane::Answer => {
            app.focus = FocusPane::Question;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('i') => {
            app.focus = FocusPane::Question;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('s') => app.open_settings(),
        KeyCode::Char('r') => app.refresh_workspaces(),
        KeyCode::Esc => app.notice = None,

        _ => {}
    }
}

fn handle_question_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // Rejections are reported through app.notice
            if app.submit_question().is_ok() {
                app.input_mode = InputMode::Normal;
                app.focus = FocusPane::Answer;
            }
        }
        _ => edit_text(&mut app.question, key),
    }
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_settings(),
        KeyCode::Enter => app.apply_settings(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            if let Some(form) = app.settings.as_mut() {
                form.toggle_field();
            }
        }
        _ => {
            if let Some(form) = app.settings.as_mut() {
                edit_text(form.active_input(), key);
            }
        }
    }
}

fn edit_text(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) => input.insert(c),
        _ => {}
    }
}
