use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any state
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => {
            if !app.cancel_reply() {
                app.should_quit = true;
            }
            return;
        }
        KeyCode::Up => {
            app.scroll_up();
            return;
        }
        KeyCode::Down => {
            app.scroll_down();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_page_up();
            return;
        }
        KeyCode::PageDown => {
            app.scroll_page_down();
            return;
        }
        _ => {}
    }

    // The input box is disabled while a reply is in flight
    if app.is_busy() {
        return;
    }

    match key.code {
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => app.delete_back(),
        KeyCode::Delete => app.delete_forward(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(),
        MouseEventKind::ScrollUp => app.scroll_up(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with_reply;

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_submits_and_input_is_locked_while_busy() {
        let mut app = app_with_reply("Rest well.");
        type_text(&mut app, "tired");
        press(&mut app, KeyCode::Enter);

        assert!(app.is_busy());
        assert_eq!(app.entries().len(), 1);

        type_text(&mut app, "ignored");
        press(&mut app, KeyCode::Enter);
        assert!(app.input.is_empty());
        assert_eq!(app.entries().len(), 1);

        app.engine.run_until_idle().await;
        type_text(&mut app, "ok");
        assert_eq!(app.input, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_esc_cancels_then_quits() {
        let mut app = app_with_reply("Rest well.");
        type_text(&mut app, "tired");
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Esc);
        assert!(!app.is_busy());
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let mut app = app_with_reply("ok");
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
        assert!(app.input.is_empty());
    }
}
