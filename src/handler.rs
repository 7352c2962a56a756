use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tokio::sync::mpsc::UnboundedSender;

use crate::app::App;
use crate::chat::Submission;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { id, outcome } => {
            app.chat.resolve(id, outcome);
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('s') if ctrl => {
            app.save_latest_evidence();
            return;
        }
        KeyCode::End if ctrl => {
            app.chat.scroll_to_end();
            return;
        }
        _ => {}
    }

    if let Some(submission) = app.chat.on_key_submit(&key) {
        app.status = None;
        dispatch(app, submission, tx);
        return;
    }

    match key.code {
        // Log scrolling
        KeyCode::Up => app.chat.scroll_up(1),
        KeyCode::Down => app.chat.scroll_down(1),
        KeyCode::PageUp => {
            let half = app.half_page();
            app.chat.scroll_up(half);
        }
        KeyCode::PageDown => {
            let half = app.half_page();
            app.chat.scroll_down(half);
        }

        // Input editing
        KeyCode::Backspace => app.chat.backspace(),
        KeyCode::Delete => app.chat.delete(),
        KeyCode::Left => app.chat.move_left(),
        KeyCode::Right => app.chat.move_right(),
        KeyCode::Home => app.chat.move_home(),
        KeyCode::End => app.chat.move_end(),
        KeyCode::Char(c) if !ctrl => app.chat.insert_char(c),
        _ => {}
    }
}

/// Send the query in the background; the outcome comes back as a Reply event.
fn dispatch(app: &App, submission: Submission, tx: &UnboundedSender<AppEvent>) {
    let backend = app.backend.clone();
    let tx = tx.clone();
    let Submission { id, query } = submission;

    tokio::spawn(async move {
        let outcome = backend.ask(&query).await;
        if tx.send(AppEvent::Reply { id, outcome }).is_err() {
            tracing::debug!(%id, "event loop gone, reply dropped");
        }
    });
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat.scroll_down(3),
        MouseEventKind::ScrollUp => app.chat.scroll_up(3),
        _ => {}
    }
}
