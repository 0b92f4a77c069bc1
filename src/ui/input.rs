//! Keyboard and mouse handling.

use crate::app::{App, PRICE_STEP};
use crate::gesture::PullRelease;
use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use super::{Action, ROW_HEIGHT_PX};

/// Rows scrolled per mouse wheel notch.
const WHEEL_ROWS: usize = 3;

pub(super) fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if app.search_mode {
        handle_search_key(app, code);
        return Action::Continue;
    }

    let step = i64::from(PRICE_STEP);
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(app.page_rows()),
        KeyCode::PageUp => app.scroll_up(app.page_rows()),
        KeyCode::Home | KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::End | KeyCode::Char('G') => app.scroll_to_bottom(),
        KeyCode::Char('/') => app.enter_search(),
        KeyCode::Char('c') => app.cycle_category(),
        KeyCode::Char('b') => app.cycle_brand(),
        KeyCode::Char('i') => app.toggle_in_stock(),
        KeyCode::Char('[') => app.adjust_max_price(-step),
        KeyCode::Char(']') => app.adjust_max_price(step),
        KeyCode::Char('{') => app.adjust_min_price(-step),
        KeyCode::Char('}') => app.adjust_min_price(step),
        KeyCode::Char('s') => app.cycle_sort(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('x') => app.clear_filters(),
        KeyCode::Char('n') | KeyCode::Enter => app.load_more(),
        _ => {}
    }
    Action::Continue
}

fn handle_search_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc | KeyCode::Enter => app.exit_search(),
        KeyCode::Backspace => app.search_pop(),
        KeyCode::Char(c) if !c.is_control() => app.search_push(c),
        _ => {}
    }
}

pub(super) fn handle_mouse(app: &mut App, event: MouseEvent) {
    let y = f32::from(event.row) * ROW_HEIGHT_PX;
    match event.kind {
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_ROWS),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_ROWS),
        MouseEventKind::Down(MouseButton::Left) => {
            let at_top = app.at_top();
            app.engine.pull_start(y, at_top);
        }
        MouseEventKind::Drag(MouseButton::Left) if app.engine.is_pulling() => {
            app.engine.pull_move(y);
        }
        MouseEventKind::Up(MouseButton::Left) => match app.engine.pull_release() {
            PullRelease::Refresh => {
                app.set_status("Reshuffling feed...");
                app.sync_generation();
            }
            PullRelease::Cancelled | PullRelease::Ignored => {}
        },
        _ => return,
    }
    app.needs_redraw = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MockCatalog, SortKey};
    use crate::config::Config;
    use crate::feed::{FeedEngine, FeedEvent};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn app() -> (App, mpsc::Receiver<FeedEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let source = Arc::new(MockCatalog::new().with_latency(Duration::ZERO));
        let engine = FeedEngine::new(source, &Config::default(), tx).unwrap();
        (App::new(engine), rx)
    }

    fn mouse(kind: MouseEventKind, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column: 10,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut app, _rx) = app();
        assert!(matches!(
            handle_key(&mut app, KeyCode::Char('q'), KeyModifiers::NONE),
            Action::Quit
        ));
        assert!(matches!(
            handle_key(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL),
            Action::Quit
        ));
    }

    #[tokio::test]
    async fn test_search_mode_captures_letters() {
        let (mut app, _rx) = app();
        handle_key(&mut app, KeyCode::Char('/'), KeyModifiers::NONE);
        for c in "quit".chars() {
            assert!(matches!(
                handle_key(&mut app, KeyCode::Char(c), KeyModifiers::NONE),
                Action::Continue
            ));
        }
        assert_eq!(app.search_input, "quit");
        handle_key(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.search_mode);
    }

    #[tokio::test]
    async fn test_sort_key_cycles() {
        let (mut app, _rx) = app();
        handle_key(&mut app, KeyCode::Char('s'), KeyModifiers::NONE);
        assert_eq!(app.engine.query().sort(), SortKey::PriceAsc);
    }

    #[tokio::test]
    async fn test_long_drag_from_top_reshuffles() {
        let (mut app, _rx) = app();
        let seed = app.engine.query().feed_seed();

        handle_mouse(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 2));
        // 20 rows * 8px * 0.5 damping = 80 >= 60
        handle_mouse(&mut app, mouse(MouseEventKind::Drag(MouseButton::Left), 22));
        assert!(app.engine.pull_armed());
        handle_mouse(&mut app, mouse(MouseEventKind::Up(MouseButton::Left), 22));

        assert_eq!(app.engine.query().feed_seed(), seed + 1);
    }

    #[tokio::test]
    async fn test_short_drag_does_nothing() {
        let (mut app, _rx) = app();
        handle_mouse(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 2));
        // 10 rows * 8px * 0.5 = 40 < 60
        handle_mouse(&mut app, mouse(MouseEventKind::Drag(MouseButton::Left), 12));
        handle_mouse(&mut app, mouse(MouseEventKind::Up(MouseButton::Left), 12));
        assert_eq!(app.engine.query().feed_seed(), 0);
    }
}
