use crate::app::App;
use crate::render::RenderStrategy;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

/// Render the status bar: message or key hints on the left, feed position on
/// the right.
pub fn render(f: &mut Frame, app: &App, area: Rect, strategy: RenderStrategy) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: &str = if let Some((msg, _)) = &app.status_message {
        msg.as_ref()
    } else if app.search_mode {
        "Type to search | ESC/ENTER done"
    } else {
        "[/]search [c]ategory [b]rand [i]n-stock [ ] { }price [s]ort [r]eshuffle [n]ext [x]clear [q]uit"
    };

    let state = app.engine.state();
    let pagination = app.engine.pagination();
    let (hits, misses) = app.engine.cache_stats();
    let mode = match strategy {
        RenderStrategy::Direct => "direct",
        RenderStrategy::Windowed => "windowed",
    };
    let position = format!(
        " {}/{} | p{} | cache {}/{} | {} ",
        state.items.len(),
        pagination.total,
        pagination.current,
        hits,
        hits + misses,
        mode
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(position.len() as u16),
        ])
        .split(area);

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), chunks[0]);
    f.render_widget(
        Paragraph::new(position).style(style.fg(Color::Cyan)),
        chunks[1],
    );
}
