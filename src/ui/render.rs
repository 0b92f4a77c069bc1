//! Frame rendering.
//!
//! Layout, top to bottom: filter header, pull indicator (only while a pull
//! is in progress), product list, status bar. The list is drawn either by
//! enumerating every product or as a window over the viewport, following the
//! engine's render plan; the plan drawn is then reported back to the engine
//! so the scroll trigger sees what is on screen.

use crate::app::App;
use crate::catalog::{FilterState, Product};
use crate::render::{RenderPlan, RenderStrategy};
use crate::util::{display_width, format_price, sanitize, truncate_to_width};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{status, ROW_HEIGHT_PX};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 50;
pub(super) const MIN_HEIGHT: u16 = 10;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub(super) const SPINNER_FRAMES: usize = SPINNER.len();

pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let pull_rows = (app.engine.pull_offset() / ROW_HEIGHT_PX).ceil() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(pull_rows.min(area.height / 3)),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    if pull_rows > 0 {
        render_pull_indicator(f, app, chunks[1]);
    }

    let block = Block::default().borders(Borders::ALL).title(" Products ");
    let list_area = block.inner(chunks[2]);
    f.render_widget(block, chunks[2]);

    app.viewport_height = list_area.height as usize;
    let plan = app.engine.render_plan(app.viewport());
    render_list(f, app, &plan, list_area);
    status::render(f, app, chunks[3], plan.strategy);

    app.engine.observe_render(&plan);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let query = app.engine.query();
    let draft = query.draft();
    let label = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled("Sort ", label),
        Span::raw(query.sort().label()),
        Span::styled("  Category ", label),
        Span::raw(or_all(&draft.category)),
        Span::styled("  Brand ", label),
        Span::raw(or_all(&draft.brand)),
        Span::styled("  Price ", label),
        Span::raw(format!(
            "{}-{}",
            format_price(draft.price_range.min()),
            format_price(draft.price_range.max())
        )),
    ];
    if draft.in_stock {
        spans.push(Span::styled("  In stock only", Style::default().fg(Color::Green)));
    }

    let search = if app.search_mode {
        Some(format!("{}_", app.search_input))
    } else if !draft.search.is_empty() {
        Some(draft.search.clone())
    } else {
        None
    };
    if let Some(search) = search {
        spans.push(Span::styled("  Search ", label));
        spans.push(Span::styled(search, Style::default().fg(Color::Yellow)));
    }
    if is_pending(draft, query.applied()) {
        spans.push(Span::styled("  (pending)", label.add_modifier(Modifier::ITALIC)));
    }

    let border = if app.search_mode {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" shelf "),
    );
    f.render_widget(header, area);
}

fn is_pending(draft: &FilterState, applied: &FilterState) -> bool {
    draft != applied
}

fn or_all(value: &str) -> &str {
    if value.is_empty() {
        "All"
    } else {
        value
    }
}

fn render_pull_indicator(f: &mut Frame, app: &App, area: Rect) {
    let (text, color) = if app.engine.pull_armed() {
        ("↑ Release to reshuffle", Color::Green)
    } else if app.engine.is_pulling() {
        ("↓ Pull to reshuffle", Color::Gray)
    } else {
        ("", Color::Gray)
    };
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(color)),
        area,
    );
}

fn render_list(f: &mut Frame, app: &App, plan: &RenderPlan, area: Rect) {
    let state = app.engine.state();

    if let Some(error) = &state.error {
        let msg = Paragraph::new(vec![
            Line::styled(
                "Could not load products",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
            Line::raw(error.as_str()),
            Line::raw(""),
            Line::styled("[n] retry  [r] reshuffle", Style::default().fg(Color::DarkGray)),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(msg, area);
        return;
    }

    if state.items.is_empty() {
        let text = if state.loading {
            format!("{} Loading products...", SPINNER[app.spinner_frame % SPINNER_FRAMES])
        } else {
            "No products match these filters. Press x to clear.".to_string()
        };
        f.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
        return;
    }

    let extent = app.engine.render_selector().item_extent();
    let width = area.width as usize;
    let mut lines: Vec<Line> = Vec::new();
    for product in &state.items[plan.range.clone()] {
        lines.extend(product_lines(product, width, extent));
    }

    // Rows above the first laid-out item that are scrolled out of view.
    let skip = match plan.strategy {
        RenderStrategy::Direct => app.scroll_offset,
        RenderStrategy::Windowed => app.scroll_offset.saturating_sub(plan.range.start * extent),
    };
    if plan.range.end == state.items.len() {
        lines.push(sentinel_line(app, state.loading, state.has_more, state.items.len()));
    }

    let skip = skip.min(u16::MAX as usize) as u16;
    f.render_widget(Paragraph::new(lines).scroll((skip, 0)), area);
}

fn product_lines(product: &Product, width: usize, extent: usize) -> Vec<Line<'static>> {
    let price = format_price(product.price);
    let rating = format!("★{:.1}", product.rating);
    let stock = if product.in_stock {
        Span::styled("in stock", Style::default().fg(Color::Green))
    } else {
        Span::styled("sold out", Style::default().fg(Color::Red))
    };

    // name | price | rating | stock
    let fixed = display_width(&price) + display_width(&rating) + 8 + 6;
    let name = sanitize(&product.name);
    let name = truncate_to_width(&name, width.saturating_sub(fixed)).into_owned();
    let pad = width
        .saturating_sub(fixed)
        .saturating_sub(display_width(&name));

    let first = vec![
        Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(pad + 2)),
        Span::styled(price, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(rating, Style::default().fg(Color::Magenta)),
        Span::raw("  "),
        stock,
    ];
    let mut lines = vec![Line::from(first)];
    if extent >= 2 {
        let mut detail = format!(
            "  {} · {} · {} sold",
            sanitize(&product.brand),
            sanitize(&product.category),
            product.sales
        );
        if let Some(original) = product.original_price.filter(|p| *p > product.price) {
            detail.push_str(&format!(" · was {}", format_price(original)));
        }
        lines.push(Line::styled(
            truncate_to_width(&detail, width).into_owned(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    while lines.len() < extent {
        lines.push(Line::raw(""));
    }
    lines
}

fn sentinel_line(app: &App, loading: bool, has_more: bool, count: usize) -> Line<'static> {
    let text = if loading {
        format!("{} Loading more...", SPINNER[app.spinner_frame % SPINNER_FRAMES])
    } else if has_more {
        "↓ Scroll for more".to_string()
    } else {
        format!("All {count} products loaded")
    };
    Line::styled(text, Style::default().fg(Color::DarkGray)).alignment(Alignment::Center)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str) -> Product {
        Product {
            id: 1,
            name: name.to_string(),
            price: 1099,
            original_price: Some(1299),
            category: "Electronics".into(),
            brand: "Brand A".into(),
            image: None,
            description: String::new(),
            in_stock: true,
            rating: 4.25,
            review_count: 10,
            sales: 42,
            tags: Vec::new(),
        }
    }

    fn line_width(line: &Line) -> usize {
        line.spans.iter().map(|s| display_width(&s.content)).sum()
    }

    #[test]
    fn test_product_line_fits_width() {
        let lines = product_lines(&product(&"Very long product name ".repeat(5)), 60, 1);
        assert_eq!(lines.len(), 1);
        assert!(line_width(&lines[0]) <= 60);
    }

    #[test]
    fn test_extent_controls_rows() {
        let lines = product_lines(&product("Kettle"), 80, 3);
        assert_eq!(lines.len(), 3);
        let detail: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(detail.contains("Brand A · Electronics · 42 sold · was $1,299"));
    }

    #[test]
    fn test_pending_marker() {
        let applied = FilterState::default();
        let mut draft = applied.clone();
        assert!(!is_pending(&draft, &applied));
        draft.search = "tea".into();
        assert!(is_pending(&draft, &applied));
    }
}
