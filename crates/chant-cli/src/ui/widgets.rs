use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

pub(crate) fn modal_block(title: &str) -> Block<'_> {
    Block::default().title(title).borders(Borders::ALL)
}

pub(crate) fn draw_modal_text<'a>(title: &'a str, body: &'a str) -> Paragraph<'a> {
    Paragraph::new(body).block(modal_block(title))
}

pub(crate) fn draw_list_panel<'a>(title: &'a str, items: Vec<ListItem<'a>>) -> List<'a> {
    List::new(items).block(modal_block(title))
}

/// Style for a control that may be disabled.
pub(crate) fn control_style(enabled: bool) -> Style {
    if enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
