use std::time::Instant;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, ListItem, Paragraph, Row, Table, Tabs, Wrap},
};

use crate::chant::lines::DisplayMode;
use crate::chant::player::PlayerState;

use super::app::App;
use super::widgets::{centered_rect, control_style, draw_list_panel, draw_modal_text, modal_block};

const HELP: &str = "\
Chant
  Enter or s   start chant for the selected tab

Tabs
  ←/→          previous / next tab
  Tab          next tab
  1-5          jump to tab

Table
  PgUp or [    previous page
  PgDn or ]    next page
  r            reload page

Other
  l            logs
  h or ?       help
  q            quit
  Esc          close modal";

pub(crate) fn draw(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let titles: Vec<Line> = DisplayMode::ALL
        .iter()
        .enumerate()
        .map(|(i, mode)| Line::from(format!("{} {}", i + 1, mode.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.mode.index())
        .block(Block::default().borders(Borders::ALL).title("chant"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    f.render_widget(tabs, chunks[0]);

    draw_chant(f, app, chunks[1]);
    draw_table(f, app, chunks[2]);

    let table = &app.table;
    let pagination = Line::from(vec![
        Span::styled("◀ Prev", control_style(table.prev_enabled())),
        Span::raw("  "),
        Span::raw(table.indicator().to_string()),
        Span::raw("  "),
        Span::styled("Next ▶", control_style(table.next_enabled())),
    ]);
    f.render_widget(
        Paragraph::new(pagination).alignment(Alignment::Center),
        chunks[3],
    );
    f.render_widget(Paragraph::new(Line::from(app.status.as_str())), chunks[4]);
    f.render_widget(
        Paragraph::new(Line::from(
            "keys: Enter chant | ←/→ tab | PgUp/PgDn page | r reload | l logs | h help | q quit",
        )),
        chunks[5],
    );

    if app.help_open {
        let area = centered_rect(60, 70, f.area());
        f.render_widget(Clear, area);
        f.render_widget(draw_modal_text("Help", HELP), area);
    }

    if app.logs_open {
        let area = centered_rect(90, 80, f.area());
        f.render_widget(Clear, area);
        let inner = modal_block("").inner(area);
        let height = inner.height as usize;
        let total = app.logs.len();
        let end = total.saturating_sub(app.logs_scroll);
        let start = end.saturating_sub(height);
        let mut items: Vec<ListItem> = app
            .logs
            .iter()
            .skip(start)
            .take(end - start)
            .map(|line| ListItem::new(line.as_str()))
            .collect();
        if items.is_empty() {
            items.push(ListItem::new("<no logs>"));
        }
        f.render_widget(
            draw_list_panel("Logs (Esc to close, ↑/↓ scroll)", items),
            area,
        );
    }
}

fn draw_chant(f: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let panel = app.player.view();
    let title = match app.player.state(Instant::now()) {
        PlayerState::Idle if app.is_fetching_lines() => format!("{} · fetching", app.mode.title()),
        PlayerState::Idle => app.mode.title().to_string(),
        PlayerState::Playing { index, phase } => format!(
            "line {}/{} · {}",
            index + 1,
            app.player.line_count().unwrap_or(0),
            phase.label()
        ),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let grey = panel.grey_level();
    let line = Paragraph::new(panel.text.as_str())
        .style(Style::default().fg(Color::Rgb(grey, grey, grey)).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(line, rows[0]);

    if app.trigger_visible() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "[ Enter ▶ chant ]",
                Style::default().add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center),
            rows[1],
        );
    }
}

fn draw_table(f: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let table = &app.table;
    let title = format!("{} · page {}", app.mode.title(), table.current_page());
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some(err) = app.table_error.as_deref() {
        f.render_widget(
            Paragraph::new(format!("error: {err}"))
                .block(block)
                .wrap(Wrap { trim: true }),
            area,
        );
        return;
    }

    let header = Row::new(table.headers().iter().map(|h| Cell::from(h.as_str())))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = table
        .rows()
        .iter()
        .map(|row| Row::new(row.iter().map(|cell| Cell::from(cell.as_str()))));
    let widths = vec![Constraint::Fill(1); table.headers().len().max(1)];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}
