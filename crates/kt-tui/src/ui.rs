//! UI rendering for the dashboard

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Tabs},
    Frame,
};

use crate::dashboard::Dashboard;

/// Draw the whole dashboard: view tabs, the active table, and the menu bar.
pub fn draw(frame: &mut Frame, dashboard: &mut Dashboard) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Table
            Constraint::Length(1), // Menu bar
        ])
        .split(frame.area());

    draw_tabs(frame, dashboard, chunks[0]);
    draw_table(frame, dashboard, chunks[1]);
    draw_menu(frame, dashboard, chunks[2]);
}

/// Display title of a collection: `deployments` becomes `Deployments`.
fn title(name: &str) -> String {
    let mut chars = name.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn draw_tabs(frame: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let titles: Vec<String> = dashboard.view_names().into_iter().map(title).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", dashboard.namespace())),
        )
        .select(dashboard.active())
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    frame.render_widget(tabs, area);
}

fn draw_table(frame: &mut Frame, dashboard: &mut Dashboard, area: Rect) {
    let Some((grid, state, name)) = dashboard.active_parts() else {
        let empty =
            Paragraph::new("  Nothing to watch").block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };
    let Some((header, rows)) = grid.split_first() else {
        return;
    };

    let widths: Vec<Constraint> = (0..header.len())
        .map(|column| {
            let widest = grid
                .iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            Constraint::Length(u16::try_from(widest).unwrap_or(u16::MAX))
        })
        .collect();

    let header_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Green)
        .add_modifier(Modifier::BOLD);
    let header = Row::new(header.iter().map(String::as_str)).style(header_style);
    let rows = rows.iter().map(|row| Row::new(row.iter().map(String::as_str)));

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(2)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title(name)))
                .title_style(Style::default().fg(Color::Cyan)),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .cell_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(table, area, state);
}

fn draw_menu(frame: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let key = Style::default().fg(Color::Black).bg(Color::Cyan);
    let mut spans = Vec::new();

    for (index, name) in dashboard.view_names().into_iter().enumerate().take(12) {
        spans.push(Span::styled(format!("F{}", index + 1), key));
        spans.push(Span::raw(format!(" {} ", title(name))));
    }
    spans.push(Span::styled("Q", key));
    spans.push(Span::raw(" Quit  "));
    spans.push(Span::styled(
        format!("namespace: {}", dashboard.namespace()),
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
