//! TUI rendering using ratatui.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Sparkline, Table},
    Frame,
};

use crate::registry::{RelayNode, RelayStatus};
use crate::tui::app::App;
use crate::tui::types::{format_mebibytes, format_uptime, status_label, DeltaSeries};

/// Color for a relay status badge.
fn status_color(status: RelayStatus) -> Color {
    match status {
        RelayStatus::Online => Color::Green,
        RelayStatus::Idle => Color::Yellow,
        RelayStatus::Connecting => Color::Blue,
        RelayStatus::Offline => Color::Red,
    }
}

/// Main UI rendering function.
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(4), // Network overview
            Constraint::Min(6),    // Relay nodes
            Constraint::Length(7), // Delta charts
            Constraint::Length(3), // Messages (errors/info)
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0]);
    draw_overview(frame, app, chunks[1]);
    draw_nodes(frame, app, chunks[2]);
    draw_charts(frame, app, chunks[3]);
    draw_messages(frame, app, chunks[4]);
    draw_footer(frame, app, chunks[5]);
}

/// Draw the header with title and version.
fn draw_header(frame: &mut Frame, area: Rect) {
    let version = env!("CARGO_PKG_VERSION");
    let title = vec![Line::from(vec![
        Span::styled(
            "Relay Network Monitor",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(format!("v{version}"), Style::default().fg(Color::DarkGray)),
    ])];

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(title).centered().block(block), area);
}

/// Draw the network-wide totals row.
fn draw_overview(frame: &mut Frame, app: &App, area: Rect) {
    let totals = &app.totals;
    let updated = app
        .last_updated
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--".to_string());

    let line = Line::from(vec![
        Span::raw(" Relays: "),
        Span::styled(
            format!("{}/{}", totals.active_relays, totals.total_relays),
            Style::default().fg(Color::Green),
        ),
        Span::raw("   Connections: "),
        Span::styled(
            totals.total_connections.to_string(),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("   Messages: "),
        Span::styled(
            totals.total_messages.to_string(),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("   Events: "),
        Span::styled(
            totals.cluster_events.to_string(),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("   Memory: "),
        Span::raw(format_mebibytes(totals.total_memory_bytes)),
        Span::raw("   Uptime: "),
        Span::styled(
            format!("{:.1}%", totals.uptime_percentage),
            Style::default().fg(Color::Green),
        ),
        Span::raw("   Updated: "),
        Span::raw(updated),
    ]);

    let block = Block::default().borders(Borders::ALL).title(" NETWORK ");
    frame.render_widget(Paragraph::new(vec![line]).block(block), area);
}

/// One table row per relay node.
fn node_row(node: &RelayNode) -> Row<'_> {
    let runtime = &node.runtime;
    let active = runtime.status.is_active();

    let dash = || "--".to_string();
    let response = if active {
        format!("{}ms", runtime.response_time_ms)
    } else {
        dash()
    };
    let uptime = if active {
        format_uptime(runtime.uptime_secs)
    } else {
        dash()
    };
    let load = if runtime.load_percentage < 1.0 {
        format!("{:.1}%", runtime.load_percentage)
    } else {
        format!("{}%", runtime.load_percentage.round() as u64)
    };

    Row::new(vec![
        Cell::from(node.hostname.clone()),
        Cell::from(node.location.clone().unwrap_or_else(|| "Unknown Location".to_string())),
        Cell::from(status_label(runtime.status))
            .style(Style::default().fg(status_color(runtime.status))),
        Cell::from(runtime.connections.to_string()),
        Cell::from(runtime.messages_processed.to_string()),
        Cell::from(response),
        Cell::from(uptime),
        Cell::from(load),
    ])
}

/// Draw the relay node table in registry order.
fn draw_nodes(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        "Node", "Location", "Status", "Conns", "Msgs", "Resp", "Uptime", "Load",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app.nodes_ordered().map(node_row).collect();

    let widths = [
        Constraint::Length(24),
        Constraint::Length(26),
        Constraint::Length(11),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(9),
        Constraint::Length(7),
    ];

    let title = format!(" RELAY NODES ({}) ", app.node_count());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

/// One sparkline chart for a delta series.
fn draw_series(frame: &mut Frame, series: &DeltaSeries, label: &str, color: Color, area: Rect) {
    let title = if series.is_empty() {
        format!(" {label} (collecting data...) ")
    } else {
        format!(" {label} (last {}) ", series.latest().unwrap_or(0))
    };

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(series.data())
        .style(Style::default().fg(color));
    frame.render_widget(sparkline, area);
}

/// Draw the two delta charts side by side.
fn draw_charts(frame: &mut Frame, app: &App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    draw_series(frame, &app.messages_series, "Messages", Color::Blue, halves[0]);
    draw_series(frame, &app.events_series, "Events", Color::Green, halves[1]);
}

/// Draw the error/info message line.
fn draw_messages(frame: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(error) = &app.error_message {
        Line::from(Span::styled(
            format!(" {error}"),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(info) = &app.info_message {
        Line::from(Span::styled(
            format!(" {info}"),
            Style::default().fg(Color::Green),
        ))
    } else {
        Line::from(Span::styled(
            " All systems normal",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(vec![line]).block(block), area);
}

/// Draw the footer with key hints and the first relay endpoints.
fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let endpoints: Vec<String> = app
        .nodes_ordered()
        .take(4)
        .map(|n| n.ws_url.clone())
        .collect();

    let line = Line::from(vec![
        Span::styled("[Q]", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit  "),
        Span::styled("[R]", Style::default().fg(Color::Yellow)),
        Span::raw(" Redraw   "),
        Span::styled(endpoints.join("  "), Style::default().fg(Color::DarkGray)),
    ]);

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(vec![line]).block(block), area);
}
