//! Terminal User Interface Module
//!
//! Interactive terminal dashboard for the relay network: one card per
//! relay node, network-wide totals, and two delta sparklines. The UI is
//! fed exclusively through a [`TuiEvent`] channel; discovery and polling
//! run as background tasks and never touch the terminal.
//!
//! # Architecture
//!
//! ```text
//! ╔══════════════════════════════════════════════════════════════════╗
//! ║                    Relay Network Monitor v0.3                    ║
//! ╠══════════════════════════════════════════════════════════════════╣
//! ║ NETWORK  Relays: 4/4  Connections: 312  Events: 88412  99.8%     ║
//! ╠══════════════════════════════════════════════════════════════════╣
//! ║ RELAY NODES (4)                                                  ║
//! ║ Node               Location        Status  Conns  Resp   Uptime  ║
//! ║ shu01.shugur.net   New York, US    Online  124    38ms   12d 4h  ║
//! ╠═════════════════════════════╦════════════════════════════════════╣
//! ║ Messages ▂▃▅▂▇▅▃            ║ Events ▁▂▁▃▂▁▂                     ║
//! ╠═════════════════════════════╩════════════════════════════════════╣
//! ║ [Q] Quit  [R] Redraw   wss://shu01.shugur.net ...                ║
//! ╚══════════════════════════════════════════════════════════════════╝
//! ```

mod app;
mod types;
mod ui;

pub use app::{App, AppState, InputEvent};
pub use types::{format_mebibytes, format_uptime, status_label, DeltaSeries};

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use crate::poller::NetworkTotals;
use crate::registry::RelayNode;

/// Events that can be sent to the TUI from other parts of the application.
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// A node the view has not seen before was discovered.
    NodeDiscovered(Box<RelayNode>),
    /// An already-known node's topology fields were refreshed.
    NodeUpdated(Box<RelayNode>),
    /// A polling pass refreshed a node's runtime fields.
    NodeRuntime(Box<RelayNode>),
    /// New network-wide totals.
    Totals(NetworkTotals),
    /// One delta sample for the chart series.
    Sample {
        /// Messages processed since the previous pass.
        messages: u64,
        /// Events stored since the previous pass.
        events: u64,
    },
    /// Set info message.
    Info(String),
    /// Set error message.
    Error(String),
    /// Force quit.
    Quit,
}

/// Run the terminal UI with the given application state.
///
/// Returns when the user quits (Q key or Esc).
pub async fn run_tui(mut app: App, mut event_rx: mpsc::Receiver<TuiEvent>) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.clear()?;

    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    match InputEvent::from_key(key.code) {
                        InputEvent::Quit => app.quit(),
                        InputEvent::Refresh => {
                            terminal.clear()?;
                        }
                        InputEvent::Unknown => {}
                    }
                }
            }
        }

        // Drain application events (non-blocking).
        while let Ok(event) = event_rx.try_recv() {
            handle_tui_event(&mut app, event);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = std::time::Instant::now();
        }

        if app.should_quit() {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

/// Apply a TUI event to the application state.
fn handle_tui_event(app: &mut App, event: TuiEvent) {
    match event {
        TuiEvent::NodeDiscovered(node) => {
            app.add_node(*node);
        }
        TuiEvent::NodeUpdated(node) => {
            app.patch_node(*node);
        }
        TuiEvent::NodeRuntime(node) => {
            app.update_runtime(*node);
        }
        TuiEvent::Totals(totals) => {
            app.set_totals(totals);
        }
        TuiEvent::Sample { messages, events } => {
            app.record_sample(messages, events);
        }
        TuiEvent::Info(msg) => {
            app.set_info(&msg);
        }
        TuiEvent::Error(msg) => {
            app.set_error(&msg);
        }
        TuiEvent::Quit => {
            app.quit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClusterNode, RelayNode};

    fn node(id: &str) -> RelayNode {
        RelayNode::discovered(&ClusterNode {
            address: format!("{id}.shugur.net:26257"),
            node_id: None,
            is_live: Some(true),
            ranges: None,
            leases: None,
            started_at: None,
            server_version: None,
            sql_address: None,
        })
    }

    #[test]
    fn test_repeated_discovery_event_is_idempotent() {
        let mut app = App::new(20);

        handle_tui_event(&mut app, TuiEvent::NodeDiscovered(Box::new(node("shu04"))));
        handle_tui_event(&mut app, TuiEvent::NodeDiscovered(Box::new(node("shu04"))));

        assert_eq!(app.node_count(), 1);
    }

    #[test]
    fn test_runtime_event_updates_card() {
        let mut app = App::new(20);
        handle_tui_event(&mut app, TuiEvent::NodeDiscovered(Box::new(node("shu04"))));

        let mut update = node("shu04");
        update.runtime.connections = 55;
        handle_tui_event(&mut app, TuiEvent::NodeRuntime(Box::new(update)));

        assert_eq!(app.node("shu04").unwrap().runtime.connections, 55);
    }

    #[test]
    fn test_sample_and_quit_events() {
        let mut app = App::new(20);

        handle_tui_event(
            &mut app,
            TuiEvent::Sample {
                messages: 12,
                events: 3,
            },
        );
        assert_eq!(app.messages_series.latest(), Some(12));

        handle_tui_event(&mut app, TuiEvent::Quit);
        assert!(app.should_quit());
    }
}
