//! TUI application state and event handling.
//!
//! The app holds the retained view of the registry: node cards in
//! insertion order, network totals, and the two delta series. Card
//! mutations follow the incremental contract: adds are keyed by node id
//! and idempotent, updates patch fields in place, and cards are never
//! removed. A node that disappears from topology responses is only ever
//! shown as offline.

use std::collections::HashMap;

use chrono::{DateTime, Local};

use crate::poller::NetworkTotals;
use crate::registry::RelayNode;
use crate::tui::types::DeltaSeries;

/// Application running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Application is running normally
    Running,
    /// Application is shutting down
    Quitting,
}

/// Main TUI application state.
#[derive(Debug)]
pub struct App {
    /// Current application state
    pub state: AppState,
    /// Node cards by id.
    nodes: HashMap<String, RelayNode>,
    /// Card order: insertion order, seeds first.
    order: Vec<String>,
    /// Latest network totals.
    pub totals: NetworkTotals,
    /// Messages-processed delta series.
    pub messages_series: DeltaSeries,
    /// Events-stored delta series.
    pub events_series: DeltaSeries,
    /// When the last polling pass landed.
    pub last_updated: Option<DateTime<Local>>,
    /// Error message to display (if any)
    pub error_message: Option<String>,
    /// Info message to display (if any)
    pub info_message: Option<String>,
}

impl App {
    /// Create a new application instance.
    pub fn new(max_series_points: usize) -> Self {
        Self {
            state: AppState::Running,
            nodes: HashMap::new(),
            order: Vec::new(),
            totals: NetworkTotals::default(),
            messages_series: DeltaSeries::new(max_series_points),
            events_series: DeltaSeries::new(max_series_points),
            last_updated: None,
            error_message: None,
            info_message: None,
        }
    }

    /// Check if the application should quit.
    pub fn should_quit(&self) -> bool {
        self.state == AppState::Quitting
    }

    /// Request application quit.
    pub fn quit(&mut self) {
        self.state = AppState::Quitting;
    }

    /// Number of node cards.
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Node cards in insertion order.
    pub fn nodes_ordered(&self) -> impl Iterator<Item = &RelayNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Look up a card by id.
    pub fn node(&self, id: &str) -> Option<&RelayNode> {
        self.nodes.get(id)
    }

    /// Add a card for a newly discovered node. Re-checks the key first:
    /// if a card already exists the call degrades to an in-place patch,
    /// so racing discovery passes cannot produce duplicates.
    pub fn add_node(&mut self, node: RelayNode) {
        if self.nodes.contains_key(&node.id) {
            self.patch_node(node);
            return;
        }
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Patch an existing card's topology display fields. Unknown ids are
    /// ignored; cards are never created, reordered, or removed here.
    pub fn patch_node(&mut self, update: RelayNode) {
        if let Some(card) = self.nodes.get_mut(&update.id) {
            if update.location.is_some() && update.location != card.location {
                card.location = update.location;
            }
            card.cluster_node_id = update.cluster_node_id;
            card.is_live = update.is_live;
            card.cluster = update.cluster;
        }
    }

    /// Replace an existing card's runtime fields.
    pub fn update_runtime(&mut self, update: RelayNode) {
        if let Some(card) = self.nodes.get_mut(&update.id) {
            card.runtime = update.runtime;
        }
    }

    /// Record new network totals.
    pub fn set_totals(&mut self, totals: NetworkTotals) {
        self.totals = totals;
        self.last_updated = Some(Local::now());
    }

    /// Record one delta sample in each series.
    pub fn record_sample(&mut self, messages: u64, events: u64) {
        self.messages_series.push(messages);
        self.events_series.push(events);
    }

    /// Set an error message.
    pub fn set_error(&mut self, message: &str) {
        self.error_message = Some(message.to_string());
    }

    /// Set an info message.
    pub fn set_info(&mut self, message: &str) {
        self.info_message = Some(message.to_string());
    }

    /// Clear both messages.
    pub fn clear_messages(&mut self) {
        self.error_message = None;
        self.info_message = None;
    }
}

/// Input event from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Quit the application
    Quit,
    /// Force refresh display
    Refresh,
    /// Unknown/ignored key
    Unknown,
}

impl InputEvent {
    /// Parse a key event into an input event.
    pub fn from_key(key: crossterm::event::KeyCode) -> Self {
        use crossterm::event::KeyCode;

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') => Self::Quit,
            KeyCode::Char('r') | KeyCode::Char('R') => Self::Refresh,
            KeyCode::Esc => Self::Quit,
            _ => Self::Unknown,
        }
    }
}
