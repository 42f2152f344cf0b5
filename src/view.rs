//! View synchronization seam.
//!
//! Discovery publishes reconciliation results as an add-set/update-set
//! stream rather than full snapshots, so any front end (the bundled
//! terminal UI, or a test recorder) can apply minimal mutations. Sinks
//! must be idempotent on the add path: discovery passes can race with
//! manual refreshes, and a repeated add for a known node is a no-op.

use tokio::sync::mpsc;
use tracing::debug;

use crate::registry::RelayNode;
use crate::tui::TuiEvent;

/// Consumer of incremental registry deltas.
pub trait ViewSink: Send + Sync {
    /// A node was discovered that the view has not seen before. Views
    /// must re-check the node's id before creating a widget and never
    /// create a duplicate.
    fn node_added(&self, node: &RelayNode);

    /// An already-known node's topology fields were refreshed. Views
    /// patch changed display fields only; widgets are never recreated,
    /// reordered, or removed.
    fn node_updated(&self, node: &RelayNode);
}

/// Sink that forwards deltas to the terminal UI event channel.
#[derive(Debug, Clone)]
pub struct TuiSink {
    tx: mpsc::Sender<TuiEvent>,
}

impl TuiSink {
    /// Wrap a TUI event sender.
    pub fn new(tx: mpsc::Sender<TuiEvent>) -> Self {
        Self { tx }
    }
}

impl ViewSink for TuiSink {
    fn node_added(&self, node: &RelayNode) {
        if self
            .tx
            .try_send(TuiEvent::NodeDiscovered(Box::new(node.clone())))
            .is_err()
        {
            debug!(id = %node.id, "TUI channel full, dropping node-added event");
        }
    }

    fn node_updated(&self, node: &RelayNode) {
        if self
            .tx
            .try_send(TuiEvent::NodeUpdated(Box::new(node.clone())))
            .is_err()
        {
            debug!(id = %node.id, "TUI channel full, dropping node-updated event");
        }
    }
}
