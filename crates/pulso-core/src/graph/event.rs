//! Typed change notifications for graph observers.
//!
//! The original routing engine broadcast string-keyed events through a
//! process-wide emitter; here observers implement [`GraphListener`] and hold
//! a [`ListenerId`] for unsubscription. Events fire synchronously on the
//! control thread, strictly after the mutation they describe has completed.

use super::connection::ConnectionId;
use super::module::ModuleId;

/// A completed graph mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphEvent {
    /// A module was inserted.
    ModuleAdded(ModuleId),
    /// A module (and every connection touching it) was removed.
    ModuleRemoved(ModuleId),
    /// A connection was created.
    ConnectionCreated(ConnectionId),
    /// A connection was removed.
    ConnectionRemoved(ConnectionId),
    /// A connection's gain or enabled flag changed.
    ConnectionUpdated(ConnectionId),
    /// The whole graph was cleared.
    GraphCleared,
    /// The graph was rebuilt from an imported document.
    GraphImported,
}

/// Observer of graph mutations.
///
/// Implemented for closures, so `graph.subscribe(|event| …)` works directly.
pub trait GraphListener: Send {
    /// Called after each completed mutation.
    fn on_graph_event(&mut self, event: &GraphEvent);
}

impl<F: FnMut(&GraphEvent) + Send> GraphListener for F {
    fn on_graph_event(&mut self, event: &GraphEvent) {
        self(event);
    }
}

/// Handle returned by subscribe, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u32);
