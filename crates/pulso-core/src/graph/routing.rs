//! The mutable routing graph and its operations.

use tracing::{debug, warn};

use super::connection::{Connection, ConnectionId};
use super::event::{GraphEvent, GraphListener, ListenerId};
use super::module::{
    Module, ModuleCategory, ModuleId, ModuleSpecBuilder, Port, PortDirection, PortId, PortKind,
};
use super::schema::RoutingDocument;
use super::snapshot::TopologySnapshot;

/// Errors from graph mutations.
///
/// Every variant is a validation failure detected before any mutation; a
/// failed operation leaves the graph exactly as it was.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GraphError {
    /// The referenced module does not exist.
    #[error("module {0:?} does not exist")]
    ModuleNotFound(ModuleId),

    /// The referenced port does not exist on the module.
    #[error("port {port:?} does not exist on module {module:?}")]
    PortNotFound {
        /// Module that was searched.
        module: ModuleId,
        /// Missing port.
        port: PortId,
    },

    /// Connections must run from an output port to an input port.
    #[error("connection must run output -> input (got {src:?} -> {dest:?})")]
    DirectionIncompatible {
        /// Direction of the source port.
        src: PortDirection,
        /// Direction of the destination port.
        dest: PortDirection,
    },

    /// The port kinds cannot be linked.
    #[error("incompatible port kinds: {src:?} cannot feed {dest:?}")]
    KindIncompatible {
        /// Kind of the source port.
        src: PortKind,
        /// Kind of the destination port.
        dest: PortKind,
    },

    /// The requested connection kind does not match the source port.
    #[error("requested {requested:?} connection from a {src:?} port")]
    KindMismatch {
        /// Kind passed to `create_connection`.
        requested: PortKind,
        /// Kind of the source port.
        src: PortKind,
    },

    /// An imported document could not be applied.
    #[error("invalid routing document: {0}")]
    InvalidDocument(String),

    /// The document's schema version is not supported.
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
}

/// The signal-routing graph.
///
/// Owned and mutated by the control domain only. The render domain consumes
/// [`TopologySnapshot`]s produced by [`snapshot()`](Self::snapshot).
pub struct RoutingGraph {
    modules: Vec<Option<Module>>,
    connections: Vec<Option<Connection>>,
    next_port: u32,
    listeners: Vec<(ListenerId, Box<dyn GraphListener>)>,
    next_listener: u32,
}

impl Default for RoutingGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            connections: Vec::new(),
            next_port: 0,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    // --- Modules ---

    /// Insert a module described by a [`Module::new`] builder.
    pub fn add_module(&mut self, spec: ModuleSpecBuilder) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        let ports = spec
            .ports
            .into_iter()
            .map(|p| {
                let port_id = PortId(self.next_port);
                self.next_port += 1;
                Port {
                    id: port_id,
                    name: p.name,
                    kind: p.kind,
                    direction: p.direction,
                    module: id,
                    connections: Vec::new(),
                }
            })
            .collect();

        self.modules.push(Some(Module {
            id,
            name: spec.name,
            category: spec.category,
            position: spec.position,
            enabled: true,
            bypassed: false,
            parameters: spec.parameters,
            ports,
        }));

        debug!(module = id.0, "module added");
        self.notify(GraphEvent::ModuleAdded(id));
        id
    }

    /// Remove a module, cascading removal of every connection touching any
    /// of its ports. Returns `false` if the module does not exist.
    pub fn remove_module(&mut self, id: ModuleId) -> bool {
        if self.module(id).is_none() {
            return false;
        }

        // Cascade: collect then remove, so no dangling connection survives.
        let touching: Vec<ConnectionId> = self
            .connections
            .iter()
            .flatten()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        for conn_id in touching {
            self.remove_connection(conn_id);
        }

        self.modules[id.0 as usize] = None;
        debug!(module = id.0, "module removed");
        self.notify(GraphEvent::ModuleRemoved(id));
        true
    }

    /// Look up a module.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0 as usize)?.as_ref()
    }

    /// Look up a module mutably.
    ///
    /// Structural fields (ports) are not reachable mutably; use graph
    /// operations for those.
    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0 as usize)?.as_mut()
    }

    /// Iterate over live modules.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().flatten()
    }

    /// Number of live modules.
    pub fn module_count(&self) -> usize {
        self.modules.iter().flatten().count()
    }

    // --- Connections ---

    /// Create a connection from `(src_module, src_port)` to
    /// `(dst_module, dst_port)` carrying `kind` signal.
    ///
    /// Validation happens before any mutation; on failure the graph is
    /// untouched. If an identical (src, dst) connection already exists its
    /// id is returned idempotently, no duplicate is created.
    pub fn create_connection(
        &mut self,
        src_module: ModuleId,
        src_port: PortId,
        dst_module: ModuleId,
        dst_port: PortId,
        kind: PortKind,
    ) -> Result<ConnectionId, GraphError> {
        let src = self
            .module(src_module)
            .ok_or(GraphError::ModuleNotFound(src_module))?;
        let dst = self
            .module(dst_module)
            .ok_or(GraphError::ModuleNotFound(dst_module))?;
        let src_p = src.port(src_port).ok_or(GraphError::PortNotFound {
            module: src_module,
            port: src_port,
        })?;
        let dst_p = dst.port(dst_port).ok_or(GraphError::PortNotFound {
            module: dst_module,
            port: dst_port,
        })?;

        if src_p.direction != PortDirection::Output || dst_p.direction != PortDirection::Input {
            return Err(GraphError::DirectionIncompatible {
                src: src_p.direction,
                dest: dst_p.direction,
            });
        }
        if !src_p.kind.can_feed(dst_p.kind) {
            return Err(GraphError::KindIncompatible {
                src: src_p.kind,
                dest: dst_p.kind,
            });
        }
        if kind != src_p.kind {
            return Err(GraphError::KindMismatch {
                requested: kind,
                src: src_p.kind,
            });
        }

        // Idempotent: an identical link returns the existing id.
        if let Some(existing) = self
            .connections
            .iter()
            .flatten()
            .find(|c| c.links(src_module, src_port, dst_module, dst_port))
        {
            return Ok(existing.id);
        }

        let id = ConnectionId(self.connections.len() as u32);
        self.connections.push(Some(Connection {
            id,
            source_module: src_module,
            source_port: src_port,
            dest_module: dst_module,
            dest_port: dst_port,
            kind,
            gain: 1.0,
            enabled: true,
        }));
        self.attach_to_port(src_module, src_port, id);
        self.attach_to_port(dst_module, dst_port, id);

        debug!(
            connection = id.0,
            src = src_module.0,
            dst = dst_module.0,
            "connection created"
        );
        self.notify(GraphEvent::ConnectionCreated(id));
        Ok(id)
    }

    /// Remove a connection, detaching it from both ports.
    /// Returns `false` for a nonexistent id, not an error.
    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let Some(conn) = self.connections.get_mut(id.0 as usize).and_then(Option::take) else {
            return false;
        };

        self.detach_from_port(conn.source_module, conn.source_port, id);
        self.detach_from_port(conn.dest_module, conn.dest_port, id);

        debug!(connection = id.0, "connection removed");
        self.notify(GraphEvent::ConnectionRemoved(id));
        true
    }

    /// Look up a connection.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.0 as usize)?.as_ref()
    }

    /// Iterate over live connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().flatten().count()
    }

    /// Set a connection's gain, clamped to [0, 2]. Returns `false` if the
    /// connection does not exist.
    pub fn set_connection_gain(&mut self, id: ConnectionId, gain: f32) -> bool {
        let Some(conn) = self.connections.get_mut(id.0 as usize).and_then(Option::as_mut) else {
            return false;
        };
        conn.gain = Connection::clamp_gain(gain);
        self.notify(GraphEvent::ConnectionUpdated(id));
        true
    }

    /// Enable or disable a connection. Returns `false` if it does not exist.
    pub fn set_connection_enabled(&mut self, id: ConnectionId, enabled: bool) -> bool {
        let Some(conn) = self.connections.get_mut(id.0 as usize).and_then(Option::as_mut) else {
            return false;
        };
        conn.enabled = enabled;
        self.notify(GraphEvent::ConnectionUpdated(id));
        true
    }

    // --- Observers ---

    /// Subscribe a listener; returns a handle for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&mut self, listener: impl GraphListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if the handle is unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, event: GraphEvent) {
        for (_, listener) in &mut self.listeners {
            listener.on_graph_event(&event);
        }
    }

    // --- Snapshots & documents ---

    /// Freeze the current topology into an immutable snapshot for the
    /// render domain.
    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot::capture(self)
    }

    /// Remove every module and connection.
    pub fn clear(&mut self) {
        self.modules.clear();
        self.connections.clear();
        self.next_port = 0;
        self.notify(GraphEvent::GraphCleared);
    }

    /// Export the graph as a serializable document.
    pub fn export_document(&self) -> RoutingDocument {
        RoutingDocument::from_graph(self)
    }

    /// Replace the whole graph with an imported document.
    ///
    /// Atomic: the document is validated into a fresh graph first; on any
    /// error the current graph is left untouched.
    pub fn import_document(&mut self, document: &RoutingDocument) -> Result<(), GraphError> {
        let fresh = document.build_graph()?;

        self.modules = fresh.modules;
        self.connections = fresh.connections;
        self.next_port = fresh.next_port;
        self.notify(GraphEvent::GraphImported);
        Ok(())
    }

    // --- Internal helpers ---

    fn attach_to_port(&mut self, module: ModuleId, port: PortId, conn: ConnectionId) {
        if let Some(p) = self
            .module_mut(module)
            .and_then(|m| m.port_mut(port))
        {
            p.connections.push(conn);
        }
    }

    fn detach_from_port(&mut self, module: ModuleId, port: PortId, conn: ConnectionId) {
        if let Some(p) = self.module_mut(module).and_then(|m| m.port_mut(port)) {
            p.connections.retain(|&c| c != conn);
        } else {
            warn!(module = module.0, "detach from missing port");
        }
    }

    /// Re-seed internal counters after an import. Used by document
    /// reconstruction so freshly assigned handles continue past imported
    /// ones.
    pub(crate) fn raw_parts(
        modules: Vec<Option<Module>>,
        connections: Vec<Option<Connection>>,
        next_port: u32,
    ) -> Self {
        Self {
            modules,
            connections,
            next_port,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

/// Convenience constructors for common DJ modules.
impl RoutingGraph {
    /// Add a stereo effect module: one audio in, one sidechain in, one audio
    /// out.
    pub fn add_effect_module(&mut self, name: impl Into<String>) -> ModuleId {
        self.add_module(
            Module::new(name, ModuleCategory::Effect)
                .with_audio_in("Audio In")
                .with_port("Sidechain", PortKind::Sidechain, PortDirection::Input)
                .with_audio_out("Audio Out"),
        )
    }

    /// Add a generator module: one audio out, one control trigger in.
    pub fn add_generator_module(&mut self, name: impl Into<String>) -> ModuleId {
        self.add_module(
            Module::new(name, ModuleCategory::Generator)
                .with_audio_out("Audio Out")
                .with_port("Trigger", PortKind::Control, PortDirection::Input),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn two_linked_modules(graph: &mut RoutingGraph) -> (ModuleId, ModuleId, ConnectionId) {
        let src = graph.add_generator_module("Deck A");
        let dst = graph.add_effect_module("FX");
        let out = graph
            .module(src)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;
        let inp = graph
            .module(dst)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Audio)
            .unwrap()
            .id;
        let conn = graph
            .create_connection(src, out, dst, inp, PortKind::Audio)
            .unwrap();
        (src, dst, conn)
    }

    #[test]
    fn connect_is_idempotent() {
        let mut graph = RoutingGraph::new();
        let (src, dst, conn) = two_linked_modules(&mut graph);
        let out = graph.module(src).unwrap().ports()[0].id;
        let inp = graph
            .module(dst)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Audio)
            .unwrap()
            .id;

        let again = graph
            .create_connection(src, out, dst, inp, PortKind::Audio)
            .unwrap();
        assert_eq!(conn, again);
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn incompatible_pairs_leave_graph_unchanged() {
        let mut graph = RoutingGraph::new();
        let a = graph.add_effect_module("A");
        let b = graph.add_effect_module("B");
        let a_in = graph
            .module(a)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Audio)
            .unwrap()
            .id;
        let b_in = graph
            .module(b)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Audio)
            .unwrap()
            .id;
        let b_out = graph
            .module(b)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;

        // input -> input
        assert!(matches!(
            graph.create_connection(a, a_in, b, b_in, PortKind::Audio),
            Err(GraphError::DirectionIncompatible { .. })
        ));
        // output -> output
        let a_out = graph
            .module(a)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;
        assert!(matches!(
            graph.create_connection(a, a_out, b, b_out, PortKind::Audio),
            Err(GraphError::DirectionIncompatible { .. })
        ));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn audio_cannot_feed_control() {
        let mut graph = RoutingGraph::new();
        let gen = graph.add_generator_module("Osc");
        let fx = graph.add_effect_module("FX");
        let audio_out = graph
            .module(gen)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;
        let trigger_in = graph
            .module(gen)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Control)
            .unwrap()
            .id;
        let _ = fx;

        assert!(matches!(
            graph.create_connection(gen, audio_out, gen, trigger_in, PortKind::Audio),
            Err(GraphError::KindIncompatible { .. })
        ));
    }

    #[test]
    fn audio_can_feed_sidechain() {
        let mut graph = RoutingGraph::new();
        let gen = graph.add_generator_module("Deck B");
        let fx = graph.add_effect_module("Comp");
        let out = graph
            .module(gen)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;
        let side = graph
            .module(fx)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Sidechain)
            .unwrap()
            .id;

        let conn = graph
            .create_connection(gen, out, fx, side, PortKind::Audio)
            .unwrap();
        assert_eq!(graph.connection(conn).unwrap().kind, PortKind::Audio);
    }

    #[test]
    fn remove_module_cascades_connections() {
        let mut graph = RoutingGraph::new();
        let (src, dst, _) = two_linked_modules(&mut graph);

        assert!(graph.remove_module(src));
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.module(dst).is_some());

        // No dangling references on the surviving module's ports.
        for port in graph.module(dst).unwrap().ports() {
            assert!(port.connection_ids().is_empty());
        }
    }

    #[test]
    fn remove_nonexistent_returns_false() {
        let mut graph = RoutingGraph::new();
        assert!(!graph.remove_module(ModuleId(42)));
        assert!(!graph.remove_connection(ConnectionId(42)));
        assert!(!graph.set_connection_gain(ConnectionId(0), 1.0));
    }

    #[test]
    fn events_fire_after_mutation() {
        let mut graph = RoutingGraph::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let listener = graph.subscribe(move |event: &GraphEvent| {
            if matches!(event, GraphEvent::ModuleAdded(_)) {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        graph.add_effect_module("A");
        graph.add_effect_module("B");
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(graph.unsubscribe(listener));
        graph.add_effect_module("C");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn connection_gain_clamps() {
        let mut graph = RoutingGraph::new();
        let (_, _, conn) = two_linked_modules(&mut graph);
        assert!(graph.set_connection_gain(conn, 5.0));
        assert_eq!(graph.connection(conn).unwrap().gain, 2.0);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut graph = RoutingGraph::new();
        let a = graph.add_effect_module("A");
        graph.remove_module(a);
        let b = graph.add_effect_module("B");
        assert_ne!(a, b);
    }
}
