//! Immutable topology snapshots for the render domain.
//!
//! The render callback never walks the mutable graph. The control domain
//! captures a [`TopologySnapshot`] after each mutation batch and publishes
//! it through the engine's command ring wrapped in an `Arc`; the render
//! domain swaps it in at a block boundary. Old snapshots travel back on the
//! trash ring and are dropped on the control side.

use super::connection::ConnectionId;
use super::module::{ModuleCategory, ModuleId, PortId, PortKind};
use super::routing::RoutingGraph;

/// Frozen per-module state the renderer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleTopology {
    /// Module handle.
    pub id: ModuleId,
    /// Role of the module.
    pub category: ModuleCategory,
    /// Enabled flag at capture time.
    pub enabled: bool,
    /// Bypassed flag at capture time.
    pub bypassed: bool,
}

/// Frozen per-connection state the renderer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionTopology {
    /// Connection handle.
    pub id: ConnectionId,
    /// Source (module, port).
    pub source: (ModuleId, PortId),
    /// Destination (module, port).
    pub destination: (ModuleId, PortId),
    /// Signal kind.
    pub kind: PortKind,
    /// Gain at capture time.
    pub gain: f32,
    /// Enabled flag at capture time.
    pub enabled: bool,
}

/// An immutable frozen copy of the routing topology.
///
/// Never mutated after capture; shared via `Arc`. The render domain either
/// holds the previous snapshot or this one, half-linked states cannot be
/// observed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologySnapshot {
    /// Modules alive at capture time.
    pub modules: Vec<ModuleTopology>,
    /// Connections alive at capture time.
    pub connections: Vec<ConnectionTopology>,
}

impl TopologySnapshot {
    pub(crate) fn capture(graph: &RoutingGraph) -> Self {
        Self {
            modules: graph
                .modules()
                .map(|m| ModuleTopology {
                    id: m.id,
                    category: m.category,
                    enabled: m.enabled,
                    bypassed: m.bypassed,
                })
                .collect(),
            connections: graph
                .connections()
                .map(|c| ConnectionTopology {
                    id: c.id,
                    source: (c.source_module, c.source_port),
                    destination: (c.dest_module, c.dest_port),
                    kind: c.kind,
                    gain: c.gain,
                    enabled: c.enabled,
                })
                .collect(),
        }
    }

    /// Connections arriving at `module`, in id order.
    pub fn inputs_of(&self, module: ModuleId) -> impl Iterator<Item = &ConnectionTopology> {
        self.connections
            .iter()
            .filter(move |c| c.destination.0 == module)
    }

    /// Connections leaving `module`, in id order.
    pub fn outputs_of(&self, module: ModuleId) -> impl Iterator<Item = &ConnectionTopology> {
        self.connections
            .iter()
            .filter(move |c| c.source.0 == module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::module::PortDirection;

    #[test]
    fn snapshot_is_frozen_copy() {
        let mut graph = RoutingGraph::new();
        let gen = graph.add_generator_module("Deck A");
        let fx = graph.add_effect_module("FX");
        let out = graph
            .module(gen)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;
        let inp = graph
            .module(fx)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Audio)
            .unwrap()
            .id;
        graph
            .create_connection(gen, out, fx, inp, PortKind::Audio)
            .unwrap();

        let snap = graph.snapshot();
        assert_eq!(snap.modules.len(), 2);
        assert_eq!(snap.connections.len(), 1);

        // Later mutations do not show through.
        graph.remove_module(gen);
        assert_eq!(snap.modules.len(), 2);
        assert_eq!(snap.connections.len(), 1);

        let fresh = graph.snapshot();
        assert_eq!(fresh.modules.len(), 1);
        assert_eq!(fresh.connections.len(), 0);
    }

    #[test]
    fn input_output_queries() {
        let mut graph = RoutingGraph::new();
        let gen = graph.add_generator_module("Deck A");
        let fx = graph.add_effect_module("FX");
        let out = graph
            .module(gen)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;
        let inp = graph
            .module(fx)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Audio)
            .unwrap()
            .id;
        graph
            .create_connection(gen, out, fx, inp, PortKind::Audio)
            .unwrap();

        let snap = graph.snapshot();
        assert_eq!(snap.inputs_of(fx).count(), 1);
        assert_eq!(snap.outputs_of(gen).count(), 1);
        assert_eq!(snap.inputs_of(gen).count(), 0);
    }
}
