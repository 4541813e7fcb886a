//! JSON export/import schema for routing state.
//!
//! The document shape is shared with the UI and automation layers:
//!
//! ```json
//! {
//!   "version": 1,
//!   "modules": [{"id", "name", "type", "position", "ports",
//!                "parameters", "enabled", "bypassed"}],
//!   "connections": [{"id", "source", "destination", "type",
//!                    "gain", "enabled"}],
//!   "signalChains": [ ... ]
//! }
//! ```
//!
//! Import fully clears existing state before reconstructing and is atomic:
//! the document is validated into a fresh graph before anything is replaced.

use serde::{Deserialize, Serialize};

use super::connection::Connection;
use super::module::{
    Module, ModuleCategory, ModuleId, ModulePosition, Port, PortDirection, PortId, PortKind,
};
use super::routing::{GraphError, RoutingGraph};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Serialized port.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortSpecDoc {
    /// Port handle.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Signal kind.
    pub kind: PortKind,
    /// Direction.
    pub direction: PortDirection,
}

/// Serialized module.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    /// Module handle.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Category tag.
    #[serde(rename = "type")]
    pub module_type: ModuleCategory,
    /// Presentation placement.
    pub position: ModulePosition,
    /// Ports in declaration order.
    pub ports: Vec<PortSpecDoc>,
    /// Parameters in insertion order.
    pub parameters: Vec<(String, f32)>,
    /// Enabled flag.
    pub enabled: bool,
    /// Bypassed flag.
    pub bypassed: bool,
}

/// Serialized connection endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Module handle.
    pub module: u32,
    /// Port handle.
    pub port: u32,
}

/// Serialized connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    /// Connection handle.
    pub id: u32,
    /// Source endpoint (output port).
    pub source: EndpointSpec,
    /// Destination endpoint (input port).
    pub destination: EndpointSpec,
    /// Signal kind.
    #[serde(rename = "type")]
    pub connection_type: PortKind,
    /// Gain multiplier in [0, 2].
    pub gain: f32,
    /// Enabled flag.
    pub enabled: bool,
}

/// Serialized effect instance inside a chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectSpec {
    /// Effect kind tag (e.g. `"delay"`, `"reverb"`).
    pub kind: String,
    /// Parameters in declaration order.
    pub parameters: Vec<(String, f32)>,
    /// Enabled flag.
    pub enabled: bool,
    /// BPM-sync flag.
    pub bpm_sync: bool,
}

/// Serialized effect chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSpec {
    /// Chain identifier (e.g. `"deck-a"`).
    pub id: String,
    /// Wet/dry mix in [0, 1].
    pub mix: f32,
    /// Enabled flag.
    pub enabled: bool,
    /// Maximum instance count.
    pub max_effects: usize,
    /// Effects in processing order.
    pub effects: Vec<EffectSpec>,
}

/// Top-level routing document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDocument {
    /// Schema version.
    pub version: u32,
    /// All modules.
    pub modules: Vec<ModuleSpec>,
    /// All connections.
    pub connections: Vec<ConnectionSpec>,
    /// Effect chains (filled by the chain engine; empty for a bare graph).
    pub signal_chains: Vec<ChainSpec>,
}

impl RoutingDocument {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Capture a graph into a document (chains left empty).
    pub(crate) fn from_graph(graph: &RoutingGraph) -> Self {
        let modules = graph
            .modules()
            .map(|m| ModuleSpec {
                id: m.id.index(),
                name: m.name.clone(),
                module_type: m.category,
                position: m.position,
                ports: m
                    .ports()
                    .iter()
                    .map(|p| PortSpecDoc {
                        id: p.id.index(),
                        name: p.name.clone(),
                        kind: p.kind,
                        direction: p.direction,
                    })
                    .collect(),
                parameters: m.parameters().to_vec(),
                enabled: m.enabled,
                bypassed: m.bypassed,
            })
            .collect();

        let connections = graph
            .connections()
            .map(|c| ConnectionSpec {
                id: c.id.index(),
                source: EndpointSpec {
                    module: c.source_module.index(),
                    port: c.source_port.index(),
                },
                destination: EndpointSpec {
                    module: c.dest_module.index(),
                    port: c.dest_port.index(),
                },
                connection_type: c.kind,
                gain: c.gain,
                enabled: c.enabled,
            })
            .collect();

        Self {
            version: SCHEMA_VERSION,
            modules,
            connections,
            signal_chains: Vec::new(),
        }
    }

    /// Validate the document into a fresh graph. Nothing is mutated on
    /// error, which is what makes [`RoutingGraph::import_document`] atomic.
    pub(crate) fn build_graph(&self) -> Result<RoutingGraph, GraphError> {
        if self.version != SCHEMA_VERSION {
            return Err(GraphError::UnsupportedVersion(self.version));
        }

        let max_module = self.modules.iter().map(|m| m.id).max().map_or(0, |m| m + 1);
        let mut modules: Vec<Option<Module>> = (0..max_module).map(|_| None).collect();
        let mut next_port = 0;

        for spec in &self.modules {
            let slot = spec.id as usize;
            if modules[slot].is_some() {
                return Err(GraphError::InvalidDocument(format!(
                    "duplicate module id {}",
                    spec.id
                )));
            }
            let id = ModuleId(spec.id);
            let ports = spec
                .ports
                .iter()
                .map(|p| {
                    next_port = next_port.max(p.id + 1);
                    Port {
                        id: PortId(p.id),
                        name: p.name.clone(),
                        kind: p.kind,
                        direction: p.direction,
                        module: id,
                        connections: Vec::new(),
                    }
                })
                .collect();
            modules[slot] = Some(Module {
                id,
                name: spec.name.clone(),
                category: spec.module_type,
                position: spec.position,
                enabled: spec.enabled,
                bypassed: spec.bypassed,
                parameters: spec.parameters.clone(),
                ports,
            });
        }

        let max_conn = self
            .connections
            .iter()
            .map(|c| c.id)
            .max()
            .map_or(0, |c| c + 1);
        let mut connections: Vec<Option<Connection>> = (0..max_conn).map(|_| None).collect();

        for spec in &self.connections {
            let slot = spec.id as usize;
            if connections[slot].is_some() {
                return Err(GraphError::InvalidDocument(format!(
                    "duplicate connection id {}",
                    spec.id
                )));
            }

            let src_module = ModuleId(spec.source.module);
            let dst_module = ModuleId(spec.destination.module);
            let src_port = PortId(spec.source.port);
            let dst_port = PortId(spec.destination.port);

            // Endpoint and compatibility validation, mirroring
            // create_connection.
            let src = modules
                .get(src_module.index() as usize)
                .and_then(|m| m.as_ref())
                .ok_or(GraphError::ModuleNotFound(src_module))?;
            let dst = modules
                .get(dst_module.index() as usize)
                .and_then(|m| m.as_ref())
                .ok_or(GraphError::ModuleNotFound(dst_module))?;
            let src_p = src.port(src_port).ok_or(GraphError::PortNotFound {
                module: src_module,
                port: src_port,
            })?;
            let dst_p = dst.port(dst_port).ok_or(GraphError::PortNotFound {
                module: dst_module,
                port: dst_port,
            })?;
            if src_p.direction != PortDirection::Output
                || dst_p.direction != PortDirection::Input
            {
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

            connections[slot] = Some(Connection {
                id: super::ConnectionId(spec.id),
                source_module: src_module,
                source_port: src_port,
                dest_module: dst_module,
                dest_port: dst_port,
                kind: spec.connection_type,
                gain: Connection::clamp_gain(spec.gain),
                enabled: spec.enabled,
            });
        }

        // Attach connection ids to ports in a second pass.
        let conn_refs: Vec<(u32, ModuleId, PortId, ModuleId, PortId)> = connections
            .iter()
            .flatten()
            .map(|c| {
                (
                    c.id.index(),
                    c.source_module,
                    c.source_port,
                    c.dest_module,
                    c.dest_port,
                )
            })
            .collect();
        for (cid, sm, sp, dm, dp) in conn_refs {
            for (module, port) in [(sm, sp), (dm, dp)] {
                if let Some(p) = modules[module.index() as usize]
                    .as_mut()
                    .and_then(|m| m.port_mut(port))
                {
                    p.connections.push(super::ConnectionId(cid));
                }
            }
        }

        Ok(RoutingGraph::raw_parts(modules, connections, next_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> RoutingGraph {
        let mut graph = RoutingGraph::new();
        let gen = graph.add_generator_module("Deck A");
        let fx = graph.add_effect_module("Chain A");
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
        graph
    }

    #[test]
    fn export_import_roundtrip() {
        let graph = sample_graph();
        let doc = graph.export_document();
        let json = doc.to_json().unwrap();
        let parsed = RoutingDocument::from_json(&json).unwrap();

        let mut restored = RoutingGraph::new();
        restored.import_document(&parsed).unwrap();

        assert_eq!(restored.module_count(), graph.module_count());
        assert_eq!(restored.connection_count(), graph.connection_count());
        // Ids survive the roundtrip.
        let names: Vec<String> = restored.modules().map(|m| m.name.clone()).collect();
        assert!(names.contains(&"Deck A".to_string()));
    }

    #[test]
    fn import_replaces_existing_state() {
        let source = sample_graph();
        let doc = source.export_document();

        let mut target = RoutingGraph::new();
        target.add_effect_module("stale");
        target.add_effect_module("stale 2");
        target.import_document(&doc).unwrap();

        assert_eq!(target.module_count(), 2);
        assert!(target.modules().all(|m| m.name != "stale"));
    }

    #[test]
    fn bad_import_leaves_graph_untouched() {
        let mut doc = sample_graph().export_document();
        // Point a connection at a nonexistent module.
        doc.connections[0].destination.module = 99;

        let mut target = RoutingGraph::new();
        target.add_effect_module("keeper");
        assert!(target.import_document(&doc).is_err());
        assert_eq!(target.module_count(), 1);
        assert_eq!(target.modules().next().unwrap().name, "keeper");
    }

    #[test]
    fn version_mismatch_rejected() {
        let mut doc = sample_graph().export_document();
        doc.version = 99;
        let mut target = RoutingGraph::new();
        assert_eq!(
            target.import_document(&doc),
            Err(GraphError::UnsupportedVersion(99))
        );
    }

    #[test]
    fn camel_case_field_names() {
        let doc = sample_graph().export_document();
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"signalChains\""));
        assert!(json.contains("\"type\""));
    }
}
