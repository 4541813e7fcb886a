//! Modules and their ports.

use serde::{Deserialize, Serialize};

/// Stable handle of a module in the routing graph.
///
/// Handles are assigned sequentially and never reused within a graph
/// instance, so they stay valid across unrelated mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    /// Raw numeric value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Stable handle of a port. Unique across the whole graph, not per module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub(crate) u32);

impl PortId {
    /// Raw numeric value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// What role a module plays in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleCategory {
    /// Audio processor (effect chain members, chain endpoints).
    Effect,
    /// Multi-input mixer.
    Mixer,
    /// Signal source (oscillator, noise, deck playback).
    Generator,
    /// Metering / analysis tap.
    Analyzer,
}

/// Signal kind a port carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Program audio.
    Audio,
    /// Sidechain input for dynamics processors.
    Sidechain,
    /// Control-rate signal (automation, triggers).
    Control,
}

impl PortKind {
    /// Whether a connection may run from a port of kind `self` into a port
    /// of kind `dst`.
    ///
    /// The only legal pairings are `audio→audio`, `audio→sidechain`, and
    /// `control→control`.
    pub fn can_feed(self, dst: PortKind) -> bool {
        matches!(
            (self, dst),
            (PortKind::Audio, PortKind::Audio)
                | (PortKind::Audio, PortKind::Sidechain)
                | (PortKind::Control, PortKind::Control)
        )
    }
}

/// Direction of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Signal flows into the module.
    Input,
    /// Signal flows out of the module.
    Output,
}

/// A typed attachment point on a module.
///
/// Ports are owned by their module and removed with it; they hold only the
/// ids of connections touching them, never the connections themselves.
#[derive(Clone, Debug)]
pub struct Port {
    /// Stable handle.
    pub id: PortId,
    /// Display name (`"Audio In"`, `"Sidechain"`, …).
    pub name: String,
    /// Signal kind.
    pub kind: PortKind,
    /// Input or output.
    pub direction: PortDirection,
    /// Owning module (non-owning back-reference).
    pub module: ModuleId,
    /// Ids of connections touching this port.
    pub(crate) connections: Vec<super::ConnectionId>,
}

impl Port {
    /// Ids of connections currently attached to this port.
    pub fn connection_ids(&self) -> &[super::ConnectionId] {
        &self.connections
    }
}

/// Presentation-only placement of a module. Carried through export/import
/// untouched; the engine never reads it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulePosition {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// A node in the routing graph.
#[derive(Clone, Debug)]
pub struct Module {
    /// Stable handle, assigned by the graph on insert.
    pub id: ModuleId,
    /// Display name.
    pub name: String,
    /// Role of the module.
    pub category: ModuleCategory,
    /// Presentation-only placement.
    pub position: ModulePosition,
    /// Whether the module participates in processing.
    pub enabled: bool,
    /// Whether the module passes audio through unprocessed.
    pub bypassed: bool,
    /// Ordered parameter map (insertion order preserved).
    pub(crate) parameters: Vec<(String, f32)>,
    /// Owned ports.
    pub(crate) ports: Vec<Port>,
}

impl Module {
    /// Describe a module to be inserted. The graph assigns ids on insert.
    pub fn new(name: impl Into<String>, category: ModuleCategory) -> ModuleSpecBuilder {
        ModuleSpecBuilder {
            name: name.into(),
            category,
            position: ModulePosition::default(),
            parameters: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// The module's ports in declaration order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Look up a port by id.
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.id == id)
    }

    /// First port matching a direction and kind, if any.
    pub fn find_port(&self, direction: PortDirection, kind: PortKind) -> Option<&Port> {
        self.ports
            .iter()
            .find(|p| p.direction == direction && p.kind == kind)
    }

    /// Current value of a named parameter.
    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Set a parameter, inserting it at the end of the order if new.
    pub fn set_parameter(&mut self, name: &str, value: f32) {
        if let Some(entry) = self.parameters.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        } else {
            self.parameters.push((name.to_string(), value));
        }
    }

    /// Parameters in insertion order.
    pub fn parameters(&self) -> &[(String, f32)] {
        &self.parameters
    }
}

/// Declared port for a module under construction.
#[derive(Clone, Debug)]
pub struct PortSpec {
    pub(crate) name: String,
    pub(crate) kind: PortKind,
    pub(crate) direction: PortDirection,
}

/// Builder for a module description passed to
/// [`RoutingGraph::add_module`](super::RoutingGraph::add_module).
#[derive(Clone, Debug)]
pub struct ModuleSpecBuilder {
    pub(crate) name: String,
    pub(crate) category: ModuleCategory,
    pub(crate) position: ModulePosition,
    pub(crate) parameters: Vec<(String, f32)>,
    pub(crate) ports: Vec<PortSpec>,
}

impl ModuleSpecBuilder {
    /// Add a port.
    pub fn with_port(
        mut self,
        name: impl Into<String>,
        kind: PortKind,
        direction: PortDirection,
    ) -> Self {
        self.ports.push(PortSpec {
            name: name.into(),
            kind,
            direction,
        });
        self
    }

    /// Shorthand for an audio input port.
    pub fn with_audio_in(self, name: impl Into<String>) -> Self {
        self.with_port(name, PortKind::Audio, PortDirection::Input)
    }

    /// Shorthand for an audio output port.
    pub fn with_audio_out(self, name: impl Into<String>) -> Self {
        self.with_port(name, PortKind::Audio, PortDirection::Output)
    }

    /// Seed a parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: f32) -> Self {
        self.parameters.push((name.into(), value));
        self
    }

    /// Set the presentation placement.
    pub fn with_position(mut self, position: ModulePosition) -> Self {
        self.position = position;
        self
    }
}
