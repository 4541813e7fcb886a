//! The signal-routing graph.
//!
//! Every audio path in the application flows through this graph: decks,
//! effect chains, mixers, and analyzers are [`Module`]s exposing typed
//! [`Port`]s, wired by gain-scaled [`Connection`]s.
//!
//! # Architecture
//!
//! The graph follows a **mutate-then-publish** split: [`RoutingGraph`] is
//! owned by the control domain and is the only mutable object. After any
//! mutation the control domain publishes an immutable [`TopologySnapshot`]
//! (an `Arc`-shared frozen copy) to the render domain, which therefore sees
//! either the prior or the fully-updated topology, never a half-linked
//! intermediate state.
//!
//! Storage is arena-style: modules and connections live in slot vectors
//! indexed by their stable integer handles ([`ModuleId`], [`ConnectionId`]).
//! Handles are allocated sequentially and never reused, so a stale handle
//! can never alias a newer object.
//!
//! # Invariants
//!
//! - A [`Port`] never outlives its [`Module`].
//! - Removing a module first removes every connection touching any of its
//!   ports; dangling connections cannot exist.
//! - Connections only link an output port to an input port, and only along
//!   a compatible signal kind (`audio→audio`, `audio→sidechain`,
//!   `control→control`).
//! - Change notifications fire after a mutation has completed, never before.

mod connection;
mod event;
mod module;
mod routing;
mod schema;
mod snapshot;

pub use connection::{Connection, ConnectionId};
pub use event::{GraphEvent, GraphListener, ListenerId};
pub use module::{
    Module, ModuleCategory, ModuleId, ModulePosition, ModuleSpecBuilder, Port, PortDirection,
    PortId, PortKind,
};
pub use routing::{GraphError, RoutingGraph};
pub use schema::{
    ChainSpec, ConnectionSpec, EffectSpec, EndpointSpec, ModuleSpec, PortSpecDoc, RoutingDocument,
    SCHEMA_VERSION,
};
pub use snapshot::{ConnectionTopology, ModuleTopology, TopologySnapshot};
