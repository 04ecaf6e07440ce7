// SPDX-License-Identifier: MIT OR Apache-2.0
//! Skill graph editor core for Talos bots.
//!
//! A skill graph is a set of nodes with typed input/output ports, wired by
//! execution edges (control flow) and attribute edges (data). This crate
//! provides:
//! - The graph model with referential-integrity checks
//! - Canvas navigation (pan/zoom) and node dragging
//! - Deterministic port anchor layout and bezier wire geometry
//! - Asynchronous, versioned persistence against a graph store
//! - An egui canvas
//!
//! ## Architecture
//!
//! All editing state lives in [`EditorState`], driven one
//! [`PointerEvent`] at a time. [`SkillGraphEditor`] adds loading and
//! saving through a [`PersistenceBridge`] that runs the store on its own
//! worker thread.

pub mod anchor;
pub mod config;
pub mod drag;
pub mod edge;
pub mod editor;
pub mod graph;
pub mod node;
pub mod persistence;
pub mod port;
pub mod render;
pub mod store;
pub mod transform;
pub mod ui;

pub use anchor::{port_world_position, LayoutMetrics, PortAnchorResolver};
pub use config::{ConfigError, EditorConfig};
pub use drag::{DragController, DragOutcome, Gesture};
pub use edge::Edge;
pub use editor::{EditorState, PointerEvent, SkillGraphEditor};
pub use graph::{Graph, GraphError};
pub use node::{LiteralValue, Node, NodeId};
pub use persistence::{PersistenceBridge, PersistenceError, PersistenceNotice, RetryPolicy};
pub use port::{EdgeKind, Port, PortDirection, PortId, PortType};
pub use render::{ConnectionCurve, ConnectionRenderer, WireStyle};
pub use store::{
    BotEntry, BotPath, FileGraphStore, GraphStore, MemoryGraphStore, SkillEntry, StoreError,
};
pub use transform::{ViewTransform, ZoomSettings};
pub use ui::SkillGraphView;
