// SPDX-License-Identifier: MIT OR Apache-2.0
//! Skill node definitions.

use crate::port::{Port, PortDirection, PortId, PortType};
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Skill type of nodes that only carry a literal value
pub const STATIC_ATTRIBUTE_SKILL_TYPE: &str = "static_attribute";

/// Unique identifier for a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node ID from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random node ID
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Literal carried by a node: a scalar or a homogeneous array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Boolean array
    BoolArray(Vec<bool>),
    /// Integer array
    IntArray(Vec<i64>),
    /// Float array
    FloatArray(Vec<f64>),
    /// String array
    StringArray(Vec<String>),
}

impl LiteralValue {
    /// Get the port type for this value
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Bool(_) => PortType::Bool,
            Self::Int(_) => PortType::Int,
            Self::Float(_) => PortType::Float,
            Self::String(_) => PortType::String,
            Self::BoolArray(_) => PortType::BoolArray,
            Self::IntArray(_) => PortType::IntArray,
            Self::FloatArray(_) => PortType::FloatArray,
            Self::StringArray(_) => PortType::StringArray,
        }
    }

    /// Reinterpret a decoded literal as `port_type` where the JSON shape is
    /// ambiguous: `[]` decodes as a bool array and `3` as an integer.
    pub fn with_type(self, port_type: PortType) -> Self {
        match (self, port_type) {
            (Self::BoolArray(v), PortType::IntArray) if v.is_empty() => Self::IntArray(Vec::new()),
            (Self::BoolArray(v), PortType::FloatArray) if v.is_empty() => {
                Self::FloatArray(Vec::new())
            }
            (Self::BoolArray(v), PortType::StringArray) if v.is_empty() => {
                Self::StringArray(Vec::new())
            }
            (Self::Int(i), PortType::Float) => Self::Float(i as f64),
            (Self::IntArray(v), PortType::FloatArray) => {
                Self::FloatArray(v.into_iter().map(|i| i as f64).collect())
            }
            (value, _) => value,
        }
    }
}

/// A skill node in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node ID
    pub id: NodeId,
    /// World X of the node center
    pub x: f32,
    /// World Y of the node center
    pub y: f32,
    /// Display label
    pub label: String,
    /// Skill discriminator
    pub skill_type: String,
    /// Input ports, in display order
    #[serde(default)]
    pub inputs: Vec<Port>,
    /// Output ports, in display order
    #[serde(default)]
    pub outputs: Vec<Port>,
    /// Literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<LiteralValue>,
}

impl Node {
    /// Create a node without ports
    pub fn new(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        skill_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            label: label.into(),
            skill_type: skill_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            value: None,
        }
    }

    /// Create a static attribute node with a single output typed after `value`
    pub fn static_attribute(label: impl Into<String>, value: LiteralValue) -> Self {
        let label = label.into();
        let port = Port::output("value", label.clone(), value.port_type());
        let mut node = Self::new(NodeId::random(), label, STATIC_ATTRIBUTE_SKILL_TYPE);
        node.outputs.push(port);
        node.value = Some(value);
        node
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Append a port to the matching side
    pub fn with_port(mut self, port: Port) -> Self {
        match port.direction {
            PortDirection::Input => self.inputs.push(port),
            PortDirection::Output => self.outputs.push(port),
        }
        self
    }

    /// World position of the node center
    pub fn position(&self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    /// Move the node by a world-space delta
    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Whether this is a literal-only node
    pub fn is_static_attribute(&self) -> bool {
        self.skill_type == STATIC_ATTRIBUTE_SKILL_TYPE
    }

    /// Whether any port is an EXEC port (node renders an exec header row)
    pub fn has_exec(&self) -> bool {
        self.ports().any(|p| p.port_type.is_exec())
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == *port_id)
    }

    /// Get a mutable port by ID
    pub(crate) fn port_mut(&mut self, port_id: &PortId) -> Option<&mut Port> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.id == *port_id)
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// First port ID that appears twice on this node
    pub fn duplicate_port(&self) -> Option<&PortId> {
        let mut seen = std::collections::HashSet::new();
        self.ports().map(|p| &p.id).find(|id| !seen.insert(*id))
    }

    /// Give the literal the type of the node's output port
    pub(crate) fn resolve_value_type(&mut self) {
        let Some(port_type) = self.outputs.first().map(|p| p.port_type) else {
            return;
        };
        self.value = self.value.take().map(|v| v.with_type(port_type));
    }

    /// Forget all cached port offsets
    pub(crate) fn clear_offsets(&mut self) {
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.offset = None;
        }
    }
}
