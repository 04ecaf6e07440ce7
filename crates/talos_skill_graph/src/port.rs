// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for skill inputs/outputs.

use egui::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a port, unique within its owning node only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub String);

impl PortId {
    /// Create a port ID from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PortId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Class of a port, and of the edges that may attach to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Control flow between EXEC ports
    Execution,
    /// Data flow between attribute ports
    Attribute,
}

impl EdgeKind {
    /// Wire color for this kind (for UI)
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::Execution => [74, 222, 128],
            Self::Attribute => [59, 130, 246],
        }
    }
}

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Integer value
    #[serde(rename = "int")]
    Int,
    /// Floating point value
    #[serde(rename = "float")]
    Float,
    /// Single character
    #[serde(rename = "char")]
    Char,
    /// String value
    #[serde(rename = "string")]
    String,
    /// Boolean value
    #[serde(rename = "bool")]
    Bool,
    /// Array of integers
    #[serde(rename = "int[]")]
    IntArray,
    /// Array of floats
    #[serde(rename = "float[]")]
    FloatArray,
    /// Array of strings
    #[serde(rename = "string[]")]
    StringArray,
    /// Array of booleans
    #[serde(rename = "bool[]")]
    BoolArray,
    /// Execution flow
    #[serde(rename = "EXEC")]
    Exec,
}

impl PortType {
    /// All port types, in declaration order
    pub const ALL: [PortType; 10] = [
        Self::Int,
        Self::Float,
        Self::Char,
        Self::String,
        Self::Bool,
        Self::IntArray,
        Self::FloatArray,
        Self::StringArray,
        Self::BoolArray,
        Self::Exec,
    ];

    /// Whether this is the execution pseudo-type
    pub fn is_exec(self) -> bool {
        matches!(self, Self::Exec)
    }

    /// Whether this is one of the array types
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::IntArray | Self::FloatArray | Self::StringArray | Self::BoolArray
        )
    }

    /// Edge kind that ports of this type take part in
    pub fn kind(self) -> EdgeKind {
        if self.is_exec() {
            EdgeKind::Execution
        } else {
            EdgeKind::Attribute
        }
    }

    /// Name used in the graph document
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Char => "char",
            Self::String => "string",
            Self::Bool => "bool",
            Self::IntArray => "int[]",
            Self::FloatArray => "float[]",
            Self::StringArray => "string[]",
            Self::BoolArray => "bool[]",
            Self::Exec => "EXEC",
        }
    }

    /// Get the color for this port type (for UI)
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::Exec => EdgeKind::Execution.color(),
            Self::Int | Self::IntArray => [34, 211, 238],
            Self::Float | Self::FloatArray => [163, 230, 53],
            Self::Char | Self::String | Self::StringArray => [250, 204, 21],
            Self::Bool | Self::BoolArray => [248, 113, 113],
        }
    }

    /// Check if this type can be wired to another type.
    ///
    /// Only the execution/attribute split is enforced; attribute types
    /// connect freely among themselves.
    pub fn can_connect_to(self, other: PortType) -> bool {
        self.kind() == other.kind()
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A port on a skill node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port ID (unique within the node)
    pub id: PortId,
    /// Display label
    pub label: String,
    /// Data type
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// Port direction
    #[serde(rename = "io")]
    pub direction: PortDirection,
    /// Cached offset from the node center, filled in by the anchor resolver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Vec2>,
}

impl Port {
    /// Create a new port
    pub fn new(
        id: impl Into<PortId>,
        label: impl Into<String>,
        port_type: PortType,
        direction: PortDirection,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            port_type,
            direction,
            offset: None,
        }
    }

    /// Create a new input port
    pub fn input(id: impl Into<PortId>, label: impl Into<String>, port_type: PortType) -> Self {
        Self::new(id, label, port_type, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(id: impl Into<PortId>, label: impl Into<String>, port_type: PortType) -> Self {
        Self::new(id, label, port_type, PortDirection::Output)
    }

    /// Edge kind of this port
    pub fn kind(&self) -> EdgeKind {
        self.port_type.kind()
    }

    /// Check if a wire from this port into `other` is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        self.direction == PortDirection::Output
            && other.direction == PortDirection::Input
            && self.port_type.can_connect_to(other.port_type)
    }
}
