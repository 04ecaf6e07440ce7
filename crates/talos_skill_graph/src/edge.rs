// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge (wire) definitions for the graph.

use crate::node::NodeId;
use crate::port::{EdgeKind, PortId};
use serde::{Deserialize, Serialize};

/// A directed wire from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID
    #[serde(rename = "fromSkillId")]
    pub from_node: NodeId,
    /// Source port ID
    #[serde(rename = "fromPortId")]
    pub from_port: PortId,
    /// Target node ID
    #[serde(rename = "toSkillId")]
    pub to_node: NodeId,
    /// Target port ID
    #[serde(rename = "toPortId")]
    pub to_port: PortId,
    /// Execution or attribute wire
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl Edge {
    /// Create a new edge
    pub fn new(
        from_node: impl Into<NodeId>,
        from_port: impl Into<PortId>,
        to_node: impl Into<NodeId>,
        to_port: impl Into<PortId>,
        kind: EdgeKind,
    ) -> Self {
        Self {
            from_node: from_node.into(),
            from_port: from_port.into(),
            to_node: to_node.into(),
            to_port: to_port.into(),
            kind,
        }
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.from_node == *node_id || self.to_node == *node_id
    }

    /// Check if this edge involves a specific port of a specific node
    pub fn involves_port(&self, node_id: &NodeId, port_id: &PortId) -> bool {
        (self.from_node == *node_id && self.from_port == *port_id)
            || (self.to_node == *node_id && self.to_port == *port_id)
    }
}
