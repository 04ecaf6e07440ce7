// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node layout and port anchor resolution.
//!
//! Nodes are center-anchored boxes. A node with any EXEC port gets a header
//! row holding its EXEC inputs (left cluster) and EXEC outputs (right
//! cluster). Attribute inputs stack down the left edge of the body and
//! attribute outputs down the right edge. A static attribute node shows a
//! title row and its single output below it.
//!
//! Offsets are measured from the node center in world units, so they stay
//! valid while the node is dragged and only need recomputing when the port
//! list changes.

use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::port::PortId;
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node width in world units
pub const NODE_WIDTH: f32 = 256.0;
/// Height of the EXEC header row
pub const HEADER_HEIGHT: f32 = 28.0;
/// Height of one attribute port row
pub const ROW_HEIGHT: f32 = 24.0;
/// Horizontal padding inside the node
pub const PADDING_X: f32 = 12.0;
/// Vertical padding inside the body
pub const PADDING_Y: f32 = 8.0;
/// Horizontal distance between neighbouring EXEC ports in the header
pub const EXEC_SPACING: f32 = 20.0;
/// Diameter of an EXEC port dot
pub const EXEC_PORT_SIZE: f32 = 12.0;
/// Diameter of an attribute port dot
pub const PORT_SIZE: f32 = 8.0;

/// Layout constants for nodes and ports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    /// Node width
    pub node_width: f32,
    /// EXEC header row height
    pub header_height: f32,
    /// Attribute row height
    pub row_height: f32,
    /// Horizontal padding
    pub padding_x: f32,
    /// Vertical body padding
    pub padding_y: f32,
    /// Spacing between EXEC ports
    pub exec_spacing: f32,
    /// EXEC dot diameter
    pub exec_port_size: f32,
    /// Attribute dot diameter
    pub port_size: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            node_width: NODE_WIDTH,
            header_height: HEADER_HEIGHT,
            row_height: ROW_HEIGHT,
            padding_x: PADDING_X,
            padding_y: PADDING_Y,
            exec_spacing: EXEC_SPACING,
            exec_port_size: EXEC_PORT_SIZE,
            port_size: PORT_SIZE,
        }
    }
}

/// Box of a node relative to its center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeLayout {
    /// Width
    pub width: f32,
    /// Total height
    pub height: f32,
    /// Header height (zero without EXEC ports)
    pub header_height: f32,
}

impl NodeLayout {
    /// World-space rectangle of the node at its current position
    pub fn rect(&self, center: Pos2) -> Rect {
        Rect::from_center_size(center, Vec2::new(self.width, self.height))
    }

    /// Y of the top edge relative to the center
    pub fn top(&self) -> f32 {
        -self.height / 2.0
    }

    /// Y of the body's top edge relative to the center
    pub fn body_top(&self) -> f32 {
        self.top() + self.header_height
    }
}

/// Port offsets of one node
pub type PortOffsets = HashMap<PortId, Vec2>;

/// Computes port positions from a fixed layout formula
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortAnchorResolver {
    metrics: LayoutMetrics,
}

impl PortAnchorResolver {
    /// Create a resolver with custom metrics
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self { metrics }
    }

    /// Metrics in use
    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Size of a node box
    pub fn layout(&self, node: &Node) -> NodeLayout {
        let m = &self.metrics;
        let header_height = if node.has_exec() { m.header_height } else { 0.0 };
        let rows = if node.is_static_attribute() {
            // Title row plus the value row
            2
        } else {
            let attr_inputs = node.inputs.iter().filter(|p| !p.port_type.is_exec()).count();
            let attr_outputs = node.outputs.iter().filter(|p| !p.port_type.is_exec()).count();
            attr_inputs.max(attr_outputs).max(1)
        };
        NodeLayout {
            width: m.node_width,
            height: header_height + 2.0 * m.padding_y + rows as f32 * m.row_height,
            header_height,
        }
    }

    /// Offsets from the node center of every visible port
    pub fn resolve(&self, node: &Node) -> PortOffsets {
        let m = &self.metrics;
        let layout = self.layout(node);
        let left = -layout.width / 2.0;
        let right = layout.width / 2.0;
        let mut offsets = PortOffsets::new();

        // EXEC header
        let header_y = layout.top() + layout.header_height / 2.0;
        let exec_inputs = node.inputs.iter().filter(|p| p.port_type.is_exec());
        for (i, port) in exec_inputs.enumerate() {
            let x = left + m.padding_x + m.exec_port_size / 2.0 + i as f32 * m.exec_spacing;
            offsets.insert(port.id.clone(), Vec2::new(x, header_y));
        }
        let exec_outputs = node.outputs.iter().filter(|p| p.port_type.is_exec());
        for (i, port) in exec_outputs.enumerate() {
            let x = right - m.padding_x - m.exec_port_size / 2.0 - i as f32 * m.exec_spacing;
            offsets.insert(port.id.clone(), Vec2::new(x, header_y));
        }

        let row_y = |row: usize| {
            layout.body_top() + m.padding_y + row as f32 * m.row_height + m.row_height / 2.0
        };
        let input_x = left + m.padding_x + m.port_size / 2.0;
        let output_x = right - m.padding_x - m.port_size / 2.0;

        if node.is_static_attribute() {
            if let Some(port) = node.outputs.first() {
                offsets.insert(port.id.clone(), Vec2::new(output_x, row_y(1)));
            }
            return offsets;
        }

        let attr_inputs = node.inputs.iter().filter(|p| !p.port_type.is_exec());
        for (row, port) in attr_inputs.enumerate() {
            offsets.insert(port.id.clone(), Vec2::new(input_x, row_y(row)));
        }
        let attr_outputs = node.outputs.iter().filter(|p| !p.port_type.is_exec());
        for (row, port) in attr_outputs.enumerate() {
            offsets.insert(port.id.clone(), Vec2::new(output_x, row_y(row)));
        }

        offsets
    }

    /// Resolve one node and cache the offsets on its ports
    pub fn apply(&self, graph: &mut Graph, node_id: &NodeId) -> bool {
        let Some(node) = graph.node(node_id) else {
            return false;
        };
        let offsets = self.resolve(node);
        graph.set_port_offsets(node_id, offsets)
    }

    /// Resolve every node in the graph, replacing whatever offsets it carried
    pub fn apply_all(&self, graph: &mut Graph) {
        let ids: Vec<NodeId> = graph.node_ids().cloned().collect();
        for node_id in &ids {
            self.apply(graph, node_id);
        }
        tracing::debug!("Resolved port anchors for {} nodes", ids.len());
    }

    /// Top-most node whose box contains a world position
    pub fn node_at(&self, graph: &Graph, world: Pos2) -> Option<NodeId> {
        graph
            .nodes()
            .rev()
            .find(|n| self.layout(n).rect(n.position()).contains(world))
            .map(|n| n.id.clone())
    }
}

/// World position of a port, falling back to the node center when the
/// port's offset has not been resolved yet
pub fn port_world_position(node: &Node, port_id: &PortId) -> Pos2 {
    let offset = node
        .port(port_id)
        .and_then(|p| p.offset)
        .unwrap_or(Vec2::ZERO);
    node.position() + offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LiteralValue;
    use crate::port::{Port, PortType};

    fn skill() -> Node {
        Node::new("n", "Skill", "keyboard_input")
            .with_position(100.0, 50.0)
            .with_port(Port::input("exec_in", "Exec", PortType::Exec))
            .with_port(Port::output("exec_out", "Exec", PortType::Exec))
            .with_port(Port::input("key", "Key", PortType::Char))
            .with_port(Port::input("times", "Times", PortType::Int))
            .with_port(Port::output("pressed", "Pressed", PortType::Bool))
    }

    #[test]
    fn test_layout_height() {
        let resolver = PortAnchorResolver::default();
        let layout = resolver.layout(&skill());
        assert_eq!(layout.header_height, HEADER_HEIGHT);
        assert_eq!(layout.height, HEADER_HEIGHT + 2.0 * PADDING_Y + 2.0 * ROW_HEIGHT);

        let bare = Node::new("b", "Bare", "skill");
        assert_eq!(resolver.layout(&bare).height, 2.0 * PADDING_Y + ROW_HEIGHT);
    }

    #[test]
    fn test_exec_ports_sit_in_header() {
        let resolver = PortAnchorResolver::default();
        let node = skill();
        let layout = resolver.layout(&node);
        let offsets = resolver.resolve(&node);

        let exec_in = offsets[&PortId::new("exec_in")];
        let exec_out = offsets[&PortId::new("exec_out")];
        let header_y = layout.top() + HEADER_HEIGHT / 2.0;
        assert_eq!(exec_in.y, header_y);
        assert_eq!(exec_out.y, header_y);
        assert!(exec_in.x < 0.0 && exec_out.x > 0.0);
    }

    #[test]
    fn test_attribute_ports_stack_by_row() {
        let resolver = PortAnchorResolver::default();
        let offsets = resolver.resolve(&skill());

        let key = offsets[&PortId::new("key")];
        let times = offsets[&PortId::new("times")];
        let pressed = offsets[&PortId::new("pressed")];
        assert_eq!(times.y - key.y, ROW_HEIGHT);
        assert_eq!(key.x, times.x);
        assert_eq!(pressed.y, key.y);
        assert_eq!(pressed.x, -key.x);
    }

    #[test]
    fn test_static_attribute_has_single_anchor() {
        let resolver = PortAnchorResolver::default();
        let node = Node::static_attribute("Delay", LiteralValue::Float(0.25));
        let offsets = resolver.resolve(&node);
        assert_eq!(offsets.len(), 1);
        let offset = offsets[&node.outputs[0].id];
        assert!(offset.x > 0.0);
    }

    #[test]
    fn test_offsets_survive_translation() {
        let resolver = PortAnchorResolver::default();
        let mut graph = Graph::new();
        graph.add_node(skill()).unwrap();
        let id = NodeId::new("n");
        resolver.apply_all(&mut graph);

        let port = PortId::new("pressed");
        let before = port_world_position(graph.node(&id).unwrap(), &port);
        graph.move_node(&id, Vec2::new(30.0, -10.0));
        let after = port_world_position(graph.node(&id).unwrap(), &port);
        assert_eq!(after - before, Vec2::new(30.0, -10.0));
        resolver.apply_all(&mut graph);
        assert_eq!(port_world_position(graph.node(&id).unwrap(), &port), after);
    }

    #[test]
    fn test_apply_replaces_foreign_offsets() {
        let resolver = PortAnchorResolver::default();
        let mut graph = Graph::scaffold();
        let start = NodeId::new("start");
        let exec_out = PortId::new("exec_out");
        graph.set_port_offsets(&start, [(exec_out.clone(), Vec2::new(500.0, 500.0))]);

        resolver.apply_all(&mut graph);
        let node = graph.node(&start).unwrap();
        let anchor = port_world_position(node, &exec_out);
        assert_eq!(anchor - node.position(), resolver.resolve(node)[&exec_out]);
        assert!(resolver.layout(node).rect(node.position()).contains(anchor));
    }

    #[test]
    fn test_unresolved_port_falls_back_to_center() {
        let node = skill();
        assert_eq!(port_world_position(&node, &PortId::new("key")), node.position());
        assert_eq!(port_world_position(&node, &PortId::new("missing")), node.position());
    }

    #[test]
    fn test_node_at_prefers_topmost() {
        let resolver = PortAnchorResolver::default();
        let mut graph = Graph::new();
        graph.add_node(Node::new("below", "Below", "skill")).unwrap();
        graph
            .add_node(Node::new("above", "Above", "skill").with_position(20.0, 0.0))
            .unwrap();

        assert_eq!(resolver.node_at(&graph, Pos2::new(10.0, 0.0)), Some(NodeId::new("above")));
        assert_eq!(resolver.node_at(&graph, Pos2::new(-120.0, 0.0)), Some(NodeId::new("below")));
        assert_eq!(resolver.node_at(&graph, Pos2::new(0.0, 500.0)), None);
    }
}
