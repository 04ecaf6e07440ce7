// SPDX-License-Identifier: MIT OR Apache-2.0
//! Skill graph data structure containing nodes and edges.
//!
//! All mutations go through [`Graph`] methods so that every stored edge
//! always points at existing ports with the right direction and kind.

use crate::edge::Edge;
use crate::node::{Node, NodeId};
use crate::port::{EdgeKind, Port, PortDirection, PortId, PortType};
use egui::Vec2;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A skill graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphDocument", into = "GraphDocument")]
pub struct Graph {
    /// Nodes in draw order
    nodes: IndexMap<NodeId, Node>,
    /// Wires between ports
    edges: Vec<Edge>,
    /// Bumped on every mutation
    revision: u64,
}

/// Wire form of a graph, as stored by the graph store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Nodes
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// The default graph for a bot that has none yet:
    /// `Start` (one EXEC output) wired to `End` (one EXEC input).
    pub fn scaffold() -> Self {
        let start = Node::new("start", "Start", "start")
            .with_position(200.0, 300.0)
            .with_port(Port::output("exec_out", "Exec", PortType::Exec));
        let end = Node::new("end", "End", "end")
            .with_position(1000.0, 300.0)
            .with_port(Port::input("exec_in", "Exec", PortType::Exec));

        Self {
            nodes: [(start.id.clone(), start), (end.id.clone(), end)]
                .into_iter()
                .collect(),
            edges: vec![Edge::new(
                "start",
                "exec_out",
                "end",
                "exec_in",
                EdgeKind::Execution,
            )],
            revision: 0,
        }
    }

    /// Mutation counter; changes whenever the graph changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Replace the whole graph (used after a load)
    pub fn replace(&mut self, graph: Graph) {
        let revision = self.revision + 1;
        *self = graph;
        self.revision = revision;
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        if let Some(port) = node.duplicate_port() {
            return Err(GraphError::DuplicatePort {
                node: node.id.clone(),
                port: port.clone(),
            });
        }
        self.nodes.insert(node.id.clone(), node);
        self.touch();
        Ok(())
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(node_id)?;
        self.edges.retain(|e| !e.involves_node(node_id));
        self.touch();
        Some(node)
    }

    /// Move a node by a world-space delta. Unknown IDs are ignored.
    pub fn move_node(&mut self, node_id: &NodeId, delta: Vec2) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return false;
        };
        node.translate(delta);
        self.touch();
        true
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Check if a node exists
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Get all nodes, in draw order
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a port to an existing node
    pub fn add_port(&mut self, node_id: &NodeId, port: Port) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
        if node.port(&port.id).is_some() {
            return Err(GraphError::DuplicatePort {
                node: node_id.clone(),
                port: port.id,
            });
        }
        match port.direction {
            PortDirection::Input => node.inputs.push(port),
            PortDirection::Output => node.outputs.push(port),
        }
        // Every other port may shift
        node.clear_offsets();
        self.touch();
        Ok(())
    }

    /// Remove a port from a node along with the edges attached to it
    pub fn remove_port(&mut self, node_id: &NodeId, port_id: &PortId) -> Result<Port, GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
        let port = if let Some(i) = node.inputs.iter().position(|p| p.id == *port_id) {
            node.inputs.remove(i)
        } else if let Some(i) = node.outputs.iter().position(|p| p.id == *port_id) {
            node.outputs.remove(i)
        } else {
            return Err(GraphError::PortNotFound {
                node: node_id.clone(),
                port: port_id.clone(),
            });
        };
        node.clear_offsets();
        self.edges.retain(|e| !e.involves_port(node_id, port_id));
        self.touch();
        Ok(port)
    }

    /// Replace the resolved port offsets of a node. Ports not listed lose
    /// their offset.
    ///
    /// Offsets are a layout cache, so this does not count as a mutation.
    pub fn set_port_offsets(
        &mut self,
        node_id: &NodeId,
        offsets: impl IntoIterator<Item = (PortId, Vec2)>,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return false;
        };
        node.clear_offsets();
        for (port_id, offset) in offsets {
            if let Some(port) = node.port_mut(&port_id) {
                port.offset = Some(offset);
            }
        }
        true
    }

    /// Check that an edge joins existing ports output-to-input with a matching kind
    pub fn validate_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        let source_node = self
            .nodes
            .get(&edge.from_node)
            .ok_or_else(|| GraphError::NodeNotFound(edge.from_node.clone()))?;
        let target_node = self
            .nodes
            .get(&edge.to_node)
            .ok_or_else(|| GraphError::NodeNotFound(edge.to_node.clone()))?;

        let source_port = source_node
            .port(&edge.from_port)
            .ok_or_else(|| GraphError::PortNotFound {
                node: edge.from_node.clone(),
                port: edge.from_port.clone(),
            })?;
        let target_port = target_node
            .port(&edge.to_port)
            .ok_or_else(|| GraphError::PortNotFound {
                node: edge.to_node.clone(),
                port: edge.to_port.clone(),
            })?;

        if source_port.direction != PortDirection::Output {
            return Err(GraphError::WrongDirection {
                node: edge.from_node.clone(),
                port: edge.from_port.clone(),
                expected: PortDirection::Output,
            });
        }
        if target_port.direction != PortDirection::Input {
            return Err(GraphError::WrongDirection {
                node: edge.to_node.clone(),
                port: edge.to_port.clone(),
                expected: PortDirection::Input,
            });
        }
        if !source_port.can_connect(target_port) {
            return Err(GraphError::KindMismatch {
                from: source_port.kind(),
                to: target_port.kind(),
            });
        }
        if edge.kind != source_port.kind() {
            return Err(GraphError::EdgeKindMismatch {
                declared: edge.kind,
                ports: source_port.kind(),
            });
        }
        Ok(())
    }

    /// Add an edge after validating it. Self-loops and exact duplicates are
    /// refused here, though stored documents may contain them.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        self.validate_edge(&edge)?;
        if edge.from_node == edge.to_node {
            return Err(GraphError::SelfLoop(edge.from_node.clone()));
        }
        if self.edges.contains(&edge) {
            return Err(GraphError::DuplicateEdge);
        }
        self.edges.push(edge);
        self.touch();
        Ok(())
    }

    /// Wire an output port to an input port, deriving the edge kind from the ports
    pub fn connect(
        &mut self,
        from_node: &NodeId,
        from_port: &PortId,
        to_node: &NodeId,
        to_port: &PortId,
    ) -> Result<Edge, GraphError> {
        let kind = self
            .nodes
            .get(from_node)
            .and_then(|n| n.port(from_port))
            .map_or(EdgeKind::Attribute, Port::kind);
        let edge = Edge::new(
            from_node.clone(),
            from_port.clone(),
            to_node.clone(),
            to_port.clone(),
            kind,
        );
        self.add_edge(edge.clone())?;
        Ok(edge)
    }

    /// Remove an edge
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        let Some(index) = self.edges.iter().position(|e| e == edge) else {
            return false;
        };
        self.edges.remove(index);
        self.touch();
        true
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Get edges involving a node
    pub fn edges_for_node<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.involves_node(node_id))
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Re-check every edge against the current nodes
    pub fn validate(&self) -> Result<(), GraphError> {
        self.edges.iter().try_for_each(|e| self.validate_edge(e))
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl TryFrom<GraphDocument> for Graph {
    type Error = GraphError;

    fn try_from(document: GraphDocument) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for mut node in document.nodes {
            node.resolve_value_type();
            graph.add_node(node)?;
        }
        for edge in document.edges {
            graph.validate_edge(&edge)?;
            graph.edges.push(edge);
        }
        graph.revision = 0;
        Ok(graph)
    }
}

impl From<Graph> for GraphDocument {
    fn from(graph: Graph) -> Self {
        Self {
            nodes: graph.nodes.into_values().collect(),
            edges: graph.edges,
        }
    }
}

/// Error when mutating a graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node ID already used
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port ID already used on this node
    #[error("Duplicate port {port} on node {node}")]
    DuplicatePort {
        /// Owning node
        node: NodeId,
        /// Offending port
        port: PortId,
    },

    /// Port not found on the node
    #[error("Port {port} not found on node {node}")]
    PortNotFound {
        /// Owning node
        node: NodeId,
        /// Missing port
        port: PortId,
    },

    /// Edge endpoint has the wrong direction
    #[error("Port {port} on node {node} is not an {expected:?} port")]
    WrongDirection {
        /// Owning node
        node: NodeId,
        /// Offending port
        port: PortId,
        /// Direction the endpoint needs
        expected: PortDirection,
    },

    /// Execution port wired to attribute port, or the reverse
    #[error("Cannot wire {from:?} port to {to:?} port")]
    KindMismatch {
        /// Kind of the source port
        from: EdgeKind,
        /// Kind of the target port
        to: EdgeKind,
    },

    /// Declared edge kind differs from the ports it joins
    #[error("Edge declared as {declared:?} joins {ports:?} ports")]
    EdgeKindMismatch {
        /// Kind stored on the edge
        declared: EdgeKind,
        /// Kind of the ports
        ports: EdgeKind,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed on node {0}")]
    SelfLoop(NodeId),

    /// Identical edge already present
    #[error("Edge already exists")]
    DuplicateEdge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LiteralValue;

    fn two_skills() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node(
                Node::new("a", "A", "skill")
                    .with_port(Port::input("exec_in", "Exec", PortType::Exec))
                    .with_port(Port::output("exec_out", "Exec", PortType::Exec))
                    .with_port(Port::output("count", "Count", PortType::Int)),
            )
            .unwrap();
        graph
            .add_node(
                Node::new("b", "B", "skill")
                    .with_port(Port::input("exec_in", "Exec", PortType::Exec))
                    .with_port(Port::input("amount", "Amount", PortType::Float)),
            )
            .unwrap();
        graph
    }

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    fn port(s: &str) -> PortId {
        PortId::new(s)
    }

    #[test]
    fn test_scaffold_shape() {
        let graph = Graph::scaffold();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edges().next().unwrap();
        assert_eq!(edge.kind, EdgeKind::Execution);
        assert_eq!(edge.from_node, id("start"));
        assert_eq!(edge.to_node, id("end"));
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_connect_derives_kind() {
        let mut graph = two_skills();
        let exec = graph
            .connect(&id("a"), &port("exec_out"), &id("b"), &port("exec_in"))
            .unwrap();
        assert_eq!(exec.kind, EdgeKind::Execution);
        let attr = graph
            .connect(&id("a"), &port("count"), &id("b"), &port("amount"))
            .unwrap();
        assert_eq!(attr.kind, EdgeKind::Attribute);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_rejects_kind_mismatch() {
        let mut graph = two_skills();
        let err = graph
            .connect(&id("a"), &port("count"), &id("b"), &port("exec_in"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::KindMismatch {
                from: EdgeKind::Attribute,
                to: EdgeKind::Execution
            }
        );

        let forged = Edge::new("a", "exec_out", "b", "exec_in", EdgeKind::Attribute);
        assert!(matches!(
            graph.add_edge(forged),
            Err(GraphError::EdgeKindMismatch { .. })
        ));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_rejects_wrong_direction() {
        let mut graph = two_skills();
        let err = graph
            .connect(&id("b"), &port("exec_in"), &id("a"), &port("exec_in"))
            .unwrap_err();
        assert!(matches!(err, GraphError::WrongDirection { expected: PortDirection::Output, .. }));
    }

    #[test]
    fn test_rejects_missing_endpoints_and_self_loops() {
        let mut graph = two_skills();
        assert!(matches!(
            graph.connect(&id("a"), &port("exec_out"), &id("zzz"), &port("exec_in")),
            Err(GraphError::NodeNotFound(_))
        ));
        assert!(matches!(
            graph.connect(&id("a"), &port("nope"), &id("b"), &port("exec_in")),
            Err(GraphError::PortNotFound { .. })
        ));
        assert_eq!(
            graph.connect(&id("a"), &port("exec_out"), &id("a"), &port("exec_in")),
            Err(GraphError::SelfLoop(id("a")))
        );
    }

    #[test]
    fn test_rejects_parallel_edge() {
        let mut graph = two_skills();
        graph
            .connect(&id("a"), &port("exec_out"), &id("b"), &port("exec_in"))
            .unwrap();
        assert_eq!(
            graph.connect(&id("a"), &port("exec_out"), &id("b"), &port("exec_in")),
            Err(GraphError::DuplicateEdge)
        );
    }

    #[test]
    fn test_remove_node_removes_its_edges() {
        let mut graph = two_skills();
        graph
            .connect(&id("a"), &port("exec_out"), &id("b"), &port("exec_in"))
            .unwrap();
        graph
            .connect(&id("a"), &port("count"), &id("b"), &port("amount"))
            .unwrap();

        let removed = graph.remove_node(&id("b")).unwrap();
        assert_eq!(removed.label, "B");
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.validate().is_ok());
        assert!(graph.remove_node(&id("b")).is_none());
    }

    #[test]
    fn test_remove_port_drops_attached_edges() {
        let mut graph = two_skills();
        graph
            .connect(&id("a"), &port("exec_out"), &id("b"), &port("exec_in"))
            .unwrap();
        graph
            .connect(&id("a"), &port("count"), &id("b"), &port("amount"))
            .unwrap();

        graph.remove_port(&id("b"), &port("amount")).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.validate().is_ok());
        assert!(graph.remove_port(&id("b"), &port("amount")).is_err());
    }

    #[test]
    fn test_add_port_rejects_duplicates_and_clears_offsets() {
        let mut graph = two_skills();
        graph.set_port_offsets(&id("b"), [(port("amount"), Vec2::new(1.0, 2.0))]);
        assert!(graph.add_port(&id("b"), Port::input("amount", "Again", PortType::Int)).is_err());

        graph
            .add_port(&id("b"), Port::input("label", "Label", PortType::String))
            .unwrap();
        let node = graph.node(&id("b")).unwrap();
        assert!(node.ports().all(|p| p.offset.is_none()));
        assert_eq!(node.inputs.len(), 3);
    }

    #[test]
    fn test_move_node_and_revision() {
        let mut graph = two_skills();
        let before = graph.revision();
        assert!(!graph.move_node(&id("missing"), Vec2::new(5.0, 5.0)));
        assert_eq!(graph.revision(), before);

        assert!(graph.move_node(&id("a"), Vec2::new(5.0, -2.0)));
        let node = graph.node(&id("a")).unwrap();
        assert_eq!((node.x, node.y), (5.0, -2.0));
        assert!(graph.revision() > before);
    }

    #[test]
    fn test_offsets_do_not_bump_revision() {
        let mut graph = two_skills();
        let before = graph.revision();
        assert!(graph.set_port_offsets(&id("a"), [(port("count"), Vec2::new(3.0, 4.0))]));
        assert_eq!(graph.revision(), before);
        let offset = graph.node(&id("a")).unwrap().port(&port("count")).unwrap().offset;
        assert_eq!(offset, Some(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_document_round_trip() {
        let mut graph = two_skills();
        graph
            .connect(&id("a"), &port("count"), &id("b"), &port("amount"))
            .unwrap();
        graph.move_node(&id("b"), Vec2::new(412.25, -17.5));

        let json = serde_json::to_string_pretty(&graph).unwrap();
        let loaded: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, graph);
        assert_eq!(loaded.node_ids().collect::<Vec<_>>(), vec![&id("a"), &id("b")]);
    }

    #[test]
    fn test_decoding_keeps_parallel_edges_and_self_loops() {
        let mut graph = two_skills();
        graph
            .connect(&id("a"), &port("exec_out"), &id("b"), &port("exec_in"))
            .unwrap();
        let mut document = GraphDocument::from(graph);
        document.edges.push(document.edges[0].clone());
        document
            .edges
            .push(Edge::new("a", "exec_out", "a", "exec_in", EdgeKind::Execution));

        let json = serde_json::to_string(&document).unwrap();
        let loaded: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.edge_count(), 3);
        assert!(loaded.validate().is_ok());

        // Still refused as new edits
        let mut loaded = loaded;
        assert_eq!(
            loaded.connect(&id("a"), &port("exec_out"), &id("b"), &port("exec_in")),
            Err(GraphError::DuplicateEdge)
        );
    }

    #[test]
    fn test_empty_array_literal_round_trips() {
        let values = [
            LiteralValue::IntArray(vec![]),
            LiteralValue::FloatArray(vec![]),
            LiteralValue::StringArray(vec![]),
            LiteralValue::BoolArray(vec![]),
            LiteralValue::Float(2.0),
        ];
        for value in values {
            let mut graph = Graph::new();
            graph
                .add_node(Node::static_attribute("Ids", value.clone()))
                .unwrap();

            let json = serde_json::to_string(&graph).unwrap();
            let loaded: Graph = serde_json::from_str(&json).unwrap();
            assert_eq!(loaded, graph, "round trip of {value:?}");
        }
    }

    #[test]
    fn test_decoding_rejects_dangling_edge() {
        let json = r#"{
            "nodes": [
                { "id": "start", "x": 200, "y": 300, "label": "Start", "skillType": "start",
                  "inputs": [], "outputs": [ { "id": "exec_out", "label": "Exec", "type": "EXEC", "io": "output" } ] }
            ],
            "edges": [
                { "fromSkillId": "start", "fromPortId": "exec_out", "toSkillId": "end", "toPortId": "exec_in", "type": "execution" }
            ]
        }"#;
        assert!(serde_json::from_str::<Graph>(json).is_err());
    }
}
