// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor state and the editing session of one bot.
//!
//! [`EditorState`] holds everything a canvas needs (graph, viewport,
//! active gesture, layout) and is driven by [`PointerEvent`]s.
//! [`SkillGraphEditor`] wraps it with a [`PersistenceBridge`]: it loads the
//! bot's graph on open and saves after every handled event that changed it.

use crate::anchor::PortAnchorResolver;
use crate::config::EditorConfig;
use crate::drag::{DragController, DragOutcome};
use crate::edge::Edge;
use crate::graph::{Graph, GraphError};
use crate::node::{Node, NodeId};
use crate::persistence::{
    PersistenceBridge, PersistenceError, PersistenceNotice, SaveOutcome, SaveStatus, StoreResponse,
};
use crate::port::{Port, PortId};
use crate::render::{ConnectionCurve, ConnectionRenderer};
use crate::store::{BotPath, GraphStore};
use crate::transform::ViewTransform;
use egui::Pos2;

/// Pointer input in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Primary button pressed
    Down {
        /// Pointer position
        pos: Pos2,
    },
    /// Pointer moved
    Move {
        /// Pointer position
        pos: Pos2,
    },
    /// Primary button released
    Up,
    /// Pointer left the canvas
    Leave,
    /// Mouse wheel turned
    Wheel {
        /// Pointer position
        pos: Pos2,
        /// Wheel delta, positive when scrolling down
        delta_y: f32,
    },
}

/// Graph, viewport and gesture state of a canvas
#[derive(Debug, Clone)]
pub struct EditorState {
    graph: Graph,
    view: ViewTransform,
    drag: DragController,
    anchors: PortAnchorResolver,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl EditorState {
    /// Empty state with the zoom and layout settings of `config`
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            graph: Graph::new(),
            view: ViewTransform::with_settings(config.zoom),
            drag: DragController::new(),
            anchors: PortAnchorResolver::new(config.layout),
        }
    }

    /// The graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The viewport
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Mutable viewport, for zoom buttons and resets
    pub fn view_mut(&mut self) -> &mut ViewTransform {
        &mut self.view
    }

    /// The gesture state machine
    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// The anchor resolver and layout
    pub fn anchors(&self) -> &PortAnchorResolver {
        &self.anchors
    }

    /// Swap in a whole graph, e.g. after a load. Cancels the active gesture
    /// and re-resolves every port anchor; stored offsets are not trusted.
    pub fn replace_graph(&mut self, graph: Graph) {
        self.drag.pointer_up();
        self.graph.replace(graph);
        self.anchors.apply_all(&mut self.graph);
    }

    /// Feed one pointer event through the gesture state machine
    pub fn handle_pointer(&mut self, event: PointerEvent) -> DragOutcome {
        match event {
            PointerEvent::Down { pos } => {
                let hit = self.node_at_screen(pos);
                self.drag.pointer_down(pos, hit);
                DragOutcome::None
            }
            PointerEvent::Move { pos } => {
                self.drag.pointer_move(pos, &mut self.view, &mut self.graph)
            }
            PointerEvent::Up | PointerEvent::Leave => {
                self.drag.pointer_up();
                DragOutcome::None
            }
            PointerEvent::Wheel { pos, delta_y } => {
                self.view.zoom_wheel(pos, delta_y);
                DragOutcome::None
            }
        }
    }

    /// Top-most node under a canvas position
    pub fn node_at_screen(&self, screen: Pos2) -> Option<NodeId> {
        self.anchors.node_at(&self.graph, self.view.to_world(screen))
    }

    /// Add a node and resolve its port anchors
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        let node_id = node.id.clone();
        self.graph.add_node(node)?;
        self.anchors.apply(&mut self.graph, &node_id);
        Ok(())
    }

    /// Remove a node with its edges
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        if self.drag.dragged_node() == Some(node_id) {
            self.drag.pointer_up();
        }
        self.graph.remove_node(node_id)
    }

    /// Add a port and re-resolve the node's anchors
    pub fn add_port(&mut self, node_id: &NodeId, port: Port) -> Result<(), GraphError> {
        self.graph.add_port(node_id, port)?;
        self.anchors.apply(&mut self.graph, node_id);
        Ok(())
    }

    /// Remove a port, its edges, and re-resolve the node's anchors
    pub fn remove_port(&mut self, node_id: &NodeId, port_id: &PortId) -> Result<Port, GraphError> {
        let port = self.graph.remove_port(node_id, port_id)?;
        self.anchors.apply(&mut self.graph, node_id);
        Ok(port)
    }

    /// Add a validated edge
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        self.graph.add_edge(edge).inspect_err(|e| {
            tracing::debug!("Rejected edge: {e}");
        })
    }

    /// Wire two ports, deriving the edge kind
    pub fn connect(
        &mut self,
        from_node: &NodeId,
        from_port: &PortId,
        to_node: &NodeId,
        to_port: &PortId,
    ) -> Result<Edge, GraphError> {
        self.graph
            .connect(from_node, from_port, to_node, to_port)
            .inspect_err(|e| {
                tracing::debug!("Rejected connection {from_node}.{from_port} -> {to_node}.{to_port}: {e}");
            })
    }

    /// Remove an edge
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        self.graph.remove_edge(edge)
    }

    /// Wires to draw this frame
    pub fn curves(&self) -> Vec<ConnectionCurve<'_>> {
        ConnectionRenderer::curves(&self.graph)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingLoad {
    version: u64,
    revision: u64,
}

/// Editing session of one bot's skill graph
pub struct SkillGraphEditor {
    bot: BotPath,
    state: EditorState,
    bridge: PersistenceBridge,
    pending_load: Option<PendingLoad>,
    /// Whether the canvas holds a real graph rather than the empty placeholder
    has_graph: bool,
    saved_revision: u64,
}

impl SkillGraphEditor {
    /// Start editing `bot`. The graph arrives asynchronously; until then the
    /// canvas is empty.
    pub fn open<S: GraphStore>(
        store: S,
        bot: BotPath,
        config: &EditorConfig,
    ) -> Result<Self, PersistenceError> {
        let mut bridge = PersistenceBridge::spawn(store, config.save_retry)?;
        let state = EditorState::new(config);
        let revision = state.graph().revision();
        let version = bridge.request_load(&bot)?;
        tracing::info!("Opening skill graph of {bot}");

        Ok(Self {
            bot,
            state,
            bridge,
            pending_load: Some(PendingLoad { version, revision }),
            has_graph: false,
            saved_revision: revision,
        })
    }

    /// Bot being edited
    pub fn bot(&self) -> &BotPath {
        &self.bot
    }

    /// Current state
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Whether the initial load is still outstanding
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Save progress
    pub fn save_status(&self) -> SaveStatus {
        self.bridge.status()
    }

    /// Notices to show the user
    pub fn drain_notices(&mut self) -> Vec<PersistenceNotice> {
        self.bridge.drain_notices()
    }

    /// Handle one pointer event, then save if the graph changed
    pub fn handle_pointer(&mut self, event: PointerEvent) -> DragOutcome {
        let outcome = self.state.handle_pointer(event);
        self.save_if_changed();
        outcome
    }

    /// Run one edit against the state, then save if the graph changed
    pub fn edit<R>(&mut self, edit: impl FnOnce(&mut EditorState) -> R) -> R {
        let result = edit(&mut self.state);
        self.save_if_changed();
        result
    }

    /// Fetch the stored graph again. Edits made before the answer arrives
    /// win over it, and a failed reload keeps the current graph.
    pub fn reload(&mut self) -> Result<(), PersistenceError> {
        let version = self.bridge.request_load(&self.bot)?;
        self.pending_load = Some(PendingLoad {
            version,
            revision: self.state.graph().revision(),
        });
        Ok(())
    }

    /// Apply every answer that has arrived, without blocking
    pub fn poll(&mut self) {
        while let Some(response) = self.bridge.try_recv() {
            self.handle_response(response);
        }
        self.save_if_changed();
    }

    /// Block until the pending load has been answered. Must not be called
    /// from inside an async runtime.
    pub fn wait_for_load(&mut self) {
        while self.pending_load.is_some() {
            match self.bridge.recv_blocking() {
                Some(response) => self.handle_response(response),
                None => {
                    tracing::error!("Persistence worker stopped before answering the load");
                    self.pending_load = None;
                }
            }
        }
        self.save_if_changed();
    }

    /// Block until every request has been answered. Must not be called
    /// from inside an async runtime.
    pub fn flush(&mut self) {
        self.save_if_changed();
        while !self.bridge.is_idle() {
            match self.bridge.recv_blocking() {
                Some(response) => self.handle_response(response),
                None => break,
            }
        }
    }

    /// Finish outstanding saves and stop the worker
    pub fn close(mut self) {
        self.save_if_changed();
        self.bridge.shutdown();
        tracing::info!("Closed skill graph of {}", self.bot);
    }

    fn handle_response(&mut self, response: StoreResponse) {
        match response {
            StoreResponse::Loaded { version, result } => self.apply_load(version, result),
            StoreResponse::Saved { version, outcome } => match outcome {
                SaveOutcome::Persisted { attempts } => {
                    tracing::debug!(
                        "Saved skill graph v{version} of {} ({attempts} attempts)",
                        self.bot
                    );
                }
                SaveOutcome::Superseded => {
                    tracing::debug!("Skill graph save v{version} of {} superseded", self.bot);
                }
                SaveOutcome::Failed { .. } => {}
            },
        }
    }

    fn apply_load(&mut self, version: u64, result: Result<Graph, PersistenceError>) {
        let Some(pending) = self.pending_load.filter(|p| p.version == version) else {
            tracing::debug!("Ignoring unexpected graph load v{version}");
            return;
        };
        self.pending_load = None;

        if self.state.graph().revision() != pending.revision {
            tracing::warn!(
                "Discarding graph load v{version} of {}: graph was edited while loading",
                self.bot
            );
            self.has_graph = true;
            return;
        }

        match result {
            Ok(graph) => {
                tracing::info!(
                    "Loaded skill graph of {} ({} nodes, {} edges)",
                    self.bot,
                    graph.node_count(),
                    graph.edge_count()
                );
                self.state.replace_graph(graph);
                self.saved_revision = self.state.graph().revision();
            }
            Err(e) if self.has_graph => {
                tracing::warn!(
                    "Failed to reload skill graph of {}: {e}; keeping current graph",
                    self.bot
                );
            }
            Err(e) => {
                self.state.replace_graph(Graph::scaffold());
                if e.is_not_found() {
                    // Left unsaved so a first-time bot gets the scaffold written
                    tracing::info!(
                        "No skill graph stored for {}; creating the default graph",
                        self.bot
                    );
                } else {
                    // Whatever the store holds is left alone until the user edits
                    tracing::warn!(
                        "Failed to load skill graph of {}: {e}; showing default graph",
                        self.bot
                    );
                    self.saved_revision = self.state.graph().revision();
                }
            }
        }
        self.has_graph = true;
    }

    fn save_if_changed(&mut self) {
        let revision = self.state.graph().revision();
        if revision == self.saved_revision {
            return;
        }
        self.saved_revision = revision;
        if let Err(e) = self.bridge.request_save(&self.bot, self.state.graph()) {
            tracing::error!("Failed to queue save of {}: {e}", self.bot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{decode_graph, encode_graph};
    use crate::port::PortType;
    use crate::store::MemoryGraphStore;
    use egui::Vec2;

    fn stored_graph(store: &MemoryGraphStore, bot: &BotPath) -> Graph {
        decode_graph(&store.get(bot).unwrap()).unwrap()
    }

    fn open(store: &MemoryGraphStore) -> SkillGraphEditor {
        SkillGraphEditor::open(store.clone(), "bot".into(), &EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_missing_graph_falls_back_to_scaffold_and_saves_it() {
        let store = MemoryGraphStore::new();
        let mut editor = open(&store);
        editor.wait_for_load();
        editor.flush();

        assert!(!editor.is_loading());
        let graph = editor.state().graph();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let stored = stored_graph(&store, &"bot".into());
        assert_eq!(stored.node_ids().count(), 2);
        assert_eq!(stored.edges().collect::<Vec<_>>(), graph.edges().collect::<Vec<_>>());
    }

    #[test]
    fn test_failing_store_falls_back_to_scaffold() {
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&Graph::new()).unwrap());
        store.set_failing_loads(true);
        let mut editor = open(&store);
        editor.wait_for_load();
        editor.flush();

        let mut expected = Graph::scaffold();
        editor.state().anchors().apply_all(&mut expected);
        assert_eq!(editor.state().graph(), &expected);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_undecodable_document_is_not_overwritten() {
        let store = MemoryGraphStore::new();
        let document = r#"{"nodes": [{"id": "a", "x": 0, "y": 0, "label": "A", "skillType": "skill"}], "edges": [{"fromSkillId": "a", "fromPortId": "o", "toSkillId": "b", "toPortId": "i", "type": "attribute"}]}"#;
        store.insert("bot".into(), document);
        let mut editor = open(&store);
        editor.wait_for_load();
        editor.flush();

        assert_eq!(editor.state().graph().node_count(), 2);
        assert!(store.writes().is_empty());
        assert_eq!(store.get(&"bot".into()).as_deref(), Some(document));
    }

    #[test]
    fn test_parallel_edges_in_stored_graph_survive_open() {
        let mut graph = Graph::scaffold();
        graph.add_node(Node::new("extra", "UserStart", "skill")).unwrap();
        let mut document = crate::graph::GraphDocument::from(graph);
        document.edges.push(document.edges[0].clone());
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), serde_json::to_string(&document).unwrap());

        let mut editor = open(&store);
        editor.wait_for_load();
        editor.flush();

        let graph = editor.state().graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_failed_reload_keeps_current_graph() {
        let mut graph = Graph::scaffold();
        graph.add_node(Node::new("third", "Third", "skill")).unwrap();
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&graph).unwrap());
        let mut editor = open(&store);
        editor.wait_for_load();
        assert_eq!(editor.state().graph().node_count(), 3);

        store.set_failing_loads(true);
        editor.reload().unwrap();
        editor.wait_for_load();
        editor.flush();

        assert_eq!(editor.state().graph().node_count(), 3);
        assert_eq!(stored_graph(&store, &"bot".into()).node_count(), 3);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_reload_picks_up_stored_changes() {
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&Graph::scaffold()).unwrap());
        let mut editor = open(&store);
        editor.wait_for_load();

        let mut changed = Graph::scaffold();
        changed.move_node(&NodeId::new("end"), Vec2::new(0.0, 80.0));
        store.insert("bot".into(), encode_graph(&changed).unwrap());
        editor.reload().unwrap();
        assert!(editor.is_loading());
        editor.wait_for_load();
        editor.flush();

        let end = editor.state().graph().node(&NodeId::new("end")).unwrap();
        assert_eq!(end.position(), Pos2::new(1000.0, 380.0));
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_loaded_offsets_are_re_resolved() {
        let mut graph = Graph::scaffold();
        let start = NodeId::new("start");
        let exec_out = PortId::new("exec_out");
        graph.set_port_offsets(&start, [(exec_out.clone(), Vec2::new(500.0, 500.0))]);
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&graph).unwrap());

        let mut editor = open(&store);
        editor.wait_for_load();

        let state = editor.state();
        let node = state.graph().node(&start).unwrap();
        let offset = node.port(&exec_out).unwrap().offset;
        assert_eq!(offset, Some(state.anchors().resolve(node)[&exec_out]));
        assert_ne!(offset, Some(Vec2::new(500.0, 500.0)));
    }

    #[test]
    fn test_loaded_graph_is_not_written_back() {
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&Graph::scaffold()).unwrap());
        let mut editor = open(&store);
        editor.wait_for_load();
        editor.flush();

        assert_eq!(editor.state().graph().node_count(), 2);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_node_drag_is_saved() {
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&Graph::scaffold()).unwrap());
        let mut editor = open(&store);
        editor.wait_for_load();

        let start = NodeId::new("start");
        editor.handle_pointer(PointerEvent::Down { pos: Pos2::new(200.0, 300.0) });
        assert_eq!(editor.state().drag().dragged_node(), Some(&start));
        editor.handle_pointer(PointerEvent::Move { pos: Pos2::new(215.0, 300.0) });
        editor.handle_pointer(PointerEvent::Move { pos: Pos2::new(230.0, 290.0) });
        editor.handle_pointer(PointerEvent::Up);
        editor.flush();

        let stored = stored_graph(&store, &"bot".into());
        assert_eq!(stored.node(&start).unwrap().position(), Pos2::new(230.0, 290.0));
        assert!(!editor.state().drag().is_active());
    }

    #[test]
    fn test_panning_and_zooming_do_not_save() {
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&Graph::scaffold()).unwrap());
        let mut editor = open(&store);
        editor.wait_for_load();

        editor.handle_pointer(PointerEvent::Down { pos: Pos2::new(5.0, 5.0) });
        editor.handle_pointer(PointerEvent::Move { pos: Pos2::new(45.0, 25.0) });
        editor.handle_pointer(PointerEvent::Leave);
        assert_eq!(editor.state().view().pan(), Vec2::new(40.0, 20.0));

        editor.handle_pointer(PointerEvent::Wheel {
            pos: Pos2::new(100.0, 100.0),
            delta_y: -100.0,
        });
        editor.flush();

        assert!((editor.state().view().scale() - 1.1).abs() < 1e-5);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_edits_during_load_win_over_it() {
        let store = MemoryGraphStore::new();
        store.insert("bot".into(), encode_graph(&Graph::scaffold()).unwrap());
        let mut editor = open(&store);

        editor
            .edit(|state| state.add_node(Node::new("early", "Early", "skill")))
            .unwrap();
        editor.wait_for_load();
        editor.flush();

        let graph = editor.state().graph();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.contains_node(&NodeId::new("early")));
        assert_eq!(stored_graph(&store, &"bot".into()).node_count(), 1);
    }

    #[test]
    fn test_port_edits_re_resolve_anchors() {
        let mut state = EditorState::default();
        state.replace_graph(Graph::scaffold());
        let end = NodeId::new("end");

        state
            .add_port(&end, Port::input("damage", "Damage", PortType::Int))
            .unwrap();
        let node = state.graph().node(&end).unwrap();
        assert!(node.ports().all(|p| p.offset.is_some()));

        let offset = node.port(&PortId::new("damage")).unwrap().offset.unwrap();
        assert!(offset.x < 0.0);
        assert!(offset.y > 0.0);

        state.remove_port(&end, &PortId::new("exec_in")).unwrap();
        assert_eq!(state.graph().edge_count(), 0);
    }

    #[test]
    fn test_rejected_connection_leaves_graph_untouched() {
        let mut state = EditorState::default();
        state.replace_graph(Graph::scaffold());
        state
            .add_node(
                Node::new("value", "Value", "skill")
                    .with_port(Port::output("out", "Out", PortType::Float)),
            )
            .unwrap();
        let revision = state.graph().revision();

        let result = state.connect(
            &NodeId::new("value"),
            &PortId::new("out"),
            &NodeId::new("end"),
            &PortId::new("exec_in"),
        );
        assert!(matches!(result, Err(GraphError::KindMismatch { .. })));
        assert_eq!(state.graph().revision(), revision);
    }

    #[test]
    fn test_removing_dragged_node_ends_gesture() {
        let mut state = EditorState::default();
        state.replace_graph(Graph::scaffold());
        state.handle_pointer(PointerEvent::Down { pos: Pos2::new(1000.0, 300.0) });
        assert_eq!(state.drag().dragged_node(), Some(&NodeId::new("end")));

        state.remove_node(&NodeId::new("end"));
        assert!(!state.drag().is_active());
        assert_eq!(
            state.handle_pointer(PointerEvent::Move { pos: Pos2::new(1010.0, 300.0) }),
            DragOutcome::None
        );
        assert_eq!(state.view().pan(), Vec2::ZERO);
    }
}
