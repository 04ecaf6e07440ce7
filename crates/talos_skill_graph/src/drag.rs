// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer gesture state machine: canvas panning and node dragging.

use crate::graph::Graph;
use crate::node::NodeId;
use crate::transform::ViewTransform;
use egui::{Pos2, Vec2};

/// The active gesture. At most one exists at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    /// No button held
    #[default]
    Idle,
    /// Moving the viewport
    Panning {
        /// Last pointer position (screen space)
        last: Pos2,
    },
    /// Moving a single node
    DraggingNode {
        /// Node being dragged
        node: NodeId,
        /// Last pointer position (screen space)
        last: Pos2,
    },
}

/// What a pointer move did
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Nothing happened
    None,
    /// The viewport moved
    Panned,
    /// A node moved
    MovedNode(NodeId),
}

/// Turns pointer events into panning or node moves
#[derive(Debug, Clone, Default)]
pub struct DragController {
    gesture: Gesture,
}

impl DragController {
    /// Create an idle controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gesture
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Whether any gesture is active
    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Node currently being dragged
    pub fn dragged_node(&self) -> Option<&NodeId> {
        match &self.gesture {
            Gesture::DraggingNode { node, .. } => Some(node),
            _ => None,
        }
    }

    /// Pointer pressed at `screen`, over `hit` (a node) or over empty canvas.
    ///
    /// Returns `false` and keeps the current gesture if one is already active.
    pub fn pointer_down(&mut self, screen: Pos2, hit: Option<NodeId>) -> bool {
        if self.is_active() {
            tracing::debug!("Ignoring pointer down during {:?}", self.gesture);
            return false;
        }
        self.gesture = match hit {
            Some(node) => {
                tracing::debug!("Start dragging node {node}");
                Gesture::DraggingNode { node, last: screen }
            }
            None => Gesture::Panning { last: screen },
        };
        true
    }

    /// Pointer moved to `screen`
    pub fn pointer_move(
        &mut self,
        screen: Pos2,
        view: &mut ViewTransform,
        graph: &mut Graph,
    ) -> DragOutcome {
        match &mut self.gesture {
            Gesture::Idle => DragOutcome::None,
            Gesture::Panning { last } => {
                let delta = screen - *last;
                *last = screen;
                view.pan_by(delta);
                DragOutcome::Panned
            }
            Gesture::DraggingNode { node, last } => {
                let delta = view.screen_delta_to_world(screen - *last);
                *last = screen;
                if delta == Vec2::ZERO {
                    return DragOutcome::None;
                }
                if graph.move_node(node, delta) {
                    DragOutcome::MovedNode(node.clone())
                } else {
                    DragOutcome::None
                }
            }
        }
    }

    /// Pointer released or left the canvas
    pub fn pointer_up(&mut self) {
        if let Gesture::DraggingNode { node, .. } = &self.gesture {
            tracing::debug!("Stop dragging node {node}");
        }
        self.gesture = Gesture::Idle;
    }
}
