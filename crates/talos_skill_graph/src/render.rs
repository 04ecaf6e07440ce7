// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection geometry: one cubic bezier per edge, in world space.
//!
//! Rendering is derived from the graph alone and holds no state, so it can
//! run every frame.

use crate::anchor::port_world_position;
use crate::edge::Edge;
use crate::graph::Graph;
use crate::port::EdgeKind;
use egui::{Color32, Pos2};
use std::fmt::Write;

/// Connection visual parameters
const EXEC_THICKNESS: f32 = 3.0;
const ATTRIBUTE_THICKNESS: f32 = 2.5;
const ATTRIBUTE_DASH: f32 = 5.0;

/// Segments used when flattening a curve
pub const CURVE_SEGMENTS: usize = 32;

/// How an edge is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireStyle {
    /// Stroke color
    pub color: Color32,
    /// Stroke width in world units
    pub thickness: f32,
    /// Dash length in world units, `None` for a solid line
    pub dash: Option<f32>,
}

impl WireStyle {
    /// Style for an edge kind
    pub fn for_kind(kind: EdgeKind) -> Self {
        let [r, g, b] = kind.color();
        match kind {
            EdgeKind::Execution => Self {
                color: Color32::from_rgb(r, g, b),
                thickness: EXEC_THICKNESS,
                dash: None,
            },
            EdgeKind::Attribute => Self {
                color: Color32::from_rgb(r, g, b),
                thickness: ATTRIBUTE_THICKNESS,
                dash: Some(ATTRIBUTE_DASH),
            },
        }
    }

    /// Color as `#rrggbb`
    pub fn hex_color(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.color.r(), self.color.g(), self.color.b())
    }
}

/// Resolved curve of one edge
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionCurve<'a> {
    /// The edge this curve draws
    pub edge: &'a Edge,
    /// Start (source port)
    pub from: Pos2,
    /// First control point
    pub ctrl1: Pos2,
    /// Second control point
    pub ctrl2: Pos2,
    /// End (target port)
    pub to: Pos2,
    /// Stroke
    pub style: WireStyle,
}

impl<'a> ConnectionCurve<'a> {
    /// Build the curve between two points. Both control points share the
    /// horizontal midpoint, giving an S-curve between side-by-side ports.
    pub fn between(edge: &'a Edge, from: Pos2, to: Pos2) -> Self {
        let mid_x = (from.x + to.x) / 2.0;
        Self {
            edge,
            from,
            ctrl1: Pos2::new(mid_x, from.y),
            ctrl2: Pos2::new(mid_x, to.y),
            to,
            style: WireStyle::for_kind(edge.kind),
        }
    }

    /// Point on the curve at `t` in `[0, 1]`
    pub fn point_at(&self, t: f32) -> Pos2 {
        cubic_bezier(self.from, self.ctrl1, self.ctrl2, self.to, t)
    }

    /// Flatten the curve into `segments + 1` points
    pub fn points(&self, segments: usize) -> Vec<Pos2> {
        bezier_points(self.from, self.ctrl1, self.ctrl2, self.to, segments)
    }

    /// SVG path data (`M .. C ..`)
    pub fn svg_path(&self) -> String {
        let mut d = String::new();
        let _ = write!(
            d,
            "M {} {} C {} {}, {} {}, {} {}",
            self.from.x,
            self.from.y,
            self.ctrl1.x,
            self.ctrl1.y,
            self.ctrl2.x,
            self.ctrl2.y,
            self.to.x,
            self.to.y
        );
        d
    }
}

/// Stateless edge renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionRenderer;

impl ConnectionRenderer {
    /// Curve for a single edge, or `None` if an endpoint node is missing
    pub fn curve<'a>(graph: &Graph, edge: &'a Edge) -> Option<ConnectionCurve<'a>> {
        let from = graph.node(&edge.from_node)?;
        let to = graph.node(&edge.to_node)?;
        Some(ConnectionCurve::between(
            edge,
            port_world_position(from, &edge.from_port),
            port_world_position(to, &edge.to_port),
        ))
    }

    /// Curves for every edge in the graph
    pub fn curves(graph: &Graph) -> Vec<ConnectionCurve<'_>> {
        graph
            .edges()
            .filter_map(|edge| Self::curve(graph, edge))
            .collect()
    }
}

/// Evaluate a cubic bezier at `t`
fn cubic_bezier(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, t: f32) -> Pos2 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    let x = mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x;
    let y = mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y;
    Pos2::new(x, y)
}

/// Generate points along a cubic bezier curve
pub fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| cubic_bezier(p0, p1, p2, p3, i as f32 / segments as f32))
        .collect()
}
