// SPDX-License-Identifier: MIT OR Apache-2.0
//! Skill graph canvas for egui.
//!
//! Features:
//! - Grid that follows pan and zoom
//! - Node boxes with EXEC header and attribute port rows
//! - Connection rendering (bezier curves, dashed attribute wires)
//! - Panning, node dragging and wheel zoom through [`EditorState`]
//! - Zoom buttons and a status bar

use crate::anchor::port_world_position;
use crate::editor::{EditorState, PointerEvent, SkillGraphEditor};
use crate::node::Node;
use crate::persistence::PersistenceNotice;
use crate::port::{PortDirection, PortType};
use crate::render::CURVE_SEGMENTS;
use crate::transform::ViewTransform;
use egui::{Color32, Pos2, Rect, Shape, Stroke, Vec2};

/// Node visual parameters
const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;

/// Grid parameters
const GRID_SPACING: f32 = 40.0;

/// Zoom control parameters
const CONTROL_SIZE: f32 = 24.0;
const CONTROL_MARGIN: f32 = 8.0;

/// Paints an [`EditorState`] and feeds egui pointer input into it
#[derive(Debug, Clone)]
pub struct SkillGraphView {
    /// Draw the background grid
    pub show_grid: bool,
    /// Draw the status bar
    pub show_status_bar: bool,
    /// Last persistence problem, shown in the status bar
    notice: Option<String>,
}

impl SkillGraphView {
    /// Create a view with grid and status bar enabled
    pub fn new() -> Self {
        Self {
            show_grid: true,
            show_status_bar: true,
            notice: None,
        }
    }

    /// Render a whole editing session: apply persistence answers, draw the
    /// canvas, and save what the frame's input changed.
    pub fn show(&mut self, ui: &mut egui::Ui, editor: &mut SkillGraphEditor) {
        editor.poll();
        for notice in editor.drain_notices() {
            let PersistenceNotice::SaveFailed { attempts, error, .. } = notice;
            self.notice = Some(format!("Save failed after {attempts} attempts: {error}"));
        }
        if editor.save_status().last_error.is_none() {
            self.notice = None;
        }

        let loading = editor.is_loading();
        editor.edit(|state| self.ui(ui, state));
        if loading {
            ui.ctx().request_repaint();
        }
    }

    /// Render the canvas for `state` and handle this frame's input
    pub fn ui(&mut self, ui: &mut egui::Ui, state: &mut EditorState) {
        let rect = ui.available_rect_before_wrap();
        let _ = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        painter.rect_filled(rect, 0.0, Color32::from_rgb(24, 24, 27));
        if self.show_grid {
            draw_grid(&painter, rect, state.view());
        }

        let controls = controls_rect(rect);
        handle_input(ui, rect, controls, state);

        // Connections below nodes
        draw_connections(&painter, rect, state);
        draw_nodes(&painter, rect, state);

        draw_zoom_controls(ui, controls, state.view_mut());
        if self.show_status_bar {
            self.draw_status_bar(&painter, rect, state);
        }
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: Rect, state: &EditorState) {
        let graph = state.graph();
        painter.text(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0),
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Connections: {} | Zoom: {}%",
                graph.node_count(),
                graph.edge_count(),
                state.view().zoom_percent(),
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );

        if let Some(notice) = &self.notice {
            painter.text(
                Pos2::new(rect.right() - 5.0, rect.bottom() - 11.0),
                egui::Align2::RIGHT_CENTER,
                notice,
                egui::FontId::proportional(11.0),
                Color32::from_rgb(248, 113, 113),
            );
        }
    }
}

impl Default for SkillGraphView {
    fn default() -> Self {
        Self::new()
    }
}

/// World position to absolute screen position
fn to_screen(view: &ViewTransform, rect: Rect, world: Pos2) -> Pos2 {
    rect.min + view.to_screen(world).to_vec2()
}

/// Absolute screen position to canvas position
fn to_canvas(rect: Rect, screen: Pos2) -> Pos2 {
    (screen - rect.min).to_pos2()
}

fn controls_rect(rect: Rect) -> Rect {
    let size = Vec2::new(CONTROL_SIZE * 4.0, CONTROL_SIZE);
    Rect::from_min_size(
        Pos2::new(rect.right() - CONTROL_MARGIN - size.x, rect.top() + CONTROL_MARGIN),
        size,
    )
}

fn handle_input(ui: &egui::Ui, rect: Rect, controls: Rect, state: &mut EditorState) {
    let (pressed, released, hover, scroll) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.hover_pos(),
            i.raw_scroll_delta.y,
        )
    });

    match hover {
        Some(screen) if rect.contains(screen) => {
            let pos = to_canvas(rect, screen);
            if pressed && !controls.contains(screen) {
                state.handle_pointer(PointerEvent::Down { pos });
            }
            if state.drag().is_active() {
                state.handle_pointer(PointerEvent::Move { pos });
            }
            if scroll != 0.0 {
                // egui reports scrolling up as positive
                state.handle_pointer(PointerEvent::Wheel { pos, delta_y: -scroll });
            }
        }
        _ => {
            if state.drag().is_active() {
                state.handle_pointer(PointerEvent::Leave);
            }
        }
    }

    if released {
        state.handle_pointer(PointerEvent::Up);
    }
}

fn draw_grid(painter: &egui::Painter, rect: Rect, view: &ViewTransform) {
    let spacing = GRID_SPACING * view.scale();
    let major_spacing = spacing * 5.0;

    let grid_color_minor = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
    let grid_color_major = Color32::from_rgba_unmultiplied(80, 80, 80, 150);

    for (step, color) in [(spacing, grid_color_minor), (major_spacing, grid_color_major)] {
        let offset = Vec2::new(view.pan().x.rem_euclid(step), view.pan().y.rem_euclid(step));

        let mut x = rect.left() + offset.x;
        while x < rect.right() {
            painter.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                Stroke::new(1.0, color),
            );
            x += step;
        }

        let mut y = rect.top() + offset.y;
        while y < rect.bottom() {
            painter.line_segment(
                [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                Stroke::new(1.0, color),
            );
            y += step;
        }
    }
}

fn draw_connections(painter: &egui::Painter, rect: Rect, state: &EditorState) {
    let view = state.view();
    for curve in state.curves() {
        let points: Vec<Pos2> = curve
            .points(CURVE_SEGMENTS)
            .into_iter()
            .map(|p| to_screen(view, rect, p))
            .collect();
        let stroke = Stroke::new(curve.style.thickness * view.scale(), curve.style.color);

        match curve.style.dash {
            Some(dash) => {
                let dash = dash * view.scale();
                painter.extend(Shape::dashed_line(&points, stroke, dash, dash));
            }
            None => {
                painter.add(Shape::line(points, stroke));
            }
        }
    }
}

fn draw_nodes(painter: &egui::Painter, rect: Rect, state: &EditorState) {
    let view = state.view();
    let zoom = view.scale();
    let dragged = state.drag().dragged_node();

    for node in state.graph().nodes() {
        let layout = state.anchors().layout(node);
        let world_rect = layout.rect(node.position());
        let screen_rect = Rect::from_min_max(
            to_screen(view, rect, world_rect.min),
            to_screen(view, rect, world_rect.max),
        );

        // Check if node is visible
        if !screen_rect.intersects(rect) {
            continue;
        }

        painter.rect_filled(
            screen_rect.translate(Vec2::splat(NODE_SHADOW_OFFSET)),
            NODE_ROUNDING * zoom,
            Color32::from_rgba_unmultiplied(0, 0, 0, 60),
        );
        painter.rect_filled(screen_rect, NODE_ROUNDING * zoom, Color32::from_rgb(45, 45, 48));

        if layout.header_height > 0.0 {
            let header_rect = Rect::from_min_size(
                screen_rect.min,
                Vec2::new(screen_rect.width(), layout.header_height * zoom),
            );
            painter.rect_filled(
                header_rect,
                egui::Rounding {
                    nw: NODE_ROUNDING * zoom,
                    ne: NODE_ROUNDING * zoom,
                    sw: 0.0,
                    se: 0.0,
                },
                Color32::from_rgb(22, 101, 52),
            );
            painter.text(
                header_rect.center(),
                egui::Align2::CENTER_CENTER,
                &node.label,
                egui::FontId::proportional(12.0 * zoom),
                Color32::WHITE,
            );
        } else if node.is_static_attribute() {
            let m = state.anchors().metrics();
            painter.text(
                Pos2::new(
                    screen_rect.left() + m.padding_x * zoom,
                    screen_rect.top() + (m.padding_y + m.row_height / 2.0) * zoom,
                ),
                egui::Align2::LEFT_CENTER,
                &node.label,
                egui::FontId::proportional(12.0 * zoom),
                Color32::WHITE,
            );
        } else {
            painter.text(
                Pos2::new(screen_rect.center().x, screen_rect.top() - 4.0 * zoom),
                egui::Align2::CENTER_BOTTOM,
                &node.label,
                egui::FontId::proportional(12.0 * zoom),
                Color32::from_gray(220),
            );
        }

        if dragged == Some(&node.id) {
            painter.rect_stroke(
                screen_rect,
                NODE_ROUNDING * zoom,
                Stroke::new(2.0, Color32::from_rgb(100, 150, 255)),
            );
        }

        draw_ports(painter, rect, state, node);
    }
}

fn draw_ports(painter: &egui::Painter, rect: Rect, state: &EditorState, node: &Node) {
    let view = state.view();
    let zoom = view.scale();
    let m = state.anchors().metrics();

    for port in node.ports() {
        let pos = to_screen(view, rect, port_world_position(node, &port.id));
        let [r, g, b] = port.port_type.color();
        let color = Color32::from_rgb(r, g, b);

        if port.port_type == PortType::Exec {
            let size = m.exec_port_size * zoom;
            painter.rect_filled(Rect::from_center_size(pos, Vec2::splat(size)), 2.0 * zoom, color);
            continue;
        }

        let radius = m.port_size / 2.0 * zoom;
        painter.circle_filled(pos, radius, color);
        painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::from_gray(30)));

        let text = match (&node.value, node.is_static_attribute()) {
            (Some(value), true) => serde_json::to_string(value).unwrap_or_default(),
            _ => format!("{} ({})", port.label, port.port_type),
        };
        let (anchor, label_pos) = match port.direction {
            PortDirection::Input => (
                egui::Align2::LEFT_CENTER,
                Pos2::new(pos.x + m.padding_x * zoom, pos.y),
            ),
            PortDirection::Output => (
                egui::Align2::RIGHT_CENTER,
                Pos2::new(pos.x - m.padding_x * zoom, pos.y),
            ),
        };
        painter.text(
            label_pos,
            anchor,
            text,
            egui::FontId::proportional(10.0 * zoom),
            Color32::from_gray(200),
        );
    }
}

fn draw_zoom_controls(ui: &mut egui::Ui, controls: Rect, view: &mut ViewTransform) {
    let cell = |i: f32| {
        Rect::from_min_size(
            controls.min + Vec2::new(i * CONTROL_SIZE, 0.0),
            Vec2::splat(CONTROL_SIZE),
        )
    };

    if ui.put(cell(0.0), egui::Button::new("-")).clicked() {
        view.zoom_step(-1);
    }
    let percent = Rect::from_min_max(cell(1.0).min, cell(2.0).max);
    if ui
        .put(percent, egui::Button::new(format!("{}%", view.zoom_percent())))
        .on_hover_text("Reset view")
        .clicked()
    {
        view.reset();
    }
    if ui.put(cell(3.0), egui::Button::new("+")).clicked() {
        view.zoom_step(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::NodeId;

    fn frame(
        ctx: &egui::Context,
        view: &mut SkillGraphView,
        state: &mut EditorState,
        events: Vec<egui::Event>,
    ) {
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(1280.0, 720.0))),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| view.ui(ui, state));
        });
    }

    fn button(pos: Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::default(),
        }
    }

    #[test]
    fn test_paints_without_input() {
        let ctx = egui::Context::default();
        let mut view = SkillGraphView::new();
        let mut state = EditorState::default();
        state.replace_graph(Graph::scaffold());

        let revision = state.graph().revision();
        frame(&ctx, &mut view, &mut state, Vec::new());
        assert_eq!(state.graph().revision(), revision);
        assert!(!state.drag().is_active());
    }

    #[test]
    fn test_pointer_drag_moves_node() {
        let ctx = egui::Context::default();
        let mut view = SkillGraphView::new();
        let mut state = EditorState::default();
        state.replace_graph(Graph::scaffold());
        frame(&ctx, &mut view, &mut state, Vec::new());

        // The start node sits at (200, 300) in world space; the canvas is
        // inset by the panel margin, which the node box easily absorbs.
        let press = Pos2::new(205.0, 305.0);
        frame(
            &ctx,
            &mut view,
            &mut state,
            vec![egui::Event::PointerMoved(press), button(press, true)],
        );
        assert_eq!(state.drag().dragged_node(), Some(&NodeId::new("start")));

        let target = press + Vec2::new(20.0, 0.0);
        frame(&ctx, &mut view, &mut state, vec![egui::Event::PointerMoved(target)]);
        frame(&ctx, &mut view, &mut state, vec![button(target, false)]);

        let start = state.graph().node(&NodeId::new("start")).unwrap();
        assert_eq!(start.position(), Pos2::new(220.0, 300.0));
        assert!(!state.drag().is_active());
    }
}
