// SPDX-License-Identifier: MIT OR Apache-2.0
//! SVG export of a skill graph.

use egui::Rect;
use svg::node::element::{Circle, Group, Path, Rectangle, Text};
use svg::Document;
use talos_skill_graph::{port_world_position, ConnectionRenderer, Graph, PortAnchorResolver};

/// Space around the graph
const MARGIN: f32 = 40.0;
const NODE_ROUNDING: f32 = 6.0;
const BACKGROUND: &str = "#18181b";
const NODE_FILL: &str = "#2d2d30";
const HEADER_FILL: &str = "#166534";

fn hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Draw `graph` in world coordinates: wires below node boxes, ports on top
pub fn graph_to_svg(graph: &Graph, resolver: &PortAnchorResolver) -> Document {
    let mut graph = graph.clone();
    resolver.apply_all(&mut graph);

    let bounds = graph
        .nodes()
        .map(|n| resolver.layout(n).rect(n.position()))
        .fold(Rect::NOTHING, |acc, r| acc.union(r));
    let bounds = if bounds.is_positive() {
        bounds.expand(MARGIN)
    } else {
        Rect::from_min_size(egui::Pos2::ZERO, egui::Vec2::splat(2.0 * MARGIN))
    };

    let mut wires = Group::new().set("fill", "none");
    for curve in ConnectionRenderer::curves(&graph) {
        let mut path = Path::new()
            .set("d", curve.svg_path())
            .set("stroke", curve.style.hex_color())
            .set("stroke-width", curve.style.thickness);
        if let Some(dash) = curve.style.dash {
            path = path.set("stroke-dasharray", format!("{dash} {dash}"));
        }
        wires = wires.add(path);
    }

    let mut nodes = Group::new().set("font-family", "sans-serif");
    for node in graph.nodes() {
        let layout = resolver.layout(node);
        let rect = layout.rect(node.position());

        let mut group = Group::new().set("id", node.id.as_str()).add(
            Rectangle::new()
                .set("x", rect.min.x)
                .set("y", rect.min.y)
                .set("width", rect.width())
                .set("height", rect.height())
                .set("rx", NODE_ROUNDING)
                .set("fill", NODE_FILL),
        );
        if layout.header_height > 0.0 {
            group = group.add(
                Rectangle::new()
                    .set("x", rect.min.x)
                    .set("y", rect.min.y)
                    .set("width", rect.width())
                    .set("height", layout.header_height)
                    .set("fill", HEADER_FILL),
            );
        }
        group = group.add(
            Text::new(node.label.clone())
                .set("x", rect.center().x)
                .set("y", rect.min.y + 18.0)
                .set("text-anchor", "middle")
                .set("font-size", 12)
                .set("fill", "#ffffff"),
        );

        let m = resolver.metrics();
        for port in node.ports() {
            let pos = port_world_position(node, &port.id);
            let size = if port.port_type.is_exec() {
                m.exec_port_size
            } else {
                m.port_size
            };
            group = group.add(
                Circle::new()
                    .set("cx", pos.x)
                    .set("cy", pos.y)
                    .set("r", size / 2.0)
                    .set("fill", hex(port.port_type.color())),
            );
        }
        nodes = nodes.add(group);
    }

    Document::new()
        .set(
            "viewBox",
            (bounds.min.x, bounds.min.y, bounds.width(), bounds.height()),
        )
        .set("width", bounds.width())
        .set("height", bounds.height())
        .add(
            Rectangle::new()
                .set("x", bounds.min.x)
                .set("y", bounds.min.y)
                .set("width", bounds.width())
                .set("height", bounds.height())
                .set("fill", BACKGROUND),
        )
        .add(wires)
        .add(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use talos_skill_graph::{LiteralValue, Node, NodeId, Port, PortId, PortType};

    #[test]
    fn test_export_contains_wires_and_nodes() {
        let mut graph = Graph::scaffold();
        let value =
            Node::static_attribute("Retries", LiteralValue::Int(3)).with_position(600.0, 500.0);
        let value_id = value.id.clone();
        graph.add_node(value).unwrap();
        graph
            .add_port(&NodeId::new("end"), Port::input("count", "Count", PortType::Int))
            .unwrap();
        graph
            .connect(&value_id, &PortId::new("value"), &NodeId::new("end"), &PortId::new("count"))
            .unwrap();

        let svg = graph_to_svg(&graph, &PortAnchorResolver::default()).to_string();
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("#4ade80"));
        assert!(svg.contains("Retries"));
        assert!(svg.contains("id=\"start\""));
    }

    #[test]
    fn test_empty_graph_exports() {
        let svg = graph_to_svg(&Graph::new(), &PortAnchorResolver::default()).to_string();
        assert!(svg.contains("viewBox"));
        assert!(!svg.contains("<path"));
    }
}
