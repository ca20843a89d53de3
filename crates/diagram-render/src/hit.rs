//! Hit testing: point → element lookup.
//!
//! Works on the geometry of the last rendered frame, so a node that is
//! mid-drag is hit where it is drawn, not where the model still has it.

use diagram_core::{EdgeId, NodeId, Point, Rect};

/// Slop around an edge line, in graph units.
pub const EDGE_HIT_TOLERANCE: f64 = 4.0;

/// What kind of element a hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node,
    Edge,
}

/// The topmost interactive element under a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hit {
    Node(NodeId),
    Edge(EdgeId),
}

impl Hit {
    pub fn kind(&self) -> ElementKind {
        match self {
            Hit::Node(_) => ElementKind::Node,
            Hit::Edge(_) => ElementKind::Edge,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            Hit::Node(id) => Some(*id),
            Hit::Edge(_) => None,
        }
    }
}

/// Find the topmost node containing `p`.
/// `nodes` is in paint order, so the search walks it back to front.
pub fn hit_node(nodes: &[(NodeId, Rect)], p: Point) -> Option<NodeId> {
    nodes
        .iter()
        .rev()
        .find(|(_, bounds)| bounds.contains(p))
        .map(|(id, _)| *id)
}

/// Find the topmost edge passing within `tolerance` of `p`.
pub fn hit_edge(edges: &[(EdgeId, Point, Point)], p: Point, tolerance: f64) -> Option<EdgeId> {
    edges
        .iter()
        .rev()
        .find(|(_, a, b)| distance_to_segment(p, *a, *b) <= tolerance)
        .map(|(id, _, _)| *id)
}

/// Shortest distance from `p` to the segment `a`–`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 == 0.0 {
        return (p - a).hypot();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).hypot()
}

/// Where the line from the center of `rect` toward `toward` leaves the rect.
pub fn clip_to_border(rect: Rect, toward: Point) -> Point {
    let center = rect.center();
    let d = toward - center;
    if d.x == 0.0 && d.y == 0.0 {
        return center;
    }
    let half_w = rect.width() / 2.0;
    let half_h = rect.height() / 2.0;
    let sx = if d.x == 0.0 { f64::INFINITY } else { half_w / d.x.abs() };
    let sy = if d.y == 0.0 { f64::INFINITY } else { half_h / d.y.abs() };
    let s = sx.min(sy).min(1.0);
    center + d * s
}

/// Endpoints of an edge drawn between two node boxes.
pub fn edge_endpoints(source: Rect, target: Rect) -> (Point, Point) {
    (
        clip_to_border(source, target.center()),
        clip_to_border(target, source.center()),
    )
}
