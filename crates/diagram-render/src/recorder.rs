//! Headless renderer that records every draw call into a display list.
//!
//! Useful for hosts that rasterize elsewhere (replay the list onto a
//! canvas) and for tests, which assert on exactly what a frame drew.
//! Hit testing runs against the geometry of the last completed frame.

use crate::frame::{ConnectionPreview, Damage, EdgeRenderOptions, NodeRenderOptions, Renderer};
use crate::hit::{EDGE_HIT_TOLERANCE, Hit, edge_endpoints, hit_edge, hit_node};
use diagram_core::{DiagramNode, Edge, EdgeId, NodeId, Point, Rect};

/// One recorded draw operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear,
    Node {
        id: NodeId,
        bounds: Rect,
        selected: bool,
        hovered: bool,
        previewing: bool,
    },
    Edge {
        id: EdgeId,
        from: Point,
        to: Point,
        directed: bool,
        hovered: bool,
    },
    ConnectionPreview {
        from: Point,
        to: Point,
    },
    Marquee(Rect),
}

#[derive(Debug, Default)]
pub struct FrameRecorder {
    /// Calls of the frame being built (or the last one once ended).
    calls: Vec<DrawCall>,
    /// Damage passed to the last `begin_frame`.
    damage: Option<Damage>,
    frames: u64,
    in_frame: bool,
    /// Hit geometry of the last completed frame.
    node_hits: Vec<(NodeId, Rect)>,
    edge_hits: Vec<(EdgeId, Point, Point)>,
}

impl FrameRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw calls of the last frame.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Number of completed frames.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn last_damage(&self) -> Option<&Damage> {
        self.damage.as_ref()
    }

    /// Ids of the nodes drawn in the last frame, in paint order.
    pub fn drawn_nodes(&self) -> Vec<NodeId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Node { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Ids of the edges drawn in the last frame, in paint order.
    pub fn drawn_edges(&self) -> Vec<EdgeId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Edge { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// The recorded call for a node in the last frame.
    pub fn node_call(&self, id: NodeId) -> Option<&DrawCall> {
        self.calls
            .iter()
            .find(|c| matches!(c, DrawCall::Node { id: n, .. } if *n == id))
    }
}

impl Renderer for FrameRecorder {
    fn element_at(&self, point: Point) -> Option<Hit> {
        hit_node(&self.node_hits, point)
            .map(Hit::Node)
            .or_else(|| hit_edge(&self.edge_hits, point, EDGE_HIT_TOLERANCE).map(Hit::Edge))
    }

    fn begin_frame(&mut self, damage: &Damage) {
        log::trace!("frame {} begin ({damage:?})", self.frames + 1);
        self.calls.clear();
        self.damage = Some(damage.clone());
        self.in_frame = true;
    }

    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }

    fn render_node(&mut self, node: &DiagramNode, options: &NodeRenderOptions) {
        self.calls.push(DrawCall::Node {
            id: node.id,
            bounds: options.bounds,
            selected: options.selected,
            hovered: options.hovered,
            previewing: options.previewing,
        });
    }

    fn render_edge(&mut self, edge: &Edge, source: Rect, target: Rect, options: &EdgeRenderOptions) {
        let (from, to) = edge_endpoints(source, target);
        self.calls.push(DrawCall::Edge {
            id: edge.id,
            from,
            to,
            directed: edge.directed,
            hovered: options.hovered,
        });
    }

    fn render_connection_preview(&mut self, preview: &ConnectionPreview) {
        self.calls.push(DrawCall::ConnectionPreview {
            from: preview.from,
            to: preview.to,
        });
    }

    fn render_marquee(&mut self, rect: Rect) {
        self.calls.push(DrawCall::Marquee(rect));
    }

    fn end_frame(&mut self) {
        if !self.in_frame {
            log::warn!("end_frame without begin_frame");
            return;
        }
        self.in_frame = false;
        self.frames += 1;
        self.node_hits.clear();
        self.edge_hits.clear();
        for call in &self.calls {
            match call {
                DrawCall::Node { id, bounds, .. } => self.node_hits.push((*id, *bounds)),
                DrawCall::Edge { id, from, to, .. } => self.edge_hits.push((*id, *from, *to)),
                _ => {}
            }
        }
    }
}
