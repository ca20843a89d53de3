//! The renderer contract the editor core paints through.
//!
//! The core decides *when* and *what* to draw; a `Renderer` decides *how*.
//! One frame is always: `begin_frame` → `clear` → edges → nodes →
//! connection preview → marquee → `end_frame`.

use crate::hit::Hit;
use diagram_core::{DiagramNode, Edge, NodeId, Point, Rect};

/// What part of the canvas a frame must repaint.
#[derive(Debug, Clone, PartialEq)]
pub enum Damage {
    /// Everything (pan, zoom, first frame).
    Full,
    /// Only these graph-space rectangles, in the order they were invalidated.
    Regions(Vec<Rect>),
}

impl Damage {
    pub fn is_full(&self) -> bool {
        matches!(self, Damage::Full)
    }

    /// Whether `rect` needs repainting under this damage.
    pub fn touches(&self, rect: Rect) -> bool {
        match self {
            Damage::Full => true,
            Damage::Regions(regions) => regions
                .iter()
                .any(|r| diagram_core::rects_intersect(*r, rect)),
        }
    }
}

/// Per-node styling flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRenderOptions {
    /// Where to draw the node; differs from the model during a drag preview.
    pub bounds: Rect,
    pub selected: bool,
    pub hovered: bool,
    /// The node is being dragged and `bounds` is a preview position.
    pub previewing: bool,
}

/// Per-edge styling flags.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeRenderOptions {
    pub hovered: bool,
    /// One endpoint is being dragged.
    pub previewing: bool,
}

/// The rubber-band line shown while a connection is pending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionPreview {
    pub source: NodeId,
    pub from: Point,
    pub to: Point,
}

/// Draws diagram elements and answers hit-test queries.
pub trait Renderer {
    /// The topmost element at a graph-space point.
    fn element_at(&self, point: Point) -> Option<Hit>;

    fn begin_frame(&mut self, damage: &Damage);

    fn clear(&mut self);

    fn render_node(&mut self, node: &DiagramNode, options: &NodeRenderOptions);

    /// `source` and `target` are the (possibly previewed) endpoint bounds.
    fn render_edge(&mut self, edge: &Edge, source: Rect, target: Rect, options: &EdgeRenderOptions);

    fn render_connection_preview(&mut self, preview: &ConnectionPreview);

    fn render_marquee(&mut self, _rect: Rect) {}

    fn end_frame(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_damage_touches_overlapping_rects_only() {
        let damage = Damage::Regions(vec![Rect::new(0.0, 0.0, 10.0, 10.0)]);
        assert!(damage.touches(Rect::new(5.0, 5.0, 20.0, 20.0)));
        assert!(!damage.touches(Rect::new(50.0, 50.0, 60.0, 60.0)));
        assert!(Damage::Full.touches(Rect::new(50.0, 50.0, 60.0, 60.0)));
    }
}
