//! Pan/zoom viewport and screen ↔ graph coordinate conversion.
//!
//! Screen space is the host surface in pixels. Graph space is where node
//! positions live. `screen = graph * zoom + pan`.

use kurbo::{Point, Rect, Vec2};

/// Default zoom limits.
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// The viewport collaborator the editor drives for panning and zooming.
pub trait Viewport {
    /// Current pan offset in screen pixels.
    fn pan(&self) -> Vec2;

    fn set_pan(&mut self, pan: Vec2);

    fn zoom(&self) -> f64;

    /// Set an absolute zoom level, keeping the graph point under the
    /// screen point `about` fixed.
    fn set_zoom(&mut self, zoom: f64, about: Point);

    /// Multiply the zoom by `factor` about a screen point.
    /// Returns `false` when the zoom was already at a limit.
    fn zoom_by(&mut self, factor: f64, about: Point) -> bool;

    fn screen_to_graph(&self, screen: Point) -> Point;

    fn graph_to_screen(&self, graph: Point) -> Point;

    /// Convert a screen-space offset to a graph-space offset.
    fn screen_delta_to_graph(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom()
    }

    /// Translate the pan offset by a screen-space delta.
    fn pan_by(&mut self, delta: Vec2) {
        let pan = self.pan();
        self.set_pan(pan + delta);
    }
}

/// Camera state for pan/zoom on the infinite canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan: Vec2,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl Camera {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    /// The graph-space rectangle visible through a screen of `size`.
    pub fn visible_rect(&self, width: f64, height: f64) -> Rect {
        Rect::from_points(
            self.screen_to_graph(Point::ZERO),
            self.screen_to_graph(Point::new(width, height)),
        )
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

impl Viewport for Camera {
    fn pan(&self) -> Vec2 {
        self.pan
    }

    fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: f64, about: Point) {
        let anchor = self.screen_to_graph(about);
        self.zoom = self.clamp_zoom(zoom);
        // Keep `anchor` under the cursor.
        self.pan = about.to_vec2() - anchor.to_vec2() * self.zoom;
    }

    fn zoom_by(&mut self, factor: f64, about: Point) -> bool {
        let target = self.clamp_zoom(self.zoom * factor);
        if (target - self.zoom).abs() < f64::EPSILON {
            return false;
        }
        self.set_zoom(target, about);
        true
    }

    fn screen_to_graph(&self, screen: Point) -> Point {
        ((screen.to_vec2() - self.pan) / self.zoom).to_point()
    }

    fn graph_to_screen(&self, graph: Point) -> Point {
        (graph.to_vec2() * self.zoom + self.pan).to_point()
    }
}
