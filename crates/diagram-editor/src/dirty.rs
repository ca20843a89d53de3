//! Dirty-region tracking.
//!
//! Collects the graph-space rectangles invalidated since the last frame.
//! A viewport change (pan, zoom) invalidates everything at once.

use diagram_core::Rect;
use diagram_render::Damage;

#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    regions: Vec<Rect>,
    full: bool,
}

impl DirtyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `rect` for repaint. Empty rectangles are ignored.
    pub fn mark(&mut self, rect: Rect) {
        if self.full || rect.area() <= 0.0 {
            return;
        }
        self.regions.push(rect);
    }

    pub fn mark_all(&mut self, rects: impl IntoIterator<Item = Rect>) {
        for rect in rects {
            self.mark(rect);
        }
    }

    /// Invalidate the whole view.
    pub fn mark_full(&mut self) {
        self.full = true;
        self.regions.clear();
    }

    pub fn is_dirty(&self) -> bool {
        self.full || !self.regions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    /// What the next frame must repaint, or `None` when nothing changed.
    pub fn damage(&self) -> Option<Damage> {
        if self.full {
            Some(Damage::Full)
        } else if self.regions.is_empty() {
            None
        } else {
            Some(Damage::Regions(self.regions.clone()))
        }
    }

    /// Take the pending damage and reset.
    pub fn take(&mut self) -> Option<Damage> {
        let damage = self.damage();
        self.clear();
        damage
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.full = false;
    }
}
