//! Input abstraction layer.
//!
//! Normalizes mouse, touch, wheel and keyboard events from the host into a
//! unified `InputEvent` consumed by the event coordinator. Positions are
//! screen pixels; timestamps are host milliseconds and only ever compared
//! with each other.

use diagram_core::{Point, Vec2};

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Left mouse button (or a single finger).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button.
    Secondary,
}

/// Keyboard modifier state at the time of an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    /// Platform command key: Ctrl or Meta (⌘).
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Modifiers that extend a selection instead of replacing it.
    pub fn additive(&self) -> bool {
        self.shift || self.command()
    }
}

/// A normalized input event from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MouseDown {
        position: Point,
        button: PointerButton,
        modifiers: Modifiers,
        timestamp: u64,
    },
    MouseMove {
        position: Point,
        modifiers: Modifiers,
        timestamp: u64,
    },
    MouseUp {
        position: Point,
        button: PointerButton,
        modifiers: Modifiers,
        timestamp: u64,
    },
    /// A finger touched down. `id` distinguishes simultaneous touches.
    TouchStart {
        id: u64,
        position: Point,
        timestamp: u64,
    },
    TouchMove {
        id: u64,
        position: Point,
        timestamp: u64,
    },
    TouchEnd {
        id: u64,
        position: Point,
        timestamp: u64,
    },
    /// Scroll wheel / trackpad scroll. Negative `delta.y` scrolls up (zoom in).
    Wheel {
        position: Point,
        delta: Vec2,
        modifiers: Modifiers,
        timestamp: u64,
    },
    /// A key press. `key` is the DOM-style key name (`"z"`, `"Escape"`).
    KeyDown { key: String, modifiers: Modifiers },
    /// The pointer left the canvas.
    PointerLeave,
}

impl InputEvent {
    /// Extract position if this is a positional event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::MouseDown { position, .. }
            | Self::MouseMove { position, .. }
            | Self::MouseUp { position, .. }
            | Self::TouchStart { position, .. }
            | Self::TouchMove { position, .. }
            | Self::TouchEnd { position, .. }
            | Self::Wheel { position, .. } => Some(*position),
            Self::KeyDown { .. } | Self::PointerLeave => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::MouseDown { modifiers, .. }
            | Self::MouseMove { modifiers, .. }
            | Self::MouseUp { modifiers, .. }
            | Self::Wheel { modifiers, .. }
            | Self::KeyDown { modifiers, .. } => *modifiers,
            _ => Modifiers::NONE,
        }
    }

    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Self::MouseDown { timestamp, .. }
            | Self::MouseMove { timestamp, .. }
            | Self::MouseUp { timestamp, .. }
            | Self::TouchStart { timestamp, .. }
            | Self::TouchMove { timestamp, .. }
            | Self::TouchEnd { timestamp, .. }
            | Self::Wheel { timestamp, .. } => Some(*timestamp),
            Self::KeyDown { .. } | Self::PointerLeave => None,
        }
    }

    // Convenience constructors used by hosts and tests.

    pub fn mouse_down(x: f64, y: f64, timestamp: u64) -> Self {
        Self::MouseDown {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            timestamp,
        }
    }

    pub fn mouse_move(x: f64, y: f64, timestamp: u64) -> Self {
        Self::MouseMove {
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
            timestamp,
        }
    }

    pub fn mouse_up(x: f64, y: f64, timestamp: u64) -> Self {
        Self::MouseUp {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            timestamp,
        }
    }

    pub fn key(key: &str) -> Self {
        Self::KeyDown {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additive_modifiers() {
        assert!(!Modifiers::NONE.additive());
        assert!(Modifiers::SHIFT.additive());
        assert!(Modifiers::CTRL.additive());
        assert!(
            Modifiers {
                meta: true,
                ..Modifiers::NONE
            }
            .command()
        );
    }

    #[test]
    fn positional_accessors() {
        let e = InputEvent::mouse_move(3.0, 4.0, 17);
        assert_eq!(e.position(), Some(Point::new(3.0, 4.0)));
        assert_eq!(e.timestamp(), Some(17));
        assert_eq!(InputEvent::key("Escape").position(), None);
    }
}
