//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. `Escape` is not
//! listed here: the coordinator handles it before lookup because it cancels
//! the gesture in flight as well as the tool.

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    ToolSelect,
    ToolPan,
    ToolConnect,

    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,

    // ── View ──
    ZoomIn,
    ZoomOut,
}

impl ShortcutAction {
    /// Registered tool name for the tool-switching actions.
    pub fn tool_name(&self) -> Option<&'static str> {
        match self {
            ShortcutAction::ToolSelect => Some("select"),
            ShortcutAction::ToolPan => Some("pan"),
            ShortcutAction::ToolConnect => Some("connect"),
            _ => None,
        }
    }
}

/// Resolves key events into shortcut actions.
///
/// Platform-aware: on macOS `meta` is ⌘, elsewhere `ctrl` plays that role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the DOM `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.command();

        // ── Modifier combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                _ => None,
            };
        }

        if modifiers.shift || modifiers.alt {
            return None;
        }

        // ── Single keys ──
        match key {
            "v" | "V" => Some(ShortcutAction::ToolSelect),
            "h" | "H" => Some(ShortcutAction::ToolPan),
            "c" | "C" => Some(ShortcutAction::ToolConnect),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "=" | "+" => Some(ShortcutAction::ZoomIn),
            "-" => Some(ShortcutAction::ZoomOut),
            _ => None,
        }
    }
}
