//! Diagram editor interaction core.
//!
//! | Module | Role |
//! |--------|------|
//! | [`input`] | Raw pointer, touch, wheel and key events |
//! | [`gesture`] | Event-to-gesture state machine |
//! | [`coordinator`] | Gesture routing, background pan and wheel zoom |
//! | [`tools`] | `Tool` trait with select, pan and connect tools |
//! | [`shortcuts`] | Keyboard shortcut resolution |
//! | [`commands`] | Undoable commands and the command type registry |
//! | [`history`] | Bounded undo/redo history with merging |
//! | [`view_model`] | Selection, hover, previews and render scheduling |
//! | [`dirty`] | Dirty region tracking |
//! | [`events`] | Listener registries |
//! | [`config`] | JSON editor configuration |
//! | [`editor`] | Host-facing `Editor` facade |

pub mod commands;
pub mod config;
pub mod coordinator;
pub mod dirty;
pub mod editor;
pub mod events;
pub mod gesture;
pub mod history;
pub mod input;
pub mod shortcuts;
pub mod tools;
pub mod view_model;

pub use commands::{Command, CommandError, CommandKind, CommandRegistry};
pub use config::{ConfigError, EditorConfig, GestureConfig, HistoryConfig};
pub use coordinator::{EventCoordinator, InteractionEvent, WheelEvent};
pub use editor::{Editor, EditorError};
pub use events::{ListenerId, Listeners};
pub use gesture::{Action, GestureState, GestureStateMachine};
pub use history::{CommandHistory, HistoryError, HistoryEvent, HistoryEventKind};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{ConnectTool, PanTool, SelectTool, Tool, ToolContext};
pub use view_model::ViewModel;
