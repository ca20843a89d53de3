//! Diagram renderer contract, headless frame recorder, and hit testing.
//!
//! | Module | Role |
//! |--------|------|
//! | [`frame`] | The `Renderer` trait, frame damage, render options |
//! | [`recorder`] | `FrameRecorder`, a display-list renderer |
//! | [`hit`] | Point → element lookup and edge geometry |

pub mod frame;
pub mod hit;
pub mod recorder;

pub use frame::{ConnectionPreview, Damage, EdgeRenderOptions, NodeRenderOptions, Renderer};
pub use hit::{ElementKind, Hit};
pub use recorder::{DrawCall, FrameRecorder};
