//! Diagram editor core data model.
//!
//! | Module | Role |
//! |--------|------|
//! | [`id`] | Interned node and edge identifiers |
//! | [`model`] | Nodes, edges, the `DiagramModel` contract and `DiagramGraph` |
//! | [`viewport`] | Pan/zoom camera and coordinate conversion |
//! | [`error`] | Model mutation errors |

pub mod error;
pub mod id;
pub mod model;
pub mod viewport;

pub use error::ModelError;
pub use id::{EdgeId, NodeId};
pub use model::*;
pub use viewport::{Camera, Viewport};

// Re-export the geometry types so downstream crates share one version.
pub use kurbo::{Point, Rect, Size, Vec2};
