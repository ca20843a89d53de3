//! Tool system for canvas interactions.
//!
//! A tool is the strategy the coordinator hands classified interactions to.
//! Every handler defaults to a no-op, so a tool only implements what it
//! reacts to. Tools never touch the model directly: they edit view state
//! and issue commands through the `ViewModel`.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Select Tool | Pan Tool | Connect Tool |
//! |----------|-------------|----------|--------------|
//! | **Shift / Ctrl / ⌘** | Toggle on click, additive marquee | — | — |

use crate::commands::CommandKind;
use crate::coordinator::{InteractionEvent, WheelEvent, wheel_zoom_factor};
use crate::gesture::Action;
use crate::view_model::ViewModel;
use diagram_core::{NodeId, Point, Rect, Vec2, Viewport};
use diagram_render::{ConnectionPreview, Hit};

/// What a tool may act on while handling one interaction.
pub struct ToolContext<'a> {
    pub view: &'a mut ViewModel,
    pub viewport: &'a mut dyn Viewport,
}

/// An interaction mode.
#[allow(unused_variables)]
pub trait Tool {
    fn name(&self) -> &str;

    /// CSS cursor name the host should show.
    fn cursor(&self) -> &'static str {
        "default"
    }

    /// Whether primary-button presses on empty canvas belong to this tool.
    /// If not, the coordinator pans the viewport instead.
    fn claims_background(&self) -> bool {
        false
    }

    fn activate(&mut self, ctx: &mut ToolContext<'_>) {}

    fn deactivate(&mut self, ctx: &mut ToolContext<'_>) {}

    fn on_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    fn on_double_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        self.on_click(event, ctx);
    }

    fn on_background_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    fn on_right_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    fn on_middle_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    fn on_tap(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        if event.hit.is_some() {
            self.on_click(event, ctx);
        } else {
            self.on_background_click(event, ctx);
        }
    }

    fn on_drag_start(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    fn on_drag(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    fn on_drag_end(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    fn on_drag_cancel(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {}

    /// Return `true` if the wheel event was consumed.
    fn on_wheel(&mut self, event: &WheelEvent, ctx: &mut ToolContext<'_>) -> bool {
        false
    }

    /// Pointer moved (any state). `graph` is the pointer in graph space.
    fn on_pointer_move(&mut self, graph: Point, ctx: &mut ToolContext<'_>) {}

    /// Escape or an external cancel.
    fn on_cancel(&mut self, ctx: &mut ToolContext<'_>) {}
}

/// Route a classified interaction to the matching tool handler.
pub fn dispatch(tool: &mut dyn Tool, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
    match event.action {
        Action::Click(_) => tool.on_click(event, ctx),
        Action::DoubleClick(_) | Action::DoubleTap(_) => tool.on_double_click(event, ctx),
        Action::BackgroundClick(_) => tool.on_background_click(event, ctx),
        Action::RightClick(_) => tool.on_right_click(event, ctx),
        Action::MiddleClick(_) => tool.on_middle_click(event, ctx),
        Action::Tap(_) => tool.on_tap(event, ctx),
        Action::DragStart(_) => tool.on_drag_start(event, ctx),
        Action::Drag(_) => tool.on_drag(event, ctx),
        Action::DragEnd(_) => tool.on_drag_end(event, ctx),
        Action::DragCancel(_) => tool.on_drag_cancel(event, ctx),
        Action::MultiTouchStart { .. } | Action::MultiTouchEnd => {}
    }
}

// ─── Select Tool ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum SelectDrag {
    /// Dragging the selection; the view model holds the preview.
    Move,
    /// Rubber-band selection from `start` (graph space).
    Marquee {
        start: Point,
        /// Selection kept under the marquee (additive drags).
        base: Vec<NodeId>,
        /// Selection to restore on cancel.
        before: Vec<NodeId>,
    },
}

#[derive(Debug, Default)]
pub struct SelectTool {
    drag: Option<SelectDrag>,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, Some(SelectDrag::Move))
    }

    pub fn is_marquee(&self) -> bool {
        matches!(self.drag, Some(SelectDrag::Marquee { .. }))
    }

    /// Follow the pointer: shift the move preview or grow the marquee.
    fn track(&self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        match &self.drag {
            Some(SelectDrag::Move) => ctx.view.update_drag_preview(event.graph_delta),
            Some(SelectDrag::Marquee { start, base, .. }) => {
                let rect = Rect::from_points(*start, event.graph);
                ctx.view.set_marquee(Some(rect));
                let hits = ctx.view.model().nodes_in_rect(rect);
                let ids: Vec<NodeId> = base.iter().copied().chain(hits).collect();
                ctx.view.select(ids);
            }
            None => {}
        }
    }

    fn abort(&mut self, ctx: &mut ToolContext<'_>) {
        match self.drag.take() {
            Some(SelectDrag::Move) => ctx.view.cancel_drag_preview(),
            Some(SelectDrag::Marquee { before, .. }) => {
                ctx.view.set_marquee(None);
                ctx.view.select(before);
            }
            None => {}
        }
    }
}

impl Tool for SelectTool {
    fn name(&self) -> &str {
        "select"
    }

    fn claims_background(&self) -> bool {
        true
    }

    fn deactivate(&mut self, ctx: &mut ToolContext<'_>) {
        self.abort(ctx);
    }

    fn on_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        let additive = event.modifiers.additive();
        match event.hit {
            Some(Hit::Node(id)) if additive => ctx.view.toggle_selection(id),
            Some(Hit::Node(id)) => ctx.view.select([id]),
            // Edges are not selectable.
            _ if !additive => ctx.view.clear_selection(),
            _ => {}
        }
    }

    fn on_background_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        if !event.modifiers.additive() {
            ctx.view.clear_selection();
        }
    }

    fn on_drag_start(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        let additive = event.modifiers.additive();
        if let Some(Hit::Node(id)) = event.hit {
            if !ctx.view.is_selected(id) {
                if additive {
                    ctx.view.add_to_selection(id);
                } else {
                    ctx.view.select([id]);
                }
            }
            let selection = ctx.view.selection().to_vec();
            ctx.view.begin_drag_preview(&selection);
            self.drag = Some(SelectDrag::Move);
            return;
        }

        let before = ctx.view.selection().to_vec();
        let base = if additive { before.clone() } else { Vec::new() };
        if !additive {
            ctx.view.clear_selection();
        }
        self.drag = Some(SelectDrag::Marquee {
            start: event.start,
            base,
            before,
        });
    }

    fn on_drag(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        self.track(event, ctx);
    }

    fn on_drag_end(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        // The release may land away from the last move.
        self.track(event, ctx);
        match self.drag.take() {
            Some(SelectDrag::Move) => {
                ctx.view.commit_drag_preview();
            }
            Some(SelectDrag::Marquee { .. }) => ctx.view.set_marquee(None),
            None => {}
        }
    }

    fn on_drag_cancel(&mut self, _event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        self.abort(ctx);
    }

    fn on_cancel(&mut self, ctx: &mut ToolContext<'_>) {
        if self.drag.is_some() {
            self.abort(ctx);
        } else {
            ctx.view.clear_selection();
        }
    }
}

// ─── Pan Tool ────────────────────────────────────────────────────────────

/// Drags move the viewport; the wheel zooms about the cursor.
#[derive(Debug, Default)]
pub struct PanTool {
    /// Pan offset when the drag started.
    origin: Option<Vec2>,
}

impl PanTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tool for PanTool {
    fn name(&self) -> &str {
        "pan"
    }

    fn cursor(&self) -> &'static str {
        if self.origin.is_some() { "grabbing" } else { "grab" }
    }

    fn deactivate(&mut self, _ctx: &mut ToolContext<'_>) {
        self.origin = None;
    }

    fn on_drag_start(&mut self, _event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        self.origin = Some(ctx.viewport.pan());
    }

    fn on_drag(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        if let Some(origin) = self.origin {
            ctx.viewport.set_pan(origin + event.screen_delta);
            ctx.view.invalidate_all();
        }
    }

    fn on_drag_end(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        self.on_drag(event, ctx);
        self.origin = None;
    }

    fn on_drag_cancel(&mut self, _event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        if let Some(origin) = self.origin.take() {
            ctx.viewport.set_pan(origin);
            ctx.view.invalidate_all();
        }
    }

    fn on_wheel(&mut self, event: &WheelEvent, ctx: &mut ToolContext<'_>) -> bool {
        let Some(factor) = wheel_zoom_factor(event.delta) else {
            return false;
        };
        if ctx.viewport.zoom_by(factor, event.screen) {
            ctx.view.invalidate_all();
        }
        true
    }
}

// ─── Connect Tool ────────────────────────────────────────────────────────

/// Click a source node, then a target node, to connect them.
#[derive(Debug, Default)]
pub struct ConnectTool {
    pending: Option<NodeId>,
}

impl ConnectTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source node of the armed connection.
    pub fn pending(&self) -> Option<NodeId> {
        self.pending
    }

    fn disarm(&mut self, ctx: &mut ToolContext<'_>) {
        if self.pending.take().is_some() {
            ctx.view.set_connection_preview(None);
        }
    }
}

impl Tool for ConnectTool {
    fn name(&self) -> &str {
        "connect"
    }

    fn cursor(&self) -> &'static str {
        "crosshair"
    }

    fn claims_background(&self) -> bool {
        true
    }

    fn deactivate(&mut self, ctx: &mut ToolContext<'_>) {
        self.disarm(ctx);
    }

    fn on_click(&mut self, event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        let Some(Hit::Node(target)) = event.hit else {
            self.disarm(ctx);
            return;
        };
        match self.pending {
            None => {
                let Some(bounds) = ctx.view.node_bounds(target) else {
                    return;
                };
                self.pending = Some(target);
                ctx.view.set_connection_preview(Some(ConnectionPreview {
                    source: target,
                    from: bounds.center(),
                    to: event.graph,
                }));
            }
            Some(source) if source == target => self.disarm(ctx),
            Some(source) => {
                self.disarm(ctx);
                if !ctx.view.execute_kind(CommandKind::connect(source, target)) {
                    log::debug!("connect {source} → {target} rejected");
                }
            }
        }
    }

    fn on_background_click(&mut self, _event: &InteractionEvent, ctx: &mut ToolContext<'_>) {
        self.disarm(ctx);
    }

    fn on_pointer_move(&mut self, graph: Point, ctx: &mut ToolContext<'_>) {
        if let Some(mut preview) = ctx.view.connection_preview().copied() {
            preview.to = graph;
            ctx.view.set_connection_preview(Some(preview));
        }
    }

    fn on_cancel(&mut self, ctx: &mut ToolContext<'_>) {
        self.disarm(ctx);
    }
}
