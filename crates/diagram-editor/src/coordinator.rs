//! Event coordinator: raw input → hit test → gesture → tool.
//!
//! Per pointer event the coordinator converts to graph space, asks the
//! renderer what is under the pointer, keeps hover current and feeds the
//! gesture state machine. Every classified action becomes an
//! `InteractionEvent`, which goes to interaction listeners and then to the
//! active tool.
//!
//! Two paths bypass the state machine:
//! - a primary press on empty canvas pans the viewport directly, unless the
//!   active tool claims background gestures;
//! - the wheel goes to the tool first, then zooms about the cursor.

use crate::config::GestureConfig;
use crate::editor::EditorError;
use crate::events::{ListenerId, Listeners};
use crate::gesture::{Action, GestureStateMachine};
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{Tool, ToolContext, dispatch};
use crate::view_model::ViewModel;
use diagram_core::{Point, Vec2, Viewport};
use diagram_render::{Hit, Renderer};

/// Zoom step per wheel notch (in); zooming out uses `ZOOM_OUT`.
pub const ZOOM_IN: f64 = 1.1;
pub const ZOOM_OUT: f64 = 0.9;

/// Zoom factor for a wheel delta, or `None` for a purely horizontal scroll.
pub fn wheel_zoom_factor(delta: Vec2) -> Option<f64> {
    if delta.y < 0.0 {
        Some(ZOOM_IN)
    } else if delta.y > 0.0 {
        Some(ZOOM_OUT)
    } else {
        None
    }
}

/// Topmost element under a screen point.
fn hit_test<R: Renderer + ?Sized>(renderer: &R, viewport: &dyn Viewport, screen: Point) -> Option<Hit> {
    renderer.element_at(viewport.screen_to_graph(screen))
}

// ─── Interaction events ──────────────────────────────────────────────────

/// A classified interaction, enriched for tools and listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionEvent {
    pub action: Action,
    /// Pointer in screen px (press point for clicks, current for drags).
    pub screen: Point,
    /// `screen` in graph space.
    pub graph: Point,
    /// Drag start in graph space; equals `graph` for clicks.
    pub start: Point,
    /// Drag offset in screen px.
    pub screen_delta: Vec2,
    /// Drag offset in graph space.
    pub graph_delta: Vec2,
    /// Element under the press.
    pub hit: Option<Hit>,
    pub modifiers: Modifiers,
    pub button: Option<PointerButton>,
    pub timestamp: u64,
}

impl InteractionEvent {
    /// Build from an action; target, modifiers and screen delta come from
    /// the action's payload.
    pub fn new(action: Action, screen: Point, graph: Point, graph_delta: Vec2) -> Self {
        let (hit, modifiers, button, screen_delta) = if let Some(c) = action.click() {
            (c.target, c.modifiers, Some(c.button), Vec2::ZERO)
        } else if let Some(d) = action.drag() {
            (d.target, d.modifiers, Some(d.button), d.delta)
        } else {
            (None, Modifiers::NONE, None, Vec2::ZERO)
        };
        Self {
            action,
            screen,
            graph,
            start: graph,
            screen_delta,
            graph_delta,
            hit,
            modifiers,
            button,
            timestamp: 0,
        }
    }

    pub fn is_click(&self) -> bool {
        matches!(
            self.action,
            Action::Click(_)
                | Action::DoubleClick(_)
                | Action::BackgroundClick(_)
                | Action::Tap(_)
                | Action::DoubleTap(_)
        )
    }

    pub fn is_double_click(&self) -> bool {
        matches!(self.action, Action::DoubleClick(_) | Action::DoubleTap(_))
    }

    pub fn is_drag(&self) -> bool {
        self.action.drag().is_some()
    }

    /// Nothing was under the press.
    pub fn is_background(&self) -> bool {
        self.hit.is_none()
    }
}

/// A wheel event offered to the active tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub screen: Point,
    pub graph: Point,
    pub delta: Vec2,
    pub modifiers: Modifiers,
}

// ─── Coordinator ─────────────────────────────────────────────────────────

pub struct EventCoordinator {
    gestures: GestureStateMachine,
    /// Registration order is kept for `tool_names`.
    tools: Vec<Box<dyn Tool>>,
    active: Option<usize>,
    /// Last screen point of a background pan in progress.
    background_pan: Option<Point>,
    last_pointer: Point,
    last_timestamp: u64,
    listeners: Listeners<InteractionEvent>,
}

impl std::fmt::Debug for EventCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCoordinator")
            .field("state", &self.gestures.state().name())
            .field("tools", &self.tool_names())
            .field("active", &self.active_tool_name())
            .field("background_pan", &self.background_pan)
            .finish_non_exhaustive()
    }
}

impl Default for EventCoordinator {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl EventCoordinator {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            gestures: GestureStateMachine::new(config),
            tools: Vec::new(),
            active: None,
            background_pan: None,
            last_pointer: Point::ZERO,
            last_timestamp: 0,
            listeners: Listeners::new(),
        }
    }

    pub fn gestures(&self) -> &GestureStateMachine {
        &self.gestures
    }

    pub fn is_panning(&self) -> bool {
        self.background_pan.is_some()
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    /// Register a tool under its `name()`, replacing any tool of that name.
    /// Add `tool`, replacing any tool of the same name. Replacing the active
    /// tool deactivates the old instance and activates the new one.
    pub fn register_tool(
        &mut self,
        tool: Box<dyn Tool>,
        view: &mut ViewModel,
        viewport: &mut dyn Viewport,
    ) {
        let Some(i) = self.tools.iter().position(|t| t.name() == tool.name()) else {
            self.tools.push(tool);
            return;
        };
        if self.active != Some(i) {
            self.tools[i] = tool;
            return;
        }
        let mut ctx = ToolContext { view, viewport };
        self.cancel_gesture(&mut ctx);
        self.tools[i].deactivate(&mut ctx);
        self.tools[i] = tool;
        self.tools[i].activate(&mut ctx);
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn active_tool_name(&self) -> Option<&str> {
        self.active.map(|i| self.tools[i].name())
    }

    pub fn active_tool(&self) -> Option<&dyn Tool> {
        self.active.map(|i| &*self.tools[i])
    }

    /// Switch tools. Any gesture in flight is cancelled and the previous
    /// tool deactivated before the new one activates.
    pub fn set_active_tool(
        &mut self,
        name: &str,
        view: &mut ViewModel,
        viewport: &mut dyn Viewport,
    ) -> Result<(), EditorError> {
        let next = self
            .tools
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| EditorError::UnknownTool(name.to_string()))?;
        if self.active == Some(next) {
            return Ok(());
        }

        let mut ctx = ToolContext { view, viewport };
        self.cancel_gesture(&mut ctx);
        if let Some(prev) = self.active {
            self.tools[prev].deactivate(&mut ctx);
        }
        log::debug!(
            "tool: {} → {name}",
            self.active_tool_name().unwrap_or("none")
        );
        self.active = Some(next);
        self.tools[next].activate(&mut ctx);
        Ok(())
    }

    // ─── Listeners ───────────────────────────────────────────────────────

    pub fn on_interaction(&mut self, f: impl FnMut(&InteractionEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // ─── Event entry point ───────────────────────────────────────────────

    /// Process one host event. Returns whether it was consumed.
    pub fn handle_event<R: Renderer + ?Sized>(
        &mut self,
        event: &InputEvent,
        view: &mut ViewModel,
        viewport: &mut dyn Viewport,
        renderer: &R,
    ) -> bool {
        if let Some(ts) = event.timestamp() {
            self.last_timestamp = ts;
        }
        if let Some(p) = event.position() {
            self.last_pointer = p;
        }
        log::trace!("input: {event:?}");

        let mut ctx = ToolContext { view, viewport };

        match *event {
            InputEvent::MouseDown {
                position,
                button,
                modifiers,
                timestamp,
            } => {
                let hit = hit_test(renderer, &*ctx.viewport, position);
                if button == PointerButton::Primary
                    && hit.is_none()
                    && self.gestures.is_idle()
                    && !self.active_claims_background()
                {
                    self.background_pan = Some(position);
                    return true;
                }
                let actions = self
                    .gestures
                    .mouse_down(position, button, hit, modifiers, timestamp);
                self.run_actions(&actions, &mut ctx, timestamp);
                true
            }
            InputEvent::MouseMove {
                position,
                modifiers,
                timestamp,
            } => {
                if let Some(last) = self.background_pan {
                    ctx.viewport.pan_by(position - last);
                    ctx.view.invalidate_all();
                    self.background_pan = Some(position);
                    return true;
                }
                let hit = hit_test(renderer, &*ctx.viewport, position);
                ctx.view.set_hover(hit);
                self.pointer_moved(position, &mut ctx);
                let actions = self.gestures.mouse_move(position, modifiers, timestamp);
                self.run_actions(&actions, &mut ctx, timestamp);
                true
            }
            InputEvent::MouseUp {
                position,
                modifiers,
                timestamp,
                ..
            } => {
                if let Some(last) = self.background_pan.take() {
                    ctx.viewport.pan_by(position - last);
                    ctx.view.invalidate_all();
                    return true;
                }
                let actions = self.gestures.mouse_up(position, modifiers, timestamp);
                self.run_actions(&actions, &mut ctx, timestamp);
                true
            }
            InputEvent::TouchStart {
                id,
                position,
                timestamp,
            } => {
                let hit = hit_test(renderer, &*ctx.viewport, position);
                let actions = self.gestures.touch_start(id, position, hit, timestamp);
                self.run_actions(&actions, &mut ctx, timestamp);
                true
            }
            InputEvent::TouchMove {
                id,
                position,
                timestamp,
            } => {
                self.pointer_moved(position, &mut ctx);
                let actions = self.gestures.touch_move(id, position, timestamp);
                self.run_actions(&actions, &mut ctx, timestamp);
                true
            }
            InputEvent::TouchEnd {
                id,
                position,
                timestamp,
            } => {
                let actions = self.gestures.touch_end(id, position, timestamp);
                self.run_actions(&actions, &mut ctx, timestamp);
                true
            }
            InputEvent::Wheel {
                position,
                delta,
                modifiers,
                ..
            } => self.wheel(position, delta, modifiers, &mut ctx),
            InputEvent::KeyDown { ref key, modifiers } => self.key_down(key, modifiers, &mut ctx),
            InputEvent::PointerLeave => {
                ctx.view.set_hover(None);
                true
            }
        }
    }

    fn active_claims_background(&self) -> bool {
        self.active_tool().is_some_and(|t| t.claims_background())
    }

    fn pointer_moved(&mut self, position: Point, ctx: &mut ToolContext<'_>) {
        let graph = ctx.viewport.screen_to_graph(position);
        if let Some(i) = self.active {
            self.tools[i].on_pointer_move(graph, ctx);
        }
    }

    fn wheel(
        &mut self,
        position: Point,
        delta: Vec2,
        modifiers: Modifiers,
        ctx: &mut ToolContext<'_>,
    ) -> bool {
        let event = WheelEvent {
            screen: position,
            graph: ctx.viewport.screen_to_graph(position),
            delta,
            modifiers,
        };
        if let Some(i) = self.active
            && self.tools[i].on_wheel(&event, ctx)
        {
            return true;
        }
        let Some(factor) = wheel_zoom_factor(delta) else {
            return false;
        };
        if ctx.viewport.zoom_by(factor, position) {
            ctx.view.invalidate_all();
        }
        true
    }

    fn key_down(&mut self, key: &str, modifiers: Modifiers, ctx: &mut ToolContext<'_>) -> bool {
        if key == "Escape" {
            self.background_pan = None;
            self.cancel_gesture(ctx);
            if let Some(i) = self.active {
                self.tools[i].on_cancel(ctx);
            }
            return true;
        }

        let Some(action) = ShortcutMap::resolve(key, modifiers) else {
            return false;
        };
        log::debug!("shortcut {key:?} → {action:?}");
        match action {
            ShortcutAction::Undo => {
                ctx.view.undo();
            }
            ShortcutAction::Redo => {
                ctx.view.redo();
            }
            ShortcutAction::Delete => {
                ctx.view.delete_selection();
            }
            ShortcutAction::SelectAll => ctx.view.select_all(),
            ShortcutAction::ZoomIn | ShortcutAction::ZoomOut => {
                let factor = if action == ShortcutAction::ZoomIn {
                    ZOOM_IN
                } else {
                    ZOOM_OUT
                };
                if ctx.viewport.zoom_by(factor, self.last_pointer) {
                    ctx.view.invalidate_all();
                }
            }
            ShortcutAction::ToolSelect | ShortcutAction::ToolPan | ShortcutAction::ToolConnect => {
                let Some(name) = action.tool_name() else {
                    return false;
                };
                if let Err(e) = self.set_active_tool(name, ctx.view, ctx.viewport) {
                    log::warn!("{e}");
                    return false;
                }
            }
        }
        true
    }

    /// Abort the gesture in flight, telling the tool about a cancelled drag.
    fn cancel_gesture(&mut self, ctx: &mut ToolContext<'_>) {
        let actions = self.gestures.cancel(self.last_timestamp);
        let ts = self.last_timestamp;
        self.run_actions(&actions, ctx, ts);
    }

    fn run_actions(&mut self, actions: &[Action], ctx: &mut ToolContext<'_>, timestamp: u64) {
        for action in actions {
            let event = self.enrich(*action, &*ctx.viewport, timestamp);
            log::trace!("interaction: {}", action.name());
            self.listeners.emit(&event);
            if let Some(i) = self.active {
                dispatch(&mut *self.tools[i], &event, ctx);
            }
        }
    }

    fn enrich(&self, action: Action, viewport: &dyn Viewport, timestamp: u64) -> InteractionEvent {
        let (screen, start, delta) = match (action.click(), action.drag()) {
            (Some(c), _) => (c.position, c.position, Vec2::ZERO),
            (None, Some(d)) => (d.current, d.start, d.delta),
            (None, None) => (self.last_pointer, self.last_pointer, Vec2::ZERO),
        };
        let mut event = InteractionEvent::new(
            action,
            screen,
            viewport.screen_to_graph(screen),
            viewport.screen_delta_to_graph(delta),
        );
        event.start = viewport.screen_to_graph(start);
        event.timestamp = timestamp;
        event
    }
}
