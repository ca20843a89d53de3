//! Host-facing editor facade.
//!
//! Bundles the view model, the event coordinator, the camera and a
//! renderer behind the small surface a host (web canvas, native window,
//! test harness) needs: feed events, run commands, render, subscribe.

use crate::commands::{Command, CommandKind, CommandRegistry};
use crate::config::{ConfigError, EditorConfig};
use crate::coordinator::{EventCoordinator, InteractionEvent};
use crate::events::ListenerId;
use crate::history::{HistoryError, HistoryEvent};
use crate::input::InputEvent;
use crate::tools::{ConnectTool, PanTool, SelectTool, Tool};
use crate::view_model::ViewModel;
use diagram_core::{Camera, DiagramModel, NodeId};
use diagram_render::{FrameRecorder, Hit, Renderer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown command type: {0}")]
    UnknownCommandType(String),

    #[error("invalid {command} payload: {source}")]
    InvalidPayload {
        command: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Name of the tool active after construction.
pub const DEFAULT_TOOL: &str = "select";

pub struct Editor<R: Renderer = FrameRecorder> {
    view: ViewModel,
    coordinator: EventCoordinator,
    camera: Camera,
    renderer: R,
    registry: CommandRegistry,
    config: EditorConfig,
}

impl<R: Renderer> std::fmt::Debug for Editor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("view", &self.view)
            .field("coordinator", &self.coordinator)
            .field("camera", &self.camera)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> Editor<R> {
    /// An editor over `model` with the select, pan and connect tools
    /// registered and `select` active.
    pub fn new(model: impl DiagramModel + 'static, renderer: R, config: EditorConfig) -> Self {
        let mut editor = Self {
            view: ViewModel::new(model, config.history()),
            coordinator: EventCoordinator::new(config.gestures()),
            camera: Camera::with_limits(config.min_zoom, config.max_zoom),
            renderer,
            registry: CommandRegistry::new(),
            config,
        };
        editor.register_tool(Box::new(SelectTool::new()));
        editor.register_tool(Box::new(PanTool::new()));
        editor.register_tool(Box::new(ConnectTool::new()));
        if let Err(e) = editor.set_active_tool(DEFAULT_TOOL) {
            log::warn!("{e}");
        }
        editor
    }

    /// Like [`Editor::new`] with a JSON config blob.
    pub fn with_json_config(
        model: impl DiagramModel + 'static,
        renderer: R,
        config: &str,
    ) -> Result<Self, EditorError> {
        let config = EditorConfig::from_json(config)?;
        Ok(Self::new(model, renderer, config))
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn model(&self) -> &dyn DiagramModel {
        self.view.model()
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    /// Direct view-model access for selection and preview control.
    pub fn view_mut(&mut self) -> &mut ViewModel {
        &mut self.view
    }

    pub fn coordinator(&self) -> &EventCoordinator {
        &self.coordinator
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the camera (e.g. restoring a saved view). Repaints everything.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.view.invalidate_all();
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Register host-defined command types.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Build a command from its registered type name and JSON payload,
    /// then execute it. `Ok(false)` means it was valid JSON but rejected.
    pub fn execute_command_type(
        &mut self,
        command_type: &str,
        data: serde_json::Value,
    ) -> Result<bool, EditorError> {
        let command = self.registry.create(command_type, data)?;
        Ok(self.view.execute(command))
    }

    pub fn execute(&mut self, kind: CommandKind) -> bool {
        self.view.execute(Command::new(kind))
    }

    pub fn execute_command(&mut self, command: Command) -> bool {
        self.view.execute(command)
    }

    pub fn undo(&mut self) -> bool {
        self.view.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.view.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.view.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.view.can_redo()
    }

    pub fn selection(&self) -> &[NodeId] {
        self.view.selection()
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    pub fn register_tool(&mut self, tool: Box<dyn Tool>) {
        self.coordinator
            .register_tool(tool, &mut self.view, &mut self.camera);
    }

    pub fn set_active_tool(&mut self, name: &str) -> Result<(), EditorError> {
        self.coordinator
            .set_active_tool(name, &mut self.view, &mut self.camera)
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.coordinator.active_tool_name()
    }

    /// CSS cursor of the active tool.
    pub fn cursor(&self) -> &'static str {
        self.coordinator
            .active_tool()
            .map_or("default", |t| t.cursor())
    }

    // ─── Events & rendering ──────────────────────────────────────────────

    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        self.coordinator
            .handle_event(event, &mut self.view, &mut self.camera, &self.renderer)
    }

    /// Paint a frame if anything is dirty.
    pub fn render(&mut self) -> bool {
        self.view.render(&mut self.renderer)
    }

    // ─── Subscriptions ───────────────────────────────────────────────────

    pub fn on_selection_change(&mut self, f: impl FnMut(&Vec<NodeId>) + 'static) -> ListenerId {
        self.view.on_selection_change(f)
    }

    pub fn on_history_change(&mut self, f: impl FnMut(&HistoryEvent) + 'static) -> ListenerId {
        self.view.on_history_change(f)
    }

    pub fn on_hover_change(&mut self, f: impl FnMut(&Option<Hit>) + 'static) -> ListenerId {
        self.view.on_hover_change(f)
    }

    pub fn on_error(&mut self, f: impl FnMut(&EditorError) + 'static) -> ListenerId {
        self.view.on_error(f)
    }

    pub fn on_interaction(&mut self, f: impl FnMut(&InteractionEvent) + 'static) -> ListenerId {
        self.coordinator.on_interaction(f)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.view.unsubscribe(id) | self.coordinator.unsubscribe(id)
    }
}

impl Editor<FrameRecorder> {
    /// A headless editor recording frames instead of drawing them.
    pub fn headless(model: impl DiagramModel + 'static, config: EditorConfig) -> Self {
        Self::new(model, FrameRecorder::new(), config)
    }
}
