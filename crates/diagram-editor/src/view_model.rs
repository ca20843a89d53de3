//! View model: the editor state between the model and the renderer.
//!
//! Owns the model, the command history, selection, hover, the transient
//! previews (drag, pending connection, marquee) and the dirty-region
//! tracker. The model is only ever mutated through commands executed here;
//! previews are drawn on top without touching it.

use crate::commands::{Command, CommandKind};
use crate::config::HistoryConfig;
use crate::dirty::DirtyTracker;
use crate::editor::EditorError;
use crate::events::{ListenerId, Listeners};
use crate::history::{CommandHistory, HistoryError, HistoryEvent};
use diagram_core::{DiagramModel, Edge, ModelChange, NodeId, Point, Rect, Vec2};
use diagram_render::{ConnectionPreview, EdgeRenderOptions, Hit, NodeRenderOptions, Renderer};

/// One node being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewEntry {
    pub id: NodeId,
    pub original: Point,
    pub preview: Point,
}

/// Nodes following an in-progress drag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DragPreview {
    pub entries: Vec<PreviewEntry>,
    /// Graph-space offset from the original positions.
    pub offset: Vec2,
}

impl DragPreview {
    pub fn position_of(&self, id: NodeId) -> Option<Point> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.preview)
    }
}

pub struct ViewModel {
    model: Box<dyn DiagramModel>,
    history: CommandHistory,
    selection: Vec<NodeId>,
    hover: Option<Hit>,
    drag_preview: Option<DragPreview>,
    connection_preview: Option<ConnectionPreview>,
    marquee: Option<Rect>,
    dirty: DirtyTracker,
    selection_listeners: Listeners<Vec<NodeId>>,
    hover_listeners: Listeners<Option<Hit>>,
    error_listeners: Listeners<EditorError>,
}

impl std::fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModel")
            .field("history", &self.history)
            .field("selection", &self.selection)
            .field("hover", &self.hover)
            .field("drag_preview", &self.drag_preview)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl ViewModel {
    /// Wrap `model`. The first frame repaints everything.
    pub fn new(model: impl DiagramModel + 'static, config: HistoryConfig) -> Self {
        let mut model: Box<dyn DiagramModel> = Box::new(model);
        model.drain_changes();
        let mut dirty = DirtyTracker::new();
        dirty.mark_full();
        Self {
            model,
            history: CommandHistory::new(config),
            selection: Vec::new(),
            hover: None,
            drag_preview: None,
            connection_preview: None,
            marquee: None,
            dirty,
            selection_listeners: Listeners::new(),
            hover_listeners: Listeners::new(),
            error_listeners: Listeners::new(),
        }
    }

    pub fn model(&self) -> &dyn DiagramModel {
        &*self.model
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Run `command` through the history. Returns whether it was applied.
    pub fn execute(&mut self, command: Command) -> bool {
        let result = self.history.try_execute(command, &mut *self.model);
        self.after_history(result.map(drop))
    }

    pub fn execute_kind(&mut self, kind: CommandKind) -> bool {
        self.execute(Command::new(kind))
    }

    pub fn undo(&mut self) -> bool {
        let result = self.history.try_undo(&mut *self.model);
        self.after_history(result)
    }

    pub fn redo(&mut self) -> bool {
        let result = self.history.try_redo(&mut *self.model);
        self.after_history(result)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn after_history(&mut self, result: Result<(), HistoryError>) -> bool {
        // Failed commands may still have queued changes while rolling back.
        self.absorb_changes();
        match result {
            Ok(()) => true,
            Err(e @ (HistoryError::Rejected(_) | HistoryError::NothingToUndo | HistoryError::NothingToRedo)) => {
                log::debug!("{e}");
                false
            }
            Err(e) => {
                log::warn!("command failed: {e}");
                self.error_listeners.emit(&EditorError::History(e));
                false
            }
        }
    }

    /// Turn queued model changes into dirty regions and drop stale
    /// references to removed elements.
    fn absorb_changes(&mut self) {
        let changes = self.model.drain_changes();
        if changes.is_empty() {
            return;
        }
        let mut removed = Vec::new();
        for change in &changes {
            self.dirty.mark_all(change.dirty_rects());
            match change {
                ModelChange::NodeRemoved { id, .. } => removed.push(Hit::Node(*id)),
                ModelChange::EdgeRemoved { id, .. } => removed.push(Hit::Edge(*id)),
                ModelChange::NodeMoved {
                    id,
                    old_bounds,
                    new_bounds,
                } => {
                    // Attached edges move with the node.
                    let others: Vec<Rect> = self
                        .model
                        .connected_edges(*id)
                        .iter()
                        .filter_map(|e| {
                            let other = if e.source == *id { e.target } else { e.source };
                            self.node_bounds(other)
                        })
                        .collect();
                    for other in others {
                        self.dirty.mark(old_bounds.union(other));
                        self.dirty.mark(new_bounds.union(other));
                    }
                }
                ModelChange::NodeAdded { .. } | ModelChange::EdgeAdded { .. } => {}
            }
        }

        if self.hover.is_some_and(|h| removed.contains(&h)) {
            self.set_hover(None);
        }
        let before = self.selection.len();
        self.selection
            .retain(|id| !removed.contains(&Hit::Node(*id)));
        if self.selection.len() != before {
            self.selection_listeners.emit(&self.selection);
        }
        if let Some(preview) = &mut self.drag_preview {
            preview
                .entries
                .retain(|e| !removed.contains(&Hit::Node(e.id)));
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Selected node ids in selection order.
    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    /// Replace the selection. Unknown and repeated ids are skipped.
    pub fn select(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let mut next: Vec<NodeId> = Vec::new();
        for id in ids {
            if !id.is_root() && self.model.contains_node(id) && !next.contains(&id) {
                next.push(id);
            }
        }
        self.set_selection(next);
    }

    /// Add `id` if absent, remove it if present.
    pub fn toggle_selection(&mut self, id: NodeId) {
        let mut next = self.selection.clone();
        if let Some(pos) = next.iter().position(|s| *s == id) {
            next.remove(pos);
        } else if self.model.contains_node(id) && !id.is_root() {
            next.push(id);
        }
        self.set_selection(next);
    }

    pub fn add_to_selection(&mut self, id: NodeId) {
        if !self.is_selected(id) {
            self.toggle_selection(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Vec::new());
    }

    pub fn select_all(&mut self) {
        let all: Vec<NodeId> = self.model.nodes().iter().map(|n| n.id).collect();
        self.set_selection(all);
    }

    fn set_selection(&mut self, next: Vec<NodeId>) {
        if next == self.selection {
            return;
        }
        let touched: Vec<NodeId> = self
            .selection
            .iter()
            .chain(next.iter())
            .copied()
            .collect();
        for id in touched {
            if let Some(bounds) = self.node_bounds(id) {
                self.dirty.mark(bounds);
            }
        }
        self.selection = next;
        self.selection_listeners.emit(&self.selection);
    }

    /// Remove every selected node (and their edges) as one undo step.
    pub fn delete_selection(&mut self) -> bool {
        // Children go with their ancestors.
        let roots: Vec<NodeId> = self
            .selection
            .iter()
            .copied()
            .filter(|id| !self.has_selected_ancestor(*id))
            .collect();
        let mut kinds: Vec<CommandKind> = roots.into_iter().map(CommandKind::remove_node).collect();
        let kind = match kinds.len() {
            0 => return false,
            1 => kinds.swap_remove(0),
            n => CommandKind::batch(format!("Remove {n} nodes"), kinds),
        };
        self.execute_kind(kind)
    }

    fn has_selected_ancestor(&self, id: NodeId) -> bool {
        let mut current = self.model.parent_of(id);
        while let Some(parent) = current {
            if self.is_selected(parent) {
                return true;
            }
            current = self.model.parent_of(parent);
        }
        false
    }

    // ─── Hover ───────────────────────────────────────────────────────────

    pub fn hover(&self) -> Option<Hit> {
        self.hover
    }

    /// Returns whether the hover target changed.
    pub fn set_hover(&mut self, hit: Option<Hit>) -> bool {
        if hit == self.hover {
            return false;
        }
        for h in [self.hover, hit].into_iter().flatten() {
            if let Some(bounds) = self.element_bounds(h) {
                self.dirty.mark(bounds);
            }
        }
        self.hover = hit;
        self.hover_listeners.emit(&self.hover);
        true
    }

    // ─── Drag preview ────────────────────────────────────────────────────

    /// Start previewing `ids` at their current positions.
    pub fn begin_drag_preview(&mut self, ids: &[NodeId]) {
        self.cancel_drag_preview();
        let entries: Vec<PreviewEntry> = ids
            .iter()
            .filter_map(|id| {
                let node = self.model.node(*id)?;
                Some(PreviewEntry {
                    id: *id,
                    original: node.position,
                    preview: node.position,
                })
            })
            .collect();
        if entries.is_empty() {
            return;
        }
        self.drag_preview = Some(DragPreview {
            entries,
            offset: Vec2::ZERO,
        });
    }

    /// Move the preview to `offset` (graph space) from the originals.
    pub fn update_drag_preview(&mut self, offset: Vec2) {
        let Some(ids) = self
            .drag_preview
            .as_ref()
            .map(|p| p.entries.iter().map(|e| e.id).collect::<Vec<_>>())
        else {
            return;
        };
        self.mark_nodes_with_edges(&ids);
        if let Some(preview) = &mut self.drag_preview {
            preview.offset = offset;
            for entry in &mut preview.entries {
                entry.preview = entry.original + offset;
            }
        }
        self.mark_nodes_with_edges(&ids);
    }

    pub fn drag_preview(&self) -> Option<&DragPreview> {
        self.drag_preview.as_ref()
    }

    pub fn is_previewing(&self, id: NodeId) -> bool {
        self.drag_preview
            .as_ref()
            .is_some_and(|p| p.position_of(id).is_some())
    }

    /// Drop the preview without touching the model.
    pub fn cancel_drag_preview(&mut self) {
        if let Some(preview) = self.drag_preview.take() {
            let ids: Vec<NodeId> = preview.entries.iter().map(|e| e.id).collect();
            self.mark_nodes_with_edges(&ids);
            for e in &preview.entries {
                if let Some(node) = self.model.node(e.id) {
                    self.dirty.mark(node.bounds_at(e.preview));
                }
            }
        }
    }

    /// Commit the preview as one Move command (a batch for several nodes).
    /// Returns whether a command was applied.
    pub fn commit_drag_preview(&mut self) -> bool {
        let Some(preview) = self.drag_preview.clone() else {
            return false;
        };
        self.cancel_drag_preview();
        let mut moves: Vec<CommandKind> = preview
            .entries
            .iter()
            .filter(|e| e.preview != e.original)
            .map(|e| CommandKind::move_node(e.id, e.preview))
            .collect();
        let kind = match moves.len() {
            0 => return false,
            1 => moves.swap_remove(0),
            n => CommandKind::batch(format!("Move {n} nodes"), moves),
        };
        self.execute_kind(kind)
    }

    // ─── Connection preview and marquee ──────────────────────────────────

    pub fn connection_preview(&self) -> Option<&ConnectionPreview> {
        self.connection_preview.as_ref()
    }

    pub fn set_connection_preview(&mut self, preview: Option<ConnectionPreview>) {
        if preview == self.connection_preview {
            return;
        }
        for p in [self.connection_preview, preview].into_iter().flatten() {
            self.dirty.mark(Rect::from_points(p.from, p.to).inflate(2.0, 2.0));
        }
        self.connection_preview = preview;
    }

    pub fn marquee(&self) -> Option<Rect> {
        self.marquee
    }

    pub fn set_marquee(&mut self, rect: Option<Rect>) {
        if rect == self.marquee {
            return;
        }
        for r in [self.marquee, rect].into_iter().flatten() {
            self.dirty.mark(r.inflate(1.0, 1.0));
        }
        self.marquee = rect;
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Node bounds as currently displayed (preview position during a drag).
    pub fn node_bounds(&self, id: NodeId) -> Option<Rect> {
        let node = self.model.node(id)?;
        let position = self
            .drag_preview
            .as_ref()
            .and_then(|p| p.position_of(id))
            .unwrap_or(node.position);
        Some(node.bounds_at(position))
    }

    fn edge_bounds(&self, edge: &Edge) -> Option<Rect> {
        Some(self.node_bounds(edge.source)?.union(self.node_bounds(edge.target)?))
    }

    pub fn element_bounds(&self, hit: Hit) -> Option<Rect> {
        match hit {
            Hit::Node(id) => self.node_bounds(id),
            Hit::Edge(id) => self.edge_bounds(self.model.edge(id)?),
        }
    }

    fn mark_nodes_with_edges(&mut self, ids: &[NodeId]) {
        let mut rects: Vec<Rect> = ids.iter().filter_map(|id| self.node_bounds(*id)).collect();
        rects.extend(
            self.model
                .edges()
                .iter()
                .filter(|e| ids.iter().any(|id| e.touches(*id)))
                .filter_map(|e| self.edge_bounds(e)),
        );
        self.dirty.mark_all(rects);
    }

    // ─── Dirty regions & rendering ───────────────────────────────────────

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn mark_dirty(&mut self, rect: Rect) {
        self.dirty.mark(rect);
    }

    /// Invalidate the whole view (pan, zoom, resize).
    pub fn invalidate_all(&mut self) {
        self.dirty.mark_full();
    }

    /// Paint one frame if anything is dirty. Returns whether a frame ran.
    pub fn render<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> bool {
        let Some(damage) = self.dirty.damage() else {
            return false;
        };
        log::trace!("render frame, damage: {damage:?}");

        renderer.begin_frame(&damage);
        renderer.clear();

        for edge in self.model.edges() {
            let (Some(source), Some(target)) =
                (self.node_bounds(edge.source), self.node_bounds(edge.target))
            else {
                continue;
            };
            let options = EdgeRenderOptions {
                hovered: self.hover == Some(Hit::Edge(edge.id)),
                previewing: self.is_previewing(edge.source) || self.is_previewing(edge.target),
            };
            renderer.render_edge(edge, source, target, &options);
        }

        for node in self.model.nodes() {
            let Some(bounds) = self.node_bounds(node.id) else {
                continue;
            };
            let options = NodeRenderOptions {
                bounds,
                selected: self.is_selected(node.id),
                hovered: self.hover == Some(Hit::Node(node.id)),
                previewing: self.is_previewing(node.id),
            };
            renderer.render_node(node, &options);
        }

        if let Some(preview) = &self.connection_preview {
            renderer.render_connection_preview(preview);
        }
        if let Some(rect) = self.marquee {
            renderer.render_marquee(rect);
        }

        renderer.end_frame();
        self.dirty.clear();
        true
    }

    // ─── Listeners ───────────────────────────────────────────────────────

    pub fn on_selection_change(&mut self, f: impl FnMut(&Vec<NodeId>) + 'static) -> ListenerId {
        self.selection_listeners.subscribe(f)
    }

    pub fn on_hover_change(&mut self, f: impl FnMut(&Option<Hit>) + 'static) -> ListenerId {
        self.hover_listeners.subscribe(f)
    }

    pub fn on_error(&mut self, f: impl FnMut(&EditorError) + 'static) -> ListenerId {
        self.error_listeners.subscribe(f)
    }

    pub fn on_history_change(&mut self, f: impl FnMut(&HistoryEvent) + 'static) -> ListenerId {
        self.history.subscribe(f)
    }

    /// Drop a listener registered through any `on_*` method.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.selection_listeners.unsubscribe(id)
            | self.hover_listeners.unsubscribe(id)
            | self.error_listeners.unsubscribe(id)
            | self.history.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagram_core::{DiagramGraph, DiagramNode, EdgeId, Size};
    use diagram_render::{Damage, DrawCall, FrameRecorder};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn n(id: &str) -> NodeId {
        NodeId::intern(id)
    }

    fn view(nodes: &[(&str, f64, f64)]) -> ViewModel {
        let mut g = DiagramGraph::new();
        for (id, x, y) in nodes {
            g.add_node(
                DiagramNode::new(n(id), Point::new(*x, *y)).with_size(Size::new(50.0, 50.0)),
                NodeId::root(),
            )
            .unwrap();
        }
        let mut vm = ViewModel::new(g, HistoryConfig::default());
        let mut sink = FrameRecorder::new();
        vm.render(&mut sink);
        vm
    }

    #[test]
    fn render_is_a_noop_when_clean() {
        let mut vm = view(&[("v_clean", 0.0, 0.0)]);
        let mut r = FrameRecorder::new();
        assert!(!vm.render(&mut r));
        assert_eq!(r.frame_count(), 0);

        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        vm.mark_dirty(rect);
        assert!(vm.render(&mut r));
        assert_eq!(r.last_damage(), Some(&Damage::Regions(vec![rect])));
        assert!(!vm.render(&mut r));
        assert_eq!(r.frame_count(), 1);
    }

    #[test]
    fn move_marks_old_and_new_bounds() {
        let mut vm = view(&[("v_mv", 0.0, 0.0)]);
        assert!(vm.execute_kind(CommandKind::move_node(n("v_mv"), Point::new(100.0, 0.0))));
        assert_eq!(
            vm.dirty().regions(),
            &[
                Rect::new(0.0, 0.0, 50.0, 50.0),
                Rect::new(100.0, 0.0, 150.0, 50.0)
            ]
        );

        let mut r = FrameRecorder::new();
        assert!(vm.render(&mut r));
        assert!(!vm.is_dirty());
        assert!(matches!(r.last_damage(), Some(Damage::Regions(regions)) if regions.len() == 2));
    }

    #[test]
    fn selection_is_ordered_unique_and_notifies() {
        let mut vm = view(&[("v_s1", 0.0, 0.0), ("v_s2", 100.0, 0.0)]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        vm.on_selection_change(move |s| sink.borrow_mut().push(s.clone()));

        vm.select([n("v_s2"), n("v_s1"), n("v_s2"), n("v_nope")]);
        assert_eq!(vm.selection(), &[n("v_s2"), n("v_s1")]);
        vm.toggle_selection(n("v_s2"));
        assert_eq!(vm.selection(), &[n("v_s1")]);
        vm.select([n("v_s1")]);

        assert_eq!(seen.borrow().len(), 2, "unchanged selection must not notify");
    }

    #[test]
    fn removing_a_selected_node_prunes_selection_and_hover() {
        let mut vm = view(&[("v_rm", 0.0, 0.0)]);
        vm.select([n("v_rm")]);
        vm.set_hover(Some(Hit::Node(n("v_rm"))));
        assert!(vm.delete_selection());
        assert!(vm.selection().is_empty());
        assert_eq!(vm.hover(), None);

        assert!(vm.undo());
        assert!(vm.model().contains_node(n("v_rm")));
    }

    #[test]
    fn drag_preview_commits_one_step_and_cancel_leaves_model() {
        let mut vm = view(&[("v_d1", 0.0, 0.0), ("v_d2", 100.0, 0.0)]);
        vm.begin_drag_preview(&[n("v_d1"), n("v_d2")]);
        vm.update_drag_preview(Vec2::new(10.0, 20.0));
        assert_eq!(vm.node_bounds(n("v_d1")), Some(Rect::new(10.0, 20.0, 60.0, 70.0)));
        assert_eq!(vm.model().node(n("v_d1")).unwrap().position, Point::ZERO);

        vm.cancel_drag_preview();
        assert_eq!(vm.history().len(), 0);
        assert_eq!(vm.node_bounds(n("v_d1")), Some(Rect::new(0.0, 0.0, 50.0, 50.0)));

        vm.begin_drag_preview(&[n("v_d1"), n("v_d2")]);
        vm.update_drag_preview(Vec2::new(10.0, 20.0));
        assert!(vm.commit_drag_preview());
        assert_eq!(vm.history().len(), 1);
        assert_eq!(vm.model().node(n("v_d2")).unwrap().position, Point::new(110.0, 20.0));

        assert!(vm.undo());
        assert_eq!(vm.model().node(n("v_d1")).unwrap().position, Point::ZERO);
        assert_eq!(vm.model().node(n("v_d2")).unwrap().position, Point::new(100.0, 0.0));
    }

    #[test]
    fn frame_draws_edges_before_nodes_with_flags() {
        let mut vm = view(&[("v_f1", 0.0, 0.0), ("v_f2", 200.0, 0.0)]);
        vm.execute_kind(CommandKind::ConnectNodes {
            edge: Edge::new(EdgeId::intern("v_fe"), n("v_f1"), n("v_f2")),
        });
        vm.select([n("v_f2")]);
        vm.set_hover(Some(Hit::Node(n("v_f1"))));
        vm.set_marquee(Some(Rect::new(0.0, 0.0, 5.0, 5.0)));

        let mut r = FrameRecorder::new();
        assert!(vm.render(&mut r));
        let calls = r.calls();
        assert_eq!(calls[0], DrawCall::Clear);
        assert!(matches!(calls[1], DrawCall::Edge { .. }));
        assert!(matches!(
            r.node_call(n("v_f1")),
            Some(DrawCall::Node { hovered: true, selected: false, .. })
        ));
        assert!(matches!(
            r.node_call(n("v_f2")),
            Some(DrawCall::Node { selected: true, .. })
        ));
        assert!(matches!(calls.last(), Some(DrawCall::Marquee(_))));
    }

    #[test]
    fn rejections_and_empty_undo_stay_off_error_listeners() {
        let mut vm = view(&[]);
        let errors = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&errors);
        vm.on_error(move |_| *sink.borrow_mut() += 1);

        // Invalid commands are a quiet `false`, not an error.
        assert!(!vm.execute_kind(CommandKind::remove_node(n("v_missing"))));
        assert_eq!(*errors.borrow(), 0);
        assert!(!vm.undo());
        assert_eq!(*errors.borrow(), 0);
    }
}
