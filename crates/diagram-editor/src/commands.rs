//! Reversible graph mutations.
//!
//! Every change to the model goes through a `Command`. A command carries an
//! immutable `CommandKind` payload plus the undo data it captured when it
//! last ran, so `execute` → `undo` → `execute` always round-trips.
//!
//! Consecutive moves of the same node collapse through [`Command::try_merge`],
//! which the history calls; commands never merge themselves.

use crate::editor::EditorError;
use diagram_core::{DiagramModel, DiagramNode, Edge, EdgeId, ModelError, NodeId, Point, Size};
use serde::Deserialize;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("command has already been executed")]
    AlreadyExecuted,

    #[error("command has not been executed")]
    NotExecuted,

    #[error("{kind} failed: {source}")]
    Execution {
        kind: &'static str,
        source: ModelError,
    },
}

impl CommandError {
    fn model(kind: &'static str) -> impl FnOnce(ModelError) -> Self {
        move |source| Self::Execution { kind, source }
    }
}

// ─── Payloads ────────────────────────────────────────────────────────────

/// What a command does. Immutable once the command is built.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    AddNode {
        node: DiagramNode,
        parent: NodeId,
    },
    /// Removes the node, its subtree and every edge touching any of them.
    RemoveNode { id: NodeId },
    MoveNode { id: NodeId, to: Point },
    ConnectNodes { edge: Edge },
    /// Children run in order and undo as one step.
    Batch {
        label: String,
        commands: Vec<CommandKind>,
    },
}

impl CommandKind {
    /// Add `node` under the root.
    pub fn add_node(node: DiagramNode) -> Self {
        Self::AddNode {
            node,
            parent: NodeId::root(),
        }
    }

    pub fn remove_node(id: NodeId) -> Self {
        Self::RemoveNode { id }
    }

    pub fn move_node(id: NodeId, to: Point) -> Self {
        Self::MoveNode { id, to }
    }

    /// A directed edge with a fresh id.
    pub fn connect(source: NodeId, target: NodeId) -> Self {
        Self::ConnectNodes {
            edge: Edge::new(EdgeId::generate(), source, target),
        }
    }

    pub fn batch(label: impl Into<String>, commands: Vec<CommandKind>) -> Self {
        Self::Batch {
            label: label.into(),
            commands,
        }
    }

    /// The registry name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::AddNode { .. } => "addNode",
            CommandKind::RemoveNode { .. } => "removeNode",
            CommandKind::MoveNode { .. } => "moveNode",
            CommandKind::ConnectNodes { .. } => "connectNodes",
            CommandKind::Batch { .. } => "batch",
        }
    }

    /// Whether the command can run against `model` right now. Pure.
    pub fn validate(&self, model: &dyn DiagramModel) -> bool {
        match self {
            CommandKind::AddNode { node, parent } => {
                !model.contains_node(node.id) && model.contains_node(*parent)
            }
            CommandKind::RemoveNode { id } => !id.is_root() && model.contains_node(*id),
            CommandKind::MoveNode { id, to } => {
                !id.is_root() && model.node(*id).is_some_and(|n| n.position != *to)
            }
            CommandKind::ConnectNodes { edge } => {
                edge.source != edge.target
                    && model.contains_node(edge.source)
                    && model.contains_node(edge.target)
                    && model.edge(edge.id).is_none()
                    && model.find_edge(edge.source, edge.target).is_none()
                    // An undirected link already covers either direction.
                    && !(!edge.directed && model.find_edge(edge.target, edge.source).is_some())
            }
            // Children are checked against the current model, so a batch
            // cannot depend on its own earlier children.
            CommandKind::Batch { commands, .. } => {
                !commands.is_empty() && commands.iter().all(|c| c.validate(model))
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            CommandKind::AddNode { node, .. } => format!("Add {}", node.id),
            CommandKind::RemoveNode { id } => format!("Remove {id}"),
            CommandKind::MoveNode { id, .. } => format!("Move {id}"),
            CommandKind::ConnectNodes { edge } => {
                format!("Connect {} → {}", edge.source, edge.target)
            }
            CommandKind::Batch { label, .. } => label.clone(),
        }
    }
}

// ─── Undo data ───────────────────────────────────────────────────────────

/// A removed node with enough context to put it back in its z-slot.
#[derive(Debug, Clone, PartialEq)]
struct NodeSnapshot {
    node: DiagramNode,
    parent: NodeId,
    index: usize,
}

#[derive(Debug, Clone)]
enum UndoData {
    Added {
        id: NodeId,
    },
    Removed {
        /// Pre-order, so parents come back before their children.
        nodes: SmallVec<[NodeSnapshot; 4]>,
        /// `(draw index, edge)`, ascending.
        edges: Vec<(usize, Edge)>,
    },
    Moved {
        id: NodeId,
        from: Point,
    },
    Connected {
        id: EdgeId,
    },
    Batch(Vec<Command>),
}

// ─── Command ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    timestamp: Instant,
    undo: Option<UndoData>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self::at(kind, Instant::now())
    }

    /// A command stamped with an explicit creation time.
    pub fn at(kind: CommandKind, timestamp: Instant) -> Self {
        Self {
            kind,
            timestamp,
            undo: None,
        }
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn is_executed(&self) -> bool {
        self.undo.is_some()
    }

    pub fn validate(&self, model: &dyn DiagramModel) -> bool {
        self.kind.validate(model)
    }

    pub fn description(&self) -> String {
        self.kind.description()
    }

    pub fn execute(&mut self, model: &mut dyn DiagramModel) -> Result<(), CommandError> {
        if self.is_executed() {
            return Err(CommandError::AlreadyExecuted);
        }
        let name = self.kind.name();
        let undo = match &self.kind {
            CommandKind::AddNode { node, parent } => {
                model
                    .insert_node(node.clone(), *parent, None)
                    .map_err(CommandError::model(name))?;
                UndoData::Added { id: node.id }
            }
            CommandKind::RemoveNode { id } => {
                remove_subtree(model, *id).map_err(CommandError::model(name))?
            }
            CommandKind::MoveNode { id, to } => {
                let from = model.move_node(*id, *to).map_err(CommandError::model(name))?;
                UndoData::Moved { id: *id, from }
            }
            CommandKind::ConnectNodes { edge } => {
                model
                    .insert_edge(edge.clone(), None)
                    .map_err(CommandError::model(name))?;
                UndoData::Connected { id: edge.id }
            }
            CommandKind::Batch { commands, .. } => {
                UndoData::Batch(execute_all(commands, self.timestamp, model)?)
            }
        };
        log::trace!("executed {}", self.kind.description());
        self.undo = Some(undo);
        Ok(())
    }

    pub fn undo(&mut self, model: &mut dyn DiagramModel) -> Result<(), CommandError> {
        let undo = self.undo.take().ok_or(CommandError::NotExecuted)?;
        let name = self.kind.name();
        let result = match &undo {
            UndoData::Added { id } => model
                .remove_node(*id)
                .map(drop)
                .map_err(CommandError::model(name)),
            UndoData::Removed { nodes, edges } => {
                restore_subtree(model, nodes, edges).map_err(CommandError::model(name))
            }
            UndoData::Moved { id, from } => model
                .move_node(*id, *from)
                .map(drop)
                .map_err(CommandError::model(name)),
            UndoData::Connected { id } => model
                .remove_edge(*id)
                .map(drop)
                .map_err(CommandError::model(name)),
            UndoData::Batch(_) => Ok(()),
        };

        match (result, undo) {
            (Ok(()), UndoData::Batch(children)) => match undo_all(children, model) {
                Ok(()) => {}
                Err((children, e)) => {
                    self.undo = Some(UndoData::Batch(children));
                    return Err(e);
                }
            },
            (Ok(()), _) => {}
            (Err(e), undo) => {
                // Still applied; keep the data so a retry is possible.
                self.undo = Some(undo);
                return Err(e);
            }
        }
        log::trace!("undid {}", self.kind.description());
        Ok(())
    }

    /// Combine `self` with the command that followed it.
    ///
    /// Only moves of the same node created within `window` of each other
    /// merge. The result moves straight to `next`'s target and carries
    /// `next`'s timestamp, so a steady stream of moves keeps merging.
    pub fn try_merge(&self, next: &Command, window: Duration) -> Option<Command> {
        let (CommandKind::MoveNode { id, .. }, CommandKind::MoveNode { id: next_id, to }) =
            (&self.kind, &next.kind)
        else {
            return None;
        };
        if id != next_id {
            return None;
        }
        if next.timestamp.saturating_duration_since(self.timestamp) > window {
            return None;
        }
        Some(Command::at(CommandKind::move_node(*id, *to), next.timestamp))
    }
}

/// Snapshot the subtree and its edges, then take them out of the model.
fn remove_subtree(model: &mut dyn DiagramModel, id: NodeId) -> Result<UndoData, ModelError> {
    if id.is_root() {
        return Err(ModelError::RootRemoval);
    }
    let mut nodes = SmallVec::new();
    snapshot_subtree(model, id, &mut nodes)?;

    let members: HashSet<NodeId> = nodes.iter().map(|s: &NodeSnapshot| s.node.id).collect();
    let edges: Vec<(usize, Edge)> = model
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| members.contains(&e.source) || members.contains(&e.target))
        .map(|(i, e)| (i, e.clone()))
        .collect();

    // Descending, so earlier indices stay valid.
    for (_, edge) in edges.iter().rev() {
        model.remove_edge(edge.id)?;
    }
    if let Err(e) = model.remove_node(id) {
        for (index, edge) in &edges {
            model.insert_edge(edge.clone(), Some(*index))?;
        }
        return Err(e);
    }
    Ok(UndoData::Removed { nodes, edges })
}

fn snapshot_subtree(
    model: &dyn DiagramModel,
    id: NodeId,
    out: &mut SmallVec<[NodeSnapshot; 4]>,
) -> Result<(), ModelError> {
    let node = model.node(id).ok_or(ModelError::NodeNotFound(id))?;
    let parent = model.parent_of(id).ok_or(ModelError::NodeNotFound(id))?;
    let index = model.child_index(id).ok_or(ModelError::NodeNotFound(id))?;
    out.push(NodeSnapshot {
        node: node.clone(),
        parent,
        index,
    });
    for child in model.children_of(id) {
        snapshot_subtree(model, child, out)?;
    }
    Ok(())
}

fn restore_subtree(
    model: &mut dyn DiagramModel,
    nodes: &[NodeSnapshot],
    edges: &[(usize, Edge)],
) -> Result<(), ModelError> {
    for snap in nodes {
        model.insert_node(snap.node.clone(), snap.parent, Some(snap.index))?;
    }
    for (index, edge) in edges {
        model.insert_edge(edge.clone(), Some(*index))?;
    }
    Ok(())
}

/// Run batch children in order. On failure the ones that ran are undone.
fn execute_all(
    kinds: &[CommandKind],
    timestamp: Instant,
    model: &mut dyn DiagramModel,
) -> Result<Vec<Command>, CommandError> {
    let mut done: Vec<Command> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let mut command = Command::at(kind.clone(), timestamp);
        if let Err(e) = command.execute(model) {
            for mut executed in done.into_iter().rev() {
                if let Err(rollback) = executed.undo(model) {
                    log::warn!("batch rollback of {} failed: {rollback}", executed.description());
                }
            }
            return Err(e);
        }
        done.push(command);
    }
    Ok(done)
}

/// Undo batch children back to front. On failure the ones already undone
/// are re-applied and the children handed back intact.
fn undo_all(
    mut children: Vec<Command>,
    model: &mut dyn DiagramModel,
) -> Result<(), (Vec<Command>, CommandError)> {
    for i in (0..children.len()).rev() {
        if let Err(e) = children[i].undo(model) {
            for child in &mut children[i + 1..] {
                if let Err(reapply) = child.execute(model) {
                    log::warn!("batch re-apply of {} failed: {reapply}", child.description());
                }
            }
            return Err((children, e));
        }
    }
    Ok(())
}

// ─── Registry ────────────────────────────────────────────────────────────

/// Builds a `CommandKind` from a host JSON payload.
pub type CommandFactory = Box<dyn Fn(serde_json::Value) -> Result<CommandKind, serde_json::Error>>;

/// Maps command type names to payload factories.
///
/// Comes preloaded with `addNode`, `removeNode`, `moveNode` and
/// `connectNodes`; hosts may register more.
pub struct CommandRegistry {
    factories: HashMap<String, CommandFactory>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("addNode", |data| {
            let p: AddNodePayload = serde_json::from_value(data)?;
            let id = p.id.unwrap_or_else(NodeId::generate);
            let node = DiagramNode::new(id, p.position)
                .with_label(p.label)
                .with_size(p.size.unwrap_or(diagram_core::DEFAULT_NODE_SIZE));
            Ok(CommandKind::AddNode {
                node,
                parent: p.parent.unwrap_or_else(NodeId::root),
            })
        });
        registry.register("removeNode", |data| {
            let p: NodeRef = serde_json::from_value(data)?;
            Ok(CommandKind::remove_node(p.id))
        });
        registry.register("moveNode", |data| {
            let p: MovePayload = serde_json::from_value(data)?;
            Ok(CommandKind::move_node(p.id, p.to))
        });
        registry.register("connectNodes", |data| {
            let p: ConnectPayload = serde_json::from_value(data)?;
            let mut edge = Edge::new(p.id.unwrap_or_else(EdgeId::generate), p.source, p.target);
            edge.directed = p.directed;
            edge.label = p.label;
            Ok(CommandKind::ConnectNodes { edge })
        });
        registry
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CommandRegistry").field("types", &names).finish()
    }
}

impl CommandRegistry {
    /// A registry with the built-in command types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) the factory for `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(serde_json::Value) -> Result<CommandKind, serde_json::Error> + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str, data: serde_json::Value) -> Result<Command, EditorError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EditorError::UnknownCommandType(name.to_string()))?;
        let kind = factory(data).map_err(|source| EditorError::InvalidPayload {
            command: name.to_string(),
            source,
        })?;
        Ok(Command::new(kind))
    }
}

#[derive(Debug, Deserialize)]
struct AddNodePayload {
    #[serde(default)]
    id: Option<NodeId>,
    #[serde(default)]
    label: String,
    #[serde(default = "origin")]
    position: Point,
    #[serde(default)]
    size: Option<Size>,
    #[serde(default)]
    parent: Option<NodeId>,
}

#[derive(Debug, Deserialize)]
struct NodeRef {
    id: NodeId,
}

#[derive(Debug, Deserialize)]
struct MovePayload {
    id: NodeId,
    to: Point,
}

#[derive(Debug, Deserialize)]
struct ConnectPayload {
    #[serde(default)]
    id: Option<EdgeId>,
    source: NodeId,
    target: NodeId,
    #[serde(default = "default_directed")]
    directed: bool,
    #[serde(default)]
    label: Option<String>,
}

fn default_directed() -> bool {
    true
}

fn origin() -> Point {
    Point::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagram_core::DiagramGraph;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn n(id: &str) -> NodeId {
        NodeId::intern(id)
    }

    fn graph_with(ids: &[(&str, f64, f64)]) -> DiagramGraph {
        let mut g = DiagramGraph::new();
        for (id, x, y) in ids {
            g.add_node(DiagramNode::new(n(id), Point::new(*x, *y)), NodeId::root())
                .unwrap();
        }
        g.drain_changes();
        g
    }

    fn position(g: &DiagramGraph, id: &str) -> Point {
        g.node(n(id)).unwrap().position
    }

    #[test]
    fn add_then_undo() {
        let mut g = DiagramGraph::new();
        let mut cmd = Command::new(CommandKind::add_node(DiagramNode::new(
            n("c_add"),
            Point::new(10.0, 10.0),
        )));
        assert!(cmd.validate(&g));
        cmd.execute(&mut g).unwrap();
        assert!(g.contains_node(n("c_add")));
        assert!(!cmd.validate(&g), "duplicate id must not validate");

        cmd.undo(&mut g).unwrap();
        assert!(!g.contains_node(n("c_add")));
        assert!(!cmd.is_executed());
    }

    #[test]
    fn execute_twice_and_undo_first_are_errors() {
        let mut g = graph_with(&[("c_twice", 0.0, 0.0)]);
        let mut cmd = Command::new(CommandKind::move_node(n("c_twice"), Point::new(1.0, 1.0)));
        assert_eq!(cmd.undo(&mut g), Err(CommandError::NotExecuted));
        cmd.execute(&mut g).unwrap();
        assert_eq!(cmd.execute(&mut g), Err(CommandError::AlreadyExecuted));
    }

    #[test]
    fn move_validation_and_inverse() {
        let mut g = graph_with(&[("c_mv", 10.0, 10.0)]);
        assert!(!CommandKind::move_node(n("c_mv"), Point::new(10.0, 10.0)).validate(&g));
        assert!(!CommandKind::move_node(n("c_ghost"), Point::new(1.0, 1.0)).validate(&g));

        let mut cmd = Command::new(CommandKind::move_node(n("c_mv"), Point::new(50.0, 60.0)));
        cmd.execute(&mut g).unwrap();
        assert_eq!(position(&g, "c_mv"), Point::new(50.0, 60.0));
        cmd.undo(&mut g).unwrap();
        assert_eq!(position(&g, "c_mv"), Point::new(10.0, 10.0));
        cmd.execute(&mut g).unwrap();
        assert_eq!(position(&g, "c_mv"), Point::new(50.0, 60.0));
    }

    #[test]
    fn remove_restores_subtree_edges_and_order() {
        let mut g = graph_with(&[("c_r1", 0.0, 0.0), ("c_r2", 200.0, 0.0), ("c_r3", 400.0, 0.0)]);
        g.add_node(DiagramNode::new(n("c_r2_child"), Point::new(210.0, 10.0)), n("c_r2"))
            .unwrap();
        let e1 = Edge::new(EdgeId::intern("c_e1"), n("c_r1"), n("c_r2"));
        let e2 = Edge::new(EdgeId::intern("c_e2"), n("c_r1"), n("c_r3"));
        let e3 = Edge::new(EdgeId::intern("c_e3"), n("c_r2_child"), n("c_r3"));
        for e in [&e1, &e2, &e3] {
            g.add_edge(e.clone()).unwrap();
        }
        let before_edges = g.edges().to_vec();
        let before_children = g.children_of(NodeId::root());

        let mut cmd = Command::new(CommandKind::remove_node(n("c_r2")));
        cmd.execute(&mut g).unwrap();
        assert!(!g.contains_node(n("c_r2")));
        assert!(!g.contains_node(n("c_r2_child")));
        assert_eq!(g.edges().to_vec(), vec![e2.clone()]);

        cmd.undo(&mut g).unwrap();
        assert_eq!(g.edges().to_vec(), before_edges);
        assert_eq!(g.children_of(NodeId::root()), before_children);
        assert_eq!(g.parent_of(n("c_r2_child")), Some(n("c_r2")));
    }

    #[test]
    fn root_removal_is_invalid() {
        let g = DiagramGraph::new();
        assert!(!CommandKind::remove_node(NodeId::root()).validate(&g));
    }

    #[test]
    fn connect_rejects_self_loops_and_duplicates() {
        let mut g = graph_with(&[("c_a", 0.0, 0.0), ("c_b", 200.0, 0.0)]);
        assert!(!CommandKind::connect(n("c_a"), n("c_a")).validate(&g));
        assert!(!CommandKind::connect(n("c_a"), n("c_missing")).validate(&g));

        let mut first = Command::new(CommandKind::connect(n("c_a"), n("c_b")));
        assert!(first.validate(&g));
        first.execute(&mut g).unwrap();
        assert!(!CommandKind::connect(n("c_a"), n("c_b")).validate(&g));
        // Reverse direction of a directed edge is a different edge.
        assert!(CommandKind::connect(n("c_b"), n("c_a")).validate(&g));

        first.undo(&mut g).unwrap();
        assert!(g.edges().is_empty());
    }

    #[test]
    fn moves_merge_within_window_only() {
        let t0 = Instant::now();
        let a = Command::at(CommandKind::move_node(n("c_m"), Point::new(1.0, 1.0)), t0);
        let b = Command::at(
            CommandKind::move_node(n("c_m"), Point::new(2.0, 2.0)),
            t0 + Duration::from_millis(100),
        );
        let late = Command::at(
            CommandKind::move_node(n("c_m"), Point::new(3.0, 3.0)),
            t0 + Duration::from_millis(900),
        );
        let other = Command::at(
            CommandKind::move_node(n("c_other"), Point::new(2.0, 2.0)),
            t0 + Duration::from_millis(100),
        );
        let window = Duration::from_millis(500);

        let merged = a.try_merge(&b, window).unwrap();
        assert_eq!(merged.kind(), &CommandKind::move_node(n("c_m"), Point::new(2.0, 2.0)));
        assert_eq!(merged.timestamp(), b.timestamp());
        assert!(a.try_merge(&late, window).is_none());
        assert!(a.try_merge(&other, window).is_none());
        assert!(
            Command::new(CommandKind::remove_node(n("c_m")))
                .try_merge(&b, window)
                .is_none()
        );
    }

    #[test]
    fn failing_batch_rolls_back() {
        let mut g = graph_with(&[("c_b1", 0.0, 0.0)]);
        let mut cmd = Command::new(CommandKind::batch(
            "Move 2",
            vec![
                CommandKind::move_node(n("c_b1"), Point::new(5.0, 5.0)),
                CommandKind::move_node(n("c_b_missing"), Point::new(5.0, 5.0)),
            ],
        ));
        let err = cmd.execute(&mut g).unwrap_err();
        assert!(matches!(err, CommandError::Execution { kind: "moveNode", .. }));
        assert_eq!(position(&g, "c_b1"), Point::ZERO);
        assert!(!cmd.is_executed());
    }

    #[test]
    fn batch_undo_is_one_step() {
        let mut g = graph_with(&[("c_x", 0.0, 0.0), ("c_y", 0.0, 100.0)]);
        let mut cmd = Command::new(CommandKind::batch(
            "Move 2 nodes",
            vec![
                CommandKind::move_node(n("c_x"), Point::new(10.0, 0.0)),
                CommandKind::move_node(n("c_y"), Point::new(10.0, 100.0)),
            ],
        ));
        assert!(cmd.validate(&g));
        cmd.execute(&mut g).unwrap();
        assert_eq!(position(&g, "c_y"), Point::new(10.0, 100.0));
        cmd.undo(&mut g).unwrap();
        assert_eq!(position(&g, "c_x"), Point::ZERO);
        assert_eq!(position(&g, "c_y"), Point::new(0.0, 100.0));
        assert_eq!(cmd.description(), "Move 2 nodes");
        assert!(!CommandKind::batch("empty", vec![]).validate(&g));
    }

    #[test]
    fn registry_builds_builtin_commands() {
        let registry = CommandRegistry::new();
        let cmd = registry
            .create("moveNode", json!({"id": "c_reg", "to": {"x": 5.0, "y": 6.0}}))
            .unwrap();
        assert_eq!(cmd.kind(), &CommandKind::move_node(n("c_reg"), Point::new(5.0, 6.0)));

        let cmd = registry
            .create("addNode", json!({"id": "c_reg_add", "position": {"x": 1.0, "y": 2.0}}))
            .unwrap();
        let CommandKind::AddNode { node, parent } = cmd.kind() else {
            panic!("expected AddNode");
        };
        assert_eq!(node.id, n("c_reg_add"));
        assert_eq!(node.size, diagram_core::DEFAULT_NODE_SIZE);
        assert!(parent.is_root());

        let cmd = registry
            .create("connectNodes", json!({"source": "a", "target": "b", "directed": false}))
            .unwrap();
        let CommandKind::ConnectNodes { edge } = cmd.kind() else {
            panic!("expected ConnectNodes");
        };
        assert!(!edge.directed);
    }

    #[test]
    fn registry_rejects_unknown_and_malformed() {
        let registry = CommandRegistry::new();
        assert!(matches!(
            registry.create("explode", json!({})),
            Err(EditorError::UnknownCommandType(name)) if name == "explode"
        ));
        assert!(matches!(
            registry.create("moveNode", json!({"id": "x"})),
            Err(EditorError::InvalidPayload { .. })
        ));
    }
}
