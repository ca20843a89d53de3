//! Core diagram data model.
//!
//! The diagram is a containment tree of nodes (parent → child, rooted at the
//! `root` sentinel) plus a flat list of visual edges connecting nodes.
//! Positions are absolute graph coordinates; layout is out of scope, so a
//! node sits exactly where it was placed or dragged.
//!
//! `DiagramModel` is the contract the editor core mutates through.
//! `DiagramGraph` is the reference implementation on top of `petgraph`.

use crate::error::ModelError;
use crate::id::{EdgeId, NodeId};
use kurbo::{Point, Rect, Size};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Size given to nodes created without one.
pub const DEFAULT_NODE_SIZE: Size = Size::new(120.0, 60.0);

fn default_node_size() -> Size {
    DEFAULT_NODE_SIZE
}

fn default_directed() -> bool {
    true
}

// ─── Nodes & Edges ───────────────────────────────────────────────────────

/// A single box on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    /// Top-left corner in graph coordinates.
    pub position: Point,
    #[serde(default = "default_node_size")]
    pub size: Size,
}

impl DiagramNode {
    pub fn new(id: NodeId, position: Point) -> Self {
        Self {
            id,
            label: String::new(),
            position,
            size: DEFAULT_NODE_SIZE,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Axis-aligned bounding box in graph coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Bounding box if the node were placed at `position`.
    pub fn bounds_at(&self, position: Point) -> Rect {
        Rect::from_origin_size(position, self.size)
    }
}

/// A visual connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// Directed edges render an arrow head at `target`.
    #[serde(default = "default_directed")]
    pub directed: bool,
    #[serde(default)]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            directed: true,
            label: None,
        }
    }

    #[must_use]
    pub fn undirected(mut self) -> Self {
        self.directed = false;
        self
    }

    /// Whether this edge touches `node` at either end.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }

    /// Whether this edge already links `source` to `target`.
    /// Undirected edges match in both directions.
    pub fn links(&self, source: NodeId, target: NodeId) -> bool {
        (self.source == source && self.target == target)
            || (!self.directed && self.source == target && self.target == source)
    }
}

/// Strict AABB overlap. Rectangles that merely touch do not intersect.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

// ─── Change notifications ────────────────────────────────────────────────

/// Emitted by the model after every successful mutation.
///
/// Bounds are the last-known graph-space boxes, so a consumer can
/// invalidate exactly what changed without querying the model again.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChange {
    NodeAdded {
        id: NodeId,
        bounds: Rect,
    },
    NodeRemoved {
        id: NodeId,
        bounds: Rect,
    },
    NodeMoved {
        id: NodeId,
        old_bounds: Rect,
        new_bounds: Rect,
    },
    /// Edge bounds are the union of the endpoint node bounds.
    EdgeAdded {
        id: EdgeId,
        bounds: Rect,
    },
    EdgeRemoved {
        id: EdgeId,
        bounds: Rect,
    },
}

impl ModelChange {
    /// Regions of the canvas affected by this change.
    pub fn dirty_rects(&self) -> Vec<Rect> {
        match self {
            ModelChange::NodeMoved {
                old_bounds,
                new_bounds,
                ..
            } => vec![*old_bounds, *new_bounds],
            ModelChange::NodeAdded { bounds, .. }
            | ModelChange::NodeRemoved { bounds, .. }
            | ModelChange::EdgeAdded { bounds, .. }
            | ModelChange::EdgeRemoved { bounds, .. } => vec![*bounds],
        }
    }
}

// ─── Model contract ──────────────────────────────────────────────────────

/// The graph storage the editor core mutates.
///
/// Only commands call the mutating methods; everything else reads.
/// Every successful mutation queues a `ModelChange` that the owner
/// collects with [`DiagramModel::drain_changes`].
pub trait DiagramModel {
    /// Id of the root sentinel.
    fn root(&self) -> NodeId;

    fn node(&self, id: NodeId) -> Option<&DiagramNode>;

    /// All nodes except the root, parents before children.
    fn nodes(&self) -> Vec<&DiagramNode>;

    /// Nodes whose bounds overlap `rect`.
    fn nodes_in_rect(&self, rect: Rect) -> Vec<NodeId>;

    fn parent_of(&self, id: NodeId) -> Option<NodeId>;

    /// Children of `id` in z-order (back to front).
    fn children_of(&self, id: NodeId) -> Vec<NodeId>;

    /// Position of `id` among its siblings.
    fn child_index(&self, id: NodeId) -> Option<usize>;

    /// Insert `node` under `parent`, at `index` among its siblings or last.
    fn insert_node(
        &mut self,
        node: DiagramNode,
        parent: NodeId,
        index: Option<usize>,
    ) -> Result<(), ModelError>;

    /// Remove `id` together with its whole subtree. Edges are left alone.
    fn remove_node(&mut self, id: NodeId) -> Result<DiagramNode, ModelError>;

    /// Reposition a node. Returns the previous position.
    fn move_node(&mut self, id: NodeId, position: Point) -> Result<Point, ModelError>;

    fn edge(&self, id: EdgeId) -> Option<&Edge>;

    fn edges(&self) -> &[Edge];

    fn edge_index(&self, id: EdgeId) -> Option<usize>;

    /// Insert an edge at `index` in draw order, or last.
    fn insert_edge(&mut self, edge: Edge, index: Option<usize>) -> Result<(), ModelError>;

    fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, ModelError>;

    /// Take every change queued since the last call.
    fn drain_changes(&mut self) -> Vec<ModelChange>;

    fn add_node(&mut self, node: DiagramNode, parent: NodeId) -> Result<(), ModelError> {
        self.insert_node(node, parent, None)
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), ModelError> {
        self.insert_edge(edge, None)
    }

    fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Edges with `node` at either end.
    fn connected_edges(&self, node: NodeId) -> Vec<&Edge> {
        self.edges().iter().filter(|e| e.touches(node)).collect()
    }

    /// An existing edge linking `source` to `target`, if any.
    fn find_edge(&self, source: NodeId, target: NodeId) -> Option<&Edge> {
        self.edges().iter().find(|e| e.links(source, target))
    }
}

// ─── Reference implementation ────────────────────────────────────────────

/// Containment tree on a `StableDiGraph` plus a flat edge list.
///
/// Graph edges go from parent → child. Sibling order is kept explicitly in
/// `child_order` so a removed-then-restored node returns to its old z-slot.
#[derive(Debug, Clone)]
pub struct DiagramGraph {
    /// The underlying containment graph.
    pub graph: StableDiGraph<DiagramNode, ()>,

    /// The root node index.
    pub root: NodeIndex,

    /// Index from NodeId → NodeIndex for fast lookup.
    id_index: HashMap<NodeId, NodeIndex>,

    /// Children per parent, back to front.
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,

    /// Visual edges in draw order.
    edges: Vec<Edge>,

    /// Changes not yet drained by the owner.
    changes: Vec<ModelChange>,
}

impl DiagramGraph {
    /// Create an empty diagram holding only the root sentinel.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root_node = DiagramNode::new(NodeId::root(), Point::ZERO).with_size(Size::ZERO);
        let root = graph.add_node(root_node);

        let mut id_index = HashMap::new();
        id_index.insert(NodeId::root(), root);

        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
            edges: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// Get the index for a NodeId.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Get the parent index of a node.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Children of a node, back to front.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.child_order.get(&idx).cloned().unwrap_or_default()
    }

    /// Number of nodes excluding the root.
    pub fn node_count(&self) -> usize {
        self.graph.node_count() - 1
    }

    /// Bounds covering both endpoints of an edge.
    fn edge_bounds(&self, edge: &Edge) -> Rect {
        let source = self.node(edge.source).map(DiagramNode::bounds);
        let target = self.node(edge.target).map(DiagramNode::bounds);
        match (source, target) {
            (Some(s), Some(t)) => s.union(t),
            (Some(b), None) | (None, Some(b)) => b,
            (None, None) => Rect::ZERO,
        }
    }

    fn collect_preorder(&self, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
        out.push(idx);
        for child in self.children(idx) {
            self.collect_preorder(child, out);
        }
    }
}

impl Default for DiagramGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramModel for DiagramGraph {
    fn root(&self) -> NodeId {
        self.graph[self.root].id
    }

    fn node(&self, id: NodeId) -> Option<&DiagramNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    fn nodes(&self) -> Vec<&DiagramNode> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        self.collect_preorder(self.root, &mut order);
        order
            .into_iter()
            .skip(1)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    fn nodes_in_rect(&self, rect: Rect) -> Vec<NodeId> {
        self.nodes()
            .into_iter()
            .filter(|n| rects_intersect(n.bounds(), rect))
            .map(|n| n.id)
            .collect()
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.parent(idx).map(|p| self.graph[p].id)
    }

    fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.index_of(id)
            .map(|idx| {
                self.children(idx)
                    .into_iter()
                    .map(|c| self.graph[c].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn child_index(&self, id: NodeId) -> Option<usize> {
        let idx = self.index_of(id)?;
        let parent = self.parent(idx)?;
        self.child_order.get(&parent)?.iter().position(|&c| c == idx)
    }

    fn insert_node(
        &mut self,
        node: DiagramNode,
        parent: NodeId,
        index: Option<usize>,
    ) -> Result<(), ModelError> {
        if self.id_index.contains_key(&node.id) {
            return Err(ModelError::DuplicateNode(node.id));
        }
        let parent_idx = self
            .index_of(parent)
            .ok_or(ModelError::ParentNotFound(parent))?;

        let id = node.id;
        let bounds = node.bounds();
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent_idx, idx, ());
        self.id_index.insert(id, idx);

        let siblings = self.child_order.entry(parent_idx).or_default();
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, idx);
        log::trace!("graph: insert node {id} under {parent} at {at}");

        self.changes.push(ModelChange::NodeAdded { id, bounds });
        Ok(())
    }

    fn remove_node(&mut self, id: NodeId) -> Result<DiagramNode, ModelError> {
        let idx = self.index_of(id).ok_or(ModelError::NodeNotFound(id))?;
        if idx == self.root {
            return Err(ModelError::RootRemoval);
        }

        if let Some(parent) = self.parent(idx)
            && let Some(siblings) = self.child_order.get_mut(&parent)
        {
            siblings.retain(|&c| c != idx);
        }

        let mut subtree = Vec::new();
        self.collect_preorder(idx, &mut subtree);
        log::trace!("graph: remove node {id} with {} descendants", subtree.len() - 1);

        let mut removed_root = None;
        // Children first so notifications read leaf → root.
        for &node_idx in subtree.iter().rev() {
            self.child_order.remove(&node_idx);
            if let Some(node) = self.graph.remove_node(node_idx) {
                self.id_index.remove(&node.id);
                self.changes.push(ModelChange::NodeRemoved {
                    id: node.id,
                    bounds: node.bounds(),
                });
                if node_idx == idx {
                    removed_root = Some(node);
                }
            }
        }

        removed_root.ok_or(ModelError::NodeNotFound(id))
    }

    fn move_node(&mut self, id: NodeId, position: Point) -> Result<Point, ModelError> {
        let idx = self.index_of(id).ok_or(ModelError::NodeNotFound(id))?;
        let node = &mut self.graph[idx];
        let old_bounds = node.bounds();
        let old = std::mem::replace(&mut node.position, position);
        let new_bounds = node.bounds();
        log::trace!("graph: move node {id} {old:?} -> {position:?}");
        self.changes.push(ModelChange::NodeMoved {
            id,
            old_bounds,
            new_bounds,
        });
        Ok(old)
    }

    fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn edge_index(&self, id: EdgeId) -> Option<usize> {
        self.edges.iter().position(|e| e.id == id)
    }

    fn insert_edge(&mut self, edge: Edge, index: Option<usize>) -> Result<(), ModelError> {
        if self.edge_index(edge.id).is_some() {
            return Err(ModelError::DuplicateEdge(edge.id));
        }
        for end in [edge.source, edge.target] {
            if !self.contains_node(end) {
                return Err(ModelError::NodeNotFound(end));
            }
        }

        let bounds = self.edge_bounds(&edge);
        let id = edge.id;
        let at = index.unwrap_or(self.edges.len()).min(self.edges.len());
        self.edges.insert(at, edge);
        log::trace!("graph: insert edge {id} at {at}");
        self.changes.push(ModelChange::EdgeAdded { id, bounds });
        Ok(())
    }

    fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, ModelError> {
        let pos = self.edge_index(id).ok_or(ModelError::EdgeNotFound(id))?;
        let bounds = self.edge_bounds(&self.edges[pos]);
        let edge = self.edges.remove(pos);
        log::trace!("graph: remove edge {id}");
        self.changes.push(ModelChange::EdgeRemoved { id, bounds });
        Ok(edge)
    }

    fn drain_changes(&mut self) -> Vec<ModelChange> {
        std::mem::take(&mut self.changes)
    }
}
