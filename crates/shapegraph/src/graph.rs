//! Property graph of inferred connectivity.
//!
//! [`PropertyGraph`] stores one [`Vertex`] per live shape and at most one
//! [`Edge`] per unordered pair of shapes. Vertices carry an ordered mapping of
//! string keys to [`Value`]s; edges carry an [`EdgeKind`] naming the rule that
//! produced them and an optional connection point.
//!
//! # Canonical edges
//!
//! An edge is stored from the lower shape id to the higher one. Adding an edge
//! for a pair that is already connected does nothing, whatever the kinds
//! involved, so the first rule to connect two shapes wins. Self-loops are never
//! stored.
//!
//! Built on [`petgraph::stable_graph::StableDiGraph`] so indices of surviving
//! vertices stay valid while shapes are removed.

use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use kurbo::Point;
use log::trace;
use petgraph::{
    Direction,
    stable_graph::{EdgeIndex, NodeIndex, StableDiGraph},
    visit::EdgeRef,
};

use shapegraph_core::shape::ShapeId;

/// A vertex property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<ShapeId> for Value {
    fn from(value: ShapeId) -> Self {
        Self::Int(value.get())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A shape in the graph with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    id: ShapeId,
    properties: IndexMap<String, Value>,
}

impl Vertex {
    fn new(id: ShapeId) -> Self {
        Self {
            id,
            properties: IndexMap::new(),
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Sets a property, keeping the position of an existing key.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    /// Replaces all properties.
    pub fn set_properties(&mut self, properties: IndexMap<String, Value>) {
        self.properties = properties;
    }

    /// Returns the `label` property, or an empty string.
    pub fn label(&self) -> &str {
        self.property("label").and_then(Value::as_str).unwrap_or("")
    }

    /// Returns a string property, or an empty string.
    pub fn str_property(&self, key: &str) -> &str {
        self.property(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Returns a boolean property, treating absent or non-boolean values as false.
    pub fn flag(&self, key: &str) -> bool {
        self.property(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// The rule that produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// An author-drawn connection.
    Real,
    /// An author-drawn connection moved from a child onto a promoted group.
    RealMoved,
    /// A connection moved from a textbox onto the shape it labels.
    Reparent,
    /// Overlapping shapes of the same symbol.
    Linked,
    /// A line endpoint inside a 2-D shape.
    Inferred2d,
    /// First split segment to the shapes at the line's start.
    SplitStart,
    /// Split segment to a crossed shape or to the previous segment.
    SplitMiddle,
    /// Final split segment to the last crossed shape.
    SplitNextEnd,
    /// Final split segment to the shapes at the line's end.
    SplitEnd,
    /// Two crossing lines of the same style.
    Inferred1d,
    /// Child of a mostly disconnected group to the group's connections.
    DisconnectedGroup,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::RealMoved => "real-moved",
            Self::Reparent => "reparent",
            Self::Linked => "linked",
            Self::Inferred2d => "inferred-2d",
            Self::SplitStart => "inferred2d-split-start",
            Self::SplitMiddle => "inferred2d-split-middle",
            Self::SplitNextEnd => "inferred2d-split-next-end",
            Self::SplitEnd => "inferred2d-split-end",
            Self::Inferred1d => "inferred-1d",
            Self::DisconnectedGroup => "inferred-disconnected-group",
        }
    }

    /// Returns true for kinds whose tag starts with `real`.
    pub fn is_real(self) -> bool {
        self.as_str().starts_with("real")
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    kind: EdgeKind,
    point: Option<Point>,
}

impl Edge {
    pub fn new(kind: EdgeKind, point: Option<Point>) -> Self {
        Self { kind, point }
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Returns where the connection occurs, if known.
    pub fn point(&self) -> Option<Point> {
        self.point
    }
}

/// A copy of one stored edge with its endpoints resolved to shape ids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeView {
    source: ShapeId,
    target: ShapeId,
    edge: Edge,
}

impl EdgeView {
    /// Returns the lower id of the pair.
    pub fn source(&self) -> ShapeId {
        self.source
    }

    /// Returns the higher id of the pair.
    pub fn target(&self) -> ShapeId {
        self.target
    }

    pub fn kind(&self) -> EdgeKind {
        self.edge.kind
    }

    pub fn point(&self) -> Option<Point> {
        self.edge.point
    }

    /// Returns the endpoint that is not `id`, or `None` if `id` is not an
    /// endpoint.
    pub fn other(&self, id: ShapeId) -> Option<ShapeId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Directed property graph with canonical, pair-unique edges.
#[derive(Debug, Default)]
pub struct PropertyGraph {
    graph: StableDiGraph<Vertex, Edge>,
    nodes: HashMap<ShapeId, NodeIndex>,
    pairs: HashMap<(ShapeId, ShapeId), EdgeIndex>,
}

fn canonical(a: ShapeId, b: ShapeId) -> (ShapeId, ShapeId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a vertex for the shape and returns it for property setup.
    ///
    /// An existing vertex for the same shape is returned unchanged.
    pub fn add_vertex(&mut self, id: ShapeId) -> &mut Vertex {
        let graph = &mut self.graph;
        let idx = *self
            .nodes
            .entry(id)
            .or_insert_with(|| graph.add_node(Vertex::new(id)));
        &mut self.graph[idx]
    }

    pub fn contains_vertex(&self, id: ShapeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn vertex(&self, id: ShapeId) -> Option<&Vertex> {
        self.nodes.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn vertex_mut(&mut self, id: ShapeId) -> Option<&mut Vertex> {
        self.nodes.get(&id).map(|&idx| &mut self.graph[idx])
    }

    /// Returns every vertex, ordered by shape id.
    pub fn vertices(&self) -> Vec<&Vertex> {
        let mut vertices: Vec<&Vertex> = self.graph.node_weights().collect();
        vertices.sort_by_key(|vertex| vertex.id);
        vertices
    }

    /// Removes a vertex together with all of its edges.
    pub fn remove_vertex(&mut self, id: ShapeId) -> Option<Vertex> {
        for edge in self.edges_of(id) {
            self.pairs.remove(&(edge.source, edge.target));
        }
        let idx = self.nodes.remove(&id)?;
        self.graph.remove_node(idx)
    }

    /// Connects two shapes.
    ///
    /// Returns false without changing anything if the shapes are already
    /// connected, if they are the same shape, or if either has no vertex.
    pub fn add_edge(&mut self, a: ShapeId, b: ShapeId, kind: EdgeKind, point: Option<Point>) -> bool {
        if a == b {
            return false;
        }
        let pair = canonical(a, b);
        if self.pairs.contains_key(&pair) {
            trace!(source:% = pair.0, target:% = pair.1, kind:% = kind; "Edge already present");
            return false;
        }
        let (Some(&from), Some(&to)) = (self.nodes.get(&pair.0), self.nodes.get(&pair.1)) else {
            return false;
        };

        let idx = self.graph.add_edge(from, to, Edge::new(kind, point));
        self.pairs.insert(pair, idx);
        true
    }

    /// Returns the edge between two shapes, if any.
    pub fn edge_between(&self, a: ShapeId, b: ShapeId) -> Option<EdgeView> {
        let pair = canonical(a, b);
        self.pairs.get(&pair).and_then(|&idx| {
            self.graph.edge_weight(idx).map(|edge| EdgeView {
                source: pair.0,
                target: pair.1,
                edge: *edge,
            })
        })
    }

    /// Removes the edge between two shapes and returns its payload.
    pub fn remove_edge(&mut self, a: ShapeId, b: ShapeId) -> Option<Edge> {
        let idx = self.pairs.remove(&canonical(a, b))?;
        self.graph.remove_edge(idx)
    }

    /// Returns the edges incident to a shape, ordered by canonical pair.
    pub fn edges_of(&self, id: ShapeId) -> Vec<EdgeView> {
        let Some(&idx) = self.nodes.get(&id) else {
            return Vec::new();
        };

        let mut edges: Vec<EdgeView> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|edge| EdgeView {
                source: self.graph[edge.source()].id,
                target: self.graph[edge.target()].id,
                edge: *edge.weight(),
            })
            .collect();
        edges.sort_by_key(|edge| (edge.source, edge.target));
        edges
    }

    /// Returns true if the shape has at least one edge.
    pub fn has_edges(&self, id: ShapeId) -> bool {
        self.nodes.get(&id).is_some_and(|&idx| {
            self.graph
                .edges_directed(idx, Direction::Outgoing)
                .chain(self.graph.edges_directed(idx, Direction::Incoming))
                .next()
                .is_some()
        })
    }

    /// Returns the shapes connected to a shape, ordered by id.
    pub fn neighbors(&self, id: ShapeId) -> Vec<ShapeId> {
        let Some(&idx) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<ShapeId> = self
            .graph
            .neighbors_undirected(idx)
            .map(|neighbor| self.graph[neighbor].id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Returns every edge, ordered by canonical pair.
    pub fn edges(&self) -> Vec<EdgeView> {
        let mut edges: Vec<EdgeView> = self
            .graph
            .edge_indices()
            .filter_map(|idx| {
                let (from, to) = self.graph.edge_endpoints(idx)?;
                Some(EdgeView {
                    source: self.graph[from].id,
                    target: self.graph[to].id,
                    edge: *self.graph.edge_weight(idx)?,
                })
            })
            .collect();
        edges.sort_by_key(|edge| (edge.source, edge.target));
        edges
    }
}
