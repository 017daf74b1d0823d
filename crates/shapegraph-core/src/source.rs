//! Pre-parsed page input.
//!
//! A [`Page`] is the shape tree of one diagram page as handed over by the file
//! format layer: nested [`ShapeNode`]s with local geometry, text, and symbol
//! metadata, plus the author-drawn [`Connection`]s between them.
//!
//! [`ShapeHierarchy`] indexes a page for the lookups the pipeline needs:
//! depth-first traversal with accumulated transforms, parents, ancestors, and
//! descendants.

use std::collections::HashMap;

use kurbo::{Affine, BezPath, Point};
use thiserror::Error;

use crate::shape::ShapeId;

/// Shape type tag of aggregate shapes that only hold other shapes.
pub const GROUP_SHAPE_TYPE: &str = "Group";

/// Shape type tag used when none is given.
pub const DEFAULT_SHAPE_TYPE: &str = "Shape";

/// Errors raised while indexing a page hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("shape id {0} appears more than once in the page")]
    DuplicateShape(ShapeId),
}

/// Text attached to a shape, with its center in the shape's local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeText {
    text: String,
    center: Point,
}

impl ShapeText {
    pub fn new(text: impl Into<String>, center: Point) -> Self {
        Self {
            text: text.into(),
            center,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn center(&self) -> Point {
        self.center
    }
}

/// One shape of the page tree.
///
/// Geometry is local: `path` and the `width` x `height` box are expressed in
/// the shape's own coordinates, and `transform` maps them into the parent's
/// coordinates.
#[derive(Debug, Clone)]
pub struct ShapeNode {
    id: ShapeId,
    transform: Affine,
    width: f64,
    height: f64,
    path: Option<BezPath>,
    one_d: bool,
    name: String,
    symbol_name: String,
    shape_type: String,
    text: Option<ShapeText>,
    has_master: bool,
    line_color: Option<String>,
    line_pattern: Option<i32>,
    children: Vec<ShapeNode>,
}

impl ShapeNode {
    /// Creates a 2-D shape with an empty box, no geometry, and no text.
    pub fn new(id: i64) -> Self {
        Self {
            id: ShapeId::new(id),
            transform: Affine::IDENTITY,
            width: 0.0,
            height: 0.0,
            path: None,
            one_d: false,
            name: String::new(),
            symbol_name: String::new(),
            shape_type: DEFAULT_SHAPE_TYPE.to_string(),
            text: None,
            has_master: false,
            line_color: None,
            line_pattern: None,
            children: Vec::new(),
        }
    }

    /// Sets the local-to-parent transform.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Sets the size of the shape's local box.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the drawn geometry of the shape.
    pub fn with_path(mut self, path: BezPath) -> Self {
        self.path = Some(path);
        self
    }

    /// Marks the shape as 1-D (a line or connector).
    pub fn one_dimensional(mut self) -> Self {
        self.one_d = true;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_symbol(mut self, symbol_name: impl Into<String>) -> Self {
        self.symbol_name = symbol_name.into();
        self
    }

    pub fn with_type(mut self, shape_type: impl Into<String>) -> Self {
        self.shape_type = shape_type.into();
        self
    }

    /// Attaches text centered at `center` in local coordinates.
    pub fn with_text(mut self, text: impl Into<String>, center: Point) -> Self {
        self.text = Some(ShapeText::new(text, center));
        self
    }

    /// Marks the shape as instantiated from a master (template).
    pub fn with_master(mut self) -> Self {
        self.has_master = true;
        self
    }

    pub fn with_line_style(mut self, color: Option<String>, pattern: Option<i32>) -> Self {
        self.line_color = color;
        self.line_pattern = pattern;
        self
    }

    pub fn with_child(mut self, child: ShapeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn path(&self) -> Option<&BezPath> {
        self.path.as_ref()
    }

    pub fn is_1d(&self) -> bool {
        self.one_d
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol_name(&self) -> &str {
        &self.symbol_name
    }

    pub fn shape_type(&self) -> &str {
        &self.shape_type
    }

    pub fn text(&self) -> Option<&ShapeText> {
        self.text.as_ref()
    }

    /// Returns the text if it is present and non-empty.
    pub fn non_empty_text(&self) -> Option<&ShapeText> {
        self.text.as_ref().filter(|text| !text.text.is_empty())
    }

    pub fn has_master(&self) -> bool {
        self.has_master
    }

    pub fn line_color(&self) -> Option<&str> {
        self.line_color.as_deref()
    }

    pub fn line_pattern(&self) -> Option<i32> {
        self.line_pattern
    }

    pub fn children(&self) -> &[ShapeNode] {
        &self.children
    }
}

/// Which part of the "from" shape a connection is glued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPart {
    /// The start point of a 1-D shape.
    Begin,
    /// The end point of a 1-D shape.
    End,
    /// Any other part.
    Other,
}

/// An author-drawn connection between two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    from: ShapeId,
    from_part: ConnectionPart,
    to: ShapeId,
}

impl Connection {
    pub fn new(from: i64, from_part: ConnectionPart, to: i64) -> Self {
        Self {
            from: ShapeId::new(from),
            from_part,
            to: ShapeId::new(to),
        }
    }

    pub fn from(&self) -> ShapeId {
        self.from
    }

    pub fn from_part(&self) -> ConnectionPart {
        self.from_part
    }

    pub fn to(&self) -> ShapeId {
        self.to
    }
}

/// A diagram page: top-level shapes and author-drawn connections.
#[derive(Debug, Clone)]
pub struct Page {
    id: i64,
    name: String,
    shapes: Vec<ShapeNode>,
    connections: Vec<Connection>,
}

impl Page {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            shapes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn with_shape(mut self, shape: ShapeNode) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shapes(&self) -> &[ShapeNode] {
        &self.shapes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}

/// A shape reached by the depth-first traversal.
#[derive(Debug, Clone, Copy)]
pub struct VisitedShape<'a> {
    node: &'a ShapeNode,
    parent: Option<ShapeId>,
    transform: Affine,
    depth: usize,
}

impl<'a> VisitedShape<'a> {
    pub fn node(&self) -> &'a ShapeNode {
        self.node
    }

    pub fn parent(&self) -> Option<ShapeId> {
        self.parent
    }

    /// Returns the accumulated local-to-page transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Returns the nesting depth; top-level shapes have depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Lookup structure over the shape tree of a [`Page`].
#[derive(Debug)]
pub struct ShapeHierarchy<'a> {
    visits: Vec<VisitedShape<'a>>,
    positions: HashMap<ShapeId, usize>,
}

impl<'a> ShapeHierarchy<'a> {
    /// Indexes the page's shapes in depth-first order, parents before children.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DuplicateShape`] if two shapes share an id.
    pub fn new(page: &'a Page) -> Result<Self, HierarchyError> {
        let mut hierarchy = Self {
            visits: Vec::new(),
            positions: HashMap::new(),
        };
        for shape in page.shapes() {
            hierarchy.visit(shape, None, Affine::IDENTITY, 0)?;
        }
        Ok(hierarchy)
    }

    fn visit(
        &mut self,
        node: &'a ShapeNode,
        parent: Option<ShapeId>,
        parent_transform: Affine,
        depth: usize,
    ) -> Result<(), HierarchyError> {
        if self.positions.contains_key(&node.id()) {
            return Err(HierarchyError::DuplicateShape(node.id()));
        }

        let transform = parent_transform * node.transform();
        self.positions.insert(node.id(), self.visits.len());
        self.visits.push(VisitedShape {
            node,
            parent,
            transform,
            depth,
        });

        for child in node.children() {
            self.visit(child, Some(node.id()), transform, depth + 1)?;
        }
        Ok(())
    }

    /// Returns every shape in depth-first order.
    pub fn visits(&self) -> &[VisitedShape<'a>] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn get(&self, id: ShapeId) -> Option<&VisitedShape<'a>> {
        self.positions.get(&id).map(|&idx| &self.visits[idx])
    }

    pub fn node(&self, id: ShapeId) -> Option<&'a ShapeNode> {
        self.get(id).map(VisitedShape::node)
    }

    pub fn parent(&self, id: ShapeId) -> Option<ShapeId> {
        self.get(id).and_then(VisitedShape::parent)
    }

    /// Returns the ancestors of a shape, nearest first.
    pub fn ancestors(&self, id: ShapeId) -> impl Iterator<Item = ShapeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Returns the descendants of a shape in depth-first order, excluding the
    /// shape itself.
    pub fn descendants(&self, id: ShapeId) -> Vec<ShapeId> {
        let Some(&start) = self.positions.get(&id) else {
            return Vec::new();
        };
        let depth = self.visits[start].depth;
        // depth-first order keeps a subtree contiguous after its root
        self.visits[start + 1..]
            .iter()
            .take_while(|visit| visit.depth > depth)
            .map(|visit| visit.node.id())
            .collect()
    }
}
