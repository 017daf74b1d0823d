//! Shape records: the pipeline's view of one diagram shape.
//!
//! A [`ShapeRecord`] keeps only the attributes later stages need, so records
//! can be created, split, and discarded independently of the input tree.
//! Geometry is stored in page coordinates.

use std::fmt;

use kurbo::{Affine, BezPath, Point, Rect};

use crate::{
    geometry::{self, GeometryError, IndexRect},
    source::ShapeNode,
};

/// Identifier of a shape record.
///
/// Shapes read from a page keep their non-negative document id. Records
/// synthesized by the pipeline draw negative ids from a [`ShapeIdAllocator`],
/// so the two ranges never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ShapeId(i64);

impl ShapeId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns true for ids handed out by a [`ShapeIdAllocator`].
    pub const fn is_synthetic(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ShapeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Hands out ids for synthesized records, counting down from a negative seed.
#[derive(Debug, Clone)]
pub struct ShapeIdAllocator {
    next: i64,
}

impl ShapeIdAllocator {
    /// The first id handed out.
    pub const FIRST: i64 = -42;

    pub fn new() -> Self {
        Self { next: Self::FIRST }
    }

    /// Returns a fresh synthetic id.
    pub fn allocate(&mut self) -> ShapeId {
        let id = ShapeId(self.next);
        self.next -= 1;
        id
    }
}

impl Default for ShapeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Outline of a shape in page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A line or connector, with its endpoints cached.
    OneD {
        path: BezPath,
        start: Point,
        end: Point,
    },
    /// The transformed bounding box of an area-bearing shape.
    TwoD { boundary: BezPath },
}

impl Geometry {
    fn one_d(path: BezPath) -> Result<Self, GeometryError> {
        let (start, end) = geometry::path_endpoints(&path)?;
        Ok(Self::OneD { path, start, end })
    }

    /// Returns the path of either variant.
    pub fn path(&self) -> &BezPath {
        match self {
            Self::OneD { path, .. } => path,
            Self::TwoD { boundary } => boundary,
        }
    }
}

/// One live (or about to be purged) shape of the page.
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    id: ShapeId,
    geometry: Geometry,
    bounds: Rect,
    key: IndexRect,
    area: f32,
    has_geometry: bool,
    has_text: bool,
    is_textbox: bool,
    has_master: bool,
    is_interesting: bool,
    removed: bool,
    text_center: Option<Point>,
    symbol_name: String,
    shape_type: String,
    line_color: Option<String>,
    line_pattern: Option<i32>,
}

impl ShapeRecord {
    /// Builds a record for an input shape.
    ///
    /// 1-D shapes with a path keep that path; every other shape is represented
    /// by its transformed local box. Coordinates are rounded after
    /// transformation.
    ///
    /// # Arguments
    ///
    /// * `node` - The input shape
    /// * `transform` - Accumulated local-to-page transform of the shape
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if a 1-D path is empty or does not start
    /// with a move-to.
    pub fn from_node(node: &ShapeNode, transform: Affine) -> Result<Self, GeometryError> {
        let (geometry, has_geometry) = match node.path() {
            Some(path) if node.is_1d() => {
                let path = geometry::round_path(&geometry::transform_path(path, transform));
                (Geometry::one_d(path)?, true)
            }
            path => {
                let local = Rect::new(0.0, 0.0, node.width(), node.height());
                let boundary = geometry::round_path(&geometry::transform_path(
                    &geometry::rect_path(local),
                    transform,
                ));
                (Geometry::TwoD { boundary }, path.is_some())
            }
        };

        let bounds = geometry::path_bounds(geometry.path());
        let key = IndexRect::from_rect(bounds);
        let text = node.non_empty_text();
        let has_text = text.is_some();

        Ok(Self {
            id: node.id(),
            geometry,
            bounds,
            key,
            area: key.area(),
            has_geometry,
            has_text,
            is_textbox: has_text && !node.has_master(),
            has_master: node.has_master(),
            is_interesting: !node.symbol_name().is_empty()
                || node.is_1d()
                || node.has_master()
                || node.text().is_some(),
            removed: false,
            text_center: text.map(|text| transform * text.center()),
            symbol_name: node.symbol_name().to_string(),
            shape_type: node.shape_type().to_string(),
            line_color: node.line_color().map(str::to_string),
            line_pattern: node.line_pattern(),
        })
    }

    /// Builds a synthetic 1-D record covering part of `original`'s path.
    ///
    /// Line style, symbol, and interest carry over; text does not.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if `path` is empty or does not start with a
    /// move-to.
    pub fn split_from(
        id: ShapeId,
        original: &ShapeRecord,
        path: BezPath,
    ) -> Result<Self, GeometryError> {
        let geometry = Geometry::one_d(path)?;
        let bounds = geometry::path_bounds(geometry.path());
        let key = IndexRect::from_rect(bounds);

        Ok(Self {
            id,
            geometry,
            bounds,
            key,
            area: key.area(),
            has_geometry: true,
            has_text: false,
            is_textbox: false,
            has_master: original.has_master,
            is_interesting: original.is_interesting,
            removed: false,
            text_center: None,
            symbol_name: original.symbol_name.clone(),
            shape_type: original.shape_type.clone(),
            line_color: original.line_color.clone(),
            line_pattern: original.line_pattern,
        })
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Returns the 1-D path or the 2-D boundary.
    pub fn path(&self) -> &BezPath {
        self.geometry.path()
    }

    pub fn is_1d(&self) -> bool {
        matches!(self.geometry, Geometry::OneD { .. })
    }

    /// Returns the start and end point of a 1-D shape.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        match self.geometry {
            Geometry::OneD { start, end, .. } => Some((start, end)),
            Geometry::TwoD { .. } => None,
        }
    }

    /// Returns the precise bounding rectangle.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Returns the reduced-precision spatial index key.
    pub fn key(&self) -> IndexRect {
        self.key
    }

    /// Returns the area of the index key.
    pub fn area(&self) -> f32 {
        self.area
    }

    /// Returns the center of the index key.
    pub fn center(&self) -> (f32, f32) {
        self.key.center()
    }

    /// Returns true if the input shape carried its own geometry.
    pub fn has_geometry(&self) -> bool {
        self.has_geometry
    }

    pub fn has_text(&self) -> bool {
        self.has_text
    }

    /// Returns true for text that is not part of a master-based shape.
    pub fn is_textbox(&self) -> bool {
        self.is_textbox
    }

    pub fn has_master(&self) -> bool {
        self.has_master
    }

    pub fn is_interesting(&self) -> bool {
        self.is_interesting
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn text_center(&self) -> Option<Point> {
        self.text_center
    }

    pub fn symbol_name(&self) -> &str {
        &self.symbol_name
    }

    pub fn shape_type(&self) -> &str {
        &self.shape_type
    }

    pub fn line_color(&self) -> Option<&str> {
        self.line_color.as_deref()
    }

    pub fn line_pattern(&self) -> Option<i32> {
        self.line_pattern
    }

    /// Flags the record for the next purge.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub fn mark_interesting(&mut self) {
        self.is_interesting = true;
    }

    /// Gives the record a label centered at `center`.
    pub fn assign_text(&mut self, center: Point) {
        self.has_text = true;
        self.is_interesting = true;
        self.text_center = Some(center);
    }

    /// Returns true if this record's key covers all of `other`'s key area.
    pub fn encloses(&self, other: &ShapeRecord) -> bool {
        self.key.intersection_area(other.key) >= other.area
    }

    /// Returns true if either record's key covers the smaller one's area.
    pub fn either_encloses(a: &ShapeRecord, b: &ShapeRecord) -> bool {
        a.key.intersection_area(b.key) >= a.area.min(b.area)
    }
}

impl fmt::Display for ShapeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[shape {}]", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use float_cmp::assert_approx_eq;
    use kurbo::Shape;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
        kurbo::Line::new((x0, y0), (x1, y1)).to_path(0.1)
    }

    fn boxed(id: i64, x: f64, y: f64, w: f64, h: f64) -> ShapeRecord {
        let node = ShapeNode::new(id).with_size(w, h).with_master();
        ShapeRecord::from_node(&node, Affine::translate((x, y))).unwrap()
    }

    #[test]
    fn test_allocator_counts_down() {
        let mut allocator = ShapeIdAllocator::new();
        assert_eq!(allocator.allocate(), ShapeId::new(-42));
        assert_eq!(allocator.allocate(), ShapeId::new(-43));
        assert!(ShapeId::new(-43).is_synthetic());
        assert!(!ShapeId::new(0).is_synthetic());
    }

    #[test]
    fn test_two_d_record_uses_transformed_box() {
        let record = boxed(1, 10.0, 20.0, 100.0, 50.0);
        assert!(!record.is_1d());
        assert!(record.endpoints().is_none());
        assert_eq!(record.bounds(), Rect::new(10.0, 20.0, 110.0, 70.0));
        assert_approx_eq!(f32, record.area(), 5000.0);
        assert_eq!(record.center(), (60.0, 45.0));
        assert!(!record.has_geometry());
    }

    #[test]
    fn test_one_d_record_caches_endpoints() {
        let node = ShapeNode::new(5)
            .one_dimensional()
            .with_path(line(0.0, 0.0, 10.0, 0.0));
        let record = ShapeRecord::from_node(&node, Affine::translate((1.0, 2.0))).unwrap();

        assert!(record.is_1d());
        assert!(record.has_geometry());
        assert!(record.is_interesting());
        assert_eq!(
            record.endpoints(),
            Some((Point::new(1.0, 2.0), Point::new(11.0, 2.0)))
        );
        assert_approx_eq!(f32, record.area(), 0.0);
    }

    #[test]
    fn test_one_d_without_path_becomes_box() {
        let node = ShapeNode::new(5).one_dimensional().with_size(4.0, 2.0);
        let record = ShapeRecord::from_node(&node, Affine::IDENTITY).unwrap();
        assert!(!record.is_1d());
        assert!(record.is_interesting());
    }

    #[test]
    fn test_malformed_one_d_path_is_rejected() {
        let node = ShapeNode::new(5)
            .one_dimensional()
            .with_path(BezPath::new());
        assert_eq!(
            ShapeRecord::from_node(&node, Affine::IDENTITY).unwrap_err(),
            GeometryError::EmptyPath
        );
    }

    #[test]
    fn test_text_flags() {
        let textbox = ShapeNode::new(1)
            .with_size(10.0, 10.0)
            .with_text("note", Point::new(5.0, 5.0));
        let record = ShapeRecord::from_node(&textbox, Affine::translate((100.0, 0.0))).unwrap();
        assert!(record.has_text());
        assert!(record.is_textbox());
        assert!(record.is_interesting());
        assert_eq!(record.text_center(), Some(Point::new(105.0, 5.0)));

        let labelled = textbox.clone().with_master();
        let record = ShapeRecord::from_node(&labelled, Affine::IDENTITY).unwrap();
        assert!(record.has_text());
        assert!(!record.is_textbox());

        let empty = ShapeNode::new(2).with_text("", Point::ZERO);
        let record = ShapeRecord::from_node(&empty, Affine::IDENTITY).unwrap();
        assert!(!record.has_text());
        assert!(record.text_center().is_none());
    }

    #[test]
    fn test_plain_box_is_not_interesting() {
        let node = ShapeNode::new(1).with_size(10.0, 10.0);
        let mut record = ShapeRecord::from_node(&node, Affine::IDENTITY).unwrap();
        assert!(!record.is_interesting());

        record.assign_text(Point::new(1.0, 1.0));
        assert!(record.is_interesting());
        assert!(record.has_text());
    }

    #[test]
    fn test_split_copies_line_style() {
        let node = ShapeNode::new(9)
            .one_dimensional()
            .with_path(line(0.0, 0.0, 10.0, 0.0))
            .with_line_style(Some("#ff0000".to_string()), Some(2))
            .with_text("wire", Point::ZERO);
        let original = ShapeRecord::from_node(&node, Affine::IDENTITY).unwrap();

        let part = ShapeRecord::split_from(
            ShapeId::new(-42),
            &original,
            line(0.0, 0.0, 4.0, 0.0),
        )
        .unwrap();
        assert_eq!(part.id(), ShapeId::new(-42));
        assert_eq!(part.line_color(), Some("#ff0000"));
        assert_eq!(part.line_pattern(), Some(2));
        assert!(!part.has_text());
        assert_eq!(
            part.endpoints(),
            Some((Point::new(0.0, 0.0), Point::new(4.0, 0.0)))
        );
    }

    #[test]
    fn test_enclosure() {
        let outer = boxed(1, 0.0, 0.0, 100.0, 100.0);
        let inner = boxed(2, 10.0, 10.0, 20.0, 20.0);
        let straddling = boxed(3, 90.0, 90.0, 20.0, 20.0);

        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
        assert!(!outer.encloses(&straddling));
        assert!(ShapeRecord::either_encloses(&inner, &outer));
        assert!(!ShapeRecord::either_encloses(&outer, &straddling));
    }

    mod proptest_tests {
        use super::*;

        use proptest::prelude::*;

        fn arb_box() -> impl Strategy<Value = (f64, f64, f64, f64)> {
            (
                -100i32..100,
                -100i32..100,
                1i32..50,
                1i32..50,
            )
                .prop_map(|(x, y, w, h)| (x as f64, y as f64, w as f64, h as f64))
        }

        proptest! {
            #[test]
            fn enclosure_agrees_with_either_encloses(a in arb_box(), b in arb_box()) {
                let a = boxed(1, a.0, a.1, a.2, a.3);
                let b = boxed(2, b.0, b.1, b.2, b.3);
                let (big, small) = if b.area() <= a.area() { (&a, &b) } else { (&b, &a) };

                if big.encloses(small) {
                    prop_assert!(ShapeRecord::either_encloses(big, small));
                    prop_assert!(ShapeRecord::either_encloses(small, big));
                }
                prop_assert_eq!(
                    ShapeRecord::either_encloses(&a, &b),
                    ShapeRecord::either_encloses(&b, &a)
                );
            }

            #[test]
            fn synthetic_ids_never_collide_with_document_ids(
                document in proptest::collection::vec(0i64..1_000_000, 0..20),
                count in 0usize..200,
            ) {
                let mut allocator = ShapeIdAllocator::new();
                for _ in 0..count {
                    let id = allocator.allocate();
                    prop_assert!(id.is_synthetic());
                    prop_assert!(!document.contains(&id.get()));
                }
            }
        }
    }
}
