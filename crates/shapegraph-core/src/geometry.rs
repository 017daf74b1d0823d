//! Geometry utilities for shape outlines and connector paths.
//!
//! Paths are [`kurbo::BezPath`] values in page coordinates. Curved segments are
//! flattened into straight segments before any test, so every predicate in this
//! module works on polylines.
//!
//! # Overview
//!
//! - [`path_endpoints`] - Start and end point of a 1-D path
//! - [`flatten_path`] - Polyline approximation of a path
//! - [`find_intersections`] / [`line_intersections`] - Crossing points
//! - [`is_inside_or_on_boundary`] - Point containment with a boundary tolerance
//! - [`path_intersects`] / [`regions_overlap`] - Whether two outlines touch
//! - [`path_distance`] - Shortest distance from a point to a path
//! - [`round_path`] - Coordinate rounding that suppresses transform noise
//! - [`IndexRect`] - Reduced-precision rectangle used as the spatial index key
//!
//! # Containment
//!
//! Containment follows the non-zero winding rule. Open subpaths are treated as
//! implicitly closed when asking whether a point lies inside them, and a point
//! closer than [`BOUNDARY_TOLERANCE`] to any segment counts as on the boundary.

use kurbo::{Affine, BezPath, Line, PathEl, Point, Rect, Shape};
use thiserror::Error;

/// Flattening tolerance used by predicates that do not take one explicitly.
pub const DEFAULT_FLATTEN_TOLERANCE: f64 = 0.01;

/// Distance under which a point counts as lying on a path.
pub const BOUNDARY_TOLERANCE: f64 = 1e-6;

/// Paths are rounded to this many units per page unit.
const ROUNDING_SCALE: f64 = 1e6;

const EPSILON: f64 = 1e-12;

/// Errors raised for malformed path geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("path is empty")]
    EmptyPath,

    #[error("path does not start with a move-to segment")]
    MissingMoveTo,
}

/// A flattened subpath: a run of points joined by straight segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<Point>,
    closed: bool,
}

impl Polyline {
    fn starting_at(point: Point) -> Self {
        Self {
            points: vec![point],
            closed: false,
        }
    }

    /// Returns the vertices of the polyline in path order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns true if the subpath ended with a close-path element.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the straight segments of the polyline.
    ///
    /// Closed polylines include the segment back to their first point.
    pub fn segments(&self) -> Vec<Line> {
        self.collect_segments(self.closed)
    }

    /// Returns the segments of the polyline as a ring, always closing it.
    pub fn ring_segments(&self) -> Vec<Line> {
        self.collect_segments(true)
    }

    fn collect_segments(&self, close: bool) -> Vec<Line> {
        let mut segments: Vec<Line> = self
            .points
            .windows(2)
            .map(|pair| Line::new(pair[0], pair[1]))
            .collect();

        if close && self.points.len() > 2 {
            let first = self.points[0];
            let last = self.points[self.points.len() - 1];
            if first != last {
                segments.push(Line::new(last, first));
            }
        }

        segments
    }
}

/// Flattens a path into polylines, one per subpath.
///
/// # Arguments
///
/// * `path` - The path to flatten
/// * `tolerance` - Maximum distance between a curve and its approximation
pub fn flatten_path(path: &BezPath, tolerance: f64) -> Vec<Polyline> {
    let mut polylines: Vec<Polyline> = Vec::new();

    kurbo::flatten(path.iter(), tolerance, |el| match el {
        PathEl::MoveTo(p) => polylines.push(Polyline::starting_at(p)),
        PathEl::LineTo(p) => match polylines.last_mut() {
            Some(current) => current.points.push(p),
            None => polylines.push(Polyline::starting_at(p)),
        },
        PathEl::ClosePath => {
            if let Some(current) = polylines.last_mut() {
                current.closed = true;
            }
        }
        // flatten only emits move, line, and close elements
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });

    polylines
}

/// Returns the first and the final point of a path.
///
/// The final point is the current point after the last element, so a path that
/// ends with a close-path element ends where its last subpath started.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyPath`] for a path without elements and
/// [`GeometryError::MissingMoveTo`] when the first element is not a move-to.
pub fn path_endpoints(path: &BezPath) -> Result<(Point, Point), GeometryError> {
    let elements = path.elements();
    let start = match elements.first() {
        None => return Err(GeometryError::EmptyPath),
        Some(PathEl::MoveTo(p)) => *p,
        Some(_) => return Err(GeometryError::MissingMoveTo),
    };

    let mut subpath_start = start;
    let mut current = start;
    for el in elements {
        match *el {
            PathEl::MoveTo(p) => {
                subpath_start = p;
                current = p;
            }
            PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => current = p,
            PathEl::ClosePath => current = subpath_start,
        }
    }

    Ok((start, current))
}

/// Applies an affine transform to a copy of the path.
pub fn transform_path(path: &BezPath, transform: Affine) -> BezPath {
    let mut transformed = path.clone();
    transformed.apply_affine(transform);
    transformed
}

/// Rounds every coordinate of the path to a fixed precision.
///
/// Accumulated transforms leave noise in the last bits of coordinates that
/// would otherwise defeat exact endpoint comparisons.
pub fn round_path(path: &BezPath) -> BezPath {
    path.iter()
        .map(|el| match el {
            PathEl::MoveTo(p) => PathEl::MoveTo(round_point(p)),
            PathEl::LineTo(p) => PathEl::LineTo(round_point(p)),
            PathEl::QuadTo(p1, p2) => PathEl::QuadTo(round_point(p1), round_point(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                PathEl::CurveTo(round_point(p1), round_point(p2), round_point(p3))
            }
            PathEl::ClosePath => PathEl::ClosePath,
        })
        .collect()
}

fn round_point(p: Point) -> Point {
    Point::new(
        (p.x * ROUNDING_SCALE).round() / ROUNDING_SCALE,
        (p.y * ROUNDING_SCALE).round() / ROUNDING_SCALE,
    )
}

/// Builds the closed outline of a rectangle, clockwise from its minimum corner.
pub fn rect_path(rect: Rect) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((rect.x0, rect.y0));
    path.line_to((rect.x1, rect.y0));
    path.line_to((rect.x1, rect.y1));
    path.line_to((rect.x0, rect.y1));
    path.close_path();
    path
}

/// Returns the precise bounding rectangle of a path.
pub fn path_bounds(path: &BezPath) -> Rect {
    path.bounding_box()
}

/// Computes the crossing point of two straight segments.
///
/// Collinear overlapping segments report the overlapping point closest to the
/// start of `a`. Returns `None` when the segments do not meet.
pub fn segment_intersection(a: Line, b: Line) -> Option<Point> {
    let r = a.p1 - a.p0;
    let s = b.p1 - b.p0;
    let qp = b.p0 - a.p0;
    let denom = r.cross(s);

    if denom.abs() <= EPSILON {
        if qp.cross(r).abs() > EPSILON {
            return None;
        }

        let rr = r.dot(r);
        if rr <= EPSILON {
            // `a` is a single point
            return (segment_distance(b, a.p0) <= BOUNDARY_TOLERANCE).then_some(a.p0);
        }

        let t0 = qp.dot(r) / rr;
        let t1 = t0 + s.dot(r) / rr;
        let (lo, hi) = (t0.min(t1), t0.max(t1));
        if hi < 0.0 || lo > 1.0 {
            return None;
        }
        return Some(a.p0 + r * lo.max(0.0));
    }

    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    let slack = 1e-9;
    if (-slack..=1.0 + slack).contains(&t) && (-slack..=1.0 + slack).contains(&u) {
        Some(a.p0 + r * t.clamp(0.0, 1.0))
    } else {
        None
    }
}

/// Finds the points where a straight segment crosses the outline of a path.
///
/// Closed subpaths contribute their closing segment. Points are reported in
/// the path's segment order without duplicates.
pub fn line_intersections(path: &BezPath, line: Line, tolerance: f64) -> Vec<Point> {
    let mut points = Vec::new();
    for polyline in flatten_path(path, tolerance) {
        for segment in polyline.segments() {
            if let Some(p) = segment_intersection(segment, line) {
                push_unique(&mut points, p);
            }
        }
    }
    points
}

/// Finds the points where two paths cross.
///
/// Points are reported in the order of `a`'s segments without duplicates.
pub fn find_intersections(a: &BezPath, b: &BezPath, tolerance: f64) -> Vec<Point> {
    let b_segments: Vec<Line> = flatten_path(b, tolerance)
        .iter()
        .flat_map(Polyline::segments)
        .collect();

    let mut points = Vec::new();
    for polyline in flatten_path(a, tolerance) {
        for segment in polyline.segments() {
            for other in &b_segments {
                if let Some(p) = segment_intersection(segment, *other) {
                    push_unique(&mut points, p);
                }
            }
        }
    }
    points
}

fn push_unique(points: &mut Vec<Point>, point: Point) {
    if !points
        .iter()
        .any(|existing| existing.distance(point) <= BOUNDARY_TOLERANCE)
    {
        points.push(point);
    }
}

/// Returns true if the point lies inside the region or on its outline.
pub fn is_inside_or_on_boundary(region: &BezPath, point: Point) -> bool {
    let polylines = flatten_path(region, DEFAULT_FLATTEN_TOLERANCE);
    winding_number(&polylines, point) != 0
        || polylines_distance(&polylines, point) <= BOUNDARY_TOLERANCE
}

/// Returns true if a path touches a region.
///
/// The path touches the region when one of its segments meets the region's
/// outline or one of its vertices lies inside the region.
pub fn path_intersects(path: &BezPath, region: &BezPath) -> bool {
    let region_polylines = flatten_path(region, DEFAULT_FLATTEN_TOLERANCE);
    let region_segments: Vec<Line> = region_polylines
        .iter()
        .flat_map(Polyline::ring_segments)
        .collect();

    let path_polylines = flatten_path(path, DEFAULT_FLATTEN_TOLERANCE);

    let crosses = path_polylines
        .iter()
        .flat_map(Polyline::segments)
        .any(|segment| {
            region_segments
                .iter()
                .any(|edge| segment_intersection(segment, *edge).is_some())
        });

    crosses
        || path_polylines
            .iter()
            .flat_map(|polyline| polyline.points().iter().copied())
            .any(|p| winding_number(&region_polylines, p) != 0)
}

/// Returns true if two regions overlap, either by crossing outlines or by one
/// holding a vertex of the other.
pub fn regions_overlap(a: &BezPath, b: &BezPath) -> bool {
    path_intersects(a, b) || path_intersects(b, a)
}

/// Returns the shortest distance from a point to any segment of a path.
///
/// An empty path is infinitely far away.
pub fn path_distance(path: &BezPath, point: Point) -> f64 {
    polylines_distance(&flatten_path(path, DEFAULT_FLATTEN_TOLERANCE), point)
}

/// Returns true if the point falls within `slack` of the rectangle on each axis.
pub fn rect_contains_with_slack(rect: Rect, point: Point, slack: f64) -> bool {
    point.x + slack > rect.x0
        && point.x - slack < rect.x1
        && point.y + slack > rect.y0
        && point.y - slack < rect.y1
}

fn polylines_distance(polylines: &[Polyline], point: Point) -> f64 {
    polylines
        .iter()
        .map(|polyline| match polyline.points() {
            [] => f64::INFINITY,
            [single] => single.distance(point),
            _ => polyline
                .segments()
                .into_iter()
                .map(|segment| segment_distance(segment, point))
                .fold(f64::INFINITY, f64::min),
        })
        .fold(f64::INFINITY, f64::min)
}

fn segment_distance(segment: Line, point: Point) -> f64 {
    let d = segment.p1 - segment.p0;
    let len_sq = d.dot(d);
    if len_sq <= EPSILON {
        return segment.p0.distance(point);
    }
    let t = ((point - segment.p0).dot(d) / len_sq).clamp(0.0, 1.0);
    (segment.p0 + d * t).distance(point)
}

/// Non-zero winding number of the point against implicitly closed polylines.
fn winding_number(polylines: &[Polyline], point: Point) -> i32 {
    let mut winding = 0;
    for polyline in polylines {
        if polyline.points().len() < 3 {
            continue;
        }
        for edge in polyline.ring_segments() {
            let (a, b) = (edge.p0, edge.p1);
            let side = (b - a).cross(point - a);
            if a.y <= point.y {
                if b.y > point.y && side > 0.0 {
                    winding += 1;
                }
            } else if b.y <= point.y && side < 0.0 {
                winding -= 1;
            }
        }
    }
    winding
}

/// Reduced-precision axis-aligned rectangle used as the spatial index key.
///
/// Exact geometric tests always use the precise `f64` bounds; this rectangle is
/// only for index lookups and the approximate enclosure comparisons built on
/// its area.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndexRect {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl IndexRect {
    /// Creates a rectangle from two corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Narrows precise bounds to index precision.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
    }

    pub fn min_x(self) -> f32 {
        self.min_x
    }

    pub fn min_y(self) -> f32 {
        self.min_y
    }

    pub fn max_x(self) -> f32 {
        self.max_x
    }

    pub fn max_y(self) -> f32 {
        self.max_y
    }

    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn area(self) -> f32 {
        self.width() * self.height()
    }

    /// Returns the center as `(x, y)`.
    pub fn center(self) -> (f32, f32) {
        (
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    /// Returns true if the rectangles overlap or touch.
    pub fn intersects(self, other: Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Area shared by both rectangles, zero when they are disjoint.
    pub fn intersection_area(self, other: Self) -> f32 {
        if !self.intersects(other) {
            return 0.0;
        }
        let width = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let height = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        width * height
    }

    /// Euclidean gap between the rectangles, zero when they touch.
    pub fn distance(self, other: Self) -> f32 {
        let dx = (other.min_x - self.max_x).max(self.min_x - other.max_x).max(0.0);
        let dy = (other.min_y - self.max_y).max(self.min_y - other.max_y).max(0.0);
        dx.hypot(dy)
    }

    /// Grows the rectangle by `amount` on every side.
    pub fn inflate(self, amount: f32) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn polyline(points: &[(f64, f64)]) -> BezPath {
        let mut path = BezPath::new();
        for (i, &p) in points.iter().enumerate() {
            if i == 0 {
                path.move_to(p);
            } else {
                path.line_to(p);
            }
        }
        path
    }

    #[test]
    fn test_path_endpoints() {
        let path = polyline(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]);
        let (start, end) = path_endpoints(&path).unwrap();
        assert_eq!(start, Point::new(0.0, 0.0));
        assert_eq!(end, Point::new(5.0, 5.0));
    }

    #[test]
    fn test_path_endpoints_closed_path_ends_at_start() {
        let path = rect_path(Rect::new(1.0, 2.0, 3.0, 4.0));
        let (start, end) = path_endpoints(&path).unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn test_path_endpoints_rejects_malformed_paths() {
        assert_eq!(
            path_endpoints(&BezPath::new()),
            Err(GeometryError::EmptyPath)
        );

        let path = BezPath::from_vec(vec![PathEl::LineTo(Point::new(1.0, 1.0))]);
        assert_eq!(path_endpoints(&path), Err(GeometryError::MissingMoveTo));
    }

    #[test]
    fn test_segment_intersection_crossing() {
        let a = Line::new((0.0, 0.0), (10.0, 0.0));
        let b = Line::new((5.0, -5.0), (5.0, 5.0));
        let p = segment_intersection(a, b).unwrap();
        assert_approx_eq!(f64, p.x, 5.0);
        assert_approx_eq!(f64, p.y, 0.0);
    }

    #[test]
    fn test_segment_intersection_disjoint_and_parallel() {
        let a = Line::new((0.0, 0.0), (10.0, 0.0));
        assert!(segment_intersection(a, Line::new((11.0, -1.0), (11.0, 1.0))).is_none());
        assert!(segment_intersection(a, Line::new((0.0, 1.0), (10.0, 1.0))).is_none());
    }

    #[test]
    fn test_segment_intersection_collinear_overlap() {
        let a = Line::new((0.0, 0.0), (10.0, 0.0));
        let b = Line::new((4.0, 0.0), (20.0, 0.0));
        assert_eq!(segment_intersection(a, b), Some(Point::new(4.0, 0.0)));
    }

    #[test]
    fn test_line_intersections_with_box() {
        let boundary = rect_path(Rect::new(4.0, -1.0, 6.0, 1.0));
        let line = Line::new((0.0, 0.0), (10.0, 0.0));
        let points = line_intersections(&boundary, line, DEFAULT_FLATTEN_TOLERANCE);
        assert_eq!(points.len(), 2);
        assert!(points.contains(&Point::new(4.0, 0.0)));
        assert!(points.contains(&Point::new(6.0, 0.0)));
    }

    #[test]
    fn test_find_intersections_of_crossing_lines() {
        let a = polyline(&[(-10.0, 5.0), (6.0, 5.0)]);
        let b = polyline(&[(5.0, -10.0), (5.0, 6.0)]);
        let points = find_intersections(&a, &b, DEFAULT_FLATTEN_TOLERANCE);
        assert_eq!(points, vec![Point::new(5.0, 5.0)]);
    }

    #[test]
    fn test_find_intersections_reports_shared_vertex_once() {
        let a = polyline(&[(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)]);
        let b = polyline(&[(5.0, 0.0), (5.0, 10.0)]);
        let points = find_intersections(&a, &b, DEFAULT_FLATTEN_TOLERANCE);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_is_inside_or_on_boundary() {
        let boundary = rect_path(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(is_inside_or_on_boundary(&boundary, Point::new(5.0, 5.0)));
        assert!(is_inside_or_on_boundary(&boundary, Point::new(0.0, 5.0)));
        assert!(is_inside_or_on_boundary(&boundary, Point::new(10.0, 10.0)));
        assert!(!is_inside_or_on_boundary(&boundary, Point::new(10.5, 5.0)));
    }

    #[test]
    fn test_point_on_open_line() {
        let line = polyline(&[(0.0, 0.0), (10.0, 0.0)]);
        assert!(is_inside_or_on_boundary(&line, Point::new(3.0, 0.0)));
        assert!(!is_inside_or_on_boundary(&line, Point::new(3.0, 0.5)));
    }

    #[test]
    fn test_path_intersects_region() {
        let region = rect_path(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(path_intersects(&polyline(&[(-5.0, 5.0), (5.0, 5.0)]), &region));
        // fully inside
        assert!(path_intersects(&polyline(&[(2.0, 2.0), (3.0, 3.0)]), &region));
        assert!(!path_intersects(&polyline(&[(11.0, 0.0), (11.0, 10.0)]), &region));
    }

    #[test]
    fn test_regions_overlap() {
        let a = rect_path(Rect::new(0.0, 0.0, 10.0, 10.0));
        let inner = rect_path(Rect::new(2.0, 2.0, 4.0, 4.0));
        let beside = rect_path(Rect::new(8.0, 2.0, 14.0, 4.0));
        let apart = rect_path(Rect::new(20.0, 20.0, 24.0, 24.0));
        assert!(regions_overlap(&a, &inner));
        assert!(regions_overlap(&inner, &a));
        assert!(regions_overlap(&a, &beside));
        assert!(!regions_overlap(&a, &apart));
    }

    #[test]
    fn test_path_distance() {
        let path = polyline(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_approx_eq!(f64, path_distance(&path, Point::new(5.0, 3.0)), 3.0);
        assert_approx_eq!(f64, path_distance(&path, Point::new(13.0, 4.0)), 5.0);
        assert_eq!(path_distance(&BezPath::new(), Point::ZERO), f64::INFINITY);
    }

    #[test]
    fn test_round_path_removes_noise() {
        let path = polyline(&[(0.1 + 0.2, 1.0 - 1e-12)]);
        let rounded = round_path(&path);
        assert_eq!(rounded.elements()[0], PathEl::MoveTo(Point::new(0.3, 1.0)));
    }

    #[test]
    fn test_transform_path() {
        let path = polyline(&[(0.0, 0.0), (1.0, 0.0)]);
        let moved = transform_path(&path, Affine::translate((2.0, 3.0)));
        let (start, end) = path_endpoints(&moved).unwrap();
        assert_eq!(start, Point::new(2.0, 3.0));
        assert_eq!(end, Point::new(3.0, 3.0));
    }

    #[test]
    fn test_rect_contains_with_slack() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect_contains_with_slack(rect, Point::new(10.0, 5.0), 1e-5));
        assert!(!rect_contains_with_slack(rect, Point::new(10.1, 5.0), 1e-5));
    }

    #[test]
    fn test_index_rect_measures() {
        let a = IndexRect::new(0.0, 0.0, 10.0, 5.0);
        let b = IndexRect::new(8.0, 1.0, 20.0, 3.0);
        assert_approx_eq!(f32, a.area(), 50.0);
        assert_approx_eq!(f32, a.intersection_area(b), 4.0);
        assert_approx_eq!(f32, a.distance(b), 0.0);
        assert_eq!(a.center(), (5.0, 2.5));

        let far = IndexRect::new(13.0, 9.0, 14.0, 10.0);
        assert_approx_eq!(f32, a.distance(far), 5.0);
        assert_approx_eq!(f32, a.intersection_area(far), 0.0);
    }

    #[test]
    fn test_index_rect_normalizes_corners() {
        let rect = IndexRect::new(10.0, 5.0, 0.0, 0.0);
        assert_eq!(rect, IndexRect::new(0.0, 0.0, 10.0, 5.0));
        assert_eq!(
            IndexRect::from_rect(Rect::new(0.0, 0.0, 2.0, 2.0)).inflate(1.0),
            IndexRect::new(-1.0, -1.0, 3.0, 3.0)
        );
    }
}
