//! Inference of connections from line geometry.
//!
//! The first pass attaches every line to the 2-D shapes it touches. A line
//! that runs through a shape, rather than ending in it, is split at the
//! crossing points into synthetic segments so each connection has its own
//! edge. The second pass joins crossing lines drawn in the same style.

use kurbo::{BezPath, Point};
use log::debug;

use shapegraph_core::{
    geometry::{self, flatten_path, is_inside_or_on_boundary, line_intersections, path_intersects},
    shape::{ShapeId, ShapeRecord},
};

use super::PageState;
use crate::{PipelineError, graph::EdgeKind};

/// Runs both inference passes.
///
/// # Errors
///
/// Returns [`PipelineError::InconsistentEdge`] if an edge of a line does not
/// touch it, or [`PipelineError::Geometry`] if a split produces an invalid
/// path.
pub(super) fn infer_connections(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let mut split = 0;
    for id in state.live_ids() {
        if state.record(id).is_some_and(ShapeRecord::is_1d) && attach_to_2d(state, id)? {
            split += 1;
        }
    }
    state.clean_shapes();

    let mut joined = 0;
    for id in state.live_ids() {
        if state.record(id).is_some_and(ShapeRecord::is_1d) {
            joined += connect_crossing_lines(state, id);
        }
    }

    debug!(split = split, joined = joined; "Connections inferred");
    Ok(())
}

/// Connects a line to the 2-D shapes it touches, splitting it where it runs
/// through one. Returns true if the line was split.
fn attach_to_2d(state: &mut PageState<'_>, id: ShapeId) -> Result<bool, PipelineError> {
    let Some(line) = state.record(id).cloned() else {
        return Ok(false);
    };
    let Some((start, end)) = line.endpoints() else {
        return Ok(false);
    };

    let attached: Vec<ShapeId> = state
        .graph
        .edges_of(id)
        .iter()
        .filter(|edge| edge.kind() == EdgeKind::Real)
        .filter_map(|edge| edge.other(id))
        .collect();

    let mut direct = Vec::new();
    let mut mid_span = Vec::new();
    for other in state.search(line.key()) {
        if other == id || attached.contains(&other) {
            continue;
        }
        let Some(candidate) = state.record(other) else {
            continue;
        };
        if candidate.is_1d() || candidate.is_textbox() || !path_intersects(line.path(), candidate.path()) {
            continue;
        }

        if is_inside_or_on_boundary(candidate.path(), start) {
            direct.push((other, start));
        } else if is_inside_or_on_boundary(candidate.path(), end) {
            direct.push((other, end));
        } else {
            mid_span.push(other);
        }
    }

    for (other, point) in direct {
        state.create_edge(id, other, EdgeKind::Inferred2d, Some(point));
    }
    if mid_span.is_empty() {
        return Ok(false);
    }

    // every existing connection is redistributed onto the segments
    let mut to_start = Vec::new();
    let mut to_end = Vec::new();
    for edge in state.graph.edges_of(id) {
        let other = edge
            .other(id)
            .ok_or(PipelineError::InconsistentEdge { shape: id })?;
        if other == id {
            return Err(PipelineError::InconsistentEdge { shape: id });
        }
        if let Some(partner) = state.record(other) {
            if is_inside_or_on_boundary(partner.path(), start) {
                to_start.push(other);
            } else if is_inside_or_on_boundary(partner.path(), end) {
                to_end.push(other);
            } else if !mid_span.contains(&other) {
                mid_span.push(other);
            }
        }
        state.graph.remove_edge(id, other);
    }

    let targets: Vec<(ShapeId, BezPath)> = mid_span
        .iter()
        .filter_map(|&other| state.record(other).map(|record| (other, record.path().clone())))
        .collect();

    let mut splitter = Splitter::new(line, to_start);
    let tolerance = state.config.tolerances().flatten();
    for polyline in flatten_path(splitter.line.path(), tolerance) {
        let Some(&first) = polyline.points().first() else {
            continue;
        };
        splitter.move_to(first);

        for segment in polyline.segments() {
            let mut crossings: Vec<(ShapeId, Point)> = targets
                .iter()
                .flat_map(|(other, path)| {
                    line_intersections(path, segment, tolerance)
                        .into_iter()
                        .map(move |point| (*other, point))
                })
                .collect();
            crossings.sort_by(|a, b| start.distance(a.1).total_cmp(&start.distance(b.1)));

            for (other, point) in crossings {
                splitter.cross(state, other, point)?;
            }
            splitter.line_to(segment.p1);
        }
    }
    splitter.finish(state, &to_end)?;

    state.remove_shape(id);
    Ok(true)
}

/// Walks a line, cutting a synthetic segment at every crossing.
struct Splitter {
    line: ShapeRecord,
    to_start: Vec<ShapeId>,
    current: BezPath,
    started: bool,
    /// Where the current segment begins.
    segment_start: Option<Point>,
    last_point: Option<Point>,
    crossed: Option<ShapeId>,
    previous: Option<ShapeId>,
    closest_to_text: Option<(ShapeId, f64)>,
}

impl Splitter {
    fn new(line: ShapeRecord, to_start: Vec<ShapeId>) -> Self {
        Self {
            line,
            to_start,
            current: BezPath::new(),
            started: false,
            segment_start: None,
            last_point: None,
            crossed: None,
            previous: None,
            closest_to_text: None,
        }
    }

    fn move_to(&mut self, point: Point) {
        if !self.started {
            self.started = true;
            self.segment_start = Some(point);
        }
        self.current.move_to(point);
        self.last_point = Some(point);
    }

    fn line_to(&mut self, point: Point) {
        self.current.line_to(point);
        self.last_point = Some(point);
    }

    /// Ends the current segment where the line crosses into or out of `other`.
    ///
    /// Consecutive crossings of the same shape do not cut again.
    fn cross(&mut self, state: &mut PageState<'_>, other: ShapeId, point: Point) -> Result<(), PipelineError> {
        if self.crossed == Some(other) {
            return Ok(());
        }

        self.current.line_to(point);
        let piece = self.emit(state)?;
        self.link_to_previous(state, piece);
        state.create_edge(piece, other, EdgeKind::SplitMiddle, Some(point));

        self.crossed = Some(other);
        self.previous = Some(piece);
        self.current.move_to(point);
        self.segment_start = Some(point);
        Ok(())
    }

    /// Emits the final segment and links it to the shapes at the line's end.
    fn finish(mut self, state: &mut PageState<'_>, to_end: &[ShapeId]) -> Result<(), PipelineError> {
        let piece = self.emit(state)?;
        self.link_to_previous(state, piece);
        if let Some(crossed) = self.crossed {
            state.create_edge(piece, crossed, EdgeKind::SplitNextEnd, self.segment_start);
        }
        for &shape in to_end {
            state.create_edge(piece, shape, EdgeKind::SplitEnd, self.last_point);
        }

        if let (Some((target, _)), Some(center)) = (self.closest_to_text, self.line.text_center()) {
            let label = state
                .graph
                .vertex(self.line.id())
                .map(|vertex| vertex.label().to_string())
                .unwrap_or_default();
            if let Some(vertex) = state.graph.vertex_mut(target) {
                vertex.set_property("label", label);
                vertex.set_property("textRef", self.line.id());
                vertex.set_property("textRefWhy", "reassign2dClosest");
            }
            if let Some(record) = state.shapes.get_mut(&target) {
                record.assign_text(center);
                state.policy.on_assign_text(&self.line, record);
            }
        }
        Ok(())
    }

    fn link_to_previous(&self, state: &mut PageState<'_>, piece: ShapeId) {
        match self.previous {
            Some(previous) => {
                state.create_edge(previous, piece, EdgeKind::SplitMiddle, self.segment_start);
            }
            None => {
                for &shape in &self.to_start {
                    state.create_edge(piece, shape, EdgeKind::SplitStart, self.segment_start);
                }
            }
        }
    }

    /// Turns the current path into a new indexed segment record.
    fn emit(&mut self, state: &mut PageState<'_>) -> Result<ShapeId, PipelineError> {
        let path = std::mem::take(&mut self.current);
        let id = state.ids.allocate();
        let record = ShapeRecord::split_from(id, &self.line, path)
            .map_err(|source| PipelineError::geometry(self.line.id(), source))?;

        if let Some(center) = self.line.text_center() {
            let distance = geometry::path_distance(record.path(), center);
            if self.closest_to_text.is_none_or(|(_, best)| distance < best) {
                self.closest_to_text = Some((id, distance));
            }
        }

        let properties = state
            .graph
            .vertex(self.line.id())
            .map(|vertex| vertex.properties().clone())
            .unwrap_or_default();
        let (x, y) = record.center();
        let vertex = state.graph.add_vertex(id);
        vertex.set_properties(properties);
        vertex.set_property("label", "");
        vertex.set_property("shapeId", id);
        vertex.set_property("shapeRef", self.line.id());
        vertex.set_property("x", x);
        vertex.set_property("y", y);

        state.policy.on_clone_1d(&self.line, &record);
        state.insert_record(record);
        state.index_shape(id);
        debug!(line:% = self.line.id(), segment:% = id; "Line segment created");
        Ok(id)
    }
}

/// Joins a line to the crossing lines of the same style it is not yet
/// connected to. Only the first crossing point is recorded. Returns the number
/// of edges created.
fn connect_crossing_lines(state: &mut PageState<'_>, id: ShapeId) -> usize {
    let Some(line) = state.record(id) else {
        return 0;
    };
    let tolerance = state.config.tolerances().flatten();
    let attached = state.graph.neighbors(id);

    let crossings: Vec<(ShapeId, Point)> = state
        .search(line.key())
        .into_iter()
        .filter(|&other| other != id && !attached.contains(&other))
        .filter_map(|other| {
            let candidate = state.record(other)?;
            if !candidate.is_1d()
                || candidate.line_color() != line.line_color()
                || candidate.line_pattern() != line.line_pattern()
            {
                return None;
            }
            geometry::find_intersections(line.path(), candidate.path(), tolerance)
                .first()
                .map(|&point| (other, point))
        })
        .collect();

    crossings
        .into_iter()
        .filter(|&(other, point)| state.create_edge(id, other, EdgeKind::Inferred1d, Some(point)))
        .count()
}
