//! The page pipeline.
//!
//! [`PageState`] owns everything that changes while a page is processed: the
//! shape table, the spatial index, the property graph, and the detected
//! groups. Each stage is a function over the state and runs exactly once, in
//! the order listed in [`run`].
//!
//! # Removal
//!
//! Removing a shape is two-phase. [`PageState::remove_shape`] flags the record
//! and drops its vertex; the record stays in the table and the spatial index
//! until the next [`PageState::clean_shapes`]. Every lookup and query on the
//! state skips flagged records, so stages never observe a removed shape.

mod collect;
mod dedupe;
mod disconnected;
mod filter;
mod group;
mod infer;
mod link;
mod text;

use std::collections::HashMap;

use kurbo::Point;
use log::{debug, info, trace};

use shapegraph_core::{
    geometry::IndexRect,
    group::GroupRecord,
    shape::{ShapeId, ShapeIdAllocator, ShapeRecord},
    source::{Page, ShapeHierarchy},
    spatial::SpatialIndex,
};

use crate::{
    PipelineError,
    config::PipelineConfig,
    graph::{EdgeKind, PropertyGraph},
    policy::PagePolicy,
};

type StageFn = for<'s, 'p> fn(&'s mut PageState<'p>) -> Result<(), PipelineError>;

/// Runs every stage over the page state, in order.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by a stage.
pub(crate) fn run(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let stages: [(&str, StageFn); 10] = [
        ("collect_shapes", collect::collect_shapes),
        ("collect_connections", collect::collect_connections),
        ("remove_boring_shapes", filter::remove_boring_shapes),
        ("sort_by_area", sort_by_area),
        ("associate_text", text::associate_text),
        ("link_overlapping", link::link_overlapping),
        ("detect_groups", group::detect_groups),
        ("infer_connections", infer::infer_connections),
        ("connect_disconnected_groups", disconnected::connect_disconnected_groups),
        ("remove_redundant_connection_points", dedupe::remove_redundant_connection_points),
    ];

    for (name, stage) in stages {
        stage(state)?;
        info!(
            stage = name,
            shapes = state.order.len(),
            vertices = state.graph.vertex_count(),
            edges = state.graph.edge_count();
            "Stage finished"
        );
    }
    Ok(())
}

/// Orders the shape table by index-key area, largest first.
///
/// Later stages rely on this order; nothing reorders the table afterwards.
fn sort_by_area(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let shapes = &state.shapes;
    state.order.sort_by(|a, b| {
        let area = |id: &ShapeId| shapes.get(id).map_or(0.0, ShapeRecord::area);
        area(b).total_cmp(&area(a))
    });
    Ok(())
}

/// Mutable state of one page run.
pub(crate) struct PageState<'a> {
    page: &'a Page,
    hierarchy: ShapeHierarchy<'a>,
    config: &'a PipelineConfig,
    policy: &'a mut dyn PagePolicy,
    shapes: HashMap<ShapeId, ShapeRecord>,
    order: Vec<ShapeId>,
    index: SpatialIndex,
    graph: PropertyGraph,
    groups: Vec<GroupRecord>,
    secondary_groups: Vec<GroupRecord>,
    ids: ShapeIdAllocator,
}

impl<'a> PageState<'a> {
    /// Creates an empty state for the page.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateShape`] if the page repeats a shape id.
    pub(crate) fn new(
        page: &'a Page,
        config: &'a PipelineConfig,
        policy: &'a mut dyn PagePolicy,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            page,
            hierarchy: ShapeHierarchy::new(page)?,
            config,
            policy,
            shapes: HashMap::new(),
            order: Vec::new(),
            index: SpatialIndex::new(),
            graph: PropertyGraph::new(),
            groups: Vec::new(),
            secondary_groups: Vec::new(),
            ids: ShapeIdAllocator::new(),
        })
    }

    /// Returns the graph and the detected groups.
    pub(crate) fn into_parts(self) -> (PropertyGraph, Vec<GroupRecord>, Vec<GroupRecord>) {
        (self.graph, self.groups, self.secondary_groups)
    }

    /// Returns a live record.
    pub(crate) fn record(&self, id: ShapeId) -> Option<&ShapeRecord> {
        self.shapes.get(&id).filter(|record| !record.is_removed())
    }

    pub(crate) fn record_mut(&mut self, id: ShapeId) -> Option<&mut ShapeRecord> {
        self.shapes.get_mut(&id).filter(|record| !record.is_removed())
    }

    pub(crate) fn is_live(&self, id: ShapeId) -> bool {
        self.record(id).is_some()
    }

    /// Returns the ids of live records in table order.
    pub(crate) fn live_ids(&self) -> Vec<ShapeId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.is_live(id))
            .collect()
    }

    /// Adds a record to the table without indexing it.
    fn insert_record(&mut self, record: ShapeRecord) {
        let id = record.id();
        self.order.push(id);
        self.shapes.insert(id, record);
    }

    /// Adds a live record to the spatial index.
    fn index_shape(&mut self, id: ShapeId) {
        if let Some(key) = self.record(id).map(ShapeRecord::key) {
            self.index.insert(id, key);
        }
    }

    /// Returns live shapes whose keys touch `key`, ordered by id.
    pub(crate) fn search(&self, key: IndexRect) -> Vec<ShapeId> {
        self.index
            .search(key)
            .into_iter()
            .filter(|&id| self.is_live(id))
            .collect()
    }

    /// Returns live shapes within `radius` of `key`, nearest first.
    pub(crate) fn nearest(&self, key: IndexRect, radius: f64) -> Vec<ShapeId> {
        self.index
            .nearest(key, radius as f32, usize::MAX)
            .into_iter()
            .map(|neighbor| neighbor.id())
            .filter(|&id| self.is_live(id))
            .collect()
    }

    /// Connects two shapes; see [`PropertyGraph::add_edge`].
    pub(crate) fn create_edge(
        &mut self,
        a: ShapeId,
        b: ShapeId,
        kind: EdgeKind,
        point: Option<Point>,
    ) -> bool {
        let created = self.graph.add_edge(a, b, kind, point);
        if created {
            trace!(a:% = a, b:% = b, kind:% = kind; "Edge created");
        }
        created
    }

    /// Flags a record as removed and drops its vertex and edges.
    ///
    /// The record leaves the table and the index at the next
    /// [`clean_shapes`](Self::clean_shapes).
    pub(crate) fn remove_shape(&mut self, id: ShapeId) {
        let Some(record) = self.record_mut(id) else {
            return;
        };
        record.mark_removed();
        self.graph.remove_vertex(id);
        debug!(shape:% = id; "Shape removed");
    }

    /// Purges flagged records from the table, the order, and the index.
    pub(crate) fn clean_shapes(&mut self) {
        let removed: Vec<(ShapeId, IndexRect)> = self
            .shapes
            .values()
            .filter(|record| record.is_removed())
            .map(|record| (record.id(), record.key()))
            .collect();
        if removed.is_empty() {
            return;
        }

        for &(id, key) in &removed {
            self.index.remove(id, key);
            self.shapes.remove(&id);
            // a removed vertex is already gone; this covers records flagged directly
            self.graph.remove_vertex(id);
        }
        self.order.retain(|id| self.shapes.contains_key(id));
        debug!(count = removed.len(); "Removed shapes purged");
    }

    /// Resolves a shape to itself or its nearest live ancestor.
    pub(crate) fn find_shape_or_parent(&self, id: ShapeId) -> Option<ShapeId> {
        if self.is_live(id) {
            return Some(id);
        }
        self.hierarchy
            .ancestors(id)
            .find(|&ancestor| self.is_live(ancestor))
    }

    /// Returns the outermost live shape with geometry among the shape and its
    /// ancestors.
    pub(crate) fn topmost_with_geometry(&self, id: ShapeId) -> Option<ShapeId> {
        let own = self
            .record(id)
            .filter(|record| record.has_geometry())
            .map(ShapeRecord::id);
        self.hierarchy
            .ancestors(id)
            .filter(|&ancestor| self.record(ancestor).is_some_and(ShapeRecord::has_geometry))
            .last()
            .or(own)
    }

    /// Returns the 2-D shapes connected to a shape.
    pub(crate) fn connected_2d(&self, id: ShapeId) -> Vec<ShapeId> {
        self.graph
            .neighbors(id)
            .into_iter()
            .filter(|&other| self.record(other).is_some_and(|record| !record.is_1d()))
            .collect()
    }
}
