//! Shape and connection collection.

use log::debug;

use shapegraph_core::{
    shape::{ShapeId, ShapeRecord},
    source::{ConnectionPart, ShapeText, VisitedShape},
};

use super::PageState;
use crate::{
    PipelineError,
    graph::{EdgeKind, Value},
};

/// Builds a record and a vertex for every input shape.
///
/// A shape whose text belongs to an aligned ancestor hands the text over and
/// gets no vertex of its own.
pub(super) fn collect_shapes(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let visits: Vec<VisitedShape<'_>> = state.hierarchy.visits().to_vec();

    for visit in visits {
        let node = visit.node();
        let record = ShapeRecord::from_node(node, visit.transform())
            .map_err(|source| PipelineError::geometry(node.id(), source))?;

        let text = node.text().map_or("", ShapeText::text);
        if record.has_text() && reassign_text_to_parent(state, &record, text) {
            continue;
        }

        let (x, y) = record.center();
        let vertex = state.graph.add_vertex(record.id());
        vertex.set_property("label", text);
        vertex.set_property("shapeId", record.id());
        vertex.set_property("group", Value::Null);
        vertex.set_property("groupId", Value::Null);
        vertex.set_property("inSecondaryGroup", false);
        vertex.set_property("is1d", node.is_1d());
        vertex.set_property("name", node.name());
        vertex.set_property("pageName", state.page.name());
        vertex.set_property("symbolName", node.symbol_name());
        vertex.set_property("type", node.shape_type());
        vertex.set_property("x", x);
        vertex.set_property("y", y);

        state.policy.on_create(&record, vertex);
        state.insert_record(record);
    }

    debug!(page = state.page.name(), shapes = state.order.len(); "Shapes collected");
    Ok(())
}

/// Moves the text of `record` onto the outermost textless ancestor whose box
/// starts at the same left edge with the same width.
///
/// The walk stops at the first live ancestor that is not aligned. Aligned
/// textless ancestors passed over on the way are duplicates of the chosen one
/// and are removed. Returns true if the text was moved.
fn reassign_text_to_parent(state: &mut PageState<'_>, record: &ShapeRecord, text: &str) -> bool {
    let tolerance = state.config.tolerances().alignment();
    let bounds = record.bounds();

    let mut target: Option<ShapeId> = None;
    let mut duplicates = Vec::new();
    for ancestor in state.hierarchy.ancestors(record.id()) {
        let Some(parent) = state.record(ancestor) else {
            continue;
        };
        let parent_bounds = parent.bounds();
        if (bounds.width() - parent_bounds.width()).abs() > tolerance
            || (parent_bounds.x0 - bounds.x0).abs() > tolerance
        {
            break;
        }
        if !parent.has_text() {
            if let Some(previous) = target.replace(ancestor) {
                duplicates.push(previous);
            }
        }
    }

    let Some(target) = target else {
        return false;
    };
    let Some(center) = record.text_center() else {
        return false;
    };

    if let Some(vertex) = state.graph.vertex_mut(target) {
        vertex.set_property("label", text);
        vertex.set_property("textRef", record.id());
        vertex.set_property("textRefWhy", "reassignToParent");
    }
    if let Some(parent) = state.shapes.get_mut(&target) {
        parent.assign_text(center);
        state.policy.on_reassign_to_parent(parent, record);
    }
    debug!(shape:% = record.id(), parent:% = target, duplicates = duplicates.len(); "Text reassigned to parent");

    for duplicate in duplicates {
        state.remove_shape(duplicate);
    }
    true
}

/// Turns author-drawn connections into `real` edges.
///
/// Each end resolves to the shape itself or its nearest live ancestor. A
/// connection leaving the begin or end of a 1-D shape records that endpoint.
///
/// # Errors
///
/// Returns [`PipelineError::UnresolvedShape`] if an end resolves to nothing.
pub(super) fn collect_connections(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    if !state.policy.allow_real_connections() {
        debug!("Author-drawn connections ignored by policy");
        return Ok(());
    }

    let page = state.page;
    let mut created = 0;
    for connection in page.connections() {
        let from = state
            .find_shape_or_parent(connection.from())
            .ok_or(PipelineError::UnresolvedShape {
                shape: connection.from(),
            })?;
        let to = state
            .find_shape_or_parent(connection.to())
            .ok_or(PipelineError::UnresolvedShape {
                shape: connection.to(),
            })?;

        let endpoints = state.record(from).and_then(ShapeRecord::endpoints);
        let point = match connection.from_part() {
            ConnectionPart::Begin => endpoints.map(|(start, _)| start),
            ConnectionPart::End => endpoints.map(|(_, end)| end),
            ConnectionPart::Other => None,
        };

        if state.create_edge(from, to, EdgeKind::Real, point) {
            created += 1;
        }
    }

    debug!(connections = page.connections().len(), created = created; "Connections collected");
    Ok(())
}
