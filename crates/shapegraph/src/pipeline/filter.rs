//! Removal of shapes that carry no information.

use log::debug;

use shapegraph_core::{
    shape::{ShapeId, ShapeRecord},
    source::GROUP_SHAPE_TYPE,
};

use super::PageState;
use crate::{PipelineError, graph::EdgeKind};

/// Indexes every shape worth keeping and removes the rest.
///
/// A shape is kept if it is interesting or already connected. An
/// uninteresting group whose live descendants carry neither text nor a symbol
/// absorbs those descendants first and becomes interesting itself.
///
/// # Errors
///
/// Returns [`PipelineError::InconsistentEdge`] if an edge of an absorbed child
/// does not touch that child.
pub(super) fn remove_boring_shapes(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let mut removed = 0;

    for id in state.live_ids() {
        let Some(record) = state.record(id) else {
            continue;
        };
        if !record.is_interesting() && record.shape_type() == GROUP_SHAPE_TYPE {
            absorb_plain_children(state, id)?;
        }

        let keep = state.record(id).is_some_and(ShapeRecord::is_interesting) || state.graph.has_edges(id);
        if keep {
            state.index_shape(id);
        } else {
            state.remove_shape(id);
            removed += 1;
        }
    }

    state.clean_shapes();
    debug!(removed = removed, indexed = state.index.len(); "Boring shapes removed");
    Ok(())
}

/// Promotes a group whose live descendants are all plain shapes.
///
/// The descendants are removed and their edges move onto the group as
/// `real-moved` edges. A single descendant with text or a symbol leaves the
/// whole subtree untouched.
fn absorb_plain_children(state: &mut PageState<'_>, group: ShapeId) -> Result<(), PipelineError> {
    let mut children = Vec::new();
    for descendant in state.hierarchy.descendants(group) {
        let Some(child) = state.record(descendant) else {
            continue;
        };
        if child.has_text() || !child.symbol_name().is_empty() {
            return Ok(());
        }
        children.push(descendant);
    }
    if children.is_empty() {
        return Ok(());
    }

    if let Some(record) = state.record_mut(group) {
        record.mark_interesting();
    }

    for &child in &children {
        for edge in state.graph.edges_of(child) {
            let other = edge
                .other(child)
                .ok_or(PipelineError::InconsistentEdge { shape: child })?;
            state.graph.remove_edge(child, other);
            state.create_edge(group, other, EdgeKind::RealMoved, edge.point());
        }
        state.remove_shape(child);
    }

    debug!(group:% = group, children = children.len(); "Group absorbed plain children");
    Ok(())
}
