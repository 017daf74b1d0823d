//! Association of free-standing text with nearby shapes.

use log::debug;

use shapegraph_core::shape::ShapeId;

use super::PageState;
use crate::{PipelineError, graph::EdgeKind};

/// Hands the text of every textbox to the shape it most likely labels.
///
/// Candidates are visited nearest first within the policy's search radius.
/// The first candidate that does not enclose the textbox wins; failing that,
/// the first enclosing candidate does. Shapes that already carry text and
/// candidates the policy rejects are skipped.
///
/// # Errors
///
/// Returns [`PipelineError::InconsistentEdge`] if an edge of a textbox does not
/// touch it.
pub(super) fn associate_text(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let mut associated = 0;

    for id in state.live_ids() {
        let Some(textbox) = state.record(id) else {
            continue;
        };
        if !textbox.is_textbox() {
            continue;
        }

        let radius = state.policy.text_search_radius(textbox);
        let mut enclosing = None;
        let mut chosen = None;
        for candidate in state.nearest(textbox.key(), radius) {
            if candidate == id {
                continue;
            }
            let Some(other) = state.record(candidate) else {
                continue;
            };
            if other.has_text() || !state.policy.on_text_candidate(textbox, other) {
                continue;
            }
            if other.encloses(textbox) {
                enclosing.get_or_insert(candidate);
                continue;
            }
            chosen = Some(candidate);
            break;
        }

        if let Some(target) = chosen.or(enclosing) {
            give_text(state, id, target)?;
            associated += 1;
        }
    }

    state.clean_shapes();
    debug!(associated = associated; "Textboxes associated");
    Ok(())
}

/// Moves label and edges of `textbox` onto `target` and removes the textbox.
fn give_text(state: &mut PageState<'_>, textbox: ShapeId, target: ShapeId) -> Result<(), PipelineError> {
    let label = state
        .graph
        .vertex(textbox)
        .map(|vertex| vertex.label().to_string())
        .unwrap_or_default();
    let Some(center) = state.record(textbox).and_then(|record| record.text_center()) else {
        return Ok(());
    };

    if let Some(vertex) = state.graph.vertex_mut(target) {
        vertex.set_property("label", label);
        vertex.set_property("textRef", textbox);
        vertex.set_property("textRefWhy", "associateWithShape");
    }
    if let Some(record) = state.record_mut(target) {
        record.assign_text(center);
    }

    for edge in state.graph.edges_of(textbox) {
        let other = edge
            .other(textbox)
            .ok_or(PipelineError::InconsistentEdge { shape: textbox })?;
        state.graph.remove_edge(textbox, other);
        if other != target {
            state.create_edge(other, target, EdgeKind::Reparent, edge.point());
        }
    }

    if let (Some(source), Some(record)) = (state.shapes.get(&textbox), state.shapes.get(&target)) {
        state.policy.on_assign_text(source, record);
    }
    debug!(textbox:% = textbox, shape:% = target; "Text associated with shape");

    state.remove_shape(textbox);
    Ok(())
}
