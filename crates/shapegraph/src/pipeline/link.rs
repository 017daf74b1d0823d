//! Linking of overlapping shapes drawn from the same symbol.

use log::debug;

use shapegraph_core::shape::ShapeRecord;

use super::PageState;
use crate::{PipelineError, graph::EdgeKind};

/// Links 2-D shapes of the same symbol that overlap without one enclosing the
/// other.
pub(super) fn link_overlapping(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let mut linked = 0;

    for id in state.live_ids() {
        let Some(record) = state.record(id) else {
            continue;
        };
        if record.is_1d() || record.symbol_name().is_empty() {
            continue;
        }

        let partners: Vec<_> = state
            .search(record.key())
            .into_iter()
            .filter(|&other| other != id)
            .filter(|&other| {
                state.record(other).is_some_and(|candidate| {
                    !candidate.is_1d()
                        && candidate.symbol_name() == record.symbol_name()
                        && !ShapeRecord::either_encloses(record, candidate)
                })
            })
            .collect();

        for other in partners {
            if state.create_edge(id, other, EdgeKind::Linked, None) {
                linked += 1;
            }
        }
    }

    debug!(linked = linked; "Overlapping shapes linked");
    Ok(())
}
