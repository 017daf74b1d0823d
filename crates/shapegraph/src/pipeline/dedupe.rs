//! Removal of line-to-line edges that duplicate a shared 2-D connection.

use log::debug;

use shapegraph_core::geometry::rect_contains_with_slack;

use super::PageState;
use crate::PipelineError;

/// Drops edges between a line and another shape when both are connected to
/// the same 2-D shape and the edge's connection point lies on that shape.
///
/// Two lines that meet inside a box are already related through the box, so
/// the direct edge between them adds nothing.
pub(super) fn remove_redundant_connection_points(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let tolerance = state.config.tolerances().connection_point();
    let mut removed = 0;

    for id in state.live_ids() {
        if !state.record(id).is_some_and(|record| record.is_1d()) {
            continue;
        }

        let edges: Vec<_> = state
            .graph
            .edges_of(id)
            .into_iter()
            .filter_map(|edge| Some((edge.other(id)?, edge.point()?)))
            .collect();
        if edges.is_empty() {
            continue;
        }
        let own_2d = state.connected_2d(id);

        for (other, point) in edges {
            let redundant = state.connected_2d(other).into_iter().any(|shared| {
                own_2d.contains(&shared)
                    && state
                        .record(shared)
                        .is_some_and(|record| rect_contains_with_slack(record.bounds(), point, tolerance))
            });
            if redundant && state.graph.remove_edge(id, other).is_some() {
                removed += 1;
            }
        }
    }

    debug!(removed = removed; "Redundant connection points removed");
    Ok(())
}
