//! Connection of groups whose members are mostly unconnected.
//!
//! Authors often attach a line to the outline of a group rather than to the
//! shapes inside it. When most labelled members of a group have no edges, the
//! shapes attached to the group are connected to every labelled member
//! instead, and the group label leaves the graph.

use log::debug;

use shapegraph_core::{
    geometry::{is_inside_or_on_boundary, regions_overlap},
    group::GroupRecord,
    shape::ShapeId,
};

use super::PageState;
use crate::{PipelineError, graph::EdgeKind};

/// Connects the members of mostly disconnected groups to the group's
/// connections. Formal groups are handled before secondary ones.
pub(super) fn connect_disconnected_groups(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    let groups = std::mem::take(&mut state.groups);
    for group in &groups {
        if !is_mostly_disconnected(state, group) {
            continue;
        }
        let connections = overlapping_shapes(state, group, false);
        connect_group(state, group, &connections);
    }
    state.groups = groups;

    let secondary_groups = std::mem::take(&mut state.secondary_groups);
    for group in &secondary_groups {
        if !is_mostly_disconnected(state, group) {
            continue;
        }
        let mut connections = attached_lines(state, group);
        if connections.is_empty() {
            connections = overlapping_shapes(state, group, true);
        }
        connect_group(state, group, &connections);
    }
    state.secondary_groups = secondary_groups;

    state.clean_shapes();
    Ok(())
}

/// Returns true if the group has labelled 2-D members and at least half of
/// them have no edges.
///
/// Members of a formal group that also belong to a secondary group are not
/// counted.
fn is_mostly_disconnected(state: &PageState<'_>, group: &GroupRecord) -> bool {
    let mut disconnected = 0;
    let mut total = 0;

    for &child in group.children() {
        let Some(record) = state.record(child) else {
            continue;
        };
        if !record.has_text() || record.is_1d() {
            continue;
        }
        let in_secondary = state
            .graph
            .vertex(child)
            .is_some_and(|vertex| vertex.flag("inSecondaryGroup"));
        if group.is_formal() && in_secondary {
            continue;
        }

        if !state.graph.has_edges(child) {
            disconnected += 1;
        }
        total += 1;
    }

    disconnected != 0 && (disconnected >= total / 2 || disconnected == total)
}

/// Returns the shapes touching the group's label.
///
/// Lines count when an endpoint falls on the label. 2-D shapes count when
/// they are already connected and overlap the label.
fn overlapping_shapes(state: &PageState<'_>, group: &GroupRecord, ignore_1d: bool) -> Vec<ShapeId> {
    let label_path = group.label_path();

    state
        .search(group.label_key())
        .into_iter()
        .filter(|&other| other != group.label())
        .filter(|&other| {
            let Some(record) = state.record(other) else {
                return false;
            };
            if record.is_1d() {
                !ignore_1d
                    && record.endpoints().is_some_and(|(start, end)| {
                        is_inside_or_on_boundary(label_path, start)
                            || is_inside_or_on_boundary(label_path, end)
                    })
            } else {
                state.graph.has_edges(other) && regions_overlap(label_path, record.path())
            }
        })
        .collect()
}

/// Returns the lines connected to a secondary group's label that plausibly
/// belong to the group.
///
/// A line qualifies through a `real*` edge, an endpoint on the label, or a
/// connection to another 2-D shape overlapping the label.
fn attached_lines(state: &PageState<'_>, group: &GroupRecord) -> Vec<ShapeId> {
    let label = group.label();
    let label_path = group.label_path();

    state
        .graph
        .edges_of(label)
        .into_iter()
        .filter_map(|edge| {
            let other = edge.other(label)?;
            let line = state.record(other).filter(|record| record.is_1d())?;

            let on_label = line.endpoints().is_some_and(|(start, end)| {
                is_inside_or_on_boundary(label_path, start) || is_inside_or_on_boundary(label_path, end)
            });
            let via_2d = || {
                state.graph.neighbors(other).into_iter().any(|neighbor| {
                    neighbor != label
                        && state.record(neighbor).is_some_and(|record| {
                            !record.is_1d() && regions_overlap(label_path, record.path())
                        })
                })
            };

            (edge.kind().is_real() || on_label || via_2d()).then_some(other)
        })
        .collect()
}

/// Removes the label and connects every labelled member to each connection.
fn connect_group(state: &mut PageState<'_>, group: &GroupRecord, connections: &[ShapeId]) {
    if connections.is_empty() {
        return;
    }
    state.remove_shape(group.label());

    let mut created = 0;
    for &child in group.children() {
        if !state.record(child).is_some_and(|record| record.has_text()) {
            continue;
        }
        for &connection in connections {
            if child != connection
                && state.create_edge(child, connection, EdgeKind::DisconnectedGroup, None)
            {
                created += 1;
            }
        }
    }

    debug!(
        label:% = group.label(),
        connections = connections.len(),
        created = created;
        "Disconnected group connected"
    );
}
