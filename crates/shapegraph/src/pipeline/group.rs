//! Detection of labelled shapes that visually group other shapes.

use log::debug;

use shapegraph_core::group::{GroupKind, GroupRecord};

use super::PageState;
use crate::PipelineError;

/// Records a group for every labelled 2-D shape that encloses other 2-D
/// shapes.
///
/// An enclosed shape is a primary member when the label is not itself grouped
/// and the two do not share the same outermost ancestor with geometry; any
/// other enclosed shape is a secondary member. Primary members make a formal
/// group and the label is removed. Without primary members, secondary members
/// make a secondary group and the label stays.
pub(super) fn detect_groups(state: &mut PageState<'_>) -> Result<(), PipelineError> {
    for id in state.live_ids() {
        let Some(label) = state.record(id) else {
            continue;
        };
        if label.is_1d() || !label.has_text() {
            continue;
        }

        let in_group = state
            .graph
            .vertex(id)
            .and_then(|vertex| vertex.property("groupId"))
            .is_some_and(|value| !value.is_null());
        let topmost = state.topmost_with_geometry(id);

        let mut primary = Vec::new();
        let mut secondary = Vec::new();
        for other in state.search(label.key()) {
            if other == id {
                continue;
            }
            let Some(candidate) = state.record(other) else {
                continue;
            };
            if candidate.is_1d() || !label.encloses(candidate) {
                continue;
            }
            if !in_group && (topmost.is_none() || topmost != state.topmost_with_geometry(other)) {
                primary.push(other);
            } else {
                secondary.push(other);
            }
        }

        let name = state
            .graph
            .vertex(id)
            .map(|vertex| vertex.label().to_string())
            .unwrap_or_default();
        let (path, key) = (label.path().clone(), label.key());

        if !primary.is_empty() {
            for &child in &primary {
                if let Some(vertex) = state.graph.vertex_mut(child) {
                    vertex.set_property("group", name.as_str());
                    vertex.set_property("groupId", id);
                }
            }
            debug!(label:% = id, children = primary.len(); "Formal group detected");

            let group = GroupRecord::new(GroupKind::Formal, id, name, path, key, primary);
            state.policy.on_group(&group);
            state.groups.push(group);
            state.remove_shape(id);
        } else if !secondary.is_empty() {
            for &child in &secondary {
                if let Some(vertex) = state.graph.vertex_mut(child) {
                    vertex.set_property("inSecondaryGroup", true);
                    vertex.set_property("secondaryGroup", name.as_str());
                }
            }
            debug!(label:% = id, children = secondary.len(); "Secondary group detected");

            let group = GroupRecord::new(GroupKind::Secondary, id, name, path, key, secondary);
            state.policy.on_secondary_group(&group);
            state.secondary_groups.push(group);
        }
    }

    state.clean_shapes();
    debug!(
        formal = state.groups.len(),
        secondary = state.secondary_groups.len();
        "Groups detected"
    );
    Ok(())
}
