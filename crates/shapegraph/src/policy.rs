//! Per-document policy and observation hooks.
//!
//! A [`PagePolicy`] steers the few decisions that depend on the kind of
//! document being read and receives a notification for every structural change
//! the pipeline makes. All methods have defaults, so an implementation only
//! overrides what it cares about.
//!
//! [`DefaultPolicy`] answers from a [`PipelineConfig`] and ignores events.

use shapegraph_core::{group::GroupRecord, shape::ShapeRecord};

use crate::{config::PipelineConfig, graph::Vertex};

/// Decisions and observer hooks consulted while a page is processed.
pub trait PagePolicy {
    /// Whether author-drawn connections are turned into edges.
    fn allow_real_connections(&self) -> bool {
        true
    }

    /// How far from a textbox to look for the shape it labels, in page units.
    fn text_search_radius(&self, _textbox: &ShapeRecord) -> f64 {
        0.5
    }

    /// Whether `candidate` may receive the text of `textbox`.
    fn on_text_candidate(&self, _textbox: &ShapeRecord, _candidate: &ShapeRecord) -> bool {
        true
    }

    /// Called after a record and its vertex are created from an input shape.
    fn on_create(&mut self, _record: &ShapeRecord, _vertex: &Vertex) {}

    /// Called after the text of `text_shape` moved onto an ancestor.
    fn on_reassign_to_parent(&mut self, _parent: &ShapeRecord, _text_shape: &ShapeRecord) {}

    /// Called after a formal group is recorded, before its label is purged.
    fn on_group(&mut self, _group: &GroupRecord) {}

    /// Called after a secondary group is recorded.
    fn on_secondary_group(&mut self, _group: &GroupRecord) {}

    /// Called after the text of `source` was given to `target`.
    fn on_assign_text(&mut self, _source: &ShapeRecord, _target: &ShapeRecord) {}

    /// Called after a segment of a split line is created.
    fn on_clone_1d(&mut self, _original: &ShapeRecord, _segment: &ShapeRecord) {}
}

/// Policy that answers from configuration and observes nothing.
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    use_real: bool,
    search_radius: f64,
}

impl DefaultPolicy {
    /// Creates a policy from the given configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            use_real: config.connections().use_real(),
            search_radius: config.text().search_radius(),
        }
    }
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl PagePolicy for DefaultPolicy {
    fn allow_real_connections(&self) -> bool {
        self.use_real
    }

    fn text_search_radius(&self, _textbox: &ShapeRecord) -> f64 {
        self.search_radius
    }
}
