//! Group records produced by group detection.

use kurbo::BezPath;

use crate::{geometry::IndexRect, shape::ShapeId};

/// How firmly a label was judged to group the shapes beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// The label names its children; the label shape itself is dropped.
    Formal,
    /// The label may name its children; the label shape is kept.
    Secondary,
}

/// A label shape and the shapes it visually contains.
///
/// The label's outline and index key are captured when the group is found,
/// since a formal group's label record is purged right afterwards.
#[derive(Debug, Clone)]
pub struct GroupRecord {
    kind: GroupKind,
    label: ShapeId,
    name: String,
    label_path: BezPath,
    label_key: IndexRect,
    children: Vec<ShapeId>,
}

impl GroupRecord {
    /// Creates a group record.
    ///
    /// # Arguments
    ///
    /// * `kind` - Formal or secondary
    /// * `label` - Id of the labelling shape
    /// * `name` - The label's text
    /// * `label_path` - The label's outline in page coordinates
    /// * `label_key` - The label's spatial index key
    /// * `children` - Ids of the contained shapes
    pub fn new(
        kind: GroupKind,
        label: ShapeId,
        name: impl Into<String>,
        label_path: BezPath,
        label_key: IndexRect,
        children: Vec<ShapeId>,
    ) -> Self {
        Self {
            kind,
            label,
            name: name.into(),
            label_path,
            label_key,
            children,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn is_formal(&self) -> bool {
        self.kind == GroupKind::Formal
    }

    pub fn label(&self) -> ShapeId {
        self.label
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label_path(&self) -> &BezPath {
        &self.label_path
    }

    pub fn label_key(&self) -> IndexRect {
        self.label_key
    }

    pub fn children(&self) -> &[ShapeId] {
        &self.children
    }
}
