//! Spatial index over shape rectangles.
//!
//! [`SpatialIndex`] wraps an [`rstar`] R-tree keyed by [`IndexRect`] and storing
//! [`ShapeId`]s. The index never owns shape records; callers resolve the ids it
//! returns through their own shape table.
//!
//! Queries return fully materialized, deterministically ordered results so the
//! caller can mutate the index while walking them.

use log::trace;
use rstar::{
    AABB, RTree,
    primitives::{GeomWithData, Rectangle},
};

use crate::{geometry::IndexRect, shape::ShapeId};

type Entry = GeomWithData<Rectangle<[f32; 2]>, ShapeId>;

fn entry(id: ShapeId, key: IndexRect) -> Entry {
    GeomWithData::new(
        Rectangle::from_corners([key.min_x(), key.min_y()], [key.max_x(), key.max_y()]),
        id,
    )
}

fn envelope(key: IndexRect) -> AABB<[f32; 2]> {
    AABB::from_corners([key.min_x(), key.min_y()], [key.max_x(), key.max_y()])
}

/// A shape found by a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    id: ShapeId,
    distance: f32,
}

impl Neighbor {
    /// Returns the id of the shape found.
    pub fn id(self) -> ShapeId {
        self.id
    }

    /// Returns the gap between the query rectangle and the shape's key.
    pub fn distance(self) -> f32 {
        self.distance
    }
}

/// R-tree of shape rectangles.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<Entry>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Returns the number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns true if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a shape under the given key.
    pub fn insert(&mut self, id: ShapeId, key: IndexRect) {
        self.tree.insert(entry(id, key));
    }

    /// Removes the entry for a shape.
    ///
    /// The key must be the one the shape was inserted with. Returns false if no
    /// such entry exists.
    pub fn remove(&mut self, id: ShapeId, key: IndexRect) -> bool {
        self.tree.remove(&entry(id, key)).is_some()
    }

    /// Returns true if the shape is indexed under the given key.
    pub fn contains(&self, id: ShapeId, key: IndexRect) -> bool {
        self.tree.contains(&entry(id, key))
    }

    /// Returns every shape whose key overlaps or touches `key`, ordered by id.
    pub fn search(&self, key: IndexRect) -> Vec<ShapeId> {
        let mut ids: Vec<ShapeId> = self
            .tree
            .locate_in_envelope_intersecting(&envelope(key))
            .map(|entry| entry.data)
            .collect();
        ids.sort_unstable();
        trace!(count = ids.len(); "Spatial search");
        ids
    }

    /// Returns up to `limit` shapes whose keys lie within `max_distance` of
    /// `key`, nearest first. Equal distances are ordered by id.
    pub fn nearest(&self, key: IndexRect, max_distance: f32, limit: usize) -> Vec<Neighbor> {
        let mut neighbors: Vec<Neighbor> = self
            .tree
            .locate_in_envelope_intersecting(&envelope(key.inflate(max_distance)))
            .filter_map(|entry| {
                let rect = entry.geom();
                let lower = rect.lower();
                let upper = rect.upper();
                let distance = key.distance(IndexRect::new(lower[0], lower[1], upper[0], upper[1]));
                (distance <= max_distance).then_some(Neighbor {
                    id: entry.data,
                    distance,
                })
            })
            .collect();

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        neighbors.truncate(limit);
        neighbors
    }
}
