//! Shapegraph Core Types and Definitions
//!
//! This crate provides the leaf building blocks for recovering a connectivity
//! graph from a diagram page. It includes:
//!
//! - **Geometry**: Path flattening, intersection, and containment ([`geometry`] module)
//! - **Spatial index**: R-tree over shape rectangles ([`spatial::SpatialIndex`])
//! - **Shapes**: Per-shape records and synthetic id allocation ([`shape`] module)
//! - **Groups**: Label-to-children associations ([`group::GroupRecord`])
//! - **Source**: The pre-parsed input page and its hierarchy ([`source`] module)

pub mod geometry;
pub mod group;
pub mod shape;
pub mod source;
pub mod spatial;
