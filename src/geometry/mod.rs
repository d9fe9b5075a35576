//! Circle geometry used by the packing engine and the force layout.
//!
//! Provides the overlap test, the two-circle tangent placement solver and a
//! bounding box over sets of circles.

mod circle;

pub use circle::{Bounds, Circle, OVERLAP_EPSILON, overlaps, place_tangent};
