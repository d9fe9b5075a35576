//! Spatial indexing for O(log n) hit testing.
//!
//! This module provides an R-tree based index over rendered circles, used
//! for pointer hit testing and for finding the parent node a dragged bubble
//! was dropped into.

mod rtree;

pub use rtree::{CircleEntry, CircleIndex};
