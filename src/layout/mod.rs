//! Bubble layout algorithms.
//!
//! Two independent ways of positioning circles:
//! - [`packing`]: one-shot deterministic ring packing, rescaled to fit an area
//! - [`force`]: an iterative force simulation driven one step per animation
//!   tick, specialized for bubbles by [`packed_bubble`]

pub mod force;
pub mod node;
pub mod options;
pub mod packed_bubble;
pub mod packing;

pub use force::{ForceEnv, ForceLayout, ForceModel, LayoutArea, SimulationState};
pub use node::{Anchor, BUBBLE_MASS, LayoutNode, NodeKey, PointId, SeriesId};
pub use options::{InitialPositions, LayoutOptions, ParentNodeOptions, PlacementFn};
pub use packed_bubble::PackedBubbleForces;
pub use packing::{PackItem, PackedBubble, PackingResult, pack_bubbles};

/// The layouts a chart can own, one of each at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    /// Positions the bubbles of all visible series together.
    Bubbles,
    /// Positions the parent nodes of split series.
    ParentNodes,
}

/// Force layout specialized for packed bubbles.
pub type BubbleLayout = ForceLayout<PackedBubbleForces>;
