//! Node type and related identifiers.
//!
//! A layout node is one circle taking part in a force simulation. Each node has:
//! - A key naming the data point (or series parent) it stands for
//! - Position (x, y) and previous position for Verlet integration
//! - Radius, mass and degree driving the packed-bubble forces
//! - Fixed state (excluded from simulation while dragged)

use std::fmt;

use serde::Serialize;

/// Stable series identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SeriesId(pub u32);

impl SeriesId {
    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Series({})", self.0)
    }
}

impl From<u32> for SeriesId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Stable point identifier, unique within a chart.
///
/// Survives a point moving to another series by drag and drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PointId(pub u32);

impl PointId {
    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({})", self.0)
    }
}

impl From<u32> for PointId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// What a layout node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// A data point rendered as a bubble.
    Point(PointId),
    /// The synthetic containment circle of a split series.
    Parent(SeriesId),
}

/// Containment circle a series' bubbles gravitate to when series are split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Mass given to ordinary bubbles.
pub const BUBBLE_MASS: f64 = 2.0;

/// A circle inside a force simulation.
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub key: NodeKey,
    /// Series the node belongs to (its own series for a parent node).
    pub series: SeriesId,
    pub x: f64,
    pub y: f64,
    pub prev_x: f64,
    pub prev_y: f64,
    pub radius: f64,
    pub mass: f64,
    /// Repulsion damping; reset to `mass` on every repulsion pass.
    pub degree: f64,
    /// Overlapping neighbours counted during the current repulsion pass.
    pub neighbours: u32,
    /// Displacement length of the last integration step.
    pub temperature: f64,
    /// Excluded from all forces (pinned by a drag).
    pub fixed: bool,
    pub is_parent: bool,
    /// Whether the node has a position yet.
    pub placed: bool,
}

impl LayoutNode {
    /// A bubble for a data point, not yet positioned.
    pub fn bubble(point: PointId, series: SeriesId, radius: f64) -> Self {
        Self {
            key: NodeKey::Point(point),
            series,
            x: 0.0,
            y: 0.0,
            prev_x: 0.0,
            prev_y: 0.0,
            radius,
            mass: BUBBLE_MASS,
            degree: 1.0,
            neighbours: 0,
            temperature: 0.0,
            fixed: false,
            is_parent: false,
            placed: false,
        }
    }

    /// A parent node enclosing all bubbles of `series`.
    ///
    /// Mass is half the radius and degree equals the radius.
    pub fn parent(series: SeriesId, radius: f64) -> Self {
        Self {
            key: NodeKey::Parent(series),
            mass: radius / 2.0,
            degree: radius,
            is_parent: true,
            ..Self::bubble(PointId(u32::MAX), series, radius)
        }
    }

    /// Place the node at a position, resetting its previous position too.
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.place_at(x, y);
        self
    }

    /// Place the node at a position, resetting its previous position too.
    #[inline]
    pub fn place_at(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.prev_x = x;
        self.prev_y = y;
        self.placed = true;
    }

    /// Separation vector from `other` to this node.
    #[inline]
    pub fn distance_xy(&self, other: &LayoutNode) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }
}
