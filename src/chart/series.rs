//! Series and data points.
//!
//! A series owns an ordered list of points. Each point carries its raw
//! value, the radius computed on the last redraw and the plot-local position
//! written back by whichever layout placed it.

use crate::geometry::Circle;
use crate::layout::{PointId, SeriesId};

/// Point state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointState {
    flags: u8,
}

impl PointState {
    const FIXED: u8 = 0b0000_0001;
    const IN_DRAG: u8 = 0b0000_0010;

    /// Create a new default point state.
    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    /// Check if the point is pinned (excluded from simulation).
    #[inline]
    pub fn is_fixed(self) -> bool {
        self.flags & Self::FIXED != 0
    }

    /// Set the fixed state.
    #[inline]
    pub fn set_fixed(&mut self, fixed: bool) {
        if fixed {
            self.flags |= Self::FIXED;
        } else {
            self.flags &= !Self::FIXED;
        }
    }

    /// Check if a pointer is currently dragging the point.
    #[inline]
    pub fn is_in_drag(self) -> bool {
        self.flags & Self::IN_DRAG != 0
    }

    /// Set the in-drag state.
    #[inline]
    pub fn set_in_drag(&mut self, in_drag: bool) {
        if in_drag {
            self.flags |= Self::IN_DRAG;
        } else {
            self.flags &= !Self::IN_DRAG;
        }
    }
}

/// Where a drag started, in pointer and plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    pub pointer_x: f64,
    pub pointer_y: f64,
    pub plot_x: f64,
    pub plot_y: f64,
}

/// One data point rendered as a bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct BubblePoint {
    pub id: PointId,
    pub value: f64,
    /// Radius from the last redraw; None when the bubble has no size.
    pub radius: Option<f64>,
    /// Plot-local center, once a layout has placed the point.
    pub position: Option<(f64, f64)>,
    pub state: PointState,
    pub drag: Option<DragAnchor>,
}

impl BubblePoint {
    pub fn new(id: PointId, value: f64) -> Self {
        Self {
            id,
            value,
            radius: None,
            position: None,
            state: PointState::new(),
            drag: None,
        }
    }

    /// The rendered circle, if the point has both a size and a position.
    pub fn circle(&self) -> Option<Circle> {
        let (x, y) = self.position?;
        Some(Circle::new(x, y, self.radius?))
    }
}

/// An ordered collection of points sharing a parent node.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: SeriesId,
    pub visible: bool,
    points: Vec<BubblePoint>,
    /// Parent circle from the last layout pass (split series only).
    pub parent: Option<Circle>,
}

impl Series {
    pub fn new(id: SeriesId) -> Self {
        Self {
            id,
            visible: true,
            points: Vec::new(),
            parent: None,
        }
    }

    pub fn points(&self) -> &[BubblePoint] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [BubblePoint] {
        &mut self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: BubblePoint) {
        self.points.push(point);
    }

    /// Replace all points, returning the old ones.
    pub fn set_points(&mut self, points: Vec<BubblePoint>) -> Vec<BubblePoint> {
        std::mem::replace(&mut self.points, points)
    }

    pub fn position_of(&self, id: PointId) -> Option<usize> {
        self.points.iter().position(|p| p.id == id)
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn remove(&mut self, id: PointId) -> Option<BubblePoint> {
        let index = self.position_of(id)?;
        Some(self.points.remove(index))
    }

    /// Circles of every point that is currently rendered.
    pub fn rendered_circles(&self) -> Vec<Circle> {
        self.points.iter().filter_map(BubblePoint::circle).collect()
    }

    /// Total area of all sized bubbles.
    pub fn bubble_area(&self) -> f64 {
        self.points
            .iter()
            .filter_map(|p| p.radius)
            .map(|r| std::f64::consts::PI * r * r)
            .sum()
    }
}
