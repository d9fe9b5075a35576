//! Series/layout binding.
//!
//! A [`BubbleChart`] owns the series, sizes their bubbles from the values of
//! every counted series, and positions them either once with the packing
//! engine or with a shared force layout that the host advances with
//! [`BubbleChart::tick`]. Split series get a second, shared layout for their
//! parent nodes; its positions feed the bubble layout as anchors.
//!
//! All positions are plot-local: `(0, 0)` is the top-left corner of the plot.

pub mod options;
pub mod series;
pub mod sizing;

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::geometry::{Bounds, Circle};
use crate::layout::{
    Anchor, BUBBLE_MASS, BubbleLayout, LayoutKind, LayoutNode, NodeKey, PackItem,
    PackedBubbleForces, PointId, SeriesId, SimulationState, pack_bubbles,
};
use crate::spatial::CircleIndex;

pub use options::{BubbleOptions, SizeBy};
pub use series::{BubblePoint, DragAnchor, PointState, Series};
pub use sizing::{SizeRange, SizeSpec};

/// Pointer travel below which a drag is still a click.
const DRAG_DEAD_ZONE: f64 = 5.0;

/// Order layouts are stepped in.
const LAYOUT_ORDER: [LayoutKind; 2] = [LayoutKind::Bubbles, LayoutKind::ParentNodes];

/// One value of the chart-wide aggregate used for sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedPoint {
    pub series: SeriesId,
    pub point: PointId,
    pub value: f64,
}

/// A rendered bubble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BubbleView {
    pub series: SeriesId,
    pub point: PointId,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// A rendered parent node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParentView {
    pub series: SeriesId,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// A point dropped into another series' parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesTransfer {
    pub point: PointId,
    pub from: SeriesId,
    pub to: SeriesId,
}

/// A packed-bubble chart.
pub struct BubbleChart {
    options: BubbleOptions,
    width: f64,
    height: f64,
    series: Vec<Series>,
    next_series_id: u32,
    next_point_id: u32,
    /// Aggregate of counted values; None after invalidation.
    all_points: Option<Vec<AggregatedPoint>>,
    layouts: HashMap<LayoutKind, BubbleLayout>,
    index: CircleIndex,
    index_dirty: bool,
}

impl BubbleChart {
    /// Create an empty chart.
    pub fn new(options: BubbleOptions) -> Self {
        Self {
            options,
            width: 0.0,
            height: 0.0,
            series: Vec::new(),
            next_series_id: 0,
            next_point_id: 0,
            all_points: None,
            layouts: HashMap::new(),
            index: CircleIndex::new(),
            index_dirty: true,
        }
    }

    pub fn options(&self) -> &BubbleOptions {
        &self.options
    }

    /// Resize the plot. Takes effect on the next redraw.
    pub fn set_plot_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn plot_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    // =========================================================================
    // Series Operations
    // =========================================================================

    /// Add a visible series with one point per value.
    pub fn add_series(&mut self, values: &[f64]) -> SeriesId {
        let id = SeriesId(self.next_series_id);
        self.next_series_id += 1;

        let mut series = Series::new(id);
        for &value in values {
            series.push(BubblePoint::new(self.alloc_point_id(), value));
        }
        self.series.push(series);
        self.invalidate();
        id
    }

    /// Replace every point of a series.
    ///
    /// Returns the ids of the new points.
    pub fn set_series_data(&mut self, id: SeriesId, values: &[f64]) -> Result<Vec<PointId>> {
        let index = self.series_index(id)?;
        let ids: Vec<PointId> = values.iter().map(|_| self.alloc_point_id()).collect();
        let points = ids
            .iter()
            .zip(values)
            .map(|(&point, &value)| BubblePoint::new(point, value))
            .collect();

        let old = self.series[index].set_points(points);
        for point in old {
            self.deregister_point(point.id);
        }
        self.invalidate();
        Ok(ids)
    }

    /// Append a point to a series.
    pub fn add_point(&mut self, series: SeriesId, value: f64) -> Result<PointId> {
        let index = self.series_index(series)?;
        let id = self.alloc_point_id();
        self.series[index].push(BubblePoint::new(id, value));
        self.invalidate();
        Ok(id)
    }

    /// Change the value of a point.
    pub fn update_point(&mut self, point: PointId, value: f64) -> Result<()> {
        let (si, pi) = self.locate(point).ok_or(Error::UnknownPoint(point))?;
        self.series[si].points_mut()[pi].value = value;
        self.invalidate();
        Ok(())
    }

    /// Remove a point from its series and from the layout.
    pub fn remove_point(&mut self, point: PointId) -> Result<BubblePoint> {
        let (si, _) = self.locate(point).ok_or(Error::UnknownPoint(point))?;
        let removed = self.series[si]
            .remove(point)
            .ok_or(Error::UnknownPoint(point))?;
        self.deregister_point(point);
        self.invalidate();
        Ok(removed)
    }

    /// Show or hide a series.
    ///
    /// Hiding takes the series' bubbles and parent node out of the layouts;
    /// showing adds them back on the next redraw.
    pub fn set_series_visible(&mut self, id: SeriesId, visible: bool) -> Result<()> {
        let index = self.series_index(id)?;
        self.series[index].visible = visible;
        if !visible {
            self.deregister_series(id);
        }
        self.invalidate();
        Ok(())
    }

    /// Remove a series with all its points.
    pub fn remove_series(&mut self, id: SeriesId) -> Result<Series> {
        let index = self.series_index(id)?;
        let removed = self.series.remove(index);
        self.deregister_series(id);
        self.invalidate();
        Ok(removed)
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn series_by_id(&self, id: SeriesId) -> Option<&Series> {
        self.series.iter().find(|s| s.id == id)
    }

    pub fn point(&self, id: PointId) -> Option<&BubblePoint> {
        let (si, pi) = self.locate(id)?;
        Some(&self.series[si].points()[pi])
    }

    /// Series currently owning a point.
    pub fn series_of(&self, id: PointId) -> Option<SeriesId> {
        self.locate(id).map(|(si, _)| self.series[si].id)
    }

    /// Values of every counted series, rebuilt once after each invalidation.
    ///
    /// Hidden series count only when `ignore_hidden_series` is off.
    pub fn all_points(&mut self) -> &[AggregatedPoint] {
        let ignore_hidden = self.options.ignore_hidden_series;
        let series = &self.series;
        self.all_points.get_or_insert_with(|| {
            series
                .iter()
                .filter(|s| s.visible || !ignore_hidden)
                .flat_map(|s| {
                    s.points().iter().map(|p| AggregatedPoint {
                        series: s.id,
                        point: p.id,
                        value: p.value,
                    })
                })
                .collect()
        })
    }

    /// The force layout of a kind, if the chart has created it.
    pub fn layout(&self, kind: LayoutKind) -> Option<&BubbleLayout> {
        self.layouts.get(&kind)
    }

    fn alloc_point_id(&mut self) -> PointId {
        let id = PointId(self.next_point_id);
        self.next_point_id += 1;
        id
    }

    fn series_index(&self, id: SeriesId) -> Result<usize> {
        self.series
            .iter()
            .position(|s| s.id == id)
            .ok_or(Error::UnknownSeries(id))
    }

    fn locate(&self, id: PointId) -> Option<(usize, usize)> {
        self.series
            .iter()
            .enumerate()
            .find_map(|(si, s)| s.position_of(id).map(|pi| (si, pi)))
    }

    fn invalidate(&mut self) {
        self.all_points = None;
        self.index_dirty = true;
    }

    fn deregister_point(&mut self, id: PointId) {
        if let Some(layout) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            layout.remove_node(NodeKey::Point(id));
        }
    }

    fn deregister_series(&mut self, id: SeriesId) {
        if let Some(layout) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            layout.remove_series(id);
        }
        if let Some(layout) = self.layouts.get_mut(&LayoutKind::ParentNodes) {
            layout.remove_node(NodeKey::Parent(id));
        }
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Recompute radii and positions.
    ///
    /// With the simulation enabled the layouts are restarted and the host
    /// keeps calling [`tick`](Self::tick); otherwise they run to completion
    /// here.
    pub fn redraw(&mut self) {
        self.all_points = None;
        self.assign_radii();
        self.index_dirty = true;

        if self.width <= 0.0 || self.height <= 0.0 {
            warn!("plot area {}x{} is empty, skipping layout", self.width, self.height);
            return;
        }

        if self.options.use_simulation {
            self.start_layouts();
            self.settle();
            self.write_back();
        } else {
            self.pack();
        }
    }

    /// Advance every animated layout by one step and write positions back.
    ///
    /// Returns true while another tick is needed.
    pub fn tick(&mut self) -> bool {
        let mut running = false;
        for kind in LAYOUT_ORDER {
            if let Some(layout) = self.layouts.get_mut(&kind) {
                if layout.is_running() && layout.options().enable_simulation {
                    running |= layout.run() == SimulationState::Running;
                }
            }
        }
        self.sync_anchors();
        self.write_back();
        running
    }

    /// Whether any layout is still running.
    pub fn is_running(&self) -> bool {
        self.layouts.values().any(|l| l.is_running())
    }

    fn assign_radii(&mut self) {
        let (z_min, z_max) = (self.options.z_min, self.options.z_max);
        let (count, extremes) = {
            let points = self.all_points();
            (
                points.len(),
                sizing::z_extremes(points.iter().map(|p| p.value), z_min, z_max),
            )
        };

        let range = SizeRange::resolve(
            self.options.min_size,
            self.options.max_size,
            self.width,
            self.height,
            count,
        );
        let size_by = self.options.size_by;
        let ignore_hidden = self.options.ignore_hidden_series;

        for series in &mut self.series {
            let counted = series.visible || !ignore_hidden;
            for point in series.points_mut() {
                point.radius = match extremes {
                    Some(extremes) if counted => {
                        sizing::bubble_radius(point.value, extremes, range, size_by)
                    }
                    _ => None,
                };
            }
        }
    }

    fn pack(&mut self) {
        let mut items = Vec::new();
        for (si, series) in self.series.iter().enumerate().filter(|(_, s)| s.visible) {
            for (pi, point) in series.points().iter().enumerate() {
                if let Some(radius) = point.radius {
                    items.push(PackItem::new(radius, si, pi));
                }
            }
        }

        let result = pack_bubbles(&items, self.width, self.height);
        for bubble in result.positioned() {
            let point = &mut self.series[bubble.series_index].points_mut()[bubble.point_index];
            point.position = Some((bubble.circle.x, bubble.circle.y));
            point.radius = Some(bubble.circle.radius);
        }
        debug!(
            "packed {} bubbles in {} stages after {} repacks",
            items.len(),
            result.stage_count,
            result.repacks
        );
    }

    fn start_layouts(&mut self) {
        let options = self.options.layout_algorithm.clone();
        let (width, height) = (self.width, self.height);

        let bubbles = self
            .layouts
            .entry(LayoutKind::Bubbles)
            .or_insert_with(|| BubbleLayout::new(PackedBubbleForces, options.clone()));
        bubbles.set_area(0.0, 0.0, width, height);
        sync_bubble_nodes(bubbles, &self.series);

        if options.split_series {
            let parents = self
                .layouts
                .entry(LayoutKind::ParentNodes)
                .or_insert_with(|| {
                    BubbleLayout::new(PackedBubbleForces, options.parent_layout_options())
                });
            parents.set_area(0.0, 0.0, width, height);
            sync_parent_nodes(parents, &self.series);
            parents.start();
        }

        // Bubbles seed around the parents, so those go first
        self.sync_anchors();
        if let Some(bubbles) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            bubbles.start();
        }
    }

    /// Step every layout with the simulation disabled until all are stable.
    fn settle(&mut self) {
        loop {
            let mut stepped = false;
            for kind in LAYOUT_ORDER {
                if let Some(layout) = self.layouts.get_mut(&kind) {
                    if layout.is_running() && !layout.options().enable_simulation {
                        layout.run();
                        stepped = true;
                    }
                }
            }
            if !stepped {
                break;
            }
            self.sync_anchors();
        }
    }

    /// Copy parent node positions into the bubble layout.
    fn sync_anchors(&mut self) {
        let Some(parents) = self.layouts.get(&LayoutKind::ParentNodes) else {
            return;
        };
        let anchors: Vec<(SeriesId, Anchor)> = parents
            .nodes()
            .iter()
            .filter(|n| n.is_parent)
            .map(|n| {
                let anchor = Anchor {
                    x: n.x,
                    y: n.y,
                    radius: n.radius,
                };
                (n.series, anchor)
            })
            .collect();

        if let Some(bubbles) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            for (series, anchor) in anchors {
                bubbles.set_anchor(series, anchor);
            }
        }
    }

    /// Copy layout positions onto points and series.
    fn write_back(&mut self) {
        let Some(bubbles) = self.layouts.get(&LayoutKind::Bubbles) else {
            return;
        };
        let positions: HashMap<PointId, (f64, f64)> = bubbles
            .nodes()
            .iter()
            .filter_map(|n| match n.key {
                NodeKey::Point(id) => Some((id, (n.x, n.y))),
                NodeKey::Parent(_) => None,
            })
            .collect();
        let parents: HashMap<SeriesId, Circle> = self
            .layouts
            .get(&LayoutKind::ParentNodes)
            .map(|layout| {
                layout
                    .nodes()
                    .iter()
                    .filter(|n| n.is_parent)
                    .map(|n| (n.series, Circle::new(n.x, n.y, n.radius)))
                    .collect()
            })
            .unwrap_or_default();

        for series in &mut self.series {
            if let Some(parent) = parents.get(&series.id) {
                series.parent = Some(*parent);
            }
            for point in series.points_mut() {
                if let Some(&position) = positions.get(&point.id) {
                    point.position = Some(position);
                }
            }
        }
        self.index_dirty = true;
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Every rendered bubble of the visible series.
    pub fn bubbles(&self) -> Vec<BubbleView> {
        self.series
            .iter()
            .filter(|s| s.visible)
            .flat_map(|s| {
                s.points().iter().filter_map(move |p| {
                    p.circle().map(|c| BubbleView {
                        series: s.id,
                        point: p.id,
                        x: c.x,
                        y: c.y,
                        radius: c.radius,
                    })
                })
            })
            .collect()
    }

    /// Parent nodes of the visible split series, in layout order.
    pub fn parent_nodes(&self) -> Vec<ParentView> {
        self.layouts
            .get(&LayoutKind::ParentNodes)
            .map(|layout| {
                layout
                    .nodes()
                    .iter()
                    .filter(|n| n.is_parent)
                    .map(|n| ParentView {
                        series: n.series,
                        x: n.x,
                        y: n.y,
                        radius: n.radius,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Hit Testing
    // =========================================================================

    fn refresh_index(&mut self) {
        if self.index_dirty {
            let circles: Vec<(NodeKey, Circle)> = self
                .bubbles()
                .into_iter()
                .map(|b| (NodeKey::Point(b.point), Circle::new(b.x, b.y, b.radius)))
                .collect();
            self.index.rebuild(circles);
            self.index_dirty = false;
        }
    }

    /// The bubble under a plot-local position.
    pub fn find_point_at(&mut self, x: f64, y: f64) -> Option<PointId> {
        self.refresh_index();
        match self.index.hit_test(x, y)? {
            NodeKey::Point(id) => Some(id),
            NodeKey::Parent(_) => None,
        }
    }

    /// The bubble whose rim is nearest to a position, within `max_distance`.
    pub fn find_point_near(&mut self, x: f64, y: f64, max_distance: f64) -> Option<PointId> {
        self.refresh_index();
        match self.index.nearest_within(x, y, max_distance)? {
            NodeKey::Point(id) => Some(id),
            NodeKey::Parent(_) => None,
        }
    }

    // =========================================================================
    // Drag Interaction
    // =========================================================================

    /// Start dragging a point from a pointer position.
    ///
    /// Returns false when dragging is disabled or the point is not rendered.
    /// Packed bubbles cannot be dragged: nothing would move their neighbours.
    pub fn pointer_down(&mut self, point: PointId, pointer_x: f64, pointer_y: f64) -> Result<bool> {
        let (si, pi) = self.locate(point).ok_or(Error::UnknownPoint(point))?;
        if !self.options.draggable || !self.options.use_simulation {
            return Ok(false);
        }

        let target = &mut self.series[si].points_mut()[pi];
        let Some((x, y)) = target.position else {
            return Ok(false);
        };
        target.drag = Some(DragAnchor {
            pointer_x,
            pointer_y,
            plot_x: x,
            plot_y: y,
        });
        target.state.set_fixed(true);
        target.state.set_in_drag(true);

        if let Some(layout) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            layout.pin(NodeKey::Point(point), x, y);
        }
        Ok(true)
    }

    /// Move a dragged point with the pointer.
    ///
    /// Movement inside the dead zone or outside the plot is ignored. Returns
    /// true when the point moved.
    pub fn pointer_move(&mut self, point: PointId, pointer_x: f64, pointer_y: f64) -> Result<bool> {
        let (si, pi) = self.locate(point).ok_or(Error::UnknownPoint(point))?;
        let (width, height) = (self.width, self.height);

        let target = &mut self.series[si].points_mut()[pi];
        let anchor = match target.drag {
            Some(anchor) if target.state.is_in_drag() => anchor,
            _ => return Ok(false),
        };

        let diff_x = anchor.pointer_x - pointer_x;
        let diff_y = anchor.pointer_y - pointer_y;
        if diff_x.abs() <= DRAG_DEAD_ZONE && diff_y.abs() <= DRAG_DEAD_ZONE {
            return Ok(false);
        }

        let x = anchor.plot_x - diff_x;
        let y = anchor.plot_y - diff_y;
        if !(0.0..=width).contains(&x) || !(0.0..=height).contains(&y) {
            return Ok(false);
        }
        target.position = Some((x, y));

        if let Some(layout) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            layout.pin(NodeKey::Point(point), x, y);
            if layout.is_running() {
                layout.reset_simulation();
            } else {
                layout.set_initial_rendering(false);
                if layout.options().enable_simulation {
                    // Ticks carry the new run
                    layout.start();
                } else {
                    layout.set_max_iterations(Some(1));
                    layout.run();
                }
                layout.set_initial_rendering(true);
            }
        }
        self.write_back();
        self.index_dirty = true;
        Ok(true)
    }

    /// Finish a drag.
    ///
    /// If the point was released inside another series' parent node and
    /// dragging between series is enabled, it moves to that series.
    pub fn pointer_up(&mut self, point: PointId) -> Result<Option<SeriesTransfer>> {
        let (si, pi) = self.locate(point).ok_or(Error::UnknownPoint(point))?;
        if self.series[si].points()[pi].drag.is_none() {
            return Ok(None);
        }

        let transfer = self.drop_target(si, pi).map(|to| SeriesTransfer {
            point,
            from: self.series[si].id,
            to,
        });
        if let Some(transfer) = transfer {
            self.transfer_point(transfer)?;
        }

        let fixed_draggable = self.options.fixed_draggable;
        if let Some(layout) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            if layout.options().enable_simulation {
                layout.run();
            }
            if !fixed_draggable {
                layout.unpin(NodeKey::Point(point));
            }
        }

        let (si, pi) = self.locate(point).ok_or(Error::UnknownPoint(point))?;
        let target = &mut self.series[si].points_mut()[pi];
        target.state.set_in_drag(false);
        if !fixed_draggable {
            target.state.set_fixed(false);
            target.drag = None;
        }

        self.write_back();
        Ok(transfer)
    }

    /// First foreign parent node the point at `(si, pi)` penetrates.
    fn drop_target(&self, si: usize, pi: usize) -> Option<SeriesId> {
        let options = &self.options.layout_algorithm;
        if !(options.split_series && options.drag_between_series) {
            return None;
        }
        let parents = self.layouts.get(&LayoutKind::ParentNodes)?;
        let circle = self.series[si].points()[pi].circle()?;
        let own = self.series[si].id;

        let mut index = CircleIndex::new();
        index.rebuild(
            parents
                .nodes()
                .iter()
                .filter(|n| n.is_parent)
                .map(|n| (n.key, Circle::new(n.x, n.y, n.radius))),
        );

        index
            .overlapping(&circle)
            .into_iter()
            .find_map(|key| match key {
                NodeKey::Parent(series) if series != own => Some(series),
                _ => None,
            })
    }

    fn transfer_point(&mut self, transfer: SeriesTransfer) -> Result<()> {
        let from = self.series_index(transfer.from)?;
        let to = self.series_index(transfer.to)?;
        let moved = self.series[from]
            .remove(transfer.point)
            .ok_or(Error::UnknownPoint(transfer.point))?;
        self.series[to].push(moved);

        if let Some(layout) = self.layouts.get_mut(&LayoutKind::Bubbles) {
            if let Some(node) = layout.node_mut(NodeKey::Point(transfer.point)) {
                node.series = transfer.to;
            }
        }
        self.invalidate();
        debug!(
            "{} dropped from {} into {}",
            transfer.point, transfer.from, transfer.to
        );
        Ok(())
    }
}

impl Default for BubbleChart {
    fn default() -> Self {
        Self::new(BubbleOptions::default())
    }
}

/// Sized points of the visible series with their radius.
fn sized_points(series: &[Series]) -> impl Iterator<Item = (SeriesId, &BubblePoint, f64)> {
    series.iter().filter(|s| s.visible).flat_map(|s| {
        s.points()
            .iter()
            .filter_map(move |p| p.radius.map(|r| (s.id, p, r)))
    })
}

/// Make the bubble layout hold exactly the sized points of visible series.
fn sync_bubble_nodes(layout: &mut BubbleLayout, series: &[Series]) {
    let keep: HashSet<NodeKey> = sized_points(series)
        .map(|(_, p, _)| NodeKey::Point(p.id))
        .collect();
    let stale: Vec<NodeKey> = layout
        .nodes()
        .iter()
        .map(|n| n.key)
        .filter(|key| !keep.contains(key))
        .collect();
    for key in stale {
        layout.remove_node(key);
    }

    for (series_id, point, radius) in sized_points(series) {
        match layout.node_mut(NodeKey::Point(point.id)) {
            Some(node) => {
                node.radius = radius;
                node.series = series_id;
                node.mass = BUBBLE_MASS;
                node.degree = 1.0;
            }
            None => {
                let mut node = LayoutNode::bubble(point.id, series_id, radius);
                if let Some((x, y)) = point.position {
                    node.place_at(x, y);
                }
                node.fixed = point.state.is_fixed();
                layout.add_nodes([node]);
            }
        }
    }
}

/// Make the parent layout hold one node per visible series, sized from its
/// bubbles.
fn sync_parent_nodes(layout: &mut BubbleLayout, series: &[Series]) {
    let visible: HashSet<NodeKey> = series
        .iter()
        .filter(|s| s.visible)
        .map(|s| NodeKey::Parent(s.id))
        .collect();
    let stale: Vec<NodeKey> = layout
        .nodes()
        .iter()
        .map(|n| n.key)
        .filter(|key| !visible.contains(key))
        .collect();
    for key in stale {
        layout.remove_node(key);
    }

    for s in series.iter().filter(|s| s.visible) {
        let rendered = s.rendered_circles();
        let radius = sizing::parent_radius(s.bubble_area(), Bounds::from_circles(&rendered).as_ref());

        match layout.node_mut(NodeKey::Parent(s.id)) {
            Some(node) => {
                node.radius = radius;
                node.mass = radius / 2.0;
                node.degree = radius;
            }
            None => {
                let mut node = LayoutNode::parent(s.id, radius);
                if let Some(previous) = s.parent {
                    node.place_at(previous.x, previous.y);
                }
                layout.add_nodes([node]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::overlaps;
    use crate::layout::LayoutOptions;
    use std::f64::consts::PI;

    fn simulated(split: bool) -> BubbleOptions {
        let mut layout = LayoutOptions {
            split_series: split,
            drag_between_series: split,
            enable_simulation: false,
            ..Default::default()
        };
        layout.parent_node_options.enable_simulation = false;
        BubbleOptions {
            use_simulation: true,
            layout_algorithm: layout,
            ..Default::default()
        }
    }

    fn chart(options: BubbleOptions) -> BubbleChart {
        let mut chart = BubbleChart::new(options);
        chart.set_plot_size(400.0, 300.0);
        chart
    }

    #[test]
    fn test_packing_mode_positions_all_bubbles() {
        let mut chart = chart(BubbleOptions::default());
        chart.add_series(&[1.0, 5.0, 3.0]);
        chart.add_series(&[2.0, 8.0]);
        chart.redraw();

        let bubbles = chart.bubbles();
        assert_eq!(bubbles.len(), 5);
        for (i, a) in bubbles.iter().enumerate() {
            for b in &bubbles[i + 1..] {
                let ca = Circle::new(a.x, a.y, a.radius);
                let cb = Circle::new(b.x, b.y, b.radius);
                assert!(!overlaps(&ca, &cb));
            }
        }

        // Fitted and centered in the plot
        let circles: Vec<Circle> = bubbles.iter().map(|b| Circle::new(b.x, b.y, b.radius)).collect();
        let bounds = Bounds::from_circles(&circles).unwrap();
        assert!(bounds.min_x >= -1e-6 && bounds.max_x <= 400.0 + 1e-6);
        assert!(bounds.min_y >= -1e-6 && bounds.max_y <= 300.0 + 1e-6);
        assert!((bounds.min_x + bounds.max_x - 400.0).abs() < 1e-6);
        assert!((bounds.min_y + bounds.max_y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_points_cached_until_invalidated() {
        let mut chart = chart(BubbleOptions::default());
        let a = chart.add_series(&[1.0, 2.0]);
        chart.add_series(&[3.0]);
        assert_eq!(chart.all_points().len(), 3);

        chart.set_series_visible(a, false).unwrap();
        assert_eq!(chart.all_points().len(), 1);

        chart.add_point(a, 4.0).unwrap();
        assert_eq!(chart.all_points().len(), 1);
    }

    #[test]
    fn test_hidden_series_counted_when_not_ignored() {
        let options = BubbleOptions {
            ignore_hidden_series: false,
            ..Default::default()
        };
        let mut chart = chart(options);
        let a = chart.add_series(&[1.0, 2.0]);
        chart.add_series(&[3.0]);
        chart.set_series_visible(a, false).unwrap();
        assert_eq!(chart.all_points().len(), 3);

        chart.redraw();
        // Sized but not rendered
        assert!(chart.series_by_id(a).unwrap().points()[0].radius.is_some());
        assert_eq!(chart.bubbles().len(), 1);
    }

    #[test]
    fn test_zero_sized_points_are_not_rendered() {
        let options = BubbleOptions {
            min_size: SizeSpec::Pixels(0.0),
            max_size: SizeSpec::Pixels(40.0),
            ..Default::default()
        };
        let mut chart = chart(options);
        let s = chart.add_series(&[0.0, 10.0, f64::NAN]);
        chart.redraw();

        let series = chart.series_by_id(s).unwrap();
        assert_eq!(series.points()[0].radius, None);
        assert_eq!(series.points()[1].radius, Some(20.0));
        assert_eq!(series.points()[2].radius, None);
        assert_eq!(chart.bubbles().len(), 1);
    }

    #[test]
    fn test_simulation_settles_without_overlap() {
        let mut chart = chart(simulated(false));
        chart.add_series(&[1.0, 2.0, 3.0]);
        chart.redraw();

        assert!(!chart.is_running());
        assert!(!chart.tick());

        let bubbles = chart.bubbles();
        assert_eq!(bubbles.len(), 3);
        let padding = chart.options().layout_algorithm.bubble_padding;
        for (i, a) in bubbles.iter().enumerate() {
            for b in &bubbles[i + 1..] {
                let gap = Circle::new(a.x, a.y, a.radius).gap(&Circle::new(b.x, b.y, b.radius));
                assert!(gap >= -padding, "gap {gap}");
            }
        }
    }

    #[test]
    fn test_animated_simulation_ticks() {
        let mut options = simulated(false);
        options.layout_algorithm.enable_simulation = true;
        let mut chart = chart(options);
        chart.add_series(&[1.0, 2.0]);
        chart.redraw();
        assert!(chart.is_running());

        let mut ticks = 0;
        while chart.tick() {
            ticks += 1;
            assert!(ticks <= 1000);
        }
        assert!(!chart.is_running());
        assert_eq!(chart.bubbles().len(), 2);
    }

    #[test]
    fn test_parent_radius_covers_children() {
        let mut chart = chart(simulated(true));
        let a = chart.add_series(&[1.0, 2.0, 3.0]);
        let b = chart.add_series(&[4.0]);
        chart.redraw();

        let parents = chart.parent_nodes();
        assert_eq!(parents.len(), 2);
        for parent in parents {
            let series = chart.series_by_id(parent.series).unwrap();
            let area: f64 = series
                .points()
                .iter()
                .filter_map(|p| p.radius)
                .map(|r| PI * r * r)
                .sum();
            assert!(parent.radius >= (2.0 * area / PI).sqrt() + sizing::PARENT_PADDING - 1e-9);
            assert!(parent.radius >= sizing::MIN_PARENT_RADIUS);
            assert!(parent.series == a || parent.series == b);
        }
    }

    #[test]
    fn test_hidden_series_leaves_layouts() {
        let mut chart = chart(simulated(true));
        let a = chart.add_series(&[1.0, 2.0]);
        chart.add_series(&[3.0]);
        chart.redraw();
        assert_eq!(chart.layout(LayoutKind::Bubbles).unwrap().node_count(), 3);
        assert_eq!(chart.layout(LayoutKind::ParentNodes).unwrap().node_count(), 2);

        chart.set_series_visible(a, false).unwrap();
        assert_eq!(chart.layout(LayoutKind::Bubbles).unwrap().node_count(), 1);
        assert_eq!(chart.layout(LayoutKind::ParentNodes).unwrap().node_count(), 1);

        chart.set_series_visible(a, true).unwrap();
        chart.redraw();
        assert_eq!(chart.layout(LayoutKind::Bubbles).unwrap().node_count(), 3);
        assert_eq!(chart.parent_nodes().len(), 2);
    }

    #[test]
    fn test_remove_point_and_series() {
        let mut chart = chart(simulated(false));
        let a = chart.add_series(&[1.0, 2.0]);
        let b = chart.add_series(&[3.0]);
        chart.redraw();

        let point = chart.series_by_id(a).unwrap().points()[0].id;
        let removed = chart.remove_point(point).unwrap();
        assert_eq!(removed.id, point);
        let bubbles = chart.layout(LayoutKind::Bubbles).unwrap();
        assert!(!bubbles.contains(NodeKey::Point(point)));
        assert!(matches!(chart.remove_point(point), Err(Error::UnknownPoint(p)) if p == point));

        chart.remove_series(b).unwrap();
        assert_eq!(chart.layout(LayoutKind::Bubbles).unwrap().node_count(), 1);
        assert!(matches!(chart.remove_series(b), Err(Error::UnknownSeries(s)) if s == b));
    }

    #[test]
    fn test_set_series_data_replaces_points() {
        let mut chart = chart(simulated(false));
        let a = chart.add_series(&[1.0, 2.0]);
        chart.redraw();

        let ids = chart.set_series_data(a, &[5.0, 6.0, 7.0]).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(chart.layout(LayoutKind::Bubbles).unwrap().node_count(), 0);

        chart.redraw();
        assert_eq!(chart.layout(LayoutKind::Bubbles).unwrap().node_count(), 3);
        assert_eq!(chart.all_points().len(), 3);
    }

    #[test]
    fn test_find_point_at() {
        let mut chart = chart(BubbleOptions::default());
        chart.add_series(&[1.0, 5.0, 3.0]);
        chart.redraw();

        for bubble in chart.bubbles() {
            assert_eq!(chart.find_point_at(bubble.x, bubble.y), Some(bubble.point));
        }
        assert_eq!(chart.find_point_at(-50.0, -50.0), None);
    }

    #[test]
    fn test_drag_dead_zone_and_plot_bounds() {
        let mut chart = chart(simulated(false));
        chart.add_series(&[1.0, 2.0, 3.0]);
        chart.redraw();

        // The largest bubble, well clear of the plot edges
        let bubble = chart.bubbles()[2];
        assert!(chart.pointer_down(bubble.point, 50.0, 50.0).unwrap());

        // Within the dead zone
        assert!(!chart.pointer_move(bubble.point, 53.0, 46.0).unwrap());
        // Outside the plot
        assert!(!chart.pointer_move(bubble.point, 50.0 - bubble.x - 10.0, 50.0).unwrap());

        assert!(chart.pointer_move(bubble.point, 60.0, 50.0).unwrap());
        let moved = chart.point(bubble.point).unwrap().position.unwrap();
        assert_eq!(moved, (bubble.x + 10.0, bubble.y));

        let layout = chart.layout(LayoutKind::Bubbles).unwrap();
        let node = layout.node(NodeKey::Point(bubble.point)).unwrap();
        assert!(node.fixed);
        assert_eq!((node.x, node.y), moved);
        assert_eq!(layout.state(), SimulationState::Stable);

        assert_eq!(chart.pointer_up(bubble.point).unwrap(), None);
        let point = chart.point(bubble.point).unwrap();
        assert!(!point.state.is_fixed());
        assert!(point.drag.is_none());
        let layout = chart.layout(LayoutKind::Bubbles).unwrap();
        assert!(!layout.node(NodeKey::Point(bubble.point)).unwrap().fixed);
    }

    #[test]
    fn test_fixed_draggable_keeps_pin() {
        let mut options = simulated(false);
        options.fixed_draggable = true;
        let mut chart = chart(options);
        chart.add_series(&[1.0, 2.0]);
        chart.redraw();

        let bubble = chart.bubbles()[0];
        chart.pointer_down(bubble.point, 0.0, 0.0).unwrap();
        chart.pointer_up(bubble.point).unwrap();

        let point = chart.point(bubble.point).unwrap();
        assert!(point.state.is_fixed());
        assert!(!point.state.is_in_drag());
        let layout = chart.layout(LayoutKind::Bubbles).unwrap();
        assert!(layout.node(NodeKey::Point(bubble.point)).unwrap().fixed);
    }

    #[test]
    fn test_drag_disabled() {
        let mut options = simulated(false);
        options.draggable = false;
        let mut chart = chart(options);
        chart.add_series(&[1.0]);
        chart.redraw();

        let bubble = chart.bubbles()[0];
        assert!(!chart.pointer_down(bubble.point, 0.0, 0.0).unwrap());
        assert!(!chart.pointer_move(bubble.point, 20.0, 0.0).unwrap());
        assert_eq!(chart.pointer_up(bubble.point).unwrap(), None);
        assert!(chart.pointer_down(PointId(999), 0.0, 0.0).is_err());
    }

    #[test]
    fn test_drag_between_series() {
        let mut chart = chart(simulated(true));
        let a = chart.add_series(&[1.0, 2.0]);
        let b = chart.add_series(&[3.0, 4.0]);
        chart.redraw();

        let target = *chart
            .parent_nodes()
            .iter()
            .find(|p| p.series == b)
            .unwrap();
        let point = chart.series_by_id(a).unwrap().points()[0].id;
        let (x, y) = chart.point(point).unwrap().position.unwrap();

        assert!(chart.pointer_down(point, x, y).unwrap());
        // Inside the dead zone the bubble already overlaps the target parent
        chart.pointer_move(point, target.x, target.y).unwrap();
        let transfer = chart.pointer_up(point).unwrap().unwrap();

        assert_eq!(transfer, SeriesTransfer { point, from: a, to: b });
        assert!(!chart.series_by_id(a).unwrap().contains(point));
        assert!(chart.series_by_id(b).unwrap().contains(point));
        assert_eq!(chart.series_of(point), Some(b));

        let node = chart
            .layout(LayoutKind::Bubbles)
            .unwrap()
            .node(NodeKey::Point(point))
            .unwrap();
        assert_eq!(node.series, b);
        assert!(!node.fixed);
    }

    #[test]
    fn test_no_transfer_without_drag_between_series() {
        let mut options = simulated(true);
        options.layout_algorithm.drag_between_series = false;
        let mut chart = chart(options);
        let a = chart.add_series(&[1.0, 2.0]);
        let b = chart.add_series(&[3.0, 4.0]);
        chart.redraw();

        let target = *chart.parent_nodes().iter().find(|p| p.series == b).unwrap();
        let point = chart.series_by_id(a).unwrap().points()[0].id;
        let (x, y) = chart.point(point).unwrap().position.unwrap();

        chart.pointer_down(point, x, y).unwrap();
        chart.pointer_move(point, target.x, target.y).unwrap();
        assert_eq!(chart.pointer_up(point).unwrap(), None);
        assert_eq!(chart.series_of(point), Some(a));
    }

    #[test]
    fn test_empty_plot_skips_layout() {
        let mut chart = BubbleChart::default();
        assert_eq!(chart.plot_size(), (0.0, 0.0));
        chart.add_series(&[1.0, 2.0]);
        chart.redraw();
        assert!(chart.bubbles().is_empty());
    }

    #[test]
    fn test_packing_mode_refuses_drag() {
        let mut chart = chart(BubbleOptions::default());
        chart.add_series(&[1.0, 2.0, 3.0]);
        chart.redraw();
        let before = chart.bubbles();

        let (from, onto) = (before[0], before[1]);
        assert!(!chart.pointer_down(from.point, from.x, from.y).unwrap());
        assert!(!chart.pointer_move(from.point, onto.x, onto.y).unwrap());
        assert_eq!(chart.pointer_up(from.point).unwrap(), None);

        let after = chart.bubbles();
        assert_eq!(after, before);
        for (i, a) in after.iter().enumerate() {
            for b in &after[i + 1..] {
                let ca = Circle::new(a.x, a.y, a.radius);
                let cb = Circle::new(b.x, b.y, b.radius);
                assert!(!overlaps(&ca, &cb));
            }
        }
    }

    /// Pointer offset of 10px toward the plot center.
    fn nudge(bubble: &BubbleView) -> f64 {
        if bubble.x < 200.0 { 10.0 } else { -10.0 }
    }

    #[test]
    fn test_drag_extends_running_simulation() {
        let mut options = simulated(false);
        options.layout_algorithm.enable_simulation = true;
        let mut chart = chart(options);
        chart.add_series(&[1.0, 2.0, 3.0]);
        chart.redraw();

        assert!(chart.tick());
        assert!(chart.tick());
        let layout = chart.layout(LayoutKind::Bubbles).unwrap();
        assert_eq!(layout.remaining_iterations(), 998);

        let bubble = chart.bubbles()[2];
        let dx = nudge(&bubble);
        assert!(chart.pointer_down(bubble.point, 100.0, 100.0).unwrap());
        assert!(chart.pointer_move(bubble.point, 100.0 + dx, 100.0).unwrap());

        let layout = chart.layout(LayoutKind::Bubbles).unwrap();
        assert_eq!(layout.state(), SimulationState::Running);
        assert_eq!(layout.remaining_iterations(), 1000);

        // The pinned bubble stays under the pointer while the rest move
        chart.tick();
        let target = (bubble.x + dx, bubble.y);
        assert_eq!(chart.point(bubble.point).unwrap().position, Some(target));
        let node = chart
            .layout(LayoutKind::Bubbles)
            .unwrap()
            .node(NodeKey::Point(bubble.point))
            .unwrap();
        assert!(node.fixed);
        assert_eq!((node.x, node.y), target);
    }

    #[test]
    fn test_drag_restarts_stable_animated_layout() {
        let mut options = simulated(false);
        options.layout_algorithm.enable_simulation = true;
        let mut chart = chart(options);
        chart.add_series(&[1.0, 2.0, 3.0]);
        chart.redraw();

        let mut ticks = 0;
        while chart.tick() {
            ticks += 1;
            assert!(ticks <= 1000);
        }
        assert!(!chart.is_running());

        let bubble = chart.bubbles()[2];
        let dx = nudge(&bubble);
        assert!(chart.pointer_down(bubble.point, 100.0, 100.0).unwrap());
        assert!(chart.pointer_move(bubble.point, 100.0 + dx, 100.0).unwrap());

        assert!(chart.is_running());
        let layout = chart.layout(LayoutKind::Bubbles).unwrap();
        assert_eq!(layout.state(), SimulationState::Running);
        assert_eq!(layout.remaining_iterations(), 1000);

        chart.tick();
        assert_eq!(
            chart.point(bubble.point).unwrap().position,
            Some((bubble.x + dx, bubble.y))
        );
        assert_eq!(chart.pointer_up(bubble.point).unwrap(), None);
    }
}
