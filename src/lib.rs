//! Packed Bubble - WASM Module
//!
//! This module provides the layout core of packed bubble charts. It is
//! compiled to WebAssembly and exposes a JavaScript-friendly API via
//! wasm-bindgen; the host renders circles at the positions it reads back.
//!
//! # Architecture
//!
//! - `geometry`: Circle primitives, overlap test and tangent placement
//! - `layout`: Deterministic packing engine and the packed-bubble force layout
//! - `chart`: Series/layout binding, sizing, parent nodes and drag interaction
//! - `spatial`: R-tree spatial indexing for O(log n) hit testing

use js_sys::Float64Array;
use log::{Level, info};
use wasm_bindgen::prelude::*;

pub mod chart;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod spatial;

use chart::{BubbleChart, BubbleOptions, BubbleView, ParentView};
use layout::{PackItem, PointId, SeriesId, pack_bubbles};

pub use error::{Error, Result};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    let _ = console_log::init_with_level(Level::Debug);
    console_error_panic_hook::set_once();
    info!("packed bubble core initialized");
}

/// Flatten bubbles into `[seriesId, pointId, x, y, radius, ...]`.
pub fn bubbles_to_flat(bubbles: &[BubbleView]) -> Vec<f64> {
    let mut flat = Vec::with_capacity(bubbles.len() * 5);
    for b in bubbles {
        flat.extend_from_slice(&[
            b.series.raw() as f64,
            b.point.raw() as f64,
            b.x,
            b.y,
            b.radius,
        ]);
    }
    flat
}

/// Flatten parent nodes into `[seriesId, x, y, radius, ...]`.
pub fn parents_to_flat(parents: &[ParentView]) -> Vec<f64> {
    let mut flat = Vec::with_capacity(parents.len() * 4);
    for p in parents {
        flat.extend_from_slice(&[p.series.raw() as f64, p.x, p.y, p.radius]);
    }
    flat
}

/// Pack circles into a `width` x `height` area.
///
/// Returns `[x, y, radius, ...]` in input order, centered in the area.
pub fn pack_to_flat(radii: &[f64], width: f64, height: f64) -> Vec<f64> {
    let items: Vec<PackItem> = radii
        .iter()
        .enumerate()
        .map(|(i, &r)| PackItem::new(r, 0, i))
        .collect();

    let mut flat = vec![0.0; radii.len() * 3];
    for bubble in pack_bubbles(&items, width, height).positioned() {
        let i = bubble.point_index * 3;
        flat[i] = bubble.circle.x;
        flat[i + 1] = bubble.circle.y;
        flat[i + 2] = bubble.circle.radius;
    }
    flat
}

/// Pack circles without a chart.
///
/// Returns a Float64Array `[x0, y0, r0, x1, y1, r1, ...]` in input order.
#[wasm_bindgen(js_name = packBubbles)]
pub fn pack_bubbles_js(radii: &[f64], width: f64, height: f64) -> Float64Array {
    Float64Array::from(&pack_to_flat(radii, width, height)[..])
}

/// Main entry point for a packed bubble chart.
///
/// This struct wraps the internal BubbleChart and provides the public API
/// exposed to JavaScript.
#[wasm_bindgen]
pub struct PackedBubbleWasm {
    chart: BubbleChart,
}

#[wasm_bindgen]
impl PackedBubbleWasm {
    /// Create a chart from an options object.
    ///
    /// `undefined` or `null` gives the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> std::result::Result<PackedBubbleWasm, JsError> {
        let options = if options.is_undefined() || options.is_null() {
            BubbleOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(|e| Error::Options(e.to_string()))?
        };
        Ok(Self {
            chart: BubbleChart::new(options),
        })
    }

    /// Set the plot size in pixels. Takes effect on the next redraw.
    #[wasm_bindgen(js_name = setPlotSize)]
    pub fn set_plot_size(&mut self, width: f64, height: f64) {
        self.chart.set_plot_size(width, height);
    }

    // =========================================================================
    // Series Operations
    // =========================================================================

    /// Add a series from a Float64Array of values.
    ///
    /// Returns the series ID.
    #[wasm_bindgen(js_name = addSeries)]
    pub fn add_series(&mut self, values: &[f64]) -> u32 {
        self.chart.add_series(values).raw()
    }

    /// Replace the values of a series.
    ///
    /// Returns the new point IDs.
    #[wasm_bindgen(js_name = setSeriesData)]
    pub fn set_series_data(&mut self, series: u32, values: &[f64]) -> std::result::Result<Vec<u32>, JsError> {
        let ids = self.chart.set_series_data(SeriesId(series), values)?;
        Ok(ids.into_iter().map(PointId::raw).collect())
    }

    /// Show or hide a series.
    #[wasm_bindgen(js_name = setSeriesVisible)]
    pub fn set_series_visible(&mut self, series: u32, visible: bool) -> std::result::Result<(), JsError> {
        Ok(self.chart.set_series_visible(SeriesId(series), visible)?)
    }

    /// Remove a series and all its points.
    #[wasm_bindgen(js_name = removeSeries)]
    pub fn remove_series(&mut self, series: u32) -> std::result::Result<(), JsError> {
        self.chart.remove_series(SeriesId(series))?;
        Ok(())
    }

    /// Get the number of series.
    #[wasm_bindgen(js_name = seriesCount)]
    pub fn series_count(&self) -> u32 {
        self.chart.series().len() as u32
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Add a point to a series.
    ///
    /// Returns the stable point ID.
    #[wasm_bindgen(js_name = addPoint)]
    pub fn add_point(&mut self, series: u32, value: f64) -> std::result::Result<u32, JsError> {
        Ok(self.chart.add_point(SeriesId(series), value)?.raw())
    }

    /// Change the value of a point.
    #[wasm_bindgen(js_name = updatePoint)]
    pub fn update_point(&mut self, point: u32, value: f64) -> std::result::Result<(), JsError> {
        Ok(self.chart.update_point(PointId(point), value)?)
    }

    /// Remove a point.
    #[wasm_bindgen(js_name = removePoint)]
    pub fn remove_point(&mut self, point: u32) -> std::result::Result<(), JsError> {
        self.chart.remove_point(PointId(point))?;
        Ok(())
    }

    /// Get the series a point currently belongs to.
    #[wasm_bindgen(js_name = seriesOfPoint)]
    pub fn series_of_point(&self, point: u32) -> Option<u32> {
        self.chart.series_of(PointId(point)).map(SeriesId::raw)
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Recompute sizes and positions.
    pub fn redraw(&mut self) {
        self.chart.redraw();
    }

    /// Advance the simulation by one animation frame.
    ///
    /// Returns true while another frame is needed.
    pub fn tick(&mut self) -> bool {
        self.chart.tick()
    }

    /// Check if a simulation is still running.
    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.chart.is_running()
    }

    /// Get rendered bubbles as [seriesId, pointId, x, y, radius, ...].
    #[wasm_bindgen(js_name = getBubbles)]
    pub fn get_bubbles(&self) -> Float64Array {
        Float64Array::from(&bubbles_to_flat(&self.chart.bubbles())[..])
    }

    /// Get parent nodes as [seriesId, x, y, radius, ...].
    #[wasm_bindgen(js_name = getParentNodes)]
    pub fn get_parent_nodes(&self) -> Float64Array {
        Float64Array::from(&parents_to_flat(&self.chart.parent_nodes())[..])
    }

    /// Get rendered bubbles as an array of `{ series, point, x, y, radius }`.
    #[wasm_bindgen(js_name = getBubbleObjects)]
    pub fn get_bubble_objects(&self) -> std::result::Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.chart.bubbles())?)
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Find the bubble under a plot-local position.
    #[wasm_bindgen(js_name = findPointAt)]
    pub fn find_point_at(&mut self, x: f64, y: f64) -> Option<u32> {
        self.chart.find_point_at(x, y).map(PointId::raw)
    }

    /// Find the nearest bubble within a maximum distance of its rim.
    #[wasm_bindgen(js_name = findPointNear)]
    pub fn find_point_near(&mut self, x: f64, y: f64, max_distance: f64) -> Option<u32> {
        self.chart
            .find_point_near(x, y, max_distance)
            .map(PointId::raw)
    }

    // =========================================================================
    // Drag Interaction
    // =========================================================================

    /// Start dragging a point. Returns false if it cannot be dragged.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, point: u32, x: f64, y: f64) -> std::result::Result<bool, JsError> {
        Ok(self.chart.pointer_down(PointId(point), x, y)?)
    }

    /// Move a dragged point. Returns true if it moved.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, point: u32, x: f64, y: f64) -> std::result::Result<bool, JsError> {
        Ok(self.chart.pointer_move(PointId(point), x, y)?)
    }

    /// Finish a drag.
    ///
    /// Returns `{ point, from, to }` if the point moved to another series,
    /// otherwise null.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, point: u32) -> std::result::Result<JsValue, JsError> {
        match self.chart.pointer_up(PointId(point))? {
            Some(transfer) => Ok(serde_wasm_bindgen::to_value(&transfer)?),
            None => Ok(JsValue::NULL),
        }
    }
}

impl Default for PackedBubbleWasm {
    fn default() -> Self {
        Self {
            chart: BubbleChart::default(),
        }
    }
}
