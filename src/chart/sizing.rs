//! Value to radius conversion.

use std::fmt;
use std::str::FromStr;

use super::options::SizeBy;
use crate::error::Error;
use crate::geometry::Bounds;

/// Padding added around a parent node's children.
pub const PARENT_PADDING: f64 = 20.0;
/// Smallest radius a parent node can have.
pub const MIN_PARENT_RADIUS: f64 = 20.0;

/// A bubble diameter, absolute or relative to the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    /// Absolute pixels.
    Pixels(f64),
    /// Percent of the smaller plot dimension, shared out over all points.
    Percent(f64),
}

impl SizeSpec {
    pub const DEFAULT_MIN: SizeSpec = SizeSpec::Percent(10.0);
    pub const DEFAULT_MAX: SizeSpec = SizeSpec::Percent(50.0);

    /// Diameter in pixels for a plot whose smaller side is `smallest`,
    /// holding `point_count` bubbles.
    ///
    /// Percentages are divided by `sqrt(point_count)` so the total bubble
    /// area stays roughly constant as points are added.
    pub fn resolve(self, smallest: f64, point_count: usize) -> f64 {
        let size = match self {
            SizeSpec::Pixels(px) => px,
            SizeSpec::Percent(percent) => {
                smallest * percent / 100.0 / (point_count.max(1) as f64).sqrt()
            }
        };
        size.max(0.0)
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Pixels(px) => write!(f, "{px}"),
            SizeSpec::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

impl FromStr for SizeSpec {
    type Err = Error;

    /// Parse `"25"`, `"25px"` or `"10%"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || Error::InvalidSize(s.to_string());

        if let Some(percent) = text.strip_suffix('%') {
            let value: f64 = percent.trim().parse().map_err(|_| invalid())?;
            return value
                .is_finite()
                .then_some(SizeSpec::Percent(value))
                .ok_or_else(invalid);
        }

        let pixels = text.strip_suffix("px").unwrap_or(text);
        let value: f64 = pixels.trim().parse().map_err(|_| invalid())?;
        value
            .is_finite()
            .then_some(SizeSpec::Pixels(value))
            .ok_or_else(invalid)
    }
}

/// Resolved smallest and largest bubble diameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRange {
    pub min: f64,
    pub max: f64,
}

impl SizeRange {
    pub fn resolve(
        min_size: SizeSpec,
        max_size: SizeSpec,
        plot_width: f64,
        plot_height: f64,
        point_count: usize,
    ) -> Self {
        let smallest = plot_width.min(plot_height);
        Self {
            min: min_size.resolve(smallest, point_count),
            max: max_size.resolve(smallest, point_count),
        }
    }
}

/// Value extremes over `values`, with optional overrides.
///
/// Non-finite values are ignored. Returns None when neither the overrides
/// nor the data provide both ends.
pub fn z_extremes(
    values: impl IntoIterator<Item = f64>,
    z_min: Option<f64>,
    z_max: Option<f64>,
) -> Option<(f64, f64)> {
    let mut data: Option<(f64, f64)> = None;
    for value in values.into_iter().filter(|v| v.is_finite()) {
        data = Some(match data {
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
            None => (value, value),
        });
    }

    let lo = z_min.or(data.map(|(lo, _)| lo))?;
    let hi = z_max.or(data.map(|(_, hi)| hi))?;
    Some((lo, hi))
}

/// Radius of a bubble for `value`, or None when it has no size.
///
/// The value is clamped to `extremes` and interpolated between the
/// diameters of `range`. A bubble whose diameter rounds to zero is absent.
pub fn bubble_radius(value: f64, extremes: (f64, f64), range: SizeRange, size_by: SizeBy) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }

    let (z_min, z_max) = extremes;
    let value = value.min(z_max).max(z_min);
    let z_range = z_max - z_min;

    let mut pos = if z_range > 0.0 { (value - z_min) / z_range } else { 0.5 };
    if size_by == SizeBy::Area && pos >= 0.0 {
        pos = pos.sqrt();
    }

    let radius = (range.min + pos * (range.max - range.min)).ceil() / 2.0;
    (radius > 0.0).then_some(radius)
}

/// Radius of a parent node holding bubbles whose total area is `child_area`.
///
/// The area term keeps every child inside; the bounding box of the rendered
/// children, when known, caps it so a loosely packed group does not grow a
/// parent far larger than what it holds.
pub fn parent_radius(child_area: f64, rendered: Option<&Bounds>) -> f64 {
    let by_area = ((2.0 * child_area / std::f64::consts::PI).sqrt() + PARENT_PADDING).max(MIN_PARENT_RADIUS);
    match rendered {
        Some(bounds) => by_area.min((bounds.diagonal() / 2.0 + PARENT_PADDING).max(MIN_PARENT_RADIUS)),
        None => by_area,
    }
}
