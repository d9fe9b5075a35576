//! Deterministic bubble packing.
//!
//! Places circles without any simulation, then rescales them to fit a
//! target rectangle.
//!
//! # Algorithm Overview
//!
//! 1. **Sort** circles by radius, largest first (stable, so equal radii keep
//!    their input order).
//! 2. **Seed:** the largest circle sits at the origin, the second one directly
//!    above it, touching.
//! 3. **Grow stages:** every following circle is placed tangent to the last
//!    circle of the current stage (ring) and an anchor circle of the previous
//!    stage. When it would overlap the first circle of its own stage the ring
//!    is closed and a new outer stage starts; when it would overlap the next
//!    anchor of the previous stage the anchor cursor advances.
//! 4. **Fit:** the bounding box is compared with the target rectangle. If the
//!    uniform scale factor is not 1, every radius is scaled and the whole
//!    placement is repeated; otherwise centering offsets are computed.

use log::{debug, warn};

use crate::geometry::{Bounds, Circle, overlaps, place_tangent};

/// Scale factors closer to 1 than this end the rescale loop.
const SCALE_TOLERANCE: f64 = 1e-10;

/// Upper bound on placement passes of the rescale loop.
pub const MAX_REPACKS: u32 = 64;

/// A bubble to be packed: only its radius is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackItem {
    pub radius: f64,
    pub series_index: usize,
    pub point_index: usize,
}

impl PackItem {
    pub fn new(radius: f64, series_index: usize, point_index: usize) -> Self {
        Self {
            radius,
            series_index,
            point_index,
        }
    }
}

/// A packed bubble, centered around the origin of the packing space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedBubble {
    pub circle: Circle,
    pub series_index: usize,
    pub point_index: usize,
}

impl PackedBubble {
    fn at(circle: Circle, item: &PackItem) -> Self {
        Self {
            circle,
            series_index: item.series_index,
            point_index: item.point_index,
        }
    }
}

/// Output of [`pack_bubbles`].
#[derive(Debug, Clone, Default)]
pub struct PackingResult {
    /// Bubbles in placement order (largest first).
    pub bubbles: Vec<PackedBubble>,
    /// Offset that centers the packing horizontally in the target area.
    pub offset_x: f64,
    /// Offset that centers the packing vertically in the target area.
    pub offset_y: f64,
    /// Number of stages of the final placement.
    pub stage_count: usize,
    /// Placement passes repeated because of rescaling.
    pub repacks: u32,
}

impl PackingResult {
    /// Bubbles translated into area coordinates.
    pub fn positioned(&self) -> impl Iterator<Item = PackedBubble> + '_ {
        self.bubbles.iter().map(|b| PackedBubble {
            circle: Circle::new(
                b.circle.x + self.offset_x,
                b.circle.y + self.offset_y,
                b.circle.radius,
            ),
            ..*b
        })
    }
}

/// Pack `items` without overlap and scale them to fit a `width` x `height` area.
pub fn pack_bubbles(items: &[PackItem], width: f64, height: f64) -> PackingResult {
    if items.is_empty() {
        return PackingResult::default();
    }

    let mut sorted: Vec<PackItem> = items
        .iter()
        .map(|item| PackItem {
            // Zero radius would make the tangent solver degenerate
            radius: if item.radius > 0.0 && item.radius.is_finite() {
                item.radius
            } else {
                1.0
            },
            ..*item
        })
        .collect();
    sorted.sort_by(|a, b| b.radius.total_cmp(&a.radius));

    if let [only] = sorted.as_slice() {
        let bubbles = vec![PackedBubble::at(Circle::new(0.0, 0.0, only.radius), only)];
        let (offset_x, offset_y) = centering_offsets(&bubbles, width, height);
        return PackingResult {
            bubbles,
            offset_x,
            offset_y,
            stage_count: 1,
            repacks: 0,
        };
    }

    let mut repacks = 0;
    loop {
        let stages = place_stages(&sorted);
        let stage_count = stages.len();
        let bubbles: Vec<PackedBubble> = stages.into_iter().flatten().collect();

        match fit_scale(&bubbles, width, height) {
            Some(scale) if repacks < MAX_REPACKS => {
                // Placement order equals sorted order, so the radii map 1:1.
                for (item, bubble) in sorted.iter_mut().zip(&bubbles) {
                    item.radius = bubble.circle.radius * scale;
                }
                repacks += 1;
            }
            rest => {
                if rest.is_some() {
                    warn!("bubble packing did not settle after {MAX_REPACKS} repacks");
                }
                let (offset_x, offset_y) = centering_offsets(&bubbles, width, height);
                debug!(
                    "packed {} bubbles in {} stages ({} repacks)",
                    bubbles.len(),
                    stage_count,
                    repacks
                );
                return PackingResult {
                    bubbles,
                    offset_x,
                    offset_y,
                    stage_count,
                    repacks,
                };
            }
        }
    }
}

/// Grow stages of tangent circles. `sorted` must hold at least two items.
fn place_stages(sorted: &[PackItem]) -> Vec<Vec<PackedBubble>> {
    let first = &sorted[0];
    let second = &sorted[1];

    let mut stages = vec![
        vec![PackedBubble::at(Circle::new(0.0, 0.0, first.radius), first)],
        vec![PackedBubble::at(
            Circle::new(0.0, -first.radius - second.radius, second.radius),
            second,
        )],
    ];

    // Current stage, index of its last bubble, anchor index in the previous stage
    let mut stage = 1;
    let mut j = 0;
    let mut k = 0;

    for item in &sorted[2..] {
        let last = stages[stage][j].circle;
        let candidate = place_tangent(&last, &stages[stage - 1][k].circle, item.radius);

        if overlaps(&candidate, &stages[stage][0].circle) {
            // The ring is closed: start a new stage around the current one
            let reseeded = place_tangent(&last, &stages[stage][0].circle, item.radius);
            stages.push(vec![PackedBubble::at(reseeded, item)]);
            stage += 1;
            j = 0;
            k = 0;
        } else if stage > 1
            && stages[stage - 1]
                .get(k + 1)
                .is_some_and(|next| overlaps(&candidate, &next.circle))
        {
            k += 1;
            let placed = place_tangent(&last, &stages[stage - 1][k].circle, item.radius);
            stages[stage].push(PackedBubble::at(placed, item));
            j += 1;
        } else {
            stages[stage].push(PackedBubble::at(candidate, item));
            j += 1;
        }
    }

    stages
}

/// Uniform scale factor that fits the packing into the area, or None when
/// no rescale is needed (or possible).
fn fit_scale(bubbles: &[PackedBubble], width: f64, height: f64) -> Option<f64> {
    let bounds = Bounds::from_circles(bubbles.iter().map(|b| &b.circle))?;
    if !(width > 0.0 && height > 0.0) || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        warn!("cannot fit bubbles into a {width}x{height} area");
        return None;
    }

    let scale = (width / bounds.width()).min(height / bounds.height());
    ((scale - 1.0).abs() > SCALE_TOLERANCE).then_some(scale)
}

fn centering_offsets(bubbles: &[PackedBubble], width: f64, height: f64) -> (f64, f64) {
    match Bounds::from_circles(bubbles.iter().map(|b| &b.circle)) {
        Some(b) => (
            width / 2.0 - b.min_x - b.width() / 2.0,
            height / 2.0 - b.min_y - b.height() / 2.0,
        ),
        None => (0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::OVERLAP_EPSILON;
    use approx::assert_abs_diff_eq;

    fn items(radii: &[f64]) -> Vec<PackItem> {
        radii
            .iter()
            .enumerate()
            .map(|(i, &r)| PackItem::new(r, 0, i))
            .collect()
    }

    /// Deterministic pseudo-random radii in [2, 30).
    fn lcg_radii(count: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..count)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                2.0 + ((state >> 33) as f64 / (1u64 << 31) as f64) * 28.0
            })
            .collect()
    }

    fn assert_no_overlap(bubbles: &[PackedBubble]) {
        for (i, a) in bubbles.iter().enumerate() {
            for b in &bubbles[i + 1..] {
                assert!(
                    a.circle.gap(&b.circle) >= -OVERLAP_EPSILON,
                    "overlap between {:?} and {:?}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_empty() {
        let result = pack_bubbles(&[], 400.0, 300.0);
        assert!(result.bubbles.is_empty());
        assert_eq!(result.stage_count, 0);
    }

    #[test]
    fn test_single_bubble_at_origin() {
        let result = pack_bubbles(&[PackItem::new(12.0, 1, 4)], 400.0, 300.0);
        assert_eq!(result.bubbles.len(), 1);
        let b = result.bubbles[0];
        assert_eq!(b.circle, Circle::new(0.0, 0.0, 12.0));
        assert_eq!((b.series_index, b.point_index), (1, 4));
        assert_eq!(result.repacks, 0);
        // Centered in the area
        assert_eq!((result.offset_x, result.offset_y), (200.0, 150.0));
    }

    #[test]
    fn test_two_bubbles_stacked() {
        let result = pack_bubbles(&items(&[5.0, 9.0]), 400.0, 300.0);
        let [a, b] = result.bubbles.as_slice() else {
            panic!("expected two bubbles");
        };
        // Largest first
        assert_eq!(a.point_index, 1);
        assert_eq!(b.point_index, 0);
        assert_eq!(a.circle.x, b.circle.x);
        assert!(b.circle.y < a.circle.y);
        assert_abs_diff_eq!(
            a.circle.y - b.circle.y,
            a.circle.radius + b.circle.radius,
            epsilon = 1e-9
        );
        // Rescaled so the pair spans the full height
        assert_abs_diff_eq!(2.0 * (a.circle.radius + b.circle.radius), 300.0, epsilon = 1e-6);
    }

    #[test]
    fn test_three_bubbles_triangle() {
        let stages = place_stages(&items(&[10.0, 8.0, 6.0]));
        let bubbles: Vec<PackedBubble> = stages.into_iter().flatten().collect();
        let d = |i: usize, j: usize| bubbles[i].circle.center_distance(&bubbles[j].circle);

        assert_abs_diff_eq!(d(0, 1), 18.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d(0, 2), 16.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d(1, 2), 14.0, epsilon = 1e-9);
    }

    #[test]
    fn test_three_bubbles_rescaled_triangle() {
        let result = pack_bubbles(&items(&[10.0, 8.0, 6.0]), 200.0, 200.0);
        let b = &result.bubbles;
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            assert_abs_diff_eq!(
                b[i].circle.center_distance(&b[j].circle),
                b[i].circle.radius + b[j].circle.radius,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_no_overlap_many_bubbles() {
        for (count, seed) in [(5, 1), (12, 7), (30, 42), (80, 2024)] {
            let result = pack_bubbles(&items(&lcg_radii(count, seed)), 400.0, 300.0);
            assert_eq!(result.bubbles.len(), count);
            assert_no_overlap(&result.bubbles);
            assert!(result.stage_count >= 2);
        }
    }

    #[test]
    fn test_deterministic() {
        let input = items(&lcg_radii(40, 99));
        let a = pack_bubbles(&input, 640.0, 480.0);
        let b = pack_bubbles(&input, 640.0, 480.0);
        assert_eq!(a.bubbles, b.bubbles);
        assert_eq!(a.offset_x, b.offset_x);
        assert_eq!(a.offset_y, b.offset_y);
    }

    #[test]
    fn test_equal_radii_keep_input_order() {
        let result = pack_bubbles(&items(&[5.0; 6]), 300.0, 300.0);
        let order: Vec<usize> = result.bubbles.iter().map(|b| b.point_index).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_fits_and_centers_in_area() {
        let (width, height) = (500.0, 300.0);
        let result = pack_bubbles(&items(&lcg_radii(25, 5)), width, height);
        let placed: Vec<Circle> = result.positioned().map(|b| b.circle).collect();
        let bounds = Bounds::from_circles(&placed).unwrap();

        assert!(bounds.min_x >= -1e-6 && bounds.max_x <= width + 1e-6);
        assert!(bounds.min_y >= -1e-6 && bounds.max_y <= height + 1e-6);
        // One dimension is filled completely
        let filled_w = (bounds.width() - width).abs() < 1e-6;
        let filled_h = (bounds.height() - height).abs() < 1e-6;
        assert!(filled_w || filled_h);
        // Centered
        assert_abs_diff_eq!(bounds.min_x + bounds.max_x, width, epsilon = 1e-6);
        assert_abs_diff_eq!(bounds.min_y + bounds.max_y, height, epsilon = 1e-6);
    }

    #[test]
    fn test_rescale_idempotent() {
        let first = pack_bubbles(&items(&lcg_radii(20, 11)), 400.0, 300.0);
        assert!(first.repacks >= 1);

        let again: Vec<PackItem> = first
            .bubbles
            .iter()
            .map(|b| PackItem::new(b.circle.radius, b.series_index, b.point_index))
            .collect();
        let second = pack_bubbles(&again, 400.0, 300.0);

        assert_eq!(second.repacks, 0);
        for (a, b) in first.bubbles.iter().zip(&second.bubbles) {
            assert_abs_diff_eq!(a.circle.radius, b.circle.radius, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_radius_treated_as_unit() {
        let result = pack_bubbles(&items(&[10.0, 0.0, 6.0, 0.0]), 400.0, 300.0);
        assert_eq!(result.bubbles.len(), 4);
        assert_no_overlap(&result.bubbles);
        assert!(result.bubbles.iter().all(|b| b.circle.radius > 0.0));
    }

    #[test]
    fn test_degenerate_area() {
        let result = pack_bubbles(&items(&[10.0, 8.0, 6.0]), 0.0, 300.0);
        assert_eq!(result.repacks, 0);
        assert!(result.bubbles.iter().all(|b| b.circle.x.is_finite() && b.circle.y.is_finite()));
        assert_eq!(result.bubbles[0].circle.radius, 10.0);
    }
}
