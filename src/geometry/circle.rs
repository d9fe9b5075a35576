//! Circle primitives.

use std::f64::consts::PI;

/// Tolerance below which two circles are not considered overlapping.
pub const OVERLAP_EPSILON: f64 = 1e-3;

/// A positioned circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center X.
    pub x: f64,
    /// Center Y.
    pub y: f64,
    /// Radius (non-negative).
    pub radius: f64,
}

impl Circle {
    /// Create a new circle.
    #[inline]
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    /// Distance between the two centers.
    #[inline]
    pub fn center_distance(&self, other: &Circle) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Signed gap between the two rims (negative when overlapping).
    #[inline]
    pub fn gap(&self, other: &Circle) -> f64 {
        self.center_distance(other) - (self.radius + other.radius)
    }

    /// Whether a point lies inside or on the circle.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x - x).hypot(self.y - y) <= self.radius
    }

    /// Area of the circle.
    #[inline]
    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }
}

/// True iff the circles overlap by more than [`OVERLAP_EPSILON`].
pub fn overlaps(a: &Circle, b: &Circle) -> bool {
    a.center_distance(b) - (a.radius + b.radius).abs() < -OVERLAP_EPSILON
}

/// Place a circle of `radius` tangent to `origin`, on the side that also
/// touches `prev` when the three radii allow it.
///
/// The angle between `prev` and the new center, seen from `origin`, comes
/// from the law of cosines. `asin` only yields the angle of `prev` within a
/// quadrant, so the quadrant itself is recovered from the signs of the
/// offsets: `gamma` picks the upper or lower half-plane and `delta` the
/// rotation direction.
pub fn place_tangent(prev: &Circle, origin: &Circle, radius: f64) -> Circle {
    let dx = prev.x - origin.x;
    let dy = prev.y - origin.y;
    let distance = dx.hypot(dy);
    let reach = origin.radius + radius;

    if distance <= f64::EPSILON {
        return Circle::new(origin.x, origin.y - reach, radius);
    }

    let cos_alpha = (distance * distance + reach * reach - (radius + prev.radius).powi(2))
        / (2.0 * reach * distance);
    let alpha = cos_alpha.clamp(-1.0, 1.0).acos();
    let beta = (dx.abs() / distance).clamp(0.0, 1.0).asin();

    let gamma = if dy < 0.0 { 0.0 } else { PI };
    let delta = if (dx < 0.0) == (dy >= 0.0) { 1.0 } else { -1.0 };

    let angle = gamma + alpha + beta * delta;

    Circle::new(
        origin.x + reach * angle.sin(),
        origin.y - reach * angle.cos(),
        radius,
    )
}

/// Axis-aligned bounding box over circle extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Bounding box of all circles, including their radii.
    ///
    /// Returns None for an empty input.
    pub fn from_circles<'a>(circles: impl IntoIterator<Item = &'a Circle>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for c in circles {
            let b = bounds.get_or_insert(Bounds {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            });
            b.min_x = b.min_x.min(c.x - c.radius);
            b.max_x = b.max_x.max(c.x + c.radius);
            b.min_y = b.min_y.min(c.y - c.radius);
            b.max_y = b.max_y.max(c.y + c.radius);
        }
        bounds
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Length of the diagonal.
    #[inline]
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_overlaps_tolerance() {
        let a = Circle::new(0.0, 0.0, 10.0);

        // Exactly tangent
        assert!(!overlaps(&a, &Circle::new(15.0, 0.0, 5.0)));
        // Within tolerance
        assert!(!overlaps(&a, &Circle::new(14.9995, 0.0, 5.0)));
        // Beyond tolerance
        assert!(overlaps(&a, &Circle::new(14.99, 0.0, 5.0)));
        // Apart
        assert!(!overlaps(&a, &Circle::new(40.0, 0.0, 5.0)));
    }

    #[test]
    fn test_place_tangent_first_triangle() {
        // Second bubble sits above the first, the third goes to the right.
        let origin = Circle::new(0.0, 0.0, 10.0);
        let prev = Circle::new(0.0, -18.0, 8.0);
        let placed = place_tangent(&prev, &origin, 6.0);

        assert_abs_diff_eq!(placed.center_distance(&origin), 16.0, epsilon = 1e-9);
        assert_abs_diff_eq!(placed.center_distance(&prev), 14.0, epsilon = 1e-9);
        assert!(placed.x > 0.0);
        assert_eq!(placed.radius, 6.0);
    }

    #[test]
    fn test_place_tangent_all_quadrants() {
        let origin = Circle::new(3.0, -2.0, 10.0);
        let directions: [(f64, f64); 8] = [
            (0.0, -1.0),
            (1.0, -0.6),
            (1.0, 0.6),
            (-1.0, 0.6),
            (-1.0, -0.6),
            (0.0, 1.0),
            (1.0, 0.0),
            (-1.0, 0.0),
        ];

        for (ux, uy) in directions {
            let len = ux.hypot(uy);
            let prev = Circle::new(
                origin.x + ux / len * 18.0,
                origin.y + uy / len * 18.0,
                8.0,
            );
            let placed = place_tangent(&prev, &origin, 6.0);

            assert_abs_diff_eq!(placed.center_distance(&origin), 16.0, epsilon = 1e-9);
            assert_abs_diff_eq!(placed.center_distance(&prev), 14.0, epsilon = 1e-9);
            assert!(!overlaps(&placed, &origin));
            assert!(!overlaps(&placed, &prev));
        }
    }

    #[test]
    fn test_place_tangent_coincident_anchors() {
        let origin = Circle::new(0.0, 0.0, 4.0);
        let placed = place_tangent(&origin, &origin, 2.0);
        assert!(placed.x.is_finite() && placed.y.is_finite());
        assert_abs_diff_eq!(placed.center_distance(&origin), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounds() {
        assert!(Bounds::from_circles(&[] as &[Circle]).is_none());

        let circles = [Circle::new(0.0, 0.0, 10.0), Circle::new(30.0, 5.0, 5.0)];
        let b = Bounds::from_circles(&circles).unwrap();
        assert_eq!(b.min_x, -10.0);
        assert_eq!(b.max_x, 35.0);
        assert_eq!(b.min_y, -10.0);
        assert_eq!(b.max_y, 10.0);
        assert_eq!(b.width(), 45.0);
        assert_eq!(b.height(), 20.0);
    }
}
