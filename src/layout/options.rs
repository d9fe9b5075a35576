//! Force layout configuration.

use serde::Deserialize;

/// Custom initial placement: `(index, node_count, center, radius) -> (x, y)`.
pub type PlacementFn = fn(usize, usize, (f64, f64), f64) -> (f64, f64);

/// How nodes without a position are seeded when a simulation starts.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialPositions {
    /// Evenly spaced on a circle of `initial_position_radius` around the
    /// node's gravitational center.
    #[default]
    Circle,
    /// Host supplied placement.
    #[serde(skip)]
    Custom(PlacementFn),
}

/// Overrides applied to [`LayoutOptions`] for the parent-node layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentNodeOptions {
    pub enable_simulation: bool,
    pub max_iterations: u32,
    pub gravitational_constant: f64,
    pub max_speed: f64,
    pub initial_position_radius: f64,
    pub series_interaction: bool,
}

impl Default for ParentNodeOptions {
    fn default() -> Self {
        Self {
            enable_simulation: true,
            max_iterations: 400,
            gravitational_constant: 0.03,
            max_speed: 50.0,
            initial_position_radius: 100.0,
            series_interaction: true,
        }
    }
}

/// Configuration of a packed-bubble force layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Seeding strategy for unplaced nodes (default: circle).
    pub initial_positions: InitialPositions,
    /// Radius of the seeding circle (default: 20).
    pub initial_position_radius: f64,
    /// Desired spacing between bubble rims (default: 5).
    pub bubble_padding: f64,
    /// Softly keep bubbles inside their series' parent node (default: false).
    pub parent_node_limit: bool,
    /// Let bubbles of different series repel each other (default: true).
    pub series_interaction: bool,
    /// Allow dropping a bubble into another series' parent node (default: false).
    pub drag_between_series: bool,
    /// Animate across ticks instead of settling synchronously (default: true).
    pub enable_simulation: bool,
    /// Iteration budget of one run (default: 1000).
    pub max_iterations: u32,
    /// Group each series around its own parent node (default: false).
    pub split_series: bool,
    /// Per-axis displacement cap of one integration step (default: 5).
    pub max_speed: f64,
    /// Strength of the pull toward the gravitational center (default: 0.01).
    pub gravitational_constant: f64,
    /// Verlet friction; the carried-over velocity is scaled by `-friction` (default: -0.981).
    pub friction: f64,
    /// Overrides for the parent-node layout.
    pub parent_node_options: ParentNodeOptions,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            initial_positions: InitialPositions::Circle,
            initial_position_radius: 20.0,
            bubble_padding: 5.0,
            parent_node_limit: false,
            series_interaction: true,
            drag_between_series: false,
            enable_simulation: true,
            max_iterations: 1000,
            split_series: false,
            max_speed: 5.0,
            gravitational_constant: 0.01,
            friction: -0.981,
            parent_node_options: ParentNodeOptions::default(),
        }
    }
}

impl LayoutOptions {
    /// Options for the layout that positions parent nodes.
    pub fn parent_layout_options(&self) -> LayoutOptions {
        let overrides = &self.parent_node_options;
        LayoutOptions {
            enable_simulation: overrides.enable_simulation,
            max_iterations: overrides.max_iterations,
            gravitational_constant: overrides.gravitational_constant,
            max_speed: overrides.max_speed,
            initial_position_radius: overrides.initial_position_radius,
            series_interaction: overrides.series_interaction,
            ..self.clone()
        }
    }
}
