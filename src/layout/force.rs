//! Iterative force-directed layout engine.
//!
//! The engine owns the node set, the layout area and the cooling state; the
//! forces themselves come from a [`ForceModel`]. One call to [`ForceLayout::step`]
//! is one full iteration:
//!
//! 1. Barycenter force (model)
//! 2. Pairwise repulsion: the engine walks all ordered pairs, the model turns
//!    penetration into displacement
//! 3. Verlet integration, containment (model) and the area limit
//! 4. Linear cooling and system temperature update
//!
//! The engine never schedules itself. The host drives it by calling
//! [`ForceLayout::run`] once per animation tick until it reports
//! [`SimulationState::Stable`].

use std::collections::HashMap;

use log::debug;

use super::node::{Anchor, LayoutNode, NodeKey, SeriesId};
use super::options::{InitialPositions, LayoutOptions};

/// Absolute change of system temperature below which the layout is stable.
const STABLE_TEMPERATURE_DELTA: f64 = 1e-5;
/// Average per-node temperature below which the layout is stable.
const STABLE_NODE_TEMPERATURE: f64 = 0.01;
/// Degree added per overlapping neighbour during a repulsion pass.
const DEGREE_PER_NEIGHBOUR: f64 = 0.01;

/// Rectangle the layout operates in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutArea {
    /// Center of the area.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// Lifecycle of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationState {
    #[default]
    NotStarted,
    Running,
    Stable,
}

/// Read-only context handed to a [`ForceModel`].
pub struct ForceEnv<'a> {
    pub options: &'a LayoutOptions,
    pub area: &'a LayoutArea,
    /// Parent anchors per series (split series only).
    pub anchors: &'a HashMap<SeriesId, Anchor>,
    /// Cooling step; scales repulsion.
    pub diff_temperature: f64,
    pub node_count: usize,
}

/// Force policy plugged into [`ForceLayout`].
pub trait ForceModel {
    /// Point a node is pulled toward and seeded around.
    fn gravity_center(&self, node: &LayoutNode, env: &ForceEnv<'_>) -> (f64, f64);

    /// Pull every non-fixed node toward its gravity center.
    fn barycenter(&self, nodes: &mut [LayoutNode], env: &ForceEnv<'_>);

    /// Repulsion magnitude for a penetration `distance` between two nodes.
    fn repulsive_force(&self, distance: f64, node: &LayoutNode, other: &LayoutNode) -> f64;

    /// Apply a repulsion of `force` along `(dx, dy)` to both nodes.
    fn repulse(
        &self,
        node: &mut LayoutNode,
        other: &mut LayoutNode,
        force: f64,
        delta: (f64, f64),
        env: &ForceEnv<'_>,
    );

    /// Keep a node inside whatever container the model defines.
    fn contain(&self, node: &mut LayoutNode, env: &ForceEnv<'_>);
}

/// Mutable borrows of two distinct nodes.
fn pair_mut(nodes: &mut [LayoutNode], i: usize, j: usize) -> (&mut LayoutNode, &mut LayoutNode) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = nodes.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = nodes.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

/// A stateful force simulation over a set of circles.
pub struct ForceLayout<M> {
    model: M,
    options: LayoutOptions,
    nodes: Vec<LayoutNode>,
    area: LayoutArea,
    anchors: HashMap<SeriesId, Anchor>,
    state: SimulationState,
    initial_rendering: bool,
    /// One-shot iteration budget for the next reset.
    pending_max_iterations: Option<u32>,
    /// Iterations left in the current run.
    max_iterations: u32,
    current_step: u32,
    start_temperature: f64,
    temperature: f64,
    diff_temperature: f64,
    system_temperature: f64,
    prev_system_temperature: f64,
}

impl<M: ForceModel> ForceLayout<M> {
    /// Create an empty layout.
    pub fn new(model: M, options: LayoutOptions) -> Self {
        let max_iterations = options.max_iterations;
        Self {
            model,
            options,
            nodes: Vec::new(),
            area: LayoutArea::default(),
            anchors: HashMap::new(),
            state: SimulationState::NotStarted,
            initial_rendering: true,
            pending_max_iterations: None,
            max_iterations,
            current_step: 0,
            start_temperature: 0.0,
            temperature: 0.0,
            diff_temperature: 0.0,
            system_temperature: 0.0,
            prev_system_temperature: 0.0,
        }
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Add nodes, skipping keys that are already present.
    ///
    /// Returns the number of nodes added.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = LayoutNode>) -> usize {
        let mut added = 0;
        for node in nodes {
            if self.index_of(node.key).is_none() {
                self.nodes.push(node);
                added += 1;
            }
        }
        added
    }

    /// Remove a node.
    ///
    /// Returns the node if it was present.
    pub fn remove_node(&mut self, key: NodeKey) -> Option<LayoutNode> {
        let index = self.index_of(key)?;
        Some(self.nodes.remove(index))
    }

    /// Remove every node of a series, including its parent node.
    pub fn remove_series(&mut self, series: SeriesId) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.series != series);
        self.anchors.remove(&series);
        before - self.nodes.len()
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn node(&self, key: NodeKey) -> Option<&LayoutNode> {
        self.index_of(key).map(|i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut LayoutNode> {
        self.index_of(key).map(move |i| &mut self.nodes[i])
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.index_of(key).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn index_of(&self, key: NodeKey) -> Option<usize> {
        self.nodes.iter().position(|n| n.key == key)
    }

    /// Pin a node at a position; forces no longer move it.
    pub fn pin(&mut self, key: NodeKey, x: f64, y: f64) -> bool {
        match self.node_mut(key) {
            Some(node) => {
                node.fixed = true;
                node.x = x;
                node.y = y;
                node.placed = true;
                true
            }
            None => false,
        }
    }

    /// Release a pinned node.
    pub fn unpin(&mut self, key: NodeKey) -> bool {
        match self.node_mut(key) {
            Some(node) => {
                node.fixed = false;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn area(&self) -> &LayoutArea {
        &self.area
    }

    pub fn set_area(&mut self, left: f64, top: f64, width: f64, height: f64) {
        self.area = LayoutArea {
            left,
            top,
            width,
            height,
        };
    }

    /// Set the containment anchor of a series.
    pub fn set_anchor(&mut self, series: SeriesId, anchor: Anchor) {
        self.anchors.insert(series, anchor);
    }

    /// Override the iteration budget of the next run, or restore the
    /// configured budget with `None`.
    pub fn set_max_iterations(&mut self, max_iterations: Option<u32>) {
        self.pending_max_iterations = max_iterations;
        self.max_iterations = max_iterations.unwrap_or(self.options.max_iterations);
    }

    /// Whether [`start`](Self::start) reseeds node positions.
    pub fn set_initial_rendering(&mut self, enable: bool) {
        self.initial_rendering = enable;
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SimulationState::Running
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn system_temperature(&self) -> f64 {
        self.system_temperature
    }

    /// Steps left in the current run.
    pub fn remaining_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Begin a new run: seed positions and reset cooling.
    pub fn start(&mut self) {
        self.current_step = 0;
        if self.initial_rendering {
            self.init_positions();
        } else {
            self.place_unplaced();
        }
        self.reset_simulation();
        self.state = SimulationState::Running;
        debug!(
            "force layout started: {} nodes, {} iterations",
            self.nodes.len(),
            self.max_iterations
        );
    }

    /// Restart cooling and the iteration budget without touching positions.
    pub fn reset_simulation(&mut self) {
        self.system_temperature = 0.0;
        self.prev_system_temperature = 0.0;
        self.max_iterations = self
            .pending_max_iterations
            .take()
            .unwrap_or(self.options.max_iterations);
        self.start_temperature = (self.nodes.len() as f64).sqrt();
        self.temperature = self.start_temperature;
        // Cooling rate follows the configured budget, not a one-shot override.
        self.diff_temperature = self.start_temperature / (self.options.max_iterations as f64 + 1.0);
    }

    /// Advance one animation tick, starting a run first if none is active.
    pub fn run(&mut self) -> SimulationState {
        if self.state != SimulationState::Running {
            self.start();
        }

        if self.nodes.is_empty() || self.max_iterations == 0 {
            self.state = SimulationState::Stable;
            return self.state;
        }

        self.step();
        self.max_iterations -= 1;

        if self.max_iterations == 0 || !self.temperature.is_finite() || self.is_stable() {
            self.state = SimulationState::Stable;
            debug!("force layout stable after {} steps", self.current_step);
        }
        self.state
    }

    /// Run to completion synchronously. Returns the number of steps taken.
    pub fn settle(&mut self) -> u32 {
        self.start();
        while self.run() == SimulationState::Running {}
        self.current_step
    }

    /// One full iteration.
    pub fn step(&mut self) {
        self.current_step += 1;

        let env = ForceEnv {
            options: &self.options,
            area: &self.area,
            anchors: &self.anchors,
            diff_temperature: self.diff_temperature,
            node_count: self.nodes.len(),
        };

        self.model.barycenter(&mut self.nodes, &env);
        Self::repulsive_forces(&self.model, &mut self.nodes, &env);
        Self::apply_limits(&self.model, &mut self.nodes, &env);

        self.temperature = self.cool_down();
        self.prev_system_temperature = self.system_temperature;
        self.system_temperature = self.nodes.iter().map(|n| n.temperature).sum();
    }

    /// Compound convergence test; only meaningful after a step.
    pub fn is_stable(&self) -> bool {
        (self.system_temperature - self.prev_system_temperature).abs() < STABLE_TEMPERATURE_DELTA
            || self.temperature <= 0.0
            || self.system_temperature / (self.nodes.len() as f64) < STABLE_NODE_TEMPERATURE
    }

    fn cool_down(&self) -> f64 {
        self.start_temperature - self.diff_temperature * self.current_step as f64
    }

    fn repulsive_forces(model: &M, nodes: &mut [LayoutNode], env: &ForceEnv<'_>) {
        let padding = env.options.bubble_padding;
        let count = nodes.len();

        for i in 0..count {
            nodes[i].degree = nodes[i].mass;
            nodes[i].neighbours = 0;

            for j in 0..count {
                if i == j {
                    continue;
                }
                let (node, other) = pair_mut(nodes, i, j);
                if node.fixed || !(env.options.series_interaction || node.series == other.series) {
                    continue;
                }

                let delta = node.distance_xy(other);
                let distance_r =
                    delta.0.hypot(delta.1) - (node.radius + other.radius + padding);

                let mut force = 0.0;
                if distance_r < 0.0 {
                    node.degree += DEGREE_PER_NEIGHBOUR;
                    node.neighbours += 1;
                    force = model.repulsive_force(
                        -distance_r / (node.neighbours as f64).sqrt(),
                        node,
                        other,
                    );
                }

                let other_mass = other.mass;
                model.repulse(node, other, force * other_mass, delta, env);
            }
        }
    }

    fn apply_limits(model: &M, nodes: &mut [LayoutNode], env: &ForceEnv<'_>) {
        for node in nodes.iter_mut().filter(|n| !n.fixed) {
            integrate_verlet(node, env.options);
            model.contain(node, env);
            limit_to_area(node, env.area);
        }
    }

    fn init_positions(&mut self) {
        let env = ForceEnv {
            options: &self.options,
            area: &self.area,
            anchors: &self.anchors,
            diff_temperature: self.diff_temperature,
            node_count: self.nodes.len(),
        };
        let count = self.nodes.len();
        let radius = self.options.initial_position_radius;
        let angle = 2.0 * std::f64::consts::PI / (count + 1) as f64;

        for index in 0..count {
            let center = self.model.gravity_center(&self.nodes[index], &env);
            let node = &mut self.nodes[index];
            if !node.placed {
                let (x, y) = match self.options.initial_positions {
                    InitialPositions::Circle => {
                        let a = index as f64 * angle;
                        (center.0 + radius * a.cos(), center.1 + radius * a.sin())
                    }
                    InitialPositions::Custom(place) => place(index, count, center, radius),
                };
                node.x = x;
                node.y = y;
                node.placed = true;
            }
            node.prev_x = node.x;
            node.prev_y = node.y;
        }
    }

    /// Seed only nodes that have no position, leaving the rest in motion.
    fn place_unplaced(&mut self) {
        if self.nodes.iter().any(|n| !n.placed) {
            let placed: Vec<bool> = self.nodes.iter().map(|n| n.placed).collect();
            let previous: Vec<(f64, f64)> =
                self.nodes.iter().map(|n| (n.prev_x, n.prev_y)).collect();
            self.init_positions();
            for ((node, was_placed), prev) in self.nodes.iter_mut().zip(placed).zip(previous) {
                if was_placed {
                    node.prev_x = prev.0;
                    node.prev_y = prev.1;
                }
            }
        }
    }
}

/// Position update from current and previous position only.
///
/// The carried-over displacement is damped by friction and capped per axis
/// by `max_speed`; its length becomes the node temperature.
pub fn integrate_verlet(node: &mut LayoutNode, options: &LayoutOptions) {
    let friction = -options.friction;
    let max_speed = options.max_speed;

    let mut diff_x = (node.x - node.prev_x) * friction;
    let mut diff_y = (node.y - node.prev_y) * friction;
    diff_x = diff_x.signum() * diff_x.abs().min(max_speed);
    diff_y = diff_y.signum() * diff_y.abs().min(max_speed);

    node.prev_x = node.x;
    node.prev_y = node.y;
    node.x += diff_x;
    node.y += diff_y;
    node.temperature = diff_x.hypot(diff_y);
}

/// Clamp a node into the area, inset by its radius.
fn limit_to_area(node: &mut LayoutNode, area: &LayoutArea) {
    node.x = node.x.min(area.width - node.radius).max(area.left + node.radius);
    node.y = node.y.min(area.height - node.radius).max(area.top + node.radius);
}
