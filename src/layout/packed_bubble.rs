//! Packed-bubble force model.
//!
//! Bubbles are pulled toward a gravitational center and pushed apart only
//! while they are closer than `bubble_padding`. With split series every
//! bubble gravitates to its series' parent node instead of the area center,
//! and may optionally be kept inside it.

use super::force::{ForceEnv, ForceModel};
use super::node::LayoutNode;

/// Fraction of the escape vector applied per step by parent containment.
const CONTAINMENT_RATE: f64 = 0.01;

/// Force model for packed bubbles and their parent nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedBubbleForces;

impl PackedBubbleForces {
    fn is_split(node: &LayoutNode, env: &ForceEnv<'_>) -> bool {
        env.options.split_series && !node.is_parent
    }
}

impl ForceModel for PackedBubbleForces {
    fn gravity_center(&self, node: &LayoutNode, env: &ForceEnv<'_>) -> (f64, f64) {
        if Self::is_split(node, env) {
            if let Some(anchor) = env.anchors.get(&node.series) {
                return (anchor.x, anchor.y);
            }
        }
        env.area.center()
    }

    fn barycenter(&self, nodes: &mut [LayoutNode], env: &ForceEnv<'_>) {
        let gravity = env.options.gravitational_constant;
        let sqrt_count = (env.node_count as f64).sqrt();

        for node in nodes.iter_mut() {
            if node.fixed {
                continue;
            }
            let (cx, cy) = self.gravity_center(node, env);
            let pull = gravity / (node.mass * sqrt_count);
            node.x -= (node.x - cx) * pull;
            node.y -= (node.y - cy) * pull;
        }
    }

    /// Penetration depth, clamped to half the radius sum.
    fn repulsive_force(&self, distance: f64, node: &LayoutNode, other: &LayoutNode) -> f64 {
        distance.min((node.radius + other.radius) / 2.0)
    }

    fn repulse(
        &self,
        node: &mut LayoutNode,
        other: &mut LayoutNode,
        force: f64,
        delta: (f64, f64),
        env: &ForceEnv<'_>,
    ) {
        let factor = force * env.diff_temperature / node.mass / node.degree;
        let x = delta.0 * factor;
        let y = delta.1 * factor;

        if !node.fixed {
            node.x += x;
            node.y += y;
        }
        if !other.fixed {
            other.x -= x;
            other.y -= y;
        }
    }

    fn contain(&self, node: &mut LayoutNode, env: &ForceEnv<'_>) {
        if !env.options.parent_node_limit || !Self::is_split(node, env) {
            return;
        }
        let Some(parent) = env.anchors.get(&node.series) else {
            return;
        };

        let dx = node.x - parent.x;
        let dy = node.y - parent.y;
        let distance_r = parent.radius - node.radius - dx.hypot(dy);

        if distance_r < 0.0 && distance_r > -2.0 * node.radius {
            node.x -= dx * CONTAINMENT_RATE;
            node.y -= dy * CONTAINMENT_RATE;
        }
    }
}
