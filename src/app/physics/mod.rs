mod quadtree;

use eframe::egui::Vec2;

use super::{EdgeKind, PhysicsConfig, RenderGraph};
use quadtree::{QuadNode, Repulsion};

const BARNES_HUT_THETA: f32 = 0.72;
const LINK_DISTANCE: f32 = 96.0;
const SATELLITE_DISTANCE: f32 = 28.0;

fn time_step_scale(config: PhysicsConfig) -> f32 {
    (config.delta_seconds * 60.0).clamp(0.25, 3.0)
}

/// Turns this tick's forces into velocities. Positions only move in
/// [`integrate`], so velocity clamps applied in between bound the step.
pub(super) fn apply_forces(graph: &mut RenderGraph, config: PhysicsConfig) {
    let node_count = graph.nodes.len();
    if node_count < 2 {
        return;
    }

    let scratch = &mut graph.physics_scratch;
    scratch.forces.clear();
    scratch.forces.resize(node_count, Vec2::ZERO);
    scratch.positions.clear();
    scratch
        .positions
        .extend(graph.nodes.iter().map(|node| node.world_pos));

    let intensity = config.intensity.clamp(0.2, 2.5);
    let repulsion = Repulsion {
        strength: 78_000.0 * intensity * config.repulsion_scale.clamp(0.25, 2.6),
        softening: 620.0,
        theta: BARNES_HUT_THETA,
    };
    let spring_strength = 0.016 * intensity * config.spring_scale.clamp(0.2, 2.2);
    let spring_damping = 0.22;
    let cohesion = 0.0024 * intensity * config.cohesion_scale.clamp(0.0, 3.0);
    let center_pull = 0.0011 * intensity;
    let damping = (config.velocity_damping - intensity * 0.015).clamp(0.78, 0.97);
    let time_scale = time_step_scale(config);
    let damping_factor = damping.powf(time_scale);

    let forces = &mut scratch.forces;
    let positions = &scratch.positions;

    if let Some(tree) = QuadNode::build(positions) {
        for (index, force) in forces.iter_mut().enumerate() {
            if is_finite(positions[index]) {
                *force += tree.repulsion_on(index, positions, repulsion);
            }
        }
    }

    for edge in &graph.edges {
        let (Some(from), Some(to)) = (graph.nodes.get(edge.from), graph.nodes.get(edge.to)) else {
            continue;
        };
        let delta = from.world_pos - to.world_pos;
        let distance = delta.length();
        if edge.from == edge.to || !distance.is_finite() || distance <= 1.0e-4 {
            continue;
        }

        let direction = delta / distance;
        let (preferred, strength) = match edge.kind {
            EdgeKind::Link => (
                LINK_DISTANCE + (from.base_radius + to.base_radius) * 3.0,
                spring_strength,
            ),
            EdgeKind::Satellite => (SATELLITE_DISTANCE + from.base_radius, spring_strength * 2.5),
        };
        let stretch = (distance - preferred) * strength;
        let damping_force = (from.velocity - to.velocity).dot(direction) * spring_damping;
        let correction = direction * (stretch + damping_force);

        forces[edge.from] -= correction;
        forces[edge.to] += correction;
    }

    if cohesion > 0.0 {
        let centers = &mut scratch.topic_centers;
        let counts = &mut scratch.topic_counts;
        centers.clear();
        counts.clear();
        for node in &graph.nodes {
            let Some(topic) = node.topic.filter(|_| is_finite(node.world_pos)) else {
                continue;
            };
            if topic >= centers.len() {
                centers.resize(topic + 1, Vec2::ZERO);
                counts.resize(topic + 1, 0);
            }
            centers[topic] += node.world_pos;
            counts[topic] += 1;
        }

        for (node, force) in graph.nodes.iter().zip(forces.iter_mut()) {
            let Some(topic) = node.topic else {
                continue;
            };
            let count = counts.get(topic).copied().unwrap_or(0);
            if count < 2 || !is_finite(node.world_pos) {
                continue;
            }
            let center = centers[topic] / count as f32;
            *force += (center - node.world_pos) * cohesion;
        }
    }

    let max_force = 165.0 + intensity * 90.0;
    let min_sleep_speed_sq = 0.02 * 0.02;
    let min_sleep_force_sq = 0.08 * 0.08;
    for (node, force) in graph.nodes.iter_mut().zip(forces.iter()) {
        if !is_finite(node.world_pos) {
            node.velocity = Vec2::ZERO;
            continue;
        }

        let mut force = *force - node.world_pos * center_pull;
        let force_sq = force.length_sq();
        if !force_sq.is_finite() {
            continue;
        }
        if force_sq > max_force * max_force {
            force *= max_force / force_sq.sqrt();
        }

        let mut velocity = (node.velocity + force * (0.055 * time_scale)) * damping_factor;
        if velocity.length_sq() < min_sleep_speed_sq && force_sq < min_sleep_force_sq {
            velocity = Vec2::ZERO;
        }
        node.velocity = velocity;
    }
}

/// Moves nodes along their velocities and keeps the layout centred.
/// Returns true while anything still moves.
pub(super) fn integrate(graph: &mut RenderGraph, config: PhysicsConfig) -> bool {
    let node_count = graph.nodes.len();
    if node_count < 2 {
        return false;
    }

    let time_scale = time_step_scale(config);
    let mut any_motion = false;
    let mut average_velocity = Vec2::ZERO;
    for node in &mut graph.nodes {
        if !is_finite(node.world_pos) || !is_finite(node.velocity) {
            node.velocity = Vec2::ZERO;
            continue;
        }
        node.world_pos += node.velocity * time_scale;
        average_velocity += node.velocity;
        any_motion |= node.velocity.length_sq() > 1.0e-6;
    }

    let (position_sum, finite_count) = graph
        .nodes
        .iter()
        .map(|node| node.world_pos)
        .filter(|position| is_finite(*position))
        .fold((Vec2::ZERO, 0usize), |(sum, count), position| (sum + position, count + 1));
    if finite_count == 0 {
        return false;
    }
    average_velocity /= finite_count as f32;
    let centroid = position_sum / finite_count as f32;
    for node in &mut graph.nodes {
        if average_velocity.length_sq() > 1.0e-6 {
            node.velocity -= average_velocity;
        }
        if centroid.length_sq() > 1.0e-6 {
            node.world_pos -= centroid;
        }
    }

    any_motion
}

fn is_finite(value: Vec2) -> bool {
    value.x.is_finite() && value.y.is_finite()
}
