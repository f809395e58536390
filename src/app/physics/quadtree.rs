use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 12;
const MAX_DEPTH: usize = 10;

#[derive(Clone, Copy)]
struct Square {
    center: Vec2,
    half_extent: f32,
}

impl Square {
    fn around(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points.iter().filter(|point| point.x.is_finite() && point.y.is_finite()) {
            min = min.min(*point);
            max = max.max(*point);
        }
        if !min.x.is_finite() || !max.x.is_finite() {
            return None;
        }

        let span = (max - min).max(vec2(1.0, 1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span.max_elem() * 0.5 + 1.0,
        })
    }

    fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    fn quadrant(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = vec2(
            if quadrant & 1 == 0 { -quarter } else { quarter },
            if quadrant & 2 == 0 { -quarter } else { quarter },
        );
        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_of(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }
}

#[derive(Clone, Copy)]
pub(super) struct Repulsion {
    pub(super) strength: f32,
    pub(super) softening: f32,
    pub(super) theta: f32,
}

impl Repulsion {
    fn between(self, point: Vec2, source: Vec2, mass: f32, fallback: usize) -> Vec2 {
        let delta = point - source;
        let distance_sq = delta.length_sq();
        let direction = if distance_sq > 1.0e-8 {
            delta / distance_sq.sqrt()
        } else {
            let angle = (fallback as f32 * 0.618_034 + 0.37) * std::f32::consts::TAU;
            vec2(angle.cos(), angle.sin())
        };
        direction * (self.strength * mass / (distance_sq + self.softening))
    }
}

/// Barnes-Hut tree over node positions. Non-finite positions are left out.
pub(super) struct QuadNode {
    square: Square,
    center_of_mass: Vec2,
    mass: f32,
    indices: Vec<usize>,
    children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let square = Square::around(positions)?;
        let indices = positions
            .iter()
            .enumerate()
            .filter(|(_, point)| point.x.is_finite() && point.y.is_finite())
            .map(|(index, _)| index)
            .collect();
        Some(Self::build_node(square, indices, positions, 0))
    }

    fn build_node(square: Square, indices: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mass = indices.len() as f32;
        let center_of_mass = if mass > 0.0 {
            indices
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + positions[index])
                / mass
        } else {
            Vec2::ZERO
        };

        let mut node = Self {
            square,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };
        if depth >= MAX_DEPTH || node.indices.len() <= LEAF_CAPACITY {
            return node;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &node.indices {
            buckets[square.quadrant_of(positions[index])].push(index);
        }
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                node.children[quadrant] = Some(Box::new(Self::build_node(
                    square.quadrant(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        node.indices.clear();
        node
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Repulsion felt by `index` from every other node, approximating far
    /// cells by their center of mass.
    pub(super) fn repulsion_on(&self, index: usize, positions: &[Vec2], params: Repulsion) -> Vec2 {
        if self.mass <= 0.0 {
            return Vec2::ZERO;
        }

        let point = positions[index];
        if self.is_leaf() {
            return self
                .indices
                .iter()
                .filter(|&&other| other != index)
                .fold(Vec2::ZERO, |force, &other| {
                    force + params.between(point, positions[other], 1.0, index + other)
                });
        }

        let distance = (point - self.center_of_mass).length().max(0.01);
        let far = !self.square.contains(point)
            && self.square.half_extent * 2.0 / distance < params.theta
            && self.mass > 1.0;
        if far {
            return params.between(point, self.center_of_mass, self.mass, index);
        }

        self.children
            .iter()
            .flatten()
            .fold(Vec2::ZERO, |force, child| {
                force + child.repulsion_on(index, positions, params)
            })
    }
}
