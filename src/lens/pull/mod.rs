//! Per-frame classification of nodes against the viewport zones.
//!
//! Every frame starts from scratch: nodes inside the pull boundary are
//! primary, nodes in the cliff band are clamped onto the boundary, and a
//! bounded number of off-screen neighbours of primary nodes are brought to
//! the boundary as proxies. Any pulled node that ends up without a primary
//! anchor is dropped.

mod chunk;
mod content;
mod keyword;

use eframe::egui::Vec2;
use serde::Deserialize;

use super::fisheye::compress;
use super::transition::FocusOverride;
use super::zones::{ViewportZones, clamp_to_bounds};

pub use chunk::{ChunkGraph, ChunkPullState};
pub use content::{ContentIndex, ContentPullState};
pub use keyword::{KeyedPullState, KeywordIndex};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeClass {
    #[default]
    Hidden,
    Primary,
    CliffPulled,
    OffscreenPulled,
}

impl NodeClass {
    pub fn is_pulled(self) -> bool {
        matches!(self, Self::CliffPulled | Self::OffscreenPulled)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Primary => "primary",
            Self::CliffPulled => "cliff-pulled",
            Self::OffscreenPulled => "off-screen-pulled",
        }
    }
}

/// A node drawn at an edge position instead of its layout position.
#[derive(Clone, Debug, PartialEq)]
pub struct PullRecord {
    pub position: Vec2,
    pub real: Vec2,
    /// Primary nodes this node stands in for, in discovery order.
    pub anchors: Vec<usize>,
}

/// Who may justify a pulled node.
#[derive(Clone, Copy, Debug)]
pub enum Anchoring<'a> {
    /// Primary neighbours from the same population.
    Neighbours,
    /// Primary parents from another population; `primary` is that
    /// population's primary mask.
    Parents {
        parents: &'a [Vec<usize>],
        primary: &'a [bool],
    },
}

/// Read access to one node population for a single frame.
pub trait PullGraph {
    fn node_count(&self) -> usize;

    /// Layout position. `None` means the node has not been placed yet and is
    /// treated as hidden.
    fn position(&self, slot: usize) -> Option<Vec2>;

    fn adjacency(&self, slot: usize) -> &[usize];

    fn anchoring(&self) -> Anchoring<'_> {
        Anchoring::Neighbours
    }
}

/// Nodes whose neighbourhood is focused; these are fisheye-compressed toward
/// the horizon instead of hard-clamped.
#[derive(Clone, Copy, Debug)]
pub struct FocusLens<'a> {
    mask: &'a [bool],
}

impl<'a> FocusLens<'a> {
    pub fn new(mask: &'a [bool]) -> Self {
        Self { mask }
    }

    pub fn covers(&self, slot: usize) -> bool {
        self.mask.get(slot).copied().unwrap_or(false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PullLimits {
    pub max_pulled: usize,
    pub fisheye_band_px: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PullConfig {
    pub max_pulled_keywords: usize,
    pub max_pulled_content: usize,
    pub max_pulled_chunks: usize,
    pub fisheye_band_px: f32,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            max_pulled_keywords: 8,
            max_pulled_content: 5,
            max_pulled_chunks: 3,
            fisheye_band_px: 40.0,
        }
    }
}

impl PullConfig {
    pub fn keyword_limits(&self) -> PullLimits {
        self.limits(self.max_pulled_keywords)
    }

    pub fn content_limits(&self) -> PullLimits {
        self.limits(self.max_pulled_content)
    }

    pub fn chunk_limits(&self) -> PullLimits {
        self.limits(self.max_pulled_chunks)
    }

    fn limits(&self, max_pulled: usize) -> PullLimits {
        PullLimits {
            max_pulled,
            fisheye_band_px: self.fisheye_band_px,
        }
    }
}

/// Dense per-slot result of one pull pass.
#[derive(Clone, Debug, Default)]
pub struct PullState {
    classes: Vec<NodeClass>,
    positions: Vec<Option<Vec2>>,
    records: Vec<Option<PullRecord>>,
    primary_mask: Vec<bool>,
    primary: Vec<usize>,
}

impl PullState {
    fn with_len(count: usize) -> Self {
        Self {
            classes: vec![NodeClass::Hidden; count],
            positions: vec![None; count],
            records: vec![None; count],
            primary_mask: vec![false; count],
            primary: Vec::new(),
        }
    }

    fn mark_primary(&mut self, slot: usize, real: Vec2) {
        self.classes[slot] = NodeClass::Primary;
        self.positions[slot] = Some(real);
        self.primary_mask[slot] = true;
        self.primary.push(slot);
    }

    fn insert_pulled(&mut self, slot: usize, class: NodeClass, record: PullRecord) {
        self.classes[slot] = class;
        self.positions[slot] = Some(record.position);
        self.records[slot] = Some(record);
    }

    fn drop_pulled(&mut self, slot: usize) {
        self.classes[slot] = NodeClass::Hidden;
        self.positions[slot] = None;
        self.records[slot] = None;
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, slot: usize) -> NodeClass {
        self.classes.get(slot).copied().unwrap_or_default()
    }

    pub fn record(&self, slot: usize) -> Option<&PullRecord> {
        self.records.get(slot).and_then(Option::as_ref)
    }

    /// Render position from the pull pass alone: natural for primary nodes,
    /// the clamped or compressed position for pulled nodes.
    pub fn position(&self, slot: usize) -> Option<Vec2> {
        self.positions.get(slot).copied().flatten()
    }

    /// Render position once a focus override is layered on top.
    pub fn render_position(&self, slot: usize, focus: Option<FocusOverride>) -> Option<Vec2> {
        focus
            .map(|focus| focus.position)
            .or_else(|| self.position(slot))
    }

    pub fn is_primary(&self, slot: usize) -> bool {
        self.primary_mask.get(slot).copied().unwrap_or(false)
    }

    pub fn is_pulled(&self, slot: usize) -> bool {
        self.class(slot).is_pulled()
    }

    pub fn primary_mask(&self) -> &[bool] {
        &self.primary_mask
    }

    pub fn primary_slots(&self) -> &[usize] {
        &self.primary
    }

    pub fn pulled_slots(&self) -> impl Iterator<Item = (usize, &PullRecord)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(slot, record)| record.as_ref().map(|record| (slot, record)))
    }

    pub fn pulled_count(&self) -> usize {
        self.records.iter().filter(|record| record.is_some()).count()
    }

    pub fn offscreen_pulled_count(&self) -> usize {
        self.classes
            .iter()
            .filter(|class| **class == NodeClass::OffscreenPulled)
            .count()
    }

    /// Edges between two pulled nodes sit in the edge margin without showing
    /// a real on-screen relationship.
    pub fn suppresses_edge(&self, from: usize, to: usize) -> bool {
        self.is_pulled(from) && self.is_pulled(to)
    }
}

struct Placer<'a> {
    zones: &'a ViewportZones,
    lens: Option<FocusLens<'a>>,
    start_radius: f32,
    max_radius: f32,
}

impl<'a> Placer<'a> {
    fn new(zones: &'a ViewportZones, lens: Option<FocusLens<'a>>, band_px: f32) -> Self {
        let (start_radius, max_radius) = zones.fisheye_radii(band_px);
        Self {
            zones,
            lens,
            start_radius,
            max_radius,
        }
    }

    fn place(&self, slot: usize, real: Vec2) -> Vec2 {
        if self.lens.is_some_and(|lens| lens.covers(slot)) {
            compress(real, self.zones.center, self.start_radius, self.max_radius)
        } else {
            clamp_to_bounds(self.zones.center, real, self.zones.pull_bounds)
        }
    }
}

fn primary_parents(parents: &[Vec<usize>], primary: &[bool], slot: usize) -> Vec<usize> {
    let mut anchors = Vec::new();
    for &parent in parents.get(slot).map(Vec::as_slice).unwrap_or_default() {
        if primary.get(parent).copied().unwrap_or(false) && !anchors.contains(&parent) {
            anchors.push(parent);
        }
    }
    anchors
}

fn derive_anchors<G: PullGraph + ?Sized>(graph: &G, state: &PullState, slot: usize) -> Vec<usize> {
    match graph.anchoring() {
        Anchoring::Neighbours => {
            let mut anchors = Vec::new();
            for &neighbour in graph.adjacency(slot) {
                if neighbour != slot && state.is_primary(neighbour) && !anchors.contains(&neighbour)
                {
                    anchors.push(neighbour);
                }
            }
            anchors
        }
        Anchoring::Parents { parents, primary } => primary_parents(parents, primary, slot),
    }
}

pub fn compute_pull_state<G: PullGraph + ?Sized>(
    graph: &G,
    zones: &ViewportZones,
    lens: Option<FocusLens<'_>>,
    limits: PullLimits,
) -> PullState {
    let count = graph.node_count();
    let mut state = PullState::with_len(count);
    let mut offscreen = vec![false; count];
    let placer = Placer::new(zones, lens, limits.fisheye_band_px);

    for slot in 0..count {
        let Some(real) = graph.position(slot) else {
            continue;
        };
        if !real.x.is_finite() || !real.y.is_finite() {
            continue;
        }

        if !zones.in_extended_viewport(real) {
            offscreen[slot] = true;
        } else if zones.in_pull_bounds(real) {
            state.mark_primary(slot, real);
        } else {
            let record = PullRecord {
                position: placer.place(slot, real),
                real,
                anchors: Vec::new(),
            };
            state.insert_pulled(slot, NodeClass::CliffPulled, record);
        }
    }

    let mut candidates: Vec<(usize, Vec<usize>)> = Vec::new();
    match graph.anchoring() {
        Anchoring::Neighbours => {
            let mut candidate_at = vec![usize::MAX; count];
            for &primary in &state.primary {
                for &neighbour in graph.adjacency(primary) {
                    if !offscreen.get(neighbour).copied().unwrap_or(false) {
                        continue;
                    }

                    if candidate_at[neighbour] == usize::MAX {
                        candidate_at[neighbour] = candidates.len();
                        candidates.push((neighbour, Vec::new()));
                    }
                    let anchors = &mut candidates[candidate_at[neighbour]].1;
                    if !anchors.contains(&primary) {
                        anchors.push(primary);
                    }
                }
            }
        }
        Anchoring::Parents { parents, primary } => {
            for (slot, _) in offscreen.iter().enumerate().filter(|(_, off)| **off) {
                let anchors = primary_parents(parents, primary, slot);
                if !anchors.is_empty() {
                    candidates.push((slot, anchors));
                }
            }
        }
    }

    candidates.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    candidates.truncate(limits.max_pulled);

    for (slot, anchors) in candidates {
        let Some(real) = graph.position(slot) else {
            continue;
        };
        let record = PullRecord {
            position: placer.place(slot, real),
            real,
            anchors,
        };
        state.insert_pulled(slot, NodeClass::OffscreenPulled, record);
    }

    let unanchored = state
        .pulled_slots()
        .filter(|(_, record)| record.anchors.is_empty())
        .map(|(slot, _)| slot)
        .collect::<Vec<_>>();
    for slot in unanchored {
        let anchors = derive_anchors(graph, &state, slot);
        if anchors.is_empty() {
            state.drop_pulled(slot);
        } else if let Some(record) = state.records[slot].as_mut() {
            record.anchors = anchors;
        }
    }

    state
}

#[cfg(test)]
pub(super) mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::lens::zones::{CameraState, Projection, ZoneConfig, compute_viewport_zones};

    pub(crate) struct TestGraph {
        pub positions: Vec<Option<Vec2>>,
        pub adjacency: Vec<Vec<usize>>,
    }

    impl TestGraph {
        pub fn new(positions: Vec<Vec2>, edges: &[(usize, usize)]) -> Self {
            let mut adjacency = vec![Vec::new(); positions.len()];
            for &(a, b) in edges {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
            Self {
                positions: positions.into_iter().map(Some).collect(),
                adjacency,
            }
        }
    }

    impl PullGraph for TestGraph {
        fn node_count(&self) -> usize {
            self.positions.len()
        }

        fn position(&self, slot: usize) -> Option<Vec2> {
            self.positions.get(slot).copied().flatten()
        }

        fn adjacency(&self, slot: usize) -> &[usize] {
            self.adjacency.get(slot).map(Vec::as_slice).unwrap_or_default()
        }
    }

    /// 1000×1000 px orthographic view of a 1000×1000 world square centered on
    /// the origin, so one pixel is one world unit.
    pub(crate) fn square_zones() -> ViewportZones {
        let camera = CameraState {
            center: Vec2::ZERO,
            distance: 1000.0,
            projection: Projection::Orthographic {
                world_height: 1000.0,
            },
            viewport_px: vec2(1000.0, 1000.0),
        };
        let config = ZoneConfig {
            edge_margin_px: 40.0,
            chrome: Default::default(),
            overscan_px: 100.0,
        };
        compute_viewport_zones(&camera, &config)
    }

    pub(crate) fn limits(max_pulled: usize) -> PullLimits {
        PullLimits {
            max_pulled,
            fisheye_band_px: 40.0,
        }
    }

    #[test]
    fn classifies_primary_cliff_and_offscreen() {
        let graph = TestGraph::new(
            vec![
                vec2(0.0, 0.0),
                vec2(480.0, 0.0),
                vec2(5_000.0, 0.0),
                vec2(-5_000.0, 0.0),
            ],
            &[(0, 1), (0, 2)],
        );
        let zones = square_zones();
        let state = compute_pull_state(&graph, &zones, None, limits(8));

        assert_eq!(state.class(0), NodeClass::Primary);
        assert_eq!(state.class(1), NodeClass::CliffPulled);
        assert_eq!(state.class(2), NodeClass::OffscreenPulled);
        assert_eq!(state.class(3), NodeClass::Hidden);

        let cliff = state.record(1).expect("cliff record");
        assert!((cliff.position.x - 460.0).abs() < 1.0e-3);
        assert_eq!(cliff.anchors, vec![0]);
        assert_eq!(cliff.real, vec2(480.0, 0.0));

        let proxy = state.record(2).expect("proxy record");
        assert!((proxy.position.x - 460.0).abs() < 1.0e-3);
        assert_eq!(state.position(0), Some(vec2(0.0, 0.0)));
        assert_eq!(state.position(3), None);
    }

    #[test]
    fn offscreen_pull_is_capped_and_ranked_by_anchor_count() {
        let mut positions = vec![vec2(-100.0, 0.0), vec2(0.0, 0.0), vec2(100.0, 0.0)];
        let mut edges = Vec::new();
        for index in 0..12 {
            let slot = positions.len();
            positions.push(Vec2::angled(index as f32 * 0.5) * 4_000.0);
            edges.push((0, slot));
            if index % 4 == 0 {
                edges.push((1, slot));
                edges.push((2, slot));
            }
        }
        let graph = TestGraph::new(positions, &edges);
        let state = compute_pull_state(&graph, &square_zones(), None, limits(3));

        assert_eq!(state.offscreen_pulled_count(), 3);
        let pulled = state.pulled_slots().map(|(slot, _)| slot).collect::<Vec<_>>();
        assert_eq!(pulled, vec![3, 7, 11]);
        for (_, record) in state.pulled_slots() {
            assert_eq!(record.anchors.len(), 3);
        }
    }

    #[test]
    fn cap_holds_for_any_candidate_count() {
        for candidates in [0usize, 1, 2, 5, 40] {
            let mut positions = vec![Vec2::ZERO];
            let mut edges = Vec::new();
            for index in 0..candidates {
                positions.push(vec2(3_000.0 + index as f32, 2_000.0));
                edges.push((0, index + 1));
            }
            let graph = TestGraph::new(positions, &edges);
            let state = compute_pull_state(&graph, &square_zones(), None, limits(4));
            assert!(state.offscreen_pulled_count() <= 4);
            assert_eq!(state.offscreen_pulled_count(), candidates.min(4));
        }
    }

    #[test]
    fn ties_keep_discovery_order() {
        let graph = TestGraph::new(
            vec![
                Vec2::ZERO,
                vec2(0.0, 9_000.0),
                vec2(9_000.0, 0.0),
                vec2(-9_000.0, 0.0),
            ],
            &[(0, 3), (0, 1), (0, 2)],
        );
        let state = compute_pull_state(&graph, &square_zones(), None, limits(2));
        let pulled = state.pulled_slots().map(|(slot, _)| slot).collect::<Vec<_>>();
        assert_eq!(pulled, vec![1, 3]);
        assert_eq!(state.class(2), NodeClass::Hidden);
    }

    #[test]
    fn every_surviving_pulled_node_has_an_anchor() {
        let graph = TestGraph::new(
            vec![
                vec2(0.0, 0.0),
                vec2(470.0, 300.0),
                vec2(-470.0, -100.0),
                vec2(0.0, 480.0),
                vec2(7_000.0, 7_000.0),
            ],
            &[(0, 1), (2, 3), (3, 4)],
        );
        let state = compute_pull_state(&graph, &square_zones(), None, limits(8));

        assert_eq!(state.class(1), NodeClass::CliffPulled);
        assert_eq!(state.class(2), NodeClass::Hidden);
        assert_eq!(state.class(3), NodeClass::Hidden);
        assert_eq!(state.class(4), NodeClass::Hidden);
        for (_, record) in state.pulled_slots() {
            assert!(!record.anchors.is_empty());
        }
    }

    #[test]
    fn focused_neighbourhood_is_compressed_not_clamped() {
        let graph = TestGraph::new(vec![Vec2::ZERO, vec2(0.0, 6_000.0)], &[(0, 1)]);
        let zones = square_zones();
        let mask = vec![true, true];
        let state = compute_pull_state(&graph, &zones, Some(FocusLens::new(&mask)), limits(8));

        let (start, max) = zones.fisheye_radii(40.0);
        let radius = state.position(1).expect("pulled").length();
        assert!(radius > start && radius < max);
        assert!(zones.in_pull_bounds(state.position(1).expect("pulled")));
    }

    #[test]
    fn edge_between_pulled_nodes_is_suppressed_until_one_becomes_primary() {
        let mut graph = TestGraph::new(
            vec![Vec2::ZERO, vec2(480.0, 0.0), vec2(0.0, 480.0)],
            &[(0, 1), (0, 2), (1, 2)],
        );
        let zones = square_zones();

        let state = compute_pull_state(&graph, &zones, None, limits(8));
        assert!(state.suppresses_edge(1, 2));
        assert!(!state.suppresses_edge(0, 1));

        graph.positions[2] = Some(vec2(0.0, 100.0));
        let state = compute_pull_state(&graph, &zones, None, limits(8));
        assert!(!state.suppresses_edge(1, 2));
    }

    #[test]
    fn recomputation_is_idempotent() {
        let graph = TestGraph::new(
            vec![Vec2::ZERO, vec2(470.0, 10.0), vec2(8_000.0, 1.0), vec2(90.0, 90.0)],
            &[(0, 1), (0, 2), (2, 3), (1, 3)],
        );
        let zones = square_zones();
        let first = compute_pull_state(&graph, &zones, None, limits(8));
        let second = compute_pull_state(&graph, &zones, None, limits(8));
        for slot in 0..graph.node_count() {
            assert_eq!(first.class(slot), second.class(slot));
            assert_eq!(first.record(slot), second.record(slot));
        }
    }

    #[test]
    fn unplaced_nodes_are_hidden() {
        let mut graph = TestGraph::new(vec![Vec2::ZERO, vec2(1.0, 1.0)], &[(0, 1)]);
        graph.positions[1] = None;
        let state = compute_pull_state(&graph, &square_zones(), None, limits(8));
        assert_eq!(state.class(1), NodeClass::Hidden);
        assert_eq!(state.primary_slots(), &[0]);
    }
}
