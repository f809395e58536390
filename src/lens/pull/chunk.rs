use eframe::egui::Vec2;

use super::{FocusLens, PullGraph, PullLimits, PullState, compute_pull_state};
use crate::lens::transition::FocusTransition;
use crate::lens::zones::ViewportZones;

/// Chunk layer viewed through slices owned by the renderer.
#[derive(Clone, Copy, Debug)]
pub struct ChunkGraph<'a> {
    pub positions: &'a [Vec2],
    pub adjacency: &'a [Vec<usize>],
}

impl PullGraph for ChunkGraph<'_> {
    fn node_count(&self) -> usize {
        self.positions.len()
    }

    fn position(&self, slot: usize) -> Option<Vec2> {
        self.positions.get(slot).copied()
    }

    fn adjacency(&self, slot: usize) -> &[usize] {
        self.adjacency
            .get(slot)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl ChunkGraph<'_> {
    pub fn pull(
        &self,
        zones: &ViewportZones,
        lens: Option<FocusLens<'_>>,
        limits: PullLimits,
    ) -> ChunkPullState {
        ChunkPullState {
            state: compute_pull_state(self, zones, lens, limits),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ChunkPullState {
    state: PullState,
}

impl ChunkPullState {
    pub fn state(&self) -> &PullState {
        &self.state
    }

    /// Primary and pulled chunks are drawn unless a focus push has finished
    /// carrying them past the edge.
    pub fn is_visible(&self, index: usize, transition: Option<&FocusTransition<usize>>) -> bool {
        let classified = self.state.is_primary(index) || self.state.is_pulled(index);
        classified && !transition.is_some_and(|transition| transition.is_fully_pushed(&index))
    }

    pub fn render_position(
        &self,
        index: usize,
        transition: Option<&FocusTransition<usize>>,
    ) -> Option<Vec2> {
        let focus = transition.and_then(|transition| transition.override_for(&index));
        self.state.render_position(index, focus)
    }
}
