use eframe::egui::Vec2;

use crate::corpus::Layer;
use crate::lens::pull::PullRecord;
use crate::lens::{
    ChunkGraph, ChunkPullState, ContentIndex, FocusLens, FocusTransition, KeywordIndex, NodeClass,
    PullConfig, PullState, ViewportZones,
};

/// Inputs of one pull pass, in render-node order.
pub(super) struct FrameInput<'a> {
    pub(super) layer: Layer,
    pub(super) positions: &'a [Vec2],
    pub(super) adjacency: &'a [Vec<usize>],
    pub(super) keyword_count: usize,
    pub(super) keywords: &'a KeywordIndex<String>,
    pub(super) contents: &'a ContentIndex<String>,
}

#[derive(Debug)]
enum LayerPull {
    Keywords {
        keywords: PullState,
        contents: PullState,
    },
    Chunks(ChunkPullState),
}

/// Pull state of the active layer addressed by render index. Content slots
/// follow the keyword slots.
#[derive(Debug)]
pub(super) struct LensFrame {
    pull: LayerPull,
    keyword_count: usize,
}

impl LensFrame {
    pub(super) fn empty(layer: Layer) -> Self {
        let pull = match layer {
            Layer::Keywords => LayerPull::Keywords {
                keywords: PullState::default(),
                contents: PullState::default(),
            },
            Layer::Chunks => LayerPull::Chunks(ChunkPullState::default()),
        };
        Self {
            pull,
            keyword_count: 0,
        }
    }

    /// Keywords first, then content gated on the keyword primaries; chunks on
    /// their own.
    pub(super) fn compute(
        input: &FrameInput<'_>,
        zones: &ViewportZones,
        lens: Option<&[bool]>,
        config: &PullConfig,
    ) -> Self {
        match input.layer {
            Layer::Keywords => {
                let keyword_count = input.keyword_count.min(input.positions.len());
                let (keyword_positions, content_positions) =
                    input.positions.split_at(keyword_count);
                let (keyword_lens, content_lens) = match lens {
                    Some(mask) if mask.len() >= keyword_count => {
                        let (keywords, contents) = mask.split_at(keyword_count);
                        (Some(FocusLens::new(keywords)), Some(FocusLens::new(contents)))
                    }
                    _ => (None, None),
                };

                let keywords = input
                    .keywords
                    .pull_slots(keyword_positions, zones, keyword_lens, config.keyword_limits())
                    .into_dense();
                let contents = input
                    .contents
                    .pull(
                        |slot| content_positions.get(slot).copied(),
                        input.keywords,
                        &keywords,
                        zones,
                        content_lens,
                        config.content_limits(),
                    )
                    .into_dense();

                Self {
                    pull: LayerPull::Keywords { keywords, contents },
                    keyword_count,
                }
            }
            Layer::Chunks => {
                let graph = ChunkGraph {
                    positions: input.positions,
                    adjacency: input.adjacency,
                };
                Self {
                    pull: LayerPull::Chunks(graph.pull(
                        zones,
                        lens.map(FocusLens::new),
                        config.chunk_limits(),
                    )),
                    keyword_count: 0,
                }
            }
        }
    }

    fn slot(&self, index: usize) -> (&PullState, usize) {
        match &self.pull {
            LayerPull::Keywords { keywords, .. } if index < self.keyword_count => (keywords, index),
            LayerPull::Keywords { contents, .. } => (contents, index - self.keyword_count),
            LayerPull::Chunks(chunks) => (chunks.state(), index),
        }
    }

    pub(super) fn class(&self, index: usize) -> NodeClass {
        let (state, slot) = self.slot(index);
        state.class(slot)
    }

    pub(super) fn record(&self, index: usize) -> Option<&PullRecord> {
        let (state, slot) = self.slot(index);
        state.record(slot)
    }

    /// Anchor render indices of a pulled node. Content anchors are keyword
    /// slots, which share their render index.
    pub(super) fn anchors(&self, index: usize) -> &[usize] {
        self.record(index)
            .map(|record| record.anchors.as_slice())
            .unwrap_or_default()
    }

    /// Pull position without any focus override.
    pub(super) fn base_position(&self, index: usize) -> Option<Vec2> {
        let (state, slot) = self.slot(index);
        state.position(slot)
    }

    pub(super) fn render_position(
        &self,
        index: usize,
        transition: &FocusTransition<usize>,
    ) -> Option<Vec2> {
        match &self.pull {
            LayerPull::Chunks(chunks) => chunks.render_position(index, Some(transition)),
            LayerPull::Keywords { .. } => {
                let (state, slot) = self.slot(index);
                state.render_position(slot, transition.override_for(&index))
            }
        }
    }

    pub(super) fn is_shown(&self, index: usize) -> bool {
        let (state, slot) = self.slot(index);
        state.is_primary(slot) || state.is_pulled(slot)
    }

    pub(super) fn is_visible(&self, index: usize, transition: &FocusTransition<usize>) -> bool {
        match &self.pull {
            LayerPull::Chunks(chunks) => chunks.is_visible(index, Some(transition)),
            LayerPull::Keywords { .. } => {
                self.is_shown(index) && !transition.is_fully_pushed(&index)
            }
        }
    }

    pub(super) fn suppresses_edge(&self, from: usize, to: usize) -> bool {
        let (from_state, from_slot) = self.slot(from);
        let (to_state, to_slot) = self.slot(to);
        if std::ptr::eq(from_state, to_state) {
            from_state.suppresses_edge(from_slot, to_slot)
        } else {
            from_state.is_pulled(from_slot) && to_state.is_pulled(to_slot)
        }
    }

    pub(super) fn counts(&self) -> FrameCounts {
        match &self.pull {
            LayerPull::Keywords { keywords, contents } => {
                FrameCounts::of(keywords).add(FrameCounts::of(contents))
            }
            LayerPull::Chunks(chunks) => FrameCounts::of(chunks.state()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct FrameCounts {
    pub(super) primary: usize,
    pub(super) pulled: usize,
    pub(super) offscreen: usize,
}

impl FrameCounts {
    fn of(state: &PullState) -> Self {
        Self {
            primary: state.primary_slots().len(),
            pulled: state.pulled_count(),
            offscreen: state.offscreen_pulled_count(),
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            primary: self.primary + other.primary,
            pulled: self.pulled + other.pulled,
            offscreen: self.offscreen + other.offscreen,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    use eframe::egui::vec2;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lens::zones::ChromeInsets;
    use crate::lens::{
        CameraState, Projection, TransitionConfig, TransitionPhase, ZoneConfig,
        compute_viewport_zones,
    };

    fn zones() -> ViewportZones {
        let camera = CameraState {
            center: Vec2::ZERO,
            distance: 10.0,
            projection: Projection::Orthographic {
                world_height: 1000.0,
            },
            viewport_px: vec2(1000.0, 1000.0),
        };
        let config = ZoneConfig {
            edge_margin_px: 40.0,
            chrome: ChromeInsets::default(),
            overscan_px: 100.0,
        };
        compute_viewport_zones(&camera, &config)
    }

    struct Fixture {
        positions: Vec<Vec2>,
        adjacency: Vec<Vec<usize>>,
        keywords: KeywordIndex<String>,
        contents: ContentIndex<String>,
    }

    /// Keywords `a` (centre), `b` (far right, linked to `a`), `c` (on
    /// screen, isolated); content `orphan` under `b`, `note` under `a`.
    fn fixture() -> Fixture {
        let keyword_adjacency = vec![vec![1], vec![0], vec![]];
        let keywords = KeywordIndex::from_slots(
            vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
            keyword_adjacency.clone(),
        );
        let contents = ContentIndex::new(
            [
                ("orphan".to_owned(), vec!["b".to_owned()]),
                ("note".to_owned(), vec!["a".to_owned()]),
            ],
            &keywords,
        );
        Fixture {
            positions: vec![
                vec2(0.0, 0.0),
                vec2(5_000.0, 0.0),
                vec2(100.0, 100.0),
                vec2(4_000.0, 4_000.0),
                vec2(3_000.0, 0.0),
            ],
            adjacency: vec![vec![1, 4], vec![0, 3], vec![], vec![1], vec![0]],
            keywords,
            contents,
        }
    }

    fn input(fixture: &Fixture) -> FrameInput<'_> {
        FrameInput {
            layer: Layer::Keywords,
            positions: &fixture.positions,
            adjacency: &fixture.adjacency,
            keyword_count: 3,
            keywords: &fixture.keywords,
            contents: &fixture.contents,
        }
    }

    #[test]
    fn content_follows_keyword_primaries() {
        let fixture = fixture();
        let frame = LensFrame::compute(&input(&fixture), &zones(), None, &PullConfig::default());

        assert_eq!(frame.class(0), NodeClass::Primary);
        assert_eq!(frame.class(1), NodeClass::OffscreenPulled);
        assert_eq!(frame.class(2), NodeClass::Primary);
        assert_eq!(frame.class(3), NodeClass::Hidden);
        assert_eq!(frame.class(4), NodeClass::OffscreenPulled);
        assert_eq!(frame.anchors(1), &[0]);
        assert_eq!(frame.anchors(4), &[0]);
        assert_eq!(
            frame.counts(),
            FrameCounts {
                primary: 2,
                pulled: 2,
                offscreen: 2,
            }
        );
    }

    #[test]
    fn edges_between_pulled_nodes_are_suppressed_across_populations() {
        let fixture = fixture();
        let frame = LensFrame::compute(&input(&fixture), &zones(), None, &PullConfig::default());

        assert!(frame.suppresses_edge(1, 4));
        assert!(!frame.suppresses_edge(0, 1));
        assert!(!frame.suppresses_edge(0, 4));
    }

    #[test]
    fn pushed_margin_nodes_disappear_once_tracking() {
        let fixture = fixture();
        let zones = zones();
        let frame = LensFrame::compute(&input(&fixture), &zones, None, &PullConfig::default());
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let start = Instant::now();
        let margin = HashSet::from([2]);
        let natural = |index: &usize| fixture.positions.get(*index).copied();
        let rendered = |index: &usize| frame.base_position(*index);

        transition.update(start, Some(&margin), &zones, natural, rendered);
        assert!(frame.is_visible(2, &transition));
        assert_eq!(frame.render_position(2, &transition), Some(vec2(100.0, 100.0)));

        transition.update(
            start + Duration::from_millis(1_250),
            Some(&margin),
            &zones,
            natural,
            rendered,
        );
        assert_eq!(transition.phase(), TransitionPhase::Tracking);
        assert!(!frame.is_visible(2, &transition));
        assert!(frame.is_visible(0, &transition));
        let pushed = frame.render_position(2, &transition).expect("tracked");
        assert!(!zones.viewport.contains(pushed.to_pos2()));
    }

    #[test]
    fn chunk_layer_uses_the_focus_lens() {
        let positions = vec![vec2(0.0, 0.0), vec2(2_000.0, 0.0)];
        let adjacency = vec![vec![1], vec![0]];
        let keywords = KeywordIndex::from_slots(Vec::new(), Vec::new());
        let contents = ContentIndex::new(Vec::<(String, Vec<String>)>::new(), &keywords);
        let input = FrameInput {
            layer: Layer::Chunks,
            positions: &positions,
            adjacency: &adjacency,
            keyword_count: 0,
            keywords: &keywords,
            contents: &contents,
        };
        let zones = zones();
        let lens = [true, true];

        let clamped = LensFrame::compute(&input, &zones, None, &PullConfig::default());
        let focused = LensFrame::compute(&input, &zones, Some(&lens), &PullConfig::default());

        let clamped = clamped.base_position(1).expect("pulled");
        let compressed = focused.base_position(1).expect("pulled");
        assert!(zones.in_pull_bounds(compressed));
        assert!(compressed.x < clamped.x);
    }
}
