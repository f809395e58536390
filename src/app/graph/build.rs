use std::collections::HashSet;

use eframe::egui::{Vec2, vec2};

use crate::corpus::{Corpus, Layer};
use crate::lens::{ContentIndex, KeywordIndex};
use crate::util::stable_pair;

use super::super::frame::LensFrame;
use super::super::render_utils::node_radius;
use super::super::{
    EdgeKind, NodeKind, PhysicsScratch, RenderEdge, RenderGraph, RenderNode, ViewModel,
    ViewScratch,
};

const SEED_SPACING: f32 = 34.0;
const SATELLITE_OFFSET: f32 = 30.0;

impl RenderGraph {
    pub(in crate::app) fn assemble(
        layer: Layer,
        nodes: Vec<RenderNode>,
        edges: Vec<RenderEdge>,
        adjacency: Vec<Vec<usize>>,
        keywords: KeywordIndex<String>,
        contents: ContentIndex<String>,
    ) -> Self {
        Self {
            layer,
            keyword_count: keywords.len(),
            nodes,
            edges,
            adjacency,
            keywords,
            contents,
            frame: LensFrame::empty(layer),
            physics_scratch: PhysicsScratch {
                forces: Vec::new(),
                positions: Vec::new(),
                topic_centers: Vec::new(),
                topic_counts: Vec::new(),
            },
            view_scratch: ViewScratch {
                screen_positions: Vec::new(),
                screen_radii: Vec::new(),
                visible_indices: Vec::new(),
                visible_mask: Vec::new(),
                draw_order: Vec::new(),
            },
        }
    }

    pub(in crate::app) fn build(corpus: &Corpus, layer: Layer) -> Option<Self> {
        let graph = match layer {
            Layer::Keywords => Self::build_keywords(corpus),
            Layer::Chunks => Self::build_chunks(corpus),
        };
        (!graph.nodes.is_empty()).then_some(graph)
    }

    fn build_keywords(corpus: &Corpus) -> Self {
        let keyword_count = corpus.keyword_count();
        let spread = seed_spread(keyword_count + corpus.contents.len());
        let (min_weight, max_weight) = weight_range(corpus.keywords.iter().map(|k| k.weight));

        let mut nodes = Vec::with_capacity(keyword_count + corpus.contents.len());
        for (slot, keyword) in corpus.keywords.iter().enumerate() {
            let base_radius = node_radius(keyword.weight, min_weight, max_weight);
            nodes.push(seed_node(
                NodeKind::Keyword(slot),
                &keyword.id,
                keyword.label.clone(),
                Some(keyword.topic),
                Vec2::ZERO,
                spread,
                base_radius,
            ));
        }

        let mut adjacency = corpus.keyword_adjacency();
        adjacency.resize(keyword_count + corpus.contents.len(), Vec::new());
        let mut edges = Vec::new();
        for (slot, keyword) in corpus.keywords.iter().enumerate() {
            for &neighbour in keyword.neighbours.iter().filter(|&&other| other > slot) {
                edges.push(RenderEdge {
                    from: slot,
                    to: neighbour,
                    kind: EdgeKind::Link,
                });
            }
        }

        for (slot, content) in corpus.contents.iter().enumerate() {
            let index = keyword_count + slot;
            let parent = content.parents.first().and_then(|&parent| nodes.get(parent));
            let anchor = parent.map_or(Vec2::ZERO, |parent| parent.world_pos);
            let topic = parent.and_then(|parent| parent.topic);
            nodes.push(seed_node(
                NodeKind::Content(slot),
                &content.id,
                content.label.clone(),
                topic,
                anchor,
                SATELLITE_OFFSET,
                4.0,
            ));

            for &parent in &content.parents {
                edges.push(RenderEdge {
                    from: parent,
                    to: index,
                    kind: EdgeKind::Satellite,
                });
                adjacency[parent].push(index);
                adjacency[index].push(parent);
            }
        }

        let keywords = KeywordIndex::from_slots(
            corpus.keywords.iter().map(|keyword| keyword.id.clone()).collect(),
            corpus.keyword_adjacency(),
        );
        let contents = ContentIndex::new(
            corpus.contents.iter().map(|content| {
                let parents = content
                    .parents
                    .iter()
                    .filter_map(|&parent| corpus.keywords.get(parent))
                    .map(|keyword| keyword.id.clone())
                    .collect::<Vec<_>>();
                (content.id.clone(), parents)
            }),
            &keywords,
        );

        Self::assemble(Layer::Keywords, nodes, edges, adjacency, keywords, contents)
    }

    fn build_chunks(corpus: &Corpus) -> Self {
        let spread = seed_spread(corpus.chunks.len());
        let (min_size, max_size) =
            weight_range(corpus.chunks.iter().map(|chunk| chunk.keywords.len() as f32));

        let nodes = corpus
            .chunks
            .iter()
            .enumerate()
            .map(|(slot, chunk)| {
                seed_node(
                    NodeKind::Chunk(slot),
                    &chunk.id,
                    chunk.label.clone(),
                    Some(chunk.topic),
                    Vec2::ZERO,
                    spread,
                    node_radius(chunk.keywords.len() as f32, min_size, max_size),
                )
            })
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for (slot, chunk) in corpus.chunks.iter().enumerate() {
            for &neighbour in &chunk.neighbours {
                let pair = (slot.min(neighbour), slot.max(neighbour));
                if pair.0 != pair.1 && seen.insert(pair) {
                    edges.push(RenderEdge {
                        from: pair.0,
                        to: pair.1,
                        kind: EdgeKind::Link,
                    });
                }
            }
        }

        let keywords = KeywordIndex::from_slots(Vec::new(), Vec::new());
        let contents = ContentIndex::new(Vec::new(), &keywords);
        Self::assemble(
            Layer::Chunks,
            nodes,
            edges,
            corpus.chunk_adjacency(),
            keywords,
            contents,
        )
    }
}

fn seed_spread(node_count: usize) -> f32 {
    (node_count.max(1) as f32).sqrt() * SEED_SPACING
}

fn weight_range(weights: impl Iterator<Item = f32>) -> (f32, f32) {
    weights.fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), weight| {
        (min.min(weight), max.max(weight))
    })
}

/// Deterministic start position around `anchor` with a small outward kick.
fn seed_node(
    kind: NodeKind,
    id: &str,
    label: String,
    topic: Option<usize>,
    anchor: Vec2,
    spread: f32,
    base_radius: f32,
) -> RenderNode {
    let (jx, jy) = stable_pair(id);
    let mut direction = vec2(jx, jy);
    if direction.length_sq() <= 0.0001 {
        let angle = (id.len() as f32 * 0.618_034 + 0.11) * std::f32::consts::TAU;
        direction = vec2(angle.cos(), angle.sin());
    }

    RenderNode {
        kind,
        label,
        topic,
        world_pos: anchor + direction * spread,
        velocity: direction.normalized() * (1.15 + base_radius * 0.022),
        base_radius,
    }
}

impl ViewModel {
    pub(in crate::app) fn rebuild_render_graph(&mut self) {
        self.render_graph_revision = self.render_graph_revision.wrapping_add(1);
        self.search_match_cache = None;
        self.graph_cache = RenderGraph::build(&self.corpus, self.layer);
        self.graph_dirty = false;

        self.focus.clear();
        self.transition.reset();
        self.detector.reset();
        self.autofit.reset_session();
        self.user_interacted = false;

        match &self.graph_cache {
            Some(graph) => {
                log::info!(
                    "built {} layer: {} nodes, {} edges",
                    self.layer.label(),
                    graph.nodes.len(),
                    graph.edges.len()
                );
                self.visible_node_count = graph.nodes.len();
                self.visible_edge_count = graph.edges.len();
            }
            None => {
                log::warn!("{} layer has no nodes", self.layer.label());
                self.visible_node_count = 0;
                self.visible_edge_count = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::corpus::{GraphSource, collect_corpus};

    fn demo() -> Corpus {
        collect_corpus(&GraphSource::Demo { keywords: 96 }, 1.0).expect("demo corpus")
    }

    #[test]
    fn keyword_layer_appends_content_satellites() {
        let corpus = demo();
        let graph = RenderGraph::build(&corpus, Layer::Keywords).expect("nodes");

        assert_eq!(graph.keyword_count, corpus.keyword_count());
        assert_eq!(graph.nodes.len(), corpus.keyword_count() + corpus.contents.len());
        assert_eq!(graph.adjacency.len(), graph.nodes.len());
        assert_eq!(graph.contents.len(), corpus.contents.len());

        for (slot, content) in corpus.contents.iter().enumerate() {
            let index = graph.keyword_count + slot;
            assert_eq!(graph.nodes[index].kind, NodeKind::Content(slot));
            assert_eq!(graph.contents.parents(slot), content.parents.as_slice());
            for &parent in &content.parents {
                assert!(graph.adjacency[parent].contains(&index));
                assert!(graph.edges.contains(&RenderEdge {
                    from: parent,
                    to: index,
                    kind: EdgeKind::Satellite,
                }));
            }
        }
    }

    #[test]
    fn keyword_links_are_listed_once() {
        let corpus = demo();
        let graph = RenderGraph::build(&corpus, Layer::Keywords).expect("nodes");
        let links = graph
            .edges
            .iter()
            .filter(|edge| edge.kind == EdgeKind::Link)
            .count();
        assert_eq!(links, corpus.link_count);
    }

    #[test]
    fn chunk_layer_keeps_directed_pull_adjacency() {
        let corpus = demo();
        let graph = RenderGraph::build(&corpus, Layer::Chunks).expect("nodes");

        assert_eq!(graph.nodes.len(), corpus.chunks.len());
        assert_eq!(graph.keyword_count, 0);
        assert_eq!(graph.adjacency, corpus.chunk_adjacency());
        assert!(graph.edges.iter().all(|edge| edge.from < edge.to));
    }

    #[test]
    fn seeding_is_deterministic() {
        let corpus = demo();
        let first = RenderGraph::build(&corpus, Layer::Keywords).expect("nodes");
        let second = RenderGraph::build(&corpus, Layer::Keywords).expect("nodes");
        let positions = |graph: &RenderGraph| {
            graph
                .nodes
                .iter()
                .map(|node| node.world_pos)
                .collect::<Vec<_>>()
        };
        assert_eq!(positions(&first), positions(&second));
    }
}
