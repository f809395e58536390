use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2, Vec2};

use crate::config::LensConfig;
use crate::corpus::{Corpus, GraphSource, Layer, collect_corpus};
use crate::lens::{
    AutoFitPolicy, ContentIndex, ConvergenceDetector, FocusTransition, KeywordIndex,
};

mod camera;
mod focus;
mod frame;
mod graph;
mod physics;
mod render_utils;
mod ui;

use camera::Camera;
use focus::FocusController;
use frame::LensFrame;

type LoadResult = Result<Corpus, String>;

pub struct LensApp {
    source: GraphSource,
    config: LensConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    corpus: Corpus,
    config: LensConfig,
    layer: Layer,
    search: String,
    camera: Camera,
    focus: FocusController,
    transition: FocusTransition<usize>,
    detector: ConvergenceDetector,
    autofit: AutoFitPolicy,
    user_interacted: bool,
    live_physics: bool,
    physics_intensity: f32,
    physics_repulsion: f32,
    physics_spring: f32,
    physics_cohesion: f32,
    physics_velocity_damping: f32,
    show_zone_overlay: bool,
    graph_dirty: bool,
    render_graph_revision: u64,
    graph_cache: Option<RenderGraph>,
    search_match_cache: Option<SearchMatchCache>,
    top_degree: Vec<usize>,
    top_weight: Vec<usize>,
    ranking_mode: RankingMode,
    ranking_rows_visible: usize,
    topic_sizes: Vec<usize>,
    show_fps_bar: bool,
    fps_show_current: bool,
    fps_show_average: bool,
    fps_show_low: bool,
    fps_show_high: bool,
    fps_show_frame_time: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    visible_node_count: usize,
    visible_edge_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RankingMode {
    Degree,
    Weight,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<Vec<usize>>,
}

/// Everything the canvas draws for the active layer. Keyword nodes come
/// first, content satellites follow them; the chunk layer holds chunks only.
struct RenderGraph {
    layer: Layer,
    nodes: Vec<RenderNode>,
    edges: Vec<RenderEdge>,
    adjacency: Vec<Vec<usize>>,
    keyword_count: usize,
    keywords: KeywordIndex<String>,
    contents: ContentIndex<String>,
    frame: LensFrame,
    physics_scratch: PhysicsScratch,
    view_scratch: ViewScratch,
}

struct PhysicsScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    topic_centers: Vec<Vec2>,
    topic_counts: Vec<u32>,
}

struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
    visible_mask: Vec<bool>,
    draw_order: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeKind {
    Keyword(usize),
    Content(usize),
    Chunk(usize),
}

struct RenderNode {
    kind: NodeKind,
    label: String,
    topic: Option<usize>,
    world_pos: Vec2,
    velocity: Vec2,
    base_radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EdgeKind {
    Link,
    Satellite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RenderEdge {
    from: usize,
    to: usize,
    kind: EdgeKind,
}

#[derive(Clone, Copy)]
struct PhysicsConfig {
    intensity: f32,
    repulsion_scale: f32,
    spring_scale: f32,
    cohesion_scale: f32,
    velocity_damping: f32,
    delta_seconds: f32,
}

impl LensApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, source: GraphSource, config: LensConfig) -> Self {
        let state = Self::start_load(source.clone(), config);
        Self {
            source,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: GraphSource, config: LensConfig) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = collect_corpus(&source, config.topics.resolution)
                .map_err(|error| format!("{error:#}"));
            if let Err(error) = &result {
                log::error!("failed to load {}: {error}", source.describe());
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: GraphSource, config: LensConfig) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source, config),
        }
    }

    fn ready(&self, corpus: Corpus) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(corpus, self.config)))
    }
}

impl eframe::App for LensApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => {
                        transition = Some(match result {
                            Ok(corpus) => self.ready(corpus),
                            Err(error) => AppState::Error(error),
                        });
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading {}...", self.source.describe()));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the semantic graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.source.clone(), self.config));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone(), self.config));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            transition = Some(match result {
                                Ok(corpus) => self.ready(corpus),
                                Err(error) => AppState::Error(error),
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

impl RenderGraph {
    fn index_of(&self, kind: NodeKind) -> Option<usize> {
        match (self.layer, kind) {
            (Layer::Keywords, NodeKind::Keyword(slot)) if slot < self.keyword_count => Some(slot),
            (Layer::Keywords, NodeKind::Content(slot)) => {
                let index = self.keyword_count + slot;
                (index < self.nodes.len()).then_some(index)
            }
            (Layer::Chunks, NodeKind::Chunk(slot)) if slot < self.nodes.len() => Some(slot),
            _ => None,
        }
    }

    fn natural_positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.nodes.iter().map(|node| node.world_pos)
    }

    fn degree(&self, index: usize) -> usize {
        self.adjacency.get(index).map_or(0, Vec::len)
    }
}
