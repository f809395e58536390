use std::collections::VecDeque;

use eframe::egui::{self, Align, Context, Layout};

use crate::config::LensConfig;
use crate::corpus::{Corpus, Layer};
use crate::lens::{AutoFitPolicy, ConvergenceDetector, FocusTransition};

use super::super::{RankingMode, ViewModel};
use super::super::camera::Camera;
use super::super::focus::FocusController;

impl ViewModel {
    pub(in crate::app) const INITIAL_RANKING_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PAGE_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PREFETCH_MARGIN: usize = 4;

    pub(in crate::app) fn new(corpus: Corpus, config: LensConfig) -> Self {
        let ranking_limit = corpus.keyword_count();
        let top_degree = corpus.top_by_degree(ranking_limit);
        let top_weight = corpus.top_by_weight(ranking_limit);
        let topic_sizes = corpus.topic_sizes();

        Self {
            corpus,
            config,
            layer: Layer::Keywords,
            search: String::new(),
            camera: Camera::new(config.camera),
            focus: FocusController::default(),
            transition: FocusTransition::new(config.transition),
            detector: ConvergenceDetector::new(config.convergence),
            autofit: AutoFitPolicy::default(),
            user_interacted: false,
            live_physics: true,
            physics_intensity: 1.0,
            physics_repulsion: 1.0,
            physics_spring: 1.0,
            physics_cohesion: 1.0,
            physics_velocity_damping: 0.9,
            show_zone_overlay: false,
            graph_dirty: true,
            render_graph_revision: 0,
            graph_cache: None,
            search_match_cache: None,
            top_degree,
            top_weight,
            ranking_mode: RankingMode::Degree,
            ranking_rows_visible: Self::INITIAL_RANKING_ROWS,
            topic_sizes,
            show_fps_bar: true,
            fps_show_current: true,
            fps_show_average: true,
            fps_show_low: false,
            fps_show_high: false,
            fps_show_frame_time: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            visible_node_count: 0,
            visible_edge_count: 0,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);
        if self.graph_dirty {
            self.rebuild_render_graph();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("semantic-lens");
                    ui.separator();
                    ui.label(format!("source: {}", self.corpus.source));
                    ui.label(format!("keywords: {}", self.corpus.keyword_count()));
                    ui.label(format!("links: {}", self.corpus.link_count));
                    ui.label(format!("content: {}", self.corpus.contents.len()));
                    ui.label(format!("chunks: {}", self.corpus.chunks.len()));
                    ui.label(format!(
                        "topics: {} (Q = {:.3})",
                        self.corpus.topic_count, self.corpus.modularity
                    ));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Rebuild graph").clicked() {
                        self.graph_dirty = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(visible_graph_text) = self.visible_graph_text() {
                            ui.label(visible_graph_text);
                        }
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading semantic graph...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    pub(in crate::app) fn set_layer(&mut self, layer: Layer) {
        if self.layer == layer {
            return;
        }

        log::info!("switching to {} layer", layer.label());
        self.layer = layer;
        self.graph_dirty = true;
    }
}
