use std::sync::Arc;
use std::time::Instant;

use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, Vec2, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::lens::{FitRequest, FocusTransition, NodeClass, ViewportZones, compute_viewport_zones};
use crate::util::short_label;

use super::super::frame::{FrameInput, LensFrame};
use super::super::physics::{apply_forces, integrate};
use super::super::render_utils::{
    blend_color, dim_color, draw_background, edge_visible, topic_color, with_alpha,
};
use super::super::{EdgeKind, PhysicsConfig, RenderGraph, SearchMatchCache, ViewModel};

const SEARCH_RESULT_LIMIT: usize = 40;
const GRID_WORLD_STEP: f32 = 200.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Bounds of every finite layout position.
fn natural_bounds(graph: &RenderGraph) -> Option<Rect> {
    let mut bounds = Rect::NOTHING;
    for position in graph.natural_positions() {
        if position.x.is_finite() && position.y.is_finite() {
            bounds.extend_with(position.to_pos2());
        }
    }
    (bounds.min.x <= bounds.max.x && bounds.min.y <= bounds.max.y).then_some(bounds)
}

fn grid_step_px(world_per_px: f32) -> f32 {
    let mut step = GRID_WORLD_STEP / world_per_px.max(f32::EPSILON);
    while step.is_finite() && step < 28.0 {
        step *= 4.0;
    }
    while step.is_finite() && step > 160.0 {
        step /= 4.0;
    }
    step
}

/// Node alpha and radius scale for a node pushed `progress` of the way out.
fn transition_fade(progress: f32) -> f32 {
    1.0 - 0.6 * progress.clamp(0.0, 1.0)
}

fn draw_zone_overlay(painter: &egui::Painter, screen: Rect, zones: &ViewportZones) {
    let layers = [
        (zones.extended_viewport, Color32::from_rgb(122, 134, 150), "extended"),
        (zones.viewport, Color32::from_rgb(106, 198, 255), "viewport"),
        (zones.pull_bounds, Color32::from_rgb(246, 206, 104), "pull bounds"),
    ];
    for (world, color, label) in layers {
        let rect = Rect::from_two_pos(
            zones.world_to_screen(screen, world.min.to_vec2()),
            zones.world_to_screen(screen, world.max.to_vec2()),
        );
        painter.rect_stroke(
            rect,
            0.0,
            Stroke::new(1.2, with_alpha(color, 0.8)),
            egui::StrokeKind::Middle,
        );
        painter.text(
            rect.left_top() + vec2(4.0, 2.0),
            Align2::LEFT_TOP,
            label,
            FontId::proportional(11.0),
            with_alpha(color, 0.9),
        );
    }
}

impl ViewModel {
    fn update_screen_space(
        rect: Rect,
        zones: &ViewportZones,
        graph: &mut RenderGraph,
        transition: &FocusTransition<usize>,
    ) {
        let zoom = 1.0 / zones.world_per_px.max(f32::EPSILON);
        let scratch = &mut graph.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        scratch.visible_mask.clear();

        for (index, node) in graph.nodes.iter().enumerate() {
            let world = graph
                .frame
                .render_position(index, transition)
                .unwrap_or(node.world_pos);
            let fade = transition
                .override_for(&index)
                .map_or(1.0, |focus| transition_fade(focus.progress));

            scratch.screen_positions.push(zones.world_to_screen(rect, world));
            scratch
                .screen_radii
                .push((node.base_radius * zoom.powf(0.40)).clamp(2.5, 46.0) * fade.max(0.55));
            scratch
                .visible_mask
                .push(graph.frame.is_visible(index, transition));
        }
    }

    fn ensure_draw_order(graph: &mut RenderGraph) {
        if graph.view_scratch.draw_order.len() == graph.nodes.len() {
            return;
        }

        let order = &mut graph.view_scratch.draw_order;
        order.clear();
        order.extend(0..graph.nodes.len());
        order.sort_by(|a, b| {
            graph.nodes[*a]
                .base_radius
                .total_cmp(&graph.nodes[*b].base_radius)
        });
    }

    /// Ranked fuzzy matches over node labels, cached per query and graph.
    pub(in crate::app) fn cached_search_matches(&mut self) -> Option<Arc<Vec<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.render_graph_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let graph = self.graph_cache.as_ref()?;
        let matcher = SkimMatcherV2::default();
        let mut scored = graph
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                fuzzy_match_score(&matcher, &node.label, query).map(|score| (score, index))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(SEARCH_RESULT_LIMIT);

        let matches = Arc::new(scored.into_iter().map(|(_, index)| index).collect::<Vec<_>>());
        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            graph_revision: self.render_graph_revision,
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    fn physics_config(&self, delta_seconds: f32) -> PhysicsConfig {
        PhysicsConfig {
            intensity: self.physics_intensity,
            repulsion_scale: self.physics_repulsion,
            spring_scale: self.physics_spring,
            cohesion_scale: self.physics_cohesion,
            velocity_damping: self.physics_velocity_damping,
            delta_seconds,
        }
    }

    /// One frame: layout tick, convergence and auto-fit, camera, zones, pull
    /// pass, focus transition, then drawing.
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.graph_dirty {
            self.rebuild_render_graph();
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(rect, &response);

        let now = Instant::now();
        let search_matches = self.cached_search_matches();
        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        let physics = self.physics_config(frame_delta_seconds);

        let Some(graph) = self.graph_cache.as_mut() else {
            let zones = compute_viewport_zones(&self.camera.state(rect.size()), &self.config.zones);
            draw_background(
                &painter,
                rect,
                zones.world_to_screen(rect, Vec2::ZERO),
                grid_step_px(zones.world_per_px),
            );
            self.visible_node_count = 0;
            self.visible_edge_count = 0;
            ui.label(format!("The {} layer has no nodes.", self.layer.label()));
            return;
        };

        let mut physics_moving = false;
        if self.live_physics {
            apply_forces(graph, physics);
            self.detector
                .observe_tick(graph.nodes.iter_mut().map(|node| &mut node.velocity));
            physics_moving = integrate(graph, physics);
        }

        let fit = self.autofit.evaluate(&self.detector, self.user_interacted);
        if fit != FitRequest::None
            && let Some(bounds) = natural_bounds(graph)
        {
            if fit == FitRequest::Initial {
                log::info!("layout cooled after {} ticks, fitting camera", self.detector.tick_count());
            } else {
                log::debug!("periodic camera fit at tick {}", self.detector.tick_count());
            }
            self.camera.fly_to_fit(bounds, rect.size(), now);
        }
        let camera_flying = self.camera.advance(now);

        let zones = compute_viewport_zones(&self.camera.state(rect.size()), &self.config.zones);
        draw_background(
            &painter,
            rect,
            zones.world_to_screen(rect, Vec2::ZERO),
            grid_step_px(zones.world_per_px),
        );

        let lens = self.focus.lens_mask(&graph.adjacency);
        let positions = graph.natural_positions().collect::<Vec<_>>();
        let frame = LensFrame::compute(
            &FrameInput {
                layer: graph.layer,
                positions: &positions,
                adjacency: &graph.adjacency,
                keyword_count: graph.keyword_count,
                keywords: &graph.keywords,
                contents: &graph.contents,
            },
            &zones,
            lens.as_deref(),
            &self.config.pull,
        );
        graph.frame = frame;

        self.focus
            .refresh_margin(lens.as_deref(), graph.nodes.len(), |index| {
                graph.frame.is_shown(index)
            });
        self.transition.update(
            now,
            self.focus.margin(),
            &zones,
            |index: &usize| positions.get(*index).copied(),
            |index: &usize| graph.frame.base_position(*index),
        );

        Self::update_screen_space(rect, &zones, graph, &self.transition);
        Self::visible_indices_into(
            rect,
            &graph.view_scratch.screen_positions,
            &graph.view_scratch.screen_radii,
            &graph.view_scratch.visible_mask,
            &mut graph.view_scratch.visible_indices,
        );
        self.visible_node_count = graph.view_scratch.visible_indices.len();

        let hovered = Self::hovered_index(
            ui,
            &graph.view_scratch.visible_indices,
            &graph.view_scratch.screen_positions,
            &graph.view_scratch.screen_radii,
        );
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }
        let hovered_index = hovered.map(|(index, _)| index);
        let pending_focus = response
            .clicked_by(egui::PointerButton::Primary)
            .then_some(hovered_index);

        let focused = self.focus.focused();
        let in_lens = |index: usize| {
            lens.as_ref()
                .is_some_and(|mask| mask.get(index).copied().unwrap_or(false))
        };
        let is_match = |index: usize| {
            search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index))
        };
        let zoom_sqrt = (1.0 / zones.world_per_px.max(f32::EPSILON)).sqrt().clamp(0.2, 3.0);

        let visible = |index: usize| {
            graph
                .view_scratch
                .visible_mask
                .get(index)
                .copied()
                .unwrap_or(false)
        };
        let mut visible_edge_count = 0usize;
        for edge in &graph.edges {
            if !visible(edge.from) || !visible(edge.to) {
                continue;
            }
            if graph.frame.suppresses_edge(edge.from, edge.to) {
                continue;
            }

            let start = graph.view_scratch.screen_positions[edge.from];
            let end = graph.view_scratch.screen_positions[edge.to];
            if !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let touches_focus = focused.is_some_and(|index| index == edge.from || index == edge.to);
            let (line_width, line_color) = match (touches_focus, edge.kind) {
                (true, _) => (
                    (2.2 * zoom_sqrt).clamp(1.2, 4.0),
                    Color32::from_rgb(241, 146, 94),
                ),
                (false, EdgeKind::Link) if focused.is_some() => (
                    (0.8 * zoom_sqrt).clamp(0.45, 2.0),
                    Color32::from_rgba_unmultiplied(80, 90, 104, 120),
                ),
                (false, EdgeKind::Link) => (
                    (1.1 * zoom_sqrt).clamp(0.6, 3.0),
                    Color32::from_rgba_unmultiplied(90, 96, 106, 170),
                ),
                (false, EdgeKind::Satellite) => (
                    (0.7 * zoom_sqrt).clamp(0.4, 1.6),
                    Color32::from_rgba_unmultiplied(120, 128, 140, 90),
                ),
            };

            painter.line_segment([start, end], Stroke::new(line_width, line_color));
            visible_edge_count += 1;
        }
        self.visible_edge_count = visible_edge_count;

        let focus_color = Color32::from_rgb(245, 206, 93);
        let mut focus_animating = false;

        Self::ensure_draw_order(graph);
        for index in graph.view_scratch.draw_order.iter().copied() {
            if !graph.view_scratch.visible_mask[index] {
                continue;
            }

            let node = &graph.nodes[index];
            let position = graph.view_scratch.screen_positions[index];
            let radius = graph.view_scratch.screen_radii[index];
            if !rect.expand(radius).contains(position) {
                continue;
            }

            let class = graph.frame.class(index);
            let is_focused = focused == Some(index);
            let is_hovered = hovered_index == Some(index);
            let fade = self
                .transition
                .override_for(&index)
                .map_or(1.0, |focus| transition_fade(focus.progress));

            let base_color = topic_color(node.topic);
            let color = if is_hovered {
                Color32::from_rgb(255, 164, 101)
            } else if is_match(index) {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.68)
            } else if focused.is_some() && !in_lens(index) {
                dim_color(base_color, 0.45)
            } else {
                base_color
            };

            let focus_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-focus", graph.layer.label(), index)),
                is_focused,
            );
            if focus_mix > 0.0 && focus_mix < 1.0 {
                focus_animating = true;
            }
            let color = with_alpha(blend_color(color, focus_color, focus_mix), fade);

            painter.circle_filled(position, radius, color);
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(1.0 + focus_mix * 1.2, with_alpha(Color32::from_black_alpha(190), fade)),
            );

            if class.is_pulled() {
                let ring = match class {
                    NodeClass::CliffPulled => Color32::from_rgb(246, 206, 104),
                    _ => Color32::from_rgb(106, 198, 255),
                };
                painter.circle_stroke(
                    position,
                    radius + 3.0,
                    Stroke::new(1.4, with_alpha(ring, 0.85 * fade)),
                );
            }

            if focus_mix > 0.0 {
                let halo_strength = (focus_mix * (1.0 - focus_mix) * 4.0).clamp(0.0, 1.0);
                let halo_alpha = (30.0 + halo_strength * 145.0) as u8;
                painter.circle_stroke(
                    position,
                    radius + 5.0 + (1.0 - focus_mix) * 6.0,
                    Stroke::new(
                        1.0 + halo_strength * 1.6,
                        Color32::from_rgba_unmultiplied(245, 206, 93, halo_alpha),
                    ),
                );
            }

            let should_draw_label = is_focused
                || is_hovered
                || class.is_pulled()
                || (in_lens(index) && focused.is_some())
                || (is_match(index) && zoom_sqrt > 0.6)
                || radius > 15.0;
            if should_draw_label {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    short_label(&node.label, 28),
                    FontId::proportional(12.0),
                    with_alpha(Color32::from_gray(238), fade),
                );
            }
        }

        if self.show_zone_overlay {
            draw_zone_overlay(&painter, rect, &zones);
        }

        if let Some(index) = hovered_index
            && let Some(node) = graph.nodes.get(index)
        {
            let panel_text = format!(
                "{}  |  {}  |  degree {}",
                short_label(&node.label, 48),
                graph.frame.class(index).label(),
                graph.degree(index)
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if physics_moving
            || camera_flying
            || focus_animating
            || self.transition.is_animating()
            || response.dragged()
        {
            ui.ctx().request_repaint();
        }

        if let Some(target) = pending_focus {
            self.apply_graph_focus(target);
        }
    }
}
