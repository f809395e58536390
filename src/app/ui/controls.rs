use std::ops::RangeInclusive;

use eframe::egui::{self, Align, Key, Layout, Response, Ui};

use crate::corpus::Layer;
use crate::util::short_label;

use super::super::{NodeKind, RankingMode, ViewModel};

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;
const SEARCH_ROWS: usize = 8;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
    integer_carry: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

fn default_slider_key_step(min: f32, max: f32) -> f32 {
    ((max - min) / 200.0).max(0.0005)
}

/// Reads the held arrow direction and returns the accelerated per-frame
/// delta for `step`, or `None` when the slider is idle. Whole deltas carry
/// the fractional remainder between frames.
fn slider_key_delta(ui: &Ui, response: &Response, step: f32, whole: bool) -> Option<f32> {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return None;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        hold_state.integer_carry = 0.0;
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, hold_state));
        return None;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let mut delta = direction as f32 * step * speed * delta_time;

    if whole {
        hold_state.integer_carry += delta;
        delta = hold_state.integer_carry.trunc();
        hold_state.integer_carry -= delta;
    }

    ui.ctx().request_repaint();
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));
    Some(delta)
}

fn tuned_slider_f32(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    let (min, max) = (*range.start(), *range.end());
    let slider = ui
        .add(
            egui::Slider::new(&mut *value, range)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if slider.hovered() {
        slider.request_focus();
    }

    let mut changed = slider.changed();
    if let Some(delta) = slider_key_delta(ui, &slider, default_slider_key_step(min, max), false) {
        let old_value = *value;
        *value = (*value + delta).clamp(min, max);
        changed |= (*value - old_value).abs() > f32::EPSILON;
    }
    changed
}

fn tuned_slider_usize(
    ui: &mut Ui,
    value: &mut usize,
    range: RangeInclusive<usize>,
    text: &str,
    hover: &str,
) -> bool {
    let (min, max) = (*range.start(), *range.end());
    let slider = ui
        .add(egui::Slider::new(&mut *value, range).text(text))
        .on_hover_text(hover);
    if slider.hovered() {
        slider.request_focus();
    }

    let mut changed = slider.changed();
    if let Some(delta) = slider_key_delta(ui, &slider, 1.0, true) {
        let old_value = *value;
        *value = (*value as isize + delta as isize).clamp(min as isize, max as isize) as usize;
        changed |= *value != old_value;
    }
    changed
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Lens Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            let mut layer = self.layer;
            ui.selectable_value(&mut layer, Layer::Keywords, "Keywords")
                .on_hover_text("Keyword graph with content satellites.");
            ui.selectable_value(&mut layer, Layer::Chunks, "Chunks")
                .on_hover_text("Chunk similarity graph.");
            self.set_layer(layer);
        });

        ui.separator();
        self.draw_search(ui);
        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Continuously simulate layout forces while viewing the graph.");

        ui.checkbox(&mut self.show_zone_overlay, "Show viewport zones")
            .on_hover_text("Outline the viewport, the pull boundary and the extended viewport.");

        ui.checkbox(&mut self.show_fps_bar, "FPS Display")
            .on_hover_text("Show a live FPS readout in the header.");

        ui.collapsing("FPS Display tuning", |ui| {
            ui.add_enabled_ui(self.show_fps_bar, |ui| {
                ui.checkbox(&mut self.fps_show_current, "Show current FPS")
                    .on_hover_text("Display the most recent frame rate sample.");
                ui.checkbox(&mut self.fps_show_average, "Show average FPS")
                    .on_hover_text("Display the running average FPS over recent samples.");
                ui.checkbox(&mut self.fps_show_low, "Show low FPS")
                    .on_hover_text("Display the minimum FPS from the recent sample window.");
                ui.checkbox(&mut self.fps_show_high, "Show high FPS")
                    .on_hover_text("Display the maximum FPS from the recent sample window.");
                ui.checkbox(&mut self.fps_show_frame_time, "Show frame time")
                    .on_hover_text("Display frame duration in milliseconds.");
            });
        });

        ui.collapsing("Lens tuning", |ui| self.draw_lens_tuning(ui));

        ui.collapsing("Physics tuning", |ui| {
            tuned_slider_f32(
                ui,
                &mut self.physics_intensity,
                0.2..=2.5,
                "Intensity",
                "Overall strength applied to all physics forces.",
            );
            tuned_slider_f32(
                ui,
                &mut self.physics_repulsion,
                0.25..=2.6,
                "Repulsion",
                "How strongly nodes push away from each other.",
            );
            tuned_slider_f32(
                ui,
                &mut self.physics_spring,
                0.2..=2.2,
                "Edge spring",
                "How strongly linked nodes pull toward their target distance.",
            );
            tuned_slider_f32(
                ui,
                &mut self.physics_cohesion,
                0.0..=3.0,
                "Topic cohesion",
                "How strongly nodes drift toward the centre of their topic.",
            );
            tuned_slider_f32(
                ui,
                &mut self.physics_velocity_damping,
                0.78..=0.97,
                "Velocity damping",
                "How quickly node movement slows each frame.",
            );
        });

        ui.separator();

        egui::CollapsingHeader::new("Keyword rankings")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let degree = ui
                        .selectable_value(&mut self.ranking_mode, RankingMode::Degree, "Degree")
                        .on_hover_text("Keywords with the most links.");
                    let weight = ui
                        .selectable_value(&mut self.ranking_mode, RankingMode::Weight, "Weight")
                        .on_hover_text("Keywords with the highest weight.");
                    if degree.changed() || weight.changed() {
                        self.ranking_rows_visible = Self::INITIAL_RANKING_ROWS;
                    }
                });

                ui.add_space(6.0);
                if self.layer == Layer::Keywords {
                    self.draw_keyword_ranking(ui);
                } else {
                    ui.label("Switch to the keyword layer to focus ranked keywords.");
                }
            });
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search")
            .on_hover_text("Fuzzy-highlight matching nodes in the active layer.");
        let search_response = ui.text_edit_singleline(&mut self.search);
        let submitted =
            search_response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
        search_response.on_hover_text("Press Enter to focus the best match.");

        let Some(matches) = self.cached_search_matches() else {
            return;
        };
        let Some(graph) = self.graph_cache.as_ref() else {
            return;
        };

        let mut target = submitted.then(|| matches.first().copied()).flatten();
        ui.label(format!("{} matches", matches.len()));
        for &index in matches.iter().take(SEARCH_ROWS) {
            let Some(node) = graph.nodes.get(index) else {
                continue;
            };
            let is_focused = self.focus.focused() == Some(index);
            if ui
                .selectable_label(is_focused, short_label(&node.label, 40))
                .clicked()
            {
                target = Some(index);
            }
        }

        if target.is_some() {
            self.apply_graph_focus(target);
        }
    }

    fn draw_lens_tuning(&mut self, ui: &mut Ui) {
        let pull = &mut self.config.pull;
        tuned_slider_usize(
            ui,
            &mut pull.max_pulled_keywords,
            0..=32,
            "Pulled keywords",
            "Most off-screen keywords pulled to the edge per frame.",
        );
        tuned_slider_usize(
            ui,
            &mut pull.max_pulled_content,
            0..=32,
            "Pulled content",
            "Most off-screen content nodes pulled per frame.",
        );
        tuned_slider_usize(
            ui,
            &mut pull.max_pulled_chunks,
            0..=32,
            "Pulled chunks",
            "Most off-screen chunks pulled per frame.",
        );
        tuned_slider_f32(
            ui,
            &mut pull.fisheye_band_px,
            0.0..=160.0,
            "Fisheye band (px)",
            "Width of the band focused nodes are compressed into.",
        );
        tuned_slider_f32(
            ui,
            &mut self.config.zones.edge_margin_px,
            0.0..=120.0,
            "Edge margin (px)",
            "Distance of the pull boundary from the viewport edge.",
        );

        let mut transition = *self.transition.config();
        let mut changed = tuned_slider_f32(
            ui,
            &mut transition.push_ms,
            0.0..=3000.0,
            "Push duration (ms)",
            "How long margin nodes take to leave on focus.",
        );
        changed |= tuned_slider_f32(
            ui,
            &mut transition.return_ms,
            0.0..=3000.0,
            "Return duration (ms)",
            "How long margin nodes take to come back when focus clears.",
        );
        changed |= tuned_slider_f32(
            ui,
            &mut transition.overshoot,
            1.01..=2.0,
            "Push overshoot",
            "How far past the pull boundary margin nodes are pushed.",
        );
        if changed {
            self.config.transition = transition;
            self.transition.set_config(transition);
        }
    }

    fn draw_keyword_ranking(&mut self, ui: &mut Ui) {
        let slots_len = self.ranking_slots().len();
        let row_count = slots_len.min(self.ranking_rows_visible);
        let mut should_load_more = false;
        let mut focus_slot = None;

        egui::ScrollArea::vertical()
            .id_salt(match self.ranking_mode {
                RankingMode::Degree => "degree_ranking_scroll",
                RankingMode::Weight => "weight_ranking_scroll",
            })
            .max_height(220.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, row_count, |ui, row_range| {
                if row_range.end + Self::RANKING_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for row in row_range {
                    let Some(&slot) = self.ranking_slots().get(row) else {
                        continue;
                    };
                    let Some(keyword) = self.corpus.keywords.get(slot) else {
                        continue;
                    };

                    let is_focused = self.focus.focused() == Some(slot);
                    let value_label = match self.ranking_mode {
                        RankingMode::Degree => format!("{} links", keyword.neighbours.len()),
                        RankingMode::Weight => format!("{:.2}", keyword.weight),
                    };

                    let clicked = ui
                        .horizontal(|ui| {
                            let clicked = ui
                                .selectable_label(is_focused, short_label(&keyword.label, 32))
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                ui.label(value_label);
                            });
                            clicked
                        })
                        .inner;

                    if clicked {
                        focus_slot = Some(slot);
                    }
                }
            });

        if let Some(slot) = focus_slot {
            let target = self
                .graph_cache
                .as_ref()
                .and_then(|graph| graph.index_of(NodeKind::Keyword(slot)));
            self.apply_graph_focus(target);
        }

        if should_load_more && row_count < slots_len {
            self.ranking_rows_visible = (row_count + Self::RANKING_PAGE_ROWS).min(slots_len);
        }
    }

    fn ranking_slots(&self) -> &[usize] {
        match self.ranking_mode {
            RankingMode::Degree => &self.top_degree,
            RankingMode::Weight => &self.top_weight,
        }
    }
}
