use eframe::egui::{self, Pos2, Rect, Ui};

use super::super::ViewModel;
use super::super::render_utils::circle_visible;

impl ViewModel {
    /// Scroll zoom about the pointer. Any manual zoom latches
    /// `user_interacted` so convergence no longer refits the camera.
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let zoom_factor = (1.0 - scroll * 0.0018).clamp(0.85, 1.15);
        self.camera.zoom_about(zoom_factor, pointer, rect);
        self.user_interacted = true;
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, rect: Rect, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            let delta = response.drag_delta();
            if delta != egui::Vec2::ZERO {
                self.camera.pan_by(delta, rect.size());
                self.user_interacted = true;
            }
        }
    }

    pub(in crate::app) fn visible_indices_into(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
        shown: &[bool],
        visible_indices: &mut Vec<usize>,
    ) {
        visible_indices.clear();
        visible_indices.extend((0..screen_positions.len()).filter(|&index| {
            shown.get(index).copied().unwrap_or(false)
                && circle_visible(rect, screen_positions[index], screen_radii[index])
        }));
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<(usize, f32)> {
        let pointer_pos = ui.input(|input| input.pointer.hover_pos());
        pointer_pos.and_then(|pointer| {
            visible_indices
                .iter()
                .filter_map(|index| {
                    let distance = screen_positions[*index].distance(pointer);
                    (distance <= screen_radii[*index].max(4.0)).then_some((*index, distance))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
        })
    }

    /// Clicking a node focuses it, clicking empty space clears focus.
    pub(in crate::app) fn apply_graph_focus(&mut self, target: Option<usize>) {
        if self.focus.set_focus(target)
            && let (Some(index), Some(graph)) = (target, &self.graph_cache)
            && let Some(node) = graph.nodes.get(index)
        {
            log::info!("focused {}", node.label);
        }
    }
}
