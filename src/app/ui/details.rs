use eframe::egui::{self, RichText, Ui};

use crate::util::short_label;

use super::super::{NodeKind, ViewModel};

const NEIGHBOUR_ROWS: usize = 64;

struct NeighbourRow {
    index: usize,
    label: String,
    class: &'static str,
    is_anchor: bool,
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Focus Details");
        ui.add_space(6.0);

        let focus_target = self.draw_focused_node(ui);
        self.draw_camera_status(ui);

        ui.separator();
        self.draw_lens_status(ui);

        if let Some(target) = focus_target {
            self.apply_graph_focus(Some(target));
        }
    }

    /// Returns a neighbour the user clicked, if any.
    fn draw_focused_node(&self, ui: &mut Ui) -> Option<usize> {
        let Some(index) = self.focus.focused() else {
            ui.label("Click a node, a search match or a ranked keyword to focus it.");
            return None;
        };
        let Some(graph) = self.graph_cache.as_ref() else {
            ui.label("The active layer is not built yet.");
            return None;
        };
        let Some(node) = graph.nodes.get(index) else {
            ui.label("Focused node no longer exists in the active layer.");
            return None;
        };

        let (kind, id) = match node.kind {
            NodeKind::Keyword(slot) => ("Keyword", self.corpus.keywords.get(slot).map(|k| &k.id)),
            NodeKind::Content(slot) => ("Content", self.corpus.contents.get(slot).map(|c| &c.id)),
            NodeKind::Chunk(slot) => ("Chunk", self.corpus.chunks.get(slot).map(|c| &c.id)),
        };

        ui.label(RichText::new(node.label.as_str()).strong());
        if let Some(id) = id {
            ui.small(id.as_str());
        }
        ui.add_space(6.0);

        ui.label(format!("Kind: {kind}"));
        match node.topic {
            Some(topic) => ui.label(format!(
                "Topic: {topic} ({} keywords)",
                self.topic_sizes.get(topic).copied().unwrap_or(0)
            )),
            None => ui.label("Topic: none"),
        };
        ui.label(format!("Degree: {}", graph.degree(index)));
        ui.label(format!("Lens class: {}", graph.frame.class(index).label()));

        if let NodeKind::Keyword(slot) = node.kind
            && let Some(keyword) = self.corpus.keywords.get(slot)
        {
            ui.label(format!("Weight: {:.3}", keyword.weight));
        }

        let anchors = graph.frame.anchors(index);
        let rows = graph
            .adjacency
            .get(index)
            .into_iter()
            .flatten()
            .filter_map(|&neighbour| {
                graph.nodes.get(neighbour).map(|other| NeighbourRow {
                    index: neighbour,
                    label: short_label(&other.label, 36),
                    class: graph.frame.class(neighbour).label(),
                    is_anchor: anchors.contains(&neighbour),
                })
            })
            .take(NEIGHBOUR_ROWS)
            .collect::<Vec<_>>();

        ui.separator();
        ui.label(RichText::new("Neighbours").strong());
        if rows.is_empty() {
            ui.label("This node has no neighbours in the active layer.");
            return None;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("neighbour_rows_scroll")
            .max_height(300.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for row in &rows {
                    let mut text = format!("{}  [{}]", row.label, row.class);
                    if row.is_anchor {
                        text.push_str("  (anchor)");
                    }
                    if ui.link(text).clicked() {
                        clicked = Some(row.index);
                    }
                }
            });
        clicked
    }

    fn draw_camera_status(&mut self, ui: &mut Ui) {
        ui.separator();
        ui.label(RichText::new("Camera").strong());
        let center = self.camera.center();
        ui.label(format!("Center: ({:.0}, {:.0})", center.x, center.y));
        ui.label(format!("Distance: {:.0}", self.camera.distance()));
        if self.camera.is_flying() {
            ui.label("Fitting to layout...");
        }

        let focused_position = self
            .focus
            .focused()
            .zip(self.graph_cache.as_ref())
            .and_then(|(index, graph)| graph.nodes.get(index))
            .map(|node| node.world_pos);
        if ui
            .add_enabled(focused_position.is_some(), egui::Button::new("Center on focus"))
            .clicked()
            && let Some(position) = focused_position
        {
            self.camera.recenter(position);
            self.user_interacted = true;
        }
    }

    fn draw_lens_status(&self, ui: &mut Ui) {
        ui.label(RichText::new("Lens").strong());

        if let Some(graph) = self.graph_cache.as_ref() {
            let counts = graph.frame.counts();
            ui.label(format!("Primary nodes: {}", counts.primary));
            ui.label(format!(
                "Pulled nodes: {} ({} off-screen)",
                counts.pulled, counts.offscreen
            ));
        }

        ui.label(format!("Focus transition: {:?}", self.transition.phase()));
        ui.label(format!("Animated nodes: {}", self.transition.entry_count()));

        ui.add_space(4.0);
        ui.label(RichText::new("Layout").strong());
        ui.label(format!("Ticks: {}", self.detector.tick_count()));
        ui.label(format!("Mean speed: {:.3}", self.detector.last_speed()));
        ui.label(if self.detector.is_cooling_down() {
            "Cooling down"
        } else {
            "Settling"
        });
        ui.label(if self.autofit.has_fitted() {
            "Camera fitted to layout"
        } else if self.user_interacted {
            "Auto-fit off after manual camera input"
        } else {
            "Waiting to fit camera"
        });
    }
}
