use eframe::egui::{self, Align, Color32, Layout, Sense, Stroke, Ui, vec2};

use super::CartogramApp;
use super::render_utils::{CIRCLE_STROKE, to_color32};

const LEGEND_SWATCH: f32 = 14.0;

impl CartogramApp {
    pub(super) fn draw_top_bar(&mut self, ui: &mut Ui, toggle_requested: &mut bool) {
        ui.horizontal(|ui| {
            ui.heading("US states cartogram");
            ui.separator();
            ui.label(format!("circles: {}", self.session.nodes().len()));
            ui.label(format!("sized by {}", self.session.metric().label()));

            let toggle_text = format!("Show {}", self.session.metric().other().label());
            if ui.button(toggle_text).clicked() {
                *toggle_requested = true;
            }
            if ui.button("Reset view").clicked() {
                self.reset_view();
            }
            ui.checkbox(&mut self.show_quadtree_overlay, "Quadtree overlay");

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let simulation = self.session.simulation();
                if simulation.is_running() {
                    if let Some(status) = self.last_tick {
                        ui.label(format!(
                            "tick {}  |  alpha {:.3}  |  top speed {:.2}px",
                            status.tick, status.alpha, status.top_speed
                        ));
                    }
                    ui.spinner();
                } else {
                    ui.label(format!("settled after {} ticks", simulation.ticks()));
                }
            });
        });
    }

    pub(super) fn draw_legend(&self, ui: &mut Ui) {
        let legend = self.session.legend();
        ui.heading(&legend.title);
        ui.add_space(8.0);

        ui.label("Circle size");
        let zoom = self.zoom;
        for size in &legend.sizes {
            let diameter = (size.radius * zoom * 2.0).max(2.0);
            ui.horizontal(|ui| {
                let (rect, _) =
                    ui.allocate_exact_size(vec2(diameter.max(LEGEND_SWATCH), diameter), Sense::hover());
                ui.painter()
                    .circle_stroke(rect.center(), diameter * 0.5, Stroke::new(1.0, CIRCLE_STROKE));
                ui.label(&size.label);
            });
        }

        ui.add_space(8.0);
        ui.separator();
        ui.label("Fill");
        for swatch in &legend.swatches {
            ui.horizontal(|ui| {
                let (rect, _) =
                    ui.allocate_exact_size(vec2(LEGEND_SWATCH, LEGEND_SWATCH), Sense::hover());
                ui.painter().rect_filled(rect, 2.0, to_color32(swatch.color));
                ui.label(&swatch.label);
            });
        }

        let pinned = self.pinned.as_deref().and_then(|id| self.session.node(id));
        let inspected = pinned.or_else(|| {
            self.hovered
                .and_then(|index| self.session.nodes().get(index))
        });
        if let Some(node) = inspected {
            ui.add_space(12.0);
            ui.separator();
            if pinned.is_some() {
                ui.small("pinned, click empty space to release");
            }
            ui.label(egui::RichText::new(&node.name).strong());
            ui.label(format!("id {}", node.id));
            ui.label(self.session.metric().format_value(node.value));
            ui.colored_label(
                Color32::from_gray(110),
                format!("radius {:.1}px", node.radius),
            );
        }
    }
}
