use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2, vec2};

use crate::layout::quadtree_outlines;

use super::CartogramApp;
use super::render_utils::{
    CIRCLE_STROKE, HOVER_STROKE, TOOLTIP_FILL, circle_visible, draw_background, fit_view,
    screen_to_world, to_color32, world_to_screen,
};

impl CartogramApp {
    pub(super) fn reset_view(&mut self) {
        self.view_fitted = false;
    }

    fn fit_to_anchors(&mut self, rect: Rect) {
        let nodes = self.session.nodes();
        let Some(first) = nodes.first() else {
            return;
        };
        let (min, max) = nodes.iter().fold(
            (first.anchor(), first.anchor()),
            |(min, max), node| {
                let reach = Vec2::splat(node.radius);
                (
                    min.min(node.anchor() - reach),
                    max.max(node.anchor() + reach),
                )
            },
        );
        (self.pan, self.zoom) = fit_view(rect, min, max);
        self.view_fitted = true;
    }

    fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
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
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 6.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    fn handle_pan(&mut self, response: &egui::Response) {
        if response.dragged() {
            self.pan += response.drag_delta();
        }
    }

    pub(super) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if !self.view_fitted {
            self.fit_to_anchors(rect);
        }
        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_zoom(ui, rect, &response);
        self.handle_pan(&response);

        if self.advance_layout() || response.dragged() {
            ui.ctx().request_repaint();
        }

        let (pan, zoom) = (self.pan, self.zoom);

        if self.show_quadtree_overlay {
            quadtree_outlines(self.session.nodes(), &mut self.quadtree_outlines);
            for cell in &self.quadtree_outlines {
                let extent = Vec2::splat(cell.half_extent);
                let min = world_to_screen(rect, pan, zoom, cell.center - extent);
                let max = world_to_screen(rect, pan, zoom, cell.center + extent);
                let alpha = if cell.is_leaf { 110 } else { 55 };
                let width = (1.4 - cell.depth as f32 * 0.09).clamp(0.45, 1.4);
                painter.rect_stroke(
                    Rect::from_min_max(min, max),
                    0.0,
                    Stroke::new(width, Color32::from_rgba_unmultiplied(40, 120, 200, alpha)),
                    egui::StrokeKind::Middle,
                );
            }
        }

        self.hovered = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| {
                self.session
                    .node_at(screen_to_world(rect, pan, zoom, pointer))
            });
        if self.hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }
        if response.clicked_by(egui::PointerButton::Primary) {
            self.pinned = self
                .hovered
                .and_then(|index| self.session.nodes().get(index))
                .map(|node| node.id.clone());
        }

        for (index, node) in self.session.nodes().iter().enumerate() {
            let position = world_to_screen(rect, pan, zoom, node.position);
            let radius = node.radius * zoom;
            if !circle_visible(rect, position, radius) {
                continue;
            }

            let fill = self
                .session
                .color_of(index)
                .map_or(Color32::GRAY, to_color32);
            painter.circle_filled(position, radius, fill);

            let stroke = if self.hovered == Some(index) {
                Stroke::new(2.0, HOVER_STROKE)
            } else if self.pinned.as_deref() == Some(node.id.as_str()) {
                Stroke::new(2.5, CIRCLE_STROKE)
            } else {
                Stroke::new(1.0, CIRCLE_STROKE)
            };
            painter.circle_stroke(position, radius, stroke);

            if radius >= self.viewer.label_min_radius {
                painter.text(
                    position,
                    Align2::CENTER_CENTER,
                    &node.label,
                    FontId::proportional((radius * 0.55).clamp(9.0, 16.0)),
                    Color32::from_gray(25),
                );
            }
        }

        if let Some(index) = self.hovered
            && let Some(pointer) = ui.input(|input| input.pointer.hover_pos())
        {
            self.draw_tooltip(&painter, rect, index, pointer);
        }
    }

    fn draw_tooltip(&self, painter: &egui::Painter, rect: Rect, index: usize, pointer: Pos2) {
        let Some(node) = self.session.nodes().get(index) else {
            return;
        };

        let text = format!(
            "{}\n{}",
            node.name,
            self.session.metric().format_value(node.value)
        );
        let galley = painter.layout_no_wrap(text, FontId::monospace(13.0), Color32::WHITE);
        let padding = vec2(8.0, 8.0);
        let size = galley.size() + padding * 2.0;

        let mut min = pointer + vec2(10.0, -10.0);
        if min.x + size.x > rect.right() {
            min.x = pointer.x - 10.0 - size.x;
        }
        min.y = min.y.clamp(rect.top(), (rect.bottom() - size.y).max(rect.top()));

        let frame = Rect::from_min_size(min, size);
        painter.rect_filled(frame, 6.0, TOOLTIP_FILL);
        painter.galley(frame.min + padding, galley, Color32::WHITE);
    }
}
