use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use crate::scale::Rgb;

pub(super) const CIRCLE_STROKE: Color32 = Color32::from_rgb(0x33, 0x33, 0x33);
pub(super) const HOVER_STROKE: Color32 = Color32::from_rgb(0x00, 0x80, 0x00);
pub(super) const TOOLTIP_FILL: Color32 = Color32::from_rgb(0x62, 0x6d, 0x71);

pub(super) fn to_color32(color: Rgb) -> Color32 {
    Color32::from_rgb(color.red, color.green, color.blue)
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(246, 246, 242));

    let step = (64.0 * zoom.clamp(0.6, 1.8)).max(24.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(120, 120, 110, 28));

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

/// Pan and zoom that fit the world-space box `[min, max]` into `rect` with a margin.
pub(super) fn fit_view(rect: Rect, min: Vec2, max: Vec2) -> (Vec2, f32) {
    let span = (max - min).max(vec2(1.0, 1.0));
    let zoom = ((rect.width() / span.x).min(rect.height() / span.y) * 0.92).clamp(0.05, 6.0);
    let center = (min + max) * 0.5;
    (-center * zoom, zoom)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn fitted_view_centres_the_box() {
        let rect = Rect::from_min_size(Pos2::new(0.0, 0.0), vec2(1000.0, 500.0));
        let (pan, zoom) = fit_view(rect, vec2(100.0, 50.0), vec2(900.0, 450.0));

        assert_abs_diff_eq!(zoom, 1.15, epsilon = 1e-5);
        let centre = world_to_screen(rect, pan, zoom, vec2(500.0, 250.0));
        assert_abs_diff_eq!(centre.x, 500.0, epsilon = 1e-3);
        assert_abs_diff_eq!(centre.y, 250.0, epsilon = 1e-3);

        let corner = world_to_screen(rect, pan, zoom, vec2(900.0, 450.0));
        assert!(rect.contains(corner));
    }

    #[test]
    fn hover_point_maps_back_into_world_space() {
        let rect = Rect::from_min_size(Pos2::new(20.0, 40.0), vec2(800.0, 600.0));
        let pan = vec2(-35.0, 12.0);
        let world = screen_to_world(rect, pan, 2.0, Pos2::new(300.0, 200.0));
        let screen = world_to_screen(rect, pan, 2.0, world);
        assert_abs_diff_eq!(screen.x, 300.0, epsilon = 1e-4);
        assert_abs_diff_eq!(screen.y, 200.0, epsilon = 1e-4);
    }

    #[test]
    fn palette_colors_convert_exactly() {
        assert_eq!(
            to_color32(Rgb::new(0x2c, 0x7f, 0xb8)),
            Color32::from_rgb(0x2c, 0x7f, 0xb8)
        );
    }
}
