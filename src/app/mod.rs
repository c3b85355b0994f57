use eframe::egui::{self, Context, Vec2};
use log::info;

use crate::config::ViewerConfig;
use crate::layout::CellOutline;
use crate::session::{LayoutSession, TickEvent};

mod panels;
mod render_utils;
mod view;

pub struct CartogramApp {
    session: LayoutSession,
    viewer: ViewerConfig,
    pan: Vec2,
    zoom: f32,
    view_fitted: bool,
    show_quadtree_overlay: bool,
    quadtree_outlines: Vec<CellOutline>,
    hovered: Option<usize>,
    pinned: Option<String>,
    last_tick: Option<TickStatus>,
}

/// Snapshot of the most recent tick for the status readout.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TickStatus {
    tick: u64,
    alpha: f32,
    top_speed: f32,
}

impl TickStatus {
    fn from_event(event: &TickEvent<'_>) -> Self {
        Self {
            tick: event.tick,
            alpha: event.alpha,
            top_speed: event
                .nodes
                .iter()
                .map(|node| node.velocity.length())
                .fold(0.0, f32::max),
        }
    }
}

impl CartogramApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        session: LayoutSession,
        viewer: ViewerConfig,
    ) -> Self {
        Self {
            session,
            viewer,
            pan: Vec2::ZERO,
            zoom: 1.0,
            view_fitted: false,
            show_quadtree_overlay: false,
            quadtree_outlines: Vec::new(),
            hovered: None,
            pinned: None,
            last_tick: None,
        }
    }

    /// Advances the layout by at most `ticks_per_frame` steps.
    fn advance_layout(&mut self) -> bool {
        for _ in 0..self.viewer.ticks_per_frame.max(1) {
            let Some(event) = self.session.step() else {
                break;
            };
            self.last_tick = Some(TickStatus::from_event(&event));
        }
        self.session.is_settling()
    }

    fn toggle_metric(&mut self) {
        let metric = self.session.toggle_metric();
        self.hovered = None;
        self.last_tick = None;
        info!("showing {}", metric.label());
    }
}

impl eframe::App for CartogramApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut toggle_requested = false;

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui, &mut toggle_requested));

        egui::SidePanel::right("legend")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| self.draw_legend(ui));

        if toggle_requested {
            self.toggle_metric();
        }

        egui::CentralPanel::default().show(ctx, |ui| self.draw_canvas(ui));
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::session::Node;

    #[test]
    fn tick_status_reports_the_fastest_node() {
        let mut nodes = (0..3)
            .map(|index| {
                Node::new(
                    format!("{index:02}"),
                    format!("State {index}"),
                    format!("S{index}"),
                    vec2(index as f32 * 40.0, 0.0),
                    1.0,
                    10.0,
                )
            })
            .collect::<Vec<_>>();
        nodes[1].velocity = vec2(3.0, 4.0);
        nodes[2].velocity = vec2(-1.0, 0.0);

        let event = TickEvent {
            tick: 7,
            alpha: 0.5,
            nodes: &nodes,
        };
        assert_eq!(
            TickStatus::from_event(&event),
            TickStatus {
                tick: 7,
                alpha: 0.5,
                top_speed: 5.0,
            }
        );
    }
}
