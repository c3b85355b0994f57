use anyhow::{Result, bail};
use clap::ValueEnum;
use eframe::egui::Vec2;
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::data::Region;
use crate::layout::Simulation;
use crate::scale::{Legend, MetricScales, Rgb};
use crate::util::format_count;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Population,
    Income,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Income => "income",
        }
    }

    pub fn legend_title(self) -> &'static str {
        match self {
            Self::Population => "Total population",
            Self::Income => "Median household income",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Population => Self::Income,
            Self::Income => Self::Population,
        }
    }

    pub fn value_of(self, region: &Region) -> f64 {
        match self {
            Self::Population => region.population,
            Self::Income => region.income,
        }
    }

    pub fn format_value(self, value: f64) -> String {
        match self {
            Self::Population => format_count(value),
            Self::Income => format!("${}", format_count(value)),
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Population => 0,
            Self::Income => 1,
        }
    }
}

/// One circle of the cartogram.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub label: String,
    anchor: Vec2,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub value: f64,
}

impl Node {
    pub fn new(
        id: String,
        name: String,
        label: String,
        anchor: Vec2,
        value: f64,
        radius: f32,
    ) -> Self {
        Self {
            id,
            name,
            label,
            anchor,
            position: anchor,
            velocity: Vec2::ZERO,
            radius,
            value,
        }
    }

    /// Projected geographic position; fixed for the node's lifetime.
    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }
}

/// Emitted after every integration step.
#[derive(Clone, Copy, Debug)]
pub struct TickEvent<'a> {
    pub tick: u64,
    pub alpha: f32,
    pub nodes: &'a [Node],
}

struct MetricView {
    scales: MetricScales,
    legend: Legend,
}

/// Owns the node set, the active metric and the running simulation. Every
/// mutation goes through `&mut self`, so a metric switch can never interleave
/// with a tick.
pub struct LayoutSession {
    regions: Vec<Region>,
    nodes: Vec<Node>,
    metric: Metric,
    views: [MetricView; 2],
    simulation: Simulation,
}

impl LayoutSession {
    /// Projects every region and starts the layout. Regions the projection rejects
    /// are left out.
    pub fn new(
        regions: Vec<Region>,
        project: impl Fn(f64, f64) -> Option<Vec2>,
        config: &Config,
        metric: Metric,
    ) -> Result<Self> {
        let mut kept = Vec::with_capacity(regions.len());
        let mut anchors = Vec::with_capacity(regions.len());
        for region in regions {
            match project(region.lon, region.lat) {
                Some(anchor) if anchor.is_finite() => {
                    anchors.push(anchor);
                    kept.push(region);
                }
                _ => warn!(
                    "skipping {} ({}): ({}, {}) is outside the projection",
                    region.id, region.name, region.lon, region.lat
                ),
            }
        }

        if kept.is_empty() {
            bail!("none of the regions could be projected");
        }

        let view = |metric: Metric| -> Result<MetricView> {
            let values = kept
                .iter()
                .map(|region| metric.value_of(region))
                .collect::<Vec<_>>();
            let scales = MetricScales::fit(&values, config.metric(metric))?;
            let legend = Legend::new(metric.legend_title(), &scales.radius, &scales.color);
            Ok(MetricView { scales, legend })
        };
        let views = [view(Metric::Population)?, view(Metric::Income)?];

        let nodes = kept
            .iter()
            .zip(anchors)
            .map(|(region, anchor)| {
                Node::new(
                    region.id.clone(),
                    region.name.clone(),
                    region.label.clone(),
                    anchor,
                    0.0,
                    0.0,
                )
            })
            .collect();

        let mut session = Self {
            regions: kept,
            nodes,
            metric,
            views,
            simulation: Simulation::new(config.simulation),
        };
        session.apply_metric(metric);
        info!(
            "layout session ready with {} nodes, showing {}",
            session.nodes.len(),
            metric.label()
        );
        Ok(session)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn is_settling(&self) -> bool {
        self.simulation.is_running()
    }

    pub fn scales(&self) -> &MetricScales {
        &self.views[self.metric.slot()].scales
    }

    pub fn legend(&self) -> &Legend {
        &self.views[self.metric.slot()].legend
    }

    pub fn color_of(&self, index: usize) -> Option<Rgb> {
        let node = self.nodes.get(index)?;
        Some(self.scales().color.color_for(node.value, node.radius))
    }

    /// Runs one tick; `None` once the layout has converged.
    pub fn step(&mut self) -> Option<TickEvent<'_>> {
        if !self.simulation.tick(&mut self.nodes) {
            return None;
        }
        Some(TickEvent {
            tick: self.simulation.ticks(),
            alpha: self.simulation.alpha(),
            nodes: &self.nodes,
        })
    }

    /// Ticks until convergence or `max_ticks`, handing every tick to `on_tick`.
    pub fn run_to_convergence(
        &mut self,
        max_ticks: u64,
        mut on_tick: impl FnMut(&TickEvent<'_>),
    ) -> u64 {
        let mut count = 0;
        while count < max_ticks {
            let Some(event) = self.step() else {
                break;
            };
            on_tick(&event);
            count += 1;
        }
        count
    }

    /// Switches the displayed metric and relaunches the layout from the anchors.
    /// Returns `false` if `metric` is already active.
    pub fn set_metric(&mut self, metric: Metric) -> bool {
        if metric == self.metric {
            return false;
        }
        self.apply_metric(metric);
        true
    }

    pub fn toggle_metric(&mut self) -> Metric {
        self.set_metric(self.metric.other());
        self.metric
    }

    fn apply_metric(&mut self, metric: Metric) {
        self.metric = metric;
        let radius = self.views[metric.slot()].scales.radius;
        for (node, region) in self.nodes.iter_mut().zip(&self.regions) {
            node.value = metric.value_of(region);
            node.radius = radius.radius(node.value);
            node.position = node.anchor;
            node.velocity = Vec2::ZERO;
        }
        self.simulation.restart();
        debug!("restarted layout for {}", metric.label());
    }

    /// Index of the circle under `point`; the closest centre wins where circles
    /// overlap.
    pub fn node_at(&self, point: Vec2) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let distance = (node.position - point).length();
                (distance <= node.radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}
