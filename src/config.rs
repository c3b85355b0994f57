use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::scale::parse_hex;
use crate::session::Metric;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub projection: ProjectionConfig,
    pub population: MetricConfig,
    pub income: MetricConfig,
    pub simulation: SimulationConfig,
    pub viewer: ViewerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            population: MetricConfig::population(),
            income: MetricConfig::income(),
            simulation: SimulationConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub scale: f32,
    pub translate: [f32; 2],
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            scale: 1070.0,
            translate: [480.0, 250.0],
        }
    }
}

/// Visual encoding of one metric: the pixel radius range its values are mapped onto
/// and the color scheme used to fill the circles.
#[derive(Clone, Debug, Deserialize)]
pub struct MetricConfig {
    pub radius_range: [f32; 2],
    pub color: ColorScheme,
}

impl MetricConfig {
    pub fn population() -> Self {
        Self {
            radius_range: [8.0, 55.0],
            color: ColorScheme::Interpolated {
                from: "#007AFF".to_owned(),
                to: "#FEB24C".to_owned(),
            },
        }
    }

    pub fn income() -> Self {
        Self {
            radius_range: [5.0, 30.0],
            color: ColorScheme::Quantized {
                palette: ["#ffffcc", "#a1dab4", "#41b6c4", "#2c7fb8", "#253494"]
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            },
        }
    }

    fn validate(&self, metric: Metric) -> Result<()> {
        let [low, high] = self.radius_range;
        if !low.is_finite() || !high.is_finite() || low < 0.0 || high < low {
            bail!(
                "invalid radius range [{low}, {high}] for {}; expected 0 <= min <= max",
                metric.label()
            );
        }

        match &self.color {
            ColorScheme::Interpolated { from, to } => {
                parse_hex(from).with_context(|| format!("bad color for {}", metric.label()))?;
                parse_hex(to).with_context(|| format!("bad color for {}", metric.label()))?;
            }
            ColorScheme::Quantized { palette } => {
                if palette.is_empty() {
                    bail!("quantized palette for {} is empty", metric.label());
                }
                for color in palette {
                    parse_hex(color)
                        .with_context(|| format!("bad palette color for {}", metric.label()))?;
                }
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorScheme {
    /// Continuous HCL interpolation keyed by circle radius.
    Interpolated { from: String, to: String },
    /// Equal-width buckets over `[0, max]`, one palette entry per bucket.
    Quantized { palette: Vec<String> },
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub alpha_min: f32,
    pub alpha_decay: Option<f32>,
    pub alpha_target: f32,
    pub velocity_decay: f32,
    pub anchor_strength: f32,
    pub charge_strength: f32,
    pub collision_strength: f32,
    pub collision_iterations: usize,
    pub theta: f32,
    pub settle_tolerance: f32,
    pub settle_max_passes: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha_min: 0.001,
            alpha_decay: None,
            alpha_target: 0.0,
            velocity_decay: 0.4,
            anchor_strength: 0.1,
            charge_strength: 1.0,
            collision_strength: 1.0,
            collision_iterations: 4,
            theta: 0.9,
            settle_tolerance: 0.01,
            settle_max_passes: 500,
        }
    }
}

impl SimulationConfig {
    /// Decay that takes alpha from 1 to `alpha_min` in 300 ticks unless overridden.
    pub fn effective_alpha_decay(&self) -> f32 {
        self.alpha_decay
            .unwrap_or_else(|| 1.0 - self.alpha_min.powf(1.0 / 300.0))
    }

    fn validate(&self) -> Result<()> {
        if !(self.alpha_min > 0.0 && self.alpha_min < 1.0) {
            bail!("simulation.alpha_min must be in (0, 1), got {}", self.alpha_min);
        }
        let decay = self.effective_alpha_decay();
        if !(decay > 0.0 && decay < 1.0) {
            bail!("simulation.alpha_decay must be in (0, 1), got {decay}");
        }
        if !(0.0..=1.0).contains(&self.velocity_decay) {
            bail!(
                "simulation.velocity_decay must be in [0, 1], got {}",
                self.velocity_decay
            );
        }
        if !(self.alpha_target >= 0.0 && self.alpha_target < self.alpha_min) {
            bail!("simulation.alpha_target must be in [0, alpha_min)");
        }
        if self.collision_iterations == 0 {
            bail!("simulation.collision_iterations must be at least 1");
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: f32,
    pub height: f32,
    pub ticks_per_frame: usize,
    pub label_min_radius: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 640.0,
            ticks_per_frame: 1,
            label_min_radius: 12.0,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<Self>(&raw)
                    .with_context(|| format!("invalid config JSON in {}", path.display()))?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn metric(&self, metric: Metric) -> &MetricConfig {
        match metric {
            Metric::Population => &self.population,
            Metric::Income => &self.income,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.projection.scale.is_finite() && self.projection.scale > 0.0) {
            bail!("projection.scale must be positive");
        }
        self.population.validate(Metric::Population)?;
        self.income.validate(Metric::Income)?;
        self.simulation.validate()
    }
}
