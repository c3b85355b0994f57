use anyhow::{Result, anyhow, bail};
use palette::{FromColor, Lch, Mix, Srgb};

use crate::config::{ColorScheme, MetricConfig};
use crate::util::format_compact;

pub type Rgb = Srgb<u8>;

pub fn parse_hex(raw: &str) -> Result<Rgb> {
    let digits = raw.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        bail!("invalid hex color {raw:?}");
    }
    let channel = |text: &str| {
        u8::from_str_radix(text, 16).map_err(|_| anyhow!("invalid hex color {raw:?}"))
    };

    match digits.len() {
        6 => Ok(Rgb::new(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        3 => {
            let expand = |index: usize| channel(&digits[index..index + 1]).map(|v| v * 17);
            Ok(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => bail!("invalid hex color {raw:?}; expected #rgb or #rrggbb"),
    }
}

fn sqrt_signed(value: f64) -> f64 {
    if value < 0.0 {
        -(-value).sqrt()
    } else {
        value.sqrt()
    }
}

/// Square-root scale: circle area grows linearly with the value. Output is
/// clamped to the range, and a collapsed domain maps everything to the middle of
/// the range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SqrtScale {
    domain: (f64, f64),
    range: (f32, f32),
}

impl SqrtScale {
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    pub fn fit(values: impl IntoIterator<Item = f64>, range: (f32, f32)) -> Self {
        Self::new(extent(values).unwrap_or((0.0, 0.0)), range)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn radius(&self, value: f64) -> f32 {
        let (r0, r1) = self.range;
        if !value.is_finite() {
            return r0.max(0.0);
        }

        let low = sqrt_signed(self.domain.0);
        let high = sqrt_signed(self.domain.1);
        let span = high - low;
        let t = if span.abs() <= f64::EPSILON || !span.is_finite() {
            0.5
        } else {
            ((sqrt_signed(value) - low) / span).clamp(0.0, 1.0)
        };

        (r0 + (t as f32) * (r1 - r0)).max(0.0)
    }
}

pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColorScale {
    Interpolated {
        from: Rgb,
        to: Rgb,
        radius_domain: (f32, f32),
    },
    Quantized {
        max: f64,
        palette: Vec<Rgb>,
    },
}

impl ColorScale {
    pub fn from_scheme(
        scheme: &ColorScheme,
        radius_range: (f32, f32),
        max_value: f64,
    ) -> Result<Self> {
        match scheme {
            ColorScheme::Interpolated { from, to } => Ok(Self::Interpolated {
                from: parse_hex(from)?,
                to: parse_hex(to)?,
                radius_domain: radius_range,
            }),
            ColorScheme::Quantized { palette } => {
                if palette.is_empty() {
                    bail!("quantized color scale needs at least one color");
                }
                Ok(Self::Quantized {
                    max: max_value,
                    palette: palette
                        .iter()
                        .map(|color| parse_hex(color))
                        .collect::<Result<Vec<_>>>()?,
                })
            }
        }
    }

    /// The interpolated variant is keyed by radius, the quantized one by raw value.
    pub fn color_for(&self, value: f64, radius: f32) -> Rgb {
        match self {
            Self::Interpolated {
                from,
                to,
                radius_domain,
            } => {
                let (low, high) = *radius_domain;
                let span = high - low;
                let t = if span.abs() <= f32::EPSILON || !radius.is_finite() {
                    0.5
                } else {
                    ((radius - low) / span).clamp(0.0, 1.0)
                };
                interpolate_hcl(*from, *to, t)
            }
            Self::Quantized { palette, .. } => {
                let index = self.bucket(value).unwrap_or(0);
                palette
                    .get(index)
                    .or(palette.last())
                    .copied()
                    .unwrap_or(Rgb::new(0x80, 0x80, 0x80))
            }
        }
    }

    pub fn bucket(&self, value: f64) -> Option<usize> {
        let Self::Quantized { max, palette } = self else {
            return None;
        };

        let count = palette.len();
        if count == 0 {
            return None;
        }
        if !max.is_finite() || *max <= 0.0 || !value.is_finite() {
            return Some(0);
        }

        let scaled = (value / max * count as f64).floor();
        Some(scaled.clamp(0.0, (count - 1) as f64) as usize)
    }

    /// `[low, high)` value bounds and color of every bucket.
    pub fn buckets(&self) -> Vec<(f64, f64, Rgb)> {
        let Self::Quantized { max, palette } = self else {
            return Vec::new();
        };

        let width = max.max(0.0) / palette.len() as f64;
        palette
            .iter()
            .enumerate()
            .map(|(index, color)| (width * index as f64, width * (index + 1) as f64, *color))
            .collect()
    }
}

fn interpolate_hcl(from: Rgb, to: Rgb, t: f32) -> Rgb {
    let start: Lch = Lch::from_color(from.into_format::<f32>());
    let end: Lch = Lch::from_color(to.into_format::<f32>());
    let mixed = start.mix(&end, t);
    let rgb: Srgb = Srgb::from_color(mixed);
    rgb.into_format::<u8>()
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendSize {
    pub label: String,
    pub value: f64,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendSwatch {
    pub label: String,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Legend {
    pub title: String,
    pub sizes: Vec<LegendSize>,
    pub swatches: Vec<LegendSwatch>,
}

impl Legend {
    pub fn new(title: &str, radius: &SqrtScale, color: &ColorScale) -> Self {
        let (min, max) = radius.domain();
        let mid = {
            // Value whose radius sits halfway between the extremes.
            let low = sqrt_signed(min);
            let high = sqrt_signed(max);
            let root = (low + high) * 0.5;
            root * root.abs()
        };

        let mut samples = vec![min, mid, max];
        samples.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON);
        let sizes = samples
            .into_iter()
            .map(|value| LegendSize {
                label: format_compact(value),
                value,
                radius: radius.radius(value),
            })
            .collect();

        let swatches = match color {
            ColorScale::Interpolated { .. } => [min, max]
                .into_iter()
                .map(|value| LegendSwatch {
                    label: format_compact(value),
                    color: color.color_for(value, radius.radius(value)),
                })
                .collect(),
            ColorScale::Quantized { .. } => color
                .buckets()
                .into_iter()
                .map(|(low, high, rgb)| LegendSwatch {
                    label: format!("{} - {}", format_compact(low), format_compact(high)),
                    color: rgb,
                })
                .collect(),
        };

        Self {
            title: title.to_owned(),
            sizes,
            swatches,
        }
    }
}

/// Radius and color mappings for the active metric.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricScales {
    pub radius: SqrtScale,
    pub color: ColorScale,
}

impl MetricScales {
    pub fn fit(values: &[f64], config: &MetricConfig) -> Result<Self> {
        let [low, high] = config.radius_range;
        let radius = SqrtScale::fit(values.iter().copied(), (low, high));
        let color = ColorScale::from_scheme(&config.color, radius.range(), radius.domain().1)?;
        Ok(Self { radius, color })
    }
}
