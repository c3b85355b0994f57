use std::f64::consts::{PI, TAU};

use eframe::egui::{Vec2, vec2};

use crate::config::ProjectionConfig;

const EPSILON: f64 = 1e-6;

/// Conic equal-area projection with a rotation, a centre and a pixel transform.
#[derive(Clone, Copy, Debug)]
struct ConicEqualArea {
    n: f64,
    c: f64,
    r0: f64,
    rotate: f64,
    center: (f64, f64),
    scale: f64,
    translate: (f64, f64),
}

impl ConicEqualArea {
    fn new(parallels: (f64, f64), rotate: f64, center: (f64, f64)) -> Self {
        let sin_first = parallels.0.to_radians().sin();
        let n = (sin_first + parallels.1.to_radians().sin()) / 2.0;
        let c = 1.0 + sin_first * (2.0 * n - sin_first);
        let r0 = c.sqrt() / n;

        let mut projection = Self {
            n,
            c,
            r0,
            rotate: rotate.to_radians(),
            center: (0.0, 0.0),
            scale: 1.0,
            translate: (0.0, 0.0),
        };
        projection.center = projection.raw(center.0.to_radians(), center.1.to_radians());
        projection
    }

    fn raw(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let r = (self.c - 2.0 * self.n * phi.sin()).max(0.0).sqrt() / self.n;
        let angle = lambda * self.n;
        (r * angle.sin(), self.r0 - r * angle.cos())
    }

    fn with_transform(mut self, scale: f64, translate: (f64, f64)) -> Self {
        self.scale = scale;
        self.translate = translate;
        self
    }

    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let mut lambda = lon.to_radians() + self.rotate;
        if lambda > PI {
            lambda -= TAU;
        } else if lambda < -PI {
            lambda += TAU;
        }

        let (x, y) = self.raw(lambda, lat.to_radians());
        (
            self.translate.0 + self.scale * (x - self.center.0),
            self.translate.1 - self.scale * (y - self.center.1),
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Extent {
    min: (f64, f64),
    max: (f64, f64),
}

impl Extent {
    fn contains(self, point: (f64, f64)) -> bool {
        point.0 >= self.min.0 && point.0 <= self.max.0 && point.1 >= self.min.1 && point.1 <= self.max.1
    }
}

/// Composite projection of the United States: the lower 48 states in an Albers
/// conic with Alaska and Hawaii drawn as insets below it.
#[derive(Clone, Debug)]
pub struct AlbersUsa {
    layers: [(ConicEqualArea, Extent); 3],
}

impl AlbersUsa {
    pub fn new(scale: f64, translate: (f64, f64)) -> Self {
        let k = scale;
        let (x, y) = translate;

        let lower48 = ConicEqualArea::new((29.5, 45.5), 96.0, (-0.6, 38.7))
            .with_transform(k, (x, y));
        let alaska = ConicEqualArea::new((55.0, 65.0), 154.0, (-2.0, 58.5))
            .with_transform(k * 0.35, (x - 0.307 * k, y + 0.201 * k));
        let hawaii = ConicEqualArea::new((8.0, 18.0), 157.0, (-3.0, 19.9))
            .with_transform(k, (x - 0.205 * k, y + 0.212 * k));

        Self {
            layers: [
                (
                    lower48,
                    Extent {
                        min: (x - 0.455 * k, y - 0.238 * k),
                        max: (x + 0.455 * k, y + 0.238 * k),
                    },
                ),
                (
                    alaska,
                    Extent {
                        min: (x - 0.425 * k + EPSILON, y + 0.120 * k + EPSILON),
                        max: (x - 0.214 * k - EPSILON, y + 0.234 * k - EPSILON),
                    },
                ),
                (
                    hawaii,
                    Extent {
                        min: (x - 0.214 * k + EPSILON, y + 0.166 * k + EPSILON),
                        max: (x - 0.115 * k - EPSILON, y + 0.234 * k - EPSILON),
                    },
                ),
            ],
        }
    }

    pub fn from_config(config: &ProjectionConfig) -> Self {
        Self::new(
            config.scale as f64,
            (config.translate[0] as f64, config.translate[1] as f64),
        )
    }

    /// Pixel position of a lon/lat pair, or `None` when it falls outside the lower 48
    /// and both insets.
    pub fn project(&self, lon: f64, lat: f64) -> Option<Vec2> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }

        self.layers.iter().find_map(|(projection, extent)| {
            let point = projection.project(lon, lat);
            extent
                .contains(point)
                .then(|| vec2(point.0 as f32, point.1 as f32))
        })
    }
}

impl Default for AlbersUsa {
    fn default() -> Self {
        Self::from_config(&ProjectionConfig::default())
    }
}
