use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::Value;

use super::join::pad_id;

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: RawProperties,
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    population: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeFeature {
    pub id: String,
    pub name: String,
    pub label: String,
    pub lon: f64,
    pub lat: f64,
    /// Population embedded in the feature, if any; the table stays authoritative.
    pub population: Option<f64>,
}

fn feature_id(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn lon_lat(coordinates: &[f64]) -> Option<(f64, f64)> {
    match coordinates {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some((*lon, *lat)),
        _ => None,
    }
}

impl RawGeometry {
    /// Single representative coordinate; multi-point geometries use the mean.
    fn representative(&self) -> Option<(f64, f64)> {
        match self {
            Self::Point { coordinates } => lon_lat(coordinates),
            Self::MultiPoint { coordinates } => {
                let points = coordinates
                    .iter()
                    .map(|point| lon_lat(point))
                    .collect::<Option<Vec<_>>>()?;
                if points.is_empty() {
                    return None;
                }
                let count = points.len() as f64;
                let (lon_sum, lat_sum) = points
                    .iter()
                    .fold((0.0, 0.0), |(lon, lat), point| (lon + point.0, lat + point.1));
                Some((lon_sum / count, lat_sum / count))
            }
        }
    }
}

pub fn parse_shapes(raw: &str) -> Result<Vec<ShapeFeature>> {
    let collection: RawCollection =
        serde_json::from_str(raw).context("invalid GeoJSON in shape dataset")?;
    if collection.kind != "FeatureCollection" {
        bail!(
            "expected a GeoJSON FeatureCollection, found {:?}",
            collection.kind
        );
    }

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| -> Result<ShapeFeature> {
            let id = feature_id(feature.id.as_ref())
                .map(|id| pad_id(&id))
                .filter(|id| !id.is_empty())
                .ok_or_else(|| anyhow!("feature #{index} has no usable id"))?;
            let (lon, lat) = feature
                .geometry
                .as_ref()
                .and_then(RawGeometry::representative)
                .ok_or_else(|| anyhow!("feature {id} has no usable point geometry"))?;
            let name = feature.properties.name.unwrap_or_else(|| id.clone());
            let label = feature.properties.label.unwrap_or_else(|| name.clone());

            Ok(ShapeFeature {
                id,
                name,
                label,
                lon,
                lat,
                population: feature.properties.population,
            })
        })
        .collect()
}

pub fn read_shapes(path: &Path) -> Result<Vec<ShapeFeature>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read shape dataset {}", path.display()))?;
    parse_shapes(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
