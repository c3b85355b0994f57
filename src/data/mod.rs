mod join;
mod shapes;
mod table;

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;

use join::join;
use shapes::read_shapes;
use table::read_table;

/// A region with its geographic centroid and every tracked metric.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub label: String,
    pub lon: f64,
    pub lat: f64,
    pub population: f64,
    pub income: f64,
}

pub fn load_regions(shapes_path: &Path, table_path: &Path) -> Result<Vec<Region>> {
    let shapes = read_shapes(shapes_path)?;
    let rows = read_table(table_path)?;
    info!(
        "read {} shape features from {} and {} rows from {}",
        shapes.len(),
        shapes_path.display(),
        rows.len(),
        table_path.display()
    );

    let regions = join(shapes, rows).context("failed to join shape and tabular datasets")?;
    if regions.is_empty() {
        bail!("shape dataset {} contains no regions", shapes_path.display());
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const SHAPES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "id": "06", "properties": { "name": "California", "label": "CA" },
              "geometry": { "type": "Point", "coordinates": [-119.4, 37.2] } },
            { "type": "Feature", "id": "09", "properties": { "name": "Connecticut", "label": "CT" },
              "geometry": { "type": "Point", "coordinates": [-72.7, 41.6] } },
            { "type": "Feature", "id": "48", "properties": { "name": "Texas", "label": "TX" },
              "geometry": { "type": "Point", "coordinates": [-99.3, 31.4] } }
        ]
    }"#;

    const TABLE: &str = "id,toal_pop,median_income\n6,39536653,71805\n9,3588184,73781\n48,28304596,57051\n";

    fn fixture(contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn loads_and_joins_both_sources() -> Result<()> {
        let shapes = fixture(SHAPES)?;
        let table = fixture(TABLE)?;

        let regions = load_regions(shapes.path(), table.path())?;
        let ids = regions.iter().map(|region| region.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["06", "09", "48"]);
        assert!(regions.iter().all(|region| region.population > 0.0 && region.income > 0.0));
        assert_eq!(regions[1].label, "CT");
        assert_eq!(regions[1].population, 3_588_184.0);
        Ok(())
    }

    #[test]
    fn unreadable_source_fails_fast() -> Result<()> {
        let shapes = fixture(SHAPES)?;
        let missing = Path::new("/nonexistent/acs_pop_income.csv");
        let error = load_regions(shapes.path(), missing).unwrap_err();
        assert!(format!("{error:#}").contains("acs_pop_income.csv"));
        Ok(())
    }

    #[test]
    fn malformed_shapes_fail_fast() -> Result<()> {
        let shapes = fixture("{ \"type\": \"FeatureCollection\", ")?;
        let table = fixture(TABLE)?;
        assert!(load_regions(shapes.path(), table.path()).is_err());
        Ok(())
    }
}
