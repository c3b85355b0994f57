use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use log::debug;

use super::Region;
use super::shapes::ShapeFeature;
use super::table::TableRow;

const ID_WIDTH: usize = 2;

/// Join key for a raw region id: trimmed and left-padded with zeros to two
/// characters (`"6"` becomes `"06"`).
pub fn pad_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed:0>width$}", width = ID_WIDTH)
}

/// Every shape feature must find its row in the table; rows without a feature are
/// dropped.
pub fn join(shapes: Vec<ShapeFeature>, rows: Vec<TableRow>) -> Result<Vec<Region>> {
    let mut by_id = HashMap::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone();
        if by_id.insert(id.clone(), row).is_some() {
            bail!("duplicate id {id} in tabular dataset");
        }
    }

    let mut seen = HashSet::with_capacity(shapes.len());
    let mut regions = Vec::with_capacity(shapes.len());
    for feature in shapes {
        if !seen.insert(feature.id.clone()) {
            bail!("duplicate id {} in shape dataset", feature.id);
        }

        let Some(row) = by_id.remove(&feature.id) else {
            bail!(
                "no tabular row for region {} ({})",
                feature.id,
                feature.name
            );
        };

        if let Some(embedded) = feature.population
            && embedded != row.population
        {
            debug!(
                "population for {} differs between shapes ({embedded}) and table ({})",
                feature.id, row.population
            );
        }

        regions.push(Region {
            id: feature.id,
            name: feature.name,
            label: feature.label,
            lon: feature.lon,
            lat: feature.lat,
            population: row.population,
            income: row.income,
        });
    }

    if !by_id.is_empty() {
        let mut unmatched = by_id.into_keys().collect::<Vec<_>>();
        unmatched.sort();
        debug!("ignoring table rows without a shape: {}", unmatched.join(", "));
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(id: &str, name: &str) -> ShapeFeature {
        ShapeFeature {
            id: id.to_owned(),
            name: name.to_owned(),
            label: name[..2].to_uppercase(),
            lon: -100.0,
            lat: 40.0,
            population: None,
        }
    }

    fn row(id: &str, population: f64, income: f64) -> TableRow {
        TableRow {
            id: id.to_owned(),
            population,
            income,
        }
    }

    #[test]
    fn pads_to_two_characters() {
        assert_eq!(pad_id("6"), "06");
        assert_eq!(pad_id(" 6 "), "06");
        assert_eq!(pad_id("06"), "06");
        assert_eq!(pad_id("72"), "72");
        assert_eq!(pad_id("123"), "123");
        assert_eq!(pad_id(""), "");
    }

    #[test]
    fn every_feature_gets_its_values() -> Result<()> {
        let regions = join(
            vec![feature("06", "California"), feature("36", "New York")],
            vec![
                row("36", 19_849_399.0, 64_894.0),
                row("06", 39_536_653.0, 71_805.0),
                row("72", 3_337_177.0, 19_775.0),
            ],
        )?;

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].id, "06");
        assert_eq!(regions[0].population, 39_536_653.0);
        assert_eq!(regions[1].income, 64_894.0);
        Ok(())
    }

    #[test]
    fn table_population_wins_over_the_embedded_one() -> Result<()> {
        let mut california = feature("06", "California");
        california.population = Some(37_253_956.0);
        let regions = join(vec![california], vec![row("06", 39_536_653.0, 71_805.0)])?;
        assert_eq!(regions[0].population, 39_536_653.0);
        Ok(())
    }

    #[test]
    fn missing_row_is_an_error() {
        let error = join(vec![feature("06", "California")], vec![row("36", 1.0, 1.0)])
            .unwrap_err();
        assert!(error.to_string().contains("06"));
    }

    #[test]
    fn duplicate_ids_are_errors() {
        assert!(
            join(
                vec![feature("06", "California")],
                vec![row("06", 1.0, 1.0), row("06", 2.0, 2.0)],
            )
            .is_err()
        );
        assert!(
            join(
                vec![feature("06", "California"), feature("06", "Calif")],
                vec![row("06", 1.0, 1.0)],
            )
            .is_err()
        );
    }
}
