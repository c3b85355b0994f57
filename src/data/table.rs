use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;

use super::join::pad_id;

/// The population column really is spelled `toal_pop` in the ACS extract.
#[derive(Debug, Deserialize)]
struct RawRow {
    id: String,
    #[serde(rename = "toal_pop")]
    total_population: f64,
    median_income: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub population: f64,
    pub income: f64,
}

pub fn parse_table(reader: impl Read) -> Result<Vec<TableRow>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in csv_reader.deserialize::<RawRow>().enumerate() {
        let raw = record.with_context(|| format!("invalid row #{} in tabular dataset", index + 1))?;
        rows.push(TableRow {
            id: pad_id(&raw.id),
            population: raw.total_population,
            income: raw.median_income,
        });
    }

    Ok(rows)
}

pub fn read_table(path: &Path) -> Result<Vec<TableRow>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open tabular dataset {}", path.display()))?;
    parse_table(file).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_ids_and_reads_misspelled_population_column() -> Result<()> {
        let raw = "id,name,toal_pop,median_income\n6,California,39536653,71805\n 36 ,New York,19849399,64894\n";
        let rows = parse_table(raw.as_bytes())?;

        assert_eq!(
            rows,
            vec![
                TableRow {
                    id: "06".to_owned(),
                    population: 39_536_653.0,
                    income: 71_805.0,
                },
                TableRow {
                    id: "36".to_owned(),
                    population: 19_849_399.0,
                    income: 64_894.0,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn corrected_column_name_is_not_accepted() {
        let raw = "id,total_pop,median_income\n6,39536653,71805\n";
        assert!(parse_table(raw.as_bytes()).is_err());
    }

    #[test]
    fn non_numeric_values_fail_the_load() {
        let raw = "id,toal_pop,median_income\n6,lots,71805\n";
        let error = parse_table(raw.as_bytes()).unwrap_err();
        assert!(format!("{error:#}").contains("row #1"));
    }
}
