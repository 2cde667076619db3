//! Category map loader.
//!
//! Rows of the form `eic,vehicle,activity,class` map each inventoried
//! category to its spatial surrogate key and CalVad temporal class.

use crate::config::RunConfig;
use anyhow::{Context, Result};
use esta_core::categories::{CalvadClass, CategoryInfo, CategoryMap};
use esta_core::eic::Eic;
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CategoryRow {
    eic: u64,
    vehicle: String,
    activity: String,
    class: String,
}

pub fn read_categories<R: Read>(reader: R) -> Result<CategoryMap> {
    let mut map = CategoryMap::new();
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<CategoryRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("category row at line {line}"))?;
        let class: CalvadClass = row
            .class
            .parse()
            .with_context(|| format!("category row at line {line}"))?;
        map.insert(
            Eic(row.eic),
            CategoryInfo {
                vehicle: row.vehicle,
                activity: row.activity,
                class,
            },
        );
    }
    Ok(map)
}

pub fn load_categories(config: &RunConfig) -> Result<CategoryMap> {
    let path = &config.inputs.categories;
    let file =
        File::open(path).with_context(|| format!("opening category map {}", path.display()))?;
    let map = read_categories(file)
        .with_context(|| format!("loading category map {}", path.display()))?;
    info!("loaded {} categories from {}", map.len(), path.display());
    Ok(map)
}
