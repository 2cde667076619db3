//! Spatial surrogate loader.
//!
//! Reads raw activity rows of the form
//! `region,vehicle,label,row,col,weight`. Weights are accumulated per cell
//! and normalized once the whole file is read. Period-varying surrogates
//! arrive with their day-type/period suffix already in the label column
//! (e.g. `vmt_monday_am`), matching the key convention the scalers build
//! through [`esta_core::calendar::surrogate_label`].

use crate::config::RunConfig;
use anyhow::{ensure, Context, Result};
use esta_core::region::Region;
use esta_core::surrogate::SpatialSurrogateData;
use log::info;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct SurrogateRow {
    region: u32,
    vehicle: String,
    label: String,
    row: usize,
    col: usize,
    weight: f32,
}

pub fn read_spatial<R: Read>(reader: R, regions: &HashSet<Region>) -> Result<SpatialSurrogateData> {
    let mut data = SpatialSurrogateData::new();
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<SurrogateRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("surrogate row at line {line}"))?;
        ensure!(
            row.weight >= 0.0,
            "negative surrogate weight {} at line {line}",
            row.weight
        );
        let region = Region(row.region);
        if !regions.contains(&region) {
            continue;
        }
        data.add_weight(region, &row.vehicle, &row.label, row.row, row.col, row.weight);
    }
    data.normalize();
    Ok(data)
}

pub fn load_spatial(config: &RunConfig) -> Result<SpatialSurrogateData> {
    let path = &config.inputs.spatial;
    let file = File::open(path)
        .with_context(|| format!("opening spatial surrogates {}", path.display()))?;
    let regions: HashSet<Region> = config.region_order().into_iter().collect();
    let data = read_spatial(file, &regions)
        .with_context(|| format!("loading spatial surrogates {}", path.display()))?;
    info!("loaded spatial surrogates from {}", path.display());
    Ok(data)
}
