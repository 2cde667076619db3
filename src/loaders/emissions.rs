//! Inventory dump loader.
//!
//! Reads aggregate emissions rows of the form
//! `region,date,eic,pollutant,value` with values in short tons/day. Rows
//! outside the configured region set or date range are skipped; everything
//! else must parse cleanly.

use super::InventoryLoader;
use crate::config::RunConfig;
use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;
use esta_core::eic::Eic;
use esta_core::emissions::{EmissionsInventory, Pollutant};
use esta_core::region::Region;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct EmissionsRow {
    region: u32,
    date: NaiveDate,
    eic: u64,
    pollutant: String,
    value: f32,
}

/// Read an inventory dump, keeping only rows within the run scope.
pub fn read_inventory<R: Read>(
    reader: R,
    regions: &HashSet<Region>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<EmissionsInventory> {
    let mut inventory = EmissionsInventory::new();
    let mut skipped = 0usize;
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<EmissionsRow>().enumerate() {
        let line = index + 2; // header is line 1
        let row = row.with_context(|| format!("emissions row at line {line}"))?;
        ensure!(
            row.value >= 0.0,
            "negative emissions value {} at line {line}",
            row.value
        );
        let region = Region(row.region);
        if !regions.contains(&region) || row.date < start || row.date > end {
            skipped += 1;
            continue;
        }
        let pollutant = row
            .pollutant
            .parse::<Pollutant>()
            .with_context(|| format!("emissions row at line {line}"))?;
        inventory.add_value(region, row.date, Eic(row.eic), pollutant, row.value);
    }
    debug!("skipped {skipped} emissions rows outside the run scope");
    Ok(inventory)
}

/// The standard CSV inventory loader.
pub struct CsvInventoryLoader;

impl InventoryLoader for CsvInventoryLoader {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn load(&self, config: &RunConfig) -> Result<EmissionsInventory> {
        let path = &config.inputs.emissions;
        let file = File::open(path)
            .with_context(|| format!("opening emissions inventory {}", path.display()))?;
        let regions: HashSet<Region> = config.region_order().into_iter().collect();
        let inventory = read_inventory(file, &regions, config.dates.start, config.dates.end)
            .with_context(|| format!("loading emissions inventory {}", path.display()))?;
        info!(
            "loaded {} region-day emissions tables from {}",
            inventory.len(),
            path.display()
        );
        Ok(inventory)
    }
}
