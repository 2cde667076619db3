//! Totals reconciliation tester.
//!
//! Accumulates per-category pollutant totals from every streamed unit and,
//! after the run, writes a human-readable diff against the original
//! inventory reduced to the same EIC precision; reducing only one side of
//! the comparison would report phantom mismatches. Scaled totals include
//! the day-of-week factors, so a nonzero difference is expected on
//! off-peak day types; the report exists so a modeler can judge whether
//! the differences look like factors or like bugs.
//!
//! Meaningful for tons/hour output, where hourly grids summed over the day
//! are directly comparable to the tons/day input. Speciated runs change
//! both species set and units; the report then only covers species whose
//! names match inventory pollutants.

use super::OutputTester;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use esta_core::eic::{Eic, EicPrecision};
use esta_core::emissions::{EmissionsInventory, EmissionsTable, Pollutant};
use esta_core::region::Region;
use esta_core::scaled::ScaledEmissions;
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct TotalsTester {
    directory: PathBuf,
    precision: EicPrecision,
    totals: BTreeMap<(Region, NaiveDate), BTreeMap<(Eic, String), f32>>,
}

impl TotalsTester {
    pub fn new(directory: &Path, precision: EicPrecision) -> Self {
        Self {
            directory: directory.to_path_buf(),
            precision,
            totals: BTreeMap::new(),
        }
    }

    /// The inventory side of a comparison key: the region's own table, or
    /// every region combined for the statewide sentinel.
    fn inventory_table(
        &self,
        inventory: &EmissionsInventory,
        region: Region,
        date: NaiveDate,
    ) -> EmissionsTable {
        if region == Region::STATEWIDE {
            let mut combined = EmissionsTable::new();
            for (_, table_date, table) in inventory.iter() {
                if table_date == date {
                    combined.combine(table);
                }
            }
            combined.reduced(self.precision)
        } else {
            inventory
                .get(region, date)
                .cloned()
                .unwrap_or_default()
                .reduced(self.precision)
        }
    }
}

impl OutputTester for TotalsTester {
    fn name(&self) -> &'static str {
        "totals"
    }

    fn observe(&mut self, unit: &ScaledEmissions) -> Result<()> {
        for (region, date, _hour, eic, grid) in unit.iter() {
            let slot = self.totals.entry((region, date)).or_default();
            for species in grid.species() {
                *slot.entry((eic, species.to_string())).or_insert(0.0) += grid.total(species);
            }
        }
        Ok(())
    }

    fn report(&self, inventory: &EmissionsInventory) -> Result<()> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("creating output directory {}", self.directory.display()))?;
        let path = self.directory.join("totals_report.txt");
        let file =
            fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);

        writeln!(
            out,
            "{:>6} {:>10} {:>14} {:>5} {:>14} {:>14} {:>9}",
            "region", "date", "eic", "poll", "inventory", "scaled", "diff%"
        )?;
        for ((region, date), by_key) in &self.totals {
            let reference = self.inventory_table(inventory, *region, *date);
            for ((eic, species), &scaled) in by_key {
                // Species that are not inventory pollutants (speciated
                // output) have no reference value to diff against.
                let Ok(pollutant) = species.parse::<Pollutant>() else {
                    continue;
                };
                let reference_value = reference.get(*eic, pollutant);
                let diff = if reference_value != 0.0 {
                    (scaled - reference_value) / reference_value * 100.0
                } else if scaled == 0.0 {
                    0.0
                } else {
                    f32::INFINITY
                };
                writeln!(
                    out,
                    "{:>6} {:>10} {:>14} {:>5} {:>14.6} {:>14.6} {:>9.2}",
                    region, date, eic, species, reference_value, scaled, diff
                )?;
            }
        }
        out.flush()?;
        info!("wrote {}", path.display());
        Ok(())
    }
}
