//! Fixed-width PMEDS text writer.
//!
//! One file per region-date named `pmeds_<region>_<date>.txt`. Each line
//! covers one grid cell of one category-hour, with the six inventoried
//! pollutants in fixed columns:
//!
//! ```text
//! cols  1-8   region name (left, truncated)
//! cols  9-12  air basin (left)
//! cols 13-17  region code (right)
//! cols 18-23  date YYMMDD
//! cols 24-25  hour 01-24
//! cols 26-39  EIC (right)
//! cols 40-43  grid row (right)
//! cols 44-47  grid column (right)
//! then six 10-wide pollutant fields (CO NOX SOX TOG PM NH3),
//! short tons/hour with five decimals
//! ```
//!
//! The format declares unspeciated tons/hour; attaching it to a speciated
//! run is rejected at pipeline construction.

use super::{compress_in_background, file_stem, OutputWriter};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use esta_core::emissions::Pollutant;
use esta_core::region::{Region, RegionRegistry};
use esta_core::scaled::{EmissionUnits, ScaledEmissions};
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct PmedsWriter {
    directory: PathBuf,
    regions: RegionRegistry,
    compress: bool,
}

impl PmedsWriter {
    pub fn new(directory: &Path, regions: RegionRegistry, compress: bool) -> Self {
        Self {
            directory: directory.to_path_buf(),
            regions,
            compress,
        }
    }

    fn path_for(&self, region: Region, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("pmeds_{}.txt", file_stem(region, date)))
    }

    fn region_labels(&self, region: Region) -> (String, String) {
        // The statewide sentinel has no configured metadata.
        match self.regions.get(region) {
            Ok(info) => (info.name.clone(), info.air_basin.clone()),
            Err(_) => ("STATE".to_string(), "".to_string()),
        }
    }
}

impl OutputWriter for PmedsWriter {
    fn name(&self) -> &'static str {
        "pmeds"
    }

    fn check_units(&self, units: EmissionUnits) -> Result<()> {
        if units != EmissionUnits::TonsPerHour {
            bail!(
                "the pmeds writer requires tons/hr output, got {}; use the gridded scaler",
                units.label()
            );
        }
        Ok(())
    }

    fn write(&self, unit: &ScaledEmissions) -> Result<()> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("creating output directory {}", self.directory.display()))?;

        let mut files: BTreeMap<(Region, NaiveDate), BufWriter<fs::File>> = BTreeMap::new();
        for (region, date, hour, eic, grid) in unit.iter() {
            // Collate per-cell pollutant columns across the six grids.
            let mut cells: BTreeMap<(usize, usize), [f32; 6]> = BTreeMap::new();
            for (slot, pollutant) in Pollutant::ALL.iter().enumerate() {
                if let Some(array) = grid.grid(pollutant.as_str()) {
                    let origin = grid.origin();
                    for ((r, c), &value) in array.indexed_iter() {
                        if value != 0.0 {
                            cells.entry((origin.0 + r, origin.1 + c)).or_insert([0.0; 6])
                                [slot] = value;
                        }
                    }
                }
            }
            if cells.is_empty() {
                continue;
            }

            let writer = match files.entry((region, date)) {
                std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::btree_map::Entry::Vacant(e) => {
                    let path = self.path_for(region, date);
                    let file = fs::File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    e.insert(BufWriter::new(file))
                }
            };

            let (name, basin) = self.region_labels(region);
            for ((row, col), values) in cells {
                write!(
                    writer,
                    "{:<8.8}{:<4.4}{:>5}{}{:02}{:>14}{:>4}{:>4}",
                    name,
                    basin,
                    region.value(),
                    date.format("%y%m%d"),
                    hour,
                    eic.value(),
                    row,
                    col
                )?;
                for value in values {
                    write!(writer, "{value:>10.5}")?;
                }
                writeln!(writer)?;
            }
        }

        for ((region, date), mut writer) in files {
            writer.flush()?;
            drop(writer);
            let path = self.path_for(region, date);
            info!("wrote {}", path.display());
            if self.compress {
                compress_in_background(&path);
            }
        }
        Ok(())
    }
}
