//! Gridded CSV writer.
//!
//! One file per region-date named `emis_<region>_<date>.csv`, holding every
//! nonzero cell as `region,date,hour,eic,species,row,col,value`. Values are
//! written in the scaler's own units (tons/hour unspeciated, moles/second
//! speciated); the `units` column records which.

use super::{compress_in_background, file_stem, OutputWriter};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use esta_core::region::Region;
use esta_core::scaled::ScaledEmissions;
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CseWriter {
    directory: PathBuf,
    compress: bool,
}

impl CseWriter {
    pub fn new(directory: &Path, compress: bool) -> Self {
        Self {
            directory: directory.to_path_buf(),
            compress,
        }
    }

    fn path_for(&self, region: Region, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("emis_{}.csv", file_stem(region, date)))
    }
}

impl OutputWriter for CseWriter {
    fn name(&self) -> &'static str {
        "cse"
    }

    fn write(&self, unit: &ScaledEmissions) -> Result<()> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("creating output directory {}", self.directory.display()))?;
        let units = unit.units().label();

        let mut writers: HashMap<(Region, NaiveDate), csv::Writer<fs::File>> = HashMap::new();
        for (region, date, hour, eic, grid) in unit.iter() {
            let writer = match writers.entry((region, date)) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let path = self.path_for(region, date);
                    let file = fs::File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let mut writer = csv::Writer::from_writer(file);
                    writer.write_record([
                        "region", "date", "hour", "eic", "species", "row", "col", "value",
                        "units",
                    ])?;
                    e.insert(writer)
                }
            };
            for (species, row, col, value) in grid.iter_nonzero() {
                writer.write_record([
                    region.to_string(),
                    date.to_string(),
                    hour.to_string(),
                    eic.to_string(),
                    species.to_string(),
                    row.to_string(),
                    col.to_string(),
                    format!("{value:.6e}"),
                    units.to_string(),
                ])?;
            }
        }

        for ((region, date), writer) in writers {
            writer
                .into_inner()
                .map_err(|e| anyhow::anyhow!("flushing CSV output: {e}"))?;
            let path = self.path_for(region, date);
            info!("wrote {}", path.display());
            if self.compress {
                compress_in_background(&path);
            }
        }
        Ok(())
    }
}
