//! The run orchestrator.
//!
//! Resolves the configured component names through an explicit registry
//! (unknown names fail fast, before any input is read), loads every input
//! dataset, then drives the scaler's stream: each unit is fully written and
//! observed before the next is produced, so peak memory stays bounded at
//! one region-day (or one statewide day) of gridded output. Any error
//! aborts the whole run; there is no partial-success mode.

use crate::config::RunConfig;
use crate::loaders::{
    load_categories, load_spatial, load_speciation, load_temporal, CsvInventoryLoader,
    InventoryLoader,
};
use crate::testers::{OutputTester, TotalsTester};
use crate::writers::{CseWriter, OutputWriter, PmedsWriter};
use anyhow::{bail, Context, Result};
use esta_core::calendar::HolidayCalendar;
use esta_core::scaler::{EmissionsScaler, GriddedScaler, ScalerConfig, SpeciatedScaler};
use log::info;

pub struct Pipeline {
    config: RunConfig,
    loader: Box<dyn InventoryLoader>,
    scaler: Box<dyn EmissionsScaler>,
    writers: Vec<Box<dyn OutputWriter>>,
    testers: Vec<Box<dyn OutputTester>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

fn build_loader(name: &str) -> Result<Box<dyn InventoryLoader>> {
    match name {
        "csv" => Ok(Box::new(CsvInventoryLoader)),
        _ => bail!("unknown inventory loader {name:?} (known: csv)"),
    }
}

fn build_scaler(config: &RunConfig) -> Result<Box<dyn EmissionsScaler>> {
    let name = config.scaling.scaler.as_str();
    if !matches!(name, "gridded" | "speciated") {
        bail!("unknown scaler {name:?} (known: gridded, speciated)");
    }
    let scaler_config = ScalerConfig {
        regions: config.region_order(),
        region_info: config.region_registry(),
        start: config.dates.start,
        end: config.dates.end,
        extent: config.extent(),
        calendar: HolidayCalendar::for_year(config.dates.base_year),
        categories: load_categories(config)?,
        mode: config.scaling.mode,
        precision: config.scaling.precision,
    };
    match name {
        "gridded" => Ok(Box::new(GriddedScaler::new(scaler_config))),
        "speciated" => {
            let speciation = load_speciation(config)?;
            Ok(Box::new(SpeciatedScaler::new(scaler_config, speciation)))
        }
        _ => unreachable!(),
    }
}

fn build_writers(config: &RunConfig) -> Result<Vec<Box<dyn OutputWriter>>> {
    let directory = &config.output.directory;
    config
        .output
        .writers
        .iter()
        .map(|name| -> Result<Box<dyn OutputWriter>> {
            match name.as_str() {
                "cse" => Ok(Box::new(CseWriter::new(directory, config.output.compress))),
                "pmeds" => Ok(Box::new(PmedsWriter::new(
                    directory,
                    config.region_registry(),
                    config.output.compress,
                ))),
                _ => bail!("unknown output writer {name:?} (known: cse, pmeds)"),
            }
        })
        .collect()
}

fn build_testers(config: &RunConfig) -> Result<Vec<Box<dyn OutputTester>>> {
    config
        .output
        .testers
        .iter()
        .map(|name| -> Result<Box<dyn OutputTester>> {
            match name.as_str() {
                "totals" => Ok(Box::new(TotalsTester::new(
                    &config.output.directory,
                    config.scaling.precision,
                ))),
                _ => bail!("unknown output tester {name:?} (known: totals)"),
            }
        })
        .collect()
}

impl Pipeline {
    /// Resolve every configured component, failing fast on unknown names or
    /// incompatible writer/scaler pairings.
    pub fn from_config(config: RunConfig) -> Result<Self> {
        let loader = build_loader(&config.scaling.loader)?;
        let scaler = build_scaler(&config)?;
        let writers = build_writers(&config)?;
        let testers = build_testers(&config)?;

        for writer in &writers {
            writer
                .check_units(scaler.units())
                .with_context(|| format!("writer {:?}", writer.name()))?;
        }

        Ok(Self {
            config,
            loader,
            scaler,
            writers,
            testers,
        })
    }

    /// Execute the full run: load, scale, write, test.
    pub fn run(self) -> Result<()> {
        let Pipeline {
            config,
            loader,
            scaler,
            writers,
            mut testers,
        } = self;

        let inventory = loader.load(&config)?;
        let spatial = load_spatial(&config)?;
        let temporal = load_temporal(&config)?;

        info!(
            "running scaler {:?} for {} to {}",
            scaler.name(),
            config.dates.start,
            config.dates.end
        );

        let mut unit_count = 0usize;
        for unit in scaler.scale(&inventory, &spatial, &temporal) {
            let unit = unit?;
            for writer in &writers {
                writer
                    .write(&unit)
                    .with_context(|| format!("writer {:?}", writer.name()))?;
            }
            for tester in &mut testers {
                tester
                    .observe(&unit)
                    .with_context(|| format!("tester {:?}", tester.name()))?;
            }
            unit_count += 1;
        }

        for tester in &testers {
            tester
                .report(&inventory)
                .with_context(|| format!("tester {:?}", tester.name()))?;
        }

        info!("run complete: {unit_count} units written");
        Ok(())
    }
}
