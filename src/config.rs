//! Run configuration.
//!
//! A single TOML file describes one batch run: the date range, the modeling
//! domain, the region set with its metadata, every input file path, the
//! component selection (loader/scaler/writers/testers by name), and output
//! options. The file is parsed once into a [`RunConfig`] and passed by
//! reference; nothing re-reads configuration mid-run.

use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;
use esta_core::eic::EicPrecision;
use esta_core::region::{GridBounds, Region, RegionInfo, RegionRegistry};
use esta_core::scaler::OutputMode;
use esta_core::sparse::GridExtent;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub dates: DateConfig,
    pub domain: DomainConfig,
    pub regions: Vec<RegionEntry>,
    pub inputs: InputPaths,
    pub scaling: ScalingConfig,
    pub output: OutputConfig,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct DateConfig {
    /// First day of the run, inclusive.
    pub start: NaiveDate,
    /// Last day of the run, inclusive.
    pub end: NaiveDate,
    /// Base year for the holiday calendar.
    pub base_year: i32,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct DomainConfig {
    pub rows: usize,
    pub cols: usize,
}

/// One configured region; list order is processing order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionEntry {
    pub code: u32,
    pub name: String,
    pub air_basin: String,
    pub bounds: GridBounds,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputPaths {
    pub emissions: PathBuf,
    pub categories: PathBuf,
    pub spatial: PathBuf,
    pub dow: PathBuf,
    pub diurnal: PathBuf,
    #[serde(default)]
    pub doy: Option<PathBuf>,
    #[serde(default)]
    pub gsref: Option<PathBuf>,
    #[serde(default)]
    pub gspro: Option<PathBuf>,
    #[serde(default)]
    pub nh3_ratios: Option<PathBuf>,
    #[serde(default)]
    pub nox_splits: Option<PathBuf>,
    #[serde(default)]
    pub hdd_categories: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Scaler name resolved through the component registry.
    pub scaler: String,
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default)]
    pub precision: EicPrecision,
    #[serde(default = "default_loader")]
    pub loader: String,
}

fn default_loader() -> String {
    "csv".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub writers: Vec<String>,
    #[serde(default)]
    pub testers: Vec<String>,
    /// Gzip finished output files from a detached child process.
    #[serde(default)]
    pub compress: bool,
}

impl RunConfig {
    /// Read and validate a TOML run file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading run configuration {}", path.display()))?;
        let config: RunConfig = toml::from_str(&text)
            .with_context(|| format!("parsing run configuration {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.dates.start <= self.dates.end,
            "run start {} is after run end {}",
            self.dates.start,
            self.dates.end
        );
        ensure!(!self.regions.is_empty(), "no regions configured");
        ensure!(
            self.domain.rows > 0 && self.domain.cols > 0,
            "modeling domain must have positive dimensions"
        );
        ensure!(!self.output.writers.is_empty(), "no output writers configured");
        for entry in &self.regions {
            ensure!(
                entry.code != Region::STATEWIDE.value(),
                "region code {} is reserved for the statewide aggregate",
                Region::STATEWIDE
            );
            let bounds = &entry.bounds;
            ensure!(
                bounds.row0 + bounds.rows <= self.domain.rows
                    && bounds.col0 + bounds.cols <= self.domain.cols,
                "region {} bounding box extends outside the {}x{} domain",
                entry.code,
                self.domain.rows,
                self.domain.cols
            );
        }
        Ok(())
    }

    /// Regions in configuration order.
    pub fn region_order(&self) -> Vec<Region> {
        self.regions.iter().map(|e| Region(e.code)).collect()
    }

    pub fn region_registry(&self) -> RegionRegistry {
        let mut registry = RegionRegistry::new();
        for entry in &self.regions {
            registry.insert(
                Region(entry.code),
                RegionInfo {
                    name: entry.name.clone(),
                    air_basin: entry.air_basin.clone(),
                    bounds: entry.bounds,
                },
            );
        }
        registry
    }

    pub fn extent(&self) -> GridExtent {
        GridExtent {
            rows: self.domain.rows,
            cols: self.domain.cols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[dates]
start = "2020-06-01"
end = "2020-06-07"
base_year = 2020

[domain]
rows = 321
cols = 291

[[regions]]
code = 37
name = "Santa Barbara"
air_basin = "SCC"
bounds = { row0 = 10, col0 = 20, rows = 40, cols = 50 }

[inputs]
emissions = "inputs/emissions.csv"
categories = "inputs/categories.csv"
spatial = "inputs/spatial.csv"
dow = "inputs/dow.csv"
diurnal = "inputs/diurnal.csv"

[scaling]
scaler = "gridded"
mode = "by_region"
precision = "full"

[output]
directory = "out"
writers = ["cse"]
testers = ["totals"]
"#;

    #[test]
    fn sample_config_parses() {
        let config: RunConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.dates.base_year, 2020);
        assert_eq!(config.region_order(), vec![Region(37)]);
        assert_eq!(config.scaling.loader, "csv");
        assert!(config.inputs.doy.is_none());
        assert!(!config.output.compress);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config: RunConfig = toml::from_str(SAMPLE).unwrap();
        let serialized = toml::to_string(&config).unwrap();
        let reparsed: RunConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.dates.start, config.dates.start);
        assert_eq!(reparsed.regions.len(), 1);
        assert_eq!(reparsed.output.writers, vec!["cse".to_string()]);
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut config: RunConfig = toml::from_str(SAMPLE).unwrap();
        config.dates.end = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn statewide_sentinel_code_is_rejected() {
        let mut config: RunConfig = toml::from_str(SAMPLE).unwrap();
        config.regions[0].code = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_domain_region_box_is_rejected() {
        let mut config: RunConfig = toml::from_str(SAMPLE).unwrap();
        config.regions[0].bounds.rows = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn registry_carries_region_metadata() {
        let config: RunConfig = toml::from_str(SAMPLE).unwrap();
        let registry = config.region_registry();
        let info = registry.get(Region(37)).unwrap();
        assert_eq!(info.air_basin, "SCC");
        assert_eq!(info.bounds.row0, 10);
    }
}
