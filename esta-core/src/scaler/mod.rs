//! The scaling engines and their streaming contract.
//!
//! A scaler combines one coarse emissions inventory with the spatial and
//! temporal surrogate datasets and produces gridded hourly output. Scaling
//! is a lazy, finite, non-restartable sequence: each streamed unit must be
//! fully consumed before the next is produced, and a unit cannot be
//! re-requested. Iteration runs over calendar dates in order (outer) and
//! configured regions in configuration order (inner).
//!
//! Two variants share their factor-application and disaggregation helpers
//! by composition:
//!
//! - [`GriddedScaler`]: temporal factors plus spatial disaggregation,
//!   yielding short tons/hour per inventoried pollutant.
//! - [`SpeciatedScaler`]: the same, plus chemical speciation, NH3
//!   synthesis, the heavy-duty-diesel NOx split, and the day-of-year
//!   heavy-duty-diesel override, yielding moles/second per species.

mod common;
pub mod gridded;
pub mod speciated;

pub use gridded::GriddedScaler;
pub use speciated::SpeciatedScaler;

use crate::calendar::HolidayCalendar;
use crate::categories::CategoryMap;
use crate::eic::EicPrecision;
use crate::emissions::EmissionsInventory;
use crate::errors::EstaResult;
use crate::region::{Region, RegionRegistry};
use crate::scaled::{EmissionUnits, ScaledEmissions};
use crate::sparse::GridExtent;
use crate::surrogate::{SpatialSurrogateData, TemporalProfiles};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which unit of work each streamed item covers.
///
/// Fixed at scaler construction; never changed mid-run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One unit per region per day.
    #[default]
    ByRegion,
    /// One unit per day, all regions folded into the statewide grid.
    Statewide,
}

/// Construction-time inputs shared by every scaler variant.
///
/// All lookup tables are built once from configuration and never mutated
/// during scaling.
#[derive(Clone, Debug)]
pub struct ScalerConfig {
    /// Regions to process, in configuration order.
    pub regions: Vec<Region>,
    pub region_info: RegionRegistry,
    /// First day of the run, inclusive.
    pub start: NaiveDate,
    /// Last day of the run, inclusive.
    pub end: NaiveDate,
    /// Full modeling domain dimensions.
    pub extent: GridExtent,
    pub calendar: HolidayCalendar,
    pub categories: CategoryMap,
    pub mode: OutputMode,
    pub precision: EicPrecision,
}

/// A scaler turns coarse inventory tables into gridded hourly output.
pub trait EmissionsScaler {
    /// Name used in logs and registry diagnostics.
    fn name(&self) -> &'static str;

    /// Units of the grids the stream yields.
    fn units(&self) -> EmissionUnits;

    /// Scale the configured date and region scope.
    ///
    /// The surrogate datasets are shared read-only across the whole run;
    /// the inventory tables are copied before any factor application
    /// mutates values.
    fn scale<'a>(
        &'a self,
        inventory: &'a EmissionsInventory,
        spatial: &'a SpatialSurrogateData,
        temporal: &'a TemporalProfiles,
    ) -> ScalingStream<'a>;
}

/// Lazy, one-shot, forward-only sequence of scaled units.
///
/// No buffering beyond the in-flight unit; dropping the stream abandons
/// the remaining work. Any error ends the run; partial inventories are
/// not useful output.
pub struct ScalingStream<'a> {
    inner: Box<dyn Iterator<Item = EstaResult<ScaledEmissions>> + 'a>,
}

impl<'a> ScalingStream<'a> {
    pub(crate) fn new(inner: Box<dyn Iterator<Item = EstaResult<ScaledEmissions>> + 'a>) -> Self {
        Self { inner }
    }
}

impl Iterator for ScalingStream<'_> {
    type Item = EstaResult<ScaledEmissions>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
