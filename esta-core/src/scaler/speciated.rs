//! Speciating scaler: gridded output resolved into detailed chemical
//! species for photochemical modeling.
//!
//! On top of the shared temporal/spatial steps this variant:
//!
//! - re-speciates each lumped pollutant through the GSREF/GSPRO profiles,
//!   converting short tons/hour to moles/second (grams/second for
//!   mass-based species),
//! - splits heavy-duty diesel NOx three ways into HONO/NO/NO2 from the
//!   region/year lookup instead of the generic NOx profile,
//! - synthesizes NH3 from each category's CO mass and its NH3/CO ratio,
//!   skipping categories with no ratio or no CO,
//! - applies the day-of-year override: when DOY factors are supplied,
//!   heavy-duty diesel categories take their day and hour fractions from
//!   the empirical traffic counts instead of the generic DOW/diurnal
//!   curves.

use super::common::{self, DoyOverride};
use super::{EmissionsScaler, ScalerConfig, ScalingStream};
use crate::eic::Eic;
use crate::emissions::{EmissionsInventory, Pollutant};
use crate::errors::EstaResult;
use crate::region::{GridBounds, Region};
use crate::scaled::{EmissionUnits, ScaledEmissions};
use crate::sparse::SparseEmissions;
use crate::speciation::{
    SpeciationData, HONO_WEIGHT, NH3_WEIGHT, NO2_WEIGHT, NO_WEIGHT,
    TONS_PER_HOUR_TO_GRAMS_PER_SECOND,
};
use crate::surrogate::spatial::SpatialSurrogate;
use crate::surrogate::{SpatialSurrogateData, TemporalProfiles};
use crate::FloatValue;
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use log::info;

pub struct SpeciatedScaler {
    config: ScalerConfig,
    speciation: SpeciationData,
}

impl SpeciatedScaler {
    pub fn new(config: ScalerConfig, speciation: SpeciationData) -> Self {
        Self { config, speciation }
    }

    fn scale_one(
        &self,
        region: Region,
        date: NaiveDate,
        inventory: &EmissionsInventory,
        spatial: &SpatialSurrogateData,
        temporal: &TemporalProfiles,
    ) -> EstaResult<ScaledEmissions> {
        let doy = temporal.doy.as_ref().map(|factors| DoyOverride {
            factors,
            categories: &self.speciation.hdd_categories,
            ordinal: date.ordinal(),
        });
        let year = date.year();
        common::scale_region_date(
            &self.config,
            EmissionUnits::MolesPerSecond,
            region,
            date,
            inventory,
            spatial,
            temporal,
            doy.as_ref(),
            |grid, surrogate, bounds, eic, polls| {
                self.fill_species(grid, surrogate, bounds, region, year, eic, polls)
            },
        )
    }

    /// Speciate one category's hourly pollutant masses onto the grid.
    #[allow(clippy::too_many_arguments)]
    fn fill_species(
        &self,
        grid: &mut SparseEmissions,
        surrogate: &SpatialSurrogate,
        bounds: &GridBounds,
        region: Region,
        year: i32,
        eic: Eic,
        polls: &IndexMap<Pollutant, FloatValue>,
    ) -> EstaResult<()> {
        let heavy_duty = self.speciation.is_heavy_duty_diesel(eic);
        for (&pollutant, &mass) in polls {
            let grams_per_second = mass * TONS_PER_HOUR_TO_GRAMS_PER_SECOND;
            if pollutant == Pollutant::Nox && heavy_duty {
                let split = self.speciation.nox_splits.get(region, year)?;
                common::distribute(
                    grid,
                    surrogate,
                    bounds,
                    region,
                    "HONO",
                    grams_per_second * split.hono / HONO_WEIGHT,
                )?;
                common::distribute(
                    grid,
                    surrogate,
                    bounds,
                    region,
                    "NO",
                    grams_per_second * split.no / NO_WEIGHT,
                )?;
                common::distribute(
                    grid,
                    surrogate,
                    bounds,
                    region,
                    "NO2",
                    grams_per_second * split.no2 / NO2_WEIGHT,
                )?;
                continue;
            }
            for species in self.speciation.profiles.species_for(eic, pollutant)? {
                common::distribute(
                    grid,
                    surrogate,
                    bounds,
                    region,
                    &species.name,
                    grams_per_second * species.mass_fraction / species.weight,
                )?;
            }
        }

        // On-road NH3 is not in the source inventory; synthesize it from CO.
        let co_mass = polls.get(&Pollutant::Co).copied().unwrap_or(0.0);
        if co_mass > 0.0 {
            if let Some(ratio) = self.speciation.nh3_ratios.get(region, eic) {
                if ratio > 0.0 {
                    let nh3_mass = co_mass * ratio;
                    common::distribute(
                        grid,
                        surrogate,
                        bounds,
                        region,
                        "NH3",
                        nh3_mass * TONS_PER_HOUR_TO_GRAMS_PER_SECOND / NH3_WEIGHT,
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl EmissionsScaler for SpeciatedScaler {
    fn name(&self) -> &'static str {
        "speciated"
    }

    fn units(&self) -> EmissionUnits {
        EmissionUnits::MolesPerSecond
    }

    fn scale<'a>(
        &'a self,
        inventory: &'a EmissionsInventory,
        spatial: &'a SpatialSurrogateData,
        temporal: &'a TemporalProfiles,
    ) -> ScalingStream<'a> {
        info!(
            "speciated scaling {} to {}, {} regions, day-of-year override {}",
            self.config.start,
            self.config.end,
            self.config.regions.len(),
            if temporal.doy.is_some() {
                "active"
            } else {
                "inactive"
            }
        );
        common::stream(&self.config, self.units(), move |region, date| {
            self.scale_one(region, date, inventory, spatial, temporal)
        })
    }
}
