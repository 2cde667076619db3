//! Plain gridded scaler: temporal factors plus spatial disaggregation.
//!
//! Output grids carry the inventoried pollutants in short tons/hour; no
//! speciation is applied. This is the variant behind the fixed-width and
//! CSV text formats.

use super::common;
use super::{EmissionsScaler, ScalerConfig, ScalingStream};
use crate::emissions::EmissionsInventory;
use crate::errors::EstaResult;
use crate::region::Region;
use crate::scaled::{EmissionUnits, ScaledEmissions};
use crate::surrogate::{SpatialSurrogateData, TemporalProfiles};
use chrono::NaiveDate;
use log::info;

pub struct GriddedScaler {
    config: ScalerConfig,
}

impl GriddedScaler {
    pub fn new(config: ScalerConfig) -> Self {
        Self { config }
    }

    fn scale_one(
        &self,
        region: Region,
        date: NaiveDate,
        inventory: &EmissionsInventory,
        spatial: &SpatialSurrogateData,
        temporal: &TemporalProfiles,
    ) -> EstaResult<ScaledEmissions> {
        common::scale_region_date(
            &self.config,
            EmissionUnits::TonsPerHour,
            region,
            date,
            inventory,
            spatial,
            temporal,
            None,
            |grid, surrogate, bounds, _eic, polls| {
                for (&pollutant, &mass) in polls {
                    common::distribute(grid, surrogate, bounds, region, pollutant.as_str(), mass)?;
                }
                Ok(())
            },
        )
    }
}

impl EmissionsScaler for GriddedScaler {
    fn name(&self) -> &'static str {
        "gridded"
    }

    fn units(&self) -> EmissionUnits {
        EmissionUnits::TonsPerHour
    }

    fn scale<'a>(
        &'a self,
        inventory: &'a EmissionsInventory,
        spatial: &'a SpatialSurrogateData,
        temporal: &'a TemporalProfiles,
    ) -> ScalingStream<'a> {
        info!(
            "gridded scaling {} to {}, {} regions",
            self.config.start,
            self.config.end,
            self.config.regions.len()
        );
        common::stream(&self.config, self.units(), move |region, date| {
            self.scale_one(region, date, inventory, spatial, temporal)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{DayType, HolidayCalendar};
    use crate::categories::{CalvadClass, CategoryInfo, CategoryMap};
    use crate::eic::{Eic, EicPrecision};
    use crate::emissions::{EmissionsTable, Pollutant};
    use crate::region::{GridBounds, RegionInfo, RegionRegistry};
    use crate::scaler::OutputMode;
    use crate::sparse::GridExtent;
    use crate::surrogate::temporal::{DiurnalProfiles, DowFactors};
    use approx::assert_relative_eq;

    const REGION: Region = Region(37);
    const EIC: Eic = Eic(71074211000000);

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
    }

    fn test_config(mode: OutputMode) -> ScalerConfig {
        let mut region_info = RegionRegistry::new();
        region_info.insert(
            REGION,
            RegionInfo {
                name: "Santa Barbara".to_string(),
                air_basin: "SCC".to_string(),
                bounds: GridBounds {
                    row0: 0,
                    col0: 0,
                    rows: 4,
                    cols: 4,
                },
            },
        );
        let mut categories = CategoryMap::new();
        categories.insert(
            EIC,
            CategoryInfo {
                vehicle: "passenger".to_string(),
                activity: "idle".to_string(),
                class: CalvadClass::LightDuty,
            },
        );
        ScalerConfig {
            regions: vec![REGION],
            region_info,
            start: monday(),
            end: monday(),
            extent: GridExtent { rows: 10, cols: 10 },
            calendar: HolidayCalendar::for_year(2020),
            categories,
            mode,
            precision: EicPrecision::Full,
        }
    }

    fn test_inputs() -> (EmissionsInventory, SpatialSurrogateData, TemporalProfiles) {
        let mut table = EmissionsTable::new();
        table.add(EIC, Pollutant::Co, 10.0);
        let mut inventory = EmissionsInventory::new();
        inventory.add_table(REGION, monday(), table);

        let mut spatial = SpatialSurrogateData::new();
        spatial.add_weight(REGION, "passenger", "idle", 1, 1, 0.4);
        spatial.add_weight(REGION, "passenger", "idle", 1, 2, 0.6);
        spatial.normalize();

        let mut dow = DowFactors::new();
        dow.set(REGION, DayType::Mon, CalvadClass::LightDuty, 0.9);
        let mut diurnal = DiurnalProfiles::new();
        diurnal.set_fraction(REGION, DayType::Mon, CalvadClass::LightDuty, 7, 0.06);
        for hour in 0..24 {
            if hour != 7 {
                diurnal.set_fraction(
                    REGION,
                    DayType::Mon,
                    CalvadClass::LightDuty,
                    hour,
                    0.94 / 23.0,
                );
            }
        }
        let temporal = TemporalProfiles {
            dow,
            diurnal,
            doy: None,
        };
        (inventory, spatial, temporal)
    }

    #[test]
    fn end_to_end_single_category_scenario() {
        let scaler = GriddedScaler::new(test_config(OutputMode::ByRegion));
        let (inventory, spatial, temporal) = test_inputs();

        let units: Vec<_> = scaler
            .scale(&inventory, &spatial, &temporal)
            .collect::<EstaResult<_>>()
            .unwrap();
        assert_eq!(units.len(), 1);

        // Hour index 7 lands in the 1-based hour-8 slot.
        let grid = units[0].get(REGION, monday(), 8, EIC).unwrap();
        assert_relative_eq!(
            grid.grid("CO").unwrap()[[1, 1]],
            10.0 * 0.9 * 0.06 * 0.4,
            epsilon = 1e-5
        );
        assert_relative_eq!(
            grid.grid("CO").unwrap()[[1, 2]],
            10.0 * 0.9 * 0.06 * 0.6,
            epsilon = 1e-5
        );
    }

    #[test]
    fn daily_gridded_total_reconstructs_dow_scaled_mass() {
        let scaler = GriddedScaler::new(test_config(OutputMode::ByRegion));
        let (inventory, spatial, temporal) = test_inputs();

        let unit = scaler
            .scale(&inventory, &spatial, &temporal)
            .next()
            .unwrap()
            .unwrap();
        let total: f32 = (1..=24)
            .filter_map(|hour| unit.get(REGION, monday(), hour, EIC))
            .map(|grid| grid.total("CO"))
            .sum();
        assert_relative_eq!(total, 10.0 * 0.9, epsilon = 1e-3);
    }

    #[test]
    fn statewide_mode_folds_into_domain_grid() {
        let scaler = GriddedScaler::new(test_config(OutputMode::Statewide));
        let (inventory, spatial, temporal) = test_inputs();

        let unit = scaler
            .scale(&inventory, &spatial, &temporal)
            .next()
            .unwrap()
            .unwrap();
        let grid = unit.get(Region::STATEWIDE, monday(), 8, EIC).unwrap();
        assert_eq!(grid.extent(), GridExtent { rows: 10, cols: 10 });
        assert_relative_eq!(grid.total("CO"), 10.0 * 0.9 * 0.06, epsilon = 1e-5);
    }

    #[test]
    fn missing_surrogate_key_aborts_the_run() {
        let scaler = GriddedScaler::new(test_config(OutputMode::ByRegion));
        let (inventory, _, temporal) = test_inputs();
        let empty = SpatialSurrogateData::new();

        let result: EstaResult<Vec<_>> = scaler.scale(&inventory, &empty, &temporal).collect();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("passenger"));
    }

    #[test]
    fn missing_inventory_table_aborts_the_run() {
        let scaler = GriddedScaler::new(test_config(OutputMode::ByRegion));
        let (_, spatial, temporal) = test_inputs();
        let empty = EmissionsInventory::new();

        let result: EstaResult<Vec<_>> = scaler.scale(&empty, &spatial, &temporal).collect();
        assert!(result.unwrap_err().to_string().contains("2020-06-01"));
    }

    #[test]
    fn eic_precision_reduction_merges_categories() {
        let mut config = test_config(OutputMode::ByRegion);
        config.precision = EicPrecision::Three;
        config.categories.insert(
            Eic(71074221000000),
            CategoryInfo {
                vehicle: "passenger".to_string(),
                activity: "idle".to_string(),
                class: CalvadClass::LightDuty,
            },
        );
        let scaler = GriddedScaler::new(config);

        let (mut inventory, spatial, temporal) = {
            let (_, spatial, temporal) = test_inputs();
            (EmissionsInventory::new(), spatial, temporal)
        };
        let mut table = EmissionsTable::new();
        table.add(EIC, Pollutant::Co, 10.0);
        table.add(Eic(71074221000000), Pollutant::Co, 20.0);
        inventory.add_table(REGION, monday(), table);

        let unit = scaler
            .scale(&inventory, &spatial, &temporal)
            .next()
            .unwrap()
            .unwrap();
        // Both categories reduce to 710 and sum.
        let grid = unit.get(REGION, monday(), 8, Eic(710)).unwrap();
        assert_relative_eq!(
            grid.total("CO"),
            30.0 * 0.9 * 0.06,
            epsilon = 1e-4
        );
        assert!(unit.get(REGION, monday(), 8, EIC).is_none());
    }
}
