//! Factor-application and disaggregation helpers shared by the scaler
//! variants.
//!
//! The inventory table is never mutated: each step builds a new table from
//! its input, so the base table stays valid for every subsequent hour.

use super::{OutputMode, ScalerConfig, ScalingStream};
use crate::calendar::{surrogate_label, DayType};
use crate::categories::{CalvadClass, CategoryMap};
use crate::eic::Eic;
use crate::emissions::{EmissionsInventory, EmissionsTable, Pollutant};
use crate::errors::EstaResult;
use crate::region::{GridBounds, Region};
use crate::scaled::{EmissionUnits, ScaledEmissions};
use crate::sparse::{GridExtent, SparseEmissions};
use crate::surrogate::spatial::SpatialSurrogate;
use crate::surrogate::temporal::{DiurnalProfiles, DowFactors, DoyFactors};
use crate::surrogate::SpatialSurrogateData;
use crate::surrogate::TemporalProfiles;
use crate::FloatValue;
use chrono::NaiveDate;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;

/// All dates from `start` to `end`, inclusive, in calendar order.
pub(crate) fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut date = start;
    while date <= end {
        dates.push(date);
        date += chrono::Duration::days(1);
    }
    dates
}

/// School buses do not operate on non-school days: zero on weekends and
/// holidays, full scale on weekdays. Overrides the table-driven factor.
pub(crate) fn school_bus_factor(day_type: DayType) -> FloatValue {
    if day_type.is_weekend_or_holiday() {
        0.0
    } else {
        1.0
    }
}

/// Day-of-year override context for heavy-duty diesel categories.
pub(crate) struct DoyOverride<'a> {
    pub factors: &'a DoyFactors,
    pub categories: &'a HashSet<Eic>,
    /// Julian day of the date being scaled.
    pub ordinal: u32,
}

impl DoyOverride<'_> {
    fn applies_to(&self, eic: Eic) -> bool {
        self.categories.contains(&eic)
    }
}

/// Scale a daily table by its day-of-week factors.
///
/// Returns a new table; the input is untouched. Categories whose factor is
/// exactly zero for this day type are dropped and never appear downstream.
pub(crate) fn apply_dow(
    table: &EmissionsTable,
    region: Region,
    day_type: DayType,
    categories: &CategoryMap,
    dow: &DowFactors,
    doy: Option<&DoyOverride<'_>>,
) -> EstaResult<EmissionsTable> {
    let mut out = EmissionsTable::new();
    for (eic, polls) in table.iter() {
        let info = categories.get(eic)?;
        let factor = if info.class == CalvadClass::SchoolBus {
            school_bus_factor(day_type)
        } else if let Some(ov) = doy.filter(|ov| ov.applies_to(eic)) {
            // Absent upstream data contributes zero, it is not an error.
            ov.factors
                .get(region, ov.ordinal)
                .map(|f| f.day_fraction)
                .unwrap_or(0.0)
        } else {
            dow.factor(region, day_type, info.class)?
        };
        if factor == 0.0 {
            continue;
        }
        for (&pollutant, &value) in polls {
            out.add(eic, pollutant, value * factor);
        }
    }
    Ok(out)
}

/// Scale a day-of-week-scaled daily table down to one hour.
///
/// Each of the 24 hourly snapshots is computed independently from the
/// daily table; their sum reconstructs the daily total because diurnal
/// fractions are normalized to sum to 1.
pub(crate) fn apply_diurnal(
    daily: &EmissionsTable,
    region: Region,
    day_type: DayType,
    hour: usize,
    categories: &CategoryMap,
    diurnal: &DiurnalProfiles,
    doy: Option<&DoyOverride<'_>>,
) -> EstaResult<EmissionsTable> {
    let mut out = EmissionsTable::new();
    for (eic, polls) in daily.iter() {
        let info = categories.get(eic)?;
        let fraction = if let Some(ov) = doy.filter(|ov| ov.applies_to(eic)) {
            ov.factors
                .get(region, ov.ordinal)
                .map(|f| f.hour_fractions[hour])
                .unwrap_or(0.0)
        } else {
            diurnal.fraction(region, day_type, info.class, hour)?
        };
        for (&pollutant, &value) in polls {
            out.add(eic, pollutant, value * fraction);
        }
    }
    Ok(out)
}

/// Distribute one species' mass across a surrogate's cells.
///
/// Every cell the surrogate has weight for must fall inside the region's
/// bounding box; a cell outside it indicates inconsistent surrogate data.
pub(crate) fn distribute(
    grid: &mut SparseEmissions,
    surrogate: &SpatialSurrogate,
    bounds: &GridBounds,
    region: Region,
    species: &str,
    mass: FloatValue,
) -> EstaResult<()> {
    for ((row, col), fraction) in surrogate.iter() {
        if !bounds.contains(row, col) {
            return Err(crate::errors::EstaError::CellOutsideRegion { region, row, col });
        }
        grid.add(species, row, col, mass * fraction);
    }
    Ok(())
}

/// Scale one region-day: temporal factors, then per-hour spatial
/// disaggregation through the variant-specific `fill`.
///
/// `fill` receives the hour's grid, the category's surrogate and bounds,
/// and the category's pollutant masses (already in tons/hour); it is the
/// only point where the scaler variants differ.
#[allow(clippy::too_many_arguments)]
pub(crate) fn scale_region_date<F>(
    config: &ScalerConfig,
    units: EmissionUnits,
    region: Region,
    date: NaiveDate,
    inventory: &EmissionsInventory,
    spatial: &SpatialSurrogateData,
    temporal: &TemporalProfiles,
    doy: Option<&DoyOverride<'_>>,
    mut fill: F,
) -> EstaResult<ScaledEmissions>
where
    F: FnMut(
        &mut SparseEmissions,
        &SpatialSurrogate,
        &GridBounds,
        Eic,
        &IndexMap<Pollutant, FloatValue>,
    ) -> EstaResult<()>,
{
    let info = config.region_info.get(region)?;
    let table = inventory.require(region, date)?;
    let day_type = config.calendar.day_type(date);

    let daily = apply_dow(table, region, day_type, &config.categories, &temporal.dow, doy)?;
    debug!(
        "scaling region {} on {} ({} categories after day-of-week factors)",
        region,
        date,
        daily.len()
    );

    let mut unit = ScaledEmissions::new(units);
    for hour in 0..24usize {
        let hourly = apply_diurnal(
            &daily,
            region,
            day_type,
            hour,
            &config.categories,
            &temporal.diurnal,
            doy,
        )?;
        for (eic, polls) in hourly.iter() {
            let cat = config.categories.get(eic)?;
            let label = surrogate_label(&cat.activity, day_type, hour as u32);
            let surrogate = spatial.get(region, &cat.vehicle, &label)?;
            let mut grid = SparseEmissions::for_bounds(&info.bounds);
            fill(&mut grid, surrogate, &info.bounds, eic, polls)?;
            unit.set(
                region,
                date,
                (hour + 1) as u8,
                config.precision.reduce(eic),
                grid,
            )?;
        }
    }
    Ok(unit)
}

/// Fold every region's region-bounded grids for one day into the statewide
/// domain grid.
pub(crate) fn scale_statewide<S>(
    extent: GridExtent,
    units: EmissionUnits,
    regions: &[Region],
    date: NaiveDate,
    scale_one: &S,
) -> EstaResult<ScaledEmissions>
where
    S: Fn(Region, NaiveDate) -> EstaResult<ScaledEmissions>,
{
    let mut unit = ScaledEmissions::new(units);
    for &region in regions {
        let partial = scale_one(region, date)?;
        for (_, date, hour, eic, grid) in partial.into_flat_iter() {
            let mut domain = SparseEmissions::new(extent);
            domain.add_subgrid(&grid)?;
            unit.set(Region::STATEWIDE, date, hour, eic, domain)?;
        }
    }
    Ok(unit)
}

/// Assemble the streaming iterator for a scaler variant.
pub(crate) fn stream<'a, S>(
    config: &ScalerConfig,
    units: EmissionUnits,
    scale_one: S,
) -> ScalingStream<'a>
where
    S: Fn(Region, NaiveDate) -> EstaResult<ScaledEmissions> + 'a,
{
    let dates = date_range(config.start, config.end);
    match config.mode {
        OutputMode::ByRegion => {
            let mut pairs = Vec::with_capacity(dates.len() * config.regions.len());
            for &date in &dates {
                for &region in &config.regions {
                    pairs.push((region, date));
                }
            }
            ScalingStream::new(Box::new(
                pairs
                    .into_iter()
                    .map(move |(region, date)| scale_one(region, date)),
            ))
        }
        OutputMode::Statewide => {
            let extent = config.extent;
            let regions = config.regions.clone();
            ScalingStream::new(Box::new(dates.into_iter().map(move |date| {
                scale_statewide(extent, units, &regions, date, &scale_one)
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::CategoryInfo;
    use approx::assert_relative_eq;

    fn category_map() -> CategoryMap {
        let mut map = CategoryMap::new();
        map.insert(
            Eic(710),
            CategoryInfo {
                vehicle: "passenger".to_string(),
                activity: "vmt".to_string(),
                class: CalvadClass::LightDuty,
            },
        );
        map.insert(
            Eic(760),
            CategoryInfo {
                vehicle: "school_bus".to_string(),
                activity: "idle".to_string(),
                class: CalvadClass::SchoolBus,
            },
        );
        map
    }

    fn dow_with(factor: FloatValue, day_type: DayType) -> DowFactors {
        let mut dow = DowFactors::new();
        for class in [
            CalvadClass::LightDuty,
            CalvadClass::LightMedium,
            CalvadClass::HeavyHeavy,
            CalvadClass::SchoolBus,
        ] {
            dow.set(Region(37), day_type, class, factor);
        }
        dow
    }

    #[test]
    fn date_range_is_inclusive_and_ordered() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 2, 2).unwrap();
        let dates = date_range(start, end);
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[0], start);
        assert_eq!(dates[3], end);
    }

    #[test]
    fn school_bus_zero_on_weekends_and_holidays() {
        assert_relative_eq!(school_bus_factor(DayType::Sat), 0.0);
        assert_relative_eq!(school_bus_factor(DayType::Sun), 0.0);
        assert_relative_eq!(school_bus_factor(DayType::Holi), 0.0);
        assert_relative_eq!(school_bus_factor(DayType::Mon), 1.0);
        assert_relative_eq!(school_bus_factor(DayType::Tuth), 1.0);
    }

    #[test]
    fn school_bus_override_beats_the_factor_table() {
        let mut table = EmissionsTable::new();
        table.add(Eic(760), Pollutant::Co, 5.0);

        // Generic Saturday factor is nonzero, but school buses still drop.
        let dow = dow_with(0.7, DayType::Sat);
        let scaled = apply_dow(&table, Region(37), DayType::Sat, &category_map(), &dow, None)
            .unwrap();
        assert!(scaled.is_empty());

        // Monday: full scale regardless of the generic factor.
        let dow = dow_with(0.7, DayType::Mon);
        let scaled = apply_dow(&table, Region(37), DayType::Mon, &category_map(), &dow, None)
            .unwrap();
        assert_relative_eq!(scaled.get(Eic(760), Pollutant::Co), 5.0);
    }

    #[test]
    fn zero_factor_categories_are_dropped() {
        let mut table = EmissionsTable::new();
        table.add(Eic(710), Pollutant::Co, 5.0);
        let dow = dow_with(0.0, DayType::Mon);
        let scaled = apply_dow(&table, Region(37), DayType::Mon, &category_map(), &dow, None)
            .unwrap();
        assert!(scaled.is_empty());
    }

    #[test]
    fn dow_scaling_does_not_mutate_the_input() {
        let mut table = EmissionsTable::new();
        table.add(Eic(710), Pollutant::Co, 5.0);
        let dow = dow_with(0.5, DayType::Mon);
        let _ = apply_dow(&table, Region(37), DayType::Mon, &category_map(), &dow, None)
            .unwrap();
        assert_relative_eq!(table.get(Eic(710), Pollutant::Co), 5.0);
    }

    #[test]
    fn unknown_category_aborts_dow_application() {
        let mut table = EmissionsTable::new();
        table.add(Eic(999), Pollutant::Co, 1.0);
        let dow = dow_with(1.0, DayType::Mon);
        let err = apply_dow(&table, Region(37), DayType::Mon, &category_map(), &dow, None)
            .unwrap_err();
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn hourly_snapshots_reconstruct_the_day() {
        let mut daily = EmissionsTable::new();
        daily.add(Eic(710), Pollutant::Co, 9.0);

        let mut diurnal = DiurnalProfiles::new();
        for hour in 0..24 {
            diurnal.set_fraction(
                Region(37),
                DayType::Mon,
                CalvadClass::LightDuty,
                hour,
                (hour + 1) as FloatValue,
            );
        }
        diurnal.normalize();

        let total: FloatValue = (0..24)
            .map(|hour| {
                apply_diurnal(
                    &daily,
                    Region(37),
                    DayType::Mon,
                    hour,
                    &category_map(),
                    &diurnal,
                    None,
                )
                .unwrap()
                .get(Eic(710), Pollutant::Co)
            })
            .sum();
        assert_relative_eq!(total, 9.0, epsilon = 1e-4);
    }

    #[test]
    fn distribution_conserves_mass() {
        let bounds = GridBounds {
            row0: 0,
            col0: 0,
            rows: 4,
            cols: 4,
        };
        let mut surrogate = SpatialSurrogate::new();
        surrogate.add(0, 0, 0.2);
        surrogate.add(1, 1, 0.3);
        surrogate.add(2, 2, 0.5);

        let mut grid = SparseEmissions::for_bounds(&bounds);
        distribute(&mut grid, &surrogate, &bounds, Region(37), "CO", 100.0).unwrap();
        assert_relative_eq!(grid.grid("CO").unwrap()[[0, 0]], 20.0);
        assert_relative_eq!(grid.grid("CO").unwrap()[[1, 1]], 30.0);
        assert_relative_eq!(grid.grid("CO").unwrap()[[2, 2]], 50.0);
        assert_relative_eq!(grid.total("CO"), 100.0, epsilon = 1e-4);
    }

    #[test]
    fn out_of_bounds_surrogate_cell_is_fatal() {
        let bounds = GridBounds {
            row0: 0,
            col0: 0,
            rows: 2,
            cols: 2,
        };
        let mut surrogate = SpatialSurrogate::new();
        surrogate.add(5, 5, 1.0);
        let mut grid = SparseEmissions::for_bounds(&bounds);
        let err = distribute(&mut grid, &surrogate, &bounds, Region(37), "CO", 1.0).unwrap_err();
        assert!(err.to_string().contains("(5, 5)"));
    }

    #[test]
    fn doy_override_replaces_dow_for_hdd_categories() {
        let mut table = EmissionsTable::new();
        table.add(Eic(710), Pollutant::Nox, 10.0);

        let mut hdd = HashSet::new();
        hdd.insert(Eic(710));
        let mut factors = DoyFactors::new();
        factors.insert(
            Region(37),
            152,
            crate::surrogate::DoyFactor {
                day_fraction: 0.25,
                hour_fractions: [1.0 / 24.0; 24],
            },
        );
        let ov = DoyOverride {
            factors: &factors,
            categories: &hdd,
            ordinal: 152,
        };

        let dow = dow_with(0.9, DayType::Mon);
        let scaled = apply_dow(
            &table,
            Region(37),
            DayType::Mon,
            &category_map(),
            &dow,
            Some(&ov),
        )
        .unwrap();
        assert_relative_eq!(scaled.get(Eic(710), Pollutant::Nox), 2.5);
    }

    #[test]
    fn doy_override_with_missing_entry_zeroes_hdd() {
        let mut table = EmissionsTable::new();
        table.add(Eic(710), Pollutant::Nox, 10.0);

        let mut hdd = HashSet::new();
        hdd.insert(Eic(710));
        let factors = DoyFactors::new();
        let ov = DoyOverride {
            factors: &factors,
            categories: &hdd,
            ordinal: 152,
        };

        let dow = dow_with(0.9, DayType::Mon);
        let scaled = apply_dow(
            &table,
            Region(37),
            DayType::Mon,
            &category_map(),
            &dow,
            Some(&ov),
        )
        .unwrap();
        assert!(scaled.is_empty());
    }
}
