//! The scaled-output structure: region -> date -> hour -> category -> grid.
//!
//! One [`ScaledEmissions`] is one streamed unit of output, covering either a
//! single region-day or a full day across all regions. Setting an entry for
//! a key that is already present merges (sums) rather than overwrites:
//! multiple categories reduce onto one coarse key, and statewide aggregation
//! folds several regions into one.

use crate::eic::Eic;
use crate::errors::EstaResult;
use crate::region::Region;
use crate::sparse::SparseEmissions;
use chrono::NaiveDate;
use indexmap::IndexMap;

/// Units of the grids held by a scaled unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmissionUnits {
    /// Short tons per hour (unspeciated output).
    TonsPerHour,
    /// Moles per second (grams per second for mass-based species).
    MolesPerSecond,
}

impl EmissionUnits {
    pub fn label(self) -> &'static str {
        match self {
            EmissionUnits::TonsPerHour => "tons/hr",
            EmissionUnits::MolesPerSecond => "mol/s",
        }
    }
}

type HourMap = IndexMap<u8, IndexMap<Eic, SparseEmissions>>;
type DateMap = IndexMap<NaiveDate, HourMap>;

/// One streamed unit of gridded hourly output.
#[derive(Clone, Debug)]
pub struct ScaledEmissions {
    units: EmissionUnits,
    data: IndexMap<Region, DateMap>,
}

impl ScaledEmissions {
    pub fn new(units: EmissionUnits) -> Self {
        Self {
            units,
            data: IndexMap::new(),
        }
    }

    pub fn units(&self) -> EmissionUnits {
        self.units
    }

    /// Insert a grid, merging additively with any grid already present for
    /// the same (region, date, hour, category) key.
    pub fn set(
        &mut self,
        region: Region,
        date: NaiveDate,
        hour: u8,
        eic: Eic,
        grid: SparseEmissions,
    ) -> EstaResult<()> {
        debug_assert!((1..=24).contains(&hour));
        let slot = self
            .data
            .entry(region)
            .or_default()
            .entry(date)
            .or_default()
            .entry(hour)
            .or_default()
            .entry(eic);
        match slot {
            indexmap::map::Entry::Occupied(mut e) => e.get_mut().join(&grid)?,
            indexmap::map::Entry::Vacant(e) => {
                e.insert(grid);
            }
        }
        Ok(())
    }

    pub fn get(
        &self,
        region: Region,
        date: NaiveDate,
        hour: u8,
        eic: Eic,
    ) -> Option<&SparseEmissions> {
        self.data
            .get(&region)?
            .get(&date)?
            .get(&hour)?
            .get(&eic)
    }

    /// Merge another unit into this one, grid-wise additive.
    pub fn join(&mut self, other: ScaledEmissions) -> EstaResult<()> {
        for (region, date, hour, eic, grid) in other.into_flat_iter() {
            self.set(region, date, hour, eic, grid)?;
        }
        Ok(())
    }

    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.data.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flattened view over every grid, in insertion order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (Region, NaiveDate, u8, Eic, &SparseEmissions)> + '_ {
        self.data.iter().flat_map(|(&region, dates)| {
            dates.iter().flat_map(move |(&date, hours)| {
                hours.iter().flat_map(move |(&hour, cats)| {
                    cats.iter()
                        .map(move |(&eic, grid)| (region, date, hour, eic, grid))
                })
            })
        })
    }

    /// Flattened consuming iterator over every grid.
    pub fn into_flat_iter(
        self,
    ) -> impl Iterator<Item = (Region, NaiveDate, u8, Eic, SparseEmissions)> {
        self.data.into_iter().flat_map(|(region, dates)| {
            dates.into_iter().flat_map(move |(date, hours)| {
                hours.into_iter().flat_map(move |(hour, cats)| {
                    cats.into_iter()
                        .map(move |(eic, grid)| (region, date, hour, eic, grid))
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::GridExtent;
    use approx::assert_relative_eq;

    const EXTENT: GridExtent = GridExtent { rows: 3, cols: 3 };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
    }

    fn grid_with(value: f32) -> SparseEmissions {
        let mut grid = SparseEmissions::new(EXTENT);
        grid.add("CO", 1, 1, value);
        grid
    }

    #[test]
    fn duplicate_set_merges_instead_of_overwriting() {
        let mut scaled = ScaledEmissions::new(EmissionUnits::TonsPerHour);
        scaled
            .set(Region(37), date(), 8, Eic(710), grid_with(1.0))
            .unwrap();
        scaled
            .set(Region(37), date(), 8, Eic(710), grid_with(2.0))
            .unwrap();
        let grid = scaled.get(Region(37), date(), 8, Eic(710)).unwrap();
        assert_relative_eq!(grid.grid("CO").unwrap()[[1, 1]], 3.0);
    }

    #[test]
    fn distinct_hours_stay_separate() {
        let mut scaled = ScaledEmissions::new(EmissionUnits::TonsPerHour);
        scaled
            .set(Region(37), date(), 1, Eic(710), grid_with(1.0))
            .unwrap();
        scaled
            .set(Region(37), date(), 2, Eic(710), grid_with(2.0))
            .unwrap();
        assert_relative_eq!(
            scaled
                .get(Region(37), date(), 1, Eic(710))
                .unwrap()
                .total("CO"),
            1.0
        );
        assert_relative_eq!(
            scaled
                .get(Region(37), date(), 2, Eic(710))
                .unwrap()
                .total("CO"),
            2.0
        );
    }

    #[test]
    fn join_merges_whole_units() {
        let mut a = ScaledEmissions::new(EmissionUnits::TonsPerHour);
        a.set(Region(37), date(), 8, Eic(710), grid_with(1.0))
            .unwrap();
        let mut b = ScaledEmissions::new(EmissionUnits::TonsPerHour);
        b.set(Region(37), date(), 8, Eic(710), grid_with(2.0))
            .unwrap();
        b.set(Region(59), date(), 8, Eic(710), grid_with(4.0))
            .unwrap();

        a.join(b).unwrap();
        assert_relative_eq!(
            a.get(Region(37), date(), 8, Eic(710)).unwrap().total("CO"),
            3.0
        );
        assert_relative_eq!(
            a.get(Region(59), date(), 8, Eic(710)).unwrap().total("CO"),
            4.0
        );
    }

    #[test]
    fn flat_iteration_covers_every_entry() {
        let mut scaled = ScaledEmissions::new(EmissionUnits::TonsPerHour);
        scaled
            .set(Region(37), date(), 8, Eic(710), grid_with(1.0))
            .unwrap();
        scaled
            .set(Region(37), date(), 9, Eic(720), grid_with(2.0))
            .unwrap();
        let entries: Vec<_> = scaled.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].2, 8);
        assert_eq!(entries[1].3, Eic(720));
    }
}
