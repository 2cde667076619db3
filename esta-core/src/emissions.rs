//! Coarse emissions tables: the scaler's input.
//!
//! An [`EmissionsTable`] holds one region-and-date worth of aggregate
//! emissions keyed by category and pollutant. Values are additive: combining
//! two tables for the same region/date sums category-and-pollutant-wise.
//! Tables are built once by a loader and never mutated by the scaler; the
//! factor-application steps copy before scaling.

use crate::eic::{Eic, EicPrecision};
use crate::errors::{EstaError, EstaResult};
use crate::region::Region;
use crate::FloatValue;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pollutants carried by the source inventory.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Co,
    Nox,
    Sox,
    Tog,
    Pm,
    Nh3,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Co,
        Pollutant::Nox,
        Pollutant::Sox,
        Pollutant::Tog,
        Pollutant::Pm,
        Pollutant::Nh3,
    ];

    /// Uppercase name used as a species key in output grids.
    pub fn as_str(self) -> &'static str {
        match self {
            Pollutant::Co => "CO",
            Pollutant::Nox => "NOX",
            Pollutant::Sox => "SOX",
            Pollutant::Tog => "TOG",
            Pollutant::Pm => "PM",
            Pollutant::Nh3 => "NH3",
        }
    }
}

impl FromStr for Pollutant {
    type Err = EstaError;

    fn from_str(s: &str) -> EstaResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "co" => Ok(Pollutant::Co),
            "nox" => Ok(Pollutant::Nox),
            "sox" => Ok(Pollutant::Sox),
            "tog" => Ok(Pollutant::Tog),
            "pm" => Ok(Pollutant::Pm),
            "nh3" => Ok(Pollutant::Nh3),
            _ => Err(EstaError::UnknownPollutant(s.to_string())),
        }
    }
}

/// Aggregate emissions for one region and date: category -> pollutant -> value.
///
/// Units are whatever the loader produced, short tons/day for the standard
/// inventory dumps.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EmissionsTable {
    values: IndexMap<Eic, IndexMap<Pollutant, FloatValue>>,
}

impl EmissionsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, summing with any existing entry for the same key pair.
    pub fn add(&mut self, eic: Eic, pollutant: Pollutant, value: FloatValue) {
        *self
            .values
            .entry(eic)
            .or_default()
            .entry(pollutant)
            .or_insert(0.0) += value;
    }

    /// Value for a key pair, zero if absent.
    pub fn get(&self, eic: Eic, pollutant: Pollutant) -> FloatValue {
        self.values
            .get(&eic)
            .and_then(|p| p.get(&pollutant))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn pollutants(&self, eic: Eic) -> Option<&IndexMap<Pollutant, FloatValue>> {
        self.values.get(&eic)
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (Eic, &IndexMap<Pollutant, FloatValue>)> + '_ {
        self.values.iter().map(|(&eic, polls)| (eic, polls))
    }

    pub fn categories(&self) -> impl Iterator<Item = Eic> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum another table into this one, category-and-pollutant-wise.
    pub fn combine(&mut self, other: &EmissionsTable) {
        for (eic, polls) in other.iter() {
            for (&pollutant, &value) in polls {
                self.add(eic, pollutant, value);
            }
        }
    }

    /// Daily total for one pollutant across all categories.
    pub fn total(&self, pollutant: Pollutant) -> FloatValue {
        self.values
            .values()
            .filter_map(|p| p.get(&pollutant))
            .sum()
    }

    /// A copy with every category key reduced to the given precision.
    ///
    /// Categories that collapse onto the same coarse key are summed.
    pub fn reduced(&self, precision: EicPrecision) -> EmissionsTable {
        let mut out = EmissionsTable::new();
        for (eic, polls) in self.iter() {
            let key = precision.reduce(eic);
            for (&pollutant, &value) in polls {
                out.add(key, pollutant, value);
            }
        }
        out
    }
}

/// The full coarse inventory for a run: one table per region and date.
#[derive(Clone, Debug, Default)]
pub struct EmissionsInventory {
    tables: IndexMap<(Region, NaiveDate), EmissionsTable>,
}

impl EmissionsInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single value into the table for a region and date.
    pub fn add_value(
        &mut self,
        region: Region,
        date: NaiveDate,
        eic: Eic,
        pollutant: Pollutant,
        value: FloatValue,
    ) {
        self.tables
            .entry((region, date))
            .or_default()
            .add(eic, pollutant, value);
    }

    /// Insert a table, combining with any table already present for the
    /// same region and date.
    pub fn add_table(&mut self, region: Region, date: NaiveDate, table: EmissionsTable) {
        match self.tables.entry((region, date)) {
            indexmap::map::Entry::Occupied(mut e) => e.get_mut().combine(&table),
            indexmap::map::Entry::Vacant(e) => {
                e.insert(table);
            }
        }
    }

    pub fn get(&self, region: Region, date: NaiveDate) -> Option<&EmissionsTable> {
        self.tables.get(&(region, date))
    }

    /// The table for a region and date, failing with the offending keys.
    pub fn require(&self, region: Region, date: NaiveDate) -> EstaResult<&EmissionsTable> {
        self.get(region, date)
            .ok_or(EstaError::MissingEmissions { region, date })
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (Region, NaiveDate, &EmissionsTable)> + '_ {
        self.tables
            .iter()
            .map(|(&(region, date), table)| (region, date, table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn add_sums_duplicate_keys() {
        let mut table = EmissionsTable::new();
        table.add(Eic(710), Pollutant::Co, 1.5);
        table.add(Eic(710), Pollutant::Co, 2.5);
        assert_relative_eq!(table.get(Eic(710), Pollutant::Co), 4.0);
    }

    #[test]
    fn get_absent_is_zero() {
        let table = EmissionsTable::new();
        assert_relative_eq!(table.get(Eic(710), Pollutant::Nox), 0.0);
    }

    #[test]
    fn combine_is_additive() {
        let mut a = EmissionsTable::new();
        a.add(Eic(710), Pollutant::Co, 1.0);
        let mut b = EmissionsTable::new();
        b.add(Eic(710), Pollutant::Co, 2.0);
        b.add(Eic(720), Pollutant::Nox, 3.0);
        a.combine(&b);
        assert_relative_eq!(a.get(Eic(710), Pollutant::Co), 3.0);
        assert_relative_eq!(a.get(Eic(720), Pollutant::Nox), 3.0);
    }

    #[test]
    fn reduction_sums_colliding_categories() {
        let mut table = EmissionsTable::new();
        table.add(Eic(71074211000000), Pollutant::Co, 1.25);
        table.add(Eic(71074221000000), Pollutant::Co, 2.5);
        let reduced = table.reduced(EicPrecision::Three);
        assert_eq!(reduced.len(), 1);
        assert_relative_eq!(reduced.get(Eic(710), Pollutant::Co), 3.75);
    }

    #[test]
    fn full_precision_reduction_preserves_keys() {
        let mut table = EmissionsTable::new();
        table.add(Eic(71074211000000), Pollutant::Co, 1.0);
        let reduced = table.reduced(EicPrecision::Full);
        assert_relative_eq!(reduced.get(Eic(71074211000000), Pollutant::Co), 1.0);
    }

    #[test]
    fn inventory_merges_tables_for_same_region_date() {
        let date = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        let mut inventory = EmissionsInventory::new();

        let mut a = EmissionsTable::new();
        a.add(Eic(710), Pollutant::Co, 1.0);
        inventory.add_table(Region(37), date, a);

        let mut b = EmissionsTable::new();
        b.add(Eic(710), Pollutant::Co, 2.0);
        inventory.add_table(Region(37), date, b);

        let table = inventory.get(Region(37), date).unwrap();
        assert_relative_eq!(table.get(Eic(710), Pollutant::Co), 3.0);
    }

    #[test]
    fn require_names_missing_region_and_date() {
        let inventory = EmissionsInventory::new();
        let date = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        let err = inventory.require(Region(37), date).unwrap_err();
        assert!(err.to_string().contains("37"));
        assert!(err.to_string().contains("2020-06-01"));
    }

    #[test]
    fn table_roundtrips_through_json() {
        let mut table = EmissionsTable::new();
        table.add(Eic(71074211000000), Pollutant::Co, 1.5);
        table.add(Eic(71074211000000), Pollutant::Nox, 0.25);
        let serialized = serde_json::to_string(&table).unwrap();
        let deserialized: EmissionsTable = serde_json::from_str(&serialized).unwrap();
        assert_relative_eq!(
            deserialized.get(Eic(71074211000000), Pollutant::Nox),
            0.25
        );
    }

    #[test]
    fn pollutant_parsing_is_case_insensitive() {
        assert_eq!("CO".parse::<Pollutant>().unwrap(), Pollutant::Co);
        assert_eq!("nox".parse::<Pollutant>().unwrap(), Pollutant::Nox);
        assert!("ozone".parse::<Pollutant>().is_err());
    }
}
