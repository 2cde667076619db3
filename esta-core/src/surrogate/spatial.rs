//! Spatial surrogates: normalized activity fractions per grid cell.
//!
//! Raw road-network activity (VMT, trip counts, link volumes) is
//! accumulated per cell and then normalized into a probability-like
//! distribution. A surrogate with zero total activity normalizes to a
//! uniform `1/N` over the cells it already has, so the regional total can
//! still be spread somewhere instead of being lost.

use crate::errors::{EstaError, EstaResult};
use crate::region::Region;
use crate::FloatValue;
use indexmap::IndexMap;
use is_close::is_close;
use std::collections::HashMap;

/// Normalization tolerance for the already-normalized short-circuit.
const SUM_TOLERANCE: f64 = 1e-5;

/// Activity fractions for one region/vehicle/activity, keyed by domain cell.
#[derive(Clone, Debug, Default)]
pub struct SpatialSurrogate {
    cells: IndexMap<(usize, usize), FloatValue>,
}

impl SpatialSurrogate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate raw activity at a domain cell.
    pub fn add(&mut self, row: usize, col: usize, weight: FloatValue) {
        *self.cells.entry((row, col)).or_insert(0.0) += weight;
    }

    pub fn total(&self) -> FloatValue {
        self.cells.values().sum()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> FloatValue {
        self.cells.get(&(row, col)).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), FloatValue)> + '_ {
        self.cells.iter().map(|(&cell, &v)| (cell, v))
    }

    /// Normalize fractions to sum to 1.0.
    ///
    /// Already-normalized surrogates are returned unchanged. A zero-total
    /// surrogate gets uniform weight over its present cells; this is the
    /// degenerate-case policy, not an error.
    pub fn normalize(&mut self) {
        let total = self.total();
        if is_close!(total as f64, 1.0, rel_tol = SUM_TOLERANCE) {
            return;
        }
        if total == 0.0 {
            if self.cells.is_empty() {
                return;
            }
            let uniform = 1.0 / self.cells.len() as FloatValue;
            for value in self.cells.values_mut() {
                *value = uniform;
            }
            return;
        }
        for value in self.cells.values_mut() {
            *value /= total;
        }
    }
}

/// All spatial surrogates for a run, keyed by region and (vehicle, label).
///
/// Period-varying surrogates (VMT/VHT) appear under suffixed labels such as
/// `vmt_monday_am`; see [`crate::calendar::surrogate_label`].
#[derive(Clone, Debug, Default)]
pub struct SpatialSurrogateData {
    surrogates: HashMap<Region, HashMap<(String, String), SpatialSurrogate>>,
}

impl SpatialSurrogateData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate raw activity for a region/vehicle/label cell.
    pub fn add_weight(
        &mut self,
        region: Region,
        vehicle: &str,
        label: &str,
        row: usize,
        col: usize,
        weight: FloatValue,
    ) {
        self.surrogates
            .entry(region)
            .or_default()
            .entry((vehicle.to_string(), label.to_string()))
            .or_default()
            .add(row, col, weight);
    }

    /// Normalize every surrogate in place. Called once after loading.
    pub fn normalize(&mut self) {
        for by_key in self.surrogates.values_mut() {
            for surrogate in by_key.values_mut() {
                surrogate.normalize();
            }
        }
    }

    /// Look up a surrogate; a miss indicates a mismatch between the
    /// category map and the available surrogate files.
    pub fn get(
        &self,
        region: Region,
        vehicle: &str,
        label: &str,
    ) -> EstaResult<&SpatialSurrogate> {
        self.surrogates
            .get(&region)
            .and_then(|by_key| by_key.get(&(vehicle.to_string(), label.to_string())))
            .ok_or_else(|| EstaError::MissingSurrogate {
                region,
                vehicle: vehicle.to_string(),
                label: label.to_string(),
            })
    }

    pub fn contains(&self, region: Region, vehicle: &str, label: &str) -> bool {
        self.surrogates
            .get(&region)
            .is_some_and(|by_key| by_key.contains_key(&(vehicle.to_string(), label.to_string())))
    }

    pub fn is_empty(&self) -> bool {
        self.surrogates.is_empty()
    }
}
