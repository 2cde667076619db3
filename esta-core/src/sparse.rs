//! Gridded emissions containers.
//!
//! A [`SparseEmissions`] holds one dense 2D array per pollutant or species
//! name over a common extent. Grids are either domain-sized (origin at
//! `(0, 0)`) or region-bounded, carrying the grid-coordinate origin of the
//! region's bounding box so a sub-grid can later be merged into a domain
//! grid at the right offset.
//!
//! All per-species arrays in one instance share identical dimensions; every
//! combining operation is additive, never overwriting.

use crate::errors::{EstaError, EstaResult};
use crate::region::GridBounds;
use crate::FloatValue;
use indexmap::IndexMap;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimensions of a gridded domain (rows x cols).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridExtent {
    pub rows: usize,
    pub cols: usize,
}

impl fmt::Display for GridExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Gridded emissions for one region/date/hour/category.
#[derive(Clone, Debug)]
pub struct SparseEmissions {
    extent: GridExtent,
    /// Domain coordinates of this grid's `[0, 0]` cell.
    origin: (usize, usize),
    grids: IndexMap<String, Array2<FloatValue>>,
}

impl SparseEmissions {
    /// An empty grid covering the full domain.
    pub fn new(extent: GridExtent) -> Self {
        Self {
            extent,
            origin: (0, 0),
            grids: IndexMap::new(),
        }
    }

    /// An empty grid bounded to a region's bounding box.
    pub fn for_bounds(bounds: &GridBounds) -> Self {
        Self {
            extent: bounds.extent(),
            origin: (bounds.row0, bounds.col0),
            grids: IndexMap::new(),
        }
    }

    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    /// True if no species has been added yet.
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Names of the species held, in insertion order.
    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.grids.keys().map(String::as_str)
    }

    pub fn grid(&self, species: &str) -> Option<&Array2<FloatValue>> {
        self.grids.get(species)
    }

    fn grid_mut(&mut self, species: &str) -> &mut Array2<FloatValue> {
        let extent = self.extent;
        self.grids
            .entry(species.to_string())
            .or_insert_with(|| Array2::zeros((extent.rows, extent.cols)))
    }

    /// Add a value at a domain cell, summing with any existing value.
    ///
    /// # Panics
    ///
    /// Panics if the domain cell falls outside this grid's extent; callers
    /// are expected to bounds-check against region metadata first.
    pub fn add(&mut self, species: &str, row: usize, col: usize, value: FloatValue) {
        let extent = self.extent;
        let origin = self.origin;
        assert!(
            row >= origin.0 && col >= origin.1,
            "cell ({}, {}) precedes grid origin ({}, {})",
            row,
            col,
            origin.0,
            origin.1
        );
        let (r, c) = (row - origin.0, col - origin.1);
        assert!(
            r < extent.rows && c < extent.cols,
            "cell ({}, {}) outside grid extent {}",
            row,
            col,
            extent
        );
        self.grid_mut(species)[[r, c]] += value;
    }

    /// Scale every species grid in place.
    pub fn scale(&mut self, factor: FloatValue) {
        for grid in self.grids.values_mut() {
            grid.mapv_inplace(|v| v * factor);
        }
    }

    /// Scale one species grid in place; a no-op if the species is absent.
    pub fn scale_species(&mut self, species: &str, factor: FloatValue) {
        if let Some(grid) = self.grids.get_mut(species) {
            grid.mapv_inplace(|v| v * factor);
        }
    }

    /// Additively merge another grid with the same extent and origin.
    ///
    /// Species present in only one side are carried through; species present
    /// in both are summed cell-wise.
    pub fn join(&mut self, other: &SparseEmissions) -> EstaResult<()> {
        if self.extent != other.extent || self.origin != other.origin {
            return Err(EstaError::GridShapeMismatch {
                expected: format!("{} at {:?}", self.extent, self.origin),
                actual: format!("{} at {:?}", other.extent, other.origin),
            });
        }
        for (species, grid) in &other.grids {
            *self.grid_mut(species) += grid;
        }
        Ok(())
    }

    /// Additively merge a region-bounded grid into this domain grid at the
    /// sub-grid's origin offset.
    pub fn add_subgrid(&mut self, sub: &SparseEmissions) -> EstaResult<()> {
        let (row0, col0) = sub.origin;
        if row0 + sub.extent.rows > self.extent.rows || col0 + sub.extent.cols > self.extent.cols {
            return Err(EstaError::GridShapeMismatch {
                expected: format!("sub-grid within {}", self.extent),
                actual: format!("{} at ({}, {})", sub.extent, row0, col0),
            });
        }
        for (species, grid) in &sub.grids {
            let mut window = self.grid_mut(species).slice_mut(s![
                row0..row0 + sub.extent.rows,
                col0..col0 + sub.extent.cols
            ]);
            window += grid;
        }
        Ok(())
    }

    /// Zero every cell outside the given domain bounding box.
    pub fn mask(&mut self, bounds: &GridBounds) {
        let origin = self.origin;
        for grid in self.grids.values_mut() {
            for ((r, c), value) in grid.indexed_iter_mut() {
                if !bounds.contains(origin.0 + r, origin.1 + c) {
                    *value = 0.0;
                }
            }
        }
    }

    /// Sum of all cells for one species (0 if absent).
    pub fn total(&self, species: &str) -> FloatValue {
        self.grids.get(species).map(|g| g.sum()).unwrap_or(0.0)
    }

    /// Sum of all cells across all species.
    pub fn total_all(&self) -> FloatValue {
        self.grids.values().map(|g| g.sum()).sum()
    }

    /// Iterate nonzero cells as `(species, domain row, domain col, value)`.
    pub fn iter_nonzero(
        &self,
    ) -> impl Iterator<Item = (&str, usize, usize, FloatValue)> + '_ {
        let origin = self.origin;
        self.grids.iter().flat_map(move |(species, grid)| {
            grid.indexed_iter().filter(|&(_, &v)| v != 0.0).map(
                move |((r, c), &v)| (species.as_str(), origin.0 + r, origin.1 + c, v),
            )
        })
    }
}
