//! Input adapters: CSV readers for every table the core consumes.
//!
//! Loaders own all file I/O and parsing; the core only ever sees fully
//! constructed, validated data structures. Malformed numeric input is fatal
//! here, surfaced with file and row context.

mod categories;
mod emissions;
mod spatial;
mod speciation;
mod temporal;

pub use categories::{load_categories, read_categories};
pub use emissions::{read_inventory, CsvInventoryLoader};
pub use spatial::{load_spatial, read_spatial};
pub use speciation::load_speciation;
pub use temporal::{load_temporal, read_diurnal, read_dow, read_doy};

use crate::config::RunConfig;
use anyhow::Result;
use esta_core::emissions::EmissionsInventory;

/// Loads the coarse inventory for the configured region and date scope.
pub trait InventoryLoader {
    /// Name used by the component registry and in diagnostics.
    fn name(&self) -> &'static str;

    fn load(&self, config: &RunConfig) -> Result<EmissionsInventory>;
}
