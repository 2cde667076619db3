//! Spatial and temporal surrogate datasets.
//!
//! Surrogates are normalized fractional distributions used to disaggregate
//! a regional total: spatially across grid cells, temporally across hours
//! of the day and day-of-week adjustment factors. All surrogate data is
//! read-only for the duration of a run and shared by reference between
//! scaling operations.

pub mod spatial;
pub mod temporal;

pub use spatial::{SpatialSurrogate, SpatialSurrogateData};
pub use temporal::{DiurnalProfiles, DowFactors, DoyFactor, DoyFactors, TemporalProfiles};
