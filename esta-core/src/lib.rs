pub mod calendar;
pub mod categories;
pub mod eic;
pub mod emissions;
pub mod region;
pub mod scaled;
pub mod scaler;
pub mod sparse;
pub mod speciation;
pub mod surrogate;

pub mod errors;

/// Floating point type used for emissions values, fractions, and grids.
///
/// The core accumulates in 32-bit throughout. Historical inventories were
/// produced with single-precision tolerances, and downstream regression
/// comparisons expect values at that precision.
pub type FloatValue = f32;
