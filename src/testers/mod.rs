//! QA testers: independent recomputation of totals from the scaled stream.

mod totals;

pub use totals::TotalsTester;

use anyhow::Result;
use esta_core::emissions::EmissionsInventory;
use esta_core::scaled::ScaledEmissions;

/// Observes every streamed unit, then reconciles against the original
/// pre-scaling inventory once the run is complete.
pub trait OutputTester {
    /// Name used by the component registry and in diagnostics.
    fn name(&self) -> &'static str;

    /// Accumulate totals from one streamed unit.
    fn observe(&mut self, unit: &ScaledEmissions) -> Result<()>;

    /// Write the reconciliation report.
    fn report(&self, inventory: &EmissionsInventory) -> Result<()>;
}
