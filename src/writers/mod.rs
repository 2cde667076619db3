//! Output adapters: one self-contained file per date (and per region in
//! by-region mode).
//!
//! Writers are responsible for their format's declared units and file
//! naming. Finished files may be handed to a detached `gzip` child for
//! compression; a file is only ever compressed after it has been fully
//! written and closed, so in-progress writes of other dates cannot race
//! with it.

mod cse;
mod pmeds;

pub use cse::CseWriter;
pub use pmeds::PmedsWriter;

use anyhow::Result;
use chrono::NaiveDate;
use esta_core::region::Region;
use esta_core::scaled::{EmissionUnits, ScaledEmissions};
use log::{debug, warn};
use std::path::Path;
use std::process::Command;

/// Writes each streamed unit to disk.
pub trait OutputWriter {
    /// Name used by the component registry and in diagnostics.
    fn name(&self) -> &'static str;

    /// Reject unit systems this format cannot represent. Checked once at
    /// pipeline construction, before any scaling work starts.
    fn check_units(&self, _units: EmissionUnits) -> Result<()> {
        Ok(())
    }

    fn write(&self, unit: &ScaledEmissions) -> Result<()>;
}

/// File stem for one region-date of output.
pub(crate) fn file_stem(region: Region, date: NaiveDate) -> String {
    if region == Region::STATEWIDE {
        format!("state_{date}")
    } else {
        format!("{region}_{date}")
    }
}

/// Hand a finished file to a detached `gzip` child process.
///
/// Launch failures are logged and ignored; compression is a convenience,
/// not part of the run's correctness.
pub(crate) fn compress_in_background(path: &Path) {
    match Command::new("gzip").arg("-f").arg(path).spawn() {
        Ok(_) => debug!("compressing {} in the background", path.display()),
        Err(err) => warn!("failed to launch gzip for {}: {err}", path.display()),
    }
}
