//! Emissions Inventory Code keys and precision reduction.
//!
//! An EIC identifies a detailed vehicle/fuel/process combination. The
//! canonical key is 14 digits; users who do not need full granularity can
//! collapse keys to 7- or 3-digit precision. Reduction is a pure integer
//! truncation, so two distinct detailed categories may collapse onto the
//! same coarse key: consumers must sum values on collision, and a single
//! run must apply one precision consistently on both the input and output
//! sides of any comparison.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Emissions Inventory Code: a hierarchical integer category key.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Eic(pub u64);

impl Eic {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Eic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Eic {
    fn from(value: u64) -> Self {
        Eic(value)
    }
}

/// Precision at which EIC keys are carried through a run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EicPrecision {
    /// Full 14-digit keys, unreduced.
    #[default]
    Full,
    /// 7-digit keys: vehicle, fuel, and process family.
    Seven,
    /// 3-digit keys: top-level category only.
    Three,
}

impl EicPrecision {
    /// Reduce a 14-digit key to this precision.
    ///
    /// `Full` is the identity. `Seven` drops the trailing 7 digits and
    /// `Three` the trailing 11, both by integer division.
    pub fn reduce(self, eic: Eic) -> Eic {
        match self {
            EicPrecision::Full => eic,
            EicPrecision::Seven => Eic(eic.0 / 10_000_000),
            EicPrecision::Three => Eic(eic.0 / 100_000_000_000),
        }
    }
}
