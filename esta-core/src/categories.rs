//! Category metadata: the EIC to vehicle/activity/class mapping.
//!
//! Every inventoried category maps to a vehicle name, an activity label
//! (together the spatial surrogate key), and a CalVad vehicle-type class
//! that indexes the temporal factor tables. Many categories share one
//! class, so the DOW and diurnal curves are far coarser than the category
//! space.

use crate::eic::Eic;
use crate::errors::{EstaError, EstaResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// CalVad vehicle-type class indexing the temporal factor tables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalvadClass {
    LightDuty,
    LightMedium,
    HeavyHeavy,
    SchoolBus,
}

impl CalvadClass {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            CalvadClass::LightDuty => 0,
            CalvadClass::LightMedium => 1,
            CalvadClass::HeavyHeavy => 2,
            CalvadClass::SchoolBus => 3,
        }
    }
}

impl FromStr for CalvadClass {
    type Err = EstaError;

    fn from_str(s: &str) -> EstaResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "light_duty" | "ld" => Ok(CalvadClass::LightDuty),
            "light_medium" | "lm" => Ok(CalvadClass::LightMedium),
            "heavy_heavy" | "hh" => Ok(CalvadClass::HeavyHeavy),
            "school_bus" | "sbus" => Ok(CalvadClass::SchoolBus),
            _ => Err(EstaError::Error(format!("unknown vehicle class {s:?}"))),
        }
    }
}

/// Spatial and temporal lookup metadata for one category.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub vehicle: String,
    pub activity: String,
    pub class: CalvadClass,
}

/// The full category map for a run, constructed once from configuration.
#[derive(Clone, Debug, Default)]
pub struct CategoryMap {
    categories: HashMap<Eic, CategoryInfo>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, eic: Eic, info: CategoryInfo) {
        self.categories.insert(eic, info);
    }

    /// Metadata for a category; a miss is a configuration/data mismatch.
    pub fn get(&self, eic: Eic) -> EstaResult<&CategoryInfo> {
        self.categories
            .get(&eic)
            .ok_or(EstaError::UnknownCategory(eic))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Eic, &CategoryInfo)> + '_ {
        self.categories.iter().map(|(&eic, info)| (eic, info))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
