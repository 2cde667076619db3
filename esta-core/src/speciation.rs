//! Chemical speciation lookup tables.
//!
//! The speciating scaler resolves each category's lumped pollutant totals
//! into detailed chemical species through the GSREF/GSPRO profile pair:
//! GSREF maps a category and pollutant group to a named profile, GSPRO
//! maps that profile to the species it produces with their mass fractions
//! and molecular weights. Two override tables sit alongside: NH3/CO molar
//! ratios (on-road NH3 is not measured directly and is synthesized from
//! CO) and the 3-way HONO/NO/NO2 split applied to heavy-duty diesel NOx.
//!
//! # Conversion Factor Convention
//!
//! Scaled masses arrive in short tons/hour. One short ton/hour is
//! 907184.74 g over 3600 s, so multiplying by
//! [`TONS_PER_HOUR_TO_GRAMS_PER_SECOND`] yields g/s; dividing by a species'
//! molecular weight then yields moles/s. Mass-based species carry a weight
//! of 1 and stay in g/s.

use crate::eic::Eic;
use crate::emissions::Pollutant;
use crate::errors::{EstaError, EstaResult};
use crate::region::Region;
use crate::FloatValue;
use std::collections::{HashMap, HashSet};

/// Short tons/hour expressed as grams/second (907184.74 / 3600).
pub const TONS_PER_HOUR_TO_GRAMS_PER_SECOND: FloatValue = 251.995_76;

/// Molecular weights for the synthesized and split species (g/mol).
pub const NH3_WEIGHT: FloatValue = 17.031;
pub const HONO_WEIGHT: FloatValue = 47.013;
pub const NO_WEIGHT: FloatValue = 30.006;
pub const NO2_WEIGHT: FloatValue = 46.006;

/// One detailed species produced from a lumped pollutant group.
#[derive(Clone, Debug)]
pub struct SpeciesFraction {
    pub name: String,
    /// Fraction of the pollutant group's mass assigned to this species.
    pub mass_fraction: FloatValue,
    /// Molecular weight (g/mol), or 1 for mass-based species.
    pub weight: FloatValue,
}

/// The GSREF/GSPRO profile pair.
#[derive(Clone, Debug, Default)]
pub struct SpeciationProfiles {
    /// GSREF: category -> pollutant group -> profile id.
    gsref: HashMap<Eic, HashMap<Pollutant, String>>,
    /// GSPRO: profile id -> pollutant group -> species fractions.
    gspro: HashMap<String, HashMap<Pollutant, Vec<SpeciesFraction>>>,
}

impl SpeciationProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_profile(&mut self, eic: Eic, pollutant: Pollutant, profile: &str) {
        self.gsref
            .entry(eic)
            .or_default()
            .insert(pollutant, profile.to_string());
    }

    pub fn add_species(&mut self, profile: &str, pollutant: Pollutant, species: SpeciesFraction) {
        self.gspro
            .entry(profile.to_string())
            .or_default()
            .entry(pollutant)
            .or_default()
            .push(species);
    }

    /// Species fractions for a category's pollutant group.
    ///
    /// A miss at either lookup level indicates an inconsistent profile
    /// dataset and is fatal.
    pub fn species_for(&self, eic: Eic, pollutant: Pollutant) -> EstaResult<&[SpeciesFraction]> {
        let profile = self
            .gsref
            .get(&eic)
            .and_then(|by_poll| by_poll.get(&pollutant))
            .ok_or_else(|| EstaError::MissingSpeciationProfile {
                eic,
                pollutant: pollutant.as_str().to_string(),
            })?;
        self.gspro
            .get(profile)
            .and_then(|by_poll| by_poll.get(&pollutant))
            .map(Vec::as_slice)
            .ok_or_else(|| EstaError::MissingSpeciationProfile {
                eic,
                pollutant: pollutant.as_str().to_string(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.gsref.is_empty()
    }
}

/// NH3/CO molar ratios by region and category.
///
/// An absent ratio means no NH3 contribution from that category; that is
/// genuinely absent upstream data, not an error.
#[derive(Clone, Debug, Default)]
pub struct Nh3Ratios {
    ratios: HashMap<Region, HashMap<Eic, FloatValue>>,
}

impl Nh3Ratios {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: Region, eic: Eic, ratio: FloatValue) {
        self.ratios.entry(region).or_default().insert(eic, ratio);
    }

    pub fn get(&self, region: Region, eic: Eic) -> Option<FloatValue> {
        self.ratios
            .get(&region)
            .and_then(|by_eic| by_eic.get(&eic))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

/// HONO/NO/NO2 mass fractions for heavy-duty diesel NOx.
#[derive(Copy, Clone, Debug)]
pub struct NoxSplit {
    pub hono: FloatValue,
    pub no: FloatValue,
    pub no2: FloatValue,
}

/// NOx split table, keyed by region and inventory year.
#[derive(Clone, Debug, Default)]
pub struct NoxSplits {
    splits: HashMap<(Region, i32), NoxSplit>,
}

impl NoxSplits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: Region, year: i32, split: NoxSplit) {
        self.splits.insert((region, year), split);
    }

    /// Split for a region and year; a miss is fatal because the override
    /// only applies to categories known to need it.
    pub fn get(&self, region: Region, year: i32) -> EstaResult<NoxSplit> {
        self.splits
            .get(&(region, year))
            .copied()
            .ok_or(EstaError::MissingNoxSplit { region, year })
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }
}

/// The speciation lookup bundle handed to the speciating scaler.
#[derive(Clone, Debug, Default)]
pub struct SpeciationData {
    pub profiles: SpeciationProfiles,
    pub nh3_ratios: Nh3Ratios,
    pub nox_splits: NoxSplits,
    /// The enumerated heavy-duty diesel categories receiving the NOx split
    /// and the day-of-year override.
    pub hdd_categories: HashSet<Eic>,
}

impl SpeciationData {
    pub fn is_heavy_duty_diesel(&self, eic: Eic) -> bool {
        self.hdd_categories.contains(&eic)
    }
}
