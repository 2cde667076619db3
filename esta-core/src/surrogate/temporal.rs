//! Temporal surrogates: day-of-week factors and diurnal profiles.
//!
//! Two independent factor sets per region and day type, both indexed by
//! CalVad vehicle class rather than raw category: a scalar day-of-week
//! adjustment and a 24-element diurnal fraction vector normalized to sum
//! to 1 over the day. An optional third set supplies empirical day-of-year
//! factors for heavy-duty diesel, keyed by region and Julian day.

use crate::calendar::DayType;
use crate::categories::CalvadClass;
use crate::errors::{EstaError, EstaResult};
use crate::region::Region;
use crate::FloatValue;
use is_close::is_close;
use std::collections::HashMap;

/// Day-of-week scale factors by region, day type, and vehicle class.
#[derive(Clone, Debug, Default)]
pub struct DowFactors {
    factors: HashMap<Region, HashMap<DayType, HashMap<CalvadClass, FloatValue>>>,
}

impl DowFactors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        region: Region,
        day_type: DayType,
        class: CalvadClass,
        factor: FloatValue,
    ) {
        self.factors
            .entry(region)
            .or_default()
            .entry(day_type)
            .or_default()
            .insert(class, factor);
    }

    /// Factor for a class; a miss is an inconsistent factor table.
    pub fn factor(
        &self,
        region: Region,
        day_type: DayType,
        class: CalvadClass,
    ) -> EstaResult<FloatValue> {
        self.factors
            .get(&region)
            .and_then(|by_day| by_day.get(&day_type))
            .and_then(|by_class| by_class.get(&class))
            .copied()
            .ok_or_else(|| {
                EstaError::Error(format!(
                    "no day-of-week factor for region {region}, day type {:?}, class {:?}",
                    day_type, class
                ))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// 24-hour diurnal fraction profiles by region, day type, and vehicle class.
#[derive(Clone, Debug, Default)]
pub struct DiurnalProfiles {
    profiles: HashMap<Region, HashMap<DayType, HashMap<CalvadClass, [FloatValue; 24]>>>,
}

impl DiurnalProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fraction(
        &mut self,
        region: Region,
        day_type: DayType,
        class: CalvadClass,
        hour: usize,
        fraction: FloatValue,
    ) {
        debug_assert!(hour < 24);
        self.profiles
            .entry(region)
            .or_default()
            .entry(day_type)
            .or_default()
            .entry(class)
            .or_insert([0.0; 24])[hour] = fraction;
    }

    /// Fraction for a class at an hour (0-23); a miss is an inconsistent
    /// profile table.
    pub fn fraction(
        &self,
        region: Region,
        day_type: DayType,
        class: CalvadClass,
        hour: usize,
    ) -> EstaResult<FloatValue> {
        self.profiles
            .get(&region)
            .and_then(|by_day| by_day.get(&day_type))
            .and_then(|by_class| by_class.get(&class))
            .map(|profile| profile[hour])
            .ok_or_else(|| {
                EstaError::Error(format!(
                    "no diurnal profile for region {region}, day type {:?}, class {:?}",
                    day_type, class
                ))
            })
    }

    /// Normalize every profile to sum to 1 over the day.
    ///
    /// Same degenerate-case policy as spatial surrogates: a zero-total
    /// profile becomes uniform `1/24`.
    pub fn normalize(&mut self) {
        for by_day in self.profiles.values_mut() {
            for by_class in by_day.values_mut() {
                for profile in by_class.values_mut() {
                    let total: FloatValue = profile.iter().sum();
                    if is_close!(total as f64, 1.0, rel_tol = 1e-5) {
                        continue;
                    }
                    if total == 0.0 {
                        *profile = [1.0 / 24.0; 24];
                        continue;
                    }
                    for fraction in profile.iter_mut() {
                        *fraction /= total;
                    }
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Empirical day-of-year factors for one region and Julian day.
#[derive(Clone, Debug)]
pub struct DoyFactor {
    /// Day-level fraction replacing the day-of-week factor.
    pub day_fraction: FloatValue,
    /// Hourly fractions replacing the diurnal profile.
    pub hour_fractions: [FloatValue; 24],
}

/// Day-of-year factor set, keyed by region and Julian day (1-366).
///
/// Supplied only for heavy-duty diesel; a missing entry is genuinely
/// absent upstream data, treated as zero contribution rather than an
/// error.
#[derive(Clone, Debug, Default)]
pub struct DoyFactors {
    factors: HashMap<(Region, u32), DoyFactor>,
}

impl DoyFactors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: Region, ordinal: u32, factor: DoyFactor) {
        self.factors.insert((region, ordinal), factor);
    }

    pub fn get(&self, region: Region, ordinal: u32) -> Option<&DoyFactor> {
        self.factors.get(&(region, ordinal))
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// The temporal surrogate bundle handed to a scaler.
#[derive(Clone, Debug, Default)]
pub struct TemporalProfiles {
    pub dow: DowFactors,
    pub diurnal: DiurnalProfiles,
    /// Present only when the run supplies day-of-year data.
    pub doy: Option<DoyFactors>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dow_lookup_roundtrip() {
        let mut dow = DowFactors::new();
        dow.set(Region(37), DayType::Mon, CalvadClass::LightDuty, 0.9);
        assert_relative_eq!(
            dow.factor(Region(37), DayType::Mon, CalvadClass::LightDuty)
                .unwrap(),
            0.9
        );
    }

    #[test]
    fn dow_miss_names_the_key() {
        let dow = DowFactors::new();
        let err = dow
            .factor(Region(37), DayType::Sat, CalvadClass::HeavyHeavy)
            .unwrap_err();
        assert!(err.to_string().contains("37"));
        assert!(err.to_string().contains("Sat"));
    }

    #[test]
    fn diurnal_normalization_sums_to_one() {
        let mut diurnal = DiurnalProfiles::new();
        for hour in 0..24 {
            diurnal.set_fraction(
                Region(37),
                DayType::Tuth,
                CalvadClass::LightDuty,
                hour,
                (hour + 1) as FloatValue,
            );
        }
        diurnal.normalize();
        let total: FloatValue = (0..24)
            .map(|h| {
                diurnal
                    .fraction(Region(37), DayType::Tuth, CalvadClass::LightDuty, h)
                    .unwrap()
            })
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn diurnal_normalization_is_idempotent() {
        let mut diurnal = DiurnalProfiles::new();
        for hour in 0..24 {
            diurnal.set_fraction(
                Region(1),
                DayType::Fri,
                CalvadClass::LightMedium,
                hour,
                if hour == 7 { 3.0 } else { 1.0 },
            );
        }
        diurnal.normalize();
        let once = diurnal
            .fraction(Region(1), DayType::Fri, CalvadClass::LightMedium, 7)
            .unwrap();
        diurnal.normalize();
        let twice = diurnal
            .fraction(Region(1), DayType::Fri, CalvadClass::LightMedium, 7)
            .unwrap();
        assert_relative_eq!(once, twice, epsilon = 1e-6);
    }

    #[test]
    fn zero_total_profile_becomes_uniform() {
        let mut diurnal = DiurnalProfiles::new();
        diurnal.set_fraction(Region(1), DayType::Sun, CalvadClass::HeavyHeavy, 0, 0.0);
        diurnal.normalize();
        for hour in 0..24 {
            assert_relative_eq!(
                diurnal
                    .fraction(Region(1), DayType::Sun, CalvadClass::HeavyHeavy, hour)
                    .unwrap(),
                1.0 / 24.0
            );
        }
    }

    #[test]
    fn doy_missing_entry_is_none() {
        let mut doy = DoyFactors::new();
        doy.insert(
            Region(37),
            152,
            DoyFactor {
                day_fraction: 0.8,
                hour_fractions: [1.0 / 24.0; 24],
            },
        );
        assert!(doy.get(Region(37), 152).is_some());
        assert!(doy.get(Region(37), 153).is_none());
        assert!(doy.get(Region(59), 152).is_none());
    }
}
