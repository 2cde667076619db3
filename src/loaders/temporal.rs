//! Temporal profile loaders: day-of-week factors, diurnal profiles, and
//! the optional day-of-year factors.
//!
//! Row layouts:
//! - DOW: `region,day_type,class,factor`
//! - diurnal: `region,day_type,class,hour,fraction` (hours 0-23; profiles
//!   are normalized to sum to 1 after loading)
//! - DOY: `region,day,hour,day_fraction,hour_fraction` (one row per hour;
//!   the day fraction is repeated on every row of a day)

use crate::config::RunConfig;
use anyhow::{ensure, Context, Result};
use esta_core::calendar::DayType;
use esta_core::categories::CalvadClass;
use esta_core::region::Region;
use esta_core::surrogate::temporal::{
    DiurnalProfiles, DowFactors, DoyFactor, DoyFactors, TemporalProfiles,
};
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct DowRow {
    region: u32,
    day_type: String,
    class: String,
    factor: f32,
}

pub fn read_dow<R: Read>(reader: R) -> Result<DowFactors> {
    let mut dow = DowFactors::new();
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<DowRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("day-of-week row at line {line}"))?;
        ensure!(
            row.factor >= 0.0,
            "negative day-of-week factor {} at line {line}",
            row.factor
        );
        let day_type: DayType = row
            .day_type
            .parse()
            .with_context(|| format!("day-of-week row at line {line}"))?;
        let class: CalvadClass = row
            .class
            .parse()
            .with_context(|| format!("day-of-week row at line {line}"))?;
        dow.set(Region(row.region), day_type, class, row.factor);
    }
    Ok(dow)
}

#[derive(Debug, Deserialize)]
struct DiurnalRow {
    region: u32,
    day_type: String,
    class: String,
    hour: usize,
    fraction: f32,
}

pub fn read_diurnal<R: Read>(reader: R) -> Result<DiurnalProfiles> {
    let mut diurnal = DiurnalProfiles::new();
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<DiurnalRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("diurnal row at line {line}"))?;
        ensure!(row.hour < 24, "hour {} out of range at line {line}", row.hour);
        ensure!(
            row.fraction >= 0.0,
            "negative diurnal fraction {} at line {line}",
            row.fraction
        );
        let day_type: DayType = row
            .day_type
            .parse()
            .with_context(|| format!("diurnal row at line {line}"))?;
        let class: CalvadClass = row
            .class
            .parse()
            .with_context(|| format!("diurnal row at line {line}"))?;
        diurnal.set_fraction(Region(row.region), day_type, class, row.hour, row.fraction);
    }
    diurnal.normalize();
    Ok(diurnal)
}

#[derive(Debug, Deserialize)]
struct DoyRow {
    region: u32,
    day: u32,
    hour: usize,
    day_fraction: f32,
    hour_fraction: f32,
}

pub fn read_doy<R: Read>(reader: R) -> Result<DoyFactors> {
    let mut accumulated: HashMap<(Region, u32), DoyFactor> = HashMap::new();
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<DoyRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("day-of-year row at line {line}"))?;
        ensure!(row.hour < 24, "hour {} out of range at line {line}", row.hour);
        ensure!(
            (1..=366).contains(&row.day),
            "Julian day {} out of range at line {line}",
            row.day
        );
        let entry = accumulated
            .entry((Region(row.region), row.day))
            .or_insert(DoyFactor {
                day_fraction: row.day_fraction,
                hour_fractions: [0.0; 24],
            });
        entry.day_fraction = row.day_fraction;
        entry.hour_fractions[row.hour] = row.hour_fraction;
    }

    let mut doy = DoyFactors::new();
    for ((region, day), factor) in accumulated {
        doy.insert(region, day, factor);
    }
    Ok(doy)
}

/// Load the full temporal bundle; day-of-year factors only when configured.
pub fn load_temporal(config: &RunConfig) -> Result<TemporalProfiles> {
    let dow_path = &config.inputs.dow;
    let dow = read_dow(
        File::open(dow_path)
            .with_context(|| format!("opening day-of-week factors {}", dow_path.display()))?,
    )
    .with_context(|| format!("loading day-of-week factors {}", dow_path.display()))?;

    let diurnal_path = &config.inputs.diurnal;
    let diurnal = read_diurnal(
        File::open(diurnal_path)
            .with_context(|| format!("opening diurnal profiles {}", diurnal_path.display()))?,
    )
    .with_context(|| format!("loading diurnal profiles {}", diurnal_path.display()))?;

    let doy = match &config.inputs.doy {
        Some(path) => {
            let factors = read_doy(
                File::open(path)
                    .with_context(|| format!("opening day-of-year factors {}", path.display()))?,
            )
            .with_context(|| format!("loading day-of-year factors {}", path.display()))?;
            info!("loaded day-of-year factors from {}", path.display());
            Some(factors)
        }
        None => None,
    };

    Ok(TemporalProfiles { dow, diurnal, doy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dow_rows_parse() {
        let data = "\
region,day_type,class,factor
37,mon,light_duty,0.9
37,sat,light_duty,0.6
";
        let dow = read_dow(data.as_bytes()).unwrap();
        assert_relative_eq!(
            dow.factor(Region(37), DayType::Mon, CalvadClass::LightDuty)
                .unwrap(),
            0.9
        );
        assert_relative_eq!(
            dow.factor(Region(37), DayType::Sat, CalvadClass::LightDuty)
                .unwrap(),
            0.6
        );
    }

    #[test]
    fn unknown_day_type_is_fatal() {
        let data = "\
region,day_type,class,factor
37,wednesday,light_duty,0.9
";
        let err = read_dow(data.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("wednesday"));
    }

    #[test]
    fn diurnal_profiles_normalize_on_load() {
        let mut data = String::from("region,day_type,class,hour,fraction\n");
        for hour in 0..24 {
            data.push_str(&format!("37,mon,light_duty,{hour},2.0\n"));
        }
        let diurnal = read_diurnal(data.as_bytes()).unwrap();
        assert_relative_eq!(
            diurnal
                .fraction(Region(37), DayType::Mon, CalvadClass::LightDuty, 12)
                .unwrap(),
            1.0 / 24.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn out_of_range_hour_is_fatal() {
        let data = "\
region,day_type,class,hour,fraction
37,mon,light_duty,24,0.5
";
        assert!(read_diurnal(data.as_bytes()).is_err());
    }

    #[test]
    fn doy_rows_assemble_per_day_factors() {
        let data = "\
region,day,hour,day_fraction,hour_fraction
37,152,0,0.8,0.1
37,152,1,0.8,0.9
";
        let doy = read_doy(data.as_bytes()).unwrap();
        let factor = doy.get(Region(37), 152).unwrap();
        assert_relative_eq!(factor.day_fraction, 0.8);
        assert_relative_eq!(factor.hour_fractions[0], 0.1);
        assert_relative_eq!(factor.hour_fractions[1], 0.9);
        assert_relative_eq!(factor.hour_fractions[2], 0.0);
    }

    #[test]
    fn out_of_range_julian_day_is_fatal() {
        let data = "\
region,day,hour,day_fraction,hour_fraction
37,367,0,0.8,0.1
";
        assert!(read_doy(data.as_bytes()).is_err());
    }
}
