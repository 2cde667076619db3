//! Speciation table loaders: GSREF, GSPRO, NH3/CO ratios, NOx splits, and
//! the heavy-duty diesel category set.
//!
//! Row layouts:
//! - GSREF: `eic,pollutant,profile`
//! - GSPRO: `profile,pollutant,species,mass_fraction,weight`
//! - NH3 ratios: `region,eic,ratio`
//! - NOx splits: `region,year,hono,no,no2`
//! - HDD categories: `eic`

use crate::config::RunConfig;
use anyhow::{bail, ensure, Context, Result};
use esta_core::eic::Eic;
use esta_core::emissions::Pollutant;
use esta_core::region::Region;
use esta_core::speciation::{NoxSplit, SpeciationData, SpeciesFraction};
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct GsrefRow {
    eic: u64,
    pollutant: String,
    profile: String,
}

#[derive(Debug, Deserialize)]
struct GsproRow {
    profile: String,
    pollutant: String,
    species: String,
    mass_fraction: f32,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct Nh3Row {
    region: u32,
    eic: u64,
    ratio: f32,
}

#[derive(Debug, Deserialize)]
struct NoxRow {
    region: u32,
    year: i32,
    hono: f32,
    no: f32,
    no2: f32,
}

#[derive(Debug, Deserialize)]
struct HddRow {
    eic: u64,
}

fn read_gsref<R: Read>(reader: R, data: &mut SpeciationData) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<GsrefRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("GSREF row at line {line}"))?;
        let pollutant: Pollutant = row
            .pollutant
            .parse()
            .with_context(|| format!("GSREF row at line {line}"))?;
        data.profiles
            .set_profile(Eic(row.eic), pollutant, &row.profile);
    }
    Ok(())
}

fn read_gspro<R: Read>(reader: R, data: &mut SpeciationData) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<GsproRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("GSPRO row at line {line}"))?;
        ensure!(
            row.mass_fraction >= 0.0,
            "negative mass fraction {} at line {line}",
            row.mass_fraction
        );
        ensure!(
            row.weight > 0.0,
            "non-positive molecular weight {} at line {line}",
            row.weight
        );
        let pollutant: Pollutant = row
            .pollutant
            .parse()
            .with_context(|| format!("GSPRO row at line {line}"))?;
        data.profiles.add_species(
            &row.profile,
            pollutant,
            SpeciesFraction {
                name: row.species,
                mass_fraction: row.mass_fraction,
                weight: row.weight,
            },
        );
    }
    Ok(())
}

fn read_nh3<R: Read>(reader: R, data: &mut SpeciationData) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<Nh3Row>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("NH3 ratio row at line {line}"))?;
        ensure!(
            row.ratio >= 0.0,
            "negative NH3/CO ratio {} at line {line}",
            row.ratio
        );
        data.nh3_ratios
            .insert(Region(row.region), Eic(row.eic), row.ratio);
    }
    Ok(())
}

fn read_nox<R: Read>(reader: R, data: &mut SpeciationData) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<NoxRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("NOx split row at line {line}"))?;
        let total = row.hono + row.no + row.no2;
        ensure!(
            (total - 1.0).abs() < 1e-3,
            "NOx split fractions sum to {total} at line {line}"
        );
        data.nox_splits.insert(
            Region(row.region),
            row.year,
            NoxSplit {
                hono: row.hono,
                no: row.no,
                no2: row.no2,
            },
        );
    }
    Ok(())
}

fn read_hdd<R: Read>(reader: R, data: &mut SpeciationData) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(reader);
    for (index, row) in rdr.deserialize::<HddRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("heavy-duty diesel row at line {line}"))?;
        data.hdd_categories.insert(Eic(row.eic));
    }
    Ok(())
}

fn open(path: &Path, what: &str) -> Result<File> {
    File::open(path).with_context(|| format!("opening {what} {}", path.display()))
}

/// Load the full speciation bundle for the speciating scaler.
///
/// GSREF and GSPRO are required; the ratio/split/HDD tables are optional
/// and default to empty (no NH3 synthesis, no override categories).
pub fn load_speciation(config: &RunConfig) -> Result<SpeciationData> {
    let mut data = SpeciationData::default();

    let Some(gsref) = &config.inputs.gsref else {
        bail!("the speciated scaler requires a gsref input path");
    };
    let Some(gspro) = &config.inputs.gspro else {
        bail!("the speciated scaler requires a gspro input path");
    };
    read_gsref(open(gsref, "GSREF table")?, &mut data)
        .with_context(|| format!("loading GSREF table {}", gsref.display()))?;
    read_gspro(open(gspro, "GSPRO table")?, &mut data)
        .with_context(|| format!("loading GSPRO table {}", gspro.display()))?;

    if let Some(path) = &config.inputs.nh3_ratios {
        read_nh3(open(path, "NH3 ratio table")?, &mut data)
            .with_context(|| format!("loading NH3 ratio table {}", path.display()))?;
    }
    if let Some(path) = &config.inputs.nox_splits {
        read_nox(open(path, "NOx split table")?, &mut data)
            .with_context(|| format!("loading NOx split table {}", path.display()))?;
    }
    if let Some(path) = &config.inputs.hdd_categories {
        read_hdd(open(path, "heavy-duty diesel category list")?, &mut data)
            .with_context(|| format!("loading heavy-duty diesel categories {}", path.display()))?;
    }

    info!(
        "loaded speciation profiles ({} heavy-duty diesel categories)",
        data.hdd_categories.len()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gsref_and_gspro_assemble_profiles() {
        let mut data = SpeciationData::default();
        read_gsref(
            "eic,pollutant,profile\n710,tog,P100\n".as_bytes(),
            &mut data,
        )
        .unwrap();
        read_gspro(
            "profile,pollutant,species,mass_fraction,weight\nP100,tog,ETHANE,0.3,30.07\n"
                .as_bytes(),
            &mut data,
        )
        .unwrap();
        let species = data
            .profiles
            .species_for(Eic(710), Pollutant::Tog)
            .unwrap();
        assert_eq!(species[0].name, "ETHANE");
        assert_relative_eq!(species[0].mass_fraction, 0.3);
    }

    #[test]
    fn nox_split_fractions_must_sum_to_one() {
        let mut data = SpeciationData::default();
        let bad = "region,year,hono,no,no2\n37,2020,0.5,0.5,0.5\n";
        assert!(read_nox(bad.as_bytes(), &mut data).is_err());

        let good = "region,year,hono,no,no2\n37,2020,0.01,0.89,0.10\n";
        read_nox(good.as_bytes(), &mut data).unwrap();
        let split = data.nox_splits.get(Region(37), 2020).unwrap();
        assert_relative_eq!(split.no, 0.89);
    }

    #[test]
    fn hdd_list_parses() {
        let mut data = SpeciationData::default();
        read_hdd("eic\n72074211000000\n".as_bytes(), &mut data).unwrap();
        assert!(data.is_heavy_duty_diesel(Eic(72074211000000)));
        assert!(!data.is_heavy_duty_diesel(Eic(710)));
    }
}
