use crate::eic::Eic;
use crate::region::Region;
use chrono::NaiveDate;
use thiserror::Error;

/// Error type for invalid operations.
///
/// Every variant names the offending key so a modeler can trace the failure
/// back to the input dataset. The pipeline aborts on the first error rather
/// than producing a partial inventory.
#[derive(Error, Debug)]
pub enum EstaError {
    #[error("{0}")]
    Error(String),
    #[error("category {0} is missing from the category map")]
    UnknownCategory(Eic),
    #[error("no metadata configured for region {0}")]
    UnknownRegion(Region),
    #[error("unknown pollutant {0:?}")]
    UnknownPollutant(String),
    #[error("no emissions loaded for region {region} on {date}")]
    MissingEmissions { region: Region, date: NaiveDate },
    #[error("no spatial surrogate for region {region}, vehicle {vehicle:?}, label {label:?}")]
    MissingSurrogate {
        region: Region,
        vehicle: String,
        label: String,
    },
    #[error("no speciation profile for category {eic}, pollutant {pollutant}")]
    MissingSpeciationProfile { eic: Eic, pollutant: String },
    #[error("no NOx split for region {region} in year {year}")]
    MissingNoxSplit { region: Region, year: i32 },
    #[error("surrogate cell ({row}, {col}) lies outside the bounds of region {region}")]
    CellOutsideRegion {
        region: Region,
        row: usize,
        col: usize,
    },
    #[error("grid shape mismatch: expected {expected}, got {actual}")]
    GridShapeMismatch { expected: String, actual: String },
}

/// Convenience type for `Result<T, EstaError>`.
pub type EstaResult<T> = Result<T, EstaError>;
