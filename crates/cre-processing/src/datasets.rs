//! The fixed datasets the batch runner knows about.
//!
//! Each kind pins its input file name, the output file name of each cleaning
//! profile, whether `year_quarter` is derived, and how its groups are keyed.

use crate::config::CleaningMode;
use crate::grouping::GroupingPlan;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Leases,
    Occupancy,
    PriceAvailability,
    Unemployment,
    /// Any other CSV. Cleaned with the default grouping plan.
    Generic,
}

impl DatasetKind {
    /// The four datasets cleaned by a batch run, in processing order.
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Leases,
        DatasetKind::Occupancy,
        DatasetKind::PriceAvailability,
        DatasetKind::Unemployment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leases => "leases",
            Self::Occupancy => "occupancy",
            Self::PriceAvailability => "price_availability",
            Self::Unemployment => "unemployment",
            Self::Generic => "generic",
        }
    }

    pub fn input_file_name(&self) -> Option<&'static str> {
        match self {
            Self::Leases => Some("Leases.csv"),
            Self::Occupancy => Some("Major Market Occupancy Data.csv"),
            Self::PriceAvailability => Some("Price and Availability Data.csv"),
            Self::Unemployment => Some("Unemployment.csv"),
            Self::Generic => None,
        }
    }

    pub fn output_file_name(&self, mode: CleaningMode) -> Option<&'static str> {
        let name = match (self, mode) {
            (Self::Leases, CleaningMode::Dynamic) => "cleaned_leases_full_dynamic.csv",
            (Self::Occupancy, CleaningMode::Dynamic) => "cleaned_occupancy_full_dynamic.csv",
            (Self::PriceAvailability, CleaningMode::Dynamic) => "cleaned_price_avail_full_dynamic.csv",
            (Self::Unemployment, CleaningMode::Dynamic) => "cleaned_unemployment_full_dynamic.csv",
            (Self::Leases, CleaningMode::Minimal) => "Leases_minimalclean.csv",
            (Self::Occupancy, CleaningMode::Minimal) => "Occupancy_minimalclean.csv",
            (Self::PriceAvailability, CleaningMode::Minimal) => "PriceAvail_minimalclean.csv",
            (Self::Unemployment, CleaningMode::Minimal) => "Unemployment_minimalclean.csv",
            (Self::Generic, _) => return None,
        };
        Some(name)
    }

    /// Output name for an arbitrary input file, e.g. `rents.csv` becomes
    /// `rents_full_dynamic.csv` or `rents_minimalclean.csv`.
    pub fn generic_output_name(input: &Path, mode: CleaningMode) -> String {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());
        match mode {
            CleaningMode::Dynamic => format!("{}_full_dynamic.csv", stem),
            CleaningMode::Minimal => format!("{}_minimalclean.csv", stem),
        }
    }

    /// Whether the `year_quarter` key is derived for this dataset when its
    /// groups are cleaned.
    pub fn derives_year_quarter(&self) -> bool {
        !matches!(self, Self::Unemployment)
    }

    pub fn grouping_plan(&self) -> GroupingPlan {
        match self {
            Self::Unemployment => GroupingPlan::state_year(),
            _ => GroupingPlan::default(),
        }
    }

    /// Recognize one of the fixed input files by name.
    pub fn from_file_name(path: &Path) -> Self {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return Self::Generic;
        };
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.input_file_name()
                    .is_some_and(|input| input.eq_ignore_ascii_case(&name))
            })
            .unwrap_or(Self::Generic)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
