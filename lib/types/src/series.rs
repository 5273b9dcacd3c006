//! Data series identifiers.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// The four replicated data series.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataSeries {
    Words,
    Kanji,
    Radicals,
    Names,
}

/// Series which are independently tracked by the Sync Coordinator (i.e. not
/// an implicit follow-on of another series).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MajorDataSeries {
    Words,
    Kanji,
    Names,
}

impl MajorDataSeries {
    pub fn as_series(&self) -> DataSeries {
        match self {
            MajorDataSeries::Words => DataSeries::Words,
            MajorDataSeries::Kanji => DataSeries::Kanji,
            MajorDataSeries::Names => DataSeries::Names,
        }
    }

    /// Series implicitly updated after this one completes successfully.
    pub fn follow_on(&self) -> Option<DataSeries> {
        match self {
            MajorDataSeries::Kanji => Some(DataSeries::Radicals),
            _ => None,
        }
    }
}

impl DataSeries {
    /// `true` for series that `deleteSeries('kanji')` also clears.
    pub fn companion_series(&self) -> Option<DataSeries> {
        match self {
            DataSeries::Kanji => Some(DataSeries::Radicals),
            _ => None,
        }
    }
}
