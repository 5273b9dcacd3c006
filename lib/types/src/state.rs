//! Per-series availability state and the update-in-progress state machine.

use serde::{Deserialize, Serialize};

use crate::series::DataSeries;
use crate::version::VersionNumber;

/// Availability of a series' stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSeriesState {
    /// Unknown: not yet probed since process start.
    Init,
    /// Probed: no data present.
    Empty,
    /// Probed: a version row is present.
    Ok,
    /// The store is inoperable for this series; sticky for the process.
    Unavailable,
}

impl DataSeriesState {
    /// `init -> {empty, ok, unavailable}` is the only legal transition out
    /// of `init`; `unavailable` is sticky; `empty`/`ok` freely interconvert.
    pub fn can_transition_to(&self, next: DataSeriesState) -> bool {
        use DataSeriesState::*;
        match self {
            Unavailable => next == Unavailable,
            Init => true,
            Empty | Ok => matches!(next, Empty | Ok | Unavailable),
        }
    }
}

/// The update-in-progress state machine tracked per `MajorDataSeries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum UpdateState {
    Idle {
        #[serde(skip_serializing_if = "Option::is_none")]
        last_check: Option<i64>,
    },
    Checking {
        series: DataSeries,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_check: Option<i64>,
    },
    Updating {
        series: DataSeries,
        version: VersionNumber,
        file_progress: f32,
        total_progress: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_check: Option<i64>,
    },
}

impl UpdateState {
    pub fn idle(last_check: Option<i64>) -> Self {
        UpdateState::Idle { last_check }
    }

    pub fn last_check(&self) -> Option<i64> {
        match self {
            UpdateState::Idle { last_check }
            | UpdateState::Checking { last_check, .. }
            | UpdateState::Updating { last_check, .. } => *last_check,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, UpdateState::Idle { .. })
    }

    pub fn is_updating(&self) -> bool {
        matches!(self, UpdateState::Updating { .. })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unavailable_is_sticky() {
        assert!(!DataSeriesState::Unavailable.can_transition_to(DataSeriesState::Ok));
        assert!(DataSeriesState::Unavailable.can_transition_to(DataSeriesState::Unavailable));
    }

    #[test]
    fn init_can_go_anywhere() {
        assert!(DataSeriesState::Init.can_transition_to(DataSeriesState::Ok));
        assert!(DataSeriesState::Init.can_transition_to(DataSeriesState::Unavailable));
    }

    #[test]
    fn update_state_preserves_last_check() {
        let s = UpdateState::Updating {
            series: DataSeries::Words,
            version: VersionNumber::new(1, 0, 0),
            file_progress: 0.5,
            total_progress: 0.2,
            last_check: Some(42),
        };
        assert_eq!(s.last_check(), Some(42));
        assert!(s.is_updating());
    }
}
