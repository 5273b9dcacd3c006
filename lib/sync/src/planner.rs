//! Download Planner: given the locally stored version and the latest
//! manifest entry, decides whether to reset or incrementally patch, and
//! produces the ordered list of files to fetch.

use error::SyncError;
use types::event::DownloadFileSpec;
use types::series::DataSeries;
use types::version::{DataVersion, PartInfo, VersionNumber};

use crate::catalog::VersionInfo;

/// How far behind `latest.patch` the stored `patch` can fall, while a
/// partitioned full install is still in progress, before the planner gives
/// up resuming it and starts over. An operational choice (see DESIGN.md).
pub const PARTITIONED_RESET_PATCH_GAP: u16 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub reset: bool,
    pub files: Vec<DownloadFileSpec>,
}

fn full_files(version: VersionNumber, parts: Option<u16>) -> Vec<DownloadFileSpec> {
    match parts {
        Some(n) if n > 0 => (1..=n)
            .map(|part| DownloadFileSpec::Full {
                version,
                part_info: Some(PartInfo { part, parts: n }),
            })
            .collect(),
        _ => vec![DownloadFileSpec::Full {
            version,
            part_info: None,
        }],
    }
}

pub fn plan_update(
    series: DataSeries,
    current: Option<&DataVersion>,
    latest: &VersionInfo,
) -> Result<Plan, SyncError> {
    let latest_number = VersionNumber::new(latest.major, latest.minor, latest.patch);

    let Some(current) = current else {
        return Ok(Plan {
            reset: true,
            files: full_files(latest_number, latest.parts),
        });
    };

    if current.number > latest_number {
        return Err(SyncError::DatabaseTooOld {
            series: series.to_string(),
        });
    }

    if !current.number.same_major_minor(&latest_number) {
        return Ok(Plan {
            reset: true,
            files: full_files(latest_number, latest.parts),
        });
    }

    let patch_gap = latest_number.patch.saturating_sub(current.number.patch);
    if patch_gap > PARTITIONED_RESET_PATCH_GAP && current.part_info.is_some() {
        return Ok(Plan {
            reset: true,
            files: full_files(latest_number, latest.parts),
        });
    }

    let mut files = Vec::new();
    if let Some(part_info) = current.part_info {
        if !part_info.is_last() {
            for part in (part_info.part + 1)..=part_info.parts {
                files.push(DownloadFileSpec::Full {
                    version: current.number,
                    part_info: Some(PartInfo {
                        part,
                        parts: part_info.parts,
                    }),
                });
            }
        }
    }
    for patch in (current.number.patch + 1)..=latest_number.patch {
        files.push(DownloadFileSpec::Patch {
            version: VersionNumber::new(current.number.major, current.number.minor, patch),
        });
    }

    Ok(Plan {
        reset: false,
        files,
    })
}
