//! The typed event stream produced by the Download Event Producer and
//! consumed by the Update Applier.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::version::{DataVersion, PartInfo, VersionNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Full,
    Patch,
}

/// One file the Download Planner decided to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFileSpec {
    Full {
        version: VersionNumber,
        part_info: Option<PartInfo>,
    },
    Patch {
        version: VersionNumber,
    },
}

impl DownloadFileSpec {
    pub fn format(&self) -> FileFormat {
        match self {
            DownloadFileSpec::Full { .. } => FileFormat::Full,
            DownloadFileSpec::Patch { .. } => FileFormat::Patch,
        }
    }

    pub fn version(&self) -> VersionNumber {
        match self {
            DownloadFileSpec::Full { version, .. } | DownloadFileSpec::Patch { version } => {
                *version
            }
        }
    }

    pub fn part_info(&self) -> Option<PartInfo> {
        match self {
            DownloadFileSpec::Full { part_info, .. } => *part_info,
            DownloadFileSpec::Patch { .. } => None,
        }
    }
}

/// The header line of a download file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileHeader {
    #[serde(rename = "type")]
    pub ty: String,
    pub version: HeaderVersion,
    pub records: u64,
    #[serde(default)]
    pub part: Option<u16>,
    pub format: FileFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub date_of_creation: String,
    #[serde(default)]
    pub database_version: Option<String>,
}

/// What to do with a parsed patch/full record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    Add,
    Change,
    Delete,
}

impl RecordMode {
    pub fn from_patch_tag(tag: &str) -> Option<RecordMode> {
        match tag {
            "+" => Some(RecordMode::Add),
            "-" => Some(RecordMode::Delete),
            "~" => Some(RecordMode::Change),
            _ => None,
        }
    }
}

/// A single event in the download stream.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Reset,
    DownloadStart {
        files: usize,
    },
    FileStart {
        version: VersionNumber,
        part_info: Option<PartInfo>,
        total_records: u64,
    },
    Record {
        mode: RecordMode,
        payload: Value,
    },
    FileEnd {
        header: DataVersion,
    },
    DownloadEnd,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn patch_tags_map_to_modes() {
        assert_eq!(RecordMode::from_patch_tag("+"), Some(RecordMode::Add));
        assert_eq!(RecordMode::from_patch_tag("-"), Some(RecordMode::Delete));
        assert_eq!(RecordMode::from_patch_tag("~"), Some(RecordMode::Change));
        assert_eq!(RecordMode::from_patch_tag("?"), None);
    }

    #[test]
    fn file_spec_exposes_version_and_format() {
        let spec = DownloadFileSpec::Patch {
            version: VersionNumber::new(1, 0, 2),
        };
        assert_eq!(spec.format(), FileFormat::Patch);
        assert_eq!(spec.version(), VersionNumber::new(1, 0, 2));
        assert_eq!(spec.part_info(), None);
    }
}
