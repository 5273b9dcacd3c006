//! Version numbers and the per-series stored data-version row.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A `{major, minor, patch}` triple, totally ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VersionNumber {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl VersionNumber {
    pub fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// `true` if `self` and `other` share the same major and minor.
    pub fn same_major_minor(&self, other: &VersionNumber) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl std::fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Present only while a partitioned full snapshot is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    pub part: u16,
    pub parts: u16,
}

impl PartInfo {
    pub fn is_valid(&self) -> bool {
        self.part >= 1 && self.part <= self.parts
    }

    pub fn is_last(&self) -> bool {
        self.part == self.parts
    }
}

/// The version row stored per data series once at least one snapshot (or
/// equivalent patch chain) has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataVersion {
    pub number: VersionNumber,
    pub part_info: Option<PartInfo>,
    pub database_version: Option<String>,
    pub date_of_creation: String,
    pub lang: String,
}

impl DataVersion {
    pub fn is_valid(&self) -> bool {
        !self.date_of_creation.is_empty()
            && self
                .part_info
                .map(|p| p.is_valid())
                .unwrap_or(true)
    }
}
