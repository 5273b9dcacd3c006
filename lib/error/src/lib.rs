//! Unified error taxonomy for the sync engine and query engine.
//!
//! Every fallible operation in this workspace returns a [`SyncError`]. The
//! variants mirror the error code taxonomy from the design: version-catalog
//! errors, per-file download errors, and run-level errors. [`SyncError::retry_class`]
//! tells the retry supervisor how to react without re-deriving the tiering logic
//! at each call site.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};

#[cfg(feature = "web_error")]
use actix_web::{http::StatusCode, HttpResponse, ResponseError};

pub type Result<T> = std::result::Result<T, SyncError>;

/// The stable, serializable error code. Kept separate from [`SyncError`] so
/// external callers (e.g. the HTTP API) can match on a string without pulling
/// in the full error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "PascalCase")]
pub enum ErrorCode {
    VersionFileNotFound,
    VersionFileNotAccessible,
    VersionFileInvalid,
    SeriesNotAvailable,
    MajorVersionNotFound,
    DatabaseFileNotFound,
    DatabaseFileNotAccessible,
    DatabaseFileHeaderMissing,
    DatabaseFileHeaderDuplicate,
    DatabaseFileVersionMismatch,
    DatabaseFileInvalidJson,
    DatabaseFileInvalidRecord,
    DatabaseTooOld,
    Timeout,
    Aborted,
    Offline,
    ConstraintError,
    /// Ambient: underlying store I/O failed in a way not covered above.
    Store,
    /// Ambient: a caller passed a malformed query (e.g. multi-char kanji probe).
    InvalidQuery,
    Unexpected,
}

/// How the retry supervisor should treat a given error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Network-ish failure: retry with exponential backoff.
    Network,
    /// Store constraint violation: retry a bounded number of times.
    Store,
    /// Host is offline: wait for an online signal, then retry immediately.
    Offline,
    /// Surface to the caller unchanged; do not retry.
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("version file not found: {url}")]
    VersionFileNotFound { url: String },

    #[error("version file not accessible: {url}: {reason}")]
    VersionFileNotAccessible { url: String, reason: String },

    #[error("version file invalid: {reason}")]
    VersionFileInvalid { reason: String },

    #[error("series {series} is not listed in the version manifest for lang {lang}")]
    SeriesNotAvailable { series: String, lang: String },

    #[error("major version {major} not found for series {series}")]
    MajorVersionNotFound { series: String, major: u16 },

    #[error("database file not found: {url}")]
    DatabaseFileNotFound { url: String },

    #[error("database file not accessible: {url}: {reason}")]
    DatabaseFileNotAccessible { url: String, reason: String },

    #[error("database file {url} is missing its header line")]
    DatabaseFileHeaderMissing { url: String },

    #[error("database file {url} contains a duplicate header line")]
    DatabaseFileHeaderDuplicate { url: String },

    #[error("database file {url} header does not match requested version/part/format")]
    DatabaseFileVersionMismatch { url: String },

    #[error("database file {url} contains invalid JSON at line {line}: {reason}")]
    DatabaseFileInvalidJson {
        url: String,
        line: u64,
        reason: String,
    },

    #[error("database file {url} contains an invalid record at line {line}: {reason}")]
    DatabaseFileInvalidRecord {
        url: String,
        line: u64,
        reason: String,
    },

    #[error("stored version is newer than the latest advertised version for series {series}")]
    DatabaseTooOld { series: String },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("operation aborted")]
    Aborted,

    #[error("host is offline")]
    Offline,

    #[error("store constraint violated: {reason}")]
    ConstraintError { reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl SyncError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::VersionFileNotFound { .. } => ErrorCode::VersionFileNotFound,
            SyncError::VersionFileNotAccessible { .. } => ErrorCode::VersionFileNotAccessible,
            SyncError::VersionFileInvalid { .. } => ErrorCode::VersionFileInvalid,
            SyncError::SeriesNotAvailable { .. } => ErrorCode::SeriesNotAvailable,
            SyncError::MajorVersionNotFound { .. } => ErrorCode::MajorVersionNotFound,
            SyncError::DatabaseFileNotFound { .. } => ErrorCode::DatabaseFileNotFound,
            SyncError::DatabaseFileNotAccessible { .. } => ErrorCode::DatabaseFileNotAccessible,
            SyncError::DatabaseFileHeaderMissing { .. } => ErrorCode::DatabaseFileHeaderMissing,
            SyncError::DatabaseFileHeaderDuplicate { .. } => ErrorCode::DatabaseFileHeaderDuplicate,
            SyncError::DatabaseFileVersionMismatch { .. } => ErrorCode::DatabaseFileVersionMismatch,
            SyncError::DatabaseFileInvalidJson { .. } => ErrorCode::DatabaseFileInvalidJson,
            SyncError::DatabaseFileInvalidRecord { .. } => ErrorCode::DatabaseFileInvalidRecord,
            SyncError::DatabaseTooOld { .. } => ErrorCode::DatabaseTooOld,
            SyncError::Timeout { .. } => ErrorCode::Timeout,
            SyncError::Aborted => ErrorCode::Aborted,
            SyncError::Offline => ErrorCode::Offline,
            SyncError::ConstraintError { .. } => ErrorCode::ConstraintError,
            SyncError::Store(_) => ErrorCode::Store,
            SyncError::InvalidQuery(_) => ErrorCode::InvalidQuery,
            SyncError::Unexpected(_) => ErrorCode::Unexpected,
        }
    }

    /// URL associated with this error, if any (used in retry-supervisor logging).
    pub fn url(&self) -> Option<&str> {
        match self {
            SyncError::VersionFileNotFound { url }
            | SyncError::VersionFileNotAccessible { url, .. }
            | SyncError::DatabaseFileNotFound { url }
            | SyncError::DatabaseFileNotAccessible { url, .. }
            | SyncError::DatabaseFileHeaderMissing { url }
            | SyncError::DatabaseFileHeaderDuplicate { url }
            | SyncError::DatabaseFileVersionMismatch { url }
            | SyncError::DatabaseFileInvalidJson { url, .. }
            | SyncError::DatabaseFileInvalidRecord { url, .. }
            | SyncError::Timeout { url } => Some(url),
            _ => None,
        }
    }

    pub fn retry_class(&self) -> RetryClass {
        match self {
            SyncError::VersionFileNotAccessible { .. }
            | SyncError::DatabaseFileNotAccessible { .. }
            | SyncError::Timeout { .. } => RetryClass::Network,
            SyncError::ConstraintError { .. } => RetryClass::Store,
            SyncError::Offline => RetryClass::Offline,
            _ => RetryClass::Fatal,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Unexpected(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Unexpected(format!("json: {e}"))
    }
}

/// A retryable envelope carrying the scheduling metadata the retry supervisor
/// attaches to an error before logging / surfacing it, matching the
/// `{code, url?, nextRetry?, retryCount?}` shape from the design.
#[derive(Debug, Clone)]
pub struct RetryableError {
    pub code: ErrorCode,
    pub url: Option<String>,
    pub next_retry: Option<Duration>,
    pub retry_count: u32,
}

impl fmt::Display for RetryableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (retry {})", self.code, self.retry_count)?;
        if let Some(url) = &self.url {
            write!(f, " url={url}")?;
        }
        Ok(())
    }
}

impl RetryableError {
    pub fn new(err: &SyncError, retry_count: u32, next_retry: Option<Duration>) -> Self {
        Self {
            code: err.code(),
            url: err.url().map(str::to_string),
            next_retry,
            retry_count,
        }
    }
}

#[cfg(feature = "web_error")]
impl ResponseError for SyncError {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::VersionFileNotFound
            | ErrorCode::DatabaseFileNotFound
            | ErrorCode::SeriesNotAvailable
            | ErrorCode::MajorVersionNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidQuery => StatusCode::BAD_REQUEST,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "code": self.code().to_string(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        let err = SyncError::Timeout {
            url: "http://example.test".into(),
        };
        assert_eq!(err.retry_class(), RetryClass::Network);
        assert_eq!(err.url(), Some("http://example.test"));
    }

    #[test]
    fn aborted_is_fatal() {
        assert_eq!(SyncError::Aborted.retry_class(), RetryClass::Fatal);
    }

    #[test]
    fn constraint_error_is_store_retryable() {
        let err = SyncError::ConstraintError {
            reason: "locked".into(),
        };
        assert_eq!(err.retry_class(), RetryClass::Store);
    }

    #[test]
    fn code_round_trips_through_display() {
        assert_eq!(ErrorCode::DatabaseTooOld.to_string(), "DatabaseTooOld");
    }
}
