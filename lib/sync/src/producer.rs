//! Download Event Producer: drives the Download Planner's file list through
//! the Line Stream Reader, yielding a typed [`DownloadEvent`] stream over an
//! `mpsc` channel (single producer, single consumer — the Update Applier).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use error::SyncError;
use types::event::{DownloadEvent, DownloadFileSpec, FileFormat, FileHeader, RecordMode};
use types::series::DataSeries;
use types::version::DataVersion;

use crate::cancel::CancelToken;
use crate::fetch::{FetchError, Fetcher};
use crate::line_reader::{LineStreamReader, ReadError};
use crate::planner::Plan;

fn file_url(base_url: &str, series: DataSeries, lang: &str, spec: &DownloadFileSpec) -> String {
    let version = spec.version();
    let stem = format!("{}.{}.{}", version.major, version.minor, version.patch);
    match spec {
        DownloadFileSpec::Full {
            part_info: Some(p), ..
        } => format!("{base_url}/{series}/{lang}/{stem}-{}.jsonl", p.part),
        DownloadFileSpec::Full { part_info: None, .. } => format!("{base_url}/{series}/{lang}/{stem}.jsonl"),
        DownloadFileSpec::Patch { .. } => format!("{base_url}/{series}/{lang}/{stem}-patch.jsonl"),
    }
}

fn read_err_to_sync_err(url: &str, line: u64, e: ReadError) -> SyncError {
    match e {
        ReadError::Timeout => SyncError::Timeout { url: url.to_string() },
        ReadError::Cancelled => SyncError::Aborted,
        ReadError::Transport(reason) => SyncError::DatabaseFileNotAccessible {
            url: url.to_string(),
            reason: format!("{reason} (at line {line})"),
        },
    }
}

pub struct EventProducer<F> {
    fetcher: Arc<F>,
    base_url: String,
    timeout: Duration,
}

impl<F: Fetcher> EventProducer<F> {
    pub fn new(fetcher: Arc<F>, base_url: impl Into<String>, timeout: Duration) -> Self {
        EventProducer {
            fetcher,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub async fn run(
        &self,
        series: DataSeries,
        lang: &str,
        plan: &Plan,
        had_current_version: bool,
        cancel: &CancelToken,
        tx: &mpsc::Sender<DownloadEvent>,
    ) -> Result<(), SyncError> {
        if plan.reset && had_current_version {
            let _ = tx.send(DownloadEvent::Reset).await;
        }
        let _ = tx
            .send(DownloadEvent::DownloadStart {
                files: plan.files.len(),
            })
            .await;

        for spec in &plan.files {
            if cancel.is_cancelled() {
                return Err(SyncError::Aborted);
            }
            self.fetch_file(series, lang, spec, cancel, tx).await?;
        }

        let _ = tx.send(DownloadEvent::DownloadEnd).await;
        Ok(())
    }

    async fn fetch_file(
        &self,
        series: DataSeries,
        lang: &str,
        spec: &DownloadFileSpec,
        cancel: &CancelToken,
        tx: &mpsc::Sender<DownloadEvent>,
    ) -> Result<(), SyncError> {
        let url = file_url(&self.base_url, series, lang, spec);

        let fetch = self.fetcher.fetch(&url, self.timeout);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(SyncError::Aborted),
            r = fetch => r,
        };
        let response = response.map_err(|e| match e {
            FetchError::Timeout => SyncError::Timeout { url: url.clone() },
            FetchError::Transport(reason) => SyncError::DatabaseFileNotAccessible {
                url: url.clone(),
                reason,
            },
        })?;

        if response.status == 404 {
            return Err(SyncError::DatabaseFileNotFound { url });
        }
        if response.status != 200 {
            return Err(SyncError::DatabaseFileNotAccessible {
                url,
                reason: format!("unexpected status {}", response.status),
            });
        }

        let mut reader = LineStreamReader::new(response.body);

        let header_line = reader
            .next_line(self.timeout, cancel)
            .await
            .map_err(|e| read_err_to_sync_err(&url, 1, e))?
            .ok_or_else(|| SyncError::DatabaseFileHeaderMissing { url: url.clone() })?;

        let header: FileHeader = serde_json::from_str(&header_line).map_err(|e| SyncError::DatabaseFileInvalidJson {
            url: url.clone(),
            line: 1,
            reason: e.to_string(),
        })?;

        let expected_version = spec.version();
        let header_matches = header.ty == "header"
            && header.version.major == expected_version.major
            && header.version.minor == expected_version.minor
            && header.version.patch == expected_version.patch
            && header.part == spec.part_info().map(|p| p.part)
            && header.format == spec.format();
        if !header_matches {
            return Err(SyncError::DatabaseFileVersionMismatch { url });
        }

        let _ = tx
            .send(DownloadEvent::FileStart {
                version: expected_version,
                part_info: spec.part_info(),
                total_records: header.records,
            })
            .await;

        let mut line_no: u64 = 1;
        loop {
            let line = reader
                .next_line(self.timeout, cancel)
                .await
                .map_err(|e| read_err_to_sync_err(&url, line_no + 1, e))?;
            let Some(line) = line else { break };
            line_no += 1;

            let value: Value = serde_json::from_str(&line).map_err(|e| SyncError::DatabaseFileInvalidJson {
                url: url.clone(),
                line: line_no,
                reason: e.to_string(),
            })?;

            if value.get("type").and_then(Value::as_str) == Some("header") {
                return Err(SyncError::DatabaseFileHeaderDuplicate { url });
            }

            match header.format {
                FileFormat::Patch => {
                    let tag = value
                        .get("_")
                        .and_then(Value::as_str)
                        .ok_or_else(|| SyncError::DatabaseFileInvalidRecord {
                            url: url.clone(),
                            line: line_no,
                            reason: "patch record missing `_` tag".to_string(),
                        })?;
                    let mode = RecordMode::from_patch_tag(tag).ok_or_else(|| SyncError::DatabaseFileInvalidRecord {
                        url: url.clone(),
                        line: line_no,
                        reason: format!("unrecognized patch tag `{tag}`"),
                    })?;
                    let mut payload = value;
                    if let Value::Object(map) = &mut payload {
                        map.remove("_");
                    }
                    let _ = tx.send(DownloadEvent::Record { mode, payload }).await;
                }
                FileFormat::Full => {
                    if value.get("_").is_some() {
                        return Err(SyncError::DatabaseFileInvalidRecord {
                            url: url.clone(),
                            line: line_no,
                            reason: "full-format record must not carry a patch tag".to_string(),
                        });
                    }
                    let _ = tx
                        .send(DownloadEvent::Record {
                            mode: RecordMode::Add,
                            payload: value,
                        })
                        .await;
                }
            }
        }

        let file_version = DataVersion {
            number: expected_version,
            // A partitioned install still in progress carries the part just
            // written so the planner can resume it; once the last part
            // lands, the series is no longer "mid-partition".
            part_info: spec.part_info().filter(|p| !p.is_last()),
            database_version: header.version.database_version.clone(),
            date_of_creation: header.version.date_of_creation.clone(),
            lang: lang.to_string(),
        };
        let _ = tx.send(DownloadEvent::FileEnd { header: file_version }).await;
        Ok(())
    }
}
