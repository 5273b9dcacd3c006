//! Update Applier: consumes the [`DownloadEvent`] stream and writes it
//! through the [`Store`] one file at a time. Each file's ops are buffered in
//! memory and committed in a single transaction at `FileEnd`, so a crash or
//! cancellation mid-file never leaves a partial file visible — there is
//! nothing to "roll back" because nothing was written yet.

use serde_json::Value;
use tokio::sync::mpsc;

use error::SyncError;
use store::{Record, RecordOp, Store};
use types::event::{DownloadEvent, RecordMode};
use types::version::DataVersion;

use crate::cancel::CancelToken;

/// Emitted every `PROGRESS_EVERY` records and once more at each `FileEnd`.
pub const PROGRESS_EVERY: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub file_progress: f32,
    pub total_progress: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// The last `DataVersion` committed, if any file completed.
    pub version: Option<DataVersion>,
    pub files_committed: u32,
    /// Records that failed schema validation and were skipped, non-fatally.
    pub parse_errors: u32,
}

/// Applies one series' event stream to `store`. `derive` runs on every
/// upserted record before it's handed to the store (e.g. filling in `h`/`kc`
/// on a [`types::words::Word`]); pass a no-op closure for series with no
/// derived fields.
pub async fn apply_events<T, D>(
    store: &Store,
    mut rx: mpsc::Receiver<DownloadEvent>,
    mut derive: D,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(Progress),
) -> Result<ApplyOutcome, SyncError>
where
    T: Record,
    D: FnMut(&mut T),
{
    let mut outcome = ApplyOutcome::default();
    let mut total_files: usize = 1;
    let mut reset_pending = false;
    let mut ops: Vec<RecordOp<T>> = Vec::new();
    let mut file_total: u64 = 0;
    let mut file_processed: u64 = 0;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Err(SyncError::Aborted),
            event = rx.recv() => event,
        };
        let Some(event) = event else { break };

        match event {
            DownloadEvent::Reset => reset_pending = true,
            DownloadEvent::DownloadStart { files } => total_files = files.max(1),
            DownloadEvent::FileStart { total_records, .. } => {
                ops.clear();
                file_total = total_records;
                file_processed = 0;
            }
            DownloadEvent::Record { mode, payload } => {
                file_processed += 1;
                apply_one(mode, payload, &mut derive, &mut ops, &mut outcome.parse_errors);
                if file_processed % PROGRESS_EVERY == 0 {
                    on_progress(progress_of(
                        file_processed,
                        file_total,
                        outcome.files_committed,
                        total_files,
                    ));
                }
            }
            DownloadEvent::FileEnd { header } => {
                store.apply_file(reset_pending, std::mem::take(&mut ops), header.clone())?;
                reset_pending = false;
                outcome.files_committed += 1;
                outcome.version = Some(header);
                on_progress(Progress {
                    file_progress: 1.0,
                    total_progress: outcome.files_committed as f32 / total_files as f32,
                });
            }
            DownloadEvent::DownloadEnd => break,
        }
    }

    Ok(outcome)
}

fn progress_of(processed: u64, total: u64, files_committed: u32, total_files: usize) -> Progress {
    let file_progress = if total == 0 { 0.0 } else { processed as f32 / total as f32 };
    Progress {
        file_progress,
        total_progress: (files_committed as f32 + file_progress) / total_files as f32,
    }
}

fn apply_one<T, D>(
    mode: RecordMode,
    payload: Value,
    derive: &mut D,
    ops: &mut Vec<RecordOp<T>>,
    parse_errors: &mut u32,
) where
    T: Record,
    D: FnMut(&mut T),
{
    match mode {
        RecordMode::Add | RecordMode::Change => match serde_json::from_value::<T>(payload) {
            Ok(mut record) => {
                derive(&mut record);
                ops.push(RecordOp::Upsert(record));
            }
            Err(e) => {
                log::warn!("applier: parseerror (series={}): {e}", T::SERIES);
                *parse_errors += 1;
            }
        },
        RecordMode::Delete => match T::delete_key(&payload) {
            Ok(key) => ops.push(RecordOp::Delete(key)),
            Err(reason) => {
                log::warn!("applier: parseerror on delete (series={}): {reason}", T::SERIES);
                *parse_errors += 1;
            }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use types::series::DataSeries;
    use types::version::VersionNumber;
    use types::words::Word;

    fn version(patch: u16) -> DataVersion {
        DataVersion {
            number: VersionNumber::new(1, 0, patch),
            part_info: None,
            database_version: None,
            date_of_creation: "2026-01-01".to_string(),
            lang: "en".to_string(),
        }
    }

    fn word_payload(id: u32, kanji: &str, kana: &str) -> Value {
        serde_json::json!({
            "id": id,
            "k": [kanji],
            "r": [kana],
            "s": [{"g": ["to test"], "lang": "en"}],
        })
    }

    async fn run_events(
        store: &Store,
        events: Vec<DownloadEvent>,
        cancel: &CancelToken,
    ) -> Result<ApplyOutcome, SyncError> {
        let (tx, rx) = mpsc::channel(32);
        for e in events {
            tx.send(e).await.unwrap();
        }
        drop(tx);
        apply_events::<Word, _>(store, rx, crate::derive::populate_word_derived_fields, cancel, |_| {}).await
    }

    #[tokio::test]
    async fn upserts_and_commits_version_on_file_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let cancel = CancelToken::new();

        let outcome = run_events(
            &store,
            vec![
                DownloadEvent::DownloadStart { files: 1 },
                DownloadEvent::FileStart {
                    version: VersionNumber::new(1, 0, 1),
                    part_info: None,
                    total_records: 1,
                },
                DownloadEvent::Record {
                    mode: RecordMode::Add,
                    payload: word_payload(1, "引く", "ひく"),
                },
                DownloadEvent::FileEnd { header: version(1) },
                DownloadEvent::DownloadEnd,
            ],
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome.files_committed, 1);
        assert_eq!(outcome.version.unwrap().number, VersionNumber::new(1, 0, 1));

        let stored: Word = store.get(&store::key::u32_be(1)).unwrap().unwrap();
        assert_eq!(stored.h, vec!["ひく".to_string()]);
        assert_eq!(stored.kc, vec!['引']);
    }

    #[tokio::test]
    async fn reset_clears_series_before_new_records_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let cancel = CancelToken::new();

        run_events(
            &store,
            vec![
                DownloadEvent::DownloadStart { files: 1 },
                DownloadEvent::FileStart {
                    version: VersionNumber::new(1, 0, 0),
                    part_info: None,
                    total_records: 1,
                },
                DownloadEvent::Record {
                    mode: RecordMode::Add,
                    payload: word_payload(1, "旧", "きゅう"),
                },
                DownloadEvent::FileEnd { header: version(0) },
                DownloadEvent::DownloadEnd,
            ],
            &cancel,
        )
        .await
        .unwrap();

        run_events(
            &store,
            vec![
                DownloadEvent::Reset,
                DownloadEvent::DownloadStart { files: 1 },
                DownloadEvent::FileStart {
                    version: VersionNumber::new(2, 0, 0),
                    part_info: None,
                    total_records: 1,
                },
                DownloadEvent::Record {
                    mode: RecordMode::Add,
                    payload: word_payload(2, "新", "しん"),
                },
                DownloadEvent::FileEnd { header: version(1) },
                DownloadEvent::DownloadEnd,
            ],
            &cancel,
        )
        .await
        .unwrap();

        assert!(store.get::<Word>(&store::key::u32_be(1)).unwrap().is_none());
        assert!(store.get::<Word>(&store::key::u32_be(2)).unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_mode_removes_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let cancel = CancelToken::new();

        run_events(
            &store,
            vec![
                DownloadEvent::DownloadStart { files: 1 },
                DownloadEvent::FileStart {
                    version: VersionNumber::new(1, 0, 0),
                    part_info: None,
                    total_records: 1,
                },
                DownloadEvent::Record {
                    mode: RecordMode::Add,
                    payload: word_payload(1, "引く", "ひく"),
                },
                DownloadEvent::FileEnd { header: version(0) },
                DownloadEvent::DownloadEnd,
            ],
            &cancel,
        )
        .await
        .unwrap();

        run_events(
            &store,
            vec![
                DownloadEvent::DownloadStart { files: 1 },
                DownloadEvent::FileStart {
                    version: VersionNumber::new(1, 0, 1),
                    part_info: None,
                    total_records: 1,
                },
                DownloadEvent::Record {
                    mode: RecordMode::Delete,
                    payload: serde_json::json!({"id": 1}),
                },
                DownloadEvent::FileEnd { header: version(1) },
                DownloadEvent::DownloadEnd,
            ],
            &cancel,
        )
        .await
        .unwrap();

        assert!(store.get::<Word>(&store::key::u32_be(1)).unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_record_is_skipped_non_fatally() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let cancel = CancelToken::new();

        let outcome = run_events(
            &store,
            vec![
                DownloadEvent::DownloadStart { files: 1 },
                DownloadEvent::FileStart {
                    version: VersionNumber::new(1, 0, 0),
                    part_info: None,
                    total_records: 1,
                },
                DownloadEvent::Record {
                    mode: RecordMode::Add,
                    payload: serde_json::json!({"not_a_word": true}),
                },
                DownloadEvent::FileEnd { header: version(0) },
                DownloadEvent::DownloadEnd,
            ],
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome.parse_errors, 1);
        assert_eq!(outcome.files_committed, 1);
    }

    #[tokio::test]
    async fn cancellation_surfaces_aborted_before_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let (_tx, rx) = mpsc::channel(8);
        let err = apply_events::<Word, _>(&store, rx, crate::derive::populate_word_derived_fields, &cancel, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.code(), error::ErrorCode::Aborted);
        assert_eq!(
            store.inferred_state(DataSeries::Words).unwrap(),
            types::state::DataSeriesState::Init
        );
    }
}
