//! Sync Coordinator: one state machine per [`MajorDataSeries`], driving the
//! pipeline Version Catalog Client → Download Planner → Download Event
//! Producer → Update Applier, and implicitly chaining `kanji` → `radicals`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use error::SyncError;
use store::Store;
use types::series::{DataSeries, MajorDataSeries};
use types::state::{DataSeriesState, UpdateState};
use types::version::DataVersion;

use crate::applier::{self, Progress};
use crate::cancel::CancelToken;
use crate::catalog::VersionCatalogClient;
use crate::derive;
use crate::fetch::Fetcher;
use crate::planner::plan_update;
use crate::producer::EventProducer;

/// Per-series status the binary's `/api/status` endpoint surfaces verbatim.
#[derive(Debug, Clone)]
pub struct SeriesStatus {
    pub state: DataSeriesState,
    pub version: Option<DataVersion>,
    pub update_state: UpdateState,
}

impl SeriesStatus {
    fn fresh(state: DataSeriesState) -> Self {
        SeriesStatus {
            state,
            version: None,
            update_state: UpdateState::idle(None),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    StateUpdated(DataSeries),
    Deleted,
}

struct RunHandle {
    cancel: CancelToken,
    lang: String,
    finished: watch::Receiver<bool>,
}

pub struct Coordinator<F> {
    store: Arc<Store>,
    fetcher: Arc<F>,
    catalog: Arc<VersionCatalogClient<F>>,
    base_url: String,
    timeout: Duration,
    status: Mutex<HashMap<DataSeries, SeriesStatus>>,
    in_progress: Mutex<HashMap<MajorDataSeries, RunHandle>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<CoordinatorEvent>>>,
}

impl<F: Fetcher + 'static> Coordinator<F> {
    pub fn new(store: Arc<Store>, fetcher: Arc<F>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        let catalog = Arc::new(VersionCatalogClient::new(fetcher.clone(), base_url.clone(), timeout));

        let mut status = HashMap::new();
        for series in [DataSeries::Words, DataSeries::Kanji, DataSeries::Radicals, DataSeries::Names] {
            let state = store.inferred_state(series).unwrap_or(DataSeriesState::Unavailable);
            let version = store.version(series).ok().flatten();
            status.insert(
                series,
                SeriesStatus {
                    state,
                    version,
                    update_state: UpdateState::idle(None),
                },
            );
        }

        Coordinator {
            store,
            fetcher,
            catalog,
            base_url,
            timeout,
            status: Mutex::new(status),
            in_progress: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add_change_listener(&self) -> mpsc::UnboundedReceiver<CoordinatorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().unwrap().push(tx);
        rx
    }

    fn notify_listeners(&self, event: CoordinatorEvent) {
        // Snapshot first: a listener that unregisters or panics mid-dispatch
        // must not affect others, and new listeners added during dispatch
        // see the next event, not this one.
        let listeners = self.listeners.lock().unwrap().clone();
        for tx in listeners {
            let _ = tx.send(event.clone());
        }
    }

    pub fn status(&self, series: DataSeries) -> SeriesStatus {
        self.status
            .lock()
            .unwrap()
            .get(&series)
            .cloned()
            .unwrap_or_else(|| SeriesStatus::fresh(DataSeriesState::Init))
    }

    fn set_update_state(&self, series: DataSeries, update_state: UpdateState) {
        let mut status = self.status.lock().unwrap();
        status.entry(series).or_insert_with(|| SeriesStatus::fresh(DataSeriesState::Init)).update_state = update_state;
        drop(status);
        self.notify_listeners(CoordinatorEvent::StateUpdated(series));
    }

    fn record_commit(&self, series: DataSeries, version: DataVersion, last_check: Option<i64>) {
        let mut status = self.status.lock().unwrap();
        let entry = status.entry(series).or_insert_with(|| SeriesStatus::fresh(DataSeriesState::Init));
        entry.state = DataSeriesState::Ok;
        entry.version = Some(version);
        entry.update_state = UpdateState::idle(last_check);
        drop(status);
        self.notify_listeners(CoordinatorEvent::StateUpdated(series));
    }

    /// Updates `series` to the latest version available in `lang`, chaining
    /// `radicals` after a successful `kanji` update. Overlapping calls for
    /// the same `(series, lang)` coalesce onto the in-flight run; a call
    /// with a different `lang` cancels the in-flight run first.
    pub async fn update(&self, series: MajorDataSeries, lang: &str) -> Result<(), SyncError> {
        loop {
            let decision = {
                let in_progress = self.in_progress.lock().unwrap();
                match in_progress.get(&series) {
                    Some(h) if h.lang == lang => Some(Ok(h.finished.clone())),
                    Some(h) => {
                        h.cancel.cancel();
                        Some(Err(h.finished.clone()))
                    }
                    None => None,
                }
            };

            let mut finished = match decision {
                Some(Ok(finished)) => {
                    let mut finished = finished;
                    while !*finished.borrow() {
                        if finished.changed().await.is_err() {
                            break;
                        }
                    }
                    return Ok(());
                }
                Some(Err(finished)) => finished,
                None => break,
            };
            // A different-language run was in flight: it has now been
            // cancelled. Wait for it to actually exit before starting a
            // fresh run, then re-check — another caller may have raced in.
            while !*finished.borrow() {
                if finished.changed().await.is_err() {
                    break;
                }
            }
        }

        let cancel = CancelToken::new();
        let (tx_done, rx_done) = watch::channel(false);
        self.in_progress.lock().unwrap().insert(
            series,
            RunHandle {
                cancel: cancel.clone(),
                lang: lang.to_string(),
                finished: rx_done,
            },
        );

        self.set_update_state(series.as_series(), UpdateState::Checking { series: series.as_series(), last_check: self.status(series.as_series()).update_state.last_check() });

        let result = self.run_series(series.as_series(), lang, &cancel).await;

        let chained = if result.is_ok() {
            if let Some(follow_on) = series.follow_on() {
                self.run_series(follow_on, lang, &cancel).await
            } else {
                Ok(())
            }
        } else {
            Ok(())
        };

        self.in_progress.lock().unwrap().remove(&series);
        let _ = tx_done.send(true);

        if result.is_err() {
            self.set_update_state(
                series.as_series(),
                UpdateState::idle(self.status(series.as_series()).update_state.last_check()),
            );
            return result;
        }
        chained
    }

    async fn run_series(&self, series: DataSeries, lang: &str, cancel: &CancelToken) -> Result<(), SyncError> {
        let effective_lang = if self.catalog.has_language(series, lang, cancel).await {
            lang.to_string()
        } else {
            "en".to_string()
        };

        let current = self.store.version(series)?;
        if let Some(current) = &current {
            if current.lang != effective_lang {
                log::info!("coordinator: lang change for {series} ({} -> {effective_lang}), clobbering", current.lang);
                self.clobber(series)?;
            }
        }
        let current = self.store.version(series)?;

        let major = current.as_ref().map(|v| v.number.major).unwrap_or(1);
        let latest = self.catalog.version_for(series, major, &effective_lang, cancel).await?;
        let plan = plan_update(series, current.as_ref(), &latest)?;

        if plan.files.is_empty() {
            self.record_commit(
                series,
                current.unwrap_or(DataVersion {
                    number: types::version::VersionNumber::new(latest.major, latest.minor, latest.patch),
                    part_info: None,
                    database_version: latest.database_version.clone(),
                    date_of_creation: latest.date_of_creation.clone(),
                    lang: effective_lang.clone(),
                }),
                now_unchecked(),
            );
            return Ok(());
        }

        let producer = EventProducer::new(self.fetcher.clone(), self.base_url.clone(), self.timeout);
        let (tx, rx) = mpsc::channel(256);
        let had_current_version = current.is_some();

        let series_for_progress = series;
        let target_version = latest_number(&latest);
        let on_progress = |p: Progress| {
            let mut status = self.status.lock().unwrap();
            if let Some(entry) = status.get_mut(&series_for_progress) {
                entry.update_state = UpdateState::Updating {
                    series: series_for_progress,
                    version: target_version,
                    file_progress: p.file_progress,
                    total_progress: p.total_progress,
                    last_check: entry.update_state.last_check(),
                };
            }
        };

        let applier_fut = run_applier(series, &self.store, rx, cancel, on_progress);
        let producer_fut = producer.run(series, &effective_lang, &plan, had_current_version, cancel, &tx);

        let (producer_result, applier_result) = tokio::join!(producer_fut, applier_fut);
        drop(tx);
        producer_result?;
        let outcome = applier_result?;

        if let Some(version) = outcome.version {
            self.record_commit(series, version, now_unchecked());
        }
        Ok(())
    }

    fn clobber(&self, series: DataSeries) -> Result<(), SyncError> {
        self.store.clear_series_untyped(series)?;
        let mut status = self.status.lock().unwrap();
        status.insert(series, SeriesStatus::fresh(DataSeriesState::Empty));
        Ok(())
    }

    pub fn cancel_update(&self, series: MajorDataSeries) -> bool {
        let in_progress = self.in_progress.lock().unwrap();
        match in_progress.get(&series) {
            Some(h) => {
                h.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn delete_series(&self, series: DataSeries) -> Result<(), SyncError> {
        if let Ok(major) = MajorDataSeries::try_from(series) {
            self.cancel_update(major);
        }
        self.store.clear_series_untyped(series)?;
        {
            let mut status = self.status.lock().unwrap();
            status.insert(series, SeriesStatus::fresh(DataSeriesState::Empty));
        }
        self.notify_listeners(CoordinatorEvent::StateUpdated(series));

        if let Some(companion) = series.companion_series() {
            self.store.clear_series_untyped(companion)?;
            let mut status = self.status.lock().unwrap();
            status.insert(companion, SeriesStatus::fresh(DataSeriesState::Empty));
            drop(status);
            self.notify_listeners(CoordinatorEvent::StateUpdated(companion));
        }
        Ok(())
    }

    pub fn destroy(&self) {
        for series in [MajorDataSeries::Words, MajorDataSeries::Kanji, MajorDataSeries::Names] {
            self.cancel_update(series);
        }
        self.status.lock().unwrap().clear();
        self.notify_listeners(CoordinatorEvent::Deleted);
    }
}

fn latest_number(latest: &crate::catalog::VersionInfo) -> types::version::VersionNumber {
    types::version::VersionNumber::new(latest.major, latest.minor, latest.patch)
}

/// `lastCheck` as a Unix timestamp, stamped at the moment a file actually
/// commits. `None` only if the system clock is set before the epoch.
fn now_unchecked() -> Option<i64> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .ok()
}

async fn run_applier<F>(
    series: DataSeries,
    store: &Store,
    rx: mpsc::Receiver<types::event::DownloadEvent>,
    cancel: &CancelToken,
    on_progress: F,
) -> Result<applier::ApplyOutcome, SyncError>
where
    F: FnMut(Progress),
{
    match series {
        DataSeries::Words => applier::apply_events::<types::words::Word, _>(store, rx, derive::populate_word_derived_fields, cancel, on_progress).await,
        DataSeries::Names => applier::apply_events::<types::names::Name, _>(store, rx, populate_name_derived_fields, cancel, on_progress).await,
        DataSeries::Kanji => applier::apply_events::<types::kanji::Kanji, _>(store, rx, |_| {}, cancel, on_progress).await,
        DataSeries::Radicals => applier::apply_events::<types::radical::Radical, _>(store, rx, |_| {}, cancel, on_progress).await,
    }
}

fn populate_name_derived_fields(name: &mut types::names::Name) {
    name.h = derive::headword_hiragana(name.k.as_deref(), &name.r);
}

impl TryFrom<DataSeries> for MajorDataSeries {
    type Error = ();

    fn try_from(series: DataSeries) -> Result<Self, Self::Error> {
        match series {
            DataSeries::Words => Ok(MajorDataSeries::Words),
            DataSeries::Kanji => Ok(MajorDataSeries::Kanji),
            DataSeries::Names => Ok(MajorDataSeries::Names),
            DataSeries::Radicals => Err(()),
        }
    }
}
