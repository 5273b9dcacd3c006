//! Version Catalog Client: fetches and caches the per-language version
//! manifest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use error::SyncError;
use types::series::DataSeries;

use crate::cancel::CancelToken;
use crate::fetch::{collect_timed, FetchError, Fetcher};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub date_of_creation: String,
    #[serde(default)]
    pub database_version: Option<String>,
    #[serde(default)]
    pub parts: Option<u16>,
}

/// `{[series]: {[majorVersion]: VersionInfo}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest(pub HashMap<String, HashMap<String, VersionInfo>>);

pub struct VersionCatalogClient<F> {
    fetcher: Arc<F>,
    base_url: String,
    timeout: Duration,
    cache: Mutex<HashMap<String, Manifest>>,
}

impl<F: Fetcher> VersionCatalogClient<F> {
    pub fn new(fetcher: Arc<F>, base_url: impl Into<String>, timeout: Duration) -> Self {
        VersionCatalogClient {
            fetcher,
            base_url: base_url.into(),
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn manifest_url(&self, lang: &str) -> String {
        format!("{}/version-{}.json", self.base_url, lang)
    }

    pub async fn fetch_manifest(
        &self,
        lang: &str,
        cancel: &CancelToken,
        force_fetch: bool,
    ) -> Result<Manifest, SyncError> {
        if !force_fetch {
            if let Some(cached) = self.cache.lock().unwrap().get(lang) {
                return Ok(cached.clone());
            }
        }

        let url = self.manifest_url(lang);
        let fetch = self.fetcher.fetch(&url, self.timeout);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(SyncError::Aborted),
            r = fetch => r,
        };

        let response = response.map_err(|e| match e {
            FetchError::Timeout => SyncError::Timeout { url: url.clone() },
            FetchError::Transport(reason) => SyncError::VersionFileNotAccessible {
                url: url.clone(),
                reason,
            },
        })?;

        if response.status == 404 {
            return Err(SyncError::VersionFileNotFound { url });
        }
        if response.status != 200 {
            return Err(SyncError::VersionFileNotAccessible {
                url,
                reason: format!("unexpected status {}", response.status),
            });
        }

        let body = collect_timed(response.body, self.timeout)
            .await
            .map_err(|e| match e {
                FetchError::Timeout => SyncError::Timeout { url: url.clone() },
                FetchError::Transport(reason) => SyncError::VersionFileNotAccessible {
                    url: url.clone(),
                    reason,
                },
            })?;

        let manifest: Manifest = serde_json::from_slice(&body).map_err(|e| SyncError::VersionFileInvalid {
            reason: e.to_string(),
        })?;

        self.cache
            .lock()
            .unwrap()
            .insert(lang.to_string(), manifest.clone());
        Ok(manifest)
    }

    pub async fn version_for(
        &self,
        series: DataSeries,
        major: u16,
        lang: &str,
        cancel: &CancelToken,
    ) -> Result<VersionInfo, SyncError> {
        let manifest = self.fetch_manifest(lang, cancel, false).await?;
        let series_key = series.to_string();
        let series_entry = manifest.0.get(&series_key).ok_or_else(|| SyncError::SeriesNotAvailable {
            series: series_key.clone(),
            lang: lang.to_string(),
        })?;
        series_entry
            .get(&major.to_string())
            .cloned()
            .ok_or(SyncError::MajorVersionNotFound {
                series: series_key,
                major,
            })
    }

    /// Probes whether `lang` lists `series` at all, suppressing every error.
    pub async fn has_language(&self, series: DataSeries, lang: &str, cancel: &CancelToken) -> bool {
        self.fetch_manifest(lang, cancel, false)
            .await
            .map(|m| m.0.contains_key(&series.to_string()))
            .unwrap_or(false)
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fetch::MockFetcher;

    fn manifest_json() -> Vec<u8> {
        br#"{"kanji":{"5":{"major":5,"minor":0,"patch":0,"dateOfCreation":"2026-01-01"}}}"#.to_vec()
    }

    #[tokio::test]
    async fn fetches_and_caches_manifest() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set("https://host/version-en.json", 200, manifest_json());
        let client = VersionCatalogClient::new(fetcher, "https://host", Duration::from_secs(20));
        let cancel = CancelToken::new();

        let info = client
            .version_for(DataSeries::Kanji, 5, "en", &cancel)
            .await
            .unwrap();
        assert_eq!(info.minor, 0);

        // Cached: a second call succeeds even though the mock response was
        // already consumed by the lookup path (MockFetcher responses are
        // cloned, not removed, but this also proves the cache path works
        // without hitting the fetcher again for an unmocked URL).
        let info2 = client
            .version_for(DataSeries::Kanji, 5, "en", &cancel)
            .await
            .unwrap();
        assert_eq!(info2.major, 5);
    }

    #[tokio::test]
    async fn missing_major_version_is_reported() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set("https://host/version-en.json", 200, manifest_json());
        let client = VersionCatalogClient::new(fetcher, "https://host", Duration::from_secs(20));
        let cancel = CancelToken::new();

        let err = client
            .version_for(DataSeries::Kanji, 6, "en", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), error::ErrorCode::MajorVersionNotFound);
    }

    #[tokio::test]
    async fn not_found_manifest_maps_to_version_file_not_found() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set("https://host/version-de.json", 404, Vec::new());
        let client = VersionCatalogClient::new(fetcher, "https://host", Duration::from_secs(20));
        let cancel = CancelToken::new();

        let err = client.fetch_manifest("de", &cancel, false).await.unwrap_err();
        assert_eq!(err.code(), error::ErrorCode::VersionFileNotFound);
    }

    #[tokio::test]
    async fn missing_series_is_distinct_from_invalid_manifest() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set("https://host/version-en.json", 200, manifest_json());
        let client = VersionCatalogClient::new(fetcher, "https://host", Duration::from_secs(20));
        let cancel = CancelToken::new();

        let err = client
            .version_for(DataSeries::Names, 1, "en", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), error::ErrorCode::SeriesNotAvailable);
    }

    #[tokio::test]
    async fn has_language_suppresses_errors() {
        let fetcher = Arc::new(MockFetcher::new());
        let client = VersionCatalogClient::new(fetcher, "https://host", Duration::from_secs(20));
        let cancel = CancelToken::new();
        assert!(!client.has_language(DataSeries::Words, "xx", &cancel).await);
    }
}
