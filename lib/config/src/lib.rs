//! Process configuration, loaded once at startup via `figment`.
//!
//! Layering (lowest to highest precedence): compiled-in defaults →
//! `kotoba.toml` (working directory or `--config` path) → environment
//! variables prefixed `KOTOBA_`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use error::SyncError;
use types::DataSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub initial_backoff_ms_min: u64,
    pub initial_backoff_ms_max: u64,
    pub max_backoff_secs: u64,
    pub store_retry_attempts: u8,
}

impl RetryConfig {
    pub fn initial_backoff_ms_range(&self) -> (u64, u64) {
        (self.initial_backoff_ms_min, self.initial_backoff_ms_max)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            initial_backoff_ms_min: 3_000,
            initial_backoff_ms_max: 6_000,
            max_backoff_secs: 12 * 60 * 60,
            store_retry_attempts: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub data_dir: PathBuf,
    #[serde(default)]
    pub verbose: bool,
    pub default_lang: String,
    #[serde(default)]
    pub per_series_lang: HashMap<DataSeries, String>,
    #[serde(default)]
    pub retry: RetryConfig,
    pub http_timeout_secs: u64,
    pub bind_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "https://dict.kotoba.example/data".to_string(),
            data_dir: PathBuf::from("./kotoba-data"),
            verbose: false,
            default_lang: "en".to_string(),
            per_series_lang: HashMap::new(),
            retry: RetryConfig::default(),
            http_timeout_secs: 20,
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
        }
    }
}

impl Config {
    /// Returns the configured language for `series`, falling back to
    /// `default_lang`.
    pub fn lang_for(&self, series: DataSeries) -> &str {
        self.per_series_lang
            .get(&series)
            .map(String::as_str)
            .unwrap_or(&self.default_lang)
    }

    /// Load configuration, optionally reading a TOML file at `path` instead
    /// of the default `kotoba.toml` in the working directory.
    pub fn load(path: Option<&Path>) -> Result<Config, SyncError> {
        let toml_path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("kotoba.toml"));

        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if toml_path.exists() {
            figment = figment.merge(Toml::file(toml_path));
        }
        figment = figment.merge(Env::prefixed("KOTOBA_").split("__"));

        figment
            .extract()
            .map_err(|e| SyncError::Unexpected(format!("config: {e}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.default_lang, "en");
        assert_eq!(cfg.retry.initial_backoff_ms_range(), (3_000, 6_000));
    }

    #[test]
    fn lang_for_falls_back_to_default() {
        let mut cfg = Config::default();
        cfg.per_series_lang.insert(DataSeries::Kanji, "de".to_string());
        assert_eq!(cfg.lang_for(DataSeries::Kanji), "de");
        assert_eq!(cfg.lang_for(DataSeries::Words), "en");
    }
}
