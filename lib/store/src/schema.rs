//! Maps each series' record type onto the primary-key and secondary-index
//! encoding the [`crate::Store`] persists.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use types::kanji::Kanji;
use types::names::Name;
use types::radical::Radical;
use types::series::DataSeries;
use types::words::Word;

use crate::key::u32_be;

/// A series record the store knows how to key and index.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const SERIES: DataSeries;

    fn primary_key(&self) -> Vec<u8>;

    /// `(index_name, field_value_bytes)` pairs, one per secondary index
    /// entry this record contributes. A headword with two kanji forms
    /// contributes two entries under the `"k"` index, for example.
    fn index_entries(&self) -> Vec<(&'static str, Vec<u8>)>;

    /// Secondary index names this series maintains, even if a particular
    /// record contributes no entries to one of them.
    fn index_names() -> &'static [&'static str];

    /// Extracts the primary key a delete-mode patch record refers to,
    /// without deserializing the whole record. Used by the Update Applier,
    /// which sees deletes only as `serde_json::Value` payloads.
    fn delete_key(payload: &Value) -> Result<Vec<u8>, String>;
}

/// Secondary index names for `series`, without requiring the caller to name
/// the concrete [`Record`] type. Used by whole-series operations (clobber,
/// delete) that only have a runtime [`DataSeries`] to work with.
pub fn index_names_for(series: DataSeries) -> &'static [&'static str] {
    match series {
        DataSeries::Words => Word::index_names(),
        DataSeries::Names => Name::index_names(),
        DataSeries::Kanji => Kanji::index_names(),
        DataSeries::Radicals => Radical::index_names(),
    }
}

impl Record for Word {
    const SERIES: DataSeries = DataSeries::Words;

    fn primary_key(&self) -> Vec<u8> {
        u32_be(self.id)
    }

    fn index_entries(&self) -> Vec<(&'static str, Vec<u8>)> {
        let mut entries = Vec::new();
        if let Some(k) = &self.k {
            entries.extend(k.iter().map(|s| ("k", s.as_bytes().to_vec())));
        }
        entries.extend(self.r.iter().map(|s| ("r", s.as_bytes().to_vec())));
        entries.extend(self.h.iter().map(|s| ("h", s.as_bytes().to_vec())));
        entries.extend(
            self.kc
                .iter()
                .map(|c| ("kc", c.to_string().into_bytes())),
        );
        entries.extend(self.gt_en.iter().map(|s| ("gt_en", s.as_bytes().to_vec())));
        entries.extend(self.gt_l.iter().map(|s| ("gt_l", s.as_bytes().to_vec())));
        entries
    }

    fn index_names() -> &'static [&'static str] {
        &["k", "r", "h", "kc", "gt_en", "gt_l"]
    }

    fn delete_key(payload: &Value) -> Result<Vec<u8>, String> {
        payload
            .get("id")
            .and_then(Value::as_u64)
            .map(|id| u32_be(id as u32))
            .ok_or_else(|| "delete record missing `id`".to_string())
    }
}

impl Record for Name {
    const SERIES: DataSeries = DataSeries::Names;

    fn primary_key(&self) -> Vec<u8> {
        u32_be(self.id)
    }

    fn index_entries(&self) -> Vec<(&'static str, Vec<u8>)> {
        let mut entries = Vec::new();
        if let Some(k) = &self.k {
            entries.extend(k.iter().map(|s| ("k", s.as_bytes().to_vec())));
        }
        entries.extend(self.r.iter().map(|s| ("r", s.as_bytes().to_vec())));
        entries.extend(self.h.iter().map(|s| ("h", s.as_bytes().to_vec())));
        entries
    }

    fn index_names() -> &'static [&'static str] {
        &["k", "r", "h"]
    }

    fn delete_key(payload: &Value) -> Result<Vec<u8>, String> {
        payload
            .get("id")
            .and_then(Value::as_u64)
            .map(|id| u32_be(id as u32))
            .ok_or_else(|| "delete record missing `id`".to_string())
    }
}

impl Record for Kanji {
    const SERIES: DataSeries = DataSeries::Kanji;

    fn primary_key(&self) -> Vec<u8> {
        u32_be(self.c)
    }

    fn index_entries(&self) -> Vec<(&'static str, Vec<u8>)> {
        let mut entries = Vec::new();
        entries.extend(self.onyomi.iter().map(|s| ("on", s.as_bytes().to_vec())));
        entries.extend(self.kunyomi.iter().map(|s| ("kun", s.as_bytes().to_vec())));
        entries.extend(self.m.iter().map(|s| ("m", s.as_bytes().to_vec())));
        entries
    }

    fn index_names() -> &'static [&'static str] {
        &["on", "kun", "m"]
    }

    fn delete_key(payload: &Value) -> Result<Vec<u8>, String> {
        payload
            .get("c")
            .and_then(Value::as_u64)
            .map(|c| u32_be(c as u32))
            .ok_or_else(|| "delete record missing `c`".to_string())
    }
}

impl Record for Radical {
    const SERIES: DataSeries = DataSeries::Radicals;

    fn primary_key(&self) -> Vec<u8> {
        self.id.as_bytes().to_vec()
    }

    fn index_entries(&self) -> Vec<(&'static str, Vec<u8>)> {
        let mut entries = vec![("b", self.b.to_string().into_bytes())];
        if let Some(k) = self.k {
            entries.push(("k", k.to_string().into_bytes()));
        }
        entries.extend(self.na.iter().map(|s| ("na", s.as_bytes().to_vec())));
        entries
    }

    fn index_names() -> &'static [&'static str] {
        &["b", "k", "na"]
    }

    fn delete_key(payload: &Value) -> Result<Vec<u8>, String> {
        payload
            .get("id")
            .and_then(Value::as_str)
            .map(|id| id.as_bytes().to_vec())
            .ok_or_else(|| "delete record missing `id`".to_string())
    }
}
