//! Embedded storage for all four data series, backed by a single
//! [`sled::Db`]. Each series gets a primary tree keyed by its primary key
//! and one tree per secondary index; a `meta` tree tracks the last
//! committed [`DataVersion`] per series.
//!
//! A whole download file (reset + record ops + version bump) commits as
//! one [`sled::Transactional`] transaction over every tree the file
//! touches, so a crash or rollback never leaves a partially applied file
//! visible to readers.

pub mod key;
pub mod schema;

use std::path::Path;

use log::{debug, info};
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};

use error::SyncError;
use types::series::DataSeries;
use types::version::DataVersion;

pub use schema::Record;

const META_TREE: &str = "meta";

fn version_meta_key(series: DataSeries) -> Vec<u8> {
    format!("version:{series}").into_bytes()
}

/// One parsed line from a download file, ready to apply to the store.
#[derive(Debug, Clone)]
pub enum RecordOp<T> {
    Upsert(T),
    /// Deletes the record with this primary key (already encoded).
    Delete(Vec<u8>),
}

pub struct Store {
    db: Db,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Store, SyncError> {
        let db = sled::open(path).map_err(|e| SyncError::Store(e.to_string()))?;
        Ok(Store { db })
    }

    fn primary_tree(&self, series: DataSeries) -> Result<Tree, SyncError> {
        self.db
            .open_tree(series.to_string())
            .map_err(|e| SyncError::Store(e.to_string()))
    }

    fn index_tree(&self, series: DataSeries, index: &str) -> Result<Tree, SyncError> {
        self.db
            .open_tree(format!("{series}__{index}"))
            .map_err(|e| SyncError::Store(e.to_string()))
    }

    fn meta_tree(&self) -> Result<Tree, SyncError> {
        self.db
            .open_tree(META_TREE)
            .map_err(|e| SyncError::Store(e.to_string()))
    }

    pub fn version(&self, series: DataSeries) -> Result<Option<DataVersion>, SyncError> {
        let meta = self.meta_tree()?;
        let Some(raw) = meta
            .get(version_meta_key(series))
            .map_err(|e| SyncError::Store(e.to_string()))?
        else {
            return Ok(None);
        };
        let version = bincode::deserialize(&raw).map_err(|e| SyncError::Store(e.to_string()))?;
        Ok(Some(version))
    }

    /// The series' state as inferable purely from store contents: whether a
    /// version row exists and whether the primary tree has any records.
    /// Never returns `Unavailable` — that transition is runtime-only and is
    /// the Sync Coordinator's responsibility.
    pub fn inferred_state(&self, series: DataSeries) -> Result<types::state::DataSeriesState, SyncError> {
        use types::state::DataSeriesState;

        if self.version(series)?.is_none() {
            return Ok(DataSeriesState::Init);
        }
        let primary = self.primary_tree(series)?;
        if primary.is_empty() {
            Ok(DataSeriesState::Empty)
        } else {
            Ok(DataSeriesState::Ok)
        }
    }

    pub fn get<T: Record>(&self, primary_key: &[u8]) -> Result<Option<T>, SyncError> {
        let tree = self.primary_tree(T::SERIES)?;
        let Some(raw) = tree
            .get(primary_key)
            .map_err(|e| SyncError::Store(e.to_string()))?
        else {
            return Ok(None);
        };
        let record = bincode::deserialize(&raw).map_err(|e| SyncError::Store(e.to_string()))?;
        Ok(Some(record))
    }

    /// Point/prefix lookup on a secondary index: every record whose
    /// `index_name` field exactly equals `value`.
    pub fn lookup_index<T: Record>(&self, index_name: &str, value: &[u8]) -> Result<Vec<T>, SyncError> {
        self.scan_index_range(index_name, value, value)
    }

    /// "Starts with" lookup: every record whose `index_name` field begins
    /// with `prefix`.
    pub fn scan_index_prefix<T: Record>(&self, index_name: &str, prefix: &[u8]) -> Result<Vec<T>, SyncError> {
        let tree = self.index_tree(T::SERIES, index_name)?;
        let primary = self.primary_tree(T::SERIES)?;
        let upper = key::prefix_upper_bound(prefix);

        let mut out = Vec::new();
        let range_iter = match &upper {
            Some(upper) => tree.range(prefix.to_vec()..upper.clone()),
            None => tree.range(prefix.to_vec()..),
        };
        for entry in range_iter {
            let (k, _) = entry.map_err(|e| SyncError::Store(e.to_string()))?;
            let Some((_, pk)) = key::split_index_key(&k) else {
                continue;
            };
            if let Some(raw) = primary
                .get(pk)
                .map_err(|e| SyncError::Store(e.to_string()))?
            {
                out.push(bincode::deserialize(&raw).map_err(|e| SyncError::Store(e.to_string()))?);
            }
        }
        Ok(out)
    }

    /// Exact-match lookup: every record whose `index_name` field equals
    /// `value` exactly (the field portion of the index key, not a prefix).
    fn scan_index_range<T: Record>(&self, index_name: &str, value: &[u8], _unused: &[u8]) -> Result<Vec<T>, SyncError> {
        let tree = self.index_tree(T::SERIES, index_name)?;
        let primary = self.primary_tree(T::SERIES)?;
        // `value ++ 0x00` is the smallest key whose field equals `value`
        // exactly; `value ++ 0x01` is the smallest key whose field is
        // strictly greater than `value` (separators are always `0x00`).
        let lo_key = key::index_key(value, &[]);
        let mut hi_key = value.to_vec();
        hi_key.push(0x01);

        let mut out = Vec::new();
        for entry in tree.range(lo_key..hi_key) {
            let (k, _) = entry.map_err(|e| SyncError::Store(e.to_string()))?;
            let Some((_, pk)) = key::split_index_key(&k) else {
                continue;
            };
            if let Some(raw) = primary
                .get(pk)
                .map_err(|e| SyncError::Store(e.to_string()))?
            {
                out.push(bincode::deserialize(&raw).map_err(|e| SyncError::Store(e.to_string()))?);
            }
        }
        Ok(out)
    }

    /// Clears every record and index entry for `series` and drops its
    /// stored data-version row, without requiring the caller to name the
    /// concrete [`Record`] type. Used for a language-change clobber or an
    /// explicit `deleteSeries` call, both of which operate on a runtime
    /// [`DataSeries`] rather than a known `T`.
    pub fn clear_series_untyped(&self, series: DataSeries) -> Result<(), SyncError> {
        let primary = self.primary_tree(series)?;
        let meta = self.meta_tree()?;
        let index_trees: Vec<Tree> = schema::index_names_for(series)
            .iter()
            .map(|name| self.index_tree(series, name))
            .collect::<Result<_, _>>()?;

        primary.clear().map_err(|e| SyncError::Store(e.to_string()))?;
        for tree in &index_trees {
            tree.clear().map_err(|e| SyncError::Store(e.to_string()))?;
        }
        meta.remove(version_meta_key(series))
            .map_err(|e| SyncError::Store(e.to_string()))?;

        info!("store: cleared series={series}");
        self.db.flush().map_err(|e| SyncError::Store(e.to_string()))?;
        Ok(())
    }

    /// Commits one download file: optionally clears every record of the
    /// series first (`reset`), applies `ops` in order, then writes the new
    /// `version` row. All of it lands in a single sled transaction over the
    /// primary tree, every secondary index tree, and the meta tree.
    pub fn apply_file<T: Record>(
        &self,
        reset: bool,
        ops: Vec<RecordOp<T>>,
        version: DataVersion,
    ) -> Result<(), SyncError> {
        let primary = self.primary_tree(T::SERIES)?;
        let meta = self.meta_tree()?;
        let index_trees: Vec<Tree> = T::index_names()
            .iter()
            .map(|name| self.index_tree(T::SERIES, name))
            .collect::<Result<_, _>>()?;

        // Existing keys to drop on reset, gathered outside the transaction
        // (sled transactions can't scan) and deleted inside it.
        let reset_primary_keys: Vec<Vec<u8>> = if reset {
            primary.iter().keys().filter_map(Result::ok).map(|k| k.to_vec()).collect()
        } else {
            Vec::new()
        };
        let reset_index_keys: Vec<Vec<Vec<u8>>> = if reset {
            index_trees
                .iter()
                .map(|t| t.iter().keys().filter_map(Result::ok).map(|k| k.to_vec()).collect())
                .collect()
        } else {
            vec![Vec::new(); index_trees.len()]
        };

        let version_key = version_meta_key(T::SERIES);
        let version_bytes = bincode::serialize(&version).map_err(|e| SyncError::Store(e.to_string()))?;

        let mut all_trees: Vec<&Tree> = vec![&primary, &meta];
        all_trees.extend(index_trees.iter());

        let result: Result<(), TransactionError<String>> = all_trees.as_slice().transaction(|trees| {
            let tx_primary = &trees[0];
            let tx_meta = &trees[1];
            let tx_indexes = &trees[2..];

            if reset {
                for pk in &reset_primary_keys {
                    tx_primary.remove(pk.as_slice())?;
                }
                for (tree, keys) in tx_indexes.iter().zip(reset_index_keys.iter()) {
                    for k in keys {
                        tree.remove(k.as_slice())?;
                    }
                }
            }

            for op in &ops {
                match op {
                    RecordOp::Upsert(record) => {
                        let pk = record.primary_key();
                        let value = bincode::serialize(record).map_err(|e| {
                            ConflictableTransactionError::Abort(e.to_string())
                        })?;
                        tx_primary.insert(pk.as_slice(), value)?;
                        for (name, field_value) in record.index_entries() {
                            let idx = T::index_names().iter().position(|n| *n == name).ok_or_else(|| {
                                ConflictableTransactionError::Abort(format!(
                                    "unknown index {name}"
                                ))
                            })?;
                            let ik = key::index_key(&field_value, &pk);
                            tx_indexes[idx].insert(ik, &[] as &[u8])?;
                        }
                    }
                    RecordOp::Delete(pk) => {
                        if let Some(old) = tx_primary.remove(pk.as_slice())? {
                            let old_record: T = bincode::deserialize(&old).map_err(|e| {
                                ConflictableTransactionError::Abort(e.to_string())
                            })?;
                            for (name, field_value) in old_record.index_entries() {
                                let idx = T::index_names().iter().position(|n| *n == name).ok_or_else(|| {
                                    ConflictableTransactionError::Abort(format!(
                                        "unknown index {name}"
                                    ))
                                })?;
                                let ik = key::index_key(&field_value, pk);
                                tx_indexes[idx].remove(ik)?;
                            }
                        }
                    }
                }
            }

            tx_meta.insert(version_key.as_slice(), version_bytes.as_slice())?;
            Ok(())
        });

        result.map_err(|e| SyncError::Store(e.to_string()))?;

        info!(
            "store: committed {} ops for series={} version={} reset={}",
            ops.len(),
            T::SERIES,
            version.number,
            reset
        );
        debug!("store: flushing {}", T::SERIES);
        self.db.flush().map_err(|e| SyncError::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
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

    fn word(id: u32, kanji: &str, kana: &str) -> Word {
        Word {
            id,
            k: Some(vec![kanji.to_string()]),
            km: None,
            r: vec![kana.to_string()],
            rm: None,
            s: vec![],
            h: vec![kanji.to_string(), kana.to_string()],
            kc: kanji.chars().collect(),
            gt_en: vec![],
            gt_l: vec![],
        }
    }

    #[test]
    fn apply_file_is_visible_only_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        assert_eq!(store.inferred_state(DataSeries::Words).unwrap(), types::state::DataSeriesState::Init);

        let w = word(1, "引く", "ひく");
        store
            .apply_file(false, vec![RecordOp::Upsert(w.clone())], version(1))
            .unwrap();

        assert_eq!(store.inferred_state(DataSeries::Words).unwrap(), types::state::DataSeriesState::Ok);
        let fetched: Word = store.get(&key::u32_be(1)).unwrap().unwrap();
        assert_eq!(fetched.id, 1);

        let by_kanji: Vec<Word> = store.lookup_index("k", "引く".as_bytes()).unwrap();
        assert_eq!(by_kanji.len(), 1);
        assert_eq!(by_kanji[0].id, 1);

        let version_row = store.version(DataSeries::Words).unwrap().unwrap();
        assert_eq!(version_row.number, VersionNumber::new(1, 0, 1));
    }

    #[test]
    fn reset_clears_prior_records_before_applying_new_ones() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store
            .apply_file(false, vec![RecordOp::Upsert(word(1, "旧", "きゅう"))], version(1))
            .unwrap();
        store
            .apply_file(true, vec![RecordOp::Upsert(word(2, "新", "しん"))], version(2))
            .unwrap();

        assert!(store.get::<Word>(&key::u32_be(1)).unwrap().is_none());
        let fetched: Word = store.get(&key::u32_be(2)).unwrap().unwrap();
        assert_eq!(fetched.id, 2);
        assert!(store.lookup_index::<Word>("k", "旧".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn delete_op_removes_record_and_its_index_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store
            .apply_file(false, vec![RecordOp::Upsert(word(1, "引く", "ひく"))], version(1))
            .unwrap();
        store
            .apply_file(false, vec![RecordOp::Delete(key::u32_be(1))], version(2))
            .unwrap();

        assert!(store.get::<Word>(&key::u32_be(1)).unwrap().is_none());
        assert!(store.lookup_index::<Word>("k", "引く".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn scan_index_prefix_matches_starts_with() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store
            .apply_file(
                false,
                vec![
                    RecordOp::Upsert(word(1, "食べる", "たべる")),
                    RecordOp::Upsert(word(2, "食べ物", "たべもの")),
                    RecordOp::Upsert(word(3, "飲む", "のむ")),
                ],
                version(1),
            )
            .unwrap();

        let hits: Vec<Word> = store.scan_index_prefix("k", "食べ".as_bytes()).unwrap();
        assert_eq!(hits.len(), 2);
    }
}
