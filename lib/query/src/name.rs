//! `getNames`: the names-series counterpart of `getWords`. Reuses the same
//! k/r/h probing and match de-duplication; there is no priority/WK/Bunpro
//! annotation on names, so results are ordered by id ascending rather than
//! run through the Ranking Engine.

use std::collections::HashMap;

use error::SyncError;
use japanese::to_hiragana;
use store::Store;
use types::names::Name;
use types::result::{HeadwordMatch, NameResult};

use crate::matching::{self, MatchType};

fn merge_matches(
    by_id: &mut HashMap<u32, (Name, HashMap<(usize, bool), HeadwordMatch>)>,
    name: Name,
    matches: Vec<HeadwordMatch>,
) {
    let entry = by_id.entry(name.id).or_insert_with(|| (name.clone(), HashMap::new()));
    for m in matches {
        let key = (m.index, m.is_kanji);
        let replace = match entry.1.get(&key) {
            Some(existing) => matching::mode_rank(m.mode) < matching::mode_rank(existing.mode),
            None => true,
        };
        if replace {
            entry.1.insert(key, m);
        }
    }
}

/// `getNames(search, matchType)`.
pub fn get_names(store: &Store, search: &str, match_type: MatchType) -> Result<Vec<NameResult>, SyncError> {
    let normalized = matching::normalize_search(search);
    let hira = to_hiragana(&normalized);

    let k_hits: Vec<Name> = match match_type {
        MatchType::Exact => store.lookup_index("k", normalized.as_bytes())?,
        MatchType::StartsWith => store.scan_index_prefix("k", normalized.as_bytes())?,
    };
    let r_hits: Vec<Name> = match match_type {
        MatchType::Exact => store.lookup_index("r", normalized.as_bytes())?,
        MatchType::StartsWith => store.scan_index_prefix("r", normalized.as_bytes())?,
    };
    let h_hits: Vec<Name> = match match_type {
        MatchType::Exact => store.lookup_index("h", hira.as_bytes())?,
        MatchType::StartsWith => store.scan_index_prefix("h", hira.as_bytes())?,
    };

    let mut by_id: HashMap<u32, (Name, HashMap<(usize, bool), HeadwordMatch>)> = HashMap::new();

    for name in k_hits {
        let matches = matching::direct_matches(name.kanji_headwords(), &normalized, true, match_type);
        merge_matches(&mut by_id, name, matches);
    }
    for name in r_hits {
        let matches = matching::direct_matches(&name.r, &normalized, false, match_type);
        merge_matches(&mut by_id, name, matches);
    }
    for name in h_hits {
        let matches = matching::hiragana_matches(name.kanji_headwords(), &name.r, &hira, match_type);
        merge_matches(&mut by_id, name, matches);
    }

    let mut results: Vec<NameResult> = by_id
        .into_values()
        .map(|(name, matches_map)| NameResult {
            name,
            matches: matches_map.into_values().collect(),
        })
        .collect();
    results.sort_by_key(|r| r.name.id);
    Ok(results)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use types::version::{DataVersion, VersionNumber};

    fn store_with(names: Vec<Name>) -> (tempfile::TempDir, Arc<Store>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        store
            .apply_file(
                false,
                names.into_iter().map(store::RecordOp::Upsert).collect(),
                DataVersion {
                    number: VersionNumber::new(1, 0, 0),
                    part_info: None,
                    database_version: None,
                    date_of_creation: "2026-01-01".to_string(),
                    lang: "en".to_string(),
                },
            )
            .unwrap();
        (dir, store)
    }

    fn name(id: u32, k: Option<&str>, r: &str) -> Name {
        let mut n = Name {
            id,
            k: k.map(|k| vec![k.to_string()]),
            r: vec![r.to_string()],
            tr: vec![],
            h: vec![],
        };
        n.h = sync::derive::headword_hiragana(n.k.as_deref(), &n.r);
        n
    }

    #[test]
    fn exact_search_matches_kanji_headword() {
        let (_dir, store) = store_with(vec![name(1, Some("田中"), "たなか")]);
        let results = get_names(&store, "田中", MatchType::Exact).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].matches.iter().any(|m| m.is_kanji));
    }

    #[test]
    fn kana_equivalent_search_matches_via_hiragana_index() {
        let (_dir, store) = store_with(vec![name(1, Some("田中"), "たなか")]);
        let results = get_names(&store, "タナカ", MatchType::Exact).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].matches.iter().any(|m| !m.is_kanji));
    }

    #[test]
    fn starts_with_finds_every_prefix_hit() {
        let (_dir, store) = store_with(vec![name(1, None, "たなか"), name(2, None, "たなべ")]);
        let results = get_names(&store, "たな", MatchType::StartsWith).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name.id, 1);
        assert_eq!(results[1].name.id, 2);
    }

    #[test]
    fn duplicate_hits_across_probes_collapse_to_one_result() {
        let (_dir, store) = store_with(vec![name(1, Some("田中"), "たなか")]);
        let results = get_names(&store, "たなか", MatchType::Exact).unwrap();
        assert_eq!(results.len(), 1);
    }
}
