//! `getWords`, `getWordsByCrossReference`, `getWordsWithKanji`, and
//! `getWordsWithGloss` — the word-series half of the Query Engine.

use std::collections::HashMap;

use error::SyncError;
use japanese::{tokenize, to_hiragana, JapaneseExt};
use store::Store;
use types::result::{GlossMatch, HeadwordMatch, MatchRange, WordResult};
use types::words::Word;

use crate::matching::{self, MatchType};
use crate::rank;
use crate::shape;

fn merge_matches(
    by_id: &mut HashMap<u32, (Word, HashMap<(usize, bool), HeadwordMatch>)>,
    word: Word,
    matches: Vec<HeadwordMatch>,
) {
    let entry = by_id.entry(word.id).or_insert_with(|| (word.clone(), HashMap::new()));
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

/// `getWords(search, {matchType, limit})`: probes `k`, `r`, then `h` (the
/// last against the hiragana form of `search`), de-duplicating by id.
pub fn get_words(
    store: &Store,
    search: &str,
    match_type: MatchType,
    limit: Option<usize>,
) -> Result<Vec<WordResult>, SyncError> {
    let normalized = matching::normalize_search(search);
    let hira = to_hiragana(&normalized);

    let k_hits: Vec<Word> = match match_type {
        MatchType::Exact => store.lookup_index("k", normalized.as_bytes())?,
        MatchType::StartsWith => store.scan_index_prefix("k", normalized.as_bytes())?,
    };
    let r_hits: Vec<Word> = match match_type {
        MatchType::Exact => store.lookup_index("r", normalized.as_bytes())?,
        MatchType::StartsWith => store.scan_index_prefix("r", normalized.as_bytes())?,
    };
    let h_hits: Vec<Word> = match match_type {
        MatchType::Exact => store.lookup_index("h", hira.as_bytes())?,
        MatchType::StartsWith => store.scan_index_prefix("h", hira.as_bytes())?,
    };

    let mut by_id: HashMap<u32, (Word, HashMap<(usize, bool), HeadwordMatch>)> = HashMap::new();

    for word in k_hits {
        let matches = matching::direct_matches(word.kanji_headwords(), &normalized, true, match_type);
        merge_matches(&mut by_id, word, matches);
    }
    for word in r_hits {
        let matches = matching::direct_matches(&word.r, &normalized, false, match_type);
        merge_matches(&mut by_id, word, matches);
    }
    for word in h_hits {
        let matches = matching::hiragana_matches(word.kanji_headwords(), &word.r, &hira, match_type);
        merge_matches(&mut by_id, word, matches);
    }

    let mut results: Vec<WordResult> = by_id
        .into_values()
        .map(|(word, matches_map)| {
            let matches: Vec<HeadwordMatch> = matches_map.into_values().collect();
            let kanji_matches = matches.iter().filter(|m| m.is_kanji).fold(0u32, |acc, m| acc | (1 << m.index));
            let kana_matches = matches.iter().filter(|m| !m.is_kanji).fold(0u32, |acc, m| acc | (1 << m.index));
            shape::build_word_result(word, matches, kanji_matches, kana_matches, vec![])
        })
        .collect();

    let search_is_kana = normalized.is_kana();
    match match_type {
        MatchType::Exact => rank::sort_word_results(&mut results, None, search_is_kana),
        MatchType::StartsWith => rank::sort_word_results(&mut results, Some(normalized.chars().count()), search_is_kana),
    }

    if let Some(limit) = limit {
        results.truncate(limit);
    }
    Ok(results)
}

/// `getWordsByCrossReference({k?, r?, sense?})`.
pub fn get_words_by_cross_reference(
    store: &Store,
    k: Option<&str>,
    r: Option<&str>,
    sense: Option<u8>,
) -> Result<Vec<WordResult>, SyncError> {
    let candidates: Vec<Word> = match (k, r) {
        (Some(k_val), Some(r_val)) => store
            .lookup_index::<Word>("k", k_val.as_bytes())?
            .into_iter()
            .filter(|w| w.r.iter().any(|x| x == r_val))
            .collect(),
        (Some(k_val), None) => store.lookup_index("k", k_val.as_bytes())?,
        (None, Some(r_val)) => store.lookup_index("r", r_val.as_bytes())?,
        (None, None) => return Err(SyncError::InvalidQuery("cross-reference requires k or r".to_string())),
    };

    let mut results = Vec::with_capacity(candidates.len());
    for word in candidates {
        let mut matches = Vec::new();
        if let Some(k_val) = k {
            matches.extend(matching::direct_matches(word.kanji_headwords(), k_val, true, MatchType::Exact));
        }
        if let Some(r_val) = r {
            matches.extend(matching::direct_matches(&word.r, r_val, false, MatchType::Exact));
        }
        let mut kanji_matches = matches.iter().filter(|m| m.is_kanji).fold(0u32, |acc, m| acc | (1 << m.index));
        let mut kana_matches = matches.iter().filter(|m| !m.is_kanji).fold(0u32, |acc, m| acc | (1 << m.index));

        if let Some(sense_index) = sense {
            if let Some(s) = word.s.get(sense_index as usize) {
                if s.kapp != 0 {
                    kanji_matches &= s.kapp;
                }
                if s.rapp != 0 {
                    kana_matches &= s.rapp;
                }
            }
        }

        results.push(shape::build_word_result(word, matches, kanji_matches, kana_matches, vec![]));
    }

    rank::sort_word_results(&mut results, None, false);
    Ok(results)
}

/// `getWordsWithKanji(singleChar)`: containment lookup over `kc`.
pub fn get_words_with_kanji(store: &Store, search: &str) -> Result<Vec<WordResult>, SyncError> {
    let mut chars = search.chars();
    let c = chars.next().ok_or_else(|| SyncError::InvalidQuery("empty kanji probe".to_string()))?;
    if chars.next().is_some() {
        return Err(SyncError::InvalidQuery("kanji probe must be a single character".to_string()));
    }

    let mut results: Vec<WordResult> = store
        .lookup_index::<Word>("kc", c.to_string().as_bytes())?
        .into_iter()
        .map(|word| shape::build_word_result(word, vec![], 0, 0, vec![]))
        .collect();
    results.sort_by_key(|r| r.word.id);
    Ok(results)
}

fn gloss_search_pass(
    store: &Store,
    tokens: &[String],
    raw_search: &str,
    lang: &str,
    exclude: &std::collections::HashSet<u32>,
    localized: bool,
) -> Result<Vec<(WordResult, bool)>, SyncError> {
    let index_name = if lang != "en" { "gt_l" } else { "gt_en" };
    let exact: Vec<Word> = store.lookup_index(index_name, tokens[0].as_bytes())?;
    // Once full-token hits exist, don't also pull noisy prefix-only
    // candidates for a multi-token search.
    let candidates: Vec<Word> = if !exact.is_empty() {
        exact
    } else {
        store.scan_index_prefix(index_name, tokens[0].as_bytes())?
    };

    let folded_search = raw_search.to_lowercase();
    let mut out = Vec::new();
    for word in candidates {
        if exclude.contains(&word.id) {
            continue;
        }
        let mut gloss_matches = Vec::new();
        for (sense_index, sense) in word.s.iter().enumerate() {
            if sense.lang != lang {
                continue;
            }
            for (gloss_index, gloss) in sense.g.iter().enumerate() {
                let folded_gloss = gloss.to_lowercase();
                let Some(pos) = folded_gloss.find(&folded_search) else {
                    continue;
                };
                let gloss_tokens = tokenize(gloss, lang);
                let base = ((raw_search.chars().count() as f32 / gloss.chars().count().max(1) as f32) * 10.0)
                    .max((tokens.len() as f32 / gloss_tokens.len().max(1) as f32) * 10.0);
                let bonus = if gloss_tokens.first().map(|t| t == &tokens[0]).unwrap_or(false) {
                    0.5
                } else {
                    0.0
                };
                gloss_matches.push(GlossMatch {
                    sense_index,
                    gloss_index,
                    range: MatchRange { start: pos, end: pos + folded_search.len() },
                    confidence: base.round() + bonus,
                });
            }
        }
        if gloss_matches.is_empty() {
            continue;
        }
        out.push((shape::build_word_result(word, vec![], 0, 0, gloss_matches), localized));
    }
    Ok(out)
}

/// `getWordsWithGloss(search, lang, limit?)`.
pub fn get_words_with_gloss(
    store: &Store,
    search: &str,
    lang: &str,
    limit: Option<usize>,
) -> Result<Vec<WordResult>, SyncError> {
    let tokens = tokenize(search, lang);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut results = gloss_search_pass(store, &tokens, search, lang, &std::collections::HashSet::new(), lang != "en")?;

    if lang != "en" {
        let exclude: std::collections::HashSet<u32> = results.iter().map(|(r, _)| r.word.id).collect();
        let tokens_en = tokenize(search, "en");
        if !tokens_en.is_empty() {
            let fallback = gloss_search_pass(store, &tokens_en, search, "en", &exclude, false)?;
            results.extend(fallback);
        }
    }

    rank::sort_gloss(&mut results);
    let mut out: Vec<WordResult> = results.into_iter().map(|(r, _)| r).collect();
    if let Some(limit) = limit {
        out.truncate(limit);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use types::version::{DataVersion, VersionNumber};

    fn store_with(words: Vec<Word>) -> (tempfile::TempDir, Arc<Store>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        store
            .apply_file(
                false,
                words.into_iter().map(store::RecordOp::Upsert).collect(),
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

    fn word(id: u32, k: Option<&str>, r: &str, glosses: Vec<&str>) -> Word {
        let mut word = Word {
            id,
            k: k.map(|k| vec![k.to_string()]),
            km: None,
            r: vec![r.to_string()],
            rm: None,
            s: vec![types::words::Sense {
                g: glosses.into_iter().map(String::from).collect(),
                lang: "en".to_string(),
                ..Default::default()
            }],
            h: vec![],
            kc: vec![],
            gt_en: vec![],
            gt_l: vec![],
        };
        sync::derive::populate_word_derived_fields(&mut word);
        word
    }

    #[test]
    fn exact_search_matches_kanji_headword() {
        let (_dir, store) = store_with(vec![word(1, Some("引く"), "ひく", vec!["to pull"])]);
        let results = get_words(&store, "引く", MatchType::Exact, None).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].matches.iter().any(|m| m.is_kanji));
    }

    #[test]
    fn kana_equivalent_search_matches_via_hiragana_index() {
        let (_dir, store) = store_with(vec![word(1, Some("引く"), "ひく", vec!["to pull"])]);
        let results = get_words(&store, "ヒク", MatchType::Exact, None).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].matches.iter().any(|m| !m.is_kanji));
    }

    #[test]
    fn starts_with_orders_by_excess_chars() {
        let (_dir, store) = store_with(vec![
            word(1, None, "ひくい", vec!["low"]),
            word(2, None, "ひく", vec!["to pull"]),
        ]);
        let results = get_words(&store, "ひく", MatchType::StartsWith, None).unwrap();
        assert_eq!(results[0].word.id, 2);
        assert_eq!(results[1].word.id, 1);
    }

    #[test]
    fn kanji_containment_finds_every_word_using_the_character() {
        let (_dir, store) = store_with(vec![word(1, Some("引く"), "ひく", vec!["to pull"])]);
        let results = get_words_with_kanji(&store, "引").unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn kanji_containment_rejects_multi_char_probes() {
        let (_dir, store) = store_with(vec![]);
        let err = get_words_with_kanji(&store, "引く").unwrap_err();
        assert_eq!(err.code(), error::ErrorCode::InvalidQuery);
    }

    #[test]
    fn gloss_search_finds_substring_match_with_positive_confidence() {
        let (_dir, store) = store_with(vec![word(1, None, "きら", vec!["in the twinkling of an eye"])]);
        let results = get_words_with_gloss(&store, "twinkl", "en", None).unwrap();
        assert_eq!(results.len(), 1);
        let m = &results[0].gloss_matches[0];
        assert_eq!(m.range, MatchRange { start: 7, end: 13 });
        assert!(m.confidence > 0.0);
    }

    #[test]
    fn gloss_search_with_no_tokens_returns_empty() {
        let (_dir, store) = store_with(vec![]);
        assert!(get_words_with_gloss(&store, "the", "en", None).unwrap().is_empty());
    }

    #[test]
    fn cross_reference_requires_k_or_r() {
        let (_dir, store) = store_with(vec![]);
        let err = get_words_by_cross_reference(&store, None, None, None).unwrap_err();
        assert_eq!(err.code(), error::ErrorCode::InvalidQuery);
    }

    #[test]
    fn cross_reference_matches_both_k_and_r_when_both_given() {
        let (_dir, store) = store_with(vec![
            word(1, Some("引く"), "ひく", vec!["to pull"]),
            word(2, Some("引く"), "ひける", vec!["alt reading"]),
        ]);
        let results = get_words_by_cross_reference(&store, Some("引く"), Some("ひく"), None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].word.id, 1);
    }
}
