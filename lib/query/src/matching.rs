//! Shared headword-matching helpers used by both the word and name search
//! paths: literal matches against a raw probe, and kana-equivalent matches
//! against a hiragana-normalized probe.

use japanese::to_hiragana;
use types::result::{HeadwordMatch, MatchMode, MatchRange};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    StartsWith,
}

/// Unicode-NFC normalizes a raw search term before any index probe.
pub fn normalize_search(search: &str) -> String {
    search.nfc().collect()
}

/// Lower = stronger; used to keep the best match when the same headword
/// slot is hit by more than one probe (e.g. a kana search term that is
/// already its own hiragana form matches both the `r` and `h` indices).
pub fn mode_rank(mode: MatchMode) -> u8 {
    match mode {
        MatchMode::Lexeme => 0,
        MatchMode::StartsWith => 1,
        MatchMode::KanaEquivalent => 2,
        MatchMode::StartsWithKanaEquivalent => 3,
    }
}

fn range_for(entry: &str, match_type: MatchType, probe_chars: usize) -> MatchRange {
    match match_type {
        MatchType::Exact => MatchRange { start: 0, end: entry.len() },
        MatchType::StartsWith => {
            let end = entry
                .char_indices()
                .nth(probe_chars)
                .map(|(b, _)| b)
                .unwrap_or(entry.len());
            MatchRange { start: 0, end }
        }
    }
}

/// Matches `probe` literally against `entries` (a `k[]` or `r[]` array).
pub fn direct_matches(entries: &[String], probe: &str, is_kanji: bool, match_type: MatchType) -> Vec<HeadwordMatch> {
    let probe_chars = probe.chars().count();
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let hit = match match_type {
                MatchType::Exact => entry == probe,
                MatchType::StartsWith => entry.starts_with(probe),
            };
            hit.then(|| HeadwordMatch {
                index,
                is_kanji,
                mode: match match_type {
                    MatchType::Exact => MatchMode::Lexeme,
                    MatchType::StartsWith => MatchMode::StartsWith,
                },
                range: range_for(entry, match_type, probe_chars),
            })
        })
        .collect()
}

/// Matches a hiragana-normalized `probe` against both `k[]` and `r[]`,
/// converting each candidate headword to hiragana before comparing.
pub fn hiragana_matches(k: &[String], r: &[String], probe_hira: &str, match_type: MatchType) -> Vec<HeadwordMatch> {
    let probe_chars = probe_hira.chars().count();
    let scan = |entries: &[String], is_kanji: bool, out: &mut Vec<HeadwordMatch>| {
        for (index, entry) in entries.iter().enumerate() {
            let hira_entry = to_hiragana(entry);
            let hit = match match_type {
                MatchType::Exact => hira_entry == probe_hira,
                MatchType::StartsWith => hira_entry.starts_with(probe_hira),
            };
            if hit {
                out.push(HeadwordMatch {
                    index,
                    is_kanji,
                    mode: match match_type {
                        MatchType::Exact => MatchMode::KanaEquivalent,
                        MatchType::StartsWith => MatchMode::StartsWithKanaEquivalent,
                    },
                    range: range_for(entry, match_type, probe_chars),
                });
            }
        }
    };
    let mut out = Vec::new();
    scan(k, true, &mut out);
    scan(r, false, &mut out);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_direct_match_covers_whole_entry() {
        let entries = vec!["引く".to_string()];
        let matches = direct_matches(&entries, "引く", true, MatchType::Exact);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].mode, MatchMode::Lexeme);
        assert_eq!(matches[0].range, MatchRange { start: 0, end: "引く".len() });
    }

    #[test]
    fn starts_with_range_covers_only_the_probe_prefix() {
        let entries = vec!["ひくい".to_string()];
        let matches = direct_matches(&entries, "ひく", false, MatchType::StartsWith);
        assert_eq!(matches[0].range, MatchRange { start: 0, end: "ひく".len() });
    }

    #[test]
    fn hiragana_matches_finds_kanji_and_kana_equivalents() {
        let k = vec!["引く".to_string()];
        let r = vec!["ヒク".to_string()];
        let matches = hiragana_matches(&k, &r, "ひく", MatchType::Exact);
        assert!(matches.iter().any(|m| m.is_kanji && m.mode == MatchMode::KanaEquivalent));
        assert!(matches.iter().any(|m| !m.is_kanji && m.mode == MatchMode::KanaEquivalent));
    }

    #[test]
    fn mode_rank_prefers_literal_over_kana_equivalent() {
        assert!(mode_rank(MatchMode::Lexeme) < mode_rank(MatchMode::KanaEquivalent));
        assert!(mode_rank(MatchMode::StartsWith) < mode_rank(MatchMode::StartsWithKanaEquivalent));
    }
}
