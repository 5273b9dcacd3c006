//! Ranking Engine: priority-tag scoring, kana-search preference, and the
//! prefix-mode match-length penalty for word results; confidence-weighted
//! ranking for gloss results.

use std::cmp::Ordering;

use types::result::{HeadwordMatch, WordResult};
use types::words::Word;

/// Fixed weight for a single priority tag, or `None` if `tag` isn't a
/// priority tag at all (e.g. a `wk`/`bv`/`bg` level tag).
pub fn priority_tag_weight(tag: &str) -> Option<f64> {
    match tag {
        "i1" => Some(50.0),
        "n1" => Some(40.0),
        "s1" => Some(32.0),
        "g1" => Some(30.0),
        "i2" | "n2" | "s2" => Some(20.0),
        "g2" => Some(15.0),
        _ => {
            let nn: u32 = tag.strip_prefix("nf")?.parse().ok()?;
            (nn > 0 && nn < 48).then(|| 48.0 - nn as f64 / 2.0)
        }
    }
}

/// The combined priority score of a set of tags on one matched headword:
/// the strongest tag's weight, plus a diminishing tail over the rest.
pub fn priority_score(tags: &[&str]) -> f64 {
    let mut weights: Vec<f64> = tags.iter().filter_map(|t| priority_tag_weight(t)).collect();
    if weights.is_empty() {
        return 0.0;
    }
    weights.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    let mut score = weights[0];
    for (i, w) in weights[1..].iter().enumerate() {
        score += w * 10f64.powi(-(i as i32 + 1));
    }
    score
}

fn headword_tags<'a>(word: &'a Word, index: usize, is_kanji: bool) -> &'a [String] {
    let meta = if is_kanji {
        word.km.as_ref().and_then(|v| v.get(index)).and_then(|m| m.as_ref()).map(|m| m.p.as_slice())
    } else {
        word.rm.as_ref().and_then(|v| v.get(index)).and_then(|m| m.as_ref()).map(|m| m.p.as_slice())
    };
    meta.unwrap_or(&[])
}

/// A record's priority: the max, across its matched headwords, of that
/// headword's own priority score. `0.0` if nothing matched (e.g. a kanji
/// containment lookup, which has no headword match concept).
pub fn record_priority(word: &Word, matches: &[HeadwordMatch]) -> f64 {
    matches
        .iter()
        .map(|m| {
            let tags = headword_tags(word, m.index, m.is_kanji);
            let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
            priority_score(&tag_refs)
        })
        .fold(0.0, f64::max)
}

fn has_kana_match(matches: &[HeadwordMatch]) -> bool {
    matches.iter().any(|m| !m.is_kanji)
}

fn min_excess_chars(word: &Word, matches: &[HeadwordMatch], search_chars: usize) -> i64 {
    matches
        .iter()
        .filter_map(|m| {
            let headword = if m.is_kanji {
                word.kanji_headwords().get(m.index)
            } else {
                word.r.get(m.index)
            };
            headword.map(|s| s.chars().count() as i64 - search_chars as i64)
        })
        .min()
        .unwrap_or(0)
}

/// Orders word results per §4.9: in prefix mode (`search_chars` given),
/// fewer excess characters sorts first; then, when the search term is pure
/// kana, a reading match sorts before a kanji-only match at equal rank;
/// then priority descending. Stable.
pub fn sort_word_results(results: &mut [WordResult], search_chars: Option<usize>, search_is_kana: bool) {
    results.sort_by(|a, b| {
        if let Some(n) = search_chars {
            let ea = min_excess_chars(&a.word, &a.matches, n);
            let eb = min_excess_chars(&b.word, &b.matches, n);
            if ea != eb {
                return ea.cmp(&eb);
            }
        }
        if search_is_kana {
            let ka = has_kana_match(&a.matches);
            let kb = has_kana_match(&b.matches);
            if ka != kb {
                return kb.cmp(&ka);
            }
        }
        let pa = record_priority(&a.word, &a.matches);
        let pb = record_priority(&b.word, &b.matches);
        pb.partial_cmp(&pa).unwrap_or(Ordering::Equal)
    });
}

fn gloss_rank_value(result: &WordResult, localized: bool) -> f64 {
    let confidence = result
        .gloss_matches
        .iter()
        .map(|g| g.confidence)
        .fold(0.0f32, f32::max) as f64;
    let priority = record_priority(&result.word, &result.matches);
    confidence * 10.0 + priority + if localized { 50.0 } else { 0.0 }
}

/// Orders gloss-search results per §4.9: `confidence*10 + priority +
/// (localized?50:0)` descending, ties broken by id ascending.
pub fn sort_gloss(results: &mut Vec<(WordResult, bool)>) {
    results.sort_by(|(ra, la), (rb, lb)| {
        let va = gloss_rank_value(ra, *la);
        let vb = gloss_rank_value(rb, *lb);
        match vb.partial_cmp(&va).unwrap_or(Ordering::Equal) {
            Ordering::Equal => ra.word.id.cmp(&rb.word.id),
            other => other,
        }
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn priority_weights_match_the_fixed_table() {
        assert_eq!(priority_tag_weight("i1"), Some(50.0));
        assert_eq!(priority_tag_weight("n2"), Some(20.0));
        assert_eq!(priority_tag_weight("nf12"), Some(42.0));
        assert_eq!(priority_tag_weight("nf47"), Some(48.0 - 23.5));
        assert_eq!(priority_tag_weight("nf48"), None);
        assert_eq!(priority_tag_weight("wk12"), None);
    }

    #[test]
    fn priority_score_adds_a_diminishing_tail() {
        let score = priority_score(&["i1", "n1"]);
        assert!(score > 50.0 && score < 51.0);
        assert_eq!(priority_score(&[]), 0.0);
    }

    #[test]
    fn single_matching_tag_wins_without_a_tail() {
        assert_eq!(priority_score(&["i1"]), 50.0);
    }
}
