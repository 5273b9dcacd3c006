//! Result Shaper: assembles a [`WordResult`] from a record plus its
//! computed matches, extracting WaniKani/Bunpro levels from priority tags.

use types::result::{BunproLevel, GlossMatch, HeadwordMatch, WordResult};
use types::words::Word;

fn priority_tags(word: &Word) -> Vec<&str> {
    let mut tags = Vec::new();
    if let Some(km) = &word.km {
        for meta in km.iter().filter_map(|m| m.as_ref()) {
            tags.extend(meta.p.iter().map(String::as_str));
        }
    }
    if let Some(rm) = &word.rm {
        for meta in rm.iter().filter_map(|m| m.as_ref()) {
            tags.extend(meta.p.iter().map(String::as_str));
        }
    }
    tags
}

/// Extracts `wk`, `bv`, `bg` from every priority tag on the record (not
/// just matched headwords — these are display-only annotations, not part
/// of the ranking signal). The lowest level across all occurrences wins.
pub fn extract_levels(word: &Word) -> (Option<u16>, Option<BunproLevel>, Option<BunproLevel>) {
    let mut wk: Option<u16> = None;
    let mut bv: Option<BunproLevel> = None;
    let mut bg: Option<BunproLevel> = None;

    for tag in priority_tags(word) {
        if let Some(n) = tag.strip_prefix("wk").and_then(|s| s.parse::<u16>().ok()) {
            wk = Some(wk.map_or(n, |cur| cur.min(n)));
        } else if let Some(n) = tag.strip_prefix("bv").and_then(|s| s.parse::<u16>().ok()) {
            if bv.as_ref().map(|cur| n < cur.level).unwrap_or(true) {
                bv = Some(BunproLevel { level: n, src: Some(tag.to_string()) });
            }
        } else if let Some(n) = tag.strip_prefix("bg").and_then(|s| s.parse::<u16>().ok()) {
            if bg.as_ref().map(|cur| n < cur.level).unwrap_or(true) {
                bg = Some(BunproLevel { level: n, src: Some(tag.to_string()) });
            }
        }
    }
    (wk, bv, bg)
}

pub fn build_word_result(
    word: Word,
    matches: Vec<HeadwordMatch>,
    kanji_matches: u32,
    kana_matches: u32,
    gloss_matches: Vec<GlossMatch>,
) -> WordResult {
    let (wk, bv, bg) = extract_levels(&word);
    WordResult {
        word,
        matches,
        kanji_matches,
        kana_matches,
        wk,
        bv,
        bg,
        gloss_matches,
    }
}
