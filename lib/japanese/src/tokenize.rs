//! A deliberately minimal tokenizer + stop-word table.
//!
//! The design treats `tokenize(text, lang) -> tokens` as an external
//! collaborator; nothing here claims to do real morphological analysis. For
//! English-like languages this splits on non-alphanumeric boundaries and
//! lowercases; for languages without reliable whitespace segmentation the
//! fallback is per-character tokens over any run of Han/Kana codepoints.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::kana::JapaneseExt;

static EN_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "or", "if",
        "this", "these", "those", "but", "not",
    ]
    .into_iter()
    .collect()
});

/// Splits `text` into lowercase word tokens for `lang`, dropping stop words.
pub fn tokenize(text: &str, lang: &str) -> Vec<String> {
    let raw = if is_space_delimited(lang) {
        tokenize_words(text)
    } else {
        tokenize_script_runs(text)
    };

    let stop = stopwords(lang);
    raw.into_iter()
        .filter(|t| !t.is_empty() && !stop.contains(t.as_str()))
        .collect()
}

fn is_space_delimited(lang: &str) -> bool {
    !matches!(lang, "ja" | "zh" | "zh-hans" | "zh-hant")
}

fn tokenize_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Groups consecutive kanji/kana/alphanumeric codepoints into tokens; this
/// mirrors how a real morphological tokenizer at least separates scripts,
/// without pretending to segment compounds.
fn tokenize_script_runs(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    let mut cur_kind: Option<CharKind> = None;

    for c in text.chars() {
        let kind = CharKind::of(c);
        if kind == CharKind::Other {
            if !cur.is_empty() {
                tokens.push(std::mem::take(&mut cur));
            }
            cur_kind = None;
            continue;
        }
        if cur_kind.is_some() && cur_kind != Some(kind) {
            tokens.push(std::mem::take(&mut cur));
        }
        cur.push(c);
        cur_kind = Some(kind);
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }

    tokens.into_iter().map(|t| t.to_lowercase()).collect()
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum CharKind {
    Kanji,
    Kana,
    Alnum,
    Other,
}

impl CharKind {
    fn of(c: char) -> Self {
        if c.is_kanji() {
            CharKind::Kanji
        } else if c.is_kana() {
            CharKind::Kana
        } else if c.is_alphanumeric() {
            CharKind::Alnum
        } else {
            CharKind::Other
        }
    }
}

fn stopwords(lang: &str) -> &'static HashSet<&'static str> {
    match lang {
        "en" => &EN_STOPWORDS,
        _ => empty_set(),
    }
}

fn empty_set() -> &'static HashSet<&'static str> {
    static EMPTY: Lazy<HashSet<&'static str>> = Lazy::new(HashSet::new);
    &EMPTY
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tokenizes_english_and_drops_stopwords() {
        assert_eq!(
            tokenize("in the twinkling of an eye", "en"),
            vec!["twinkling", "eye"]
        );
    }

    #[test]
    fn tokenizes_japanese_by_script_run() {
        assert_eq!(tokenize("引く", "ja"), vec!["引", "く"]);
    }

    #[test]
    fn empty_query_yields_no_tokens() {
        assert!(tokenize("   ", "en").is_empty());
    }
}
