//! Derived-field computation the Update Applier runs at ingestion time.
//! These fields are never authoritative on the wire; they back the Store's
//! secondary indices and are recomputed on every write.

use std::collections::BTreeSet;

use itertools::Itertools;

use japanese::{contains_hiragana, to_hiragana};
use types::words::{Sense, Word};

/// `h[] = unique(to_hiragana(x) for x in k ∪ r if contains_hiragana(to_hiragana(x)))`.
pub fn headword_hiragana(kanji: Option<&[String]>, kana: &[String]) -> Vec<String> {
    kanji
        .unwrap_or(&[])
        .iter()
        .chain(kana.iter())
        .map(|s| to_hiragana(s))
        .filter(|s| contains_hiragana(s))
        .unique()
        .collect()
}

/// `kc[] = the set of single characters drawn from all kanji headwords`.
pub fn kanji_singletons(kanji: Option<&[String]>) -> Vec<char> {
    let set: BTreeSet<char> = kanji
        .unwrap_or(&[])
        .iter()
        .flat_map(|s| s.chars())
        .filter(|c| japanese::JapaneseExt::is_kanji(c))
        .collect();
    set.into_iter().collect()
}

/// First stopword-filtered token of each gloss, split by the sense's
/// effective language into `gt_en[]` (English) and `gt_l[]` (everything
/// else).
pub fn gloss_tokens(senses: &[Sense]) -> (Vec<String>, Vec<String>) {
    let mut en = Vec::new();
    let mut localized = Vec::new();
    for sense in senses {
        for gloss in &sense.g {
            // `tokenize` already strips stop words; the first remaining
            // token is the index key.
            let Some(first) = japanese::tokenize(gloss, &sense.lang).into_iter().next() else {
                continue;
            };
            if sense.lang == "en" {
                en.push(first);
            } else {
                localized.push(first);
            }
        }
    }
    (en.into_iter().unique().collect(), localized.into_iter().unique().collect())
}

/// Fills in `h`, `kc`, `gt_en`, `gt_l` on a freshly deserialized [`Word`].
pub fn populate_word_derived_fields(word: &mut Word) {
    word.h = headword_hiragana(word.k.as_deref(), &word.r);
    word.kc = kanji_singletons(word.k.as_deref());
    let (en, localized) = gloss_tokens(&word.s);
    word.gt_en = en;
    word.gt_l = localized;
}

#[cfg(test)]
mod test {
    use super::*;
    use types::words::Sense;

    #[test]
    fn headword_hiragana_dedupes_and_filters_pure_kanji() {
        let kanji = vec!["引く".to_string()];
        let kana = vec!["ひく".to_string(), "ひく".to_string()];
        let h = headword_hiragana(Some(&kanji), &kana);
        assert_eq!(h, vec!["ひく".to_string()]);
    }

    #[test]
    fn kanji_singletons_extracts_unique_chars() {
        let kanji = vec!["引力".to_string(), "引く".to_string()];
        assert_eq!(kanji_singletons(Some(&kanji)), vec!['力', '引']);
    }

    #[test]
    fn gloss_tokens_split_by_effective_language() {
        let senses = vec![
            Sense {
                g: vec!["in the twinkling of an eye".to_string()],
                lang: "en".to_string(),
                ..Default::default()
            },
            Sense {
                g: vec!["im Nu".to_string()],
                lang: "de".to_string(),
                ..Default::default()
            },
        ];
        let (en, localized) = gloss_tokens(&senses);
        assert_eq!(en, vec!["twinkling".to_string()]);
        assert_eq!(localized, vec!["im".to_string()]);
    }

    #[test]
    fn populate_word_derived_fields_fills_all_four() {
        let mut word = Word {
            id: 1,
            k: Some(vec!["引く".to_string()]),
            km: None,
            r: vec!["ひく".to_string()],
            rm: None,
            s: vec![Sense {
                g: vec!["to pull".to_string()],
                lang: "en".to_string(),
                ..Default::default()
            }],
            h: vec![],
            kc: vec![],
            gt_en: vec![],
            gt_l: vec![],
        };
        populate_word_derived_fields(&mut word);
        assert_eq!(word.h, vec!["ひく".to_string()]);
        assert_eq!(word.kc, vec!['引']);
        assert_eq!(word.gt_en, vec!["pull".to_string()]);
        assert!(word.gt_l.is_empty());
    }
}
