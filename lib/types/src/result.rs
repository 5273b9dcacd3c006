//! Public result shapes returned by the Query Engine / Result Shaper.

use serde::{Deserialize, Serialize};

use crate::kanji::Kanji;
use crate::names::Name;
use crate::radical::Radical;
use crate::words::Word;

/// How a headword matched the search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    Lexeme,
    KanaEquivalent,
    StartsWith,
    StartsWithKanaEquivalent,
}

/// A byte-offset range `[start, end)` into the matched headword string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRange {
    pub start: usize,
    pub end: usize,
}

/// A Bunpro grammar/vocab level extracted from a priority tag like `bv12` or `bg4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BunproLevel {
    pub level: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

/// Which headword(s) of a [`WordResult`]/[`NameResult`] matched, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadwordMatch {
    pub index: usize,
    pub is_kanji: bool,
    pub mode: MatchMode,
    pub range: MatchRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordResult {
    pub word: Word,
    pub matches: Vec<HeadwordMatch>,
    /// Bitfield over `k[]` recording which kanji headwords matched.
    pub kanji_matches: u32,
    /// Bitfield over `r[]` recording which kana headwords matched.
    pub kana_matches: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wk: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bv: Option<BunproLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<BunproLevel>,
    /// Per-match gloss confidence/position, present only for gloss search.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gloss_matches: Vec<GlossMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossMatch {
    pub sense_index: usize,
    pub gloss_index: usize,
    pub range: MatchRange,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameResult {
    pub name: Name,
    pub matches: Vec<HeadwordMatch>,
}

/// A resolved kanji-component entry used to build the public `components`
/// list of a [`KanjiResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Component {
    Radical {
        radical: Radical,
        is_rad: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        base: Option<char>,
    },
    Kanji {
        c: char,
        reading: Vec<String>,
        meaning: Vec<String>,
    },
    Katakana {
        c: char,
        #[serde(skip_serializing_if = "Option::is_none")]
        romaji: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanjiResult {
    pub kanji: Kanji,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radical: Option<Radical>,
    pub components: Vec<Component>,
    pub related: Vec<Kanji>,
}
