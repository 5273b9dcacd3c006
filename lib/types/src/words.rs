//! The *words* series record shape.

use serde::{Deserialize, Serialize};

/// Headwords/readings are capped at 32 per record so applicability
/// bitfields fit in a `u32`; records exceeding this fail validation.
pub const MAX_HEADWORDS: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HeadwordMeta {
    #[serde(default)]
    pub p: Vec<String>,
    #[serde(default)]
    pub i: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReadingMeta {
    #[serde(default)]
    pub p: Vec<String>,
    #[serde(default)]
    pub i: Vec<String>,
    /// Bitfield over `k[]`: which kanji headwords this reading applies to.
    /// `0` means "applies to all".
    #[serde(default)]
    pub app: u32,
    #[serde(default)]
    pub pitch: Vec<u8>,
}

/// One translation/definition type, 1 byte per gloss. The design specifies a
/// packed 2-bit field but also explicitly allows a byte-array with the same
/// decoding contract; five distinct tags don't fit in 2 bits, so we take
/// that generalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlossType {
    None,
    Expl,
    Lit,
    Fig,
    Tm,
}

impl Default for GlossType {
    fn default() -> Self {
        GlossType::None
    }
}

/// A cross-reference to another word, optionally narrowed to a specific
/// reading/sense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sense: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSource {
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default)]
    pub wasei: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Sense {
    pub g: Vec<String>,
    #[serde(default)]
    pub gt: Vec<GlossType>,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// `0` means "applies to all kanji headwords".
    #[serde(default)]
    pub kapp: u32,
    /// `0` means "applies to all kana headwords".
    #[serde(default)]
    pub rapp: u32,
    #[serde(default)]
    pub pos: Vec<String>,
    #[serde(default)]
    pub field: Vec<String>,
    #[serde(default)]
    pub misc: Vec<String>,
    #[serde(default)]
    pub dial: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inf: Option<String>,
    #[serde(default)]
    pub xref: Vec<XRef>,
    #[serde(default)]
    pub ant: Vec<XRef>,
    #[serde(default)]
    pub lsrc: Vec<LanguageSource>,
}

fn default_lang() -> String {
    "en".to_string()
}

impl Sense {
    /// A sense with `kapp != 0` matches iff `kapp & kanji_matches != 0`; a
    /// sense with only `rapp` set matches iff `rapp & kana_matches != 0`;
    /// absence of both means "always matches".
    pub fn applies(&self, kanji_matches: u32, kana_matches: u32) -> bool {
        if self.kapp != 0 {
            return self.kapp & kanji_matches != 0;
        }
        if self.rapp != 0 {
            return self.rapp & kana_matches != 0;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub km: Option<Vec<Option<HeadwordMeta>>>,
    pub r: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rm: Option<Vec<Option<ReadingMeta>>>,
    pub s: Vec<Sense>,

    // Derived fields, recomputed at ingestion; never authoritative on the wire.
    #[serde(default)]
    pub h: Vec<String>,
    #[serde(default)]
    pub kc: Vec<char>,
    #[serde(default)]
    pub gt_en: Vec<String>,
    #[serde(default)]
    pub gt_l: Vec<String>,
}

impl Word {
    pub fn headword_count(&self) -> usize {
        self.k.as_ref().map(Vec::len).unwrap_or(0) + self.r.len()
    }

    /// `true` if this record would overflow a 32-bit applicability bitfield.
    pub fn exceeds_bitfield_capacity(&self) -> bool {
        self.k.as_ref().map(Vec::len).unwrap_or(0) > MAX_HEADWORDS || self.r.len() > MAX_HEADWORDS
    }

    pub fn kanji_headwords(&self) -> &[String] {
        self.k.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sense_without_applicability_matches_everything() {
        let s = Sense::default();
        assert!(s.applies(0, 0));
    }

    #[test]
    fn sense_with_kapp_requires_overlap() {
        let s = Sense {
            kapp: 0b0010,
            ..Default::default()
        };
        assert!(s.applies(0b0010, 0));
        assert!(!s.applies(0b0100, 0));
    }

    #[test]
    fn sense_with_rapp_only_checks_kana_matches() {
        let s = Sense {
            rapp: 0b0001,
            ..Default::default()
        };
        assert!(s.applies(0, 0b0001));
        assert!(!s.applies(0, 0b0010));
    }

    #[test]
    fn bitfield_capacity_enforced() {
        let mut w = Word {
            id: 1,
            k: None,
            km: None,
            r: vec!["a".into(); 33],
            rm: None,
            s: vec![],
            h: vec![],
            kc: vec![],
            gt_en: vec![],
            gt_l: vec![],
        };
        assert!(w.exceeds_bitfield_capacity());
        w.r.truncate(32);
        assert!(!w.exceeds_bitfield_capacity());
    }
}
