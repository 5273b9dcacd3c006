//! The *kanji* series record shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadicalRef {
    /// The radical's number (matches `Radical::r`).
    pub x: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nelson: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KanjiMisc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sc: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gr: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jlpt: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kk: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wk: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kanji {
    /// The kanji's codepoint; this is the record's primary key.
    pub c: u32,
    #[serde(default)]
    pub onyomi: Vec<String>,
    #[serde(default)]
    pub kunyomi: Vec<String>,
    pub m: Vec<String>,
    #[serde(default = "default_m_lang")]
    pub m_lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rad: Option<RadicalRef>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub misc: KanjiMisc,
    /// Comma-separated component-string; parse with `japanese::component`.
    #[serde(default)]
    pub comp: String,
    /// Related kanji, by codepoint.
    #[serde(default)]
    pub cf: Vec<u32>,
    /// Explicit variant marker into `rad`'s radical id, when the kanji's own
    /// radical is a variant entry (e.g. `"2"` for `"061-2"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rad_variant: Option<String>,
}

fn default_m_lang() -> String {
    "en".to_string()
}

impl Kanji {
    pub fn literal(&self) -> Option<char> {
        char::from_u32(self.c)
    }
}
