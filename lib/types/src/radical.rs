//! The *radicals* series record shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadicalPosition {
    Hen,
    Tsukuri,
    Kanmuri,
    Ashi,
    Tare,
    Nyou,
    Kamae,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Radical {
    /// Three-digit base id, or `base-variant` for a variant entry (e.g. `"061-2"`).
    pub id: String,
    pub r: u16,
    pub b: char,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<char>,
    pub stroke_count: u8,
    pub na: Vec<String>,
    pub m: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<RadicalPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pua: Option<u32>,
}

impl Radical {
    /// The three-digit base id shared by a radical and its variants.
    pub fn base_id(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    pub fn is_variant(&self) -> bool {
        self.id.contains('-')
    }

    /// `true` if `glyph` is either this radical's base glyph or its kanji form.
    pub fn matches_glyph(&self, glyph: char) -> bool {
        self.b == glyph || self.k == Some(glyph)
    }
}
