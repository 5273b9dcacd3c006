//! The *names* series record shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Translation {
    pub det: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<Vec<String>>,
    pub r: Vec<String>,
    pub tr: Vec<Translation>,

    #[serde(default)]
    pub h: Vec<String>,
}

impl Name {
    pub fn kanji_headwords(&self) -> &[String] {
        self.k.as_deref().unwrap_or(&[])
    }
}
