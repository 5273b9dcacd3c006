//! Small, dependency-light helpers for the Japanese-specific pieces the rest
//! of the workspace treats as pure functions: kana normalization, script
//! classification, a minimal tokenizer with stop words, and a parser for the
//! comma-separated kanji component-string format.

pub mod component;
pub mod kana;
pub mod tokenize;

pub use kana::{contains_hiragana, katakana_to_romaji, to_hiragana, JapaneseExt};
pub use tokenize::tokenize;
