//! The Query Engine: `getWords`, `getWordsByCrossReference`,
//! `getWordsWithKanji`, `getWordsWithGloss`, `getNames`, and `getKanji`
//! against a populated [`store::Store`], plus the ranking and result-shaping
//! passes each of those runs through before returning.

pub mod kanji;
pub mod matching;
pub mod name;
pub mod rank;
pub mod shape;
pub mod word;

pub use matching::MatchType;
pub use word::{get_words, get_words_by_cross_reference, get_words_with_gloss, get_words_with_kanji};
pub use name::get_names;
pub use kanji::get_kanji;
