//! Script classification and kana normalization.
//!
//! `to_hiragana` is the pure function the design treats as an external
//! collaborator: katakana maps mechanically onto hiragana by a fixed
//! codepoint offset, everything else passes through unchanged.

const HIRAGANA_START: u32 = 0x3041;
const HIRAGANA_END: u32 = 0x3096;
const KATAKANA_START: u32 = 0x30A1;
const KATAKANA_END: u32 = 0x30FA;
const KATAKANA_HIRAGANA_OFFSET: u32 = KATAKANA_START - HIRAGANA_START;

const CJK_START: u32 = 0x4E00;
const CJK_END: u32 = 0x9FFF;
const CJK_EXT_A_START: u32 = 0x3400;
const CJK_EXT_A_END: u32 = 0x4DBF;

/// Converts katakana codepoints in `s` to their hiragana equivalent,
/// leaving every other character untouched. Delegates to `wana_kana` when it
/// agrees with the mechanical codepoint shift; falls back to the shift
/// itself for the handful of katakana punctuation marks the crate leaves
/// alone (e.g. the iteration mark `ヽ`/`ヾ`), so behaviour is defined for
/// every codepoint in the katakana block regardless of crate version.
pub fn to_hiragana(s: &str) -> String {
    let converted = wana_kana::to_hiragana(s);
    if converted.chars().count() == s.chars().count() {
        return converted;
    }
    shift_katakana(s)
}

fn shift_katakana(s: &str) -> String {
    s.chars()
        .map(|c| {
            let cp = c as u32;
            if (KATAKANA_START..=KATAKANA_END).contains(&cp) {
                char::from_u32(cp - KATAKANA_HIRAGANA_OFFSET).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Returns `true` if `s` contains at least one hiragana codepoint.
pub fn contains_hiragana(s: &str) -> bool {
    s.chars().any(|c| c.is_hiragana())
}

/// Extension methods mirroring the teacher's `JapaneseExt` trait: script
/// classification at the char and str level.
pub trait JapaneseExt {
    fn is_kanji(&self) -> bool;
    fn is_hiragana(&self) -> bool;
    fn is_katakana(&self) -> bool;
    fn is_kana(&self) -> bool {
        self.is_hiragana() || self.is_katakana()
    }
    fn is_japanese(&self) -> bool;
}

impl JapaneseExt for char {
    fn is_kanji(&self) -> bool {
        let cp = *self as u32;
        (CJK_START..=CJK_END).contains(&cp) || (CJK_EXT_A_START..=CJK_EXT_A_END).contains(&cp)
    }

    fn is_hiragana(&self) -> bool {
        let cp = *self as u32;
        (HIRAGANA_START..=HIRAGANA_END).contains(&cp)
    }

    fn is_katakana(&self) -> bool {
        let cp = *self as u32;
        (KATAKANA_START..=KATAKANA_END).contains(&cp)
    }

    fn is_japanese(&self) -> bool {
        self.is_kanji() || self.is_kana() || matches!(*self, '々' | '〆' | '〤' | 'ー')
    }
}

impl JapaneseExt for str {
    fn is_kanji(&self) -> bool {
        !self.is_empty() && self.chars().all(|c| c.is_kanji())
    }

    fn is_hiragana(&self) -> bool {
        !self.is_empty() && self.chars().all(|c| c.is_hiragana())
    }

    fn is_katakana(&self) -> bool {
        !self.is_empty() && self.chars().all(|c| c.is_katakana())
    }

    fn is_japanese(&self) -> bool {
        !self.is_empty() && self.chars().all(|c| c.is_japanese())
    }
}

/// Romanizes a single katakana character, used by the result shaper to
/// synthesize a pseudo-component label for bare katakana glyphs appearing
/// inside a kanji's component string.
pub fn katakana_to_romaji(c: char) -> Option<&'static str> {
    Some(match c {
        'ア' => "a",
        'イ' => "i",
        'ウ' => "u",
        'エ' => "e",
        'オ' => "o",
        'カ' => "ka",
        'キ' => "ki",
        'ク' => "ku",
        'ケ' => "ke",
        'コ' => "ko",
        'サ' => "sa",
        'シ' => "shi",
        'ス' => "su",
        'セ' => "se",
        'ソ' => "so",
        'タ' => "ta",
        'チ' => "chi",
        'ツ' => "tsu",
        'テ' => "te",
        'ト' => "to",
        'ナ' => "na",
        'ニ' => "ni",
        'ヌ' => "nu",
        'ネ' => "ne",
        'ノ' => "no",
        'ハ' => "ha",
        'ヒ' => "hi",
        'フ' => "fu",
        'ヘ' => "he",
        'ホ' => "ho",
        'マ' => "ma",
        'ミ' => "mi",
        'ム' => "mu",
        'メ' => "me",
        'モ' => "mo",
        'ヤ' => "ya",
        'ユ' => "yu",
        'ヨ' => "yo",
        'ラ' => "ra",
        'リ' => "ri",
        'ル' => "ru",
        'レ' => "re",
        'ロ' => "ro",
        'ワ' => "wa",
        'ヲ' => "wo",
        'ン' => "n",
        _ => return None,
    })
}
