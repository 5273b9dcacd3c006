//! `getKanji`: resolves each requested character to its stored record, own
//! radical, component triage (radical/kanji/katakana), and related kanji.

use japanese::component::parse_components;
use japanese::kana::katakana_to_romaji;
use store::key::u32_be;
use store::Store;
use types::kanji::Kanji;
use types::radical::Radical;
use types::result::{Component, KanjiResult};

const KATAKANA_BLOCK: std::ops::RangeInclusive<char> = '\u{30A1}'..='\u{30FA}';

fn radical_key(x: u16, variant: Option<&str>) -> Vec<u8> {
    match variant {
        Some(v) => format!("{:03}-{}", x, v).into_bytes(),
        None => format!("{:03}", x).into_bytes(),
    }
}

/// Resolves a kanji's own radical via the three-digit (or `base-variant`)
/// id built from `rad.x` and `rad_variant`, falling back to the base entry
/// if the variant-specific one isn't stored.
fn own_radical(store: &Store, kanji: &Kanji) -> Result<Option<Radical>, error::SyncError> {
    let Some(rad) = &kanji.rad else { return Ok(None) };
    if let Some(variant) = &kanji.rad_variant {
        if let Some(r) = store.get::<Radical>(&radical_key(rad.x, Some(variant)))? {
            return Ok(Some(r));
        }
    }
    store.get::<Radical>(&radical_key(rad.x, None))
}

/// Finds every stored radical whose base or kanji glyph equals `glyph`.
fn radicals_for_glyph(store: &Store, glyph: char) -> Result<Vec<Radical>, error::SyncError> {
    let glyph_bytes = glyph.to_string().into_bytes();
    let mut out = store.lookup_index::<Radical>("b", &glyph_bytes)?;
    out.extend(store.lookup_index::<Radical>("k", &glyph_bytes)?);
    Ok(out)
}

/// Picks the radical entry to represent a component glyph: a non-variant
/// entry, or failing that the variant whose id matches the kanji's own
/// variant marker, or failing that whatever matched first.
fn pick_radical(mut candidates: Vec<Radical>, kanji: &Kanji) -> Option<Radical> {
    if let Some(pos) = candidates.iter().position(|r| !r.is_variant()) {
        return Some(candidates.swap_remove(pos));
    }
    if let (Some(rad), Some(variant)) = (&kanji.rad, &kanji.rad_variant) {
        let own_variant_id = format!("{:03}-{}", rad.x, variant);
        if let Some(pos) = candidates.iter().position(|r| r.id == own_variant_id) {
            return Some(candidates.swap_remove(pos));
        }
    }
    candidates.into_iter().next()
}

fn resolve_component(
    store: &Store,
    kanji: &Kanji,
    own_radical: Option<&Radical>,
    c: char,
    lang: &str,
    mut log_warning: impl FnMut(String),
) -> Result<Option<Component>, error::SyncError> {
    let radical_candidates = radicals_for_glyph(store, c)?;
    if !radical_candidates.is_empty() {
        let Some(radical) = pick_radical(radical_candidates, kanji) else {
            return Ok(None);
        };
        let is_rad = own_radical.map(|own| own.base_id() == radical.base_id()).unwrap_or(false);
        let base = radical.is_variant().then_some(radical.b);
        return Ok(Some(Component::Radical { radical, is_rad, base }));
    }

    if let Some(component_kanji) = store.get::<Kanji>(&u32_be(c as u32))? {
        let reading = component_kanji
            .onyomi
            .iter()
            .chain(component_kanji.kunyomi.iter())
            .cloned()
            .collect();
        return Ok(Some(Component::Kanji {
            c,
            reading,
            meaning: component_kanji.m.clone(),
        }));
    }

    if KATAKANA_BLOCK.contains(&c) {
        return Ok(Some(if lang == "ja" {
            Component::Katakana { c, romaji: None, label: Some(format!("片仮名の{c}")) }
        } else {
            Component::Katakana { c, romaji: katakana_to_romaji(c).map(str::to_string), label: None }
        }));
    }

    log_warning(format!("unresolved kanji component {c:?} in {:?}", kanji.literal()));
    Ok(None)
}

/// `getKanji({kanji, lang, logWarningMessage?})`.
pub fn get_kanji(
    store: &Store,
    chars: &[char],
    lang: &str,
    mut log_warning: impl FnMut(String),
) -> Result<Vec<KanjiResult>, error::SyncError> {
    let mut out = Vec::with_capacity(chars.len());
    for &c in chars {
        let Some(kanji) = store.get::<Kanji>(&u32_be(c as u32))? else {
            log_warning(format!("no stored kanji for {c:?}"));
            continue;
        };

        let radical = own_radical(store, &kanji)?;

        let mut components = Vec::new();
        for comp_char in parse_components(&kanji.comp) {
            if let Some(component) = resolve_component(store, &kanji, radical.as_ref(), comp_char, lang, &mut log_warning)? {
                components.push(component);
            }
        }

        let mut related = Vec::with_capacity(kanji.cf.len());
        for &cp in &kanji.cf {
            if let Some(k) = store.get::<Kanji>(&u32_be(cp))? {
                related.push(k);
            }
        }

        out.push(KanjiResult { kanji, radical, components, related });
    }
    Ok(out)
}
