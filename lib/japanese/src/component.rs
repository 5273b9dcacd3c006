//! Parser for the kanji component-string format (`Kanji::comp`): a
//! comma-separated list of single-character component glyphs, e.g.
//! `"弓,一"`. Out of scope per the design (treated as an external
//! collaborator) beyond this mechanical split.

/// Parses a component string into its constituent characters, in order,
/// skipping empty entries produced by stray commas/whitespace.
pub fn parse_components(comp: &str) -> Vec<char> {
    comp.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.chars().next())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_on_commas() {
        assert_eq!(parse_components("弓,一"), vec!['弓', '一']);
    }

    #[test]
    fn ignores_blank_entries() {
        assert_eq!(parse_components("弓,,一, "), vec!['弓', '一']);
    }

    #[test]
    fn empty_string_yields_no_components() {
        assert!(parse_components("").is_empty());
    }
}
