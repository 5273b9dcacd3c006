//! Key encoding helpers. Primary keys are big-endian so natural byte order
//! matches numeric order; index keys are `index_key ++ 0x00 ++ primary_key`
//! so a point lookup is a prefix scan and a "starts with" query is a
//! bounded range scan.

const SEPARATOR: u8 = 0x00;

pub fn u32_be(v: u32) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub fn index_key(field_value: &[u8], primary_key: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(field_value.len() + 1 + primary_key.len());
    key.extend_from_slice(field_value);
    key.push(SEPARATOR);
    key.extend_from_slice(primary_key);
    key
}

/// Upper (exclusive) bound for a "starts with `prefix`" range scan over an
/// index tree: the lexicographically smallest key strictly greater than
/// every key starting with `prefix`.
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(upper);
        }
        upper.pop();
    }
    None
}

/// Splits an index-tree key back into `(field_value, primary_key)`, given
/// the known width in bytes of the field-value portion (`None` for
/// variable-width field values, e.g. a headword string; in that case
/// split at the first `0x00` byte not present in the field value itself —
/// this store never indexes binary blobs, only UTF-8 strings and single
/// chars, so a bare `0x00` separator search is unambiguous).
pub fn split_index_key(key: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = key.iter().position(|b| *b == SEPARATOR)?;
    Some((&key[..pos], &key[pos + 1..]))
}
