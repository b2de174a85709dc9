//! Name normalisation shared by topic paths and unique ids.

use unicode_normalization::UnicodeNormalization;

/// ASCII-normalised lowercase form of a name, used in MQTT topic paths and
/// Home Assistant unique ids. Mirrors `helpers/text.py`'s `slugify`:
/// NFKD-normalise, drop combining marks and anything that isn't
/// alphanumeric/space/hyphen, collapse whitespace to `_`.
pub fn slugify(value: &str) -> String {
    let decomposed: String = value.nfkd().filter(|c| !is_combining_mark(*c)).collect();

    let cleaned: String = decomposed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_joins_words() {
        assert_eq!(slugify("My PLC Device"), "my_plc_device");
    }

    #[test]
    fn slugify_strips_diacritics() {
        assert_eq!(slugify("Café"), "cafe");
    }

    #[test]
    fn slugify_keeps_hyphens() {
        assert_eq!(slugify("unit-1 name"), "unit-1_name");
    }
}
