//! Regex validators shared across the config document and hardware maps.
//!
//! Grounded on `config.py`'s `Validation` class.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern for human-facing names (device names, friendly names).
pub static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9 _-]*$").unwrap());

/// Pattern for identifiers used in topic paths (`object_id`, `discovery_prefix`).
pub static ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]*$").unwrap());

/// Signed-integer payload accepted on `/position/set` and `/tilt/set`.
pub static SIGNED_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rejects_punctuation() {
        assert!(!NAME.is_match("bad!name"));
        assert!(NAME.is_match("My Device-1"));
    }

    #[test]
    fn id_rejects_spaces() {
        assert!(!ID.is_match("bad id"));
        assert!(ID.is_match("bad_id-1"));
    }

    #[test]
    fn signed_int_matches_optional_sign() {
        assert!(SIGNED_INT.is_match("42"));
        assert!(SIGNED_INT.is_match("-42"));
        assert!(SIGNED_INT.is_match("+42"));
        assert!(!SIGNED_INT.is_match("4a"));
    }
}
