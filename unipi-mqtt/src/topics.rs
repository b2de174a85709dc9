//! Topic-suffix helpers shared by the subscribe router and the two
//! publishers. [`Feature::topic`]/[`Cover::topic`] already produce the
//! base path (`{dev}/relay/{fid}`, `{dev}/{object_id}/cover/{class}`);
//! this module only appends the fixed suffixes from the topic grammar.

use unipi_config::validation::SIGNED_INT;

pub fn get_topic(base: &str) -> String {
    format!("{base}/get")
}

pub fn set_topic(base: &str) -> String {
    format!("{base}/set")
}

pub fn state_topic(base: &str) -> String {
    format!("{base}/state")
}

pub fn position_topic(base: &str) -> String {
    format!("{base}/position")
}

pub fn position_set_topic(base: &str) -> String {
    format!("{base}/position/set")
}

pub fn tilt_topic(base: &str) -> String {
    format!("{base}/tilt")
}

pub fn tilt_set_topic(base: &str) -> String {
    format!("{base}/tilt/set")
}

/// Parses a `/position/set` or `/tilt/set` payload: an optional sign
/// followed by digits, same grammar the config document's validators use
/// for other integer-shaped fields.
pub fn parse_signed_int(payload: &str) -> Option<f64> {
    let trimmed = payload.trim();
    if !SIGNED_INT.is_match(trimmed) {
        return None;
    }
    trimmed.parse::<i64>().ok().map(|v| v as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_helpers_append_fixed_segments() {
        assert_eq!(get_topic("dev/relay/ro_2_01"), "dev/relay/ro_2_01/get");
        assert_eq!(set_topic("dev/relay/ro_2_01"), "dev/relay/ro_2_01/set");
        assert_eq!(state_topic("dev/blind1/cover/blind"), "dev/blind1/cover/blind/state");
        assert_eq!(position_topic("dev/blind1/cover/blind"), "dev/blind1/cover/blind/position");
        assert_eq!(position_set_topic("dev/blind1/cover/blind"), "dev/blind1/cover/blind/position/set");
        assert_eq!(tilt_set_topic("dev/blind1/cover/blind"), "dev/blind1/cover/blind/tilt/set");
    }

    #[test]
    fn parse_signed_int_accepts_optional_sign() {
        assert_eq!(parse_signed_int("42"), Some(42.0));
        assert_eq!(parse_signed_int("-5"), Some(-5.0));
        assert_eq!(parse_signed_int("+5"), Some(5.0));
    }

    #[test]
    fn parse_signed_int_rejects_non_numeric_payloads() {
        assert_eq!(parse_signed_int("open"), None);
        assert_eq!(parse_signed_int("4.5"), None);
        assert_eq!(parse_signed_int(""), None);
    }
}
