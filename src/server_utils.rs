use crate::types::{MoveMode, Preset};

const MIN_SPAWN_INTERVAL_MS: u64 = 500;
const MAX_SPAWN_INTERVAL_MS: u64 = 60_000;

pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Driver".to_string();
    }
    trimmed.chars().filter(|c| !c.is_control()).take(16).collect()
}

pub fn parse_ranking_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.parse::<usize>().ok())
}

/// Seeds arrive as JSON numbers; anything outside `u32` wraps instead of failing.
pub fn normalize_seed(value: Option<i64>) -> Option<u32> {
    value.map(|seed| seed as u32)
}

pub fn normalize_mode(raw: Option<&str>) -> MoveMode {
    raw.and_then(|value| MoveMode::parse(value.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(MoveMode::Physics)
}

pub fn normalize_preset(raw: Option<&str>) -> Preset {
    raw.and_then(|value| Preset::parse(value.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(Preset::Classic)
}

/// `SPAWN_INTERVAL_MS` override; unparsable values are ignored.
pub fn parse_spawn_interval_ms(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .map(|ms| ms.clamp(MIN_SPAWN_INTERVAL_MS, MAX_SPAWN_INTERVAL_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_limit_parsing_is_lenient_for_invalid_values() {
        assert_eq!(parse_ranking_limit(Some("8")), Some(8));
        assert_eq!(parse_ranking_limit(Some("0")), Some(0));
        assert_eq!(parse_ranking_limit(Some("abc")), None);
        assert_eq!(parse_ranking_limit(Some("-1")), None);
        assert_eq!(parse_ranking_limit(None), None);
    }

    #[test]
    fn sanitize_name_applies_trim_empty_and_max_len() {
        assert_eq!(sanitize_name(""), "Driver");
        assert_eq!(sanitize_name("   "), "Driver");
        assert_eq!(sanitize_name(" Alice "), "Alice");
        assert_eq!(sanitize_name("12345678901234567890"), "1234567890123456");
        assert_eq!(sanitize_name("a\u{7}b"), "ab");
    }

    #[test]
    fn seeds_wrap_into_u32() {
        assert_eq!(normalize_seed(None), None);
        assert_eq!(normalize_seed(Some(42)), Some(42));
        assert_eq!(normalize_seed(Some(-1)), Some(u32::MAX));
        assert_eq!(normalize_seed(Some(1 << 32)), Some(0));
    }

    #[test]
    fn mode_and_preset_fall_back_to_defaults() {
        assert_eq!(normalize_mode(Some(" GRID ")), MoveMode::GridStep);
        assert_eq!(normalize_mode(Some("hover")), MoveMode::Physics);
        assert_eq!(normalize_mode(None), MoveMode::Physics);
        assert_eq!(normalize_preset(Some("Fast")), Preset::Fast);
        assert_eq!(normalize_preset(Some("turbo")), Preset::Classic);
    }

    #[test]
    fn spawn_interval_override_is_clamped() {
        assert_eq!(parse_spawn_interval_ms(None), None);
        assert_eq!(parse_spawn_interval_ms(Some("x")), None);
        assert_eq!(parse_spawn_interval_ms(Some("10")), Some(500));
        assert_eq!(parse_spawn_interval_ms(Some(" 3000 ")), Some(3_000));
        assert_eq!(parse_spawn_interval_ms(Some("999999")), Some(60_000));
    }
}
