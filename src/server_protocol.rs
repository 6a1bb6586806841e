use serde_json::{Map, Value};

use crate::mover::KeyState;
use crate::types::{MoveMode, Preset};

#[derive(Debug)]
pub enum ParsedClientMessage {
    Hello {
        name: String,
    },
    Start {
        seed: Option<i64>,
        mode: Option<MoveMode>,
        preset: Option<Preset>,
    },
    Input {
        keys: KeyState,
    },
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = object.get("name")?.as_str()?.to_string();
            Some(ParsedClientMessage::Hello { name })
        }
        "start" => {
            let seed = parse_optional_i64(object.get("seed"))?;
            let mode = match object.get("mode") {
                None => None,
                Some(value) => Some(MoveMode::parse(value.as_str()?)?),
            };
            let preset = match object.get("preset") {
                None => None,
                Some(value) => Some(Preset::parse(value.as_str()?)?),
            };
            Some(ParsedClientMessage::Start { seed, mode, preset })
        }
        "input" => {
            let keys = KeyState {
                left: parse_key(object, "left")?,
                right: parse_key(object, "right")?,
                up: parse_key(object, "up")?,
                down: parse_key(object, "down")?,
            };
            Some(ParsedClientMessage::Input { keys })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

/// Missing keys count as released; non-boolean values reject the message.
fn parse_key(object: &Map<String, Value>, key: &str) -> Option<bool> {
    match object.get(key) {
        None => Some(false),
        Some(value) => value.as_bool(),
    }
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor();
            if floored.abs() > MAX_SAFE_INTEGER_F64 {
                return None;
            }
            return Some(Some(floored as i64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed = parse_client_message(r#"{"type":"hello","name":"A"}"#)
            .expect("hello message should parse");
        match parsed {
            ParsedClientMessage::Hello { name } => assert_eq!(name, "A"),
            _ => panic!("expected hello message"),
        }
    }

    #[test]
    fn parse_hello_requires_string_name() {
        assert!(parse_client_message(r#"{"type":"hello"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"hello","name":3}"#).is_none());
    }

    #[test]
    fn parse_start_message() {
        let parsed = parse_client_message(
            r#"{"type":"start","seed":1234,"mode":"grid_step","preset":"fast"}"#,
        )
        .expect("start message should parse");
        match parsed {
            ParsedClientMessage::Start { seed, mode, preset } => {
                assert_eq!(seed, Some(1234));
                assert_eq!(mode, Some(MoveMode::GridStep));
                assert_eq!(preset, Some(Preset::Fast));
            }
            _ => panic!("expected start message"),
        }
    }

    #[test]
    fn parse_start_fields_are_optional() {
        let parsed = parse_client_message(r#"{"type":"start"}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Start {
                seed: None,
                mode: None,
                preset: None
            })
        ));
    }

    #[test]
    fn parse_start_rejects_unknown_mode_or_preset() {
        assert!(parse_client_message(r#"{"type":"start","mode":"hover"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","preset":"turbo"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","mode":1}"#).is_none());
    }

    #[test]
    fn parse_start_floors_float_seed() {
        let parsed = parse_client_message(r#"{"type":"start","seed":7.9}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Start { seed: Some(7), .. })
        ));
    }

    #[test]
    fn parse_start_rejects_overflow_seed() {
        assert!(parse_client_message(r#"{"type":"start","seed":18446744073709551615}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","seed":1e100}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","seed":"12"}"#).is_none());
    }

    #[test]
    fn parse_input_defaults_missing_keys() {
        let parsed = parse_client_message(r#"{"type":"input","left":true,"up":false}"#);
        match parsed {
            Some(ParsedClientMessage::Input { keys }) => {
                assert_eq!(
                    keys,
                    KeyState {
                        left: true,
                        right: false,
                        up: false,
                        down: false
                    }
                );
            }
            _ => panic!("expected input message"),
        }
    }

    #[test]
    fn parse_input_rejects_non_boolean_keys() {
        assert!(parse_client_message(r#"{"type":"input","left":1}"#).is_none());
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"now"}"#).is_none());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(parse_client_message(r#"{"type":"boost"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }
}
