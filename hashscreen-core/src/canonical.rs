//! Deterministic JSON encoding shared by the MAC envelope and the vault.
//!
//! Both ends of the protocol MAC and encrypt the same byte sequence, so the
//! encoding must be bit-exact on both sides: object keys sorted
//! lexicographically at every nesting level, no insignificant whitespace,
//! UTF-8, shortest round-trip decimal numbers.

use serde::Serialize;
use serde_json::Value;

/// Renders a value as canonical JSON.
pub fn to_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&value, &mut out);
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        // serde_json renders integers with itoa and floats with ryu, which
        // is the shortest round-trip decimal form.
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push_str(&serde_json::to_string(s).expect("strings always serialize"));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("strings always serialize"));
                out.push(':');
                write_value(&map[key], out);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sorts_keys_at_every_level() {
        let value = json!({
            "zeta": {"b": 2, "a": 1},
            "alpha": [1, {"y": true, "x": false}],
        });
        assert_eq!(
            to_string(&value).unwrap(),
            r#"{"alpha":[1,{"x":false,"y":true}],"zeta":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn no_insignificant_whitespace() {
        let value = json!({"a": [1, 2, 3], "b": "text with spaces"});
        assert_eq!(
            to_string(&value).unwrap(),
            r#"{"a":[1,2,3],"b":"text with spaces"}"#
        );
    }

    #[test]
    fn escapes_strings() {
        let value = json!({"key": "line\nbreak \"quoted\""});
        assert_eq!(
            to_string(&value).unwrap(),
            r#"{"key":"line\nbreak \"quoted\""}"#
        );
    }

    #[test]
    fn numbers_are_shortest_roundtrip() {
        assert_eq!(to_string(&json!(10)).unwrap(), "10");
        assert_eq!(to_string(&json!(0.5)).unwrap(), "0.5");
        assert_eq!(to_string(&json!(1e21)).unwrap(), "1e21");
    }

    #[test]
    fn identical_for_reordered_input() {
        let a = serde_json::from_str::<Value>(r#"{"x":1,"y":2}"#).unwrap();
        let b = serde_json::from_str::<Value>(r#"{"y":2,"x":1}"#).unwrap();
        assert_eq!(to_string(&a).unwrap(), to_string(&b).unwrap());
    }
}
