//! Bidirectional string <-> `Value` converters bound to input components.
//! Conversion failures carry a localizable message key and are reported
//! per-field; they never abort the surrounding submission.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::value::{Value, ValueKind};

/// One entry of an enumerated option set presented by a menu or radio
/// group. The key is what travels through the form; the value is what the
/// slot receives when that key is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuOption {
    pub key: String,
    pub label: String,
    pub value: Value,
}

/// A converter fixed to an input component at render time.
///
/// `Options` is bound to the option set that was enumerated when the
/// component was rendered; submitted keys resolve against exactly that set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Converter {
    Text,
    Int,
    Decimal,
    Bool,
    Key,
    Options(Vec<MenuOption>),
}

impl Converter {
    /// Look up a converter by its configured name.
    pub fn by_name(name: &str) -> Option<Converter> {
        match name {
            "text" => Some(Converter::Text),
            "int" => Some(Converter::Int),
            "decimal" => Some(Converter::Decimal),
            "bool" => Some(Converter::Bool),
            "key" => Some(Converter::Key),
            _ => None,
        }
    }

    /// The default converter for a slot kind.
    pub fn default_for(kind: ValueKind) -> Converter {
        match kind {
            ValueKind::Bool => Converter::Bool,
            ValueKind::Int => Converter::Int,
            ValueKind::Decimal => Converter::Decimal,
            ValueKind::Key => Converter::Key,
            ValueKind::Text | ValueKind::List => Converter::Text,
        }
    }

    /// Parse a submitted raw string into a typed value. An empty string
    /// means "no value" and converts to `Value::Null` for every converter.
    pub fn convert(&self, field: &str, raw: &str) -> RenderResult<Value> {
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        match self {
            Converter::Text => Ok(Value::Text(raw.to_string())),
            Converter::Key => Ok(Value::Key(raw.to_string())),
            Converter::Int => raw.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                conversion_error(field, "renderers.converter.int.invalid")
            }),
            Converter::Decimal => raw.trim().parse::<f64>().map(Value::Decimal).map_err(|_| {
                conversion_error(field, "renderers.converter.decimal.invalid")
            }),
            Converter::Bool => match raw.trim() {
                "true" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(conversion_error(field, "renderers.converter.bool.invalid")),
            },
            Converter::Options(options) => options
                .iter()
                .find(|option| option.key == raw)
                .map(|option| option.value.clone())
                .ok_or_else(|| conversion_error(field, "renderers.menu.invalid.option")),
        }
    }

    /// Render a typed value back into the string form presented to the
    /// client. Inverse of `convert` for every value the converter accepts.
    pub fn serialize(&self, value: &Value) -> String {
        match (self, value) {
            (_, Value::Null) => String::new(),
            (Converter::Options(options), value) => options
                .iter()
                .find(|option| &option.value == value)
                .map(|option| option.key.clone())
                .unwrap_or_default(),
            (_, Value::Text(s)) => s.clone(),
            (_, Value::Key(s)) => s.clone(),
            (_, Value::Int(i)) => i.to_string(),
            (_, Value::Decimal(d)) => d.to_string(),
            (_, Value::Bool(b)) => b.to_string(),
            (_, Value::List(items)) => items
                .iter()
                .map(|item| self.serialize(item))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn conversion_error(field: &str, key: &str) -> RenderError {
    RenderError::Conversion {
        field: field.to_string(),
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_string_converts_to_null() {
        for converter in [Converter::Text, Converter::Int, Converter::Bool] {
            assert_eq!(converter.convert("f", "").unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_int_round_trip() {
        let converter = Converter::Int;
        let value = converter.convert("age", "42").unwrap();
        assert_eq!(value, Value::Int(42));
        assert_eq!(converter.serialize(&value), "42");
    }

    #[test]
    fn test_bool_accepts_checkbox_forms() {
        let converter = Converter::Bool;
        assert_eq!(converter.convert("f", "on").unwrap(), Value::Bool(true));
        assert_eq!(converter.convert("f", "true").unwrap(), Value::Bool(true));
        assert_eq!(converter.convert("f", "false").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_invalid_int_carries_message_key() {
        let err = Converter::Int.convert("age", "forty").unwrap_err();
        assert_eq!(err.message_key(), Some("renderers.converter.int.invalid"));
    }

    #[test]
    fn test_option_converter_resolves_bound_set() {
        let converter = Converter::Options(vec![
            MenuOption {
                key: "1".into(),
                label: "Red".into(),
                value: Value::Key("red".into()),
            },
            MenuOption {
                key: "2".into(),
                label: "Blue".into(),
                value: Value::Key("blue".into()),
            },
        ]);

        assert_eq!(converter.convert("color", "2").unwrap(), Value::Key("blue".into()));
        assert_eq!(converter.serialize(&Value::Key("red".into())), "1");

        let err = converter.convert("color", "9").unwrap_err();
        assert_eq!(err.message_key(), Some("renderers.menu.invalid.option"));
    }

    #[test]
    fn test_serialize_round_trip_is_idempotent() {
        let converter = Converter::Decimal;
        let value = converter.convert("price", "19.5").unwrap();
        let raw = converter.serialize(&value);
        assert_eq!(converter.convert("price", &raw).unwrap(), value);
    }
}
