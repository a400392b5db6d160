//! The attribute value model.
//!
//! [`AttributeValue`] is a closed tagged union over every value kind the
//! source keyed store can emit. The serde representation matches the store's
//! wire encoding — single-tag objects like `{"S": "hello"}` or
//! `{"N": "42"}` — so change-event payloads deserialize directly into it.
//!
//! Numbers are transported as decimal strings to avoid precision loss and
//! are only parsed to a numeric type at schema-inference time. The wire may
//! carry either a JSON number or a string for `N`/`NS`; both are accepted and
//! normalized to the decimal string form.

use indexmap::IndexMap;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A single semi-structured attribute value.
///
/// Invariant: exactly one variant is populated, enforced by the enum
/// representation itself. Map keys are unique and keep insertion order —
/// field order in inferred schemas follows the order values were seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// Base64-encoded binary payload, carried as its wire string.
    #[serde(rename = "B")]
    Binary(String),

    /// Set of base64-encoded binary payloads.
    #[serde(rename = "BS")]
    BinarySet(Vec<String>),

    #[serde(rename = "BOOL")]
    Boolean(bool),

    #[serde(rename = "L")]
    List(Vec<AttributeValue>),

    #[serde(rename = "M")]
    Map(IndexMap<String, AttributeValue>),

    /// Decimal string; parsed to integer/float at inference time.
    #[serde(rename = "N")]
    Number(#[serde(deserialize_with = "de_decimal_string")] String),

    #[serde(rename = "NS")]
    NumberSet(#[serde(deserialize_with = "de_decimal_strings")] Vec<String>),

    #[serde(rename = "NULL")]
    Null(#[serde(deserialize_with = "de_null_marker")] bool),

    #[serde(rename = "S")]
    String(String),

    #[serde(rename = "SS")]
    StringSet(Vec<String>),
}

impl AttributeValue {
    /// Construct the null value.
    pub fn null() -> Self {
        AttributeValue::Null(true)
    }

    /// Wire tag name, for diagnostics and error payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Binary(_) => "B",
            AttributeValue::BinarySet(_) => "BS",
            AttributeValue::Boolean(_) => "BOOL",
            AttributeValue::List(_) => "L",
            AttributeValue::Map(_) => "M",
            AttributeValue::Number(_) => "N",
            AttributeValue::NumberSet(_) => "NS",
            AttributeValue::Null(_) => "NULL",
            AttributeValue::String(_) => "S",
            AttributeValue::StringSet(_) => "SS",
        }
    }

    /// String payload, if this is the string variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Unmarshal into native JSON.
    ///
    /// Numbers are parsed integer-first, then float; a decimal string that
    /// parses as neither is kept verbatim so no data is dropped. Sets become
    /// arrays. Maps keep insertion order.
    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Binary(b) => Value::String(b.clone()),
            AttributeValue::BinarySet(bs) => {
                Value::Array(bs.iter().cloned().map(Value::String).collect())
            }
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::List(items) => {
                Value::Array(items.iter().map(|v| v.to_json()).collect())
            }
            AttributeValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            AttributeValue::Number(n) => decimal_to_json(n),
            AttributeValue::NumberSet(ns) => {
                Value::Array(ns.iter().map(|n| decimal_to_json(n)).collect())
            }
            AttributeValue::Null(_) => Value::Null,
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::StringSet(ss) => {
                Value::Array(ss.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Marshal native JSON into the tagged model.
    ///
    /// This is the inference path for values that arrive as plain JSON
    /// rather than wire-tagged attributes. Arrays become lists (never sets —
    /// native JSON has no set notion), numbers keep their decimal rendering.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => AttributeValue::null(),
            Value::Bool(b) => AttributeValue::Boolean(*b),
            Value::Number(n) => AttributeValue::Number(n.to_string()),
            Value::String(s) => AttributeValue::String(s.clone()),
            Value::Array(items) => AttributeValue::List(
                items.iter().map(AttributeValue::from_json).collect(),
            ),
            Value::Object(entries) => AttributeValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn decimal_to_json(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = n.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(f) {
            return Value::Number(num);
        }
    }
    Value::String(n.to_string())
}

/// Accept a JSON number or string and normalize to the decimal string form.
fn de_decimal_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    struct DecimalVisitor;

    impl<'de> Visitor<'de> for DecimalVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or a decimal string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(DecimalVisitor)
}

fn de_decimal_strings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    struct SeqVisitor;

    impl<'de> Visitor<'de> for SeqVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a sequence of numbers or decimal strings")
        }

        fn visit_seq<A: SeqAccess<'de>>(
            self,
            mut seq: A,
        ) -> Result<Vec<String>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(item) = seq.next_element::<DecimalString>()? {
                out.push(item.0);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_seq(SeqVisitor)
}

/// Newtype so set elements reuse the number-or-string acceptance rule.
struct DecimalString(String);

impl<'de> Deserialize<'de> for DecimalString {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        de_decimal_string(deserializer).map(DecimalString)
    }
}

/// The wire writes `{"NULL": true}`; some producers send other truthy
/// payloads. Whatever arrives, the value is null.
fn de_null_marker<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<bool, D::Error> {
    serde::de::IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn deserializes_wire_tagged_values() {
        let v: AttributeValue =
            serde_json::from_value(json!({"S": "hello"})).unwrap();
        assert_eq!(v, AttributeValue::String("hello".into()));

        let v: AttributeValue =
            serde_json::from_value(json!({"BOOL": true})).unwrap();
        assert_eq!(v, AttributeValue::Boolean(true));

        let v: AttributeValue =
            serde_json::from_value(json!({"NULL": true})).unwrap();
        assert_eq!(v, AttributeValue::null());
    }

    #[test]
    fn number_accepts_string_or_json_number() {
        let from_str: AttributeValue =
            serde_json::from_value(json!({"N": "42"})).unwrap();
        let from_num: AttributeValue =
            serde_json::from_value(json!({"N": 42})).unwrap();
        assert_eq!(from_str, AttributeValue::Number("42".into()));
        assert_eq!(from_num, AttributeValue::Number("42".into()));

        let from_float: AttributeValue =
            serde_json::from_value(json!({"N": 1.5})).unwrap();
        assert_eq!(from_float, AttributeValue::Number("1.5".into()));
    }

    #[test]
    fn number_set_accepts_mixed_representations() {
        let v: AttributeValue =
            serde_json::from_value(json!({"NS": ["1", 2, 3.5]})).unwrap();
        assert_eq!(
            v,
            AttributeValue::NumberSet(vec![
                "1".into(),
                "2".into(),
                "3.5".into()
            ])
        );
    }

    #[test]
    fn nested_map_preserves_insertion_order() {
        let v: AttributeValue = serde_json::from_str(
            r#"{"M": {"zeta": {"S": "z"}, "alpha": {"N": "1"}}}"#,
        )
        .unwrap();

        let AttributeValue::Map(entries) = &v else {
            panic!("expected map");
        };
        let keys: Vec<&str> = entries.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn to_json_unmarshals_numbers_and_sets() {
        let v: AttributeValue = serde_json::from_value(json!({
            "M": {
                "count": {"N": "7"},
                "score": {"N": "7.5"},
                "tags": {"SS": ["a", "b"]},
            }
        }))
        .unwrap();

        assert_eq!(
            v.to_json(),
            json!({"count": 7, "score": 7.5, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn to_json_keeps_unparseable_decimal_verbatim() {
        let v = AttributeValue::Number("not-a-number".into());
        assert_eq!(v.to_json(), json!("not-a-number"));
    }

    #[test]
    fn from_json_roundtrips_shape() {
        let native = json!({"id": 1, "name": "a", "nested": {"ok": true}, "xs": [1, 2]});
        let tagged = AttributeValue::from_json(&native);
        assert_eq!(tagged.to_json(), native);
    }

    #[test]
    fn serializes_back_to_wire_form() {
        let v = AttributeValue::Number("42".into());
        assert_eq!(serde_json::to_value(&v).unwrap(), json!({"N": "42"}));

        let v = AttributeValue::List(vec![AttributeValue::String("x".into())]);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({"L": [{"S": "x"}]})
        );
    }

    #[test]
    fn kind_names_match_wire_tags() {
        assert_eq!(AttributeValue::null().kind(), "NULL");
        assert_eq!(AttributeValue::Map(IndexMap::new()).kind(), "M");
        assert_eq!(AttributeValue::Number("1".into()).kind(), "N");
    }
}
