//! Custom serde helpers for exchange wire formats.

use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Accepts a JSON string or integer and yields its textual form.
///
/// Order ids arrive as either depending on the server build.
pub(crate) struct StringOrIntVisitor;

impl<'de> Visitor<'de> for StringOrIntVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }
}

/// Interprets a loosely-typed JSON flag the way the exchange's web client
/// does: only `null`, `false`, `0` and `""` are false.
///
/// Deposit notices carry `status` as a boolean, a number or a string
/// depending on the payment backend. Strings such as `"false"` count as
/// set.
pub fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Reads a decimal from a JSON number or numeric string.
///
/// Numbers go through their textual form so `0.1` stays exact.
pub fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Deserializes an optional id that may arrive as a string or an integer.
pub fn opt_string_or_int<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or integer id, got {}",
            other
        ))),
    }
}

/// Deserializes a value that may be either a single `T` or a list of `T`.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy() {
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("completed")));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!("false")));
        assert!(truthy(&json!("0")));
        assert!(truthy(&json!([])));
    }

    #[test]
    fn test_decimal_from_value() {
        assert_eq!(decimal_from_value(&json!(0.1)), Some(Decimal::new(1, 1)));
        assert_eq!(decimal_from_value(&json!("300000")), Some(Decimal::from(300000)));
        assert_eq!(decimal_from_value(&json!(999)), Some(Decimal::from(999)));
        assert_eq!(decimal_from_value(&json!("abc")), None);
        assert_eq!(decimal_from_value(&json!(null)), None);
    }

    #[test]
    fn test_one_or_many() {
        let one: OneOrMany<u32> = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(one.into_vec(), vec![3]);
        let many: OneOrMany<u32> = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(many.into_vec(), vec![1, 2]);
    }
}
