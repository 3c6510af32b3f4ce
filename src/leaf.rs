//! Builtin leaf diagnostics and the literal values they mention.
use std::fmt;

use ordered_float::OrderedFloat;
use serde::Serialize;
use serde_json::Value;

use crate::json::IntoJson;

/// A JSON scalar that a `literal` decoder accepts verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(String),
}

impl Literal {
    /// Returns the literal a JSON value denotes, if it is a scalar.
    pub fn from_value(value: &Value) -> Option<Literal> {
        match value {
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => n.as_f64().map(|f| Literal::Number(OrderedFloat(f))),
            Value::String(s) => Some(Literal::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => n.0.into_json(),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(OrderedFloat(n))
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Number(OrderedFloat(n as f64))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_unknown(&self.to_value()))
    }
}

/// Default stringifier for offending values embedded in leaf messages:
/// compact JSON, so strings come out quoted.
pub fn format_unknown(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

pub(crate) fn quote(s: &str) -> String {
    format_unknown(&Value::String(s.to_string()))
}

fn join_literals(literals: &[Literal]) -> String {
    literals.iter().map(Literal::to_string).collect::<Vec<_>>().join(", ")
}

fn join_quoted(literals: &[String]) -> String {
    literals.iter().map(|l| quote(l)).collect::<Vec<_>>().join(", ")
}

/// Leaf payloads minted by the builtin decoders.
///
/// The `Display` text is the default leaf rendering used by
/// [`crate::draw::draw`].
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "leaf", rename_all = "snake_case")]
pub enum LeafError {
    #[error("cannot decode {}, expected a string", format_unknown(actual))]
    String { actual: Value },
    #[error("cannot decode {}, expected a number", format_unknown(actual))]
    Number { actual: Value },
    #[error("cannot decode {}, expected a boolean", format_unknown(actual))]
    Boolean { actual: Value },
    #[error("cannot decode {}, expected an array", format_unknown(actual))]
    UnknownArray { actual: Value },
    #[error("cannot decode {}, expected an object", format_unknown(actual))]
    UnknownRecord { actual: Value },
    #[error("cannot decode {}, expected one of {}", format_unknown(actual), join_literals(literals))]
    Literal { actual: Value, literals: Vec<Literal> },
    #[error("{message}")]
    Message { message: String },
    #[error("value is NaN")]
    NaN,
    #[error("value is Infinity")]
    Infinity,
    #[error("1 error(s) found while decoding sum tag {}, expected one of {}", quote(tag), join_quoted(literals))]
    Tag { tag: String, literals: Vec<String> },
    #[error("no members")]
    NoMembers,
}

impl LeafError {
    pub fn message(message: impl Into<String>) -> Self {
        LeafError::Message { message: message.into() }
    }

    /// Renders like `Display`, with a caller-supplied stringifier for the
    /// offending value.
    pub fn render_with(&self, stringify: &dyn Fn(&Value) -> String) -> String {
        match self {
            LeafError::String { actual } => format!("cannot decode {}, expected a string", stringify(actual)),
            LeafError::Number { actual } => format!("cannot decode {}, expected a number", stringify(actual)),
            LeafError::Boolean { actual } => format!("cannot decode {}, expected a boolean", stringify(actual)),
            LeafError::UnknownArray { actual } => format!("cannot decode {}, expected an array", stringify(actual)),
            LeafError::UnknownRecord { actual } => format!("cannot decode {}, expected an object", stringify(actual)),
            LeafError::Literal { actual, literals } => {
                format!("cannot decode {}, expected one of {}", stringify(actual), join_literals(literals))
            }
            LeafError::Message { .. }
            | LeafError::NaN
            | LeafError::Infinity
            | LeafError::Tag { .. }
            | LeafError::NoMembers => self.to_string(),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_quotes_strings_only() {
        let e = LeafError::Number { actual: json!("1") };
        assert_eq!(e.to_string(), r#"cannot decode "1", expected a number"#);
        let e = LeafError::String { actual: json!(1) };
        assert_eq!(e.to_string(), "cannot decode 1, expected a string");
    }

    #[test]
    fn literal_and_tag_list_alternatives() {
        let e = LeafError::Literal {
            actual: json!("c"),
            literals: vec!["a".into(), Literal::from(2_i64), Literal::Null],
        };
        assert_eq!(e.to_string(), r#"cannot decode "c", expected one of "a", 2, null"#);
        let e = LeafError::Tag { tag: "type".into(), literals: vec!["A".into(), "B".into()] };
        assert_eq!(
            e.to_string(),
            r#"1 error(s) found while decoding sum tag "type", expected one of "A", "B""#
        );
    }

    #[test]
    fn injected_stringifier_replaces_value_text() {
        let e = LeafError::Boolean { actual: json!({"a": 1}) };
        let rendered = e.render_with(&|_| "<redacted>".to_string());
        assert_eq!(rendered, "cannot decode <redacted>, expected a boolean");
    }

    #[test]
    fn literal_from_value_is_scalar_only() {
        assert_eq!(Literal::from_value(&json!(1.5)), Some(Literal::from(1.5)));
        assert_eq!(Literal::from_value(&json!([1])), None);
        assert_eq!(Literal::from(3_i64).to_value(), json!(3));
    }
}
