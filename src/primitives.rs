//! Leaf checks against the universal JSON input.
use serde_json::{Map, Value};

use crate::decoder::Decoder;
use crate::error::DecodeError;
use crate::leaf::{LeafError, Literal};
use crate::outcome::{failure, success, warning, Outcome};

#[derive(Debug, Clone, Copy)]
pub struct StringD;

pub fn string() -> StringD {
    StringD
}

impl Decoder for StringD {
    type Input = Value;
    type Error = DecodeError;
    type Output = String;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, String> {
        match input {
            Value::String(s) => success(s.clone()),
            _ => failure(DecodeError::leaf(LeafError::String { actual: input.clone() })),
        }
    }
}

/// Numbers are accepted as `f64`; NaN and infinities are kept but flagged.
///
/// The `f64` is all that survives: integers past 2^53 lose precision, and
/// `.json()` writes whole floats back as integers (`1.0` becomes `1`).
#[derive(Debug, Clone, Copy)]
pub struct NumberD;

pub fn number() -> NumberD {
    NumberD
}

impl Decoder for NumberD {
    type Input = Value;
    type Error = DecodeError;
    type Output = f64;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, f64> {
        match input.as_f64() {
            Some(n) => classify_f64(n),
            None => failure(DecodeError::leaf(LeafError::Number { actual: input.clone() })),
        }
    }
}

/// The range policy of [`number`] over an already-numeric input.
#[derive(Debug, Clone, Copy)]
pub struct FloatD;

pub fn float() -> FloatD {
    FloatD
}

impl Decoder for FloatD {
    type Input = f64;
    type Error = DecodeError;
    type Output = f64;

    fn decode(&self, input: &f64) -> Outcome<DecodeError, f64> {
        classify_f64(*input)
    }
}

fn classify_f64(n: f64) -> Outcome<DecodeError, f64> {
    if n.is_nan() {
        warning(DecodeError::leaf(LeafError::NaN), n)
    } else if n.is_finite() {
        success(n)
    } else {
        warning(DecodeError::leaf(LeafError::Infinity), n)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanD;

pub fn boolean() -> BooleanD {
    BooleanD
}

impl Decoder for BooleanD {
    type Input = Value;
    type Error = DecodeError;
    type Output = bool;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, bool> {
        match input {
            Value::Bool(b) => success(*b),
            _ => failure(DecodeError::leaf(LeafError::Boolean { actual: input.clone() })),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UnknownArrayD;

pub fn unknown_array() -> UnknownArrayD {
    UnknownArrayD
}

impl Decoder for UnknownArrayD {
    type Input = Value;
    type Error = DecodeError;
    type Output = Vec<Value>;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, Vec<Value>> {
        match input {
            Value::Array(xs) => success(xs.clone()),
            _ => failure(DecodeError::leaf(LeafError::UnknownArray { actual: input.clone() })),
        }
    }
}

/// Object-shaped input: a JSON object, never an array or `null`.
#[derive(Debug, Clone, Copy)]
pub struct UnknownRecordD;

pub fn unknown_record() -> UnknownRecordD {
    UnknownRecordD
}

impl Decoder for UnknownRecordD {
    type Input = Value;
    type Error = DecodeError;
    type Output = Map<String, Value>;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, Map<String, Value>> {
        match input {
            Value::Object(m) => success(m.clone()),
            _ => failure(DecodeError::leaf(LeafError::UnknownRecord { actual: input.clone() })),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteralD {
    pub literals: Vec<Literal>,
}

/// Accepts exactly one of `literals`.
pub fn literal<L: Into<Literal>>(literals: impl IntoIterator<Item = L>) -> LiteralD {
    LiteralD { literals: literals.into_iter().map(Into::into).collect() }
}

impl Decoder for LiteralD {
    type Input = Value;
    type Error = DecodeError;
    type Output = Literal;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, Literal> {
        match Literal::from_value(input) {
            Some(lit) if self.literals.contains(&lit) => success(lit),
            _ => failure(DecodeError::leaf(LeafError::Literal {
                actual: input.clone(),
                literals: self.literals.clone(),
            })),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shape_checks_reject_other_kinds() {
        assert_eq!(string().decode(&json!("a")), success("a".to_string()));
        assert_eq!(
            string().decode(&json!(null)),
            failure(DecodeError::leaf(LeafError::String { actual: json!(null) }))
        );
        assert_eq!(boolean().decode(&json!(true)), success(true));
        assert!(boolean().decode(&json!("true")).is_failure());
        assert_eq!(unknown_array().decode(&json!([1, "a"])), success(vec![json!(1), json!("a")]));
        assert!(unknown_array().decode(&json!({})).is_failure());
        assert!(unknown_record().decode(&json!({"a": 1})).is_success());
        assert!(unknown_record().decode(&json!([])).is_failure());
        assert!(unknown_record().decode(&json!(null)).is_failure());
    }

    #[test]
    fn numbers_flag_nan_and_infinity_as_warnings() {
        assert_eq!(number().decode(&json!(1.5)), success(1.5));
        assert!(number().decode(&json!("1.5")).is_failure());
        match float().decode(&f64::NAN) {
            Outcome::Warning { error, value } => {
                assert_eq!(error, DecodeError::leaf(LeafError::NaN));
                assert!(value.is_nan());
            }
            other => panic!("expected a warning, got {other:?}"),
        }
        assert_eq!(
            float().decode(&f64::NEG_INFINITY),
            warning(DecodeError::leaf(LeafError::Infinity), f64::NEG_INFINITY)
        );
        assert_eq!(float().decode(&0.25), success(0.25));
    }

    #[test]
    fn literal_matches_by_value() {
        let d = literal(["a", "b"]);
        assert_eq!(d.decode(&json!("b")), success(Literal::from("b")));
        assert_eq!(
            d.decode(&json!("c")),
            failure(DecodeError::leaf(LeafError::Literal {
                actual: json!("c"),
                literals: vec!["a".into(), "b".into()],
            }))
        );
        let d = literal([Literal::Null, Literal::from(1_i64)]);
        assert!(d.decode(&json!(1)).is_success());
        assert!(d.decode(&json!(null)).is_success());
        assert!(d.decode(&json!([1])).is_failure());
    }
}
